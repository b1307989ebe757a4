//! Types d'erreurs pour ymcache

/// Erreurs du cache de téléchargement
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("url cannot be empty")]
    MissingUrl,

    #[error("id cannot be empty")]
    EmptyId,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP status {status} for {url}")]
    Status { status: u16, url: String },

    #[error("Transform error: {0}")]
    Transform(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Type Result spécialisé pour ymcache
pub type Result<T> = std::result::Result<T, CacheError>;
