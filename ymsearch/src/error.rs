//! Types d'erreurs pour ymsearch

/// Erreurs de résolution d'un résultat
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("Unknown result type: {0}")]
    UnknownResultType(String),

    #[error("Invalid result payload: {0}")]
    InvalidPayload(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Extractor error: {0}")]
    Extractor(String),

    #[error("No suitable url found")]
    NoSuitableUrl,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Type Result spécialisé pour ymsearch
pub type Result<T> = std::result::Result<T, SearchError>;
