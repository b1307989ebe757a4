//! Types d'erreurs pour ymplaylist

/// Erreurs de gestion de playlist
#[derive(Debug, thiserror::Error)]
pub enum PlaylistError {
    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Result error: {0}")]
    Result(#[from] ymsearch::SearchError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Type Result spécialisé pour ymplaylist
pub type Result<T> = std::result::Result<T, PlaylistError>;
