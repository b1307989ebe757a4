//! Types d'erreurs pour ymcontrol

/// Erreurs de l'orchestrateur
#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    #[error("Resolution error: {0}")]
    Search(#[from] ymsearch::SearchError),

    #[error("Cache error: {0}")]
    Cache(#[from] ymcache::CacheError),

    #[error("Player error: {0}")]
    Player(#[from] ymplayer::PlayerError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Type Result spécialisé pour ymcontrol
pub type Result<T> = std::result::Result<T, ControlError>;
