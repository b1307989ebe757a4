//! Types d'erreurs pour ymplayer

/// Erreurs de lancement des lecteurs
#[derive(Debug, thiserror::Error)]
pub enum PlayerError {
    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("No supported player found")]
    NoSupportedPlayer,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Type Result spécialisé pour ymplayer
pub type Result<T> = std::result::Result<T, PlayerError>;
