//! # ymplayer - Frontière avec les lecteurs externes
//!
//! Un [`Player`] sait lancer la lecture d'une source (chemin local ou URL)
//! et rend un [`PlayerHandle`] :
//! - `commands` : canal acceptant un ensemble fermé de [`PlayerCommand`]
//! - `wait` : tâche qui se termine quand le processus est complètement sorti
//!
//! [`GenericPlayer`] couvre les lecteurs pilotables par leur entrée standard
//! (mpv, mplayer, ffplay).

mod error;
mod generic;

pub use error::{PlayerError, Result};
pub use generic::GenericPlayer;

use std::fmt::Debug;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Signaux de contrôle envoyés au lecteur actif
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlayerCommand {
    Pause,
    Stop,
    Next,
    Prev,
    VolumeUp,
    VolumeDown,
    SeekForward,
    SeekBack,
}

/// Options de lancement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Param {
    /// Pas de sortie vidéo
    NoVideo,
    /// Pas de sortie console
    Silent,
}

/// Lecteur en cours d'exécution
#[derive(Debug)]
pub struct PlayerHandle {
    pub commands: mpsc::Sender<PlayerCommand>,
    pub wait: JoinHandle<()>,
}

/// Capacité de lecture
#[async_trait::async_trait]
pub trait Player: Debug + Send + Sync {
    /// Nom affiché dans les journaux
    fn name(&self) -> &str;

    /// Le lecteur est-il utilisable sur cette machine ?
    fn supported(&self) -> bool;

    /// Lance la lecture de `source`
    async fn spawn(&self, source: &str, params: &[Param]) -> Result<PlayerHandle>;
}

/// Retourne le premier lecteur utilisable
pub fn find_supported_player(players: Vec<Arc<dyn Player>>) -> Result<Arc<dyn Player>> {
    players
        .into_iter()
        .find(|p| p.supported())
        .ok_or(PlayerError::NoSupportedPlayer)
}
