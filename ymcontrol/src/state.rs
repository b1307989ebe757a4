//! État de lecture et événements publiés

use std::fmt;
use ymsearch::MediaResult;

/// État de la machine de lecture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

impl PlaybackState {
    /// Nom utilisé par le protocole de statut
    pub fn wire_name(self) -> &'static str {
        match self {
            PlaybackState::Stopped => "stop",
            PlaybackState::Playing => "play",
            PlaybackState::Paused => "pause",
        }
    }

    /// Libellé affiché à l'utilisateur
    pub fn label(self) -> &'static str {
        match self {
            PlaybackState::Stopped => "Stopped",
            PlaybackState::Playing => "Playing",
            PlaybackState::Paused => "Paused",
        }
    }
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Événement publié par le jukebox
#[derive(Debug, Clone, PartialEq)]
pub enum JukeboxEvent {
    Status(PlaybackState),
    Current(Option<MediaResult>),
    /// Erreur d'une tâche de fond, pour affichage
    Error(String),
}
