//! # ymcontrol - Orchestration du jukebox
//!
//! Cette crate relie la playlist, le cache et le lecteur :
//! - [`Jukebox`] : machine d'état `Stopped → Playing ⇄ Paused → Stopped`,
//!   tâche de consommation et application des [`Intent`]
//! - [`status`] : répondeur de statut ligne à ligne sur TCP
//! - [`prefetch`] : remplissage du cache en tâche de fond
//!
//! Toutes les erreurs des tâches de fond sont publiées comme
//! [`JukeboxEvent::Error`] et journalisées, jamais propagées en panique.

mod error;
mod intent;
mod jukebox;
pub mod prefetch;
mod state;
pub mod status;

pub use error::{ControlError, Result};
pub use intent::Intent;
pub use jukebox::{Jukebox, JukeboxSettings};
pub use state::{JukeboxEvent, PlaybackState};
