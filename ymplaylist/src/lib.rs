//! # ymplaylist - File de lecture persistante du jukebox
//!
//! Cette crate fournit la [`Playlist`] :
//! - File ordonnée partagée entre tâches (un écrivain, plusieurs lecteurs)
//! - Curseur « prochaine entrée » avec lecture bloquante ([`Playlist::read`])
//! - Parcours séquentiel ou aléatoire
//! - Recherche, déplacement et suppression en place
//! - Fenêtre d'affichage indépendante du curseur
//! - Sauvegarde atomique et rechargement
//!
//! # Exemple d'utilisation
//!
//! ```no_run
//! use ymplaylist::{Playlist, QueueEntry};
//! use ymsearch::YoutubeResult;
//!
//! # #[tokio::main]
//! # async fn main() -> ymplaylist::Result<()> {
//! let playlist = Playlist::new("/tmp/ym/playlist");
//! playlist
//!     .add(QueueEntry::new("rick", Some(YoutubeResult::new("dQw4w9WgXcQ", "Never Gonna").into())))
//!     .await;
//!
//! let (index, entry) = playlist.read().await;
//! println!("Playing #{}: {}", index, entry.raw());
//!
//! playlist.save(true).await?;
//! # Ok(())
//! # }
//! ```

mod entry;
mod error;
mod persistence;
mod playlist;

pub use entry::QueueEntry;
pub use error::{PlaylistError, Result};
pub use playlist::core::{PlaylistCore, PlaylistEvent};
pub use playlist::Playlist;
