//! # ymcache - Cache de téléchargement adressé par contenu
//!
//! Stocke localement les médias téléchargés, indexés par l'empreinte SHA-256
//! de leur identifiant.
//!
//! ## Fonctionnalités
//!
//! - Publication atomique : téléchargement en répertoire temporaire puis
//!   renommage (copie vers un fichier caché puis renommage entre systèmes de
//!   fichiers)
//! - Requêtes concurrentes sur un même identifiant sérialisées
//! - Transcodage optionnel du flux avant stockage
//! - Progression bornée en fréquence
//!
//! ## Utilisation
//!
//! ```rust,no_run
//! use ymcache::{Cache, CacheEntry, CacheSettings, Url};
//!
//! # async fn demo() -> ymcache::Result<()> {
//! let cache = Cache::new(CacheSettings::new("/tmp/ym/downloads", "/tmp/ym/tmp"))?;
//! let entry = CacheEntry::new("dQw4w9WgXcQ", "m4a", Url::parse("http://host/a.m4a").ok());
//! let file = cache.set_progress(&entry, |written, total| println!("{written}/{total}")).await?;
//! assert_eq!(cache.get("dQw4w9WgXcQ").await, Some(file));
//! # Ok(())
//! # }
//! ```

mod cache;
pub mod download;
mod error;

pub use cache::{hash_id, hash_path, Cache, CacheEntry, CacheSettings, CachedFile, SHARD_DEPTH, SHARD_WIDTH};
pub use download::{command_transcoder, ProgressFn, StreamTransformer, StreamTransformerFactory, Transcoder};
pub use error::{CacheError, Result};

pub use reqwest::Url;
