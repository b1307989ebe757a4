//! Stockage adressé par contenu
//!
//! Chaque identifiant est haché (SHA-256) ; l'empreinte hexadécimale est
//! découpée en 8 répertoires de 2 caractères suivis d'un nom de 48
//! caractères. Un fichier n'apparaît sous son nom final qu'après un
//! renommage atomique depuis le répertoire temporaire.

use reqwest::Url;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tracing::{debug, info, warn};
use ymutils::time_suffix;

use crate::download::{fetch, ProgressFn, ProgressThrottle, Transcoder};
use crate::{CacheError, Result};

/// Nombre de niveaux de répertoires
pub const SHARD_DEPTH: usize = 8;
/// Largeur (en caractères hexadécimaux) d'un niveau
pub const SHARD_WIDTH: usize = 2;

/// Empreinte hexadécimale d'un identifiant
pub fn hash_id(id: &str) -> String {
    hex::encode(Sha256::digest(id.as_bytes()))
}

/// Chemin relatif (sans extension) associé à un identifiant
///
/// `h0/h1/…/h7/stem`
pub fn hash_path(id: &str) -> PathBuf {
    let hash = hash_id(id);
    let (shards, stem) = hash.split_at(SHARD_DEPTH * SHARD_WIDTH);

    let mut path = PathBuf::new();
    for i in 0..SHARD_DEPTH {
        path.push(&shards[i * SHARD_WIDTH..(i + 1) * SHARD_WIDTH]);
    }
    path.push(stem);
    path
}

fn with_extension(base: &Path, extension: &str) -> PathBuf {
    if extension.is_empty() {
        return base.to_path_buf();
    }
    let mut name: OsString = base.as_os_str().to_owned();
    name.push(".");
    name.push(extension);
    PathBuf::from(name)
}

/// Demande d'écriture dans le cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    id: String,
    extension: String,
    url: Option<Url>,
}

impl CacheEntry {
    pub fn new(id: impl Into<String>, extension: impl Into<String>, url: Option<Url>) -> Self {
        Self {
            id: id.into(),
            extension: extension.into(),
            url,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn url(&self) -> Option<&Url> {
        self.url.as_ref()
    }
}

/// Fichier publié dans le cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedFile {
    id: String,
    path: PathBuf,
}

impl CachedFile {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Paramètres de construction d'un [`Cache`]
#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub root: PathBuf,
    pub temp_dir: PathBuf,
    pub progress_interval: Duration,
    pub transcoder: Option<Transcoder>,
}

impl CacheSettings {
    pub fn new(root: impl Into<PathBuf>, temp_dir: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            temp_dir: temp_dir.into(),
            progress_interval: Duration::from_secs(3),
            transcoder: None,
        }
    }

    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }

    pub fn with_transcoder(mut self, transcoder: Transcoder) -> Self {
        self.transcoder = Some(transcoder);
        self
    }
}

/// Cache de téléchargement
pub struct Cache {
    root: PathBuf,
    temp_dir: PathBuf,
    progress_interval: Duration,
    transcoder: Option<Transcoder>,
    client: reqwest::Client,
    locks: Mutex<HashMap<String, Weak<tokio::sync::Mutex<()>>>>,
}

impl Cache {
    /// Crée le cache et ses répertoires
    pub fn new(settings: CacheSettings) -> Result<Self> {
        std::fs::create_dir_all(&settings.temp_dir)?;
        std::fs::create_dir_all(&settings.root)?;

        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .build()?;

        info!(
            root = %settings.root.display(),
            temp = %settings.temp_dir.display(),
            transcoder = ?settings.transcoder.as_ref().map(|t| t.extension()),
            "Cache initialized"
        );

        Ok(Self {
            root: settings.root,
            temp_dir: settings.temp_dir,
            progress_interval: settings.progress_interval,
            transcoder: settings.transcoder,
            client,
            locks: Mutex::new(HashMap::new()),
        })
    }

    /// Répertoire racine du cache
    pub fn dir(&self) -> &Path {
        &self.root
    }

    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }

    /// Chemin absolu, sans extension, du fichier associé à `id`
    pub fn base(&self, id: &str) -> PathBuf {
        self.root.join(hash_path(id))
    }

    /// Cherche le fichier publié pour `id`, quelle que soit son extension
    pub async fn get(&self, id: &str) -> Option<CachedFile> {
        if id.is_empty() {
            return None;
        }
        self.find_published(id).await.map(|path| CachedFile {
            id: id.to_string(),
            path,
        })
    }

    async fn find_published(&self, id: &str) -> Option<PathBuf> {
        let base = self.base(id);
        let dir = base.parent()?;
        let stem = base.file_name()?.to_str()?.to_string();
        let prefix = format!("{}.", stem);

        let mut entries = tokio::fs::read_dir(dir).await.ok()?;
        while let Ok(Some(entry)) = entries.next_entry().await {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if name != stem && !name.starts_with(&prefix) {
                continue;
            }
            if entry.file_type().await.map(|t| t.is_file()).unwrap_or(false) {
                return Some(entry.path());
            }
        }
        None
    }

    /// Télécharge et publie `entry`
    pub async fn set(&self, entry: &CacheEntry) -> Result<CachedFile> {
        self.store(entry, None).await
    }

    /// Comme [`Cache::set`], en notifiant `progress(écrit, total)`
    pub async fn set_progress<F>(&self, entry: &CacheEntry, progress: F) -> Result<CachedFile>
    where
        F: Fn(u64, u64) + Send + Sync + 'static,
    {
        self.store(entry, Some(Arc::new(progress))).await
    }

    fn lock_for(&self, id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        locks.retain(|_, lock| lock.strong_count() > 0);

        if let Some(lock) = locks.get(id).and_then(Weak::upgrade) {
            return lock;
        }
        let lock = Arc::new(tokio::sync::Mutex::new(()));
        locks.insert(id.to_string(), Arc::downgrade(&lock));
        lock
    }

    async fn store(&self, entry: &CacheEntry, progress: Option<ProgressFn>) -> Result<CachedFile> {
        let url = entry.url().ok_or(CacheError::MissingUrl)?;
        let id = entry.id();
        if id.is_empty() {
            return Err(CacheError::EmptyId);
        }

        let extension = match &self.transcoder {
            Some(transcoder) => transcoder.extension(),
            None => entry.extension(),
        };
        let hash = hash_id(id);
        let dest = with_extension(&self.base(id), extension);

        let lock = self.lock_for(id);
        let _guard = lock.lock().await;

        if tokio::fs::try_exists(&dest).await.unwrap_or(false) {
            debug!(id = %id, path = %dest.display(), "Already cached");
            return Ok(CachedFile {
                id: id.to_string(),
                path: dest,
            });
        }

        let tmp = self.temp_dir.join(format!("{}.{}", hash, time_suffix()));

        let throttle = Arc::new(Mutex::new(ProgressThrottle::new(progress, self.progress_interval)));
        let transformer = self.transcoder.as_ref().map(Transcoder::transformer);

        let result = match fetch(&self.client, url, &tmp, transformer, throttle).await {
            Ok(size) => self.publish(id, &tmp, &dest).await.map(|_| size),
            Err(e) => Err(e),
        };

        if let Err(e) = tokio::fs::remove_file(&tmp).await {
            if e.kind() != io::ErrorKind::NotFound {
                warn!(path = %tmp.display(), error = %e, "Failed to remove temporary file");
            }
        }

        match result {
            Ok(size) => {
                info!(id = %id, path = %dest.display(), size, "Cached");
                Ok(CachedFile {
                    id: id.to_string(),
                    path: dest,
                })
            }
            Err(e) => {
                warn!(id = %id, url = %url, error = %e, "Cache download failed");
                Err(e)
            }
        }
    }

    async fn publish(&self, id: &str, tmp: &Path, dest: &Path) -> Result<()> {
        let dir = dest
            .parent()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "destination has no parent"))?;
        tokio::fs::create_dir_all(dir).await?;

        if let Some(stale) = self.find_published(id).await {
            if stale != dest {
                debug!(path = %stale.display(), "Removing stale cached file");
                tokio::fs::remove_file(&stale).await?;
            }
        }

        match tokio::fs::rename(tmp, dest).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
                let stem = dest
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                // Nom caché : invisible pour `get`
                let partial = dir.join(format!(".{}.partial", stem));

                let copied = async {
                    tokio::fs::copy(tmp, &partial).await?;
                    tokio::fs::rename(&partial, dest).await
                }
                .await;

                if let Err(e) = copied {
                    let _ = tokio::fs::remove_file(&partial).await;
                    return Err(e.into());
                }
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}
