//! Playlist partagée entre tâches
//!
//! Les modifications structurelles prennent le verrou en écriture, les
//! lectures pures le verrou en lecture. Un lecteur bloqué dans
//! [`Playlist::read`] est réveillé par un [`Notify`] à permis unique : un
//! réveil émis alors que personne n'attend est conservé pour le prochain
//! passage.

pub mod core;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, Notify, RwLock};
use tracing::{debug, info, warn};
use ymsearch::MediaResult;
use ymutils::time_suffix;

use crate::persistence;
use crate::{QueueEntry, Result};
use self::core::{PlaylistCore, PlaylistEvent};

const EVENT_CAPACITY: usize = 64;

/// File de lecture persistante
pub struct Playlist {
    file: PathBuf,
    core: RwLock<PlaylistCore>,
    wake: Notify,
    /// Lecteurs suspendus dans `read`
    waiting: AtomicUsize,
    events: broadcast::Sender<PlaylistEvent>,
}

/// Compte un lecteur suspendu tant qu'il est en vie
struct WaitingReader<'a>(&'a AtomicUsize);

impl<'a> WaitingReader<'a> {
    fn register(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for WaitingReader<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Playlist {
    /// Crée une playlist vide sauvegardée dans `file`
    pub fn new(file: impl Into<PathBuf>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            file: file.into(),
            core: RwLock::new(PlaylistCore::new()),
            wake: Notify::new(),
            waiting: AtomicUsize::new(0),
            events,
        }
    }

    pub fn file(&self) -> &Path {
        &self.file
    }

    /// Abonnement aux modifications
    pub fn subscribe(&self) -> broadcast::Receiver<PlaylistEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: PlaylistEvent) {
        let _ = self.events.send(event);
    }

    fn changed(&self) {
        self.wake.notify_one();
        self.emit(PlaylistEvent::Changed);
    }

    /// Ajoute une entrée ; sans effet si elle n'a pas de résultat
    pub async fn add(&self, entry: QueueEntry) {
        let added = self.core.write().await.push(entry);
        if added {
            self.changed();
        }
    }

    /// Rend la prochaine entrée jouable et son index, en attendant si besoin
    ///
    /// Annulable : un lecteur abandonné ne compte plus comme suspendu.
    pub async fn read(&self) -> (usize, Arc<QueueEntry>) {
        loop {
            let notified = self.wake.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let _waiting = {
                let mut core = self.core.write().await;
                if let Some((index, entry)) = core.take() {
                    drop(core);
                    debug!(index, raw = %entry.raw(), "Entry handed out");
                    self.emit(PlaylistEvent::Changed);
                    return (index, entry);
                }
                WaitingReader::register(&self.waiting)
            };

            notified.await;
        }
    }

    pub async fn at(&self, index: usize) -> Option<Arc<QueueEntry>> {
        self.core.read().await.at(index)
    }

    pub async fn list(&self) -> Vec<Arc<QueueEntry>> {
        self.core.read().await.entries.clone()
    }

    pub async fn length(&self) -> usize {
        self.core.read().await.len()
    }

    /// Résultats liés, dans l'ordre, entrées inertes omises
    pub async fn result_list(&self) -> Vec<MediaResult> {
        self.core.read().await.results()
    }

    /// Index de l'entrée en cours de lecture
    pub async fn index(&self) -> Option<usize> {
        self.core.read().await.index()
    }

    /// Prochaine position lue
    pub async fn cursor(&self) -> usize {
        self.core.read().await.cursor
    }

    pub async fn is_random(&self) -> bool {
        self.core.read().await.random
    }

    pub async fn is_dirty(&self) -> bool {
        self.core.read().await.dirty
    }

    /// Supprime un lot d'indices (base 0) de façon atomique
    pub async fn del(&self, indices: &[usize]) {
        let removed = self.core.write().await.delete(indices);
        if removed > 0 {
            debug!(removed, "Entries deleted");
            self.changed();
        }
    }

    pub async fn move_entry(&self, from: usize, to: usize) {
        if self.core.write().await.move_entry(from, to) {
            self.emit(PlaylistEvent::Changed);
        }
    }

    pub async fn next(&self, n: usize) {
        if self.core.write().await.next(n) {
            self.emit(PlaylistEvent::Changed);
        }
    }

    pub async fn prev(&self, n: usize) {
        let mut core = self.core.write().await;
        core.prev(n, self.waiting.load(Ordering::SeqCst) > 0);
        drop(core);
        self.changed();
    }

    pub async fn set_index(&self, index: usize) {
        self.core.write().await.set_index(index);
        self.changed();
    }

    pub async fn set_random(&self, random: bool) {
        if self.core.write().await.set_random(random) {
            info!(random, "Random mode");
            self.changed();
        }
    }

    /// Inverse le mode aléatoire et retourne le nouvel état
    pub async fn toggle_random(&self) -> bool {
        let random = {
            let mut core = self.core.write().await;
            let random = !core.random;
            core.set_random(random);
            random
        };
        info!(random, "Random mode");
        self.changed();
        random
    }

    /// Recherche dans les titres ; voir [`PlaylistCore::search`]
    pub async fn search(&self, query: &str, offset: &mut usize) -> bool {
        let found = self.core.write().await.search(query, offset);
        if found {
            self.emit(PlaylistEvent::View);
        }
        found
    }

    pub async fn scroll(&self, delta: isize) {
        if self.core.write().await.scroll(delta) {
            self.emit(PlaylistEvent::View);
        }
    }

    pub async fn scroll_to(&self, index: isize) {
        self.core.write().await.scroll_to(index);
        self.emit(PlaylistEvent::View);
    }

    pub async fn reset_scroll(&self) {
        self.core.write().await.reset_scroll();
        self.emit(PlaylistEvent::View);
    }

    /// Fenêtre d'affichage ; voir [`PlaylistCore::surrounding`]
    pub async fn surrounding(&self, amount: usize) -> (usize, isize, Vec<MediaResult>) {
        self.core.write().await.surrounding(amount)
    }

    pub async fn truncate(&self) {
        self.core.write().await.truncate();
        info!("Playlist cleared");
        self.changed();
    }

    /// Sauvegarde atomique (fichier temporaire puis renommage)
    ///
    /// Avec `only_if_dirty`, ne fait rien si rien n'a changé depuis la
    /// dernière sauvegarde. L'état reste modifié si une mutation survient
    /// pendant l'écriture.
    pub async fn save(&self, only_if_dirty: bool) -> Result<()> {
        let (bytes, revision) = {
            let core = self.core.read().await;
            if only_if_dirty && !core.dirty {
                return Ok(());
            }
            (persistence::encode(core.cursor, &core.entries)?, core.revision)
        };

        if let Some(parent) = self.file.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut tmp = self.file.clone().into_os_string();
        tmp.push(format!(".{}", time_suffix()));
        let tmp = PathBuf::from(tmp);

        let written = async {
            tokio::fs::write(&tmp, &bytes).await?;
            tokio::fs::rename(&tmp, &self.file).await
        }
        .await;

        if let Err(e) = written {
            let _ = tokio::fs::remove_file(&tmp).await;
            warn!(file = %self.file.display(), error = %e, "Failed to save playlist");
            return Err(e.into());
        }

        let mut core = self.core.write().await;
        if core.revision == revision {
            core.dirty = false;
        }
        debug!(file = %self.file.display(), size = bytes.len(), "Playlist saved");
        Ok(())
    }

    /// Remplace l'état courant par le contenu du fichier
    pub async fn load(&self) -> Result<()> {
        let bytes = tokio::fs::read(&self.file).await?;
        let (cursor, entries) = persistence::decode(&bytes)?;
        let count = entries.len();

        self.core.write().await.replace(cursor, entries);
        info!(file = %self.file.display(), entries = count, cursor, "Playlist loaded");
        self.changed();
        Ok(())
    }
}
