//! Orchestrateur de lecture
//!
//! Deux tâches coopèrent :
//! - la tâche de consommation lit la playlist, résout chaque résultat en
//!   source jouable, lance le lecteur et attend sa fin ;
//! - la boucle [`Jukebox::run`] applique les intentions utilisateur à la
//!   playlist, au lecteur actif, ou aux deux.
//!
//! Le canal de commande du lecteur actif est partagé sous mutex : la tâche
//! de consommation le crée et l'efface, la boucle de commandes l'utilise.

use chrono::Datelike;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch, Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use ymcache::Cache;
use ymplayer::{Param, Player, PlayerCommand};
use ymplaylist::Playlist;
use ymsearch::{find_live_url, Extractor, MediaResult};

use crate::{Intent, JukeboxEvent, PlaybackState, Result};

const EVENT_CAPACITY: usize = 64;

/// Paramètres de l'orchestrateur
#[derive(Clone)]
pub struct JukeboxSettings {
    /// Nombre maximal d'URLs candidates testées
    pub preflights: usize,
    pub extractor: Arc<Extractor>,
    pub cache: Option<Arc<Cache>>,
    /// Résultats ajoutés, transmis au remplissage du cache
    pub prefetch: Option<mpsc::UnboundedSender<MediaResult>>,
}

impl JukeboxSettings {
    pub fn new(extractor: Arc<Extractor>) -> Self {
        Self {
            preflights: 10,
            extractor,
            cache: None,
            prefetch: None,
        }
    }

    pub fn with_preflights(mut self, preflights: usize) -> Self {
        self.preflights = preflights;
        self
    }

    pub fn with_cache(mut self, cache: Arc<Cache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_prefetch(mut self, prefetch: mpsc::UnboundedSender<MediaResult>) -> Self {
        self.prefetch = Some(prefetch);
        self
    }
}

struct Inner {
    playlist: Arc<Playlist>,
    player: Arc<dyn Player>,
    settings: JukeboxSettings,
    client: reqwest::Client,
    sink: Mutex<Option<mpsc::Sender<PlayerCommand>>>,
    state: RwLock<PlaybackState>,
    current: RwLock<Option<MediaResult>>,
    /// Consommation suspendue après un `Stop` explicite
    halted: watch::Sender<bool>,
    search: Mutex<(String, usize)>,
    events: broadcast::Sender<JukeboxEvent>,
}

/// Jukebox : playlist + cache + lecteur
#[derive(Clone)]
pub struct Jukebox {
    inner: Arc<Inner>,
}

impl Jukebox {
    pub fn new(playlist: Arc<Playlist>, player: Arc<dyn Player>, settings: JukeboxSettings) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let (halted, _) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                playlist,
                player,
                settings,
                client: reqwest::Client::new(),
                sink: Mutex::new(None),
                state: RwLock::new(PlaybackState::Stopped),
                current: RwLock::new(None),
                halted,
                search: Mutex::new((String::new(), 0)),
                events,
            }),
        }
    }

    pub fn playlist(&self) -> &Arc<Playlist> {
        &self.inner.playlist
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JukeboxEvent> {
        self.inner.events.subscribe()
    }

    /// Émetteur d'événements, pour les tâches de fond voisines
    pub fn events(&self) -> broadcast::Sender<JukeboxEvent> {
        self.inner.events.clone()
    }

    pub async fn state(&self) -> PlaybackState {
        *self.inner.state.read().await
    }

    pub async fn current(&self) -> Option<MediaResult> {
        self.inner.current.read().await.clone()
    }

    /// Un lecteur est-il actif ?
    pub async fn is_active(&self) -> bool {
        self.inner.sink.lock().await.is_some()
    }

    /// Lance la consommation et applique les intentions jusqu'à `cancel`
    /// ou la fermeture du canal
    pub async fn run(&self, mut intents: mpsc::Receiver<Intent>, cancel: CancellationToken) {
        let consumer = tokio::spawn(Arc::clone(&self.inner).consume());
        info!(player = %self.inner.player.name(), "Jukebox started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                intent = intents.recv() => match intent {
                    Some(intent) => self.apply(intent).await,
                    None => break,
                },
            }
        }

        self.inner.stop_player().await;
        consumer.abort();
        let _ = consumer.await;
        info!("Jukebox stopped");
    }

    /// Applique une intention
    pub async fn apply(&self, intent: Intent) {
        let inner = &self.inner;
        let playlist = &inner.playlist;
        debug!(?intent, "Intent");

        match intent {
            Intent::Add(entry) => {
                if let (Some(prefetch), Some(result)) = (&inner.settings.prefetch, entry.result()) {
                    let _ = prefetch.send(result.clone());
                }
                playlist.add(entry).await;
            }
            Intent::Delete(indices) => playlist.del(&indices).await,
            Intent::Move { from, to } => playlist.move_entry(from, to).await,
            Intent::Scroll(delta) => playlist.scroll(delta).await,
            Intent::ScrollTo(index) => playlist.scroll_to(index).await,
            Intent::ResetScroll => playlist.reset_scroll().await,
            Intent::Search(query) => {
                let mut search = inner.search.lock().await;
                if search.0 != query {
                    *search = (query, 0);
                }
                let (query, offset) = &mut *search;
                if !playlist.search(query.as_str(), offset).await {
                    inner.report(format!("No match for {}", query));
                }
            }
            Intent::ToggleRandom => {
                playlist.toggle_random().await;
            }
            Intent::Jump(index) => {
                playlist.set_index(index).await;
                inner.stop_player().await;
                inner.resume();
            }
            Intent::Clear => {
                playlist.truncate().await;
                inner.stop_player().await;
            }
            Intent::Next(n) => {
                playlist.next(n).await;
                inner.stop_player().await;
                inner.resume();
            }
            Intent::Prev(n) => {
                playlist.prev(n).await;
                inner.stop_player().await;
                inner.resume();
            }
            Intent::Pause => {
                if inner.send(PlayerCommand::Pause).await {
                    let mut state = inner.state.write().await;
                    let next = match *state {
                        PlaybackState::Playing => PlaybackState::Paused,
                        PlaybackState::Paused => PlaybackState::Playing,
                        PlaybackState::Stopped => PlaybackState::Stopped,
                    };
                    if next != *state {
                        *state = next;
                        inner.emit(JukeboxEvent::Status(next));
                    }
                } else {
                    inner.resume();
                }
            }
            Intent::Stop => {
                // Suspendre avant l'arrêt : la consommation ne doit pas
                // enchaîner sur l'entrée suivante.
                let was_halted = inner.halted.send_replace(true);
                if inner.stop_player().await {
                    info!("Playback halted");
                } else {
                    inner.halted.send_replace(was_halted);
                }
            }
            Intent::SeekForward => {
                inner.send(PlayerCommand::SeekForward).await;
            }
            Intent::SeekBack => {
                inner.send(PlayerCommand::SeekBack).await;
            }
            Intent::VolumeUp => {
                inner.send(PlayerCommand::VolumeUp).await;
            }
            Intent::VolumeDown => {
                inner.send(PlayerCommand::VolumeDown).await;
            }
        }
    }

    /// Réponse à la requête `status`
    pub async fn status_lines(&self) -> Vec<String> {
        let length = self.inner.playlist.length().await;
        let state = self.state().await;
        vec![
            "volume: -1".to_string(),
            "repeat: 0".to_string(),
            "random: 0".to_string(),
            "single: 0".to_string(),
            "consume: 0".to_string(),
            "playlist: 1".to_string(),
            format!("playlistlength: {}", length),
            "mixrampdb: 0.000000".to_string(),
            format!("state: {}", state.wire_name()),
        ]
    }

    /// Réponse à la requête `currentsong` ; `None` sans morceau courant
    pub async fn current_song_lines(&self) -> Option<Vec<String>> {
        let current = self.current().await?;
        let described = async {
            let page = current.page_url()?;
            let info = current.info(&self.inner.settings.extractor).await?;
            Ok::<_, ymsearch::SearchError>((page, info))
        };
        let (page, info) = match described.await {
            Ok(described) => described,
            Err(e) => {
                debug!(id = %current.id(), error = %e, "No info for current song");
                return None;
            }
        };

        Some(vec![
            format!("file: {}", page),
            format!("Last-Modified: {}", info.created_string()),
            "Artist: -".to_string(),
            format!("Title: {}", info.title),
            "Track: 1".to_string(),
            format!("Date: {}", info.created.year()),
            "Genre: -".to_string(),
            "Composer: -".to_string(),
            format!("Time: {}", info.duration.as_secs()),
            format!("duration: {:.3}", info.duration.as_secs_f64()),
            "Pos: 1".to_string(),
            "Id: -".to_string(),
        ])
    }
}

impl Inner {
    fn emit(&self, event: JukeboxEvent) {
        let _ = self.events.send(event);
    }

    fn report(&self, message: String) {
        warn!(error = %message, "Jukebox error");
        self.emit(JukeboxEvent::Error(message));
    }

    fn resume(&self) {
        self.halted.send_replace(false);
    }

    async fn set_state(&self, state: PlaybackState) {
        *self.state.write().await = state;
        self.emit(JukeboxEvent::Status(state));
    }

    async fn set_current(&self, current: Option<MediaResult>) {
        *self.current.write().await = current.clone();
        self.emit(JukeboxEvent::Current(current));
    }

    /// Envoie une commande au lecteur actif ; `false` si aucun lecteur
    async fn send(&self, command: PlayerCommand) -> bool {
        let sink = self.sink.lock().await;
        match sink.as_ref() {
            Some(tx) => tx.send(command).await.is_ok(),
            None => false,
        }
    }

    /// Arrête le lecteur actif et oublie le morceau courant
    async fn stop_player(&self) -> bool {
        let Some(tx) = self.sink.lock().await.take() else {
            return false;
        };
        let _ = tx.send(PlayerCommand::Stop).await;
        self.set_current(None).await;
        true
    }

    /// Chemin local depuis le cache, sinon première URL distante qui répond
    async fn resolve(&self, result: &MediaResult) -> Result<String> {
        if let Some(cache) = &self.settings.cache {
            if let Some(file) = cache.get(result.id()).await {
                return Ok(file.path().to_string_lossy().into_owned());
            }
        }

        let urls = result.download_urls(&self.settings.extractor).await?;
        if let Some(local) = urls.first().filter(|u| u.scheme() == "file") {
            return Ok(local
                .to_file_path()
                .map(|p| p.to_string_lossy().into_owned())
                .unwrap_or_else(|_| local.to_string()));
        }

        let url = find_live_url(&self.client, &urls, self.settings.preflights).await?;
        Ok(url.to_string())
    }

    async fn consume(self: Arc<Self>) {
        let mut halted = self.halted.subscribe();
        loop {
            if halted.wait_for(|h| !*h).await.is_err() {
                return;
            }

            let (index, entry) = self.playlist.read().await;
            let Some(result) = entry.result().cloned() else {
                continue;
            };

            let source = match self.resolve(&result).await {
                Ok(source) => source,
                Err(e) => {
                    self.report(format!("{}: {}", result.title(), e));
                    continue;
                }
            };

            let mut params = vec![Param::Silent];
            if !entry.wants_video() {
                params.push(Param::NoVideo);
            }

            // État et morceau courant publiés sous le verrou : un `Stop`
            // concurrent les voit déjà en place.
            let wait = {
                let mut sink = self.sink.lock().await;
                match self.player.spawn(&source, &params).await {
                    Ok(handle) => {
                        *sink = Some(handle.commands);
                        info!(index, title = %result.title(), source = %source, "Playing");
                        self.set_state(PlaybackState::Playing).await;
                        self.set_current(Some(result)).await;
                        handle.wait
                    }
                    Err(e) => {
                        drop(sink);
                        self.report(format!("{}: {}", result.title(), e));
                        continue;
                    }
                }
            };

            if let Err(e) = wait.await {
                warn!(error = %e, "Player task failed");
            }

            self.sink.lock().await.take();
            self.set_state(PlaybackState::Stopped).await;
        }
    }
}
