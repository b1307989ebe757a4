mod common;

use common::{entry, eventually, local, playlist_with, FakePlayer};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};
use ymcache::{Cache, CacheEntry, CacheSettings};
use ymcontrol::{Intent, Jukebox, JukeboxEvent, JukeboxSettings, PlaybackState};
use ymplayer::{Param, Player, PlayerCommand, PlayerHandle};
use ymplaylist::{Playlist, QueueEntry};
use ymsearch::{Extractor, RemoteResult, Url};

fn settings() -> JukeboxSettings {
    JukeboxSettings::new(Arc::new(Extractor::new("/nonexistent/youtube-dl")))
}

struct Running {
    intents: mpsc::Sender<Intent>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

fn start(jukebox: &Jukebox) -> Running {
    let (intents, rx) = mpsc::channel(16);
    let cancel = CancellationToken::new();
    let task = tokio::spawn({
        let jukebox = jukebox.clone();
        let cancel = cancel.clone();
        async move { jukebox.run(rx, cancel).await }
    });
    Running { intents, cancel, task }
}

async fn playing(jukebox: &Jukebox) {
    eventually(|| async {
        jukebox.state().await == PlaybackState::Playing && jukebox.current().await.is_some()
    })
    .await;
}

#[tokio::test]
async fn test_consumes_and_spawns_player() {
    let dir = tempfile::tempdir().unwrap();
    let playlist = playlist_with(&dir, &["a"]).await;
    let player = Arc::new(FakePlayer::default());
    let jukebox = Jukebox::new(playlist, player.clone(), settings());

    let running = start(&jukebox);
    playing(&jukebox).await;

    assert_eq!(
        player.spawned(),
        vec![("/music/a.mp3".to_string(), vec![Param::Silent, Param::NoVideo])]
    );
    assert_eq!(jukebox.current().await, Some(local("a")));
    assert!(jukebox.is_active().await);

    running.cancel.cancel();
    running.task.await.unwrap();
    eventually(|| async { player.received() == vec![PlayerCommand::Stop] }).await;
}

#[tokio::test]
async fn test_bang_prefix_keeps_video() {
    let dir = tempfile::tempdir().unwrap();
    let playlist = playlist_with(&dir, &[]).await;
    playlist.add(QueueEntry::new("!clip", Some(local("clip")))).await;
    let player = Arc::new(FakePlayer::default());
    let jukebox = Jukebox::new(playlist, player.clone(), settings());

    let _running = start(&jukebox);
    playing(&jukebox).await;
    assert_eq!(player.spawned()[0].1, vec![Param::Silent]);
}

#[tokio::test]
async fn test_stop_while_stopped_is_noop() {
    let dir = tempfile::tempdir().unwrap();
    let playlist = playlist_with(&dir, &[]).await;
    let player = Arc::new(FakePlayer::default());
    let jukebox = Jukebox::new(playlist, player.clone(), settings());
    let mut events = jukebox.subscribe();

    jukebox.apply(Intent::Stop).await;

    assert_eq!(jukebox.state().await, PlaybackState::Stopped);
    assert!(!jukebox.is_active().await);
    assert!(player.received().is_empty());
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn test_pause_toggles_state() {
    let dir = tempfile::tempdir().unwrap();
    let playlist = playlist_with(&dir, &["a"]).await;
    let player = Arc::new(FakePlayer::default());
    let jukebox = Jukebox::new(playlist, player.clone(), settings());
    let running = start(&jukebox);
    playing(&jukebox).await;

    let mut events = jukebox.subscribe();
    running.intents.send(Intent::Pause).await.unwrap();
    eventually(|| async { jukebox.state().await == PlaybackState::Paused }).await;
    assert_eq!(events.recv().await.unwrap(), JukeboxEvent::Status(PlaybackState::Paused));

    running.intents.send(Intent::Pause).await.unwrap();
    eventually(|| async { jukebox.state().await == PlaybackState::Playing }).await;
    eventually(|| async { player.received() == vec![PlayerCommand::Pause, PlayerCommand::Pause] }).await;
}

#[tokio::test]
async fn test_stop_halts_until_resumed() {
    let dir = tempfile::tempdir().unwrap();
    let playlist = playlist_with(&dir, &["a"]).await;
    let player = Arc::new(FakePlayer::default());
    let jukebox = Jukebox::new(Arc::clone(&playlist), player.clone(), settings());
    let running = start(&jukebox);
    playing(&jukebox).await;

    running.intents.send(Intent::Stop).await.unwrap();
    eventually(|| async { jukebox.state().await == PlaybackState::Stopped }).await;
    assert_eq!(player.received(), vec![PlayerCommand::Stop]);
    assert_eq!(jukebox.current().await, None);

    running.intents.send(Intent::Add(entry("b"))).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(player.spawned().len(), 1);

    running.intents.send(Intent::Pause).await.unwrap();
    playing(&jukebox).await;
    assert_eq!(player.spawned()[1].0, "/music/b.mp3");
}

#[tokio::test]
async fn test_next_stops_current_and_plays_following() {
    let dir = tempfile::tempdir().unwrap();
    let playlist = playlist_with(&dir, &["a", "b"]).await;
    let player = Arc::new(FakePlayer::default());
    let jukebox = Jukebox::new(playlist, player.clone(), settings());
    let running = start(&jukebox);
    playing(&jukebox).await;

    running.intents.send(Intent::Next(1)).await.unwrap();
    eventually(|| async { player.spawned().len() == 2 }).await;
    assert_eq!(player.spawned()[1].0, "/music/b.mp3");
    assert_eq!(player.received(), vec![PlayerCommand::Stop]);
    playing(&jukebox).await;
    assert_eq!(jukebox.current().await, Some(local("b")));
}

#[tokio::test]
async fn test_jump_plays_requested_entry() {
    let dir = tempfile::tempdir().unwrap();
    let playlist = playlist_with(&dir, &["a", "b", "c"]).await;
    let player = Arc::new(FakePlayer::default());
    let jukebox = Jukebox::new(playlist, player.clone(), settings());
    let running = start(&jukebox);
    playing(&jukebox).await;

    running.intents.send(Intent::Jump(2)).await.unwrap();
    eventually(|| async { player.spawned().len() == 2 }).await;
    assert_eq!(player.spawned()[1].0, "/music/c.mp3");
}

#[tokio::test]
async fn test_clear_stops_and_empties_queue() {
    let dir = tempfile::tempdir().unwrap();
    let playlist = playlist_with(&dir, &["a", "b"]).await;
    let player = Arc::new(FakePlayer::default());
    let jukebox = Jukebox::new(Arc::clone(&playlist), player.clone(), settings());
    let running = start(&jukebox);
    playing(&jukebox).await;

    running.intents.send(Intent::Clear).await.unwrap();
    eventually(|| async { jukebox.state().await == PlaybackState::Stopped }).await;
    assert_eq!(playlist.length().await, 0);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(player.spawned().len(), 1);
}

#[tokio::test]
async fn test_resolution_failure_is_reported_and_skipped() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let playlist = playlist_with(&dir, &[]).await;
    let dead = RemoteResult::parse(&format!("{}/dead.mp3", server.uri()), Some("dead")).unwrap();
    playlist.add(QueueEntry::new("dead", Some(dead.into()))).await;
    playlist.add(entry("alive")).await;

    let player = Arc::new(FakePlayer::default());
    let jukebox = Jukebox::new(playlist, player.clone(), settings().with_preflights(3));
    let mut events = jukebox.subscribe();
    let _running = start(&jukebox);

    match tokio::time::timeout(Duration::from_secs(2), events.recv()).await.unwrap().unwrap() {
        JukeboxEvent::Error(message) => assert!(message.starts_with("dead:")),
        other => panic!("unexpected event {:?}", other),
    }
    playing(&jukebox).await;
    assert_eq!(player.spawned()[0].0, "/music/alive.mp3");
}

#[tokio::test]
async fn test_live_remote_url_is_played() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let playlist = playlist_with(&dir, &[]).await;
    let url = format!("{}/live.ogg", server.uri());
    let live = RemoteResult::parse(&url, None).unwrap();
    playlist.add(QueueEntry::new("live", Some(live.into()))).await;

    let player = Arc::new(FakePlayer::default());
    let jukebox = Jukebox::new(playlist, player.clone(), settings());
    let _running = start(&jukebox);

    playing(&jukebox).await;
    assert_eq!(player.spawned()[0].0, url);
}

#[tokio::test]
async fn test_cached_file_is_preferred() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"audio".to_vec()))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let cache = Arc::new(
        Cache::new(CacheSettings::new(dir.path().join("downloads"), dir.path().join("tmp"))).unwrap(),
    );
    let url = Url::parse(&format!("{}/song.mp3", server.uri())).unwrap();
    let result = RemoteResult::new(url.clone(), "song");
    let cached = cache
        .set(&CacheEntry::new(url.as_str(), "mp4", Some(url.clone())))
        .await
        .unwrap();

    let playlist = playlist_with(&dir, &[]).await;
    playlist.add(QueueEntry::new("song", Some(result.into()))).await;

    let player = Arc::new(FakePlayer::default());
    let jukebox = Jukebox::new(playlist, player.clone(), settings().with_cache(cache));
    let _running = start(&jukebox);

    playing(&jukebox).await;
    assert_eq!(player.spawned()[0].0, cached.path().to_string_lossy());
}

#[tokio::test]
async fn test_spawn_failure_reports_error() {
    let dir = tempfile::tempdir().unwrap();
    let playlist = playlist_with(&dir, &["a"]).await;
    let jukebox = Jukebox::new(playlist, Arc::new(FakePlayer::failing()), settings());
    let mut events = jukebox.subscribe();
    let _running = start(&jukebox);

    match tokio::time::timeout(Duration::from_secs(2), events.recv()).await.unwrap().unwrap() {
        JukeboxEvent::Error(message) => assert!(message.contains("boom")),
        other => panic!("unexpected event {:?}", other),
    }
    assert_eq!(jukebox.state().await, PlaybackState::Stopped);
    assert!(!jukebox.is_active().await);
}

#[tokio::test]
async fn test_add_forwards_to_prefetch() {
    let dir = tempfile::tempdir().unwrap();
    let playlist: Arc<Playlist> = playlist_with(&dir, &[]).await;
    let (tx, mut rx) = mpsc::unbounded_channel();
    let jukebox = Jukebox::new(
        Arc::clone(&playlist),
        Arc::new(FakePlayer::default()),
        settings().with_prefetch(tx),
    );

    jukebox.apply(Intent::Add(entry("a"))).await;
    jukebox.apply(Intent::Add(QueueEntry::new("garbage", None))).await;

    assert_eq!(rx.recv().await, Some(local("a")));
    assert!(rx.try_recv().is_err());
    assert_eq!(playlist.length().await, 1);
}

#[tokio::test]
async fn test_queue_intents_reach_playlist() {
    let dir = tempfile::tempdir().unwrap();
    let playlist = playlist_with(&dir, &["a", "b", "c", "d"]).await;
    let jukebox = Jukebox::new(Arc::clone(&playlist), Arc::new(FakePlayer::default()), settings());

    jukebox.apply(Intent::Move { from: 0, to: 3 }).await;
    jukebox.apply(Intent::Delete(vec![0])).await;
    let raws: Vec<String> = playlist.list().await.iter().map(|e| e.raw().to_string()).collect();
    assert_eq!(raws, vec!["c", "d", "a"]);

    jukebox.apply(Intent::ToggleRandom).await;
    assert!(playlist.is_random().await);

    let mut events = jukebox.subscribe();
    jukebox.apply(Intent::Search("zzz".into())).await;
    assert!(matches!(events.try_recv(), Ok(JukeboxEvent::Error(_))));
}

/// Lecteur dont le lancement attend un signal du test
#[derive(Debug, Default)]
struct GatedPlayer {
    entered: Arc<Notify>,
    gate: Arc<Notify>,
    inner: FakePlayer,
}

#[async_trait::async_trait]
impl Player for GatedPlayer {
    fn name(&self) -> &str {
        "gated"
    }

    fn supported(&self) -> bool {
        true
    }

    async fn spawn(&self, source: &str, params: &[Param]) -> ymplayer::Result<PlayerHandle> {
        self.entered.notify_one();
        self.gate.notified().await;
        self.inner.spawn(source, params).await
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_stop_during_spawn_clears_current() {
    let dir = tempfile::tempdir().unwrap();
    let playlist = playlist_with(&dir, &["a", "b"]).await;
    let player = Arc::new(GatedPlayer::default());
    let jukebox = Jukebox::new(playlist, player.clone(), settings());
    let _running = start(&jukebox);

    player.entered.notified().await;
    let stopper = tokio::spawn({
        let jukebox = jukebox.clone();
        async move { jukebox.apply(Intent::Stop).await }
    });
    tokio::time::sleep(Duration::from_millis(20)).await;
    player.gate.notify_one();
    stopper.await.unwrap();

    eventually(|| async { jukebox.state().await == PlaybackState::Stopped }).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(jukebox.current().await, None);
    assert_eq!(jukebox.state().await, PlaybackState::Stopped);
    assert_eq!(player.inner.received(), vec![PlayerCommand::Stop]);
    assert_eq!(player.inner.spawned().len(), 1);
}
