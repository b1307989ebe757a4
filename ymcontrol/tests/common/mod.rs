#![allow(dead_code)]

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use ymplayer::{Param, Player, PlayerCommand, PlayerError, PlayerHandle};
use ymplaylist::{Playlist, QueueEntry};
use ymsearch::{MediaResult, RemoteResult};

/// Lecteur factice : enregistre les lancements et les commandes reçues
#[derive(Debug, Default)]
pub struct FakePlayer {
    pub spawns: Arc<Mutex<Vec<(String, Vec<Param>)>>>,
    pub commands: Arc<Mutex<Vec<PlayerCommand>>>,
    pub fail: bool,
}

impl FakePlayer {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn spawned(&self) -> Vec<(String, Vec<Param>)> {
        self.spawns.lock().unwrap().clone()
    }

    pub fn received(&self) -> Vec<PlayerCommand> {
        self.commands.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Player for FakePlayer {
    fn name(&self) -> &str {
        "fake"
    }

    fn supported(&self) -> bool {
        true
    }

    async fn spawn(&self, source: &str, params: &[Param]) -> ymplayer::Result<PlayerHandle> {
        if self.fail {
            return Err(PlayerError::Spawn {
                program: "fake".into(),
                source: std::io::Error::other("boom"),
            });
        }
        self.spawns
            .lock()
            .unwrap()
            .push((source.to_string(), params.to_vec()));

        let (commands, mut rx) = mpsc::channel(8);
        let log = Arc::clone(&self.commands);
        let wait = tokio::spawn(async move {
            while let Some(command) = rx.recv().await {
                log.lock().unwrap().push(command);
                if matches!(
                    command,
                    PlayerCommand::Stop | PlayerCommand::Next | PlayerCommand::Prev
                ) {
                    break;
                }
            }
        });
        Ok(PlayerHandle { commands, wait })
    }
}

pub fn local(name: &str) -> MediaResult {
    RemoteResult::parse(&format!("file:///music/{name}.mp3"), Some(name))
        .unwrap()
        .into()
}

pub fn entry(name: &str) -> QueueEntry {
    QueueEntry::new(name, Some(local(name)))
}

pub async fn playlist_with(dir: &tempfile::TempDir, names: &[&str]) -> Arc<Playlist> {
    let playlist = Arc::new(Playlist::new(dir.path().join("playlist")));
    for name in names {
        playlist.add(entry(name)).await;
    }
    playlist
}

/// Attend que `check` soit vrai (2 s maximum)
pub async fn eventually<F, Fut>(mut check: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !check().await {
        assert!(tokio::time::Instant::now() < deadline, "condition not reached in time");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
