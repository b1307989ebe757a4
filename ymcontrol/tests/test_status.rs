mod common;

use common::{eventually, local, playlist_with, FakePlayer};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use ymcontrol::{status, Jukebox, JukeboxSettings, PlaybackState};
use ymsearch::Extractor;

fn jukebox(playlist: Arc<ymplaylist::Playlist>) -> Jukebox {
    let settings = JukeboxSettings::new(Arc::new(Extractor::new("/nonexistent/youtube-dl")));
    Jukebox::new(playlist, Arc::new(FakePlayer::default()), settings)
}

#[tokio::test]
async fn test_status_lines() {
    let dir = tempfile::tempdir().unwrap();
    let jukebox = jukebox(playlist_with(&dir, &[]).await);

    assert_eq!(
        jukebox.status_lines().await,
        vec![
            "volume: -1",
            "repeat: 0",
            "random: 0",
            "single: 0",
            "consume: 0",
            "playlist: 1",
            "playlistlength: 0",
            "mixrampdb: 0.000000",
            "state: stop",
        ]
    );
    assert!(jukebox.current_song_lines().await.is_none());
}

#[tokio::test]
async fn test_current_song_lines() {
    let dir = tempfile::tempdir().unwrap();
    let playlist = playlist_with(&dir, &["a", "b"]).await;
    let jukebox = jukebox(playlist);

    let (_intents, rx) = mpsc::channel(4);
    let cancel = CancellationToken::new();
    tokio::spawn({
        let jukebox = jukebox.clone();
        let cancel = cancel.clone();
        async move { jukebox.run(rx, cancel).await }
    });
    eventually(|| async { jukebox.current().await == Some(local("a")) }).await;

    let status = jukebox.status_lines().await;
    assert_eq!(status[6], "playlistlength: 2");
    assert_eq!(status[8], "state: play");
    assert_eq!(jukebox.state().await, PlaybackState::Playing);

    assert_eq!(
        jukebox.current_song_lines().await.unwrap(),
        vec![
            "file: file:///music/a.mp3",
            "Last-Modified: 1970-01-01 00:00:00 +0000 UTC",
            "Artist: -",
            "Title: a",
            "Track: 1",
            "Date: 1970",
            "Genre: -",
            "Composer: -",
            "Time: 0",
            "duration: 0.000",
            "Pos: 1",
            "Id: -",
        ]
    );
    cancel.cancel();
}

async fn read_available(stream: &mut TcpStream) -> String {
    let mut buf = vec![0u8; 4096];
    let n = tokio::time::timeout(std::time::Duration::from_secs(2), stream.read(&mut buf))
        .await
        .unwrap()
        .unwrap();
    String::from_utf8_lossy(&buf[..n]).into_owned()
}

#[tokio::test]
async fn test_serve_protocol() {
    let dir = tempfile::tempdir().unwrap();
    let jukebox = jukebox(playlist_with(&dir, &["a"]).await);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    let cancel = CancellationToken::new();
    let server = tokio::spawn(status::serve(listener, jukebox, cancel.clone()));

    let mut stream = TcpStream::connect(address).await.unwrap();

    // Ligne inconnue : pas de réponse, la requête suivante répond seule
    stream.write_all(b"hello\nstatus\n").await.unwrap();
    let response = read_available(&mut stream).await;
    assert!(response.starts_with("volume: -1\n"));
    assert!(response.ends_with("state: stop"));
    assert!(response.contains("playlistlength: 1"));

    stream.write_all(b"close\n").await.unwrap();
    let mut rest = Vec::new();
    stream.read_to_end(&mut rest).await.unwrap();
    assert!(rest.is_empty());

    cancel.cancel();
    server.await.unwrap().unwrap();
}
