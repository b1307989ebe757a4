mod common;

use common::local;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use ymcache::{Cache, CacheSettings, ProgressFn};
use ymcontrol::prefetch::{fill_cache, prefetch};
use ymcontrol::JukeboxEvent;
use ymsearch::{Extractor, MediaResult, RemoteResult};

fn cache(dir: &tempfile::TempDir) -> Arc<Cache> {
    Arc::new(Cache::new(CacheSettings::new(dir.path().join("downloads"), dir.path().join("tmp"))).unwrap())
}

fn remote(server: &MockServer, name: &str) -> MediaResult {
    RemoteResult::parse(&format!("{}/{}", server.uri(), name), None)
        .unwrap()
        .into()
}

#[tokio::test]
async fn test_prefetch_downloads_once() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/song.ogg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![7u8; 2048]))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let cache = cache(&dir);
    let extractor = Extractor::new("/nonexistent/youtube-dl");
    let client = reqwest::Client::new();
    let result = remote(&server, "song.ogg");

    let last = Arc::new(AtomicU64::new(0));
    let progress: ProgressFn = {
        let last = Arc::clone(&last);
        Arc::new(move |written: u64, _total: u64| last.store(written, Ordering::SeqCst))
    };

    let file = prefetch(&cache, &extractor, &client, 3, &result, Some(progress))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(std::fs::read(file.path()).unwrap().len(), 2048);
    assert_eq!(file.path().extension().unwrap(), "mp4");
    assert_eq!(last.load(Ordering::SeqCst), 2048);

    let again = prefetch(&cache, &extractor, &client, 3, &result, None).await.unwrap();
    assert!(again.is_none());
}

#[tokio::test]
async fn test_prefetch_skips_local_files() {
    let dir = tempfile::tempdir().unwrap();
    let cache = cache(&dir);
    let extractor = Extractor::new("/nonexistent/youtube-dl");

    let skipped = prefetch(&cache, &extractor, &reqwest::Client::new(), 3, &local("a"), None)
        .await
        .unwrap();
    assert!(skipped.is_none());
    assert!(cache.get(local("a").id()).await.is_none());
}

#[tokio::test]
async fn test_fill_cache_reports_failures() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/gone.ogg"))
        .respond_with(ResponseTemplate::new(410))
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ok".to_vec()))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let cache = cache(&dir);
    let (tx, rx) = mpsc::unbounded_channel();
    let (events, mut errors) = broadcast::channel(8);
    let cancel = CancellationToken::new();

    let task = tokio::spawn(fill_cache(
        Arc::clone(&cache),
        Arc::new(Extractor::new("/nonexistent/youtube-dl")),
        2,
        rx,
        Some(events),
        cancel.clone(),
    ));

    let gone = remote(&server, "gone.ogg");
    let good = remote(&server, "good.ogg");
    tx.send(gone).unwrap();
    tx.send(good.clone()).unwrap();

    match tokio::time::timeout(Duration::from_secs(2), errors.recv()).await.unwrap().unwrap() {
        JukeboxEvent::Error(message) => assert!(message.starts_with("gone.ogg:")),
        other => panic!("unexpected event {:?}", other),
    }

    drop(tx);
    task.await.unwrap();
    assert!(cache.get(good.id()).await.is_some());
}
