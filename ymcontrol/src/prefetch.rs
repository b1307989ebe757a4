//! Remplissage du cache en tâche de fond

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use ymcache::{Cache, CacheEntry, CachedFile, ProgressFn};
use ymsearch::{find_live_url, Extractor, MediaResult};

use crate::{JukeboxEvent, Result};

/// Extension déclarée quand aucun transcoder n'impose la sienne
pub const DEFAULT_EXTENSION: &str = "mp4";

/// Télécharge `result` s'il n'est pas déjà en cache
///
/// Retourne `None` si le fichier était déjà présent ou local.
pub async fn prefetch(
    cache: &Cache,
    extractor: &Extractor,
    client: &reqwest::Client,
    preflights: usize,
    result: &MediaResult,
    progress: Option<ProgressFn>,
) -> Result<Option<CachedFile>> {
    if cache.get(result.id()).await.is_some() {
        return Ok(None);
    }

    let urls = result.download_urls(extractor).await?;
    if urls.first().is_some_and(|u| u.scheme() == "file") {
        return Ok(None);
    }
    let url = find_live_url(client, &urls, preflights).await?;
    let entry = CacheEntry::new(result.id(), DEFAULT_EXTENSION, Some(url));

    let file = match progress {
        Some(progress) => cache.set_progress(&entry, move |w, t| progress(w, t)).await?,
        None => cache.set(&entry).await?,
    };
    Ok(Some(file))
}

/// Consomme les résultats reçus et les met en cache un par un
///
/// Les erreurs sont publiées sur `events` sans interrompre la boucle.
pub async fn fill_cache(
    cache: Arc<Cache>,
    extractor: Arc<Extractor>,
    preflights: usize,
    mut results: mpsc::UnboundedReceiver<MediaResult>,
    events: Option<tokio::sync::broadcast::Sender<JukeboxEvent>>,
    cancel: CancellationToken,
) {
    let client = reqwest::Client::new();
    info!("Cache filler started");

    loop {
        let result = tokio::select! {
            _ = cancel.cancelled() => break,
            result = results.recv() => match result {
                Some(result) => result,
                None => break,
            },
        };

        match prefetch(&cache, &extractor, &client, preflights, &result, None).await {
            Ok(Some(file)) => debug!(title = %result.title(), path = %file.path().display(), "Prefetched"),
            Ok(None) => {}
            Err(e) => {
                warn!(title = %result.title(), error = %e, "Prefetch failed");
                if let Some(events) = &events {
                    let _ = events.send(JukeboxEvent::Error(format!("{}: {}", result.title(), e)));
                }
            }
        }
    }

    info!("Cache filler stopped");
}
