//! Préchargement du cache pour toute la playlist
//!
//! Usage : `ym-cache [workers] [config_dir]`
//!
//! `workers` vaut par défaut le nombre de cœurs disponibles.

use anyhow::{bail, Result};
use futures_util::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{info, warn};
use ym::setup::{init_logging, open_cache, open_playlist};
use ymcache::ProgressFn;
use ymconfig::Config;
use ymcontrol::prefetch::prefetch;
use ymsearch::Extractor;

enum Outcome {
    Downloaded,
    Cached,
    Failed,
}

#[tokio::main]
async fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let workers = match args.next() {
        Some(raw) => match raw.parse::<usize>() {
            Ok(n) if n > 0 => n,
            _ => bail!("workers must be a positive integer, got {}", raw),
        },
        None => std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1),
    };

    let config = Config::load_config(&args.next().unwrap_or_default())?;
    init_logging(&config.get_log_level()?);

    let cache = open_cache(&config)?;
    let playlist = open_playlist(&config).await?;
    let extractor = Arc::new(Extractor::new(config.get_extractor()?));
    let preflights = config.get_preflights()?;
    let client = reqwest::Client::new();

    let results = playlist.result_list().await;
    let total = results.len();
    info!(total, workers, "Prefetching playlist");

    let outcomes: Vec<Outcome> = stream::iter(results.into_iter().enumerate())
        .map(|(index, result)| {
            let cache = Arc::clone(&cache);
            let extractor = Arc::clone(&extractor);
            let client = client.clone();
            async move {
                let label = format!("[{}/{}] {}", index + 1, total, result.title());
                match prefetch(&cache, &extractor, &client, preflights, &result, Some(progress(label.clone()))).await {
                    Ok(Some(file)) => {
                        println!("{}: done ({})", label, file.path().display());
                        Outcome::Downloaded
                    }
                    Ok(None) => Outcome::Cached,
                    Err(e) => {
                        warn!(title = %result.title(), error = %e, "Prefetch failed");
                        eprintln!("{}: {}", label, e);
                        Outcome::Failed
                    }
                }
            }
        })
        .buffer_unordered(workers)
        .collect()
        .await;

    let count = |wanted: fn(&Outcome) -> bool| outcomes.iter().filter(|o| wanted(o)).count();
    let downloaded = count(|o| matches!(o, Outcome::Downloaded));
    let cached = count(|o| matches!(o, Outcome::Cached));
    let failed = count(|o| matches!(o, Outcome::Failed));

    println!(
        "done: {} downloaded, {} already cached, {} failed",
        downloaded, cached, failed
    );
    if failed > 0 {
        bail!("{} of {} downloads failed", failed, total);
    }
    Ok(())
}

/// Ligne de progression ; la cadence est fixée par le cache
fn progress(label: String) -> ProgressFn {
    Arc::new(move |written: u64, total: u64| {
        if total > 0 {
            println!("{}: {:.1}% ({}/{} bytes)", label, written as f64 * 100.0 / total as f64, written, total);
        } else {
            println!("{}: {} bytes", label, written);
        }
    })
}
