//! Démon jukebox : lit des commandes sur stdin, joue la playlist et répond
//! aux requêtes de statut
//!
//! Usage : `ym [config_dir]`

use anyhow::Result;
use std::io::BufRead;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use ym::commands::{decode, Command};
use ym::setup::{init_logging, open_cache, open_playlist, select_player};
use ymconfig::Config;
use ymcontrol::prefetch::fill_cache;
use ymcontrol::{status, Intent, Jukebox, JukeboxEvent, JukeboxSettings};
use ymplaylist::Playlist;
use ymsearch::Extractor;

const INTENT_BUFFER: usize = 32;

#[tokio::main]
async fn main() -> Result<()> {
    let directory = std::env::args().nth(1).unwrap_or_default();
    let config = Config::load_config(&directory)?;
    init_logging(&config.get_log_level()?);

    let cache = open_cache(&config)?;
    let playlist = open_playlist(&config).await?;
    let player = select_player(&config)?;
    let extractor = Arc::new(Extractor::new(config.get_extractor()?));
    let preflights = config.get_preflights()?;

    let cancel = CancellationToken::new();
    let (prefetch_tx, prefetch_rx) = mpsc::unbounded_channel();
    for result in playlist.result_list().await {
        let _ = prefetch_tx.send(result);
    }

    let settings = JukeboxSettings::new(Arc::clone(&extractor))
        .with_preflights(preflights)
        .with_cache(Arc::clone(&cache))
        .with_prefetch(prefetch_tx);
    let jukebox = Jukebox::new(Arc::clone(&playlist), player, settings);

    tokio::spawn(fill_cache(
        Arc::clone(&cache),
        extractor,
        preflights,
        prefetch_rx,
        Some(jukebox.events()),
        cancel.clone(),
    ));

    let address = config.get_status_address()?;
    tokio::spawn({
        let jukebox = jukebox.clone();
        let cancel = cancel.clone();
        async move {
            if let Err(e) = status::listen(&address, jukebox, cancel).await {
                error!(address = %address, error = %e, "Status responder failed");
            }
        }
    });

    tokio::spawn(autosave(Arc::clone(&playlist), config.get_save_interval()?, cancel.clone()));
    tokio::spawn(display(jukebox.subscribe()));

    let (intents_tx, intents_rx) = mpsc::channel(INTENT_BUFFER);
    // `intents_tx` reste vivant jusqu'à la fin : la boucle de commandes
    // survit à la fermeture de stdin.
    spawn_stdin_reader(intents_tx.clone(), cancel.clone());

    let runner = tokio::spawn({
        let jukebox = jukebox.clone();
        let cancel = cancel.clone();
        async move { jukebox.run(intents_rx, cancel).await }
    });

    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("Ctrl+C received, shutting down"),
        _ = cancel.cancelled() => info!("Exit requested"),
    }
    cancel.cancel();

    if let Err(e) = runner.await {
        warn!(error = %e, "Jukebox task failed");
    }
    playlist.save(true).await?;
    info!("Bye");
    Ok(())
}

/// Sauvegarde périodique, seulement si la playlist a changé
async fn autosave(playlist: Arc<Playlist>, every: std::time::Duration, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(every);
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = ticker.tick() => {
                if let Err(e) = playlist.save(true).await {
                    warn!(error = %e, "Periodic playlist save failed, will retry");
                }
            }
        }
    }
}

/// Affiche les changements d'état sur la sortie standard
async fn display(mut events: tokio::sync::broadcast::Receiver<JukeboxEvent>) {
    use tokio::sync::broadcast::error::RecvError;

    loop {
        match events.recv().await {
            Ok(JukeboxEvent::Status(state)) => println!("[{}]", state.label()),
            Ok(JukeboxEvent::Current(Some(result))) => println!("> {}", result.title()),
            Ok(JukeboxEvent::Current(None)) => {}
            Ok(JukeboxEvent::Error(message)) => eprintln!("error: {}", message),
            Err(RecvError::Lagged(skipped)) => warn!(skipped, "Display lagging behind events"),
            Err(RecvError::Closed) => return,
        }
    }
}

/// Lit stdin dans un thread dédié, hors du runtime
///
/// La fin de stdin désactive les commandes sans arrêter le démon.
fn spawn_stdin_reader(intents: mpsc::Sender<Intent>, cancel: CancellationToken) {
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    warn!(error = %e, "Failed to read stdin");
                    return;
                }
            };

            match decode(&line) {
                Ok(None) => {}
                Ok(Some(Command::Exit)) => {
                    cancel.cancel();
                    return;
                }
                Ok(Some(Command::Intents(decoded))) => {
                    for intent in decoded {
                        if intents.blocking_send(intent).is_err() {
                            return;
                        }
                    }
                }
                Err(e) => eprintln!("{}", e),
            }
        }
        info!("stdin closed, commands disabled");
    });
}
