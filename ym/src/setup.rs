//! Construction des composants à partir de [`Config`]

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use ymcache::{command_transcoder, Cache, CacheSettings};
use ymconfig::Config;
use ymplayer::{find_supported_player, GenericPlayer, Player};
use ymplaylist::Playlist;

/// Installe le subscriber `fmt` sur stderr
///
/// `RUST_LOG` prime sur le niveau configuré.
pub fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}

/// Ouvre le cache de téléchargement, avec transcodeur si configuré
pub fn open_cache(config: &Config) -> Result<Arc<Cache>> {
    let mut settings = CacheSettings::new(config.get_cache_dir()?, config.get_temp_dir()?)
        .with_progress_interval(config.get_progress_interval()?);

    if let Some(transcoder) = config.get_transcoder()? {
        info!(program = %transcoder.program, extension = %transcoder.extension, "Cache transcoder enabled");
        settings = settings.with_transcoder(command_transcoder(
            transcoder.program,
            transcoder.args,
            transcoder.extension,
        ));
    }

    let cache = Cache::new(settings).context("Failed to open download cache")?;
    Ok(Arc::new(cache))
}

/// Charge la playlist persistée
///
/// Un fichier absent donne une playlist vide ; un fichier illisible est
/// une erreur.
pub async fn open_playlist(config: &Config) -> Result<Arc<Playlist>> {
    let file = config.get_playlist_file()?;
    let playlist = Playlist::new(&file);

    if tokio::fs::try_exists(&file).await.unwrap_or(false) {
        playlist
            .load()
            .await
            .with_context(|| format!("Failed to load playlist {}", file.display()))?;
    } else {
        info!(file = %file.display(), "No saved playlist, starting empty");
    }

    Ok(Arc::new(playlist))
}

/// Premier lecteur configuré présent sur la machine
pub fn select_player(config: &Config) -> Result<Arc<dyn Player>> {
    let players: Vec<Arc<dyn Player>> = config
        .get_players()?
        .iter()
        .filter_map(|name| match GenericPlayer::preset(name) {
            Some(player) => Some(Arc::new(player) as Arc<dyn Player>),
            None => {
                warn!(player = %name, "Unknown player preset, ignored");
                None
            }
        })
        .collect();

    let player = find_supported_player(players)?;
    info!(player = %player.name(), "Player selected");
    Ok(player)
}
