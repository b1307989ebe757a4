//! Lie physiquement chaque morceau en cache de la playlist dans un
//! répertoire
//!
//! Usage : `ym-files <répertoire> [config_dir]`

use anyhow::{bail, Result};
use std::io::Write;
use std::path::PathBuf;
use tracing::info;
use ym::files::link_cached;
use ym::setup::{init_logging, open_cache, open_playlist};
use ymconfig::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let target = match args.next() {
        Some(arg) if arg == "-h" || arg == "--help" => {
            println!("Hardlink all cached items to the provided directory");
            return Ok(());
        }
        Some(arg) => PathBuf::from(arg),
        None => bail!("Specify a directory to hardlink cached items to."),
    };

    let config = Config::load_config(&args.next().unwrap_or_default())?;
    init_logging(&config.get_log_level()?);

    let cache = open_cache(&config)?;
    let playlist = open_playlist(&config).await?;
    let results = playlist.result_list().await;
    info!(target = %target.display(), total = results.len(), "Linking cached items");

    let report = link_cached(&cache, &results, &target, |done, total| {
        print!("\r{}/{}", done, total);
        let _ = std::io::stdout().flush();
    })
    .await?;

    println!(
        "\ndone: {} linked, {} not cached",
        report.linked.len(),
        report.missing
    );
    Ok(())
}
