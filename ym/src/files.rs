//! Export du cache : un lien physique par morceau en cache, nommé d'après
//! son titre

use anyhow::{Context, Result};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use ymcache::Cache;
use ymsearch::MediaResult;
use ymutils::clean_file_name;

/// Bilan d'un export
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LinkReport {
    /// Liens créés ou déjà présents
    pub linked: Vec<PathBuf>,
    /// Résultats absents du cache
    pub missing: usize,
}

/// Nom du lien : titre nettoyé plus l'extension du fichier en cache
pub fn link_name(title: &str, cached: &Path) -> String {
    let mut name = clean_file_name(title);
    if name.is_empty() {
        name = "untitled".to_string();
    }
    match cached.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{}.{}", name, ext),
        None => name,
    }
}

/// Lie chaque résultat en cache dans `target`
///
/// Un lien déjà existant est conservé. `progress(fait, total)` est appelé
/// après chaque lien.
pub async fn link_cached<F>(
    cache: &Cache,
    results: &[MediaResult],
    target: &Path,
    mut progress: F,
) -> Result<LinkReport>
where
    F: FnMut(usize, usize),
{
    tokio::fs::create_dir_all(target)
        .await
        .with_context(|| format!("Failed to create {}", target.display()))?;

    let mut report = LinkReport::default();
    for result in results {
        let Some(cached) = cache.get(result.id()).await else {
            debug!(title = %result.title(), "Not cached, skipped");
            report.missing += 1;
            continue;
        };

        let link = target.join(link_name(result.title(), cached.path()));
        match tokio::fs::hard_link(cached.path(), &link).await {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                debug!(link = %link.display(), "Link already present");
            }
            Err(e) => {
                warn!(source = %cached.path().display(), link = %link.display(), error = %e, "Hard link failed");
                return Err(e).with_context(|| format!("Failed to link {}", link.display()));
            }
        }

        report.linked.push(link);
        progress(report.linked.len(), results.len());
    }
    Ok(report)
}
