//! Vérification de disponibilité des URLs candidates

use reqwest::Url;
use tracing::debug;

use crate::{Result, SearchError};

/// Retourne la première URL qui répond 2xx à une requête `HEAD`
///
/// Au plus `max_tries` candidates sont essayées, dans l'ordre fourni.
pub async fn find_live_url(client: &reqwest::Client, urls: &[Url], max_tries: usize) -> Result<Url> {
    for url in urls.iter().take(max_tries) {
        match client.head(url.clone()).send().await {
            Ok(response) if response.status().is_success() => return Ok(url.clone()),
            Ok(response) => {
                debug!(url = %url, status = %response.status(), "Candidate url rejected");
            }
            Err(e) => {
                debug!(url = %url, error = %e, "Candidate url unreachable");
            }
        }
    }

    Err(SearchError::NoSuitableUrl)
}
