//! Métadonnées descriptives d'un résultat

use chrono::{DateTime, NaiveDate, Utc};
use reqwest::Url;
use serde::Deserialize;
use std::time::Duration;

use crate::{Result, SearchError};

/// Informations descriptives d'un résultat jouable
#[derive(Debug, Clone, PartialEq)]
pub struct Info {
    pub id: String,
    pub page_url: Url,
    pub title: String,
    pub author: String,
    pub created: DateTime<Utc>,
    pub duration: Duration,
}

impl Info {
    /// Date de création au format historique du protocole de statut
    /// (`2019-05-01 00:00:00 +0000 UTC`)
    pub fn created_string(&self) -> String {
        self.created.format("%Y-%m-%d %H:%M:%S %z UTC").to_string()
    }

    /// Construit un `Info` depuis la sortie JSON (`-j`) de l'extracteur
    pub(crate) fn from_extractor_json(page_url: &Url, raw: &[u8]) -> Result<Self> {
        let parsed: ExtractorInfo = serde_json::from_slice(raw)
            .map_err(|e| SearchError::Extractor(format!("invalid info json: {}", e)))?;

        let created = parsed
            .upload_date
            .as_deref()
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y%m%d").ok())
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc())
            .unwrap_or_default();

        let duration = parsed
            .duration
            .filter(|d| d.is_finite() && *d >= 0.0)
            .map(Duration::from_secs_f64)
            .unwrap_or_default();

        Ok(Self {
            id: parsed.id,
            page_url: page_url.clone(),
            title: parsed.title,
            author: parsed.uploader.unwrap_or_else(|| "-".to_string()),
            created,
            duration,
        })
    }
}

#[derive(Debug, Deserialize)]
struct ExtractorInfo {
    id: String,
    title: String,
    #[serde(default)]
    uploader: Option<String>,
    #[serde(default)]
    upload_date: Option<String>,
    #[serde(default)]
    duration: Option<f64>,
}
