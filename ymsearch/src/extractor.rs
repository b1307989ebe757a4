//! Extracteur externe (compatible `youtube-dl`)

use reqwest::Url;
use tokio::process::Command;
use tracing::debug;

use crate::{Info, Result, SearchError};

/// Programme externe chargé de résoudre les URLs de flux et les
/// métadonnées d'une page.
#[derive(Debug, Clone)]
pub struct Extractor {
    program: String,
}

impl Extractor {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// URLs de téléchargement de la meilleure piste audio, par ordre de
    /// préférence
    pub async fn download_urls(&self, page: &Url) -> Result<Vec<Url>> {
        let stdout = self.run(&["-g", "-f", "bestaudio", page.as_str()]).await?;
        let text = String::from_utf8_lossy(&stdout);

        let urls = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(|l| Url::parse(l).map_err(|e| SearchError::InvalidUrl(format!("{}: {}", l, e))))
            .collect::<Result<Vec<_>>>()?;

        debug!(page = %page, count = urls.len(), "Extractor resolved download urls");
        Ok(urls)
    }

    /// Métadonnées de la page
    pub async fn info(&self, page: &Url) -> Result<Info> {
        let stdout = self.run(&["-j", "--skip-download", page.as_str()]).await?;
        Info::from_extractor_json(page, &stdout)
    }

    async fn run(&self, args: &[&str]) -> Result<Vec<u8>> {
        let output = Command::new(&self.program)
            .args(args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| SearchError::Extractor(format!("{}: {}", self.program, e)))?;

        if !output.status.success() {
            return Err(SearchError::Extractor(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(output.stdout)
    }
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new("youtube-dl")
    }
}
