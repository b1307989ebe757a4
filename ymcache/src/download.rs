//! Téléchargement en streaming vers un fichier temporaire
//!
//! Le flux HTTP est écrit soit directement, soit à travers un
//! [`StreamTransformer`] fourni par un [`Transcoder`]. La progression est
//! remontée par un callback `(écrit, total)` dont la cadence est bornée.

use futures_util::{Future, StreamExt};
use std::path::Path;
use std::pin::Pin;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::{CacheError, Result};

/// Type pour une fonction de transformation de stream
///
/// La fonction reçoit:
/// - La réponse HTTP dont le corps doit être consommé
/// - Le fichier temporaire où écrire les données transformées
/// - Un callback recevant le nombre cumulé d'octets source lus
pub type StreamTransformer = Box<
    dyn FnOnce(
            reqwest::Response,
            tokio::fs::File,
            Arc<dyn Fn(u64) + Send + Sync>,
        ) -> Pin<Box<dyn Future<Output = std::result::Result<(), String>> + Send>>
        + Send,
>;

/// Fabrique de transformers, un par téléchargement
pub type StreamTransformerFactory = Arc<dyn Fn() -> StreamTransformer + Send + Sync>;

/// Callback de progression : `(octets écrits, total attendu)`
pub type ProgressFn = Arc<dyn Fn(u64, u64) + Send + Sync>;

/// Transformation appliquée aux téléchargements avant publication
///
/// L'extension du transcoder remplace celle déclarée par l'entrée.
#[derive(Clone)]
pub struct Transcoder {
    extension: String,
    factory: StreamTransformerFactory,
}

impl Transcoder {
    pub fn new(extension: impl Into<String>, factory: StreamTransformerFactory) -> Self {
        Self {
            extension: extension.into(),
            factory,
        }
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub(crate) fn transformer(&self) -> StreamTransformer {
        (self.factory)()
    }
}

impl std::fmt::Debug for Transcoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transcoder")
            .field("extension", &self.extension)
            .finish_non_exhaustive()
    }
}

/// Transcoder passant le flux par l'entrée/sortie standard d'un programme externe
///
/// # Exemple
///
/// ```rust,no_run
/// use ymcache::command_transcoder;
///
/// let aac = command_transcoder(
///     "ffmpeg",
///     ["-i", "-", "-vn", "-acodec", "copy", "-f", "adts", "-"],
///     "aac",
/// );
/// assert_eq!(aac.extension(), "aac");
/// ```
pub fn command_transcoder<I, S>(program: impl Into<String>, args: I, extension: impl Into<String>) -> Transcoder
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let program: String = program.into();
    let args: Vec<String> = args.into_iter().map(Into::into).collect();

    let factory: StreamTransformerFactory = Arc::new(move || {
        let program = program.clone();
        let args = args.clone();
        let transformer: StreamTransformer = Box::new(
            move |response: reqwest::Response,
                  mut file: tokio::fs::File,
                  progress: Arc<dyn Fn(u64) + Send + Sync>| {
                Box::pin(async move {
                    let mut child = tokio::process::Command::new(&program)
                        .args(&args)
                        .stdin(Stdio::piped())
                        .stdout(Stdio::piped())
                        .stderr(Stdio::null())
                        .kill_on_drop(true)
                        .spawn()
                        .map_err(|e| format!("failed to spawn {}: {}", program, e))?;

                    let mut stdin = child
                        .stdin
                        .take()
                        .ok_or_else(|| format!("{}: stdin not captured", program))?;
                    let mut stdout = child
                        .stdout
                        .take()
                        .ok_or_else(|| format!("{}: stdout not captured", program))?;

                    let feed = async move {
                        let mut stream = response.bytes_stream();
                        let mut read = 0u64;
                        while let Some(chunk) = stream.next().await {
                            let chunk = chunk.map_err(|e| e.to_string())?;
                            stdin.write_all(&chunk).await.map_err(|e| e.to_string())?;
                            read += chunk.len() as u64;
                            progress(read);
                        }
                        // stdin est fermé en sortant du bloc
                        Ok::<(), String>(())
                    };
                    let drain = async {
                        tokio::io::copy(&mut stdout, &mut file)
                            .await
                            .map_err(|e| e.to_string())
                    };

                    if let Err(e) = tokio::try_join!(feed, drain) {
                        let _ = child.kill().await;
                        return Err(e);
                    }

                    let status = child.wait().await.map_err(|e| e.to_string())?;
                    if !status.success() {
                        return Err(format!("{} exited with {}", program, status));
                    }

                    file.flush().await.map_err(|e| e.to_string())?;
                    Ok::<(), String>(())
                }) as Pin<Box<dyn Future<Output = std::result::Result<(), String>> + Send>>
            },
        );
        transformer
    });

    Transcoder::new(extension, factory)
}

/// Limiteur de cadence des notifications de progression
///
/// - la première mise à jour est toujours notifiée
/// - `written` ne décroît jamais
/// - `total` est corrigé à la hausse s'il est dépassé
/// - [`ProgressThrottle::finish`] notifie toujours avec `written == total`
pub(crate) struct ProgressThrottle {
    callback: Option<ProgressFn>,
    interval: Duration,
    last: Option<Instant>,
    written: u64,
    total: u64,
}

impl ProgressThrottle {
    pub(crate) fn new(callback: Option<ProgressFn>, interval: Duration) -> Self {
        Self {
            callback,
            interval,
            last: None,
            written: 0,
            total: 0,
        }
    }

    pub(crate) fn set_total(&mut self, total: Option<u64>) {
        if let Some(total) = total {
            self.total = total.max(self.written);
        }
    }

    pub(crate) fn update(&mut self, written: u64) {
        if written < self.written {
            return;
        }
        self.written = written;
        if self.total < written {
            self.total = written;
        }

        let due = self.last.is_none_or(|t| t.elapsed() >= self.interval);
        if due {
            self.last = Some(Instant::now());
            self.emit();
        }
    }

    pub(crate) fn finish(&mut self) {
        self.total = self.written;
        self.emit();
    }

    fn emit(&self) {
        if let Some(callback) = &self.callback {
            callback(self.written, self.total);
        }
    }
}

fn lock(throttle: &Mutex<ProgressThrottle>) -> std::sync::MutexGuard<'_, ProgressThrottle> {
    throttle.lock().unwrap_or_else(|e| e.into_inner())
}

/// Télécharge `url` dans `dest`, éventuellement à travers `transformer`
///
/// Retourne le nombre d'octets source lus.
pub(crate) async fn fetch(
    client: &reqwest::Client,
    url: &reqwest::Url,
    dest: &Path,
    transformer: Option<StreamTransformer>,
    throttle: Arc<Mutex<ProgressThrottle>>,
) -> Result<u64> {
    let response = client.get(url.clone()).send().await?;

    let status = response.status();
    if !status.is_success() {
        return Err(CacheError::Status {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }

    lock(&throttle).set_total(response.content_length());
    debug!(url = %url, length = ?response.content_length(), dest = %dest.display(), "Download started");

    let mut file = tokio::fs::File::create(dest).await?;

    match transformer {
        Some(transformer) => {
            let progress_throttle = Arc::clone(&throttle);
            let progress: Arc<dyn Fn(u64) + Send + Sync> =
                Arc::new(move |read| lock(&progress_throttle).update(read));

            transformer(response, file, progress)
                .await
                .map_err(CacheError::Transform)?;
        }
        None => {
            let mut stream = response.bytes_stream();
            let mut read = 0u64;
            while let Some(chunk) = stream.next().await {
                let chunk = chunk?;
                file.write_all(&chunk).await?;
                read += chunk.len() as u64;
                lock(&throttle).update(read);
            }
            file.flush().await?;
            file.sync_all().await?;
        }
    }

    let mut throttle = lock(&throttle);
    throttle.finish();
    Ok(throttle.written)
}
