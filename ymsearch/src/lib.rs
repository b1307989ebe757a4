//! # ymsearch - Résultats jouables
//!
//! Cette crate définit le contrat entre le moteur de recherche (externe) et le
//! reste du jukebox :
//! - [`MediaResult`] : type somme fermé des résultats connus, chacun avec son
//!   propre format de sérialisation (étiquette + charge utile)
//! - [`Info`] : métadonnées descriptives d'un résultat
//! - [`Extractor`] : programme externe résolvant les URLs de téléchargement
//! - [`find_live_url`] : sélection de la première URL candidate qui répond
//!
//! La recherche elle-même (scraping, classement) reste hors de cette crate.

mod error;
mod extractor;
mod info;
mod preflight;
mod result;

pub use error::{Result, SearchError};
pub use extractor::Extractor;
pub use info::Info;
pub use preflight::find_live_url;
pub use result::{MediaResult, RemoteResult, YoutubeResult, REMOTE_TAG, YOUTUBE_TAG};

/// Ré-export du type d'URL utilisé dans toute l'API
pub use reqwest::Url;
