//! Résultats jouables
//!
//! Chaque variante de [`MediaResult`] porte sa propre étiquette et son propre
//! format de charge utile. L'ensemble des étiquettes est fermé : ajouter une
//! variante revient à ajouter une étiquette, le format des variantes
//! existantes ne change pas.

use reqwest::Url;
use std::time::Duration;

use crate::{Extractor, Info, Result, SearchError};

/// Étiquette des résultats YouTube
pub const YOUTUBE_TAG: &str = "youtube";
/// Étiquette des résultats pointant directement vers une URL
pub const REMOTE_TAG: &str = "remote";

const YOUTUBE_WATCH_URL: &str = "https://youtube.com/watch";

/// Vidéo YouTube, résolue via l'extracteur externe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YoutubeResult {
    id: String,
    title: String,
}

impl YoutubeResult {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
        }
    }

    pub fn page_url(&self) -> Result<Url> {
        Url::parse_with_params(YOUTUBE_WATCH_URL, &[("v", self.id.as_str())])
            .map_err(|e| SearchError::InvalidUrl(format!("{}?v={}: {}", YOUTUBE_WATCH_URL, self.id, e)))
    }
}

/// Média accessible directement par une URL (http(s) ou fichier)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteResult {
    url: Url,
    title: String,
}

impl RemoteResult {
    pub fn new(url: Url, title: impl Into<String>) -> Self {
        Self {
            url,
            title: title.into(),
        }
    }

    /// Parse une URL ; le titre par défaut est le dernier segment du chemin
    pub fn parse(raw: &str, title: Option<&str>) -> Result<Self> {
        let url = Url::parse(raw).map_err(|e| SearchError::InvalidUrl(format!("{}: {}", raw, e)))?;
        let title = match title {
            Some(t) if !t.trim().is_empty() => t.trim().to_string(),
            _ => url
                .path_segments()
                .and_then(|mut s| s.next_back())
                .filter(|s| !s.is_empty())
                .unwrap_or(raw)
                .to_string(),
        };
        Ok(Self { url, title })
    }
}

/// Résultat jouable lié à une entrée de la playlist
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaResult {
    Youtube(YoutubeResult),
    Remote(RemoteResult),
}

impl MediaResult {
    /// Identifiant stable (clé du cache)
    pub fn id(&self) -> &str {
        match self {
            MediaResult::Youtube(r) => &r.id,
            MediaResult::Remote(r) => r.url.as_str(),
        }
    }

    pub fn title(&self) -> &str {
        match self {
            MediaResult::Youtube(r) => &r.title,
            MediaResult::Remote(r) => &r.title,
        }
    }

    pub fn page_url(&self) -> Result<Url> {
        match self {
            MediaResult::Youtube(r) => r.page_url(),
            MediaResult::Remote(r) => Ok(r.url.clone()),
        }
    }

    pub fn type_tag(&self) -> &'static str {
        match self {
            MediaResult::Youtube(_) => YOUTUBE_TAG,
            MediaResult::Remote(_) => REMOTE_TAG,
        }
    }

    /// Sérialise la charge utile : tableau JSON `[id_ou_url, titre]`
    pub fn marshal(&self) -> Result<String> {
        let pair = match self {
            MediaResult::Youtube(r) => [r.id.as_str(), r.title.as_str()],
            MediaResult::Remote(r) => [r.url.as_str(), r.title.as_str()],
        };
        serde_json::to_string(&pair).map_err(|e| SearchError::InvalidPayload(e.to_string()))
    }

    /// Reconstruit un résultat depuis son étiquette et sa charge utile
    pub fn unmarshal(tag: &str, payload: &str) -> Result<Self> {
        let pair: Vec<String> = serde_json::from_str(payload)
            .map_err(|e| SearchError::InvalidPayload(format!("{}: {}", tag, e)))?;

        let [first, title]: [String; 2] = pair.try_into().map_err(|v: Vec<String>| {
            SearchError::InvalidPayload(format!("{}: expected 2 fields, got {}", tag, v.len()))
        })?;

        match tag {
            YOUTUBE_TAG => Ok(MediaResult::Youtube(YoutubeResult::new(first, title))),
            REMOTE_TAG => {
                let url = Url::parse(&first)
                    .map_err(|e| SearchError::InvalidUrl(format!("{}: {}", first, e)))?;
                Ok(MediaResult::Remote(RemoteResult::new(url, title)))
            }
            other => Err(SearchError::UnknownResultType(other.to_string())),
        }
    }

    /// URLs de téléchargement, la meilleure en premier
    pub async fn download_urls(&self, extractor: &Extractor) -> Result<Vec<Url>> {
        match self {
            MediaResult::Youtube(r) => extractor.download_urls(&r.page_url()?).await,
            MediaResult::Remote(r) => Ok(vec![r.url.clone()]),
        }
    }

    /// Métadonnées descriptives
    pub async fn info(&self, extractor: &Extractor) -> Result<Info> {
        match self {
            MediaResult::Youtube(r) => extractor.info(&r.page_url()?).await,
            MediaResult::Remote(r) => Ok(Info {
                id: r.url.to_string(),
                page_url: r.url.clone(),
                title: r.title.clone(),
                author: "-".to_string(),
                created: Default::default(),
                duration: Duration::ZERO,
            }),
        }
    }
}

impl From<YoutubeResult> for MediaResult {
    fn from(value: YoutubeResult) -> Self {
        MediaResult::Youtube(value)
    }
}

impl From<RemoteResult> for MediaResult {
    fn from(value: RemoteResult) -> Self {
        MediaResult::Remote(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_youtube_payload_format() {
        let r = MediaResult::from(YoutubeResult::new("dQw4w9WgXcQ", "Never \"Gonna\""));
        assert_eq!(r.type_tag(), "youtube");
        assert_eq!(r.marshal().unwrap(), r#"["dQw4w9WgXcQ","Never \"Gonna\""]"#);
        assert_eq!(r.page_url().unwrap().as_str(), "https://youtube.com/watch?v=dQw4w9WgXcQ");

        let back = MediaResult::unmarshal("youtube", &r.marshal().unwrap()).unwrap();
        assert_eq!(back, r);
    }

    #[test]
    fn test_youtube_page_url_encodes_id() {
        let r = YoutubeResult::new("a b&c", "title");
        assert_eq!(r.page_url().unwrap().as_str(), "https://youtube.com/watch?v=a+b%26c");
    }

    #[test]
    fn test_remote_result() {
        let r = MediaResult::from(RemoteResult::parse("http://host/music/track.mp3", None).unwrap());
        assert_eq!(r.id(), "http://host/music/track.mp3");
        assert_eq!(r.title(), "track.mp3");

        let back = MediaResult::unmarshal(REMOTE_TAG, &r.marshal().unwrap()).unwrap();
        assert_eq!(back, r);
    }

    #[test]
    fn test_unknown_tag_is_rejected() {
        let err = MediaResult::unmarshal("soundcloud", r#"["a","b"]"#).unwrap_err();
        assert!(matches!(err, SearchError::UnknownResultType(t) if t == "soundcloud"));
    }

    #[test]
    fn test_malformed_payload_is_rejected() {
        assert!(matches!(
            MediaResult::unmarshal(YOUTUBE_TAG, r#"["only-one"]"#),
            Err(SearchError::InvalidPayload(_))
        ));
        assert!(matches!(
            MediaResult::unmarshal(YOUTUBE_TAG, "not json"),
            Err(SearchError::InvalidPayload(_))
        ));
    }

    #[tokio::test]
    async fn test_remote_download_urls_do_not_need_extractor() {
        let r = MediaResult::from(RemoteResult::parse("http://host/a.ogg", Some("A")).unwrap());
        let extractor = Extractor::new("/nonexistent/extractor");
        let urls = r.download_urls(&extractor).await.unwrap();
        assert_eq!(urls, vec![Url::parse("http://host/a.ogg").unwrap()]);

        let info = r.info(&extractor).await.unwrap();
        assert_eq!(info.title, "A");
    }
}
