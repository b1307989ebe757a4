//! Entrée de la file de lecture

use ymsearch::MediaResult;

/// Une case de la file : le texte brut saisi et le résultat éventuellement lié
///
/// Une entrée sans résultat est inerte : elle occupe une position mais n'est
/// jamais rendue par [`crate::Playlist::read`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueEntry {
    raw: String,
    result: Option<MediaResult>,
}

impl QueueEntry {
    pub fn new(raw: impl Into<String>, result: Option<MediaResult>) -> Self {
        Self {
            raw: raw.into(),
            result,
        }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn result(&self) -> Option<&MediaResult> {
        self.result.as_ref()
    }

    pub fn is_playable(&self) -> bool {
        self.result.is_some()
    }

    /// Les commandes préfixées par `!` sont jouées avec la vidéo
    pub fn wants_video(&self) -> bool {
        self.raw.starts_with('!')
    }
}
