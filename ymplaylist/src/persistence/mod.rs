//! Format de sauvegarde de la playlist
//!
//! ```text
//! [cursor: u32 LE][0x0A][JSON: [{"raw", "result_type", "result"}, ...]]
//! ```
//!
//! `result_type` est vide pour une entrée sans résultat ; sinon c'est
//! l'étiquette du [`MediaResult`] et `result` sa charge utile.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use ymsearch::MediaResult;

use crate::{PlaylistError, QueueEntry, Result};

const HEADER_LEN: usize = 5;
const SENTINEL: u8 = 0x0A;

#[derive(Debug, Serialize, Deserialize)]
struct StoredEntry {
    raw: String,
    #[serde(default)]
    result_type: String,
    #[serde(default)]
    result: String,
}

impl StoredEntry {
    fn from_entry(entry: &QueueEntry) -> Result<Self> {
        let (result_type, result) = match entry.result() {
            Some(r) => (r.type_tag().to_string(), r.marshal()?),
            None => (String::new(), String::new()),
        };
        Ok(Self {
            raw: entry.raw().to_string(),
            result_type,
            result,
        })
    }

    fn into_entry(self) -> Result<QueueEntry> {
        let result = if self.result_type.is_empty() {
            None
        } else {
            Some(MediaResult::unmarshal(&self.result_type, &self.result)?)
        };
        Ok(QueueEntry::new(self.raw, result))
    }
}

/// Sérialise le curseur brut et la liste
pub fn encode(cursor: usize, entries: &[Arc<QueueEntry>]) -> Result<Vec<u8>> {
    let cursor = u32::try_from(cursor)
        .map_err(|_| PlaylistError::Persistence(format!("cursor {} does not fit in u32", cursor)))?;

    let stored = entries
        .iter()
        .map(|e| StoredEntry::from_entry(e))
        .collect::<Result<Vec<_>>>()?;

    let mut out = Vec::with_capacity(HEADER_LEN + 64 * stored.len());
    out.extend_from_slice(&cursor.to_le_bytes());
    out.push(SENTINEL);
    serde_json::to_writer(&mut out, &stored)
        .map_err(|e| PlaylistError::Persistence(format!("Failed to encode playlist: {}", e)))?;
    Ok(out)
}

/// Désérialise un enregistrement ; toute étiquette inconnue est une erreur
pub fn decode(bytes: &[u8]) -> Result<(usize, Vec<QueueEntry>)> {
    if bytes.len() < HEADER_LEN || bytes[HEADER_LEN - 1] != SENTINEL {
        return Err(PlaylistError::Persistence("Malformed playlist header".into()));
    }

    let mut cursor = [0u8; 4];
    cursor.copy_from_slice(&bytes[..4]);
    let cursor = u32::from_le_bytes(cursor) as usize;

    let stored: Vec<StoredEntry> = serde_json::from_slice(&bytes[HEADER_LEN..])
        .map_err(|e| PlaylistError::Persistence(format!("Failed to decode playlist: {}", e)))?;

    let entries = stored
        .into_iter()
        .map(StoredEntry::into_entry)
        .collect::<Result<Vec<_>>>()
        .map_err(|e| PlaylistError::Persistence(e.to_string()))?;

    Ok((cursor, entries))
}
