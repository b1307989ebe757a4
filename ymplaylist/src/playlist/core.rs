//! PlaylistCore : file ordonnée, curseur et fenêtre d'affichage
//!
//! Toute la logique de curseur vit ici, sans verrou ni asynchronisme ;
//! [`super::Playlist`] l'enveloppe dans un `RwLock`.

use crate::QueueEntry;
use rand::Rng;
use std::sync::Arc;
use ymsearch::MediaResult;

/// Nature d'une modification, pour les observateurs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaylistEvent {
    /// Contenu ou curseur modifié (à sauvegarder)
    Changed,
    /// Seule la fenêtre d'affichage a bougé
    View,
}

/// Noyau de la playlist (structure interne protégée par RwLock)
#[derive(Debug, Default)]
pub struct PlaylistCore {
    pub(crate) entries: Vec<Arc<QueueEntry>>,
    /// Prochaine position lue
    pub(crate) cursor: usize,
    /// Position de la dernière entrée rendue par `take`
    pub(crate) played: Option<usize>,
    pub(crate) scroll: isize,
    pub(crate) scrolled: bool,
    pub(crate) random: bool,
    pub(crate) dirty: bool,
    pub(crate) revision: u64,
}

/// Position de `i` après déplacement de `from` vers `to`
fn moved_index(i: usize, from: usize, to: usize) -> usize {
    if i == from {
        to
    } else if from < i && i <= to {
        i - 1
    } else if to <= i && i < from {
        i + 1
    } else {
        i
    }
}

impl PlaylistCore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Marque une modification structurelle
    pub(crate) fn touch(&mut self) {
        self.dirty = true;
        self.revision = self.revision.wrapping_add(1);
    }

    /// Prochaine position lue
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Index de l'entrée en cours de lecture
    pub fn index(&self) -> Option<usize> {
        if self.random {
            self.played
        } else {
            self.cursor.checked_sub(1)
        }
    }

    pub fn push(&mut self, entry: QueueEntry) -> bool {
        if !entry.is_playable() {
            return false;
        }
        self.entries.push(Arc::new(entry));
        self.touch();
        true
    }

    /// Rend l'entrée au curseur et avance ; `None` si la file est épuisée
    pub fn take(&mut self) -> Option<(usize, Arc<QueueEntry>)> {
        while self.cursor < self.entries.len() {
            let index = self.cursor;
            self.cursor += 1;
            self.touch();

            let entry = Arc::clone(&self.entries[index]);
            if !entry.is_playable() {
                continue;
            }

            self.played = Some(index);
            if self.random {
                self.cursor = rand::rng().random_range(0..self.entries.len());
            }
            return Some((index, entry));
        }
        None
    }

    pub fn at(&self, index: usize) -> Option<Arc<QueueEntry>> {
        self.entries.get(index).cloned()
    }

    pub fn results(&self) -> Vec<MediaResult> {
        self.entries
            .iter()
            .filter_map(|e| e.result().cloned())
            .collect()
    }

    /// Supprime un lot d'indices ; retourne le nombre d'entrées supprimées
    pub fn delete(&mut self, indices: &[usize]) -> usize {
        let mut indices = indices.to_vec();
        indices.sort_unstable();
        indices.dedup();

        let mut removed = 0;
        for &i in indices.iter().rev() {
            if i >= self.entries.len() {
                continue;
            }
            if i < self.cursor {
                self.cursor -= 1;
            }
            self.played = match self.played {
                Some(p) if p == i => None,
                Some(p) if p > i => Some(p - 1),
                other => other,
            };
            self.entries.remove(i);
            removed += 1;
        }

        if removed > 0 {
            self.touch();
        }
        removed
    }

    /// Déplace une entrée ; le curseur garde la même prochaine entrée
    pub fn move_entry(&mut self, from: usize, to: usize) -> bool {
        let len = self.entries.len();
        if from == to || from >= len || to >= len {
            return false;
        }

        let entry = self.entries.remove(from);
        self.entries.insert(to, entry);

        // L'entrée au curseur reste la prochaine rendue
        if from < self.cursor && to >= self.cursor {
            self.cursor -= 1;
        } else if from >= self.cursor && to < self.cursor {
            self.cursor += 1;
        }

        self.played = self.played.map(|p| moved_index(p, from, to));
        self.touch();
        true
    }

    pub fn next(&mut self, n: usize) -> bool {
        if n <= 1 {
            return false;
        }
        self.cursor = (self.cursor + n - 1).min(self.entries.len() + 1);
        self.touch();
        true
    }

    /// Recule de `n` pas ; un lecteur suspendu compte pour un pas
    pub fn prev(&mut self, n: usize, reader_waiting: bool) {
        let len = self.entries.len() as isize;
        let mut n = n as isize;
        let mut cursor = self.cursor as isize;

        if reader_waiting {
            cursor = (len - 1).max(0);
            n -= 1;
        }

        if n > 0 {
            if cursor <= len {
                cursor -= 1;
            }
            cursor -= n;
        }

        self.cursor = cursor.clamp(0, len) as usize;
        self.touch();
    }

    pub fn set_index(&mut self, index: usize) {
        self.cursor = index.min(self.entries.len());
        self.touch();
    }

    pub fn set_random(&mut self, random: bool) -> bool {
        if self.random == random {
            return false;
        }
        self.random = random;

        let len = self.entries.len();
        if random {
            if len > 0 {
                self.cursor = rand::rng().random_range(0..len);
            }
        } else if let Some(played) = self.played {
            self.cursor = (played + 1).min(len);
        }
        self.touch();
        true
    }

    pub fn truncate(&mut self) {
        self.entries.clear();
        self.cursor = 0;
        self.played = None;
        self.scroll = 0;
        self.scrolled = false;
        self.touch();
    }

    fn clamp_scroll(&self, value: isize) -> isize {
        let len = self.entries.len() as isize;
        value.clamp(-len, len)
    }

    pub fn scroll(&mut self, delta: isize) -> bool {
        if delta == 0 {
            return false;
        }
        self.scrolled = true;
        self.scroll = self.clamp_scroll(self.scroll.saturating_add(delta));
        true
    }

    pub fn scroll_to(&mut self, index: isize) {
        self.scrolled = true;
        self.scroll = self.clamp_scroll(index);
    }

    pub fn reset_scroll(&mut self) {
        self.scroll = 0;
        self.scrolled = false;
    }

    /// Cherche `query` dans les titres et positionne la fenêtre sur la
    /// `offset`-ième occurrence (la première si elle n'existe pas)
    pub fn search(&mut self, query: &str, offset: &mut usize) -> bool {
        let query = query.to_lowercase();
        let matches: Vec<usize> = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| {
                e.result()
                    .is_some_and(|r| r.title().to_lowercase().contains(&query))
            })
            .map(|(i, _)| i)
            .collect();

        let Some(&first) = matches.first() else {
            return false;
        };

        let target = match matches.get(*offset) {
            Some(&i) => i,
            None => {
                *offset = 0;
                first
            }
        };
        *offset += 1;

        self.scroll_to(target as isize);
        true
    }

    /// Fenêtre d'au plus `amount` résultats autour de l'entrée courante
    ///
    /// Retourne `(premier index, index courant relatif, résultats)`. Le début
    /// de fenêtre calculé devient la nouvelle position de défilement.
    pub fn surrounding(&mut self, amount: usize) -> (usize, isize, Vec<MediaResult>) {
        let len = self.entries.len() as isize;
        let size = amount as isize;
        let half = size / 2;
        let active = self.index().unwrap_or(0) as isize;

        let mut offset = if self.scrolled { self.scroll } else { active - half };
        if offset + half >= len - half {
            offset = len - size;
        }
        if offset < 0 {
            offset = 0;
        }
        self.scroll = offset;

        let first = offset as usize;
        let mut results = Vec::with_capacity(amount);
        if amount > 0 {
            for entry in self.entries.iter().skip(first) {
                if let Some(result) = entry.result() {
                    results.push(result.clone());
                    if results.len() == amount {
                        break;
                    }
                }
            }
        }

        (first, active - offset, results)
    }

    /// Remplace tout l'état par un contenu chargé
    pub(crate) fn replace(&mut self, cursor: usize, entries: Vec<QueueEntry>) {
        self.entries = entries.into_iter().map(Arc::new).collect();
        self.cursor = cursor.min(self.entries.len());
        self.played = None;
        self.scroll = 0;
        self.scrolled = false;
        self.dirty = false;
        self.revision = self.revision.wrapping_add(1);
    }
}
