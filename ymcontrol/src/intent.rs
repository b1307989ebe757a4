//! Intentions utilisateur décodées

use ymplaylist::QueueEntry;

/// Commande utilisateur déjà décodée
///
/// Les indices sont en base 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    // File de lecture
    Add(QueueEntry),
    Delete(Vec<usize>),
    Move { from: usize, to: usize },
    Scroll(isize),
    ScrollTo(isize),
    ResetScroll,
    Search(String),
    ToggleRandom,
    /// Positionne le curseur puis passe au morceau visé
    Jump(usize),
    Clear,

    // Lecture
    Next(usize),
    Prev(usize),
    Pause,
    Stop,
    SeekForward,
    SeekBack,
    VolumeUp,
    VolumeDown,
}
