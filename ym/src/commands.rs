//! Décodage des commandes texte
//!
//! | ligne              | effet                                   |
//! |--------------------|-----------------------------------------|
//! | `:next [n]`        | passe `n` morceaux                      |
//! | `:prev [n]`        | revient `n` morceaux en arrière         |
//! | `:pause`, `:stop`  | pause/reprise, arrêt                    |
//! | `:clear`           | vide la file                            |
//! | `:rand`            | bascule le mode aléatoire               |
//! | `:delete 1,3-5`    | supprime des entrées (base 1)           |
//! | `:move a b`        | déplace l'entrée `a` en `b` (base 1)    |
//! | `:scroll [n]`      | décale la fenêtre, recentre sans `n`    |
//! | `:jump n`          | joue l'entrée `n` (base 1)              |
//! | `:vol +n`/`:vol -n`| volume                                  |
//! | `[`, `]`           | recul, avance                           |
//! | `/texte`           | recherche                               |
//! | `add <url> [titre]`| ajoute une URL, `!` en tête garde la vidéo |
//! | `:exit`            | quitte                                  |

use anyhow::{anyhow, bail, Context, Result};
use std::collections::BTreeSet;
use ymcontrol::Intent;
use ymplaylist::QueueEntry;
use ymsearch::RemoteResult;

/// Plus grande position acceptée (base 1)
pub const MAX_POSITION: usize = 100_000;

/// Plus grand nombre de pas de volume par commande
pub const MAX_VOLUME_STEPS: u32 = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Intents(Vec<Intent>),
    Exit,
}

impl From<Intent> for Command {
    fn from(intent: Intent) -> Self {
        Command::Intents(vec![intent])
    }
}

/// Décode une ligne ; `None` pour une ligne vide
pub fn decode(line: &str) -> Result<Option<Command>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    match line {
        "[" => return Ok(Some(Intent::SeekBack.into())),
        "]" => return Ok(Some(Intent::SeekForward.into())),
        _ => {}
    }

    if let Some(query) = line.strip_prefix('/') {
        return Ok(Some(Intent::Search(query.trim().to_string()).into()));
    }

    if let Some(rest) = line.strip_prefix("add ") {
        return add(rest.trim()).map(|i| Some(i.into()));
    }

    let Some(command) = line.strip_prefix(':') else {
        bail!("Unknown command: {}", line);
    };
    let (name, arg) = match command.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (command, ""),
    };

    let decoded = match name {
        "exit" | "quit" => Command::Exit,
        "next" => Intent::Next(count(arg)?).into(),
        "prev" => Intent::Prev(count(arg)?).into(),
        "pause" => Intent::Pause.into(),
        "stop" => Intent::Stop.into(),
        "clear" => Intent::Clear.into(),
        "rand" => Intent::ToggleRandom.into(),
        "delete" | "del" => Intent::Delete(indices(arg)?).into(),
        "move" => {
            let mut parts = arg.split_whitespace();
            let (Some(from), Some(to), None) = (parts.next(), parts.next(), parts.next()) else {
                bail!(":move expects two positions");
            };
            Intent::Move {
                from: position(from)?,
                to: position(to)?,
            }
            .into()
        }
        "scroll" if arg.is_empty() => Intent::ResetScroll.into(),
        "scroll" => Intent::Scroll(arg.parse().with_context(|| format!("Invalid scroll amount: {}", arg))?).into(),
        "jump" => Intent::Jump(position(arg)?).into(),
        "vol" => volume(arg)?,
        _ => bail!("Unknown command: :{}", name),
    };
    Ok(Some(decoded))
}

fn add(rest: &str) -> Result<Intent> {
    let (raw_url, title) = match rest.split_once(char::is_whitespace) {
        Some((url, title)) => (url, Some(title.trim())),
        None => (rest, None),
    };
    if raw_url.is_empty() {
        bail!("add expects an URL");
    }

    let url = raw_url.strip_prefix('!').unwrap_or(raw_url);
    let result = RemoteResult::parse(url, title.filter(|t| !t.is_empty()))?;
    Ok(Intent::Add(QueueEntry::new(rest, Some(result.into()))))
}

fn count(arg: &str) -> Result<usize> {
    if arg.is_empty() {
        return Ok(1);
    }
    match arg.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => bail!("Invalid count: {}", arg),
    }
}

/// Position en base 1 convertie en base 0
fn position(arg: &str) -> Result<usize> {
    match arg.parse::<usize>() {
        Ok(n) if n > 0 && n <= MAX_POSITION => Ok(n - 1),
        _ => bail!("Invalid position: {}", arg),
    }
}

/// Liste `1,3-5` en indices base 0, triés et sans doublon
fn indices(arg: &str) -> Result<Vec<usize>> {
    let mut out = BTreeSet::new();
    for part in arg.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        match part.split_once('-') {
            Some((start, end)) => {
                let (start, end) = (position(start.trim())?, position(end.trim())?);
                if start > end {
                    bail!("Invalid range: {}", part);
                }
                out.extend(start..=end);
            }
            None => {
                out.insert(position(part)?);
            }
        }
    }
    if out.is_empty() {
        return Err(anyhow!(":delete expects positions"));
    }
    Ok(out.into_iter().collect())
}

fn volume(arg: &str) -> Result<Command> {
    let steps: i32 = arg
        .parse()
        .with_context(|| format!("Invalid volume step: {}", arg))?;
    if steps.unsigned_abs() > MAX_VOLUME_STEPS {
        bail!("Volume step out of range: {} (max {})", arg, MAX_VOLUME_STEPS);
    }
    let intent = if steps >= 0 {
        Intent::VolumeUp
    } else {
        Intent::VolumeDown
    };
    Ok(Command::Intents(vec![intent; steps.unsigned_abs() as usize]))
}
