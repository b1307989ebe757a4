//! Lecteur piloté par son entrée standard

use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::{Param, Player, PlayerCommand, PlayerError, PlayerHandle, Result};

const COMMAND_BUFFER: usize = 8;

const KEY_RIGHT: &[u8] = b"\x1b[C";
const KEY_LEFT: &[u8] = b"\x1b[D";

/// Programme externe : arguments fixes, arguments par option, et séquences
/// d'octets écrites sur stdin pour chaque commande
///
/// `Stop`, `Next` et `Prev` terminent le processus.
#[derive(Debug, Clone)]
pub struct GenericPlayer {
    program: String,
    args: Vec<String>,
    params: HashMap<Param, Vec<String>>,
    keys: HashMap<PlayerCommand, Vec<u8>>,
}

impl GenericPlayer {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            params: HashMap::new(),
            keys: HashMap::new(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_param<I, S>(mut self, param: Param, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.params
            .insert(param, args.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_key(mut self, command: PlayerCommand, bytes: impl Into<Vec<u8>>) -> Self {
        self.keys.insert(command, bytes.into());
        self
    }

    fn with_terminal_keys(self) -> Self {
        self.with_key(PlayerCommand::Pause, " ")
            .with_key(PlayerCommand::SeekForward, KEY_RIGHT)
            .with_key(PlayerCommand::SeekBack, KEY_LEFT)
            .with_key(PlayerCommand::VolumeUp, "0")
            .with_key(PlayerCommand::VolumeDown, "9")
    }

    pub fn mpv() -> Self {
        Self::new("mpv")
            .with_args(["--input-terminal", "--terminal"])
            .with_param(Param::NoVideo, ["--no-video"])
            .with_param(Param::Silent, ["--really-quiet"])
            .with_terminal_keys()
    }

    pub fn mplayer() -> Self {
        Self::new("mplayer")
            .with_param(Param::NoVideo, ["-vo", "null"])
            .with_param(Param::Silent, ["-really-quiet"])
            .with_terminal_keys()
    }

    pub fn ffplay() -> Self {
        Self::new("ffplay")
            .with_args(["-autoexit"])
            .with_param(Param::NoVideo, ["-vn", "-nodisp"])
            .with_param(Param::Silent, ["-loglevel", "quiet"])
            .with_terminal_keys()
    }

    /// Préréglage par nom (`mpv`, `mplayer`, `ffplay`)
    pub fn preset(name: &str) -> Option<Self> {
        match name {
            "mpv" => Some(Self::mpv()),
            "mplayer" => Some(Self::mplayer()),
            "ffplay" => Some(Self::ffplay()),
            _ => None,
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Ligne de commande complète pour `source`
    pub fn command_line(&self, source: &str, params: &[Param]) -> Vec<String> {
        let mut args = self.args.clone();
        for param in params {
            if let Some(extra) = self.params.get(param) {
                args.extend(extra.iter().cloned());
            }
        }
        args.push(source.to_string());
        args
    }
}

fn on_path(program: &str) -> bool {
    let candidate = Path::new(program);
    if candidate.components().count() > 1 {
        return candidate.is_file();
    }

    std::env::var_os("PATH")
        .map(|paths| std::env::split_paths(&paths).any(|dir| dir.join(program).is_file()))
        .unwrap_or(false)
}

#[async_trait::async_trait]
impl Player for GenericPlayer {
    fn name(&self) -> &str {
        &self.program
    }

    fn supported(&self) -> bool {
        on_path(&self.program)
    }

    async fn spawn(&self, source: &str, params: &[Param]) -> Result<PlayerHandle> {
        let args = self.command_line(source, params);
        debug!(program = %self.program, ?args, "Spawning player");

        let mut child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| PlayerError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let mut stdin = child.stdin.take();
        let keys = self.keys.clone();
        let program = self.program.clone();
        let (commands, mut rx) = mpsc::channel(COMMAND_BUFFER);

        let wait = tokio::spawn(async move {
            loop {
                tokio::select! {
                    status = child.wait() => {
                        match status {
                            Ok(status) => debug!(program = %program, %status, "Player exited"),
                            Err(e) => warn!(program = %program, error = %e, "Failed to wait for player"),
                        }
                        break;
                    }
                    command = rx.recv() => match command {
                        None | Some(PlayerCommand::Stop | PlayerCommand::Next | PlayerCommand::Prev) => {
                            debug!(program = %program, ?command, "Terminating player");
                            if let Err(e) = child.kill().await {
                                warn!(program = %program, error = %e, "Failed to kill player");
                            }
                            break;
                        }
                        Some(command) => {
                            let (Some(bytes), Some(pipe)) = (keys.get(&command), stdin.as_mut()) else {
                                continue;
                            };
                            let written = async {
                                pipe.write_all(bytes).await?;
                                pipe.flush().await
                            }
                            .await;
                            if let Err(e) = written {
                                debug!(program = %program, ?command, error = %e, "Player stdin closed");
                                stdin = None;
                            }
                        }
                    }
                }
            }
        });

        Ok(PlayerHandle { commands, wait })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_line() {
        let mpv = GenericPlayer::mpv();
        assert_eq!(
            mpv.command_line("/tmp/a.m4a", &[Param::Silent, Param::NoVideo]),
            vec!["--input-terminal", "--terminal", "--really-quiet", "--no-video", "/tmp/a.m4a"]
        );

        let ffplay = GenericPlayer::ffplay();
        assert_eq!(
            ffplay.command_line("http://x/y", &[Param::Silent]),
            vec!["-autoexit", "-loglevel", "quiet", "http://x/y"]
        );
    }

    #[test]
    fn test_presets() {
        for name in ["mpv", "mplayer", "ffplay"] {
            let player = GenericPlayer::preset(name).unwrap();
            assert_eq!(player.program(), name);
            assert_eq!(player.keys.get(&PlayerCommand::Pause).unwrap(), b" ");
        }
        assert!(GenericPlayer::preset("vlc").is_none());
    }

    #[test]
    fn test_on_path() {
        assert!(!on_path("definitely-not-a-real-player-binary"));
        assert!(!on_path("/nonexistent/dir/player"));
    }
}
