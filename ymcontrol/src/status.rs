//! Répondeur de statut
//!
//! Protocole ligne à ligne sur TCP, compatible avec les clients de statut
//! MPD les plus simples :
//! - `status` : longueur de la file et état de lecture
//! - `currentsong` : morceau courant (rien s'il n'y en a pas)
//! - `close` : ferme la connexion
//!
//! Les réponses sont jointes par `\n`, sans saut de ligne final. Une ligne
//! inconnue ne reçoit aucune réponse.

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::{Jukebox, Result};

/// Écoute `address` et sert chaque connexion dans sa propre tâche
pub async fn listen(address: &str, jukebox: Jukebox, cancel: CancellationToken) -> Result<()> {
    let listener = TcpListener::bind(address).await?;
    serve(listener, jukebox, cancel).await
}

/// Sert les connexions de `listener` jusqu'à `cancel`
pub async fn serve(listener: TcpListener, jukebox: Jukebox, cancel: CancellationToken) -> Result<()> {
    info!(address = ?listener.local_addr().ok(), "Status responder listening");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            accepted = listener.accept() => {
                let (stream, peer) = accepted?;
                debug!(%peer, "Status client connected");
                let jukebox = jukebox.clone();
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, jukebox).await {
                        debug!(%peer, error = %e, "Status connection closed");
                    }
                });
            }
        }
    }
}

async fn handle_connection(stream: TcpStream, jukebox: Jukebox) -> std::io::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines.next_line().await? {
        let response = match line.trim_end_matches('\r') {
            "close" => break,
            "status" => Some(jukebox.status_lines().await),
            "currentsong" => jukebox.current_song_lines().await,
            _ => None,
        };

        if let Some(response) = response.filter(|r| !r.is_empty()) {
            writer.write_all(response.join("\n").as_bytes()).await?;
            writer.flush().await?;
        }
    }

    writer.shutdown().await
}
