//! # ym - Jukebox en ligne de commande
//!
//! Assemblage des crates ym à partir de la configuration :
//! - [`setup`] : journalisation, cache, playlist et lecteur
//! - [`commands`] : décodage des commandes texte lues sur stdin
//! - [`files`] : export du cache en liens physiques

pub mod commands;
pub mod files;
pub mod setup;
