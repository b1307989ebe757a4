//! # ymutils - Petits utilitaires partagés
//!
//! - [`base36`] / [`time_suffix`] : suffixes uniques des fichiers temporaires
//! - [`clean_file_name`] : nom de fichier sûr à partir d'un titre

use std::time::{SystemTime, UNIX_EPOCH};

const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Écriture en base 36, chiffres minuscules
pub fn base36(mut n: u128) -> String {
    let mut out = vec![DIGITS[(n % 36) as usize]];
    n /= 36;
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}

/// Horloge courante en nanosecondes, en base 36
pub fn time_suffix() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    base36(nanos)
}

/// Remplace chaque suite de caractères interdits dans un nom de fichier
/// (`\ / : * ? " < > |` et NUL) par `-`, puis retire les `-` aux extrémités
pub fn clean_file_name(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    let mut in_run = false;
    for c in title.chars() {
        if matches!(c, '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0') {
            if !in_run {
                out.push('-');
                in_run = true;
            }
        } else {
            out.push(c);
            in_run = false;
        }
    }
    out.trim_matches('-').to_string()
}
