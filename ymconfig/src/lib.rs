//! # ymconfig - Configuration de ym
//!
//! Ce module gère la configuration du jukebox :
//! - Chargement depuis un fichier YAML (`config.yaml`)
//! - Fusion avec la configuration par défaut embarquée
//! - Surcharges par variables d'environnement (`YM_CONFIG__SECTION__CLE`)
//! - Accesseurs typés pour chaque valeur
//!
//! Contrairement à une configuration globale, un [`Config`] est une valeur
//! explicite : le binaire la charge une fois puis transmet les valeurs utiles
//! aux constructeurs (cache, playlist, orchestrateur).
//!
//! ## Utilisation
//!
//! ```no_run
//! use ymconfig::Config;
//!
//! let config = Config::load_config("")?;
//! let preflights = config.get_preflights()?;
//! let cache_dir = config.get_cache_dir()?;
//! # Ok::<(), anyhow::Error>(())
//! ```

use anyhow::{anyhow, Result};
use dirs::home_dir;
use serde_yaml::{Mapping, Number, Value};
use std::{
    env, fs,
    path::{Path, PathBuf},
    sync::Mutex,
    time::Duration,
};
use tracing::info;

// Configuration par défaut intégrée
const DEFAULT_CONFIG: &str = include_str!("ym.yaml");

const ENV_CONFIG_DIR: &str = "YM_CONFIG";
const ENV_PREFIX: &str = "YM_CONFIG__";

const DEFAULT_PROGRESS_INTERVAL_MS: usize = 3000;
const DEFAULT_SAVE_INTERVAL_SECS: usize = 5;
const DEFAULT_PREFLIGHTS: usize = 10;
const DEFAULT_STATUS_ADDRESS: &str = "127.0.0.1:6600";
const DEFAULT_EXTRACTOR: &str = "youtube-dl";
const DEFAULT_LOG_LEVEL: &str = "info";

/// Macro to generate getter/setter for usize values with default
macro_rules! impl_usize_config {
    ($getter:ident, $setter:ident, $path:expr, $default:expr) => {
        pub fn $getter(&self) -> Result<usize> {
            match self.get_value($path) {
                Ok(Value::Number(n)) => Ok(n.as_u64().map(|v| v as usize).unwrap_or($default)),
                Ok(Value::String(s)) => Ok(s.trim().parse().unwrap_or($default)),
                Ok(_) | Err(_) => Ok($default),
            }
        }

        pub fn $setter(&self, value: usize) -> Result<()> {
            self.set_value($path, Value::Number(Number::from(value)))
        }
    };
}

/// Macro to generate getter/setter for string values with default
macro_rules! impl_string_config {
    ($getter:ident, $setter:ident, $path:expr, $default:expr) => {
        pub fn $getter(&self) -> Result<String> {
            match self.get_value($path) {
                Ok(Value::String(s)) if !s.trim().is_empty() => Ok(s),
                _ => Ok($default.to_string()),
            }
        }

        pub fn $setter(&self, value: String) -> Result<()> {
            self.set_value($path, Value::String(value))
        }
    };
}

/// Paramètres d'un transcodeur externe (ex: ffmpeg)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscoderSettings {
    pub program: String,
    pub args: Vec<String>,
    pub extension: String,
}

/// Gestionnaire de configuration de ym
///
/// Les données sont conservées sous forme d'arbre YAML ; les accesseurs
/// typés appliquent les valeurs par défaut quand une clé manque ou est mal
/// formée.
#[derive(Debug)]
pub struct Config {
    config_dir: PathBuf,
    path: PathBuf,
    data: Mutex<Value>,
}

impl Config {
    /// Finds a config directory by trying different locations in order
    fn find_config_dir(directory: &str) -> PathBuf {
        // 1. Répertoire fourni
        if !directory.is_empty() {
            return PathBuf::from(directory);
        }

        // 2. Variable d'environnement
        if let Ok(env_path) = env::var(ENV_CONFIG_DIR) {
            info!(env_var = ENV_CONFIG_DIR, path = %env_path, "Trying to load config from env");
            return PathBuf::from(env_path);
        }

        // 3. Répertoire courant
        if Path::new(".ym").exists() {
            return PathBuf::from(".ym");
        }

        // 4. Répertoire personnel
        if let Some(home) = home_dir() {
            return home.join(".ym");
        }

        PathBuf::from(".ym")
    }

    /// Validates and prepares a config directory
    fn validate_config_dir(path: &Path) -> Result<()> {
        if !path.exists() {
            fs::create_dir_all(path)?;
        }

        if !path.is_dir() {
            return Err(anyhow!(
                "Le chemin spécifié n'est pas un répertoire: {}",
                path.display()
            ));
        }

        let test_file = path.join(".write_test");
        fs::write(&test_file, b"test")?;
        fs::remove_file(&test_file)?;

        Ok(())
    }

    /// Loads the configuration from the specified directory
    ///
    /// 1. Détermine le répertoire de configuration
    /// 2. Charge la configuration par défaut embarquée
    /// 3. La fusionne avec `config.yaml` s'il existe
    /// 4. Applique les surcharges d'environnement
    /// 5. Sauvegarde le résultat
    pub fn load_config(directory: &str) -> Result<Self> {
        let config_dir = Self::find_config_dir(directory);
        Self::validate_config_dir(&config_dir)?;
        info!(config_dir = %config_dir.display(), "Using config directory");

        let path = config_dir.join("config.yaml");

        let mut config_value: Value = serde_yaml::from_str(DEFAULT_CONFIG)?;

        match fs::read(&path) {
            Ok(data) => {
                info!(config_file = %path.display(), "Loaded config file");
                let external: Value = serde_yaml::from_slice(&data)?;
                merge_yaml(&mut config_value, &external);
            }
            Err(_) => {
                info!(config_file = %path.display(), "Config file not found, using default embedded config");
            }
        }

        let mut config_value = lower_keys_value(config_value);
        apply_env_overrides(&mut config_value);

        let config = Config {
            config_dir,
            path,
            data: Mutex::new(config_value),
        };

        config.save()?;
        Ok(config)
    }

    /// Répertoire de configuration effectif
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Saves the current configuration to the config.yaml file
    pub fn save(&self) -> Result<()> {
        let yaml = {
            let data = self.data.lock().unwrap_or_else(|e| e.into_inner());
            serde_yaml::to_string(&*data)?
        };
        fs::write(&self.path, yaml)?;
        Ok(())
    }

    /// Sets a configuration value at the specified path and saves it
    pub fn set_value(&self, path: &[&str], value: Value) -> Result<()> {
        {
            let mut data = self.data.lock().unwrap_or_else(|e| e.into_inner());
            set_value_internal(&mut data, path, value)?;
        }
        self.save()
    }

    /// Gets a configuration value at the specified path
    pub fn get_value(&self, path: &[&str]) -> Result<Value> {
        let data = self.data.lock().unwrap_or_else(|e| e.into_inner());
        get_value_internal(&data, path)
    }

    /// Résout un chemin relatif au répertoire de configuration
    fn resolve_path(&self, raw: &str) -> PathBuf {
        let path = Path::new(raw);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.config_dir.join(path)
        }
    }

    /// Résout un répertoire et le crée si nécessaire
    fn resolve_and_create_dir(&self, raw: &str) -> Result<PathBuf> {
        let absolute_path = self.resolve_path(raw);
        if !absolute_path.exists() {
            fs::create_dir_all(&absolute_path)?;
            info!(directory = %absolute_path.display(), "Created directory");
        }
        Ok(absolute_path)
    }

    /// Répertoire du cache de téléchargement (créé si absent)
    pub fn get_cache_dir(&self) -> Result<PathBuf> {
        let raw = match self.get_value(&["cache", "directory"]) {
            Ok(Value::String(s)) if !s.trim().is_empty() => s,
            _ => "downloads".to_string(),
        };
        self.resolve_and_create_dir(&raw)
    }

    /// Répertoire temporaire des téléchargements en cours
    ///
    /// Par défaut `<tmp>/ym`.
    pub fn get_temp_dir(&self) -> Result<PathBuf> {
        match self.get_value(&["cache", "temp_directory"]) {
            Ok(Value::String(s)) if !s.trim().is_empty() => self.resolve_and_create_dir(&s),
            _ => Ok(env::temp_dir().join("ym")),
        }
    }

    /// Fichier de persistance de la playlist
    pub fn get_playlist_file(&self) -> Result<PathBuf> {
        let raw = match self.get_value(&["playlist", "file"]) {
            Ok(Value::String(s)) if !s.trim().is_empty() => s,
            _ => "playlist".to_string(),
        };
        Ok(self.resolve_path(&raw))
    }

    impl_usize_config!(
        get_progress_interval_ms,
        set_progress_interval_ms,
        &["cache", "progress_interval_ms"],
        DEFAULT_PROGRESS_INTERVAL_MS
    );

    impl_usize_config!(
        get_save_interval_secs,
        set_save_interval_secs,
        &["playlist", "save_interval_secs"],
        DEFAULT_SAVE_INTERVAL_SECS
    );

    impl_usize_config!(
        get_preflights,
        set_preflights,
        &["playback", "preflights"],
        DEFAULT_PREFLIGHTS
    );

    impl_string_config!(
        get_extractor,
        set_extractor,
        &["search", "extractor"],
        DEFAULT_EXTRACTOR
    );

    impl_string_config!(
        get_status_address,
        set_status_address,
        &["status", "address"],
        DEFAULT_STATUS_ADDRESS
    );

    impl_string_config!(
        get_log_level,
        set_log_level,
        &["log", "level"],
        DEFAULT_LOG_LEVEL
    );

    pub fn get_progress_interval(&self) -> Result<Duration> {
        Ok(Duration::from_millis(self.get_progress_interval_ms()? as u64))
    }

    pub fn get_save_interval(&self) -> Result<Duration> {
        Ok(Duration::from_secs(self.get_save_interval_secs()?.max(1) as u64))
    }

    /// Programmes de lecture à essayer, par ordre de préférence
    pub fn get_players(&self) -> Result<Vec<String>> {
        match self.get_value(&["playback", "players"]) {
            Ok(Value::Sequence(seq)) => Ok(string_list(&seq)),
            Ok(Value::String(s)) => Ok(s.split(',').map(|p| p.trim().to_string()).collect()),
            _ => Ok(vec!["mpv".into(), "mplayer".into(), "ffplay".into()]),
        }
    }

    /// Transcodeur externe du cache, `None` si aucun programme n'est configuré
    pub fn get_transcoder(&self) -> Result<Option<TranscoderSettings>> {
        let program = match self.get_value(&["cache", "transcoder", "program"]) {
            Ok(Value::String(s)) if !s.trim().is_empty() => s,
            _ => return Ok(None),
        };

        let args = match self.get_value(&["cache", "transcoder", "args"]) {
            Ok(Value::Sequence(seq)) => string_list(&seq),
            _ => Vec::new(),
        };

        let extension = match self.get_value(&["cache", "transcoder", "extension"]) {
            Ok(Value::String(s)) if !s.trim().is_empty() => s,
            _ => "aac".to_string(),
        };

        Ok(Some(TranscoderSettings {
            program,
            args,
            extension,
        }))
    }
}

fn string_list(seq: &[Value]) -> Vec<String> {
    seq.iter()
        .filter_map(|v| match v {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .collect()
}

fn set_value_internal(data: &mut Value, path: &[&str], value: Value) -> Result<()> {
    if path.is_empty() {
        *data = value;
        return Ok(());
    }
    if let Value::Mapping(map) = data {
        let key_value = Value::String(path[0].to_lowercase());
        if path.len() == 1 {
            map.insert(key_value, value);
        } else {
            let entry = map
                .entry(key_value)
                .or_insert(Value::Mapping(Mapping::new()));
            set_value_internal(entry, &path[1..], value)?;
        }
        Ok(())
    } else {
        Err(anyhow!("Current node is not a map"))
    }
}

fn get_value_internal(data: &Value, path: &[&str]) -> Result<Value> {
    let mut current = data;
    for (i, key) in path.iter().enumerate() {
        if let Value::Mapping(map) = current {
            match map.get(Value::String(key.to_lowercase())) {
                Some(next) => current = next,
                None => return Err(anyhow!("Path {} does not exist", path[..=i].join("."))),
            }
        } else {
            return Err(anyhow!("Path {} is not a Config", path[..i].join(".")));
        }
    }
    Ok(current.clone())
}

fn apply_env_overrides(config: &mut Value) {
    for (key, value) in env::vars() {
        if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
            let key_path = stripped.split("__").collect::<Vec<_>>();
            let yaml_value = convert_env_value(&value);
            let _ = set_value_internal(config, &key_path, yaml_value);
        }
    }
}

fn convert_env_value(value: &str) -> Value {
    serde_yaml::from_str::<Value>(value).unwrap_or_else(|_| Value::String(value.to_string()))
}

fn lower_keys_value(value: Value) -> Value {
    match value {
        Value::Mapping(map) => {
            let mut new_map = Mapping::new();
            for (k, v) in map {
                let key = match k {
                    Value::String(s) => Value::String(s.to_lowercase()),
                    other => other,
                };
                new_map.insert(key, lower_keys_value(v));
            }
            Value::Mapping(new_map)
        }
        Value::Sequence(seq) => Value::Sequence(seq.into_iter().map(lower_keys_value).collect()),
        _ => value,
    }
}

/// Merges external YAML configuration into default configuration
///
/// Les mappings sont fusionnés récursivement ; scalaires et séquences sont
/// remplacés.
fn merge_yaml(default: &mut Value, external: &Value) {
    match (default, external) {
        (Value::Mapping(dmap), Value::Mapping(emap)) => {
            for (k, v) in emap {
                match dmap.get_mut(k) {
                    Some(dv) => merge_yaml(dv, v),
                    None => {
                        dmap.insert(k.clone(), v.clone());
                    }
                }
            }
        }
        (d, e) => *d = e.clone(),
    }
}
