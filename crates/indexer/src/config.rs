use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use common::{Articles, IndexGroups, DEFAULT_IGNORED_ARTICLES, DEFAULT_INDEX_GROUPS};
use library::ScanSettings;
use serde::{Deserialize, Serialize};

pub const CONFIG_VERSION: u32 = 1;
const DEFAULT_INDEX_PATH: &str = "library.redb";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexerConfig {
    pub version: u32,
    pub music_root: String,
    pub index_path: String,
    /// Group definition such as `"A B C X-Z(XYZ)"`.
    pub index_groups: String,
    /// Space separated words ignored at the start of artist names.
    pub ignored_articles: String,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            music_root: "".to_string(),
            index_path: DEFAULT_INDEX_PATH.to_string(),
            index_groups: DEFAULT_INDEX_GROUPS.to_string(),
            ignored_articles: DEFAULT_IGNORED_ARTICLES.to_string(),
        }
    }
}

impl IndexerConfig {
    /// Scan settings for this config, or `None` while no music folder is set.
    pub fn scan_settings(&self, config_path: &Path) -> Option<ScanSettings> {
        let music_root = resolve_music_root(config_path, &self.music_root)?;
        Some(ScanSettings {
            music_root,
            index_groups: IndexGroups::parse(&self.index_groups),
            articles: Articles::parse(&self.ignored_articles),
        })
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Yaml(serde_yaml::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(err) => write!(f, "io error: {}", err),
            ConfigError::Yaml(err) => write!(f, "yaml error: {}", err),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Io(err)
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::Yaml(err)
    }
}

pub fn config_path_from_env() -> PathBuf {
    match env::var("TONEARM_CONFIG") {
        Ok(value) if !value.trim().is_empty() => PathBuf::from(value),
        _ => default_config_path(),
    }
}

fn default_config_path() -> PathBuf {
    match env::current_exe() {
        Ok(exe) => exe
            .parent()
            .map(|dir| dir.join("config.yaml"))
            .unwrap_or_else(|| PathBuf::from("config.yaml")),
        Err(_) => PathBuf::from("config.yaml"),
    }
}

/// Loads the config, writing a default one first when the file does not exist.
/// The flag is true when the file was created.
pub fn load_or_create_config(path: &Path) -> Result<(IndexerConfig, bool), ConfigError> {
    if path.exists() {
        let contents = fs::read_to_string(path)?;
        let mut config: IndexerConfig = serde_yaml::from_str(&contents)?;
        if config.version < CONFIG_VERSION {
            config.version = CONFIG_VERSION;
        }
        if config.index_path.trim().is_empty() {
            config.index_path = DEFAULT_INDEX_PATH.to_string();
        }
        if config.index_groups.trim().is_empty() {
            config.index_groups = DEFAULT_INDEX_GROUPS.to_string();
        }
        return Ok((config, false));
    }

    let config = IndexerConfig::default();
    save_config(path, &config)?;
    Ok((config, true))
}

pub fn save_config(path: &Path, config: &IndexerConfig) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let contents = serde_yaml::to_string(config)?;
    fs::write(path, contents)?;
    Ok(())
}

pub fn resolve_path(config_path: &Path, value: &str) -> PathBuf {
    let raw = PathBuf::from(value);
    if raw.is_absolute() {
        return raw;
    }
    let base = config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    base.join(raw)
}

pub fn resolve_music_root(config_path: &Path, value: &str) -> Option<PathBuf> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(resolve_path(config_path, trimmed))
    }
}
