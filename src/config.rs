use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub records: RecordConfig,

    #[serde(default)]
    pub media: MediaConfig,

    #[serde(default)]
    pub markup: MarkupConfig,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BackendType {
    #[default]
    Local,
    Dropbox,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: BackendType,

    /// Root folder holding one subfolder per project (local backend only)
    #[serde(default = "default_projects_dir")]
    pub path: PathBuf,

    #[serde(default)]
    pub dropbox: DropboxConfig,
}

fn default_projects_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mangel")
        .join("Projekte")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: BackendType::default(),
            path: default_projects_dir(),
            dropbox: DropboxConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DropboxConfig {
    /// Falls back to the DROPBOX_ACCESS_TOKEN environment variable when unset
    #[serde(default)]
    pub access_token: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    60
}

impl Default for DropboxConfig {
    fn default() -> Self {
        Self {
            access_token: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl DropboxConfig {
    pub fn resolve_token(&self) -> Option<String> {
        self.token_or(std::env::var("DROPBOX_ACCESS_TOKEN").ok())
    }

    /// The configured token, else `fallback`. Blank values count as unset.
    pub fn token_or(&self, fallback: Option<String>) -> Option<String> {
        let usable = |t: &String| !t.trim().is_empty();
        self.access_token
            .clone()
            .filter(usable)
            .or_else(|| fallback.filter(usable))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordConfig {
    /// Identifier handed out for the first defect of an empty project
    #[serde(default = "default_start_id")]
    pub start_id: u64,
}

pub const DEFAULT_START_ID: u64 = 1000;

fn default_start_id() -> u64 {
    DEFAULT_START_ID
}

impl Default for RecordConfig {
    fn default() -> Self {
        Self {
            start_id: default_start_id(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,

    /// Number of photo inputs offered by the form
    #[serde(default = "default_photo_slots")]
    pub photo_slots: usize,

    #[serde(default = "default_plan_extensions")]
    pub plan_extensions: Vec<String>,
}

fn default_jpeg_quality() -> u8 {
    90
}

fn default_photo_slots() -> usize {
    3
}

fn default_plan_extensions() -> Vec<String> {
    vec!["jpg".to_string(), "jpeg".to_string(), "png".to_string()]
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            jpeg_quality: default_jpeg_quality(),
            photo_slots: default_photo_slots(),
            plan_extensions: default_plan_extensions(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkupConfig {
    #[serde(default = "default_stroke_width")]
    pub stroke_width: u32,

    /// Hex color, e.g. "#000000"
    #[serde(default = "default_stroke_color")]
    pub stroke_color: String,

    #[serde(default)]
    pub protocol: ImageProtocol,
}

/// How the plan is drawn in the terminal
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ImageProtocol {
    /// Ask the terminal (sixel, kitty, iterm2), halfblocks if it does not answer
    #[default]
    Auto,
    Halfblocks,
}

fn default_stroke_width() -> u32 {
    1
}

fn default_stroke_color() -> String {
    "#000000".to_string()
}

impl Default for MarkupConfig {
    fn default() -> Self {
        Self {
            stroke_width: default_stroke_width(),
            stroke_color: default_stroke_color(),
            protocol: ImageProtocol::default(),
        }
    }
}

impl Config {
    /// Load from `MANGEL_CONFIG` or the default location, writing a default
    /// config on first run.
    pub fn load() -> Result<Self> {
        if let Ok(path) = std::env::var("MANGEL_CONFIG") {
            return Self::load_from(Path::new(&path));
        }

        let config_path = Self::config_path();

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            let config = Config::default();
            config.save()?;
            Ok(config)
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;

        Ok(())
    }

    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("mangel")
    }

    fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_file() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.storage.backend, BackendType::Local);
        assert_eq!(config.records.start_id, DEFAULT_START_ID);
        assert_eq!(config.media.photo_slots, 3);
        assert_eq!(config.markup.stroke_color, "#000000");
        assert_eq!(config.markup.protocol, ImageProtocol::Auto);
    }

    #[test]
    fn test_partial_config() {
        let config: Config = toml::from_str(
            r#"
            [storage]
            backend = "dropbox"

            [storage.dropbox]
            access_token = "abc"

            [records]
            start_id = 1
            "#,
        )
        .unwrap();

        assert_eq!(config.storage.backend, BackendType::Dropbox);
        assert_eq!(config.storage.dropbox.resolve_token().as_deref(), Some("abc"));
        assert_eq!(config.storage.dropbox.timeout_secs, 60);
        assert_eq!(config.records.start_id, 1);
        assert_eq!(config.media.jpeg_quality, 90);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[media]\njpeg_quality = 75\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.media.jpeg_quality, 75);
        assert_eq!(config.media.plan_extensions.len(), 3);
    }
}
