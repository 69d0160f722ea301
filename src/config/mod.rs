//! Application Configuration
//!
//! User settings stored in TOML format.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::vision::profile::GameProfile;

/// Application settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// General settings
    pub general: GeneralConfig,
    /// Image preprocessing settings
    pub preprocessing: PreprocessingSettings,
    /// OCR engine settings
    pub ocr: OcrSettings,
    /// Output settings
    pub output: OutputSettings,
}

/// General application settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Game profile used when none is given on the command line
    pub default_game: GameProfile,
}

/// Image preprocessing settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessingSettings {
    /// Run the preprocessing filters at all
    pub enabled: bool,
    /// Gaussian blur sigma (0.8 is what a 3x3 kernel implies)
    pub blur_sigma: f32,
    /// Adaptive threshold neighborhood size in pixels (odd)
    pub block_size: u32,
    /// Constant subtracted from the local mean
    pub bias: i16,
}

impl Default for PreprocessingSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            blur_sigma: 0.8,
            block_size: 11,
            bias: 2,
        }
    }
}

/// OCR engine settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrSettings {
    /// Directory holding the tessdata language packs (None = engine default)
    pub tessdata_dir: Option<PathBuf>,
    /// Language packs to use instead of the profile's choice (e.g. "spa+eng")
    pub language_override: Option<String>,
}

/// Output-related settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    /// Pretty-print JSON output
    pub pretty: bool,
    /// Include the normalized OCR text in the output
    pub include_text: bool,
    /// Include the team split in the output
    pub include_teams: bool,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            pretty: true,
            include_text: false,
            include_teams: false,
        }
    }
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;
    let config: AppConfig =
        toml::from_str(&content).with_context(|| format!("Invalid config file: {:?}", path))?;
    Ok(config)
}

/// Save configuration to file
pub fn save_config(config: &AppConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Get the configuration directory
pub fn get_config_dir() -> Result<PathBuf> {
    let proj_dirs = directories::ProjectDirs::from("com", "mobastats", "MobaStats")
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

    Ok(proj_dirs.config_dir().to_path_buf())
}

/// Default location of `config.toml`
pub fn default_config_path() -> Result<PathBuf> {
    Ok(get_config_dir()?.join("config.toml"))
}
