use std::path::{Path, PathBuf};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Configuration for a motion-photo muxing run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MuxConfig {
    /// Directory scanned recursively for stills and videos
    pub input_dir: PathBuf,
    /// Directory receiving muxed containers (created if missing)
    pub output_dir: PathBuf,
    /// Move files that were neither paired nor excluded into output_dir/other_files
    pub move_other_files: bool,
    /// Convert every HEIC even when no matching video exists
    pub convert_all_convertible_stills: bool,
    /// Delete converted originals that found no matching video
    pub delete_converted_originals_without_match: bool,
    /// Delete originals that were part of a successful mux
    pub delete_paired_originals: bool,
    /// Path to the heif-convert binary (libheif CLI)
    pub heif_convert_bin: PathBuf,
    /// Path to the exiftool binary
    pub exiftool_bin: PathBuf,
}

impl Default for MuxConfig {
    fn default() -> Self {
        Self::default_config()
    }
}

impl MuxConfig {
    /// Create a default configuration with sensible values
    pub fn default_config() -> Self {
        Self {
            input_dir: PathBuf::from("."),
            output_dir: PathBuf::from("output"),
            move_other_files: false,
            convert_all_convertible_stills: false,
            delete_converted_originals_without_match: false,
            delete_paired_originals: false,
            heif_convert_bin: PathBuf::from("heif-convert"),
            exiftool_bin: PathBuf::from("exiftool"),
        }
    }

    /// Load configuration from a file, or return defaults if path is None or file doesn't exist
    pub fn load_config(path: Option<&Path>) -> Result<Self> {
        let mut config = Self::default_config();

        if let Some(config_path) = path {
            if config_path.exists() {
                let content = std::fs::read_to_string(config_path)
                    .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

                // Try TOML by extension, JSON otherwise
                if config_path.extension().and_then(|s| s.to_str()) == Some("toml") {
                    let file_config: MuxConfig = toml::from_str(&content)
                        .with_context(|| format!("Failed to parse TOML config: {}", config_path.display()))?;
                    config = file_config;
                } else {
                    let file_config: MuxConfig = serde_json::from_str(&content)
                        .with_context(|| format!("Failed to parse JSON config: {}", config_path.display()))?;
                    config = file_config;
                }
            }
        }

        Ok(config)
    }
}
