//! Configuration management for omrscan

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::template::SheetTemplate;

/// Scan defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Questions printed on the sheet
    #[serde(default = "default_question_count")]
    pub question_count: usize,

    /// Width photos are resized to before analysis (0 = keep original)
    #[serde(default = "default_working_width")]
    pub working_width: u32,
}

fn default_question_count() -> usize { 15 }
fn default_working_width() -> u32 { 1400 }

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            question_count: default_question_count(),
            working_width: default_working_width(),
        }
    }
}

impl ScanConfig {
    pub fn working_width(&self) -> Option<u32> {
        (self.working_width > 0).then_some(self.working_width)
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Largest accepted upload, in megabytes
    #[serde(default = "default_max_upload_mb")]
    pub max_upload_mb: usize,
}

fn default_max_upload_mb() -> usize { 20 }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8092,
            max_upload_mb: default_max_upload_mb(),
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub scan: ScanConfig,

    #[serde(default)]
    pub template: SheetTemplate,

    #[serde(default)]
    pub server: ServerConfig,
}

impl Config {
    /// Load configuration from a file, or create default if it doesn't exist
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            let config = Config::default();
            config.save(path)?;
            tracing::info!("Created default configuration at {:?}", path);
            Ok(config)
        }
    }

    /// Load configuration from a file, falling back to defaults if it is missing
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No configuration at {:?}, using defaults", path);
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {:?}", path))?;
        config
            .template
            .validate()
            .with_context(|| format!("Invalid sheet template in {:?}", path))?;

        tracing::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .context("Failed to serialize configuration")?;

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory {:?}", parent))?;
        }

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config to {:?}", path))?;

        tracing::info!("Saved configuration to {:?}", path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.scan.question_count, 15);
        assert_eq!(config.scan.working_width(), Some(1400));
        assert_eq!(config.server.port, 8092);
        assert_eq!(config.template, SheetTemplate::default());
    }

    #[test]
    fn test_create_then_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("omrscan.toml");

        let created = Config::load_or_create(&path).unwrap();
        assert!(path.exists());

        let mut changed = created.clone();
        changed.scan.question_count = 40;
        changed.template.bubbles.min_gap = 14.0;
        changed.save(&path).unwrap();

        let reloaded = Config::load_or_create(&path).unwrap();
        assert_eq!(reloaded.scan.question_count, 40);
        assert_eq!(reloaded.template.bubbles.min_gap, 14.0);
        assert_eq!(reloaded.template.columns, created.template.columns);
    }

    #[test]
    fn test_load_missing_does_not_create() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let config = Config::load(&path).unwrap();
        assert_eq!(config.scan.question_count, 15);
        assert!(!path.exists());
    }

    #[test]
    fn test_invalid_template_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[template]\ncolumns = [0.3, 0.5, 0.7, 1.5]\n").unwrap();
        let err = Config::load(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("outside [0, 1]"));
    }

    #[test]
    fn test_inverted_threshold_in_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inverted.toml");
        std::fs::write(
            &path,
            "[template.rows]\nthreshold_min = 150.0\nthreshold_max = nan\n",
        )
        .unwrap();
        let err = Config::load(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("rows.threshold must be a finite number"));
    }

    #[test]
    fn test_working_width_zero_disables_resize() {
        let config: Config = toml::from_str("[scan]\nworking_width = 0\n").unwrap();
        assert_eq!(config.scan.working_width(), None);
        assert_eq!(config.scan.question_count, 15);
    }
}
