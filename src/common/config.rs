use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use crate::common::error::{OptimizerError, Result};

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub optimizer: OptimizerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_max_upload_mb")]
    pub max_upload_mb: usize,
}

fn default_host() -> String { "127.0.0.1".to_string() }
fn default_port() -> u16 { 8501 }
fn default_max_upload_mb() -> usize { 200 }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_upload_mb: default_max_upload_mb(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OptimizerConfig {
    /// Uploads strictly larger than this (in MB) get quality variants.
    #[serde(default = "default_threshold_mb")]
    pub threshold_mb: f64,
    #[serde(default = "default_quality_levels")]
    pub quality_levels: Vec<u32>,
    #[serde(default = "default_download_content_type")]
    pub download_content_type: String,
}

fn default_threshold_mb() -> f64 { 2.0 }
fn default_quality_levels() -> Vec<u32> { vec![75, 50, 25] }
fn default_download_content_type() -> String { "image/jpeg".to_string() }

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            threshold_mb: default_threshold_mb(),
            quality_levels: default_quality_levels(),
            download_content_type: default_download_content_type(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct StorageConfig {
    /// Parent directory for session workspaces. System temp dir when unset.
    #[serde(default)]
    pub work_dir: Option<PathBuf>,
    #[serde(default)]
    pub keep_artifacts: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SessionConfig {
    #[serde(default = "default_ttl_seconds")]
    pub ttl_seconds: u64,
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_seconds: u64,
}

fn default_ttl_seconds() -> u64 { 1800 }
fn default_max_sessions() -> usize { 64 }
fn default_sweep_interval() -> u64 { 60 }

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: default_ttl_seconds(),
            max_sessions: default_max_sessions(),
            sweep_interval_seconds: default_sweep_interval(),
        }
    }
}

impl Config {
    /// Load from an explicit path, the user config dir, or fall back to defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load_from_path(path);
        }

        if let Some(path) = Self::user_config_file() {
            if path.exists() {
                return Self::load_from_path(&path);
            }
        }

        tracing::debug!("No config file found, using defaults");
        let config = Self::default();
        config.validate()?;
        Ok(config)
    }

    pub fn user_config_file() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("image-optimizer").join("config.toml"))
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(OptimizerError::Config(format!(
                "Config file not found: {}", path.display()
            )));
        }

        tracing::info!("Loading config from: {}", path.display());
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)
            .map_err(|e| OptimizerError::Config(format!("Config parse error: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(OptimizerError::Config("Server port must not be 0".into()));
        }
        if self.server.max_upload_mb == 0 {
            return Err(OptimizerError::Config("max_upload_mb must be at least 1".into()));
        }

        if self.optimizer.threshold_mb.is_nan() || self.optimizer.threshold_mb <= 0.0 {
            return Err(OptimizerError::Config(format!(
                "Threshold must be greater than 0 MB, got {}", self.optimizer.threshold_mb
            )));
        }

        let levels = &self.optimizer.quality_levels;
        if levels.is_empty() {
            return Err(OptimizerError::Config("At least one quality level is required".into()));
        }
        let mut seen = HashSet::new();
        for &level in levels {
            if level > 100 {
                return Err(OptimizerError::Config(format!(
                    "Quality levels must be between 0 and 100, got {}", level
                )));
            }
            if !seen.insert(level) {
                return Err(OptimizerError::Config(format!(
                    "Duplicate quality level: {}", level
                )));
            }
        }

        if self.session.ttl_seconds == 0 {
            return Err(OptimizerError::Config("Session ttl_seconds must be at least 1".into()));
        }
        if self.session.max_sessions == 0 {
            return Err(OptimizerError::Config("Session max_sessions must be at least 1".into()));
        }
        if self.session.sweep_interval_seconds == 0 {
            return Err(OptimizerError::Config(
                "Session sweep_interval_seconds must be at least 1".into()
            ));
        }

        Ok(())
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.server.max_upload_mb.saturating_mul(1024 * 1024)
    }
}
