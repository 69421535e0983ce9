use std::path::PathBuf;
use std::fs;
use crate::common::config::StorageConfig;
use crate::common::error::Result;

#[derive(Debug, Clone)]
pub struct DevMode {
    enabled: bool,
    base_dir: PathBuf,
}

impl DevMode {
    pub fn new(enabled: bool) -> Result<Self> {
        let base_dir = if enabled {
            PathBuf::from("./dev_data")
        } else {
            PathBuf::new() // Not used when disabled
        };

        if enabled {
            fs::create_dir_all(base_dir.join("sessions"))?;

            tracing::info!(
                "Development mode enabled - session files will be kept in: {}",
                base_dir.display()
            );
        }

        Ok(Self { enabled, base_dir })
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Parent directory for session workspaces.
    pub fn sessions_root(&self, storage: &StorageConfig) -> PathBuf {
        if self.enabled {
            self.base_dir.join("sessions")
        } else {
            storage.work_dir.clone().unwrap_or_else(std::env::temp_dir)
        }
    }

    /// Dev mode always keeps artifacts; otherwise the config decides.
    pub fn keep_artifacts(&self, storage: &StorageConfig) -> bool {
        self.enabled || storage.keep_artifacts
    }
}
