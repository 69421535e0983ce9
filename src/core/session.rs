use crate::common::config::OptimizerConfig;
use crate::common::{OptimizerError, Result};
use crate::core::optimizer::{build_variant, QualityVariant};
use crate::core::quality::{default_levels, parse_levels, Quality};
use crate::core::upload::UploadedImage;
use crate::storage::workspace::output_file_name;
use crate::storage::{measure_size_mb, read_all, remove_if_exists, write_all, SessionWorkspace};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Uploaded,
    NoActionNeeded,
    Optimizing,
    Selected,
    Downloaded,
}

impl SessionState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Uploaded => "uploaded",
            Self::NoActionNeeded => "no_action_needed",
            Self::Optimizing => "optimizing",
            Self::Selected => "selected",
            Self::Downloaded => "downloaded",
        }
    }

    fn has_variants(self) -> bool {
        matches!(self, Self::Optimizing | Self::Selected | Self::Downloaded)
    }
}

/// Knobs the session needs from the optimizer config, already validated.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub threshold_mb: f64,
    pub levels: Vec<Quality>,
    pub download_content_type: String,
}

impl SessionSettings {
    pub fn from_config(config: &OptimizerConfig) -> Result<Self> {
        let levels = parse_levels(&config.quality_levels)?;
        if levels.is_empty() {
            return Err(OptimizerError::Config("At least one quality level is required".into()));
        }

        Ok(Self {
            threshold_mb: config.threshold_mb,
            levels,
            download_content_type: config.download_content_type.clone(),
        })
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            threshold_mb: 2.0,
            levels: default_levels(),
            download_content_type: "image/jpeg".to_string(),
        }
    }
}

/// Outcome of measuring the persisted upload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SizeCheck {
    NoActionNeeded { size_mb: f64 },
    Optimized { size_mb: f64, variants: usize },
}

#[derive(Debug, Clone)]
pub struct Download {
    pub filename: String,
    pub content_type: String,
    pub body: Vec<u8>,
}

pub fn new_session_id() -> String {
    format!("{:016x}", rand::random::<u64>())
}

/// One user's upload → measure → optimize → select → download run.
pub struct Session {
    id: String,
    settings: SessionSettings,
    workspace: SessionWorkspace,
    state: SessionState,
    upload: Option<UploadedImage>,
    original_size_mb: Option<f64>,
    variants: Vec<QualityVariant>,
    selected: Option<Quality>,
    created_at: DateTime<Utc>,
    last_active: DateTime<Utc>,
}

impl Session {
    pub fn new(id: String, settings: SessionSettings, workspace: SessionWorkspace) -> Self {
        let now = Utc::now();
        Self {
            id,
            settings,
            workspace,
            state: SessionState::Idle,
            upload: None,
            original_size_mb: None,
            variants: Vec::new(),
            selected: None,
            created_at: now,
            last_active: now,
        }
    }

    /// Fresh session with its own workspace under `root`.
    pub fn create(settings: SessionSettings, root: &Path, keep_artifacts: bool) -> Result<Self> {
        let id = new_session_id();
        let workspace = SessionWorkspace::create(root, &id, keep_artifacts)?;
        tracing::info!("Started session {}", id);
        Ok(Self::new(id, settings, workspace))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn uploaded(&self) -> Option<&UploadedImage> {
        self.upload.as_ref()
    }

    pub fn original_size_mb(&self) -> Option<f64> {
        self.original_size_mb
    }

    pub fn variants(&self) -> &[QualityVariant] {
        &self.variants
    }

    /// Where the current upload is persisted, once there is one.
    pub fn temp_path(&self) -> Option<PathBuf> {
        self.upload
            .as_ref()
            .map(|image| self.workspace.temp_path(image.filename()))
    }

    pub fn workspace_path(&self) -> &Path {
        self.workspace.path()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_active(&self) -> DateTime<Utc> {
        self.last_active
    }

    pub fn touch(&mut self) {
        self.last_active = Utc::now();
    }

    /// Explicit selection, or the first configured level once variants exist.
    pub fn selected_quality(&self) -> Option<Quality> {
        self.selected
            .or_else(|| self.variants.first().map(|variant| variant.quality))
    }

    /// Persists the upload as `temp_<filename>`. A new upload restarts the
    /// session; the same filename overwrites the previous temp file, a
    /// different one removes the previous upload's files.
    pub fn upload(&mut self, image: UploadedImage) -> Result<PathBuf> {
        self.touch();
        let stale = match &self.upload {
            Some(previous) if previous.filename() != image.filename() => {
                let mut paths = self.output_paths();
                paths.push(self.workspace.temp_path(previous.filename()));
                paths
            }
            _ => Vec::new(),
        };
        for path in &stale {
            remove_if_exists(path)?;
        }

        self.state = SessionState::Idle;
        self.upload = None;
        self.original_size_mb = None;
        self.variants.clear();
        self.selected = None;

        let temp_path = self.workspace.temp_path(image.filename());
        write_all(&temp_path, image.data())?;

        tracing::info!(
            "Session {} stored upload {} ({} bytes)",
            self.id, image.filename(), image.len()
        );

        self.upload = Some(image);
        self.state = SessionState::Uploaded;
        Ok(temp_path)
    }

    /// Measures the persisted upload and, when it is over the threshold,
    /// produces one variant per configured quality level.
    pub fn check_size(&mut self) -> Result<SizeCheck> {
        if self.state != SessionState::Uploaded {
            return Err(self.invalid("check size"));
        }
        let filename = match &self.upload {
            Some(image) => image.filename().to_string(),
            None => return Err(self.invalid("check size")),
        };
        self.touch();

        let temp_path = self.workspace.temp_path(&filename);
        let size_mb = measure_size_mb(&temp_path)?;
        self.original_size_mb = Some(size_mb);
        tracing::info!("Session {}: original size {:.2} MB", self.id, size_mb);

        if size_mb <= self.settings.threshold_mb {
            self.state = SessionState::NoActionNeeded;
            return Ok(SizeCheck::NoActionNeeded { size_mb });
        }

        tracing::info!(
            "Session {}: over {} MB, building {} variants",
            self.id, self.settings.threshold_mb, self.settings.levels.len()
        );

        let mut variants = Vec::with_capacity(self.settings.levels.len());
        for &quality in &self.settings.levels {
            let original = read_all(&temp_path)?;
            let variant = build_variant(&original, quality);

            // The output file keeps the original bytes; only the download is truncated
            let output_path = self.workspace.output_path(quality, &filename);
            write_all(&output_path, &original)?;

            tracing::debug!(
                "Session {}: {} variant simulated at {:.2} MB -> {}",
                self.id, quality, variant.simulated_size_mb(), output_path.display()
            );
            variants.push(variant);
        }

        self.variants = variants;
        self.state = SessionState::Optimizing;
        Ok(SizeCheck::Optimized { size_mb, variants: self.variants.len() })
    }

    /// Upload followed by the size check.
    pub fn process(&mut self, image: UploadedImage) -> Result<SizeCheck> {
        self.upload(image)?;
        self.check_size()
    }

    pub fn select(&mut self, quality: Quality) -> Result<&QualityVariant> {
        if !self.state.has_variants() {
            return Err(self.invalid("select a quality"));
        }

        let index = self
            .variants
            .iter()
            .position(|variant| variant.quality == quality)
            .ok_or(OptimizerError::UnknownQuality(quality.percent()))?;

        self.touch();
        self.selected = Some(quality);
        self.state = SessionState::Selected;
        tracing::debug!("Session {}: selected {}", self.id, quality);
        Ok(&self.variants[index])
    }

    /// Hands out the truncated buffer of the selected (or default) variant.
    pub fn download(&mut self) -> Result<Download> {
        if !self.state.has_variants() {
            return Err(self.invalid("download"));
        }
        let quality = self.selected_quality().ok_or_else(|| self.invalid("download"))?;
        let filename = match &self.upload {
            Some(image) => output_file_name(quality, image.filename()),
            None => return Err(self.invalid("download")),
        };

        let body = self
            .variants
            .iter()
            .find(|variant| variant.quality == quality)
            .map(|variant| variant.data.clone())
            .ok_or(OptimizerError::UnknownQuality(quality.percent()))?;

        self.touch();
        self.selected = Some(quality);
        self.state = SessionState::Downloaded;
        tracing::info!("Session {}: download {} ({} bytes)", self.id, filename, body.len());

        Ok(Download {
            filename,
            content_type: self.settings.download_content_type.clone(),
            body,
        })
    }

    /// Output files written by the last optimization pass.
    pub fn output_paths(&self) -> Vec<PathBuf> {
        match &self.upload {
            Some(image) => self
                .variants
                .iter()
                .map(|variant| self.workspace.output_path(variant.quality, image.filename()))
                .collect(),
            None => Vec::new(),
        }
    }

    fn invalid(&self, action: &'static str) -> OptimizerError {
        OptimizerError::InvalidTransition {
            action,
            state: self.state.as_str(),
        }
    }
}
