use crate::cli::report::render_report;
use crate::common::{Config, DevMode, OptimizerError, Result};
use crate::core::{Quality, Session, SessionSettings, UploadedImage};
use crate::storage::{read_all, write_all};
use std::fs;
use std::path::{Path, PathBuf};

pub struct OptimizeOutcome {
    pub report: String,
    /// Download written to the output directory, if the image needed one.
    pub written: Option<PathBuf>,
}

/// Runs one session against a file on disk and saves the chosen download.
pub fn optimize_file(
    input: &Path,
    quality: Option<u32>,
    out_dir: &Path,
    config: &Config,
    dev_mode: &DevMode,
) -> Result<OptimizeOutcome> {
    let filename = input
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| OptimizerError::Upload(format!("No filename in {}", input.display())))?;
    let image = UploadedImage::new(filename, read_all(input)?)?;

    let settings = SessionSettings::from_config(&config.optimizer)?;
    let mut session = Session::create(
        settings,
        &dev_mode.sessions_root(&config.storage),
        dev_mode.keep_artifacts(&config.storage),
    )?;
    session.process(image)?;

    if session.variants().is_empty() {
        return Ok(OptimizeOutcome {
            report: render_report(&session),
            written: None,
        });
    }

    if let Some(quality) = quality {
        session.select(Quality::new(quality)?)?;
    }
    let download = session.download()?;

    fs::create_dir_all(out_dir)?;
    let path = out_dir.join(&download.filename);
    write_all(&path, &download.body)?;

    Ok(OptimizeOutcome {
        report: render_report(&session),
        written: Some(path),
    })
}
