pub mod workspace;

pub use workspace::SessionWorkspace;

use crate::common::Result;
use std::fs;
use std::path::Path;

pub const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

pub fn bytes_to_mb(len: u64) -> f64 {
    len as f64 / BYTES_PER_MB
}

/// Size of the file at `path` in megabytes (bytes / 1024²).
pub fn measure_size_mb(path: &Path) -> Result<f64> {
    let metadata = fs::metadata(path)?;
    Ok(bytes_to_mb(metadata.len()))
}

/// Reads the whole file into memory. No streaming.
pub fn read_all(path: &Path) -> Result<Vec<u8>> {
    Ok(fs::read(path)?)
}

/// Writes `data` to `path`, replacing any existing file.
pub fn write_all(path: &Path, data: &[u8]) -> Result<()> {
    fs::write(path, data)?;
    Ok(())
}

/// Deletes the file at `path`. A file that is already gone is not an error.
pub fn remove_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
        _ => Ok(()),
    }
}
