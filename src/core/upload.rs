use crate::common::{OptimizerError, Result};
use image::ImageFormat;
use serde::Serialize;
use std::path::Path;

/// Formats accepted by the uploader, judged by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageKind {
    Jpeg,
    Png,
}

impl ImageKind {
    pub fn from_filename(filename: &str) -> Result<Self> {
        let extension = Path::new(filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("");

        match ImageFormat::from_extension(extension) {
            Some(ImageFormat::Jpeg) => Ok(Self::Jpeg),
            Some(ImageFormat::Png) => Ok(Self::Png),
            _ => Err(OptimizerError::UnsupportedFormat(filename.to_string())),
        }
    }

    /// Format suggested by the magic bytes, if it is one we accept.
    pub fn sniff(data: &[u8]) -> Option<Self> {
        match image::guess_format(data) {
            Ok(ImageFormat::Jpeg) => Some(Self::Jpeg),
            Ok(ImageFormat::Png) => Some(Self::Png),
            _ => None,
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
        }
    }
}

/// Final path component of a client-supplied filename.
pub fn sanitize_filename(raw: &str) -> Result<String> {
    // Browsers on Windows may send backslash separated paths
    let last = raw.rsplit(['/', '\\']).next().unwrap_or("");
    let name = last.trim();

    if name.is_empty() || name == "." || name == ".." {
        return Err(OptimizerError::Upload(format!("Invalid filename: {:?}", raw)));
    }
    Ok(name.to_string())
}

#[derive(Debug, Clone)]
pub struct UploadedImage {
    filename: String,
    kind: ImageKind,
    data: Vec<u8>,
}

impl UploadedImage {
    pub fn new(filename: &str, data: Vec<u8>) -> Result<Self> {
        let filename = sanitize_filename(filename)?;
        let kind = ImageKind::from_filename(&filename)?;

        if let Some(sniffed) = ImageKind::sniff(&data) {
            if sniffed != kind {
                tracing::warn!(
                    "{} has a {:?} extension but looks like {:?}",
                    filename, kind, sniffed
                );
            }
        } else if !data.is_empty() {
            tracing::warn!("{} does not look like a JPEG or PNG image", filename);
        }

        Ok(Self { filename, kind, data })
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn kind(&self) -> ImageKind {
        self.kind
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
