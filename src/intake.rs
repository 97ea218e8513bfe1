//! File intake: only PNG drops become source images.

use std::path::Path;

use crate::error::{Result, SdfError};
use crate::raster::Raster;

pub const PNG_MIME: &str = "image/png";

/// A dropped file: name, declared MIME type, contents.
#[derive(Debug, Clone)]
pub struct FileDrop {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl FileDrop {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        FileDrop {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// Read a file from disk, taking its MIME type from the extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|source| SdfError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(FileDrop::new(name, mime_for_path(path), bytes))
    }
}

/// MIME type a browser would report for this file name.
pub fn mime_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("png") => PNG_MIME,
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("bmp") => "image/bmp",
        Some("svg") => "image/svg+xml",
        Some("txt") => "text/plain",
        _ => "application/octet-stream",
    }
}

/// A decoded source image and the name it was dropped under.
#[derive(Debug, Clone)]
pub struct LoadedImage {
    pub name: String,
    pub raster: Raster,
}

impl LoadedImage {
    /// Info panel text.
    pub fn info(&self) -> String {
        format!(
            "Name: {}\nSize: {} x {}",
            self.name,
            self.raster.width(),
            self.raster.height()
        )
    }
}

/// Accept a drop if it is a PNG and decode it.
pub fn accept(drop: &FileDrop) -> Result<LoadedImage> {
    if drop.mime_type != PNG_MIME {
        return Err(SdfError::UnsupportedFileType {
            mime_type: drop.mime_type.clone(),
        });
    }

    let raster = Raster::decode_png(&drop.bytes)?;
    Ok(LoadedImage {
        name: drop.name.clone(),
        raster,
    })
}
