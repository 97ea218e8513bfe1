//! Error type shared by intake, settings, and the execution surfaces

use std::path::PathBuf;

/// Everything that can go wrong between dropping a file and reading back a
/// generated raster.
#[derive(Debug, thiserror::Error)]
pub enum SdfError {
    /// Non-integer or non-numeric settings input. Recovered inside
    /// `settings`, never surfaced to the caller of `generate`.
    #[error("invalid numeric input {input:?}")]
    InvalidNumericInput { input: String },

    #[error("Only .png files are supported (got {mime_type})")]
    UnsupportedFileType { mime_type: String },

    #[error("failed to decode PNG: {0}")]
    Decode(#[from] image::ImageError),

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("no source image loaded")]
    NoSource,

    #[error("kernel compile failed for radius {radius}: {reason}")]
    KernelCompileFailure { radius: u32, reason: String },

    #[error("dispatch failed: {0}")]
    DispatchFailure(String),

    #[error("no usable GPU device: {0}")]
    DeviceUnavailable(String),

    #[error("preview window: {0}")]
    Preview(String),
}

pub type Result<T> = std::result::Result<T, SdfError>;
