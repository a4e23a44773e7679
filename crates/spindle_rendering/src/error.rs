//! # Rendering & Export Error Types
//!
//! The taxonomy mirrors how failures are handled:
//! - configuration and render errors are caught and logged, the frame goes on
//! - report errors become the on-screen report text
//! - capture errors trigger the composite fallback
//! - export errors are returned to the caller
//!
//! Nothing in this crate is allowed to take the process down.

use thiserror::Error;

/// Errors while parsing a display-configuration string.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The TOML display string did not parse.
    #[error("malformed display string: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Errors while computing an on-demand textual report.
///
/// These are user-visible: the error text is shown where the report
/// would have been, and never propagated as a fault.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReportError {
    /// The simulation does not know this report name.
    #[error("unknown report `{0}`")]
    Unknown(String),
    /// The report was recognized but could not be produced.
    #[error("report failed: {0}")]
    Failed(String),
}

/// Errors inside a style's prepare or draw pass.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// Scene preparation failed; the previous frame's derived state stays.
    #[error("scene preparation failed: {0}")]
    Prepare(String),
    /// A draw pass failed; the frame is partial.
    #[error("draw pass failed: {0}")]
    Draw(String),
}

/// Errors from the backend's magnified-capture path.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    /// The requested buffer exceeds what the backend can allocate.
    /// Triggers the composite (tiled) fallback.
    #[error("magnified capture unsupported: {width}x{height} exceeds limit {limit}")]
    Unsupported {
        /// Requested buffer width in pixels.
        width: u32,
        /// Requested buffer height in pixels.
        height: u32,
        /// Largest dimension the backend can capture.
        limit: u32,
    },
    /// Reading pixels back from the context failed.
    #[error("pixel readback failed: {0}")]
    Read(String),
}

/// Errors from a pixel-format encoder.
#[derive(Error, Debug)]
pub enum EncoderError {
    /// The encoder does not implement this format.
    #[error("unsupported image format `{0}`")]
    UnsupportedFormat(String),
    /// Writing the encoded file failed.
    #[error("image write failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from an export operation, returned to the caller.
#[derive(Error, Debug)]
pub enum ExportError {
    /// Pre-check failure: the format is unsupported. Nothing was locked,
    /// no directory was changed, no file was created.
    #[error("unsupported image format `{0}`")]
    UnsupportedFormat(String),
    /// The encoder failed while writing the image.
    #[error(transparent)]
    Encoder(#[from] EncoderError),
    /// The composite fallback itself failed. Terminal for this call.
    #[error("composite capture failed: {0}")]
    Composite(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CaptureError::Unsupported {
            width: 8192,
            height: 6144,
            limit: 4096,
        };
        assert_eq!(
            err.to_string(),
            "magnified capture unsupported: 8192x6144 exceeds limit 4096"
        );

        let err = ExportError::UnsupportedFormat("webp".into());
        assert!(err.to_string().contains("webp"));
    }
}
