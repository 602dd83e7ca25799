//! Error types for diagnostics operations.
//!
//! Only the host-facing paths can fail: decoding a persisted record image,
//! talking to a retention backend, or building a retention policy. The fault
//! and notification paths never return errors.

use thiserror::Error;

/// Errors that can occur outside the fault path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DiagnosticsError {
    /// Raw reset cause code has no `ResetCause` counterpart.
    #[error("unknown reset cause code {0}")]
    UnknownResetCause(u8),
    /// Persisted image is shorter than the fixed image length.
    #[error("record image too short: expected {expected} bytes, got {actual}")]
    ImageTooShort {
        /// Required image length.
        expected: usize,
        /// Bytes actually supplied.
        actual: usize,
    },
    /// Persisted image does not start with the record tag.
    #[error("record image tag mismatch")]
    BadImageTag,
    /// Persisted image was written by an unknown format version.
    #[error("unsupported record image version {0}")]
    UnsupportedImageVersion(u8),
    /// Persisted image failed its CRC check.
    #[error("record image checksum mismatch: stored {expected:#010x}, computed {actual:#010x}")]
    ImageChecksumMismatch {
        /// CRC stored in the image.
        expected: u32,
        /// CRC computed over the image body.
        actual: u32,
    },
    /// Retention policy failed validation.
    #[error("invalid retention policy: {0}")]
    InvalidPolicy(&'static str),
    /// Retention backend I/O failed.
    #[cfg(feature = "std")]
    #[error("retention backend I/O failed: {0:?}")]
    Io(std::io::ErrorKind),
}

impl DiagnosticsError {
    /// Create an image-too-short error.
    #[must_use]
    pub fn image_too_short(expected: usize, actual: usize) -> Self {
        Self::ImageTooShort { expected, actual }
    }

    /// Check if the error came from decoding a persisted image.
    ///
    /// Image errors mean "no usable record" and are normally treated the same
    /// way as an empty record.
    #[must_use]
    pub fn is_image_error(&self) -> bool {
        matches!(
            self,
            Self::ImageTooShort { .. }
                | Self::BadImageTag
                | Self::UnsupportedImageVersion(_)
                | Self::ImageChecksumMismatch { .. }
        )
    }
}

#[cfg(feature = "std")]
impl From<std::io::Error> for DiagnosticsError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.kind())
    }
}

/// A specialized `Result` type for diagnostics operations.
pub type DiagnosticsResult<T> = core::result::Result<T, DiagnosticsError>;
