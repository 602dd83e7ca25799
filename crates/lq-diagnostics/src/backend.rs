//! External persistence for targets without reset-retained RAM.
//!
//! A [`RetentionBackend`] stores one encoded record image. The caller decides
//! when to [`persist`](Diagnostics::persist) (typically from the notification
//! callback, before resetting) and calls [`restore`](Diagnostics::restore)
//! early at boot, before applying the reset cause.

use crate::error::DiagnosticsResult;
use crate::image::IMAGE_LEN;
use crate::record::DiagnosticRecord;
use crate::store::Diagnostics;

/// Somewhere a single record image can outlive a reset.
pub trait RetentionBackend {
    /// Read the stored image, `None` if nothing was stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying medium fails or holds a truncated
    /// image.
    fn load(&mut self) -> DiagnosticsResult<Option<[u8; IMAGE_LEN]>>;

    /// Replace the stored image.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying medium fails.
    fn store(&mut self, image: &[u8; IMAGE_LEN]) -> DiagnosticsResult<()>;
}

/// In-memory image slot, e.g. a mirror of backup registers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryBackend {
    image: Option<[u8; IMAGE_LEN]>,
}

impl MemoryBackend {
    /// Create an empty slot.
    #[must_use]
    pub const fn new() -> Self {
        Self { image: None }
    }

    /// Create a slot already holding `image`.
    #[must_use]
    pub const fn with_image(image: [u8; IMAGE_LEN]) -> Self {
        Self { image: Some(image) }
    }

    /// The stored image, if any.
    #[must_use]
    pub fn image(&self) -> Option<&[u8; IMAGE_LEN]> {
        self.image.as_ref()
    }

    /// Mutable access to the stored image, for mirroring hardware registers.
    pub fn image_mut(&mut self) -> Option<&mut [u8; IMAGE_LEN]> {
        self.image.as_mut()
    }

    /// Drop the stored image.
    pub fn erase(&mut self) {
        self.image = None;
    }
}

impl RetentionBackend for MemoryBackend {
    fn load(&mut self) -> DiagnosticsResult<Option<[u8; IMAGE_LEN]>> {
        Ok(self.image)
    }

    fn store(&mut self, image: &[u8; IMAGE_LEN]) -> DiagnosticsResult<()> {
        self.image = Some(*image);
        Ok(())
    }
}

#[cfg(feature = "std")]
mod file {
    use std::fs::{self, File};
    use std::io::{ErrorKind, Write};
    use std::path::{Path, PathBuf};

    use super::RetentionBackend;
    use crate::error::{DiagnosticsError, DiagnosticsResult};
    use crate::image::IMAGE_LEN;

    /// Single-file image store for hosted targets.
    ///
    /// Writes go to a sibling temporary file that is synced to disk and then
    /// renamed over the image, so a crash mid-write leaves the previous image
    /// intact.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct FileBackend {
        path: PathBuf,
    }

    impl FileBackend {
        /// Store the image at `path`.
        #[must_use]
        pub fn new(path: impl Into<PathBuf>) -> Self {
            Self { path: path.into() }
        }

        /// Image file location.
        #[must_use]
        pub fn path(&self) -> &Path {
            &self.path
        }

        fn staging_path(&self) -> PathBuf {
            let mut staging = self.path.clone().into_os_string();
            staging.push(".tmp");
            PathBuf::from(staging)
        }
    }

    impl RetentionBackend for FileBackend {
        fn load(&mut self) -> DiagnosticsResult<Option<[u8; IMAGE_LEN]>> {
            let bytes = match fs::read(&self.path) {
                Ok(bytes) => bytes,
                Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
                Err(err) => return Err(err.into()),
            };
            bytes
                .get(..IMAGE_LEN)
                .and_then(|image| <[u8; IMAGE_LEN]>::try_from(image).ok())
                .map(Some)
                .ok_or_else(|| DiagnosticsError::image_too_short(IMAGE_LEN, bytes.len()))
        }

        fn store(&mut self, image: &[u8; IMAGE_LEN]) -> DiagnosticsResult<()> {
            let staging = self.staging_path();
            let mut file = File::create(&staging)?;
            file.write_all(image)?;
            file.sync_all()?;
            fs::rename(&staging, &self.path)?;
            Ok(())
        }
    }
}

#[cfg(feature = "std")]
pub use file::FileBackend;

impl Diagnostics {
    /// Write the current record to `backend`.
    ///
    /// # Errors
    ///
    /// Propagates backend failures.
    pub fn persist<B: RetentionBackend + ?Sized>(&self, backend: &mut B) -> DiagnosticsResult<()> {
        let record = self.diagnostics();
        backend.store(&record.to_image())?;
        crate::diag_debug!(magic = record.diag_magic, "diagnostics persisted");
        Ok(())
    }

    /// Replace the record with the image stored in `backend`.
    ///
    /// Returns `false` and leaves the record alone when the backend holds
    /// nothing. The registered callback is never touched.
    ///
    /// # Errors
    ///
    /// Propagates backend failures and image decoding errors; the record is
    /// left alone in both cases.
    pub fn restore<B: RetentionBackend + ?Sized>(&self, backend: &mut B) -> DiagnosticsResult<bool> {
        let Some(image) = backend.load()? else {
            return Ok(false);
        };
        let record = DiagnosticRecord::from_image(&image)?;
        self.load_record(&record);
        crate::diag_info!(
            magic = record.diag_magic,
            boot_flag = record.boot_flag,
            "diagnostics restored from backend"
        );
        Ok(true)
    }
}
