//! Unpacking of cached archives into the runtime directory.

use std::fs::File;

use camino::Utf8Path;
use color_eyre::eyre::{Context, Result};
use tracing::debug;

use crate::observability::LOG_TARGET;

/// Unpacks an archive into a destination directory.
///
/// The destination is created by the caller and is expected to be empty.
pub trait ArchiveExtractor: Send + Sync {
    /// Extracts `archive` into `destination`.
    ///
    /// # Errors
    /// Returns an error when the archive cannot be read or decoded, or when
    /// an entry cannot be written.
    fn extract(&self, archive: &Utf8Path, destination: &Utf8Path) -> Result<()>;
}

/// Extractor for xz-compressed tar archives (`.txz`).
#[derive(Debug, Clone, Copy, Default)]
pub struct TarXzExtractor;

impl ArchiveExtractor for TarXzExtractor {
    fn extract(&self, archive: &Utf8Path, destination: &Utf8Path) -> Result<()> {
        debug!(
            target: LOG_TARGET,
            archive = %archive,
            destination = %destination,
            "extracting archive"
        );
        let file = File::open(archive).with_context(|| format!("open archive {archive}"))?;
        let mut entries = tar::Archive::new(xz2::read::XzDecoder::new(file));
        entries.set_preserve_permissions(true);
        entries
            .unpack(destination)
            .with_context(|| format!("unpack {archive} into {destination}"))
    }
}
