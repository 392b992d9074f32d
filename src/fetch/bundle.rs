//! Extraction of the platform archive from a downloaded release bundle.

use std::io::{Cursor, Read, Write};

use camino::Utf8Path;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{FetchError, FetchResult};
use crate::observability::FETCH_TARGET;

/// Suffix identifying the platform archive inside a bundle.
pub(super) const ARCHIVE_SUFFIX: &str = ".txz";

/// Returns the bytes of the platform archive held in the zip `body`.
///
/// When several entries match, the last one wins.
pub(super) fn platform_archive(url: &str, body: &[u8]) -> FetchResult<Vec<u8>> {
    let bundle_error = |source| FetchError::Bundle {
        url: url.to_owned(),
        source,
    };
    let mut bundle = zip::ZipArchive::new(Cursor::new(body)).map_err(bundle_error)?;
    let mut archive = None;
    for index in 0..bundle.len() {
        let mut entry = bundle.by_index(index).map_err(bundle_error)?;
        if !entry.is_file() || !entry.name().ends_with(ARCHIVE_SUFFIX) {
            continue;
        }
        debug!(target: FETCH_TARGET, entry = entry.name(), "found platform archive in bundle");
        let mut bytes = Vec::new();
        entry
            .read_to_end(&mut bytes)
            .map_err(|err| bundle_error(zip::result::ZipError::from(err)))?;
        archive = Some(bytes);
    }
    archive.ok_or_else(|| FetchError::NoMatchingArchive {
        url: url.to_owned(),
        suffix: ARCHIVE_SUFFIX,
    })
}

/// Writes `bytes` to `destination` via a sibling temp file so readers never
/// observe a partial archive.
pub(super) fn write_archive(destination: &Utf8Path, bytes: &[u8]) -> FetchResult<()> {
    let write_error = |source| FetchError::Write {
        path: destination.to_path_buf(),
        source,
    };
    let parent = destination
        .parent()
        .filter(|parent| !parent.as_str().is_empty())
        .unwrap_or_else(|| Utf8Path::new("."));
    std::fs::create_dir_all(parent).map_err(write_error)?;
    let mut staged = NamedTempFile::new_in(parent).map_err(write_error)?;
    staged.write_all(bytes).map_err(write_error)?;
    staged.flush().map_err(write_error)?;
    staged
        .persist(destination)
        .map_err(|err| write_error(err.error))?;
    Ok(())
}
