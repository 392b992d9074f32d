//! Runtime directory layout and one-shot cluster initialisation.
//!
//! A runtime directory holds everything a single server run needs:
//!
//! ```text
//! <runtime>/
//!   bin/initdb
//!   bin/postgres
//!   data/
//!   pwfile
//! ```
//!
//! It is wiped and rebuilt on every start.

mod initializer;
mod output;

use camino::{Utf8Path, Utf8PathBuf};

pub(crate) use self::initializer::{InitRequest, initialize};
use crate::Config;

const EXTRACTED_DIR_NAME: &str = "extracted";
const DATA_DIR_NAME: &str = "data";
const PWFILE_NAME: &str = "pwfile";
const BIN_DIR_NAME: &str = "bin";

/// Paths inside a runtime directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RuntimeLayout {
    root: Utf8PathBuf,
}

impl RuntimeLayout {
    pub(crate) fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Uses the configured runtime path, or `extracted/` beside the cached
    /// archive.
    pub(crate) fn resolve(config: &Config, archive: &Utf8Path) -> Self {
        if let Some(path) = config.runtime_path() {
            return Self::new(path);
        }
        let cache_dir = archive
            .parent()
            .filter(|parent| !parent.as_str().is_empty())
            .unwrap_or_else(|| Utf8Path::new("."));
        Self::new(cache_dir.join(EXTRACTED_DIR_NAME))
    }

    pub(crate) fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub(crate) fn data_dir(&self) -> Utf8PathBuf {
        self.root.join(DATA_DIR_NAME)
    }

    pub(crate) fn pwfile(&self) -> Utf8PathBuf {
        self.root.join(PWFILE_NAME)
    }

    /// Path of an executable shipped in the archive's `bin/` directory.
    pub(crate) fn binary(&self, name: &str) -> Utf8PathBuf {
        self.root
            .join(BIN_DIR_NAME)
            .join(format!("{name}{}", std::env::consts::EXE_SUFFIX))
    }
}

#[cfg(test)]
mod tests;
