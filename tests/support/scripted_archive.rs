//! Builds `.txz` archives whose binaries are shell scripts, and a fetch
//! strategy that serves them.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use camino::Utf8Path;
use color_eyre::eyre::{Context, Result};
use pg_embed_lifecycle::{FetchError, FetchResult, Platform, RemoteFetchStrategy};

/// `initdb` stand-in that creates the requested data directory.
pub const INITDB_OK: &str = "#!/bin/sh\nmkdir -p \"$6\"\n";

/// `postgres` stand-in that idles until signalled.
pub const SERVER_IDLE: &str = "#!/bin/sh\nexec sleep 30\n";

/// Packs `initdb` and `postgres` scripts into an xz-compressed tar archive.
pub fn archive_bytes(initdb: &str, postgres: &str) -> Result<Vec<u8>> {
    let encoder = xz2::write::XzEncoder::new(Vec::new(), 6);
    let mut builder = tar::Builder::new(encoder);
    for (name, body) in [("bin/initdb", initdb), ("bin/postgres", postgres)] {
        let mut header = tar::Header::new_gnu();
        header.set_size(u64::try_from(body.len()).context("script size")?);
        header.set_mode(0o755);
        header.set_cksum();
        builder
            .append_data(&mut header, name, body.as_bytes())
            .with_context(|| format!("append {name}"))?;
    }
    let encoder = builder.into_inner().context("finish tar stream")?;
    encoder.finish().context("finish xz stream")
}

/// Fetch strategy that writes a prepared archive and counts its calls.
#[derive(Clone)]
pub struct ScriptedFetch {
    archive: Arc<Vec<u8>>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedFetch {
    /// Serves an archive built from `initdb` and `postgres` scripts.
    pub fn new(initdb: &str, postgres: &str) -> Result<Self> {
        Ok(Self {
            archive: Arc::new(archive_bytes(initdb, postgres)?),
            calls: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Number of fetches performed so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl RemoteFetchStrategy for ScriptedFetch {
    fn fetch(&self, _platform: &Platform, destination: &Utf8Path) -> FetchResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let write_error = |source| FetchError::Write {
            path: destination.to_path_buf(),
            source,
        };
        if let Some(parent) = destination.parent() {
            std::fs::create_dir_all(parent).map_err(write_error)?;
        }
        std::fs::write(destination, self.archive.as_slice()).map_err(write_error)
    }
}
