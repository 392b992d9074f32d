//! Cross-process file locking for cache coordination.
//!
//! Serialises archive downloads across parallel test runners sharing one
//! cache. On Unix systems, uses `flock(2)` for advisory locking. On non-Unix
//! platforms, locking is a no-op.

use camino::Utf8Path;
use std::fs::{File, OpenOptions};
use std::io;

#[cfg(unix)]
use std::os::unix::io::AsRawFd;

/// Subdirectory within the cache for lock files.
const LOCKS_SUBDIR: &str = ".locks";

/// Guard that holds a file lock until dropped.
///
/// The lock is automatically released when the guard goes out of scope.
#[derive(Debug)]
pub struct CacheLock {
    _file: File,
}

impl CacheLock {
    /// Acquires an exclusive lock for a single archive, blocking until any
    /// other holder releases it.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock file cannot be created or the lock cannot
    /// be acquired.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use camino::Utf8Path;
    /// use pg_embed_lifecycle::cache::CacheLock;
    ///
    /// let cache_dir = Utf8Path::new("/tmp/pg-cache");
    /// let _lock = CacheLock::acquire_exclusive(
    ///     cache_dir,
    ///     "embedded-postgres-binaries-linux-amd64-12.1.0.txz",
    /// )?;
    /// // The archive can now be written without racing another process.
    /// # Ok::<(), std::io::Error>(())
    /// ```
    #[cfg(unix)]
    pub fn acquire_exclusive(cache_dir: &Utf8Path, archive: &str) -> io::Result<Self> {
        let file = open_lock_file(cache_dir, archive)?;

        // SAFETY: The file descriptor obtained from `file.as_raw_fd()` is valid
        // because `file` was opened via `OpenOptions::open` and remains owned by
        // this scope until after the `flock` call completes. No other code moves
        // or closes the descriptor while this block runs.
        let result = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX) };
        if result != 0 {
            return Err(io::Error::last_os_error());
        }

        Ok(Self { _file: file })
    }

    /// No-op lock acquisition on non-Unix platforms.
    #[cfg(not(unix))]
    pub fn acquire_exclusive(cache_dir: &Utf8Path, archive: &str) -> io::Result<Self> {
        // Concurrent fetches may race on non-Unix platforms.
        let file = open_lock_file(cache_dir, archive)?;
        Ok(Self { _file: file })
    }
}

fn open_lock_file(cache_dir: &Utf8Path, archive: &str) -> io::Result<File> {
    let locks_dir = cache_dir.join(LOCKS_SUBDIR);
    std::fs::create_dir_all(&locks_dir)?;

    let lock_path = locks_dir.join(format!("{archive}.lock"));
    OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(&lock_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;
    use tempfile::tempdir;

    const ARCHIVE: &str = "embedded-postgres-binaries-linux-amd64-12.1.0.txz";

    #[test]
    fn acquire_exclusive_creates_lock_file() {
        let temp = tempdir().expect("tempdir");
        let cache_dir = camino::Utf8Path::from_path(temp.path()).expect("utf8 path");
        let _lock = CacheLock::acquire_exclusive(cache_dir, ARCHIVE).expect("acquire lock");

        let lock_path = temp.path().join(LOCKS_SUBDIR).join(format!("{ARCHIVE}.lock"));
        assert!(lock_path.exists(), "lock file should be created");
    }

    #[test]
    fn different_archives_have_separate_locks() {
        let temp = tempdir().expect("tempdir");
        let cache_dir = camino::Utf8Path::from_path(temp.path()).expect("utf8 path");

        let lock1 = CacheLock::acquire_exclusive(cache_dir, ARCHIVE).expect("acquire lock 1");
        let lock2 = CacheLock::acquire_exclusive(cache_dir, "other.txz").expect("acquire lock 2");

        // Different archives should not block each other
        drop(lock1);
        drop(lock2);
    }

    #[cfg(unix)]
    #[test]
    fn exclusive_lock_blocks_a_second_holder_until_released() {
        let temp = tempdir().expect("tempdir");
        let cache_dir =
            camino::Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("utf8 path");
        let first = CacheLock::acquire_exclusive(&cache_dir, ARCHIVE).expect("first lock");

        let (tx, rx) = mpsc::channel();
        let contender_dir = cache_dir.clone();
        let contender = thread::spawn(move || {
            let lock = CacheLock::acquire_exclusive(&contender_dir, ARCHIVE);
            tx.send(()).expect("notify");
            lock.map(drop)
        });

        assert!(
            rx.recv_timeout(Duration::from_millis(200)).is_err(),
            "second holder should block while the first lock is held"
        );
        drop(first);
        rx.recv_timeout(Duration::from_secs(5))
            .expect("second holder should acquire after release");
        contender
            .join()
            .expect("contender thread")
            .expect("contender lock");
    }
}
