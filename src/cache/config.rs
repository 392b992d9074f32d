//! Resolution of the default cache root.

use camino::Utf8PathBuf;

/// Directory name used under the home directory (or the working directory
/// when no home directory can be resolved).
pub(crate) const CACHE_DIR_NAME: &str = ".embedded-postgres-go";

/// Resolves the default cache root.
///
/// Returns `~/.embedded-postgres-go` when the home directory is known and
/// representable as UTF-8, otherwise the relative `.embedded-postgres-go`.
///
/// # Examples
///
/// ```
/// use pg_embed_lifecycle::cache::resolve_cache_root;
///
/// let root = resolve_cache_root();
/// assert!(root.as_str().ends_with(".embedded-postgres-go"));
/// ```
#[must_use]
pub fn resolve_cache_root() -> Utf8PathBuf {
    resolve_from_home().unwrap_or_else(|| Utf8PathBuf::from(CACHE_DIR_NAME))
}

fn resolve_from_home() -> Option<Utf8PathBuf> {
    let home = dirs::home_dir()?;
    let path = Utf8PathBuf::from_path_buf(home).ok()?;
    Some(path.join(CACHE_DIR_NAME))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use serial_test::serial;
    use temp_env::with_var;

    #[test]
    #[serial]
    fn resolve_cache_root_uses_home_directory() {
        let root = with_var("HOME", Some("/home/fixture"), resolve_cache_root);
        assert_eq!(root.as_str(), "/home/fixture/.embedded-postgres-go");
    }
}
