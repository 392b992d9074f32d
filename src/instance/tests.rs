//! Tests for runtime layout resolution and `initdb` orchestration.

use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use color_eyre::eyre::{Result, eyre};
use tempfile::tempdir;

use super::*;
use crate::error::StartError;
use crate::extract::ArchiveExtractor;

fn utf8_root(temp: &tempfile::TempDir) -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("utf8 path")
}

#[test]
fn runtime_defaults_to_extracted_beside_the_cache() {
    let layout = RuntimeLayout::resolve(
        &Config::default(),
        Utf8Path::new("/home/dev/.embedded-postgres-go/embedded-postgres-binaries-linux-amd64-12.1.0.txz"),
    );
    assert_eq!(layout.root(), Utf8Path::new("/home/dev/.embedded-postgres-go/extracted"));
    assert_eq!(
        layout.pwfile(),
        Utf8Path::new("/home/dev/.embedded-postgres-go/extracted/pwfile")
    );
    assert_eq!(
        layout.data_dir(),
        Utf8Path::new("/home/dev/.embedded-postgres-go/extracted/data")
    );
}

#[test]
fn configured_runtime_path_wins() {
    let config = Config::default().with_runtime_path("/srv/pg-runtime");
    let layout = RuntimeLayout::resolve(&config, Utf8Path::new("/cache/archive.txz"));
    assert_eq!(layout.root(), Utf8Path::new("/srv/pg-runtime"));
}

#[test]
fn relative_archive_without_parent_resolves_beside_working_directory() {
    let layout = RuntimeLayout::resolve(&Config::default(), Utf8Path::new("archive.txz"));
    assert_eq!(layout.root(), Utf8Path::new("./extracted"));
}

struct FailingExtractor;

impl ArchiveExtractor for FailingExtractor {
    fn extract(&self, _archive: &Utf8Path, _destination: &Utf8Path) -> Result<()> {
        Err(eyre!("archive is corrupt"))
    }
}

#[test]
fn extraction_failures_are_reported_as_extraction_errors() {
    let temp = tempdir().expect("tempdir");
    let layout = RuntimeLayout::new(utf8_root(&temp).join("runtime"));
    let request = InitRequest {
        layout: &layout,
        archive: Utf8Path::new("/nowhere/archive.txz"),
        extractor: &FailingExtractor,
        username: "postgres",
        password: "postgres",
        timeout: Duration::from_secs(5),
    };

    let err = initialize(&request).expect_err("extraction should fail");
    assert!(matches!(err, StartError::Extraction(_)), "unexpected error: {err:?}");
    assert!(!layout.pwfile().exists(), "pwfile is written after extraction");
}

#[cfg(unix)]
mod scripted {
    use std::os::unix::fs::PermissionsExt;

    use super::*;
    use crate::error::StartResult;

    /// Extractor that lays down a shell script in place of `initdb`.
    struct ScriptExtractor {
        initdb: &'static str,
    }

    impl ArchiveExtractor for ScriptExtractor {
        fn extract(&self, _archive: &Utf8Path, destination: &Utf8Path) -> Result<()> {
            let bin = destination.join("bin");
            std::fs::create_dir_all(&bin)?;
            let script = bin.join("initdb");
            std::fs::write(&script, self.initdb)?;
            std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755))?;
            Ok(())
        }
    }

    fn run(layout: &RuntimeLayout, initdb: &'static str, timeout: Duration) -> StartResult<()> {
        let extractor = ScriptExtractor { initdb };
        initialize(&InitRequest {
            layout,
            archive: Utf8Path::new("/nowhere/archive.txz"),
            extractor: &extractor,
            username: "admin",
            password: "s3cret",
            timeout,
        })
    }

    const RECORDING_INITDB: &str = r#"#!/bin/sh
printf '%s\n' "$@" > "$(dirname "$0")/../initdb.args"
mkdir -p "$6"
"#;

    #[test]
    fn initdb_receives_password_auth_arguments() {
        let temp = tempdir().expect("tempdir");
        let layout = RuntimeLayout::new(utf8_root(&temp).join("runtime"));

        run(&layout, RECORDING_INITDB, Duration::from_secs(10)).expect("initialize");

        let args = std::fs::read_to_string(layout.root().join("initdb.args")).expect("args");
        let expected = format!(
            "-A\npassword\n-U\nadmin\n-D\n{}\n--pwfile={}\n",
            layout.data_dir(),
            layout.pwfile()
        );
        assert_eq!(args, expected);
        assert!(layout.data_dir().is_dir());
    }

    #[test]
    fn pwfile_holds_the_password_with_owner_only_permissions() {
        let temp = tempdir().expect("tempdir");
        let layout = RuntimeLayout::new(utf8_root(&temp).join("runtime"));

        run(&layout, RECORDING_INITDB, Duration::from_secs(10)).expect("initialize");

        assert_eq!(std::fs::read(layout.pwfile()).expect("read"), b"s3cret");
        let mode = std::fs::metadata(layout.pwfile())
            .expect("metadata")
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn stale_runtime_contents_are_removed() {
        let temp = tempdir().expect("tempdir");
        let layout = RuntimeLayout::new(utf8_root(&temp).join("runtime"));
        std::fs::create_dir_all(layout.data_dir()).expect("mkdir");
        std::fs::write(layout.data_dir().join("PG_VERSION"), b"11").expect("write");

        run(&layout, RECORDING_INITDB, Duration::from_secs(10)).expect("initialize");

        assert!(!layout.data_dir().join("PG_VERSION").exists());
    }

    #[test]
    fn non_zero_exit_surfaces_initdb_output() {
        let temp = tempdir().expect("tempdir");
        let layout = RuntimeLayout::new(utf8_root(&temp).join("runtime"));
        let failing = "#!/bin/sh\necho 'initdb: invalid locale settings' >&2\nexit 1\n";

        let err = run(&layout, failing, Duration::from_secs(10)).expect_err("initdb should fail");

        let report = match err {
            StartError::Initialization(report) => report,
            other => panic!("expected initialization error, got {other:?}"),
        };
        let rendered = format!("{report:?}");
        assert!(rendered.contains("initdb exited with"), "{rendered}");
        assert!(rendered.contains("invalid locale settings"), "{rendered}");
    }

    #[test]
    fn verbose_initdb_output_does_not_stall_the_wait() {
        let temp = tempdir().expect("tempdir");
        let layout = RuntimeLayout::new(utf8_root(&temp).join("runtime"));
        let verbose = "#!/bin/sh\nyes 'creating template1 database' | head -n 20000\nyes 'warning: enabling trust' | head -n 20000 >&2\nmkdir -p \"$6\"\n";

        run(&layout, verbose, Duration::from_secs(10)).expect("initialize");

        assert!(layout.data_dir().is_dir());
    }

    #[test]
    fn verbose_failure_output_is_truncated() {
        let temp = tempdir().expect("tempdir");
        let layout = RuntimeLayout::new(utf8_root(&temp).join("runtime"));
        let verbose = "#!/bin/sh\nyes 'FATAL: out of disk' | head -n 20000 >&2\nexit 1\n";

        let err = run(&layout, verbose, Duration::from_secs(10)).expect_err("initdb should fail");

        let report = match err {
            StartError::Initialization(report) => report,
            other => panic!("expected initialization error, got {other:?}"),
        };
        let rendered = format!("{report:?}");
        assert!(rendered.contains("initdb exited with"), "{rendered}");
        assert!(rendered.contains("[truncated]"), "{rendered}");
    }

    #[test]
    fn hung_initdb_is_killed_after_the_timeout() {
        let temp = tempdir().expect("tempdir");
        let layout = RuntimeLayout::new(utf8_root(&temp).join("runtime"));
        let hanging = "#!/bin/sh\nexec sleep 30\n";

        let started = std::time::Instant::now();
        let err = run(&layout, hanging, Duration::from_millis(300))
            .expect_err("initdb should time out");

        assert!(started.elapsed() < Duration::from_secs(10));
        let report = match err {
            StartError::Initialization(report) => report,
            other => panic!("expected initialization error, got {other:?}"),
        };
        assert!(format!("{report:?}").contains("timed out"));
    }
}
