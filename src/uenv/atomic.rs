//! Crash-safe file replacement.
use std::fs::{self, File};
use std::io;
use std::path::Path;

use crate::error::StoreError;

/// Replace `path` with the bytes produced by `write`, atomically.
///
/// The content goes to a temporary file in the same directory, is synced to
/// disk, and is then renamed over `path`. If `write` (or any step before the
/// rename) fails, the temporary file is removed and `path` is left untouched.
/// Permissions of an existing target are carried over to the new file.
///
/// # Errors
///
/// Returns [`StoreError::Io`] naming the failed step and carrying the OS
/// error text.
pub fn atomic_write<F>(path: &Path, write: F) -> Result<(), StoreError>
where
    F: FnOnce(&mut File) -> io::Result<()>,
{
    let shown = path.display().to_string();
    let io_err = |action: &'static str| {
        let path = shown.clone();
        move |source: io::Error| StoreError::Io {
            action,
            path,
            source,
        }
    };

    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = path
        .file_name()
        .map_or_else(|| "uenv".into(), |n| n.to_string_lossy());

    let mut tmp = tempfile::Builder::new()
        .prefix(&format!(".{file_name}."))
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(io_err("create temporary file for"))?;

    if let Ok(meta) = fs::metadata(path) {
        tmp.as_file()
            .set_permissions(meta.permissions())
            .map_err(io_err("copy permissions for"))?;
    }

    write(tmp.as_file_mut()).map_err(io_err("write"))?;
    tmp.as_file().sync_all().map_err(io_err("sync"))?;

    // On failure the returned NamedTempFile is dropped, removing the file.
    tmp.persist(path)
        .map_err(|e| e.error)
        .map_err(io_err("replace"))?;

    sync_dir(dir);
    tracing::debug!(path = %shown, "file replaced atomically");
    Ok(())
}

/// Flush the directory entry so the rename survives a power cut.
///
/// Best effort: not every filesystem (e.g. FAT boot partitions) supports it.
fn sync_dir(dir: &Path) {
    #[cfg(unix)]
    if let Err(err) = File::open(dir).and_then(|d| d.sync_all()) {
        tracing::debug!(dir = %dir.display(), %err, "directory sync skipped");
    }
    #[cfg(not(unix))]
    let _ = dir;
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Write as _;

    fn entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("uEnv.txt");
        fs::write(&path, "old\n").unwrap();

        atomic_write(&path, |f| f.write_all(b"new\n")).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "new\n");
        assert_eq!(entries(dir.path()), ["uEnv.txt"]);
    }

    #[test]
    fn creates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("uEnv.txt");

        atomic_write(&path, |f| f.write_all(b"fresh\n")).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "fresh\n");
    }

    #[test]
    fn failed_write_leaves_original_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("uEnv.txt");
        fs::write(&path, "console=ttyS0\ninterface=i2c0\n").unwrap();

        let err = atomic_write(&path, |f| {
            f.write_all(b"console=tt")?;
            Err(io::Error::other("simulated disk full"))
        })
        .unwrap_err();

        assert!(err.to_string().contains("simulated disk full"));
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "console=ttyS0\ninterface=i2c0\n"
        );
        assert_eq!(entries(dir.path()), ["uEnv.txt"], "temp file must be removed");
    }

    #[test]
    fn missing_directory_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent").join("uEnv.txt");

        let err = atomic_write(&path, |f| f.write_all(b"x")).unwrap_err();

        assert!(matches!(
            err,
            StoreError::Io {
                action: "create temporary file for",
                ..
            }
        ));
    }

    #[cfg(unix)]
    #[test]
    fn preserves_permissions_of_existing_file() {
        use std::os::unix::fs::PermissionsExt as _;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("uEnv.txt");
        fs::write(&path, "a\n").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();

        atomic_write(&path, |f| f.write_all(b"b\n")).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o644);
    }
}
