//! Atomic writes and metadata-preserving copies

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use fs2::FileExt;

use crate::{Error, Result};

/// Write content atomically to a file with locking.
///
/// Uses write-to-temp-then-rename so a crash never leaves a half-written file
/// in the installation. The temp file lives in the same directory to keep the
/// rename on one filesystem.
pub fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }

    let temp_name = format!(
        ".{}.{}.tmp",
        path.file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default(),
        std::process::id()
    );
    let temp_path = path.with_file_name(&temp_name);

    let mut temp_file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&temp_path)
        .map_err(|e| Error::io(&temp_path, e))?;

    temp_file
        .lock_exclusive()
        .map_err(|_| Error::LockFailed {
            path: path.to_path_buf(),
        })?;

    temp_file
        .write_all(content)
        .map_err(|e| Error::io(&temp_path, e))?;
    temp_file.sync_all().map_err(|e| Error::io(&temp_path, e))?;

    FileExt::unlock(&temp_file).map_err(|_| Error::LockFailed {
        path: path.to_path_buf(),
    })?;

    // Keep the original mode when replacing an existing file.
    if let Ok(meta) = fs::metadata(path) {
        let _ = fs::set_permissions(&temp_path, meta.permissions());
    }

    fs::rename(&temp_path, path).map_err(|e| Error::io(path, e))?;

    Ok(())
}

/// Read text content from a file.
pub fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| Error::io(path, e))
}

/// Write text content to a file atomically.
pub fn write_text(path: &Path, content: &str) -> Result<()> {
    write_atomic(path, content.as_bytes())
}

/// Copy a regular file, keeping permissions and modification time.
///
/// Parent directories of `dest` are created. Timestamp preservation is best
/// effort; a platform that refuses it still gets the copy.
pub fn copy_preserving(src: &Path, dest: &Path) -> Result<u64> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }

    // fs::copy carries permission bits over on every supported platform.
    let bytes = fs::copy(src, dest).map_err(|e| Error::io(src, e))?;

    let meta = fs::metadata(src).map_err(|e| Error::io(src, e))?;
    if let Ok(modified) = meta.modified() {
        let applied = OpenOptions::new()
            .write(true)
            .open(dest)
            .and_then(|f| f.set_modified(modified));
        if let Err(e) = applied {
            tracing::debug!("Could not preserve mtime on {}: {}", dest.display(), e);
        }
    }

    Ok(bytes)
}

/// Recreate the symlink at `src` as a symlink at `dest` (never dereferenced).
pub fn copy_symlink(src: &Path, dest: &Path) -> Result<()> {
    let target = fs::read_link(src).map_err(|e| Error::io(src, e))?;
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }
    if fs::symlink_metadata(dest).is_ok() {
        remove_path(dest)?;
    }
    create_symlink(&target, dest)
}

/// Create a symlink at `link` pointing at `target`.
#[cfg(unix)]
pub fn create_symlink(target: &Path, link: &Path) -> Result<()> {
    std::os::unix::fs::symlink(target, link).map_err(|e| Error::io(link, e))
}

/// Create a symlink at `link` pointing at `target`.
///
/// Windows needs to know whether the target is a directory; relative targets
/// are resolved against the link's parent to find out.
#[cfg(windows)]
pub fn create_symlink(target: &Path, link: &Path) -> Result<()> {
    let resolved = match link.parent() {
        Some(parent) if target.is_relative() => parent.join(target),
        _ => target.to_path_buf(),
    };
    let result = if resolved.is_dir() {
        std::os::windows::fs::symlink_dir(target, link)
    } else {
        std::os::windows::fs::symlink_file(target, link)
    };
    result.map_err(|e| Error::io(link, e))
}

/// Remove a file, symlink, or directory tree without following symlinks.
pub fn remove_path(path: &Path) -> Result<()> {
    let meta = fs::symlink_metadata(path).map_err(|e| Error::io(path, e))?;
    let result = if meta.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    result.map_err(|e| Error::io(path, e))
}

/// Move a path, falling back to copy-then-delete across filesystems.
pub fn move_path(src: &Path, dest: &Path) -> Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }
    if fs::rename(src, dest).is_ok() {
        return Ok(());
    }
    let meta = fs::symlink_metadata(src).map_err(|e| Error::io(src, e))?;
    if meta.file_type().is_symlink() {
        copy_symlink(src, dest)?;
    } else {
        copy_preserving(src, dest)?;
    }
    remove_path(src)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn write_atomic_creates_parents_and_leaves_no_temp() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("a/b/file.txt");

        write_atomic(&target, b"content").unwrap();

        assert_eq!(fs::read_to_string(&target).unwrap(), "content");
        let leftovers: Vec<_> = fs::read_dir(target.parent().unwrap())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn write_atomic_replaces_existing() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("file.txt");
        fs::write(&target, "old").unwrap();

        write_text(&target, "new").unwrap();
        assert_eq!(read_text(&target).unwrap(), "new");
    }

    #[test]
    fn copy_preserving_keeps_mtime() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src.txt");
        let dest = dir.path().join("out/dest.txt");
        fs::write(&src, "data").unwrap();
        let past = std::time::SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(1_000_000);
        OpenOptions::new()
            .write(true)
            .open(&src)
            .unwrap()
            .set_modified(past)
            .unwrap();

        let copied = copy_preserving(&src, &dest).unwrap();

        assert_eq!(copied, 4);
        assert_eq!(fs::metadata(&dest).unwrap().modified().unwrap(), past);
    }

    #[cfg(unix)]
    #[test]
    fn copy_symlink_keeps_link() {
        let dir = TempDir::new().unwrap();
        let link = dir.path().join("link");
        create_symlink(Path::new("missing-target"), &link).unwrap();

        let dest = dir.path().join("copy/link");
        copy_symlink(&link, &dest).unwrap();

        let meta = fs::symlink_metadata(&dest).unwrap();
        assert!(meta.file_type().is_symlink());
        assert_eq!(fs::read_link(&dest).unwrap(), Path::new("missing-target"));
    }

    #[test]
    fn move_path_moves_file() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("a.txt");
        fs::write(&src, "x").unwrap();
        let dest = dir.path().join("nested/b.txt");

        move_path(&src, &dest).unwrap();

        assert!(!src.exists());
        assert_eq!(fs::read_to_string(dest).unwrap(), "x");
    }
}
