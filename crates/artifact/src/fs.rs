//! Sidecar files

use std::ffi::OsString;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::bundle::SIGNATURE_FILE_EXTENSION;
use crate::error::Result;

/// `{artifact}.vxsig`, next to the artifact or inside `directory`
pub fn signature_file_path(artifact_path: &Path, directory: Option<&Path>) -> PathBuf {
    let mut file_name = artifact_path
        .file_name()
        .map(OsString::from)
        .unwrap_or_default();
    file_name.push(".");
    file_name.push(SIGNATURE_FILE_EXTENSION);

    match directory {
        Some(directory) => directory.join(file_name),
        None => artifact_path.with_file_name(file_name),
    }
}

/// Replace `path` with `contents` in one step
///
/// The data goes to a temporary file in the destination directory which is
/// then renamed over `path`, so readers see the old file or the new one and
/// never a partial write. With `sync` the file and its directory are flushed
/// to disk before returning.
pub fn write_atomically(path: &Path, contents: &[u8], sync: bool) -> Result<()> {
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut file = NamedTempFile::new_in(directory)?;
    file.write_all(contents)?;
    if sync {
        file.as_file().sync_all()?;
    }
    file.persist(path).map_err(|e| e.error)?;

    if sync {
        sync_directory(directory)?;
    }
    debug!(path = %path.display(), sync, "Wrote file");
    Ok(())
}

#[cfg(unix)]
fn sync_directory(directory: &Path) -> std::io::Result<()> {
    File::open(directory)?.sync_all()
}

#[cfg(not(unix))]
fn sync_directory(_directory: &Path) -> std::io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn test_signature_file_path() {
        assert_eq!(
            signature_file_path(Path::new("/media/usb/ballot-package.zip"), None),
            PathBuf::from("/media/usb/ballot-package.zip.vxsig")
        );
        assert_eq!(
            signature_file_path(Path::new("/media/usb/cvrs"), Some(Path::new("/tmp/sigs"))),
            PathBuf::from("/tmp/sigs/cvrs.vxsig")
        );
    }

    #[test]
    fn test_write_atomically_replaces() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("file.vxsig");
        fs::write(&path, b"old").unwrap();

        write_atomically(&path, b"new", true).unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"new");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
