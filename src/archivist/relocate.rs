use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use crate::error::ArchiveError;

fn partial_path(to: &Path) -> PathBuf {
    let name = to
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    to.with_file_name(format!(".{name}.partial"))
}

pub fn ensure_dir(dir: &Path) -> Result<(), ArchiveError> {
    if dir.is_dir() {
        return Ok(());
    }
    fs::create_dir_all(dir).map_err(|source| ArchiveError::DirectoryCreate {
        dir: dir.to_path_buf(),
        source,
    })
}

// The destination only ever appears whole, and is taken back out again when
// the source cannot be removed: a failed move leaves nothing in the bucket.
fn copy_then_swap<F>(from: &Path, to: &Path, remove_source: F) -> io::Result<()>
where
    F: FnOnce(&Path) -> io::Result<()>,
{
    let staging = partial_path(to);
    let copied = fs::copy(from, &staging).and_then(|_| fs::rename(&staging, to));
    if let Err(err) = copied {
        let _ = fs::remove_file(&staging);
        return Err(err);
    }
    if let Err(err) = remove_source(from) {
        let _ = fs::remove_file(to);
        return Err(err);
    }
    Ok(())
}

fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::CrossesDevices => {
            copy_then_swap(from, to, |path| fs::remove_file(path))
        }
        Err(err) => Err(err),
    }
}

/// Creates the bucket and moves `from` into it. A file that appeared at `to`
/// after naming is replaced.
pub fn relocate(from: &Path, to: &Path) -> Result<(), ArchiveError> {
    if let Some(parent) = to.parent() {
        ensure_dir(parent)?;
    }
    move_file(from, to).map_err(|source| ArchiveError::Move {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    })
}

pub fn discard_duplicate(from: &Path, existing: &Path) -> Result<(), ArchiveError> {
    fs::remove_file(from).map_err(|source| ArchiveError::Move {
        from: from.to_path_buf(),
        to: existing.to_path_buf(),
        source,
    })
}
