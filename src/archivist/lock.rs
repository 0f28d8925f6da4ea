use anyhow::{Context, Result, bail};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::error::ArchiveError;

pub const CYCLE_LOCK_FILE: &str = ".archivist.lock";
pub const DAEMON_LOCK_FILE: &str = ".archivist-daemon.lock";

pub fn cycle_lock_path(logs_dir: &Path) -> PathBuf {
    logs_dir.join(CYCLE_LOCK_FILE)
}

pub fn daemon_lock_path(logs_dir: &Path) -> PathBuf {
    logs_dir.join(DAEMON_LOCK_FILE)
}

#[derive(Debug)]
pub struct CycleLock {
    _file: File,
}

pub fn acquire_cycle_lock(logs_dir: &Path) -> Result<CycleLock, ArchiveError> {
    let path = cycle_lock_path(logs_dir);
    let file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&path)
        .map_err(|source| ArchiveError::Scan {
            dir: logs_dir.to_path_buf(),
            source,
        })?;
    if file.try_lock_exclusive().is_err() {
        return Err(ArchiveError::Locked { lock: path });
    }
    Ok(CycleLock { _file: file })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonLockPayload {
    pub pid: u32,
    pub build_uuid: String,
    pub start_time: String,
}

#[derive(Debug)]
pub struct DaemonLock {
    file: File,
    path: PathBuf,
}

impl DaemonLock {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for DaemonLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
        let _ = self.file.unlock();
    }
}

pub fn acquire_daemon_lock(logs_dir: &Path) -> Result<DaemonLock> {
    let path = daemon_lock_path(logs_dir);
    let mut file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .read(true)
        .write(true)
        .open(&path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    if file.try_lock_exclusive().is_err() {
        bail!(
            "archivist watcher already running (lock held: {})",
            path.display()
        );
    }

    let payload = DaemonLockPayload {
        pid: std::process::id(),
        build_uuid: env!("BUILD_UUID").to_string(),
        start_time: chrono::Utc::now().to_rfc3339(),
    };
    file.set_len(0)
        .with_context(|| format!("failed to truncate {}", path.display()))?;
    file.write_all(serde_json::to_string(&payload)?.as_bytes())
        .with_context(|| format!("failed to write {}", path.display()))?;
    file.flush()?;

    Ok(DaemonLock { file, path })
}

/// Whether a live watcher still holds the daemon lock. The kernel drops the
/// lock with its holder, so a leftover file with no holder reads as released.
pub fn daemon_lock_held(logs_dir: &Path) -> Result<bool> {
    let path = daemon_lock_path(logs_dir);
    let file = match File::open(&path) {
        Ok(file) => file,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(false),
        Err(err) => {
            return Err(err).with_context(|| format!("failed to open {}", path.display()));
        }
    };
    match file.try_lock_exclusive() {
        Ok(()) => {
            let _ = file.unlock();
            Ok(false)
        }
        Err(err) if err.kind() == fs2::lock_contended_error().kind() => Ok(true),
        Err(err) => Err(err).with_context(|| format!("failed to check lock {}", path.display())),
    }
}

pub fn read_daemon_lock(logs_dir: &Path) -> Result<Option<DaemonLockPayload>> {
    let path = daemon_lock_path(logs_dir);
    if !path.exists() {
        return Ok(None);
    }
    let raw =
        fs::read_to_string(&path).with_context(|| format!("failed to read {}", path.display()))?;
    if raw.trim().is_empty() {
        return Ok(None);
    }
    let payload = serde_json::from_str(raw.trim())
        .with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(Some(payload))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn second_cycle_lock_is_refused_until_first_drops() {
        let tmp = tempdir().expect("tempdir");
        let first = acquire_cycle_lock(tmp.path()).expect("first lock");
        let err = acquire_cycle_lock(tmp.path()).expect_err("second lock");
        assert!(matches!(err, ArchiveError::Locked { .. }));
        drop(first);
        acquire_cycle_lock(tmp.path()).expect("lock after release");
    }

    #[test]
    fn cycle_lock_in_missing_dir_is_a_scan_failure() {
        let tmp = tempdir().expect("tempdir");
        let err = acquire_cycle_lock(&tmp.path().join("missing")).expect_err("should fail");
        assert!(matches!(err, ArchiveError::Scan { .. }));
    }

    #[test]
    fn daemon_lock_records_pid_and_is_removed_on_drop() {
        let tmp = tempdir().expect("tempdir");
        let lock = acquire_daemon_lock(tmp.path()).expect("daemon lock");
        let payload = read_daemon_lock(tmp.path())
            .expect("read")
            .expect("payload");
        assert_eq!(payload.pid, std::process::id());
        assert!(acquire_daemon_lock(tmp.path()).is_err());

        let path = lock.path().to_path_buf();
        drop(lock);
        assert!(!path.exists());
        assert!(read_daemon_lock(tmp.path()).expect("read").is_none());
    }

    #[test]
    fn released_daemon_lock_can_be_taken_again_at_once() {
        let tmp = tempdir().expect("tempdir");
        drop(acquire_daemon_lock(tmp.path()).expect("first watcher"));
        let second = acquire_daemon_lock(tmp.path()).expect("second watcher");
        assert!(second.path().is_file());
        assert!(daemon_lock_held(tmp.path()).expect("held"));
    }

    #[test]
    fn daemon_lock_held_tracks_holder_not_file() {
        let tmp = tempdir().expect("tempdir");
        assert!(!daemon_lock_held(tmp.path()).expect("absent"));

        let lock = acquire_daemon_lock(tmp.path()).expect("daemon lock");
        assert!(daemon_lock_held(tmp.path()).expect("held"));
        // A second check must not disturb the holder.
        assert!(daemon_lock_held(tmp.path()).expect("still held"));
        drop(lock);

        fs::write(
            daemon_lock_path(tmp.path()),
            r#"{"pid":4194304,"build_uuid":"old","start_time":"2023-07-15T00:00:00Z"}"#,
        )
        .expect("write stale lock");
        assert!(!daemon_lock_held(tmp.path()).expect("stale"));
        assert!(daemon_lock_path(tmp.path()).is_file());
    }
}
