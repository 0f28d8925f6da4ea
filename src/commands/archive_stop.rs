use anyhow::{Context, Result, bail};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::process::Command;
use std::thread;
use std::time::{Duration, Instant};

use crate::archivist::lock::{daemon_lock_held, daemon_lock_path, read_daemon_lock};
use crate::commands::{CommandReport, build_archivist};

const STOP_TIMEOUT: Duration = Duration::from_secs(8);
const STOP_POLL_INTERVAL: Duration = Duration::from_millis(100);

fn terminate(pid: u32) -> Result<()> {
    let status = Command::new("kill")
        .arg("-TERM")
        .arg(pid.to_string())
        .status()
        .context("failed to run `kill -TERM`")?;
    if !status.success() {
        bail!("`kill -TERM {pid}` was refused");
    }
    Ok(())
}

fn remove_lock_file(lock_path: &Path, report: &mut CommandReport) {
    match fs::remove_file(lock_path) {
        Ok(()) => report.detail(format!("removed daemon lock {}", lock_path.display())),
        Err(err) if err.kind() == ErrorKind::NotFound => {}
        Err(err) => report.issue(format!(
            "failed to remove daemon lock {}: {err}",
            lock_path.display()
        )),
    }
}

fn wait_for_release(logs_dir: &Path) -> Result<bool> {
    let deadline = Instant::now() + STOP_TIMEOUT;
    while Instant::now() < deadline {
        if !daemon_lock_held(logs_dir)? {
            return Ok(true);
        }
        thread::sleep(STOP_POLL_INTERVAL);
    }
    Ok(false)
}

// Only the process holding the daemon lock is signalled; the pid in the file
// is trusted only while that lock is held.
fn stop_watcher(logs_dir: &Path, report: &mut CommandReport) -> Result<()> {
    let lock_path = daemon_lock_path(logs_dir);
    report.detail(format!("daemon_lock={}", lock_path.display()));

    if !daemon_lock_held(logs_dir)? {
        if lock_path.exists() {
            report.detail("archivist watcher already stopped (lock released)");
            remove_lock_file(&lock_path, report);
        } else {
            report.detail("archivist watcher already stopped (lock file not found)");
        }
        return Ok(());
    }

    let Some(payload) = read_daemon_lock(logs_dir)? else {
        report.issue("daemon lock is held but records no pid yet; retry shortly");
        return Ok(());
    };
    let pid = payload.pid;
    report.detail(format!("daemon_pid={pid}"));

    terminate(pid)?;
    if wait_for_release(logs_dir)? {
        report.detail(format!("stopped archivist watcher pid={pid}"));
        remove_lock_file(&lock_path, report);
    } else {
        report.issue(format!(
            "daemon pid {pid} still holds the lock after {}s",
            STOP_TIMEOUT.as_secs()
        ));
    }
    Ok(())
}

pub fn run(logs_dir: Option<&Path>) -> Result<CommandReport> {
    let mut report = CommandReport::new("stop");
    let (_, archivist) = build_archivist(logs_dir)?;
    if let Err(err) = stop_watcher(&archivist.settings().logs_dir, &mut report) {
        report.issue(format!("{err:#}"));
    }
    Ok(report)
}
