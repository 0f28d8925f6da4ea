use anyhow::Result;
use std::env;
use std::path::Path;

use crate::archivist::config::resolve_config_path;
use crate::archivist::lock::{daemon_lock_held, daemon_lock_path, read_daemon_lock};
use crate::archivist::scan::scan;
use crate::commands::{CommandReport, build_archivist};

include!(concat!(env!("OUT_DIR"), "/archivist_env_allowlist.rs"));

fn unknown_env_keys<I>(keys: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut out = keys
        .into_iter()
        .filter(|key| key.starts_with("ARCHIVIST_"))
        .filter(|key| !GENERATED_ENV_ALLOWLIST.contains(&key.as_str()))
        .collect::<Vec<_>>();
    out.sort();
    out
}

fn report_daemon(report: &mut CommandReport, logs_dir: &Path) {
    let lock_path = daemon_lock_path(logs_dir);
    let payload = match read_daemon_lock(logs_dir) {
        Ok(Some(payload)) => payload,
        Ok(None) => {
            report.detail("daemon.lock=not_found (watcher likely not running)");
            return;
        }
        Err(err) => {
            report.issue(format!("daemon.lock=corrupt ({err:#})"));
            return;
        }
    };

    report.detail(format!("daemon.lock={}", lock_path.display()));
    report.detail(format!("daemon.pid={}", payload.pid));
    report.detail(format!("daemon.start_time={}", payload.start_time));
    match daemon_lock_held(logs_dir) {
        Ok(true) => report.detail("daemon.process=alive"),
        Ok(false) => report.issue("daemon.process=dead (stale lock)"),
        Err(err) => report.issue(format!("daemon.process=unknown ({err:#})")),
    }

    let current_uuid = env!("BUILD_UUID");
    if payload.build_uuid == current_uuid {
        report.detail("daemon.build_match=ok");
    } else {
        report.issue(format!(
            "daemon.build_mismatch=found (lock={} current={})",
            payload.build_uuid, current_uuid
        ));
    }
}

pub fn run(logs_dir: Option<&Path>) -> Result<CommandReport> {
    let mut report = CommandReport::new("status");
    let (cfg, archivist) = build_archivist(logs_dir)?;
    let logs_dir = &archivist.settings().logs_dir;

    match resolve_config_path() {
        Some(path) if path.exists() => report.detail(format!("config_file={}", path.display())),
        Some(path) => report.detail(format!("config_file={} (absent, defaults)", path.display())),
        None => report.detail("config_file=none"),
    }
    report.detail(format!("logs_dir={}", logs_dir.display()));
    report.detail(format!("timezone={}", cfg.archive.timezone));
    report.detail(format!("dedupe_identical={}", cfg.archive.dedupe_identical));
    report.detail(format!(
        "schedule.initial_delay_secs={}",
        cfg.schedule.initial_delay_secs
    ));
    report.detail(format!("schedule.interval_secs={}", cfg.schedule.interval_secs));

    match scan(logs_dir) {
        Ok(pending) => report.detail(format!("pending={}", pending.len())),
        Err(err) => report.issue(err.to_string()),
    }

    report_daemon(&mut report, logs_dir);

    for key in unknown_env_keys(env::vars().map(|(k, _)| k)) {
        report.issue(format!("unrecognized env var {key} (typo?)"));
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allowlist_covers_config_keys() {
        for key in ["ARCHIVIST_LOGS_DIR", "ARCHIVIST_INTERVAL_SECS", "ARCHIVIST_HOME"] {
            assert!(GENERATED_ENV_ALLOWLIST.contains(&key), "{key} missing");
        }
    }

    #[test]
    fn unheld_lock_file_is_reported_stale() {
        let tmp = tempfile::tempdir().expect("tempdir");
        std::fs::write(
            daemon_lock_path(tmp.path()),
            format!(
                r#"{{"pid":{},"build_uuid":"{}","start_time":"2023-07-15T00:00:00Z"}}"#,
                std::process::id(),
                env!("BUILD_UUID")
            ),
        )
        .expect("write lock");

        let mut report = CommandReport::new("status");
        report_daemon(&mut report, tmp.path());
        assert!(report.issues.iter().any(|i| i.contains("stale lock")));
        assert!(report.details.iter().any(|d| d == "daemon.build_match=ok"));
    }

    #[test]
    fn misspelled_keys_are_flagged() {
        // Built at runtime so the build script does not allowlist the typo.
        let typo = format!("{}INTERVALL_SECS", "ARCHIVIST_");
        let got = unknown_env_keys(vec![
            "ARCHIVIST_LOGS_DIR".to_string(),
            typo.clone(),
            "PATH".to_string(),
        ]);
        assert_eq!(got, vec![typo]);
    }
}
