use anyhow::{Context, Result};
use std::thread;
use std::time::Duration;
use tracing::info;

use crate::archivist::config::ScheduleConfig;
use crate::archivist::cycle::{Archivist, CycleOutcome};
use crate::archivist::lock::acquire_daemon_lock;

pub fn delay_before(schedule: &ScheduleConfig, cycle: u64) -> Duration {
    if cycle == 0 {
        Duration::from_secs(schedule.initial_delay_secs)
    } else {
        Duration::from_secs(schedule.interval_secs)
    }
}

// The cycle already logged why it aborted; the next pass retries.
pub fn run_logged_cycle(archivist: &Archivist) -> Option<CycleOutcome> {
    archivist.run_cycle().ok()
}

pub fn run_daemon(archivist: &Archivist, schedule: &ScheduleConfig) -> Result<()> {
    let logs_dir = &archivist.settings().logs_dir;
    let lock = acquire_daemon_lock(logs_dir)
        .with_context(|| format!("failed to start watcher for {}", logs_dir.display()))?;
    info!(
        lock = %lock.path().display(),
        initial_delay_secs = schedule.initial_delay_secs,
        interval_secs = schedule.interval_secs,
        "archivist watcher started"
    );

    let mut cycle = 0u64;
    loop {
        thread::sleep(delay_before(schedule, cycle));
        run_logged_cycle(archivist);
        cycle = cycle.saturating_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archivist::classify::Zone;
    use crate::archivist::config::ArchiveSettings;
    use tempfile::tempdir;

    #[test]
    fn first_cycle_waits_initial_delay_then_interval() {
        let schedule = ScheduleConfig {
            initial_delay_secs: 5,
            interval_secs: 3600,
        };
        assert_eq!(delay_before(&schedule, 0), Duration::from_secs(5));
        assert_eq!(delay_before(&schedule, 1), Duration::from_secs(3600));
        assert_eq!(delay_before(&schedule, 42), Duration::from_secs(3600));
    }

    #[test]
    fn missing_logs_dir_is_logged_not_fatal() {
        let tmp = tempdir().expect("tempdir");
        let archivist = Archivist::new(ArchiveSettings {
            logs_dir: tmp.path().join("missing"),
            zone: Zone::Local,
            dedupe_identical: false,
        });
        assert!(run_logged_cycle(&archivist).is_none());
    }
}
