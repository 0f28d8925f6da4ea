use anyhow::Result;
use std::path::Path;

use crate::archivist::scheduler;
use crate::commands::{CommandReport, build_archivist};

pub fn run(logs_dir: Option<&Path>) -> Result<CommandReport> {
    let mut report = CommandReport::new("watch");
    let (cfg, archivist) = build_archivist(logs_dir)?;

    report.detail(format!(
        "watching {} (initial_delay_secs={} interval_secs={})",
        archivist.settings().logs_dir.display(),
        cfg.schedule.initial_delay_secs,
        cfg.schedule.interval_secs
    ));
    scheduler::run_daemon(&archivist, &cfg.schedule)?;
    Ok(report)
}
