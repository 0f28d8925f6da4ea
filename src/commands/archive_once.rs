use anyhow::Result;
use std::path::Path;

use crate::archivist::cycle::CycleOutcome;
use crate::commands::{CommandReport, build_archivist};

#[derive(Debug, Clone, Default)]
pub struct OnceOptions {
    pub dry_run: bool,
}

fn report_cycle(report: &mut CommandReport, cycle: &CycleOutcome) {
    report.detail(format!("logs_dir={}", cycle.logs_dir.display()));
    report.detail(format!("dry_run={}", cycle.dry_run));
    report.detail(format!("scanned={}", cycle.scanned));
    report.detail(format!("archived={}", cycle.archived));
    report.detail(format!("deduplicated={}", cycle.deduplicated));
    report.detail(format!("planned={}", cycle.planned));
    report.detail(format!("skipped={}", cycle.skipped));
    report.detail(format!("failed={}", cycle.failed));

    for file in &cycle.files {
        let destination = file
            .destination
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "-".to_string());
        let line = format!(
            "file={} status={} destination={}",
            file.source.display(),
            file.status.as_str(),
            destination
        );
        if file.status.is_failure() {
            let reason = file.message.as_deref().unwrap_or("unknown error");
            report.issue(format!("{line} error={reason}"));
        } else {
            report.detail(line);
        }
    }
}

pub fn run(logs_dir: Option<&Path>, opts: &OnceOptions) -> Result<CommandReport> {
    let mut report = CommandReport::new("once");
    let (_, archivist) = build_archivist(logs_dir)?;

    let cycle = if opts.dry_run {
        archivist.plan_cycle()
    } else {
        archivist.run_cycle()
    };

    match cycle {
        Ok(cycle) => report_cycle(&mut report, &cycle),
        Err(err) => report.issue(format!("{} cycle aborted: {err}", err.stage().as_str())),
    }

    Ok(report)
}
