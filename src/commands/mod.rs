pub mod archive_once;
pub mod archive_status;
pub mod archive_stop;
pub mod archive_watch;

use anyhow::Result;
use serde::Serialize;
use std::path::Path;

use crate::archivist::config::{ArchivistConfig, load_config};
use crate::archivist::cycle::Archivist;

#[derive(Debug, Clone, Serialize)]
pub struct CommandReport {
    pub command: String,
    pub ok: bool,
    pub details: Vec<String>,
    pub issues: Vec<String>,
}

impl CommandReport {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ok: true,
            details: Vec::new(),
            issues: Vec::new(),
        }
    }

    pub fn detail(&mut self, text: impl Into<String>) {
        self.details.push(text.into());
    }

    pub fn issue(&mut self, text: impl Into<String>) {
        self.ok = false;
        self.issues.push(text.into());
    }

    pub fn render(&self) -> String {
        let mut out = format!(
            "{}: {}\n",
            self.command,
            if self.ok { "ok" } else { "issues" }
        );
        for detail in &self.details {
            out.push_str(&format!("  {detail}\n"));
        }
        for issue in &self.issues {
            out.push_str(&format!("  issue: {issue}\n"));
        }
        out
    }
}

pub fn build_archivist(logs_dir: Option<&Path>) -> Result<(ArchivistConfig, Archivist)> {
    let cfg = load_config(logs_dir)?;
    let archivist = Archivist::new(cfg.settings()?);
    Ok((cfg, archivist))
}

#[cfg(test)]
mod tests {
    use super::CommandReport;

    #[test]
    fn issue_flips_ok_and_renders_last() {
        let mut report = CommandReport::new("once");
        report.detail("scanned=1");
        assert!(report.ok);
        report.issue("unable to move");
        assert!(!report.ok);
        assert_eq!(
            report.render(),
            "once: issues\n  scanned=1\n  issue: unable to move\n"
        );
    }
}
