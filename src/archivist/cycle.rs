use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

use crate::archivist::classify::{ArchiveKey, DateSource, classify};
use crate::archivist::config::ArchiveSettings;
use crate::archivist::lock::acquire_cycle_lock;
use crate::archivist::naming::{Placement, resolve_destination};
use crate::archivist::relocate::{discard_duplicate, relocate};
use crate::archivist::scan::scan;
use crate::error::{ArchiveError, FailureStage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Archived,
    Deduplicated,
    Planned,
    Skipped,
    ClassificationFailed,
    NamingFailed,
    DirectoryCreateFailed,
    MoveFailed,
}

impl FileStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Archived => "archived",
            Self::Deduplicated => "deduplicated",
            Self::Planned => "planned",
            Self::Skipped => "skipped",
            Self::ClassificationFailed => "classification_failed",
            Self::NamingFailed => "naming_failed",
            Self::DirectoryCreateFailed => "directory_create_failed",
            Self::MoveFailed => "move_failed",
        }
    }

    pub fn is_failure(self) -> bool {
        matches!(
            self,
            Self::ClassificationFailed
                | Self::NamingFailed
                | Self::DirectoryCreateFailed
                | Self::MoveFailed
        )
    }

    // Scan and Locked abort the whole cycle and never belong to one file.
    fn from_stage(stage: FailureStage) -> Option<Self> {
        match stage {
            FailureStage::Classification => Some(Self::ClassificationFailed),
            FailureStage::Naming => Some(Self::NamingFailed),
            FailureStage::DirectoryCreate => Some(Self::DirectoryCreateFailed),
            FailureStage::Move => Some(Self::MoveFailed),
            FailureStage::Scan | FailureStage::Locked => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FileOutcome {
    pub source: PathBuf,
    pub status: FileStatus,
    pub key: Option<ArchiveKey>,
    pub date_source: Option<DateSource>,
    pub destination: Option<PathBuf>,
    pub message: Option<String>,
}

impl FileOutcome {
    fn discovered(source: &Path) -> Self {
        Self {
            source: source.to_path_buf(),
            status: FileStatus::Skipped,
            key: None,
            date_source: None,
            destination: None,
            message: None,
        }
    }

    fn finish(mut self, status: FileStatus) -> Self {
        self.status = status;
        self
    }

    fn fail(mut self, err: &ArchiveError) -> Self {
        if let Some(status) = FileStatus::from_stage(err.stage()) {
            self.status = status;
        }
        self.message = Some(err.to_string());
        self
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CycleOutcome {
    pub logs_dir: PathBuf,
    pub dry_run: bool,
    pub scanned: usize,
    pub archived: usize,
    pub deduplicated: usize,
    pub planned: usize,
    pub skipped: usize,
    pub failed: usize,
    pub files: Vec<FileOutcome>,
}

impl CycleOutcome {
    fn tally(&mut self) {
        for file in &self.files {
            match file.status {
                FileStatus::Archived => self.archived += 1,
                FileStatus::Deduplicated => self.deduplicated += 1,
                FileStatus::Planned => self.planned += 1,
                FileStatus::Skipped => self.skipped += 1,
                _ => self.failed += 1,
            }
        }
    }
}

fn log_abort(err: &ArchiveError) {
    match err {
        ArchiveError::Locked { .. } => warn!("{err}; skipping this pass"),
        _ => error!("{err}"),
    }
}

#[derive(Debug, Clone)]
pub struct Archivist {
    settings: ArchiveSettings,
}

impl Archivist {
    pub fn new(settings: ArchiveSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &ArchiveSettings {
        &self.settings
    }

    /// One scan-classify-name-move pass. Per-file failures land in the outcome;
    /// only an unlistable directory or a concurrent cycle returns `Err`.
    pub fn run_cycle(&self) -> Result<CycleOutcome, ArchiveError> {
        let _lock = acquire_cycle_lock(&self.settings.logs_dir).inspect_err(log_abort)?;
        self.pass(false)
    }

    pub fn plan_cycle(&self) -> Result<CycleOutcome, ArchiveError> {
        self.pass(true)
    }

    fn pass(&self, dry_run: bool) -> Result<CycleOutcome, ArchiveError> {
        let logs_dir = &self.settings.logs_dir;
        info!("checking for logs to archive in {}", logs_dir.display());

        let candidates = scan(logs_dir).inspect_err(log_abort)?;
        let mut out = CycleOutcome {
            logs_dir: logs_dir.clone(),
            dry_run,
            scanned: candidates.len(),
            ..CycleOutcome::default()
        };

        let mut claimed = BTreeSet::new();
        for source in &candidates {
            out.files.push(self.process(source, &mut claimed, dry_run));
        }
        out.tally();

        info!(
            scanned = out.scanned,
            archived = out.archived,
            deduplicated = out.deduplicated,
            skipped = out.skipped,
            failed = out.failed,
            dry_run,
            "archive cycle finished"
        );
        Ok(out)
    }

    fn process(
        &self,
        source: &Path,
        claimed: &mut BTreeSet<PathBuf>,
        dry_run: bool,
    ) -> FileOutcome {
        let mut outcome = FileOutcome::discovered(source);
        if !source.is_file() {
            warn!(
                "skipping {}: no longer a regular file",
                source.display()
            );
            outcome.message = Some("no longer a regular file".to_string());
            return outcome.finish(FileStatus::Skipped);
        }

        let (key, date_source) = match classify(source, self.settings.zone) {
            Ok(classified) => classified,
            Err(err) => {
                warn!("{err}");
                return outcome.fail(&err);
            }
        };
        outcome.key = Some(key);
        outcome.date_source = Some(date_source);
        debug!(
            "classified {} as {}/{} from {}",
            source.display(),
            key.year,
            key.month_label(),
            date_source.as_str()
        );

        let bucket = key.bucket_dir(&self.settings.logs_dir);
        let placement =
            match resolve_destination(&bucket, source, claimed, self.settings.dedupe_identical) {
                Ok(placement) => placement,
                Err(err) => {
                    warn!("{err}");
                    return outcome.fail(&err);
                }
            };
        claimed.insert(placement.path().to_path_buf());
        outcome.destination = Some(placement.path().to_path_buf());

        if dry_run {
            info!(
                "would archive file {} to {}",
                source.display(),
                placement.path().display()
            );
            return outcome.finish(FileStatus::Planned);
        }

        match placement {
            Placement::Fresh(destination) => match relocate(source, &destination) {
                Ok(()) => {
                    info!(
                        "archived file {} to {}",
                        source.display(),
                        destination.display()
                    );
                    outcome.finish(FileStatus::Archived)
                }
                Err(err) => {
                    warn!("{err}");
                    outcome.fail(&err)
                }
            },
            Placement::Duplicate(existing) => match discard_duplicate(source, &existing) {
                Ok(()) => {
                    info!(
                        "removed {}: identical copy already archived at {}",
                        source.display(),
                        existing.display()
                    );
                    outcome.finish(FileStatus::Deduplicated)
                }
                Err(err) => {
                    warn!("{err}");
                    outcome.fail(&err)
                }
            },
        }
    }
}
