use serde::Serialize;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("unable to list logs directory {}: {source}", .dir.display())]
    Scan {
        dir: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("unable to determine date of file {}: {source}", .path.display())]
    Classification {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("unable to resolve archive name for file {}", .path.display())]
    Naming { path: PathBuf },
    #[error("unable to create directory {}: {source}", .dir.display())]
    DirectoryCreate {
        dir: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("unable to move file {} to {}: {source}", .from.display(), .to.display())]
    Move {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("another archivist cycle holds {}", .lock.display())]
    Locked { lock: PathBuf },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    Scan,
    Classification,
    Naming,
    DirectoryCreate,
    Move,
    Locked,
}

impl FailureStage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Scan => "scan",
            Self::Classification => "classification",
            Self::Naming => "naming",
            Self::DirectoryCreate => "directory_create",
            Self::Move => "move",
            Self::Locked => "locked",
        }
    }
}

impl ArchiveError {
    pub fn stage(&self) -> FailureStage {
        match self {
            Self::Scan { .. } => FailureStage::Scan,
            Self::Classification { .. } => FailureStage::Classification,
            Self::Naming { .. } => FailureStage::Naming,
            Self::DirectoryCreate { .. } => FailureStage::DirectoryCreate,
            Self::Move { .. } => FailureStage::Move,
            Self::Locked { .. } => FailureStage::Locked,
        }
    }
}
