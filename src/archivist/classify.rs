use chrono::{DateTime, Datelike, Local, Month, Utc};
use chrono_tz::Tz;
use regex::Regex;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::SystemTime;

use crate::error::ArchiveError;

static DATE_IN_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([0-9]{4})-([0-9]{2})-[0-9]{2}").expect("date pattern is a valid regex")
});

#[derive(Debug, Clone, Copy)]
pub enum Zone {
    Local,
    Named(Tz),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct ArchiveKey {
    pub year: i32,
    pub month: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DateSource {
    FileName,
    Modified,
}

impl DateSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FileName => "file_name",
            Self::Modified => "modified",
        }
    }
}

impl ArchiveKey {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        if (1..=12).contains(&month) {
            Some(Self { year, month })
        } else {
            None
        }
    }

    pub fn month_label(&self) -> String {
        let name = u8::try_from(self.month)
            .ok()
            .and_then(|m| Month::try_from(m).ok())
            .map(|m| m.name().to_ascii_uppercase())
            .unwrap_or_default();
        format!("{:02}-{}", self.month, name)
    }

    pub fn bucket_dir(&self, logs_root: &Path) -> PathBuf {
        logs_root
            .join(self.year.to_string())
            .join(self.month_label())
    }
}

pub fn key_from_file_name(file_name: &str) -> Option<ArchiveKey> {
    let caps = DATE_IN_NAME.captures(file_name)?;
    let year = caps.get(1)?.as_str().parse::<i32>().ok()?;
    let month = caps.get(2)?.as_str().parse::<u32>().ok()?;
    ArchiveKey::new(year, month)
}

pub fn key_from_time(time: SystemTime, zone: Zone) -> ArchiveKey {
    let utc = DateTime::<Utc>::from(time);
    let (year, month) = match zone {
        Zone::Local => {
            let local = utc.with_timezone(&Local);
            (local.year(), local.month())
        }
        Zone::Named(tz) => {
            let zoned = utc.with_timezone(&tz);
            (zoned.year(), zoned.month())
        }
    };
    ArchiveKey { year, month }
}

/// Date in the file name wins; otherwise the file's modification time decides.
pub fn classify(path: &Path, zone: Zone) -> Result<(ArchiveKey, DateSource), ArchiveError> {
    let file_name = path
        .file_name()
        .map(|s| s.to_string_lossy())
        .unwrap_or_default();
    if let Some(key) = key_from_file_name(&file_name) {
        return Ok((key, DateSource::FileName));
    }

    let modified = fs::metadata(path)
        .and_then(|meta| meta.modified())
        .map_err(|source| ArchiveError::Classification {
            path: path.to_path_buf(),
            source,
        })?;
    Ok((key_from_time(modified, zone), DateSource::Modified))
}
