use anyhow::{Context, Result};
use regex::Regex;
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use crate::error::ArchiveError;

pub const LOG_SUFFIX: &str = ".log.gz";

static BASE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.*?)(?:-([0-9]+))?\.log\.gz$").expect("base name pattern is a valid regex")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    Fresh(PathBuf),
    Duplicate(PathBuf),
}

impl Placement {
    pub fn path(&self) -> &Path {
        match self {
            Self::Fresh(path) | Self::Duplicate(path) => path,
        }
    }
}

/// `2023-07-15-3.log.gz` -> `2023-07-15`, `server.log.gz` -> `server`.
pub fn base_name(file_name: &str) -> Option<&str> {
    let caps = BASE_NAME.captures(file_name)?;
    let base = caps.get(1)?.as_str();
    if base.is_empty() { None } else { Some(base) }
}

pub fn archive_file_name(base: &str, index: u32) -> String {
    format!("{base}-{index:02}{LOG_SUFFIX}")
}

fn file_hash(path: &Path) -> Result<String> {
    let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(format!("{:x}", hasher.finalize()))
}

fn same_content(a: &Path, b: &Path) -> bool {
    let (Ok(meta_a), Ok(meta_b)) = (fs::metadata(a), fs::metadata(b)) else {
        return false;
    };
    if !meta_b.is_file() || meta_a.len() != meta_b.len() {
        return false;
    }
    match (file_hash(a), file_hash(b)) {
        (Ok(hash_a), Ok(hash_b)) => hash_a == hash_b,
        _ => false,
    }
}

/// First `<base>-NN.log.gz` in `bucket` that is neither on disk nor claimed
/// earlier in this cycle.
pub fn resolve_destination(
    bucket: &Path,
    source: &Path,
    claimed: &BTreeSet<PathBuf>,
    dedupe_identical: bool,
) -> Result<Placement, ArchiveError> {
    let naming_failed = || ArchiveError::Naming {
        path: source.to_path_buf(),
    };
    let file_name = source
        .file_name()
        .and_then(|s| s.to_str())
        .ok_or_else(naming_failed)?;
    let base = base_name(file_name).ok_or_else(naming_failed)?;

    for index in 0..=u32::MAX {
        let candidate = bucket.join(archive_file_name(base, index));
        if claimed.contains(&candidate) {
            continue;
        }
        if !candidate.exists() {
            return Ok(Placement::Fresh(candidate));
        }
        if dedupe_identical && same_content(source, &candidate) {
            return Ok(Placement::Duplicate(candidate));
        }
    }

    Err(naming_failed())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn base_name_strips_disambiguator_and_suffix() {
        assert_eq!(base_name("2023-07-15-server.log.gz"), Some("2023-07-15-server"));
        assert_eq!(base_name("2023-07-15-3.log.gz"), Some("2023-07-15"));
        assert_eq!(base_name("debug.log.gz"), Some("debug"));
        assert_eq!(base_name("debug-12.log.gz"), Some("debug"));
    }

    #[test]
    fn base_name_rejects_empty_stems() {
        assert_eq!(base_name("-7.log.gz"), None);
        assert_eq!(base_name(".log.gz"), None);
        assert_eq!(base_name("server.log"), None);
    }

    #[test]
    fn disambiguator_is_two_digits_minimum() {
        assert_eq!(archive_file_name("server", 0), "server-00.log.gz");
        assert_eq!(archive_file_name("server", 7), "server-07.log.gz");
        assert_eq!(archive_file_name("server", 123), "server-123.log.gz");
    }

    #[test]
    fn missing_bucket_yields_first_slot() {
        let tmp = tempdir().expect("tempdir");
        let bucket = tmp.path().join("2023/07-JULY");
        let placement = resolve_destination(
            &bucket,
            Path::new("/logs/2023-07-15-1.log.gz"),
            &BTreeSet::new(),
            false,
        )
        .expect("resolve");
        assert_eq!(placement, Placement::Fresh(bucket.join("2023-07-15-00.log.gz")));
    }

    #[test]
    fn numbering_skips_occupied_slots() {
        let tmp = tempdir().expect("tempdir");
        let bucket = tmp.path().join("bucket");
        fs::create_dir_all(&bucket).expect("mkdir");
        for i in 0..5 {
            fs::write(bucket.join(archive_file_name("base", i)), format!("{i}")).expect("write");
        }

        let placement = resolve_destination(
            &bucket,
            Path::new("/logs/base-1.log.gz"),
            &BTreeSet::new(),
            false,
        )
        .expect("resolve");
        assert_eq!(placement, Placement::Fresh(bucket.join("base-05.log.gz")));
    }

    #[test]
    fn claimed_names_are_not_handed_out_twice() {
        let tmp = tempdir().expect("tempdir");
        let bucket = tmp.path().join("bucket");
        let mut claimed = BTreeSet::new();
        claimed.insert(bucket.join("base-00.log.gz"));

        let placement =
            resolve_destination(&bucket, Path::new("/logs/base.log.gz"), &claimed, false)
                .expect("resolve");
        assert_eq!(placement, Placement::Fresh(bucket.join("base-01.log.gz")));
    }

    #[test]
    fn identical_occupant_is_reported_when_dedupe_enabled() {
        let tmp = tempdir().expect("tempdir");
        let bucket = tmp.path().join("bucket");
        fs::create_dir_all(&bucket).expect("mkdir");
        fs::write(bucket.join("base-00.log.gz"), b"other").expect("write");
        fs::write(bucket.join("base-01.log.gz"), b"payload").expect("write");
        let source = tmp.path().join("base-4.log.gz");
        fs::write(&source, b"payload").expect("write");

        let placement =
            resolve_destination(&bucket, &source, &BTreeSet::new(), true).expect("resolve");
        assert_eq!(placement, Placement::Duplicate(bucket.join("base-01.log.gz")));

        let placement =
            resolve_destination(&bucket, &source, &BTreeSet::new(), false).expect("resolve");
        assert_eq!(placement, Placement::Fresh(bucket.join("base-02.log.gz")));
    }

    #[test]
    fn unparseable_name_is_a_naming_failure() {
        let tmp = tempdir().expect("tempdir");
        let err = resolve_destination(
            tmp.path(),
            Path::new("/logs/-7.log.gz"),
            &BTreeSet::new(),
            false,
        )
        .expect_err("should fail");
        assert!(matches!(err, ArchiveError::Naming { .. }));
    }
}
