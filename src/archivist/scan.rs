use std::fs;
use std::path::{Path, PathBuf};

use crate::archivist::naming::LOG_SUFFIX;
use crate::error::ArchiveError;

pub fn is_candidate_name(file_name: &str) -> bool {
    file_name.ends_with(LOG_SUFFIX)
}

pub fn scan(dir: &Path) -> Result<Vec<PathBuf>, ArchiveError> {
    let scan_failed = |source| ArchiveError::Scan {
        dir: dir.to_path_buf(),
        source,
    };
    let entries = fs::read_dir(dir).map_err(scan_failed)?;

    let mut out = Vec::new();
    for entry in entries {
        let entry = entry.map_err(scan_failed)?;
        let path = entry.path();
        let matches = path
            .file_name()
            .map(|name| is_candidate_name(&name.to_string_lossy()))
            .unwrap_or(false);
        if matches && path.is_file() {
            out.push(path);
        }
    }
    out.sort();
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn scan_keeps_only_top_level_log_archives() {
        let tmp = tempdir().expect("tempdir");
        let root = tmp.path();
        fs::write(root.join("b.log.gz"), b"b").expect("write");
        fs::write(root.join("a.log.gz"), b"a").expect("write");
        fs::write(root.join("latest.log"), b"live").expect("write");
        fs::write(root.join("notes.gz"), b"x").expect("write");
        fs::create_dir_all(root.join("2023/07-JULY")).expect("mkdir");
        fs::write(root.join("2023/07-JULY/old-00.log.gz"), b"old").expect("write");
        fs::create_dir_all(root.join("dir.log.gz")).expect("mkdir");

        let found = scan(root).expect("scan");
        assert_eq!(found, vec![root.join("a.log.gz"), root.join("b.log.gz")]);
    }

    #[test]
    fn unlistable_directory_is_a_scan_failure() {
        let tmp = tempdir().expect("tempdir");
        let err = scan(&tmp.path().join("missing")).expect_err("should fail");
        assert!(matches!(err, ArchiveError::Scan { .. }));
    }
}
