//! Post-merge housekeeping: promote a merged artifact to be the next master,
//! and clear out old generated files.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use serde::Serialize;

use crate::backup::BackupManager;
use crate::{is_table_file, naming};

#[derive(Debug, Clone, Serialize)]
pub struct PromoteReport {
    pub master_path: PathBuf,
    /// Folder the previous input files were moved to; `None` if there were none.
    pub archive_dir: Option<PathBuf>,
    pub archived: Vec<PathBuf>,
}

/// Make `merged` the master in `input_dir`.
///
/// Every dataset file already in `input_dir` is moved to
/// `<backup_dir>/backup_<YYYYMMDD_HHMMSS>/`, then `merged` is copied to
/// `<input_dir>/<master_name>`. The merged artifact itself stays where it is.
pub fn promote(
    merged: &Path,
    input_dir: &Path,
    backup_dir: &Path,
    master_name: &str,
) -> io::Result<PromoteReport> {
    if !merged.is_file() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("merged file not found: {}", merged.display()),
        ));
    }
    fs::create_dir_all(input_dir)?;

    let mut previous = Vec::new();
    for entry in fs::read_dir(input_dir)? {
        let path = entry?.path();
        if is_table_file(&path) {
            previous.push(path);
        }
    }
    previous.sort();

    let mut archived = Vec::new();
    let archive_dir = if previous.is_empty() {
        None
    } else {
        let archive = naming::unique_path(backup_dir, &format!("backup_{}", naming::timestamp()));
        fs::create_dir_all(&archive)?;
        for path in previous {
            let target = archive.join(path.file_name().unwrap_or_default());
            move_file(&path, &target)?;
            archived.push(target);
        }
        Some(archive)
    };

    let master_path = input_dir.join(master_name);
    fs::copy(merged, &master_path)?;
    log::info!(
        "promoted {} to {} ({} previous files archived)",
        merged.display(),
        master_path.display(),
        archived.len()
    );
    Ok(PromoteReport { master_path, archive_dir, archived })
}

/// Rename, falling back to copy + delete across filesystems.
fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    if fs::rename(from, to).is_ok() {
        return Ok(());
    }
    fs::copy(from, to)?;
    fs::remove_file(from)
}

// ---------------------------------------------------------------------------
// Cleanup
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CleanupPolicy {
    /// Review/output files older than this are deleted.
    pub max_age_days: u64,
    /// Newest merged files kept.
    pub keep_merged: usize,
    /// Newest backups kept.
    pub keep_backups: usize,
}

impl Default for CleanupPolicy {
    fn default() -> Self {
        Self { max_age_days: 30, keep_merged: 5, keep_backups: 20 }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CleanupReport {
    pub expired_outputs: Vec<PathBuf>,
    pub old_merged: Vec<PathBuf>,
    pub old_backups: Vec<PathBuf>,
}

impl CleanupReport {
    pub fn total(&self) -> usize {
        self.expired_outputs.len() + self.old_merged.len() + self.old_backups.len()
    }
}

pub struct CleanupDirs<'a> {
    pub output: &'a Path,
    pub merged: &'a Path,
    pub backup: &'a Path,
}

/// Delete expired outputs, surplus merged files and surplus backups.
/// Missing directories are skipped.
pub fn cleanup(dirs: &CleanupDirs<'_>, policy: CleanupPolicy, now: SystemTime) -> io::Result<CleanupReport> {
    let mut report = CleanupReport::default();
    let max_age = Duration::from_secs(policy.max_age_days * 24 * 60 * 60);

    for (modified, path) in table_files_by_age(dirs.output)? {
        let age = now.duration_since(modified).unwrap_or_default();
        if age > max_age {
            fs::remove_file(&path)?;
            report.expired_outputs.push(path);
        }
    }

    let merged = table_files_by_age(dirs.merged)?;
    let excess = merged.len().saturating_sub(policy.keep_merged);
    for (_, path) in merged.into_iter().take(excess) {
        fs::remove_file(&path)?;
        report.old_merged.push(path);
    }

    report.old_backups = BackupManager::new(dirs.backup).prune(policy.keep_backups)?;

    log::info!(
        "cleanup removed {} outputs, {} merged, {} backups",
        report.expired_outputs.len(),
        report.old_merged.len(),
        report.old_backups.len()
    );
    Ok(report)
}

/// Dataset files directly in `dir`, oldest first.
fn table_files_by_age(dir: &Path) -> io::Result<Vec<(SystemTime, PathBuf)>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if is_table_file(&path) {
            files.push((entry.metadata()?.modified()?, path));
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn touch(path: &Path, modified: SystemTime) {
        fs::write(path, b"x").unwrap();
        fs::File::options().write(true).open(path).unwrap().set_modified(modified).unwrap();
    }

    #[test]
    fn promote_archives_previous_inputs() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("input");
        let backup = dir.path().join("backup");
        fs::create_dir_all(&input).unwrap();
        fs::write(input.join("master.xlsx"), b"old master").unwrap();
        fs::write(input.join("master - original.xlsx"), b"older").unwrap();
        fs::write(input.join("README.txt_"), b"not a table").unwrap();
        let merged = dir.path().join("merged.xlsx");
        fs::write(&merged, b"new master").unwrap();

        let report = promote(&merged, &input, &backup, "master.xlsx").unwrap();

        assert_eq!(fs::read(input.join("master.xlsx")).unwrap(), b"new master");
        assert!(!input.join("master - original.xlsx").exists());
        assert!(input.join("README.txt_").exists());
        assert_eq!(report.archived.len(), 2);
        let archive = report.archive_dir.unwrap();
        assert!(archive.starts_with(&backup));
        assert_eq!(fs::read(archive.join("master.xlsx")).unwrap(), b"old master");
        assert!(merged.exists());
    }

    #[test]
    fn promote_into_empty_input() {
        let dir = tempdir().unwrap();
        let merged = dir.path().join("m.csv");
        fs::write(&merged, b"a,b\n").unwrap();

        let report = promote(&merged, &dir.path().join("input"), &dir.path().join("backup"), "master.csv").unwrap();

        assert!(report.archive_dir.is_none());
        assert!(dir.path().join("input/master.csv").exists());
    }

    #[test]
    fn promote_requires_merged_file() {
        let dir = tempdir().unwrap();
        let err = promote(&dir.path().join("none.xlsx"), dir.path(), dir.path(), "m.xlsx").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn cleanup_applies_age_and_counts() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("output");
        let merged = dir.path().join("merged");
        let backup = dir.path().join("backup");
        for d in [&output, &merged, &backup] {
            fs::create_dir_all(d).unwrap();
        }
        let now = SystemTime::now();
        let day = Duration::from_secs(86_400);

        touch(&output.join("old.xlsx"), now - day * 40);
        touch(&output.join("fresh.xlsx"), now - day);
        for i in 0..7u32 {
            touch(&merged.join(format!("m{i}.xlsx")), now - day * (10 - i));
        }
        touch(&backup.join("m_backup_1.xlsx"), now - day * 3);
        touch(&backup.join("m_backup_2.xlsx"), now - day * 2);

        let policy = CleanupPolicy { max_age_days: 30, keep_merged: 5, keep_backups: 1 };
        let dirs = CleanupDirs { output: &output, merged: &merged, backup: &backup };
        let report = cleanup(&dirs, policy, now).unwrap();

        assert_eq!(report.expired_outputs, vec![output.join("old.xlsx")]);
        assert!(output.join("fresh.xlsx").exists());
        assert_eq!(report.old_merged, vec![merged.join("m0.xlsx"), merged.join("m1.xlsx")]);
        assert_eq!(report.old_backups, vec![backup.join("m_backup_1.xlsx")]);
        assert_eq!(report.total(), 4);
    }

    #[test]
    fn cleanup_tolerates_missing_dirs() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("missing");
        let dirs = CleanupDirs { output: &missing, merged: &missing, backup: &missing };
        let report = cleanup(&dirs, CleanupPolicy::default(), SystemTime::now()).unwrap();
        assert_eq!(report.total(), 0);
    }
}
