//! Timestamped dataset snapshots.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::naming;

/// Copies dataset files into a backup directory before they are touched.
#[derive(Debug, Clone)]
pub struct BackupManager {
    dir: PathBuf,
}

impl BackupManager {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Copy `file` to `<dir>/<stem>_backup_<YYYYMMDD_HHMMSS>.<ext>`.
    ///
    /// Returns `Ok(None)` when `file` does not exist. The source is never
    /// moved or modified.
    pub fn snapshot(&self, file: &Path) -> io::Result<Option<PathBuf>> {
        self.snapshot_at(file, &naming::timestamp())
    }

    pub(crate) fn snapshot_at(&self, file: &Path, stamp: &str) -> io::Result<Option<PathBuf>> {
        if !file.is_file() {
            log::debug!("backup skipped, {} does not exist", file.display());
            return Ok(None);
        }
        fs::create_dir_all(&self.dir)?;
        let target = naming::unique_path(&self.dir, &naming::backup_file_name(file, stamp));
        fs::copy(file, &target)?;
        log::info!("backup {} -> {}", file.display(), target.display());
        Ok(Some(target))
    }

    /// Backup files in the directory, oldest first (by modification time, then name).
    pub fn list(&self) -> io::Result<Vec<PathBuf>> {
        if !self.dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut entries = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let path = entry.path();
            let is_backup = path
                .file_name()
                .map(|n| n.to_string_lossy().contains("_backup_"))
                .unwrap_or(false);
            if path.is_file() && is_backup {
                entries.push((entry.metadata()?.modified()?, path));
            }
        }
        entries.sort();
        Ok(entries.into_iter().map(|(_, p)| p).collect())
    }

    /// Delete all but the newest `keep` backups. Returns the deleted paths.
    pub fn prune(&self, keep: usize) -> io::Result<Vec<PathBuf>> {
        let all = self.list()?;
        let excess = all.len().saturating_sub(keep);
        let mut removed = Vec::new();
        for path in all.into_iter().take(excess) {
            fs::remove_file(&path)?;
            removed.push(path);
        }
        if !removed.is_empty() {
            log::info!("pruned {} old backups in {}", removed.len(), self.dir.display());
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, SystemTime};
    use tempfile::tempdir;

    #[test]
    fn snapshot_copies_with_timestamp_name() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("master.xlsx");
        fs::write(&src, b"payload").unwrap();
        let backups = BackupManager::new(dir.path().join("backup"));

        let path = backups.snapshot_at(&src, "20250102_030405").unwrap().unwrap();

        assert_eq!(path, dir.path().join("backup/master_backup_20250102_030405.xlsx"));
        assert_eq!(fs::read(&path).unwrap(), b"payload");
        assert_eq!(fs::read(&src).unwrap(), b"payload");
    }

    #[test]
    fn snapshot_missing_source_is_noop() {
        let dir = tempdir().unwrap();
        let backups = BackupManager::new(dir.path().join("backup"));

        assert_eq!(backups.snapshot(&dir.path().join("missing.xlsx")).unwrap(), None);
        assert!(!dir.path().join("backup").exists());
    }

    #[test]
    fn same_second_snapshots_do_not_collide() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("master.csv");
        fs::write(&src, b"a").unwrap();
        let backups = BackupManager::new(dir.path().join("backup"));

        let first = backups.snapshot_at(&src, "20250102_030405").unwrap().unwrap();
        fs::write(&src, b"b").unwrap();
        let second = backups.snapshot_at(&src, "20250102_030405").unwrap().unwrap();

        assert_ne!(first, second);
        assert_eq!(fs::read(&first).unwrap(), b"a");
        assert_eq!(fs::read(&second).unwrap(), b"b");
    }

    #[test]
    fn prune_keeps_newest() {
        let dir = tempdir().unwrap();
        let backups = BackupManager::new(dir.path());
        let base = SystemTime::now() - Duration::from_secs(3600);
        for i in 0..4u64 {
            let path = dir.path().join(format!("m_backup_2025010{i}_000000.xlsx"));
            fs::write(&path, b"x").unwrap();
            let file = fs::File::options().write(true).open(&path).unwrap();
            file.set_modified(base + Duration::from_secs(i * 60)).unwrap();
        }
        fs::write(dir.path().join("notes.txt"), b"keep me").unwrap();

        let removed = backups.prune(2).unwrap();

        assert_eq!(removed.len(), 2);
        assert!(!dir.path().join("m_backup_20250100_000000.xlsx").exists());
        assert!(dir.path().join("m_backup_20250103_000000.xlsx").exists());
        assert!(dir.path().join("notes.txt").exists());
    }
}
