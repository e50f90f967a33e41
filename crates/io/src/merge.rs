//! Non-destructive merge of new records into a master dataset file.
//!
//! The master is never written to. The merged dataset goes to a separate
//! output directory under the master's file name, and only after that write
//! has fully succeeded is the master renamed to `<stem> - original.<ext>`.
//! Any failure before that rename leaves the filesystem as it was.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use leadbase_recon::{BusinessRecord, ChannelClassifier, MergeConfig, MergeStats};
use serde::Serialize;

use crate::{naming, TableFormat};

// ---------------------------------------------------------------------------
// Results and errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct MergeResult {
    pub merged_path: PathBuf,
    pub preserved_original_path: PathBuf,
    pub stats: MergeStats,
}

#[derive(Debug, Clone)]
pub enum MergeOutcome {
    Merged(MergeResult),
    /// The batch was empty; nothing was read or written.
    NothingToMerge,
}

#[derive(Debug)]
pub enum MergeError {
    /// Master path does not name an existing file.
    MasterNotFound(PathBuf),
    /// Master format is not a readable dataset.
    UnsupportedFormat(PathBuf),
    /// Output directory resolves to the master's own directory.
    OutputIsInput(PathBuf),
    /// Another merge holds the master's lock file.
    Locked(PathBuf),
    /// Master could not be read.
    Read { path: PathBuf, message: String },
    /// Merged artifact could not be written.
    Write { path: PathBuf, message: String },
    /// Merged artifact was written but the master could not be renamed.
    Preserve { merged_path: PathBuf, message: String },
}

impl MergeError {
    /// True when the filesystem is exactly as it was before the merge.
    pub fn nothing_written(&self) -> bool {
        !matches!(self, Self::Preserve { .. })
    }
}

impl fmt::Display for MergeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MasterNotFound(p) => write!(f, "master file not found: {}", p.display()),
            Self::UnsupportedFormat(p) => write!(f, "unsupported master format: {}", p.display()),
            Self::OutputIsInput(p) => {
                write!(f, "output directory must differ from the master's directory: {}", p.display())
            }
            Self::Locked(p) => write!(f, "master is locked by another merge: {}", p.display()),
            Self::Read { path, message } => write!(f, "cannot read {}: {message}", path.display()),
            Self::Write { path, message } => write!(f, "cannot write {}: {message}", path.display()),
            Self::Preserve { merged_path, message } => write!(
                f,
                "merged file written to {} but the master could not be preserved: {message}",
                merged_path.display()
            ),
        }
    }
}

impl std::error::Error for MergeError {}

// ---------------------------------------------------------------------------
// Lock
// ---------------------------------------------------------------------------

/// Advisory lock: `<master>.lock`, created exclusively, removed on drop.
///
/// The lock file holds the owner's pid. A lock whose owner is no longer
/// running (a crashed merge) is removed and taken over. Liveness is only
/// checked where `/proc` exists; elsewhere a present lock is always honored.
#[derive(Debug)]
pub struct MasterLock {
    path: PathBuf,
}

impl MasterLock {
    pub fn lock_path(master: &Path) -> PathBuf {
        let mut name = master.file_name().unwrap_or_default().to_os_string();
        name.push(".lock");
        master.with_file_name(name)
    }

    pub fn acquire(master: &Path) -> Result<Self, MergeError> {
        let path = Self::lock_path(master);
        match Self::create(&path) {
            Err(MergeError::Locked(_)) if owner_is_gone(&path) => {
                log::warn!("removing stale lock {}: its owner is no longer running", path.display());
                fs::remove_file(&path)
                    .map_err(|e| MergeError::Read { path: path.clone(), message: e.to_string() })?;
                Self::create(&path)
            }
            result => result,
        }
    }

    /// Pid recorded in the lock file at `lock`, if it can be read.
    pub fn holder(lock: &Path) -> Option<u32> {
        fs::read_to_string(lock).ok()?.trim().parse().ok()
    }

    fn create(path: &Path) -> Result<Self, MergeError> {
        match fs::OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(mut file) => {
                use std::io::Write;
                writeln!(file, "{}", std::process::id())
                    .map_err(|e| MergeError::Write { path: path.to_path_buf(), message: e.to_string() })?;
                Ok(Self { path: path.to_path_buf() })
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Err(MergeError::Locked(path.to_path_buf())),
            Err(e) => Err(MergeError::Read { path: path.to_path_buf(), message: e.to_string() }),
        }
    }
}

fn owner_is_gone(lock: &Path) -> bool {
    MasterLock::holder(lock).and_then(process_alive) == Some(false)
}

#[cfg(target_os = "linux")]
fn process_alive(pid: u32) -> Option<bool> {
    let proc_root = Path::new("/proc");
    proc_root.is_dir().then(|| proc_root.join(pid.to_string()).exists())
}

#[cfg(not(target_os = "linux"))]
fn process_alive(_pid: u32) -> Option<bool> {
    None
}

impl Drop for MasterLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            log::warn!("could not remove lock {}: {e}", self.path.display());
        }
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// File-level merge. Holds the merge settings and the phone classifier;
/// each [`MergeEngine::merge`] call reads the master fresh.
pub struct MergeEngine<'a> {
    config: &'a MergeConfig,
    classifier: &'a dyn ChannelClassifier,
    output_dir: PathBuf,
}

impl<'a> MergeEngine<'a> {
    pub fn new(
        config: &'a MergeConfig,
        classifier: &'a dyn ChannelClassifier,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self { config, classifier, output_dir: output_dir.into() }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Where the merged artifact for `master` goes.
    pub fn merged_path_for(&self, master: &Path, format: TableFormat) -> PathBuf {
        let (stem, _) = naming::split_name(master);
        self.output_dir.join(format!("{stem}.{}", format.output_extension()))
    }

    /// Merge `records` into the dataset at `master`.
    pub fn merge(
        &self,
        master: &Path,
        records: &[BusinessRecord],
    ) -> Result<MergeOutcome, MergeError> {
        if !master.is_file() {
            return Err(MergeError::MasterNotFound(master.to_path_buf()));
        }
        if records.is_empty() {
            log::info!("no new records, {} left untouched", master.display());
            return Ok(MergeOutcome::NothingToMerge);
        }
        let format = TableFormat::from_path(master)
            .ok_or_else(|| MergeError::UnsupportedFormat(master.to_path_buf()))?;
        self.check_output_dir(master)?;

        let _lock = MasterLock::acquire(master)?;

        let mut dataset = crate::read_table(master).map_err(|message| MergeError::Read {
            path: master.to_path_buf(),
            message,
        })?;
        let stats = leadbase_recon::reconcile(&mut dataset, records, self.config, self.classifier);

        let merged_path = self.merged_path_for(master, format);
        write_atomically(&dataset, &merged_path)?;
        log::info!("merged dataset written to {}", merged_path.display());

        let preserved = naming::preserved_original_path(master, &naming::timestamp());
        fs::rename(master, &preserved).map_err(|e| MergeError::Preserve {
            merged_path: merged_path.clone(),
            message: e.to_string(),
        })?;
        log::info!("original preserved as {}", preserved.display());

        Ok(MergeOutcome::Merged(MergeResult {
            merged_path,
            preserved_original_path: preserved,
            stats,
        }))
    }

    fn check_output_dir(&self, master: &Path) -> Result<(), MergeError> {
        let master_dir = master
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let same = match (master_dir.canonicalize(), self.output_dir.canonicalize()) {
            (Ok(a), Ok(b)) => a == b,
            // output dir does not exist yet, so it cannot be the master's
            _ => false,
        };
        if same {
            return Err(MergeError::OutputIsInput(self.output_dir.clone()));
        }
        Ok(())
    }
}

/// Write to a hidden temp file in the target directory, then rename over the target.
fn write_atomically(dataset: &leadbase_recon::Dataset, target: &Path) -> Result<(), MergeError> {
    let write_err = |message: String| MergeError::Write { path: target.to_path_buf(), message };

    let dir = target.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir).map_err(|e| write_err(e.to_string()))?;

    let file_name = target.file_name().unwrap_or_default().to_string_lossy();
    // keep the real extension last so the writer picks the right format
    let tmp = dir.join(format!(".tmp-{}-{file_name}", std::process::id()));

    if let Err(message) = crate::write_table(dataset, &tmp) {
        let _ = fs::remove_file(&tmp);
        return Err(write_err(message));
    }
    if let Err(e) = fs::rename(&tmp, target) {
        let _ = fs::remove_file(&tmp);
        return Err(write_err(e.to_string()));
    }
    Ok(())
}
