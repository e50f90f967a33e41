//! `leadbase backup`, `promote` and `cleanup`: file housekeeping around the master.

use std::io;
use std::path::PathBuf;
use std::time::SystemTime;

use leadbase_config::Settings;
use leadbase_io::housekeeping::{self, CleanupDirs, CleanupPolicy};
use leadbase_io::BackupManager;

use crate::exit_codes::EXIT_MERGE_MASTER_NOT_FOUND;
use crate::{print_json, CliError};

// ============================================================================
// backup
// ============================================================================

pub fn cmd_backup(
    settings: &Settings,
    master: Option<PathBuf>,
    list: bool,
    keep: Option<usize>,
    json: bool,
) -> Result<(), CliError> {
    let manager = BackupManager::new(&settings.paths.backup_dir);
    let io_err = |e: io::Error| CliError::error(format!("{}: {e}", manager.dir().display()));

    if list {
        let backups = manager.list().map_err(io_err)?;
        if json {
            return print_json(&backups);
        }
        if backups.is_empty() {
            eprintln!("no backups in {}", manager.dir().display());
        }
        for path in &backups {
            println!("{}", path.display());
        }
        return Ok(());
    }

    let master = master.unwrap_or_else(|| settings.paths.master_path());
    let Some(backup) = manager.snapshot(&master).map_err(io_err)? else {
        return Err(CliError::with_code(
            EXIT_MERGE_MASTER_NOT_FOUND,
            format!("nothing to back up: {} does not exist", master.display()),
        ));
    };
    let pruned = match keep {
        Some(n) => manager.prune(n).map_err(io_err)?,
        None => Vec::new(),
    };

    if json {
        return print_json(&serde_json::json!({ "backup": backup, "pruned": pruned }));
    }
    eprintln!("backed up {} -> {}", master.display(), backup.display());
    if !pruned.is_empty() {
        eprintln!("removed {} old backups", pruned.len());
    }
    Ok(())
}

// ============================================================================
// promote
// ============================================================================

pub fn cmd_promote(settings: &Settings, merged: PathBuf, json: bool) -> Result<(), CliError> {
    let paths = &settings.paths;
    let report = housekeeping::promote(&merged, &paths.input_dir, &paths.backup_dir, &paths.master_name)
        .map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => CliError::args(e.to_string()),
            _ => CliError::error(format!("promote failed: {e}")),
        })?;

    if json {
        return print_json(&report);
    }
    if let Some(archive) = &report.archive_dir {
        eprintln!("archived {} files to {}", report.archived.len(), archive.display());
    }
    eprintln!("{} is now the master", report.master_path.display());
    Ok(())
}

// ============================================================================
// cleanup
// ============================================================================

pub fn cmd_cleanup(settings: &Settings, json: bool) -> Result<(), CliError> {
    let policy = CleanupPolicy {
        max_age_days: settings.cleanup.max_age_days,
        keep_merged: settings.cleanup.keep_merged,
        keep_backups: settings.cleanup.keep_backups,
    };
    let dirs = CleanupDirs {
        output: &settings.paths.output_dir,
        merged: &settings.paths.merged_dir,
        backup: &settings.paths.backup_dir,
    };
    let report = housekeeping::cleanup(&dirs, policy, SystemTime::now())
        .map_err(|e| CliError::error(format!("cleanup failed: {e}")))?;

    if json {
        return print_json(&report);
    }
    eprintln!(
        "removed {} files ({} expired reviews, {} merged, {} backups)",
        report.total(),
        report.expired_outputs.len(),
        report.old_merged.len(),
        report.old_backups.len()
    );
    Ok(())
}
