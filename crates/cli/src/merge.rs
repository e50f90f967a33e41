//! `leadbase check` and `leadbase merge`.

use std::path::{Path, PathBuf};

use leadbase_config::Settings;
use leadbase_io::{naming, read_records, read_table, write_records, ExportMode, MergeEngine, MergeOutcome};
use leadbase_recon::{BusinessRecord, DuplicateReport};
use serde::Serialize;

use crate::exit_codes::{EXIT_MERGE_MASTER_NOT_FOUND, EXIT_MERGE_READ};
use crate::{print_json, CliError};

fn resolve_master(settings: &Settings, master: Option<PathBuf>) -> PathBuf {
    master.unwrap_or_else(|| settings.paths.master_path())
}

fn load_records(path: &Path, settings: &Settings) -> Result<Vec<BusinessRecord>, CliError> {
    if !path.is_file() {
        return Err(CliError::args(format!("records file not found: {}", path.display())));
    }
    read_records(path, &settings.merge).map_err(|e| {
        CliError::with_code(EXIT_MERGE_READ, format!("cannot read {}: {e}", path.display()))
    })
}

// ============================================================================
// check
// ============================================================================

#[derive(Debug, Serialize)]
struct CheckReport<'a> {
    master: &'a Path,
    records: &'a Path,
    new: usize,
    duplicate: usize,
    new_records_path: Option<PathBuf>,
    duplicates: &'a DuplicateReport,
}

pub fn cmd_check(
    settings: &Settings,
    records_path: PathBuf,
    master: Option<PathBuf>,
    full: bool,
    json: bool,
) -> Result<(), CliError> {
    let master = resolve_master(settings, master);
    if !master.is_file() {
        return Err(CliError::with_code(
            EXIT_MERGE_MASTER_NOT_FOUND,
            format!("master file not found: {}", master.display()),
        )
        .with_hint("pass --master or set paths.input_dir / paths.master_name"));
    }
    let records = load_records(&records_path, settings)?;
    let master_data = read_table(&master).map_err(|e| {
        CliError::with_code(EXIT_MERGE_READ, format!("cannot read {}: {e}", master.display()))
    })?;

    let classification = leadbase_recon::classify(records, &master_data, &settings.merge);

    let new_records_path = if classification.new_records.is_empty() {
        None
    } else {
        let (stem, _) = naming::split_name(&records_path);
        let path = settings.paths.output_dir.join(format!("{stem}_new.xlsx"));
        let mode = if full { ExportMode::Full } else { ExportMode::Template };
        write_records(&classification.new_records, &path, &settings.merge, mode)
            .map_err(|e| CliError::error(format!("cannot write {}: {e}", path.display())))?;
        Some(path)
    };

    let report = CheckReport {
        master: &master,
        records: &records_path,
        new: classification.new_records.len(),
        duplicate: classification.duplicates.len(),
        new_records_path,
        duplicates: &classification.report,
    };

    if json {
        return print_json(&report);
    }

    eprintln!(
        "{} new, {} already in {}",
        report.new,
        report.duplicate,
        master.display()
    );
    for (name, info) in report.duplicates {
        eprintln!("  dup  {}  ({}, master row {})", name, info.describe(), info.master_row + 2);
    }
    match &report.new_records_path {
        Some(path) => eprintln!("new records written to {}", path.display()),
        None => eprintln!("nothing new to merge"),
    }
    Ok(())
}

// ============================================================================
// merge
// ============================================================================

pub fn cmd_merge(
    settings: &Settings,
    records_path: PathBuf,
    master: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    json: bool,
) -> Result<(), CliError> {
    let master = resolve_master(settings, master);
    let records = load_records(&records_path, settings)?;

    let classifier = settings.classifier();
    let output_dir = output_dir.unwrap_or_else(|| settings.paths.merged_dir.clone());
    let engine = MergeEngine::new(&settings.merge, &classifier, output_dir);

    match engine.merge(&master, &records).map_err(CliError::merge)? {
        MergeOutcome::NothingToMerge => {
            if json {
                return print_json(&serde_json::json!({ "status": "nothing_to_merge" }));
            }
            eprintln!("no records in {}; master left untouched", records_path.display());
            Ok(())
        }
        MergeOutcome::Merged(result) => {
            if json {
                return print_json(&serde_json::json!({
                    "status": "merged",
                    "merged_path": result.merged_path,
                    "preserved_original_path": result.preserved_original_path,
                    "stats": result.stats,
                }));
            }
            let stats = &result.stats;
            eprintln!(
                "merged {} records by '{}': {} appended, {} updated, {} skipped (no key)",
                stats.incoming, stats.key_column, stats.appended, stats.updated, stats.skipped
            );
            eprintln!("{} rows -> {} rows", stats.master_rows, stats.total_rows());
            eprintln!("merged:   {}", result.merged_path.display());
            eprintln!("original: {}", result.preserved_original_path.display());
            Ok(())
        }
    }
}
