//! `leadbase search` — collect businesses and write a review file.

use std::path::PathBuf;
use std::time::Duration;

use leadbase_collect::places::DEFAULT_BASE_URL;
use leadbase_collect::{
    enrich_all, IterativeCollector, LookupError, PlacesClient, PlacesOptions, SiteEmailScanner,
};
use leadbase_config::Settings;
use leadbase_io::{naming, write_records, BackupManager, ExportMode};
use serde::Serialize;

use crate::exit_codes::{EXIT_COLLECT_CLIENT, EXIT_COLLECT_FAILED};
use crate::{print_json, CliError};

pub struct SearchArgs {
    pub location: String,
    pub category: String,
    pub target: usize,
    pub full: bool,
    pub no_emails: bool,
    pub output: Option<PathBuf>,
    pub master: Option<PathBuf>,
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct SearchSummary {
    location: String,
    category: String,
    target: usize,
    attempts: usize,
    failed_attempts: usize,
    records: usize,
    with_phone: usize,
    with_email: usize,
    email_scan_failures: usize,
    output: PathBuf,
    master_backup: Option<PathBuf>,
}

/// `cafe` + `Santa Marta` -> `cafe_santa_marta_<timestamp>.xlsx`
fn review_file_name(category: &str, location: &str) -> String {
    let slug = |s: &str| {
        let lowered: String = s
            .trim()
            .to_lowercase()
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { '_' })
            .collect();
        lowered.split('_').filter(|p| !p.is_empty()).collect::<Vec<_>>().join("_")
    };
    format!("{}_{}_{}.xlsx", slug(category), slug(location), naming::timestamp())
}

pub fn cmd_search(settings: &Settings, args: SearchArgs) -> Result<(), CliError> {
    if args.target == 0 {
        return Err(CliError::args("--target must be at least 1"));
    }
    let api_key = Settings::api_key().ok_or_else(|| CliError::lookup(LookupError::MissingApiKey))?;

    let timeout = Duration::from_secs(settings.collect.timeout_secs);
    let options = PlacesOptions {
        base_url: settings
            .collect
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        language: settings.locale.language.clone(),
        region: settings.locale.region.clone(),
        timeout,
        rate_limit_per_minute: settings.collect.rate_limit_per_minute,
        ..Default::default()
    };
    let client = PlacesClient::new(api_key, options).map_err(CliError::lookup)?;
    let classifier = settings.classifier();
    let collector = IterativeCollector::new(
        &client,
        &classifier,
        settings.collect.collector_config(),
    );

    let (mut records, stats) = collector.collect_with_stats(&args.location, &args.category, args.target);
    if stats.attempts > 0 && stats.failed_attempts == stats.attempts {
        return Err(CliError::with_code(
            EXIT_COLLECT_FAILED,
            format!("all {} search attempts failed", stats.attempts),
        )
        .with_hint(format!("rerun with {}=debug for the lookup errors", crate::LOG_ENV)));
    }

    let mut email_scan_failures = 0;
    if settings.collect.scan_emails && !args.no_emails && !records.is_empty() {
        let scanner = SiteEmailScanner::new(settings.collect.max_pages, timeout)
            .map_err(|e| CliError::with_code(EXIT_COLLECT_CLIENT, e.to_string()))?;
        let outcomes = enrich_all(records, &scanner, settings.collect.workers);
        email_scan_failures = outcomes.iter().filter(|o| o.error.is_some()).count();
        records = outcomes.into_iter().map(|o| o.record).collect();
    }

    let mode = if args.full { ExportMode::Full } else { ExportMode::Template };
    let output = args.output.unwrap_or_else(|| {
        settings
            .paths
            .output_dir
            .join(review_file_name(&args.category, &args.location))
    });
    write_records(&records, &output, &settings.merge, mode)
        .map_err(|e| CliError::error(format!("cannot write {}: {e}", output.display())))?;

    let master = args.master.unwrap_or_else(|| settings.paths.master_path());
    let master_backup = BackupManager::new(&settings.paths.backup_dir)
        .snapshot(&master)
        .map_err(|e| CliError::error(format!("cannot back up {}: {e}", master.display())))?;
    if master_backup.is_none() {
        log::info!("no master at {}, nothing to back up", master.display());
    }

    let summary = SearchSummary {
        location: args.location,
        category: args.category,
        target: args.target,
        attempts: stats.attempts,
        failed_attempts: stats.failed_attempts,
        records: records.len(),
        with_phone: records.iter().filter(|r| r.has_phone()).count(),
        with_email: records.iter().filter(|r| r.email.is_some()).count(),
        email_scan_failures,
        output,
        master_backup,
    };

    if args.json {
        return print_json(&summary);
    }

    eprintln!(
        "{} records for '{}' in {} ({} with phone, {} with email) after {} attempts",
        summary.records,
        summary.category,
        summary.location,
        summary.with_phone,
        summary.with_email,
        summary.attempts
    );
    if summary.records < summary.target {
        eprintln!("note: target was {}; the source ran out of new results", summary.target);
    }
    if summary.email_scan_failures > 0 {
        eprintln!("note: {} websites could not be scanned for email", summary.email_scan_failures);
    }
    eprintln!("wrote {}", summary.output.display());
    if let Some(backup) = &summary.master_backup {
        eprintln!("master backed up to {}", backup.display());
    }
    eprintln!("next: review the file, then `leadbase check` or `leadbase merge` it");
    Ok(())
}
