// leadbase CLI - collect business leads and merge them into a master dataset

mod exit_codes;
mod files;
mod merge;
mod search;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use leadbase_collect::LookupError;
use leadbase_config::{ConfigError, Settings};
use leadbase_io::merge::MasterLock;
use leadbase_io::MergeError;
use serde::Serialize;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use exit_codes::{lookup_exit_code, merge_exit_code, EXIT_ERROR, EXIT_SUCCESS, EXIT_USAGE};

/// Log filter variable, e.g. `LEADBASE_LOG=debug` or `LEADBASE_LOG=leadbase_io=trace`.
const LOG_ENV: &str = "LEADBASE_LOG";

#[derive(Parser)]
#[command(name = "leadbase")]
#[command(about = "Collect business leads and merge them into a master dataset")]
#[command(version)]
struct Cli {
    /// Settings file (default: ./leadbase.toml, then the per-user settings file)
    #[arg(long, global = true, env = "LEADBASE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search a category in a location and write a review file
    #[command(after_help = "\
Reads the lookup API key from GOOGLE_API_KEY (environment or .env).
The master is snapshotted to the backup directory before anything is written.

Examples:
  leadbase search Medellin cafe
  leadbase search Bogota panaderia --target 100 --full
  leadbase search Cali bar --no-emails -o review/bares.xlsx
  leadbase search Cali bar --json | jq .records")]
    Search {
        /// Location to search in (city or area)
        location: String,

        /// Business category (e.g. cafe, panaderia)
        category: String,

        /// Number of records to collect
        #[arg(long, short = 'n', default_value_t = 50)]
        target: usize,

        /// Export all fields (address, maps URL, external id) instead of the template columns
        #[arg(long)]
        full: bool,

        /// Skip website email scanning
        #[arg(long)]
        no_emails: bool,

        /// Review file to write (default: <output_dir>/<category>_<location>_<timestamp>.xlsx)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Master to snapshot (default: <input_dir>/<master_name>)
        #[arg(long)]
        master: Option<PathBuf>,

        /// Print a JSON summary to stdout
        #[arg(long)]
        json: bool,
    },

    /// Report which records are already in the master
    #[command(after_help = "\
Writes <output_dir>/<stem>_new.xlsx containing only the new records.
Nothing is merged; the master is only read.

Examples:
  leadbase check review.xlsx
  leadbase check leads.csv --master data/input/clientes.xlsx
  leadbase check review.xlsx --json | jq '.duplicates | keys'")]
    Check {
        /// Records to check (xlsx, xls, ods or csv)
        records: PathBuf,

        /// Master dataset (default: <input_dir>/<master_name>)
        #[arg(long)]
        master: Option<PathBuf>,

        /// Export all fields for the new records
        #[arg(long)]
        full: bool,

        /// Print the duplicate report as JSON to stdout
        #[arg(long)]
        json: bool,
    },

    /// Merge records into the master without modifying it
    #[command(after_help = "\
The merged dataset is written to the merged directory under the master's
file name. Only after that write succeeds is the master renamed to
'<stem> - original.<ext>' (with a timestamp if that name is taken).

Exit codes:
  3  master not found        6  merged file could not be written
  4  master locked           7  merged written, master not preserved
  5  file could not be read  8  output directory is the master's directory

Examples:
  leadbase merge review.xlsx
  leadbase merge leads.csv --master data/input/clientes.xlsx --output-dir out/
  leadbase merge review.xlsx --json")]
    Merge {
        /// Records to merge (xlsx, xls, ods or csv)
        records: PathBuf,

        /// Master dataset (default: <input_dir>/<master_name>)
        #[arg(long)]
        master: Option<PathBuf>,

        /// Directory for the merged file (default: merged_dir from settings)
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Print the merge result as JSON to stdout
        #[arg(long)]
        json: bool,
    },

    /// Snapshot the master into the backup directory
    #[command(after_help = "\
Examples:
  leadbase backup
  leadbase backup --keep 10
  leadbase backup --list")]
    Backup {
        /// File to snapshot (default: <input_dir>/<master_name>)
        #[arg(long)]
        master: Option<PathBuf>,

        /// List existing backups instead of creating one
        #[arg(long)]
        list: bool,

        /// After the snapshot, delete all but the newest N backups
        #[arg(long, value_name = "N")]
        keep: Option<usize>,

        /// Print JSON to stdout
        #[arg(long)]
        json: bool,
    },

    /// Make a merged file the new master
    #[command(after_help = "\
Previous dataset files in the input directory are moved to
<backup_dir>/backup_<timestamp>/ first.

Examples:
  leadbase promote data/merged/master.xlsx")]
    Promote {
        /// Merged file to promote
        merged: PathBuf,

        /// Print JSON to stdout
        #[arg(long)]
        json: bool,
    },

    /// Delete old review files, merged files and backups
    #[command(after_help = "\
Retention comes from the [cleanup] settings section.

Examples:
  leadbase cleanup
  leadbase cleanup --json")]
    Cleanup {
        /// Print JSON to stdout
        #[arg(long)]
        json: bool,
    },
}

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    // stdout is reserved for --json output
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init();
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging();

    let result = load_settings(cli.config.as_deref()).and_then(|settings| match cli.command {
        Commands::Search { location, category, target, full, no_emails, output, master, json } => {
            search::cmd_search(
                &settings,
                search::SearchArgs { location, category, target, full, no_emails, output, master, json },
            )
        }
        Commands::Check { records, master, full, json } => {
            merge::cmd_check(&settings, records, master, full, json)
        }
        Commands::Merge { records, master, output_dir, json } => {
            merge::cmd_merge(&settings, records, master, output_dir, json)
        }
        Commands::Backup { master, list, keep, json } => {
            files::cmd_backup(&settings, master, list, keep, json)
        }
        Commands::Promote { merged, json } => files::cmd_promote(&settings, merged, json),
        Commands::Cleanup { json } => files::cmd_cleanup(&settings, json),
    });

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

fn load_settings(explicit: Option<&Path>) -> Result<Settings, CliError> {
    let (settings, source) = Settings::load(explicit).map_err(CliError::config)?;
    match source {
        Some(path) => log::debug!("settings from {}", path.display()),
        None => log::debug!("no settings file, using defaults"),
    }
    Ok(settings)
}

/// Print one JSON value to stdout.
pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    let out = serde_json::to_string_pretty(value)
        .map_err(|e| CliError::error(format!("JSON serialization error: {e}")))?;
    println!("{}", out);
    Ok(())
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn error(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }

    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn with_code(code: u8, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), hint: None }
    }

    pub fn config(err: ConfigError) -> Self {
        let hint = match &err {
            ConfigError::Io { .. } => Some("check the --config path".to_string()),
            ConfigError::Parse { .. } | ConfigError::Validation(_) => {
                Some("see [paths], [locale], [merge] and [collect] in leadbase.toml".to_string())
            }
        };
        Self { code: EXIT_USAGE, message: err.to_string(), hint }
    }

    /// Create error from merge error with proper exit code.
    pub fn merge(err: MergeError) -> Self {
        let code = merge_exit_code(&err);
        let hint = match &err {
            MergeError::MasterNotFound(_) => {
                Some("pass --master or set paths.input_dir / paths.master_name".to_string())
            }
            MergeError::Locked(lock) => Some(match MasterLock::holder(lock) {
                Some(pid) => format!(
                    "held by pid {pid}; if that process is not a running merge, delete {}",
                    lock.display()
                ),
                None => format!("another merge is running; if not, delete {}", lock.display()),
            }),
            MergeError::OutputIsInput(_) => {
                Some("use --output-dir or paths.merged_dir outside the master's folder".to_string())
            }
            MergeError::Preserve { .. } => {
                Some("the merged file is complete; rename the master by hand".to_string())
            }
            _ => None,
        };
        Self { code, message: err.to_string(), hint }
    }

    pub fn lookup(err: LookupError) -> Self {
        let code = lookup_exit_code(&err);
        let hint = match &err {
            LookupError::MissingApiKey => Some(format!(
                "set {} in the environment or in a .env file",
                leadbase_config::settings::API_KEY_ENV
            )),
            _ => None,
        };
        Self { code, message: err.to_string(), hint }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
