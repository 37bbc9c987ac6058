// shiptrack CLI - import shipment batches and reconcile them against the carrier site

mod exit_codes;
mod fetch;
mod run;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use shiptrack_config::{ConfigError, Settings};
use shiptrack_io::{FolderImporter, ImportError};
use shiptrack_recon::{deduplicate, CanonicalStatus, FetchOutcome, ReconError, TrackingFetcher};
use tracing_subscriber::EnvFilter;

use exit_codes::{EXIT_ERROR, EXIT_IMPORT_UNAVAILABLE, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "shiptrack")]
#[command(about = "Reconcile internal shipment statuses against the carrier tracking site")]
#[command(version)]
struct Cli {
    /// Config file (default: <config dir>/shiptrack/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Debug logging (RUST_LOG takes precedence)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    /// Only warnings and errors
    #[arg(long, short = 'q', global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import the newest batch, then check every stored shipment with the carrier
    #[command(after_help = "\
Exit code 7 (with --fail-on-diff) means at least one shipment's internal status \
differs from the carrier. The differences report is written next to tracking.csv.

Examples:
  shiptrack run
  shiptrack run --source-dir ~/Downloads/dropi --store-dir ~/shiptrack
  shiptrack run --no-import --limit 20
  shiptrack run --json --fail-on-diff > summary.json")]
    Run {
        #[command(flatten)]
        dirs: DirArgs,

        /// Carrier lookup URL containing {tracking_number}
        #[arg(long)]
        tracking_url: Option<String>,

        /// Seconds to wait between carrier lookups
        #[arg(long)]
        pace_secs: Option<u64>,

        /// Check at most N stored shipments
        #[arg(long, value_name = "N")]
        limit: Option<usize>,

        /// Differences report format (csv or xlsx)
        #[arg(long, value_name = "FORMAT")]
        report_format: Option<String>,

        /// Skip importing and only re-check the tracking sheet
        #[arg(long)]
        no_import: bool,

        /// Print the run summary as JSON on stdout
        #[arg(long)]
        json: bool,

        /// Exit 7 when any shipment differs from the carrier
        #[arg(long)]
        fail_on_diff: bool,
    },

    /// Classify a carrier status text
    #[command(after_help = "\
Examples:
  shiptrack classify 'Tu envío fue entregado'
  shiptrack classify 'Viajando a tu destino' --json")]
    Classify {
        text: String,

        #[arg(long)]
        json: bool,
    },

    /// Preview the deduplicated rows of an import file
    #[command(after_help = "\
Without FILE, the newest supported file in the source folder is used.

Examples:
  shiptrack import
  shiptrack import envios_octubre.xlsx --json")]
    Import {
        file: Option<PathBuf>,

        /// Folder to pick the newest batch from
        #[arg(long)]
        source_dir: Option<PathBuf>,

        #[arg(long)]
        json: bool,
    },

    /// Look up a single tracking number on the carrier site
    Check {
        tracking_number: String,

        /// Carrier lookup URL containing {tracking_number}
        #[arg(long)]
        tracking_url: Option<String>,

        #[arg(long)]
        json: bool,
    },

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print the default config file path
    Path,
    /// Print the effective settings as TOML
    Show,
}

#[derive(clap::Args)]
struct DirArgs {
    /// Folder holding import batches
    #[arg(long)]
    source_dir: Option<PathBuf>,

    /// Folder holding tracking.csv and differences reports
    #[arg(long)]
    store_dir: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let config = cli.config.as_deref();
    let result = match cli.command {
        Commands::Run {
            dirs,
            tracking_url,
            pace_secs,
            limit,
            report_format,
            no_import,
            json,
            fail_on_diff,
        } => load_settings(config, |s| {
            if let Some(d) = dirs.source_dir {
                s.source_dir = d;
            }
            if let Some(d) = dirs.store_dir {
                s.store_dir = d;
            }
            if let Some(u) = tracking_url {
                s.tracking_url = u;
            }
            if let Some(p) = pace_secs {
                s.pace_secs = p;
            }
            if limit.is_some() {
                s.limit = limit;
            }
            if let Some(f) = report_format {
                s.report_format = f;
            }
        })
        .and_then(|settings| run::cmd_run(&settings, no_import, json, fail_on_diff)),
        Commands::Classify { text, json } => {
            load_settings(config, |_| {}).and_then(|s| cmd_classify(&s, &text, json))
        }
        Commands::Import { file, source_dir, json } => load_settings(config, |s| {
            if let Some(d) = source_dir {
                s.source_dir = d;
            }
        })
        .and_then(|s| cmd_import(&s, file, json)),
        Commands::Check { tracking_number, tracking_url, json } => load_settings(config, |s| {
            if let Some(u) = tracking_url {
                s.tracking_url = u;
            }
        })
        .and_then(|s| cmd_check(&s, &tracking_number, json)),
        Commands::Config { command } => match command {
            ConfigCommands::Path => {
                println!("{}", Settings::config_path().display());
                Ok(())
            }
            ConfigCommands::Show => cmd_config_show(config),
        },
    };

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

/// Logs go to stderr so `--json` output stays clean. RUST_LOG wins over flags.
fn init_tracing(verbose: bool, quiet: bool) {
    let default = if quiet {
        "shiptrack=warn"
    } else if verbose {
        "shiptrack=debug"
    } else {
        "shiptrack=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn usage(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn config(err: ConfigError) -> Self {
        let code = exit_codes::config_exit_code(&err);
        let hint = match &err {
            ConfigError::Read { .. } => Some("check the --config path".to_string()),
            ConfigError::Parse { .. } => Some("see `shiptrack config show` for the expected keys".to_string()),
            ConfigError::Invalid(_) => None,
        };
        Self { code, message: err.to_string(), hint }
    }

    pub fn recon(err: ReconError) -> Self {
        let code = exit_codes::recon_exit_code(&err);
        let hint = match &err {
            ReconError::ImportUnavailable(_) => {
                Some("drop an .xlsx or .csv export into the source folder, or use --no-import".to_string())
            }
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

/// Config file and environment, then CLI overrides, then validation.
fn load_settings(
    path: Option<&std::path::Path>,
    overrides: impl FnOnce(&mut Settings),
) -> Result<Settings, CliError> {
    let mut settings = Settings::load(path).map_err(CliError::config)?;
    overrides(&mut settings);
    settings.validate().map_err(CliError::config)?;
    Ok(settings)
}

fn cmd_classify(settings: &Settings, text: &str, json: bool) -> Result<(), CliError> {
    let status = run::classifier_for(settings).classify(text);
    if json {
        let out = serde_json::json!({
            "input": text,
            "status": status.display(),
            "key": status.key(),
        });
        println!("{}", serde_json::to_string_pretty(&out).map_err(|e| CliError::usage(e.to_string()))?);
    } else {
        println!("{}\t{}", status.key(), status.display());
    }
    Ok(())
}

fn cmd_import(settings: &Settings, file: Option<PathBuf>, json: bool) -> Result<(), CliError> {
    let path = match file {
        Some(p) => p,
        None => FolderImporter::new(&settings.source_dir)
            .latest_file()
            .map_err(|e| CliError::usage(format!("cannot list {}: {e}", settings.source_dir.display())))?
            .ok_or_else(|| CliError {
                code: EXIT_IMPORT_UNAVAILABLE,
                message: format!("no import files in {}", settings.source_dir.display()),
                hint: Some("supported: xlsx, xlsm, xls, ods, csv, tsv".into()),
            })?,
    };

    let rows = shiptrack_io::read_rows(&path).map_err(|e| {
        let err = CliError::usage(format!("{}: {e}", path.display()));
        match e {
            ImportError::MissingHeaders(_) => err.with_hint("expected columns: ID, NÚMERO GUIA, ESTATUS"),
            _ => err,
        }
    })?;
    let records = deduplicate(&rows);
    eprintln!("{}: {} rows, {} unique tracking numbers", path.display(), rows.len(), records.len());

    if json {
        let out = serde_json::to_string_pretty(&records).map_err(|e| CliError::usage(e.to_string()))?;
        println!("{out}");
    } else {
        for r in &records {
            println!("{}\t{}\t{}", r.source_id, r.tracking_number, r.internal_status);
        }
    }
    Ok(())
}

fn cmd_check(settings: &Settings, tracking_number: &str, json: bool) -> Result<(), CliError> {
    let tracking_number = tracking_number.trim();
    if tracking_number.is_empty() {
        return Err(CliError::usage("tracking number is empty"));
    }

    let mut fetcher = fetch::HttpTrackingFetcher::new(settings)
        .map_err(|e| CliError::recon(ReconError::CollaboratorInit(e)))?;
    let outcome = fetcher.fetch(tracking_number);

    let (raw, status) = match &outcome {
        FetchOutcome::Text(text) => (Some(text.clone()), run::classifier_for(settings).classify(text)),
        FetchOutcome::NotFound => (None, CanonicalStatus::NotFound),
        FetchOutcome::Failed { cause } => {
            return Err(CliError {
                code: EXIT_ERROR,
                message: format!("lookup of {tracking_number} failed: {cause}"),
                hint: Some(format!("URL: {}", settings.url_for(tracking_number))),
            });
        }
    };

    if json {
        let out = serde_json::json!({
            "tracking_number": tracking_number,
            "raw": raw,
            "status": status.display(),
            "key": status.key(),
        });
        println!("{}", serde_json::to_string_pretty(&out).map_err(|e| CliError::usage(e.to_string()))?);
    } else {
        println!("{tracking_number}\t{status}");
        if let Some(raw) = raw {
            eprintln!("carrier text: {raw}");
        }
    }
    Ok(())
}

fn cmd_config_show(path: Option<&std::path::Path>) -> Result<(), CliError> {
    let settings = Settings::load(path).map_err(CliError::config)?;
    let text = settings.to_toml().map_err(|e| CliError { code: EXIT_ERROR, message: e, hint: None })?;
    print!("{text}");
    if let Err(e) = settings.validate() {
        eprintln!("warning: {e}");
    }
    Ok(())
}
