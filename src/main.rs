// LogSift - main.rs
//
// Command-line entry point. Handles:
// 1. CLI argument parsing
// 2. Configuration loading (config.toml + CLI overrides)
// 3. Logging initialisation (debug mode support)
// 4. Dispatch to the query facade, printing results as JSON on stdout

use clap::{Args, Parser, Subcommand, ValueEnum};
use logsift::app::charts::CsvChartData;
use logsift::app::params::{FilenameInput, QueryParams};
use logsift::app::query::{Analyzer, AnalyzerConfig, PageRequest};
use logsift::core::model::{RecordKind, TrafficInterval};
use logsift::platform::config::{self, AppConfig, PlatformPaths};
use logsift::util;
use serde::Serialize;
use std::error::Error;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

/// LogSift - Apache/Nginx log analyser.
///
/// Reads access and error logs from a directory and reports statistics,
/// traffic trends, anomalies and searchable listings as JSON.
#[derive(Parser, Debug)]
#[command(name = "logsift", version, about)]
struct Cli {
    /// Config file (defaults to the platform config directory).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the logs to analyse (overrides config).
    #[arg(long = "log-dir", global = true)]
    log_dir: Option<PathBuf>,

    /// Directory for the snapshot and chart data (overrides config).
    #[arg(long = "output-dir", global = true)]
    output_dir: Option<PathBuf>,

    /// Enable debug logging (equivalent to RUST_LOG=debug).
    #[arg(short = 'd', long = "debug", global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

/// Record selection shared by every query command.
#[derive(Args, Debug, Default)]
struct FilterArgs {
    /// Log file inside the log directory. Repeatable; the first usable one wins.
    #[arg(long = "file")]
    file: Vec<String>,

    /// Inclusive lower time bound (RFC 3339, YYYY-MM-DDTHH:MM[:SS] or YYYY-MM-DD).
    #[arg(long)]
    start: Option<String>,

    /// Inclusive upper time bound.
    #[arg(long)]
    end: Option<String>,

    /// Case-insensitive substring of the URL or referer.
    #[arg(long)]
    domain: Option<String>,
}

impl FilterArgs {
    fn to_params(&self, interval: Option<&str>) -> QueryParams {
        QueryParams {
            filename: FilenameInput::from_values(self.file.clone()),
            start_time: self.start.clone(),
            end_time: self.end.clone(),
            domain: self.domain.clone(),
            time_interval: interval.map(str::to_string),
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum KindArg {
    Access,
    Error,
}

impl From<KindArg> for RecordKind {
    fn from(k: KindArg) -> Self {
        match k {
            KindArg::Access => RecordKind::Access,
            KindArg::Error => RecordKind::Error,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List recognised log files with size, type and modification time.
    List,

    /// Basic statistics.
    Stats {
        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Traffic by hour of day (0-23).
    Hourly {
        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Traffic trend series.
    Trend {
        #[command(flatten)]
        filter: FilterArgs,

        /// hourly, daily, weekly or monthly (anything else means daily).
        #[arg(long, default_value = "daily")]
        interval: String,
    },

    /// High-frequency addresses, error responses and large responses.
    Anomalies {
        #[command(flatten)]
        filter: FilterArgs,

        /// Report error responses as counts per status code only.
        #[arg(long)]
        by_code: bool,
    },

    /// Error responses (status >= 400) with per-record detail.
    Errors {
        #[command(flatten)]
        filter: FilterArgs,
    },

    /// One page of the searchable record listing.
    Page {
        #[command(flatten)]
        filter: FilterArgs,

        #[arg(long, default_value = "")]
        search: String,

        /// 1-based page number.
        #[arg(long, default_value_t = 1)]
        page: usize,

        /// Records per page (defaults to the configured page size).
        #[arg(long)]
        page_size: Option<usize>,

        #[arg(long, value_enum)]
        kind: Option<KindArg>,
    },

    /// Write the filtered, searched listing as CSV.
    ExportCsv {
        #[command(flatten)]
        filter: FilterArgs,

        #[arg(long, default_value = "")]
        search: String,

        #[arg(long, value_enum)]
        kind: Option<KindArg>,

        /// Destination CSV file.
        #[arg(long)]
        out: PathBuf,
    },

    /// Full analysis: compute everything, write chart data and the snapshot.
    Analyze {
        #[command(flatten)]
        filter: FilterArgs,

        /// Trend interval (hourly, daily, weekly, monthly).
        #[arg(long)]
        interval: Option<String>,

        /// JSON file holding raw query parameters; replaces the filter flags.
        #[arg(
            long,
            conflicts_with_all = ["interval", "file", "start", "end", "domain"]
        )]
        request: Option<PathBuf>,
    },

    /// Print the snapshot of the last full analysis, or null.
    Snapshot,
}

fn main() {
    let cli = Cli::parse();

    // Config is read before logging so its level can apply; warnings are
    // reported once the subscriber is installed.
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| PlatformPaths::resolve().config_file());
    let (app_config, mut warnings) = match config::load_config(&config_path) {
        Ok(loaded) => loaded,
        Err(e) if cli.config.is_none() => {
            (AppConfig::default(), vec![format!("{e}. Using defaults.")])
        }
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    util::logging::init(cli.debug, app_config.log_level.as_deref());

    tracing::debug!(
        version = util::constants::APP_VERSION,
        config = %config_path.display(),
        "LogSift starting"
    );
    for warning in warnings.drain(..) {
        tracing::warn!(warning = %warning, "Config warning");
    }

    if let Err(e) = run(cli, app_config) {
        tracing::debug!(error = ?e, "Command failed");
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli, mut app_config: AppConfig) -> Result<(), Box<dyn Error>> {
    if let Some(dir) = cli.log_dir {
        app_config.log_dir = dir;
    }
    if let Some(dir) = cli.output_dir {
        app_config.output_dir = dir;
    }
    let analyzer = Analyzer::new(AnalyzerConfig::from(&app_config));

    match cli.command {
        Command::List => print_json(&analyzer.list_log_files()?),

        Command::Stats { filter } => {
            let criteria = filter.to_params(None).to_criteria()?;
            print_json(&analyzer.stats(&criteria)?)
        }

        Command::Hourly { filter } => {
            let criteria = filter.to_params(None).to_criteria()?;
            print_json(&analyzer.hourly(&criteria)?)
        }

        Command::Trend { filter, interval } => {
            let params = filter.to_params(Some(&interval));
            print_json(&analyzer.trend(&params.to_criteria()?, params.interval())?)
        }

        Command::Anomalies { filter, by_code } => {
            let criteria = filter.to_params(None).to_criteria()?;
            if by_code {
                print_json(&analyzer.error_counts(&criteria)?)
            } else {
                print_json(&analyzer.anomalies(&criteria)?)
            }
        }

        Command::Errors { filter } => {
            let criteria = filter.to_params(None).to_criteria()?;
            print_json(&analyzer.error_details(&criteria)?)
        }

        Command::Page {
            filter,
            search,
            page,
            page_size,
            kind,
        } => {
            let criteria = filter.to_params(None).to_criteria()?;
            let request = PageRequest {
                search,
                page,
                page_size: page_size.unwrap_or(app_config.page_size),
                kind: kind.map(RecordKind::from),
            };
            print_json(&analyzer.page(&criteria, &request)?)
        }

        Command::ExportCsv {
            filter,
            search,
            kind,
            out,
        } => {
            let criteria = filter.to_params(None).to_criteria()?;
            let file = File::create(&out)?;
            let rows = analyzer.export_csv(
                &criteria,
                &search,
                kind.map(RecordKind::from),
                BufWriter::new(file),
                &out,
            )?;
            print_json(&serde_json::json!({ "path": out, "rows": rows }))
        }

        Command::Analyze {
            filter,
            interval,
            request,
        } => {
            let params = match request {
                Some(path) => {
                    let bytes = std::fs::read(&path)?;
                    serde_json::from_slice::<QueryParams>(&bytes)?
                }
                None => filter.to_params(interval.as_deref()),
            };
            let interval: TrafficInterval = params.interval();
            let result =
                analyzer.run_full_analysis(&params.to_criteria()?, interval, &CsvChartData)?;
            if result.is_none() {
                tracing::info!("No log data found for the given filters");
            }
            print_json(&result)
        }

        Command::Snapshot => print_json(&analyzer.load_snapshot()?),
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), Box<dyn Error>> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    serde_json::to_writer_pretty(&mut out, value)?;
    writeln!(out)?;
    Ok(())
}
