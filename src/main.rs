//! CLI entry point for the turnstile daily count tool.
//!
//! Provides subcommands for loading stations and raw turnstile files,
//! aggregating daily counts, correcting anomalous rows and exporting
//! per-period summaries.

use anyhow::{Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};
use turnstile_counts::config::{DEFAULT_DB_PATH, DEFAULT_TIME_ZONE, Settings};
use turnstile_counts::counts::fixer::correct_anomalies;
use turnstile_counts::counts::runner::aggregate_range;
use turnstile_counts::infra::sqlite::SqliteStore;
use turnstile_counts::ingest::{
    FileFilter, StationResolver, check_stations, ingest_readings, ingest_stations,
};
use turnstile_counts::model::parse_date_key;
use turnstile_counts::output::{print_json, write_records};
use turnstile_counts::summary::period_means;

#[derive(Parser)]
#[command(name = "turnstile_counts")]
#[command(about = "Daily ridership counts from cumulative turnstile readings", long_about = None)]
struct Cli {
    /// SQLite database holding stations, readings and daily counts
    #[arg(long, env = "TURNSTILE_DB", default_value = DEFAULT_DB_PATH, global = true)]
    db: PathBuf,

    /// Time zone that defines local midnight
    #[arg(long, env = "TURNSTILE_TZ", default_value = DEFAULT_TIME_ZONE, global = true)]
    tz: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load station metadata (id,name,lon,lat,type) from a CSV file
    IngestStations {
        #[arg(value_name = "CSV")]
        path: PathBuf,
    },
    /// Load raw turnstile readings from turnstile_YYMMDD.txt files
    IngestReadings {
        #[command(flatten)]
        files: FileArgs,
    },
    /// List station names in turnstile files that cannot be resolved
    CheckStations {
        #[command(flatten)]
        files: FileArgs,
    },
    /// Aggregate daily counts for every station over a date range
    Aggregate {
        /// First date, YYYY/MM/DD
        #[arg(long)]
        start: String,

        /// Last date (inclusive), YYYY/MM/DD
        #[arg(long)]
        end: String,

        /// Skip station-days that already have a row
        #[arg(long, default_value_t = false)]
        resume: bool,
    },
    /// Recompute stored daily counts that fall outside the plausible range
    Fix,
    /// Sum each period over stations per date for a date prefix
    Summary {
        /// Date prefix, e.g. 2019 or 2019/06
        #[arg(long)]
        prefix: String,

        /// Only stations of this system (NYCT, PATH, ...)
        #[arg(long)]
        system: Option<String>,

        #[arg(long, value_enum, default_value_t = Metric::Entries)]
        metric: Metric,

        /// CSV file to write; logs JSON when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(clap::Args)]
struct FileArgs {
    /// Directory containing turnstile files
    #[arg(value_name = "DIR")]
    dir: PathBuf,

    /// key,id CSV mapping raw station names to station ids
    #[arg(long)]
    lookup: Option<PathBuf>,

    /// Only files dated after this YYMMDD
    #[arg(long)]
    from: Option<u32>,

    /// Only files dated before this YYMMDD
    #[arg(long)]
    to: Option<u32>,
}

impl FileArgs {
    fn filter(&self) -> FileFilter {
        FileFilter {
            after: self.from,
            before: self.to,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Metric {
    Entries,
    Exits,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/turnstile_counts.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("turnstile_counts.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    let settings = Settings::new(&cli.db, &cli.tz)?;
    let store = SqliteStore::open(&settings.db_path).await?;

    match cli.command {
        Commands::IngestStations { path } => {
            ingest_stations(&store, &path).await?;
        }
        Commands::IngestReadings { files } => {
            let resolver = StationResolver::load(&store, files.lookup.as_deref()).await?;
            let report =
                ingest_readings(&store, &resolver, &files.dir, files.filter(), settings.tz).await?;

            info!(
                files = report.files,
                rows = report.rows,
                skipped_rows = report.skipped_rows,
                unknown_stations = report.unknown_stations.len(),
                "Ingestion complete"
            );
        }
        Commands::CheckStations { files } => {
            let resolver = StationResolver::load(&store, files.lookup.as_deref()).await?;
            let unknown = check_stations(&files.dir, files.filter(), &resolver)?;

            for name in &unknown {
                warn!(station = %name, "Unresolved station name");
            }
            info!(unresolved = unknown.len(), "Station check complete");
        }
        Commands::Aggregate { start, end, resume } => {
            let start = parse_date_key(&start)?;
            let end = parse_date_key(&end)?;
            if start > end {
                bail!("start date {start} is after end date {end}");
            }

            let report =
                aggregate_range(&store, &store, &store, settings.tz, start, end, resume).await?;

            for (station_id, date) in &report.conflicts {
                warn!(station_id, date = %date, "Conflicting row left untouched");
            }
        }
        Commands::Fix => {
            let report = correct_anomalies(&store, &store, settings.tz).await?;

            info!(
                flagged = report.flagged.len(),
                corrected = report.corrected,
                unresolved = report.unresolved.len(),
                "Correction pass complete"
            );
        }
        Commands::Summary {
            prefix,
            system,
            metric,
            output,
        } => {
            let exits = matches!(metric, Metric::Exits);
            let rows = store.period_sums(&prefix, system.as_deref(), exits).await?;
            let means = period_means(&rows);

            info!(
                prefix = %prefix,
                days = means.days,
                graveyard = means.graveyard,
                morning = means.morning,
                afternoon = means.afternoon,
                night = means.night,
                "Average per period"
            );

            match output {
                Some(path) => write_records(&path, &rows)?,
                None => print_json(&rows)?,
            }
        }
    }

    store.close().await;
    Ok(())
}
