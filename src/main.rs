//! CLI entry point for the bike-share analytics tool.
//!
//! Provides subcommands for running the full analysis over a dataset
//! directory and for validating a dataset without analyzing it.

use anyhow::Result;
use bikeshare_analytics::analytics::report::analyze;
use bikeshare_analytics::{
    config::AnalyticsConfig,
    loader::load_dataset,
    output::{append_totals, print_pretty, print_summary, write_flagged_trips, write_report},
};
use clap::{Parser, Subcommand};
use std::ffi::OsStr;
use std::path::Path;
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "bikeshare_analytics")]
#[command(about = "Usage, revenue and anomaly analytics for bike-share trips", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a dataset directory and write the report
    Analyze {
        /// Directory containing stations.csv, bikes.csv, users.csv and trips.csv
        #[arg(short = 'd', long, default_value = "data")]
        data_dir: String,

        /// JSON configuration file (pricing, maintenance, threshold, top-k)
        #[arg(short, long)]
        config: Option<String>,

        /// JSON file to write the report to
        #[arg(short, long, default_value = "output/report.json")]
        output: String,

        /// CSV file to write flagged trips to
        #[arg(long, default_value = "output/flagged_trips.csv")]
        flagged_csv: String,

        /// Optional: CSV file to append one totals row per run to
        #[arg(long)]
        history_csv: Option<String>,

        /// Override the number of entries in each ranking
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Override the anomaly threshold, in standard deviations
        #[arg(short, long)]
        threshold: Option<f64>,
    },
    /// Load and validate a dataset directory without analyzing it
    Validate {
        /// Directory containing the dataset CSVs
        #[arg(short = 'd', long, default_value = "data")]
        data_dir: String,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/bikeshare_analytics.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("bikeshare_analytics.log"));

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

    match cli.command {
        Commands::Analyze {
            data_dir,
            config,
            output,
            flagged_csv,
            history_csv,
            top_k,
            threshold,
        } => {
            let config = match config {
                Some(path) => AnalyticsConfig::load(&path)?,
                None => {
                    info!("No config file given, using default pricing and thresholds");
                    AnalyticsConfig::default()
                }
            }
            .with_overrides(top_k, threshold);

            let dataset = load_dataset(Path::new(&data_dir))?;
            if dataset.is_empty() {
                warn!(data_dir = %data_dir, "Dataset has no trips; averages and ARPU will be n/a");
            }

            let report = analyze(&dataset, &config)?;

            print_pretty(&report);
            print_summary(&report);
            write_report(&output, &report)?;
            write_flagged_trips(&flagged_csv, &report.anomalies.flagged_trips)?;
            if let Some(path) = history_csv {
                append_totals(&path, &report.totals)?;
            }
        }
        Commands::Validate { data_dir } => {
            let dataset = load_dataset(Path::new(&data_dir))?;
            info!(
                data_dir = %data_dir,
                trips = dataset.trips().len(),
                stations = dataset.stations().len(),
                "Dataset is valid"
            );
        }
    }

    Ok(())
}
