//! CLI entry point for the box tracking tool.
//!
//! Provides subcommands for computing insights over a dataset, exporting
//! timelines, ingesting scans, reindexing boxes, and applying destination
//! coordinate corrections.

use anyhow::{Result, bail};
use boxtrack::config::Settings;
use boxtrack::correction::{apply_corrections, load_corrections};
use boxtrack::dataset::{self, Dataset};
use boxtrack::ingest::ingest_scan;
use boxtrack::insights::analyzer::{analyze, write_report};
use boxtrack::insights::{InsightsOptions, InsightsReport};
use boxtrack::output::{print_json, write_timeline_csv};
use boxtrack::status::reindex_box;
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::collections::HashMap;
use std::ffi::OsStr;
use std::path::Path;
use tracing::{error, info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "boxtrack")]
#[command(about = "Track box deliveries to schools from geotagged scans", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute repartition, timeline and content delivery insights
    Insights {
        /// Dataset file (JSON, optionally gzip-compressed)
        #[arg(short, long, value_name = "FILE")]
        input: String,

        /// Directory to write per-project JSON and index.json into
        #[arg(short, long, default_value = "insights")]
        output_dir: String,

        /// Aggregate the whole selection instead of per project
        #[arg(long, default_value_t = false)]
        ungrouped: bool,

        /// Only include these projects (repeatable)
        #[arg(long = "only", value_name = "PROJECT")]
        only: Vec<String>,

        /// Maximum number of projects aggregated concurrently
        #[arg(short, long, default_value_t = 4)]
        concurrency: usize,
    },
    /// Export daily timelines per project as CSV
    Timeline {
        #[arg(short, long, value_name = "FILE")]
        input: String,

        /// CSV file to write
        #[arg(short, long, default_value = "timeline.csv")]
        output: String,
    },
    /// Ingest scans from a CSV file into a dataset
    Ingest {
        #[arg(short, long, value_name = "FILE")]
        input: String,

        /// CSV of scans with a header row
        #[arg(short, long, value_name = "CSV")]
        scans: String,

        /// Dataset file to write (defaults to the input)
        #[arg(short, long)]
        output: Option<String>,

        /// Gzip compress the written dataset
        #[arg(long, default_value_t = false)]
        gzip: bool,
    },
    /// Recompute status records of every box from its scans
    Reindex {
        #[arg(short, long, value_name = "FILE")]
        input: String,

        #[arg(short, long)]
        output: Option<String>,

        #[arg(long, default_value_t = false)]
        gzip: bool,
    },
    /// Apply destination coordinate corrections and reindex affected boxes
    Correct {
        #[arg(short, long, value_name = "FILE")]
        input: String,

        /// JSON array of {district, school, latitude, longitude}
        #[arg(short, long, value_name = "JSON")]
        corrections: String,

        #[arg(short, long)]
        output: Option<String>,

        #[arg(long, default_value_t = false)]
        gzip: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/boxtrack.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("boxtrack.log"));

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
    let settings = Settings::from_env()?;
    info!(
        geofence_radius_m = settings.geofence_radius_m,
        timeline_max_days = settings.timeline_max_days,
        "Settings loaded"
    );

    match cli.command {
        Commands::Insights {
            input,
            output_dir,
            ungrouped,
            only,
            concurrency,
        } => {
            let dataset = dataset::load(&input)?;
            let options = InsightsOptions {
                grouped: !ungrouped,
                only: (!only.is_empty()).then_some(only),
            };
            let now = Utc::now();

            let report = analyze(dataset.boxes, options, settings, now, concurrency).await?;
            if report.is_empty() {
                warn!("No boxes matched, nothing to report");
                return Ok(());
            }
            write_report(Path::new(&output_dir), &report, now)?;
        }
        Commands::Timeline { input, output } => {
            let dataset = dataset::load(&input)?;
            let report = analyze(
                dataset.boxes,
                InsightsOptions::default(),
                settings,
                Utc::now(),
                1,
            )
            .await?;

            let InsightsReport::Grouped(groups) = report else {
                bail!("expected a grouped report");
            };
            write_timeline_csv(
                &output,
                groups
                    .iter()
                    .map(|(project, insights)| (project.as_str(), insights.timeline.as_slice())),
            )?;
        }
        Commands::Ingest {
            input,
            scans,
            output,
            gzip,
        } => {
            let mut dataset = dataset::load(&input)?;
            let scans = dataset::load_scan_rows(&scans)?;
            ingest_all(&mut dataset, scans, &settings)?;
            dataset::save(output.as_deref().unwrap_or(&input), &dataset, gzip)?;
        }
        Commands::Reindex {
            input,
            output,
            gzip,
        } => {
            let mut dataset = dataset::load(&input)?;
            let now = Utc::now();
            let changed = dataset
                .boxes
                .iter_mut()
                .map(|b| reindex_box(b, now))
                .filter(|changed| *changed)
                .count();
            info!(boxes = dataset.boxes.len(), changed, "Reindex complete");
            dataset::save(output.as_deref().unwrap_or(&input), &dataset, gzip)?;
        }
        Commands::Correct {
            input,
            corrections,
            output,
            gzip,
        } => {
            let mut dataset = dataset::load(&input)?;
            let corrections = load_corrections(&corrections)?;
            let summary = apply_corrections(
                &mut dataset.boxes,
                &corrections,
                &settings.geofence(),
                Utc::now(),
            );
            print_json(&summary)?;
            dataset::save(output.as_deref().unwrap_or(&input), &dataset, gzip)?;
        }
    }

    Ok(())
}

/// Routes each scan to its box and ingests it. Scans for unknown boxes or
/// failing validation are logged and skipped.
#[tracing::instrument(skip_all, fields(scans = scans.len()))]
fn ingest_all(
    dataset: &mut Dataset,
    scans: Vec<boxtrack::model::NewScan>,
    settings: &Settings,
) -> Result<()> {
    let geofence = settings.geofence();
    let positions: HashMap<String, usize> = dataset
        .boxes
        .iter()
        .enumerate()
        .map(|(i, b)| (b.id.clone(), i))
        .collect();

    let mut ingested = 0usize;
    let mut rejected = 0usize;

    for scan in scans {
        let Some(&idx) = positions.get(&scan.box_id) else {
            warn!(scan_id = %scan.id, box_id = %scan.box_id, "Box not found, skipping scan");
            rejected += 1;
            continue;
        };

        let scan_id = scan.id.clone();
        match ingest_scan(&mut dataset.boxes[idx], scan, &geofence, Utc::now()) {
            Ok(outcome) => {
                info!(
                    scan_id = %outcome.scan_id,
                    final_destination = outcome.final_destination,
                    progress = %outcome.progress,
                    reindexed = outcome.reindexed,
                    "Scan added"
                );
                ingested += 1;
            }
            Err(e) => {
                error!(scan_id = %scan_id, error = %e, "Scan rejected");
                rejected += 1;
            }
        }
    }

    info!(ingested, rejected, "Ingestion complete");
    Ok(())
}
