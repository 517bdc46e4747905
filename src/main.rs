use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod db;
mod fetch;
mod leaderboard;
mod models;
mod refresh;
mod report;
mod stats;

use crate::db::{MemoryReportCache, PgReportCache, ReportCache};
use crate::fetch::{EvaluationSource, FileSource, PortalClient};
use crate::models::StatsReport;

#[derive(Parser)]
#[command(name = "grades-panel")]
#[command(about = "Per-course grade statistics from the Smartschool results API", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the cache schema
    InitDb,
    /// Fetch evaluations, rebuild the report and cache it
    Refresh {
        #[arg(long)]
        year: Option<String>,
        /// Reference instant for the month window (defaults to now)
        #[arg(long)]
        now: Option<String>,
        /// Read a saved portal response instead of calling the API
        #[arg(long)]
        input: Option<PathBuf>,
    },
    /// Show the cached report, refreshing when nothing is cached
    Show {
        #[arg(long)]
        year: Option<String>,
        #[arg(long)]
        now: Option<String>,
    },
    /// Aggregate a saved portal response without touching the cache
    Aggregate {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        year: Option<String>,
        #[arg(long)]
        now: Option<String>,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Emit the leaderboard message for a report
    Leaderboard {
        /// Report JSON to use instead of the cached one
        #[arg(long)]
        input: Option<PathBuf>,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Write the cached report as one CSV row per evaluation
    Export {
        #[arg(long, default_value = "grades.csv")]
        csv: PathBuf,
    },
}

#[derive(Serialize)]
struct ExportRow<'a> {
    course_id: &'a str,
    course_name: &'a str,
    course_avg: f64,
    evaluation_id: &'a str,
    evaluation_name: &'a str,
    date: &'a str,
    percent: f64,
    points_earned: Option<f64>,
    points_max: Option<f64>,
    color: Option<&'a str>,
    description: &'a str,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::InitDb => {
            let pool = connect().await?;
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Refresh { year, now, input } => {
            let window = config::year_window(year.as_deref())?;
            let now = config::reference_now(now.as_deref())?;
            let source = open_source(input)?;
            let cache = open_cache().await?;
            let report = refresh::refresh(source.as_ref(), cache.as_ref(), &window, now).await?;
            print!("{}", report::render_panel(&report));
        }
        Commands::Show { year, now } => {
            let window = config::year_window(year.as_deref())?;
            let now = config::reference_now(now.as_deref())?;
            let cache = open_cache().await?;
            let report =
                refresh::load_or_refresh(|| open_source(None), cache.as_ref(), &window, now)
                    .await?;
            print!("{}", report::render_panel(&report));
        }
        Commands::Aggregate {
            input,
            year,
            now,
            out,
        } => {
            let window = config::year_window(year.as_deref())?;
            let now = config::reference_now(now.as_deref())?;
            let raw = FileSource { path: input }.fetch(&window).await?;
            let report = stats::aggregate(&raw, &window, now);
            info!(records = raw.len(), courses = report.courses.len(), "aggregated");
            emit_json(&report, out.as_deref())?;
        }
        Commands::Leaderboard { input, out } => {
            let report = match input {
                Some(path) => read_report(&path)?,
                None => cached_report().await?,
            };
            info!(
                page = leaderboard::LEADERBOARD_URL,
                origin = leaderboard::LEADERBOARD_ORIGIN,
                "leaderboard message ready"
            );
            emit_json(&leaderboard::message(&report), out.as_deref())?;
        }
        Commands::Export { csv } => {
            let report = cached_report().await?;
            let written = export_csv(&report, &csv)?;
            println!("Wrote {written} evaluations to {}.", csv.display());
        }
    }

    Ok(())
}

async fn connect() -> anyhow::Result<sqlx::PgPool> {
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a Postgres instance")?;

    PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")
}

async fn open_cache() -> anyhow::Result<Box<dyn ReportCache>> {
    if std::env::var("DATABASE_URL").is_err() {
        warn!("DATABASE_URL not set, report will not outlive this run");
        return Ok(Box::new(MemoryReportCache::default()));
    }
    Ok(Box::new(PgReportCache::new(connect().await?)))
}

fn open_source(input: Option<PathBuf>) -> anyhow::Result<Box<dyn EvaluationSource>> {
    match input {
        Some(path) => Ok(Box::new(FileSource { path })),
        None => Ok(Box::new(PortalClient::new(config::PortalConfig::from_env()?))),
    }
}

async fn cached_report() -> anyhow::Result<StatsReport> {
    let cache = PgReportCache::new(connect().await?);
    cache
        .load()
        .await?
        .context("no cached report, run `grades-panel refresh` first")
}

fn read_report(path: &Path) -> anyhow::Result<StatsReport> {
    let body =
        std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_slice(&body).context("file is not a grades report")
}

fn emit_json<T: Serialize>(value: &T, out: Option<&Path>) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    match out {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("Written to {}.", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn export_csv(report: &StatsReport, path: &Path) -> anyhow::Result<usize> {
    let mut writer = csv::Writer::from_path(path)?;
    let mut written = 0usize;

    for course in report.courses.iter() {
        for evaluation in course.evaluations.iter() {
            writer.serialize(ExportRow {
                course_id: &course.course_id,
                course_name: &course.course_name,
                course_avg: course.avg_percent,
                evaluation_id: &evaluation.id,
                evaluation_name: &evaluation.name,
                date: &evaluation.date,
                percent: evaluation.percent,
                points_earned: evaluation.points_earned,
                points_max: evaluation.points_max,
                color: evaluation.color.as_deref(),
                description: &evaluation.description,
            })?;
            written += 1;
        }
    }

    writer.flush()?;
    Ok(written)
}
