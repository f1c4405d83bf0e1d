use std::path::PathBuf;

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use serde::Serialize;
use sqlx::postgres::PgPoolOptions;

mod aggregator;
mod calendar;
mod db;
mod error;
mod logging;
mod missed;
mod models;
mod monthly;
mod report;
mod rules;
mod store;

use aggregator::StageReport;
use calendar::EvalContext;

#[derive(Parser)]
#[command(name = "hr-report-dashboard")]
#[command(about = "Report compliance dashboards for daily work, SOD and POD submissions", long_about = None)]
struct Cli {
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    database_url: String,
    #[arg(long, env = "DASHBOARD_MAX_CONNECTIONS", default_value_t = 5)]
    max_connections: u32,
    /// Evaluate as if today were this date (YYYY-MM-DD)
    #[arg(long, global = true, value_parser = parse_date)]
    today: Option<NaiveDate>,
    /// Print summaries as JSON
    #[arg(long, global = true)]
    json: bool,
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the dashboard tables
    InitDb,
    /// Upsert dashboard rows from work reports and daily tasks, then refresh rollups
    Sync,
    /// Delete and rebuild POD/SOD rows in a date window (defaults to month-to-date)
    Regenerate {
        #[arg(long, value_parser = parse_date)]
        start: Option<NaiveDate>,
        #[arg(long, value_parser = parse_date)]
        end: Option<NaiveDate>,
    },
    /// Recompute per-employee missed report counts
    SyncMissed,
    /// Recompute employee monthly working hours
    SyncEmployeeMonthly {
        #[arg(long, requires = "month")]
        year: Option<i32>,
        #[arg(long, requires = "year", value_parser = clap::value_parser!(u32).range(1..=12))]
        month: Option<u32>,
    },
    /// Recompute department monthly working hours
    SyncDepartmentMonthly {
        #[arg(long, requires = "month")]
        year: Option<i32>,
        #[arg(long, requires = "year", value_parser = clap::value_parser!(u32).range(1..=12))]
        month: Option<u32>,
    },
    /// Generate a markdown compliance report
    Report {
        #[arg(long, default_value = "dashboard.md")]
        out: PathBuf,
    },
    /// Write per-employee missed report counts as CSV
    ExportMissed {
        #[arg(long, default_value = "missed-reports.csv")]
        out: PathBuf,
    },
}

fn parse_date(value: &str) -> Result<NaiveDate, String> {
    calendar::parse_iso_date(value).map_err(|err| err.to_string())
}

fn print_summary<T: Serialize>(json: bool, summary: &T, text: impl FnOnce() -> String) {
    if json {
        match serde_json::to_string_pretty(summary) {
            Ok(body) => println!("{body}"),
            Err(err) => eprintln!("failed to encode summary: {err}"),
        }
    } else {
        println!("{}", text());
    }
}

fn describe_stages(stages: &[StageReport]) -> String {
    let failed = stages.iter().filter(|stage| !stage.succeeded()).count();
    let mut lines: Vec<String> = stages
        .iter()
        .map(|stage| match &stage.error {
            None => format!("  {}: ok", stage.stage),
            Some(error) => format!("  {}: failed ({error})", stage.stage),
        })
        .collect();
    lines.push(format!("{} of {} rollup stages failed.", failed, stages.len()));
    lines.join("\n")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    logging::init_logging(cli.verbose)?;

    let pool = PgPoolOptions::new()
        .max_connections(cli.max_connections)
        .connect(&cli.database_url)
        .await
        .context("failed to connect to Postgres")?;

    let store = db::PgStore::connect(pool)
        .await
        .context("failed to inspect source tables")?;
    let ctx = EvalContext::local(cli.today);
    tracing::debug!(today = %ctx.today, now = %ctx.now, "evaluation context");

    match cli.command {
        Commands::InitDb => {
            db::init_db(store.pool()).await?;
            println!("Schema ready.");
        }
        Commands::Sync => {
            let summary = aggregator::sync_dashboard(&store, &ctx).await?;
            print_summary(cli.json, &summary, || {
                format!(
                    "Synced {} DWR, {} POD and {} SOD rows ({} skipped).\n{}",
                    summary.dwr_upserted,
                    summary.pod_upserted,
                    summary.sod_upserted,
                    summary.skipped,
                    describe_stages(&summary.stages)
                )
            });
        }
        Commands::Regenerate { start, end } => {
            let summary = aggregator::regenerate_pod_sod(&store, &ctx, start, end).await?;
            print_summary(cli.json, &summary, || {
                format!(
                    "Removed {} and created {} POD/SOD rows between {} and {}.\n{}",
                    summary.removed,
                    summary.created,
                    summary.start,
                    summary.end,
                    describe_stages(&summary.stages)
                )
            });
        }
        Commands::SyncMissed => {
            missed::sync_missed_reports(&store, &ctx).await?;
            println!("Missed reports updated.");
        }
        Commands::SyncEmployeeMonthly { year, month } => {
            monthly::sync_employee_monthly(&store, &ctx, year, month).await?;
            println!("Employee monthly totals updated.");
        }
        Commands::SyncDepartmentMonthly { year, month } => {
            monthly::sync_department_monthly(&store, &ctx, year, month).await?;
            println!("Department monthly totals updated.");
        }
        Commands::Report { out } => {
            let body = report::load_report(&store, &ctx).await?;
            std::fs::write(&out, body)?;
            println!("Report written to {}.", out.display());
        }
        Commands::ExportMissed { out } => {
            let file = std::fs::File::create(&out)
                .with_context(|| format!("failed to create {}", out.display()))?;
            let written = report::export_missed_csv(&store, file).await?;
            println!("Exported {written} rows to {}.", out.display());
        }
    }

    Ok(())
}
