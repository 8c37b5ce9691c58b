use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::warn;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

mod analytics;
mod db;
mod error;
mod intake;
mod models;
mod notify;
mod policy;
mod schedule;

use intake::RawReport;
use models::ReportOutcome;
use notify::{ConsoleSink, ReportContext};

#[derive(Parser)]
#[command(name = "collection-catchup")]
#[command(about = "Missed-collection catch-up scheduling for municipal waste operations", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Record a missed collection reported by a collector
    Report {
        /// Resident id, or the composite "<userId>-<collectorId>" form
        #[arg(long)]
        user_id: String,
        #[arg(long)]
        collector_id: Option<String>,
        /// collector_fault or resident_fault
        #[arg(long)]
        fault_type: String,
        #[arg(long)]
        issue_type: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// low, medium, or high (defaults to medium)
        #[arg(long)]
        severity: Option<String>,
        /// Override for the policy's default catch-up delay
        #[arg(long)]
        delay_days: Option<i32>,
        #[arg(long)]
        notes: Option<String>,
        #[arg(long)]
        stop_id: Option<i64>,
        #[arg(long)]
        schedule_id: Option<i64>,
    },
    /// Show a collector's ranked catch-up backlog
    Tasks {
        #[arg(long)]
        collector_id: i64,
    },
    /// Complete a catch-up task and resolve its report
    Complete {
        #[arg(long)]
        task_id: Uuid,
        #[arg(long)]
        collector_id: i64,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Aggregate missed-collection counts and resolution rate
    Analytics {
        #[arg(long, default_value_t = 30)]
        since_days: i64,
        #[arg(long)]
        collector_id: Option<i64>,
    },
    /// Bulk-import report rows from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let database_url =
        std::env::var("DATABASE_URL").context("DATABASE_URL must be set to a Postgres instance")?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Report {
            user_id,
            collector_id,
            fault_type,
            issue_type,
            description,
            severity,
            delay_days,
            notes,
            stop_id,
            schedule_id,
        } => {
            let request = intake::normalize(RawReport {
                user_id,
                collector_id,
                fault_type,
                issue_type,
                issue_description: description,
                severity,
                estimated_delay_days: delay_days,
                additional_notes: notes,
                stop_id,
                schedule_id,
            })?;
            let outcome = db::report_missed_collection(&pool, &request).await?;

            println!("Missed collection {} recorded.", outcome.report.id);
            if let Some(task) = &outcome.catchup {
                println!(
                    "Catch-up task {} scheduled for {} ({} priority).",
                    task.id,
                    task.scheduled_date,
                    policy::priority_label(task.priority)
                );
            }

            if let Err(err) = notify_report(&pool, &outcome).await {
                warn!("report notifications skipped: {err:#}");
            }
        }
        Commands::Tasks { collector_id } => {
            let backlog = schedule::rank_backlog(
                db::fetch_backlog(&pool, collector_id).await?,
                schedule::today(),
            );
            if backlog.is_empty() {
                println!("No open catch-up tasks for collector {collector_id}.");
            } else {
                println!("Catch-up backlog for collector {collector_id}:");
                for entry in &backlog {
                    let due = if entry.is_overdue {
                        format!("overdue by {} days", -entry.days_until_due)
                    } else {
                        format!("due in {} days", entry.days_until_due)
                    };
                    println!(
                        "- [{}] {} {} ({}) {}, {}",
                        policy::priority_label(entry.task.priority),
                        entry.task.scheduled_date,
                        entry.resident_name,
                        entry.resident_address,
                        entry.task.issue_type.as_deref().unwrap_or("unspecified"),
                        due
                    );
                }
            }
        }
        Commands::Complete {
            task_id,
            collector_id,
            notes,
        } => {
            let completion =
                db::complete_task(&pool, task_id, collector_id, notes.as_deref()).await?;
            println!(
                "Catch-up task {} completed; report {} resolved.",
                completion.task_id, completion.missed_collection_id
            );

            let batch = notify::completion_notifications(&completion);
            notify::dispatch(&ConsoleSink, &batch).await;
        }
        Commands::Analytics {
            since_days,
            collector_id,
        } => {
            let today = schedule::today();
            let from_day = today - chrono::Duration::days(since_days.max(1));
            let from = from_day.and_time(chrono::NaiveTime::MIN).and_utc();
            let to = (today + chrono::Duration::days(1))
                .and_time(chrono::NaiveTime::MIN)
                .and_utc();
            let rows = db::fetch_report_stats(&pool, from, to, collector_id).await?;
            let summary = analytics::summarize(&rows);
            print!(
                "{}",
                analytics::render_summary(&summary, from_day, today, collector_id)
            );
        }
        Commands::Import { csv } => {
            let inserted = db::import_csv(&pool, &csv).await?;
            println!("Inserted {inserted} reports from {}.", csv.display());
        }
    }

    Ok(())
}

/// Post-commit fan-out for a recorded report. Failures here are logged by
/// the caller and never affect the committed state.
async fn notify_report(pool: &PgPool, outcome: &ReportOutcome) -> anyhow::Result<()> {
    let resident = db::fetch_resident_profile(pool, outcome.report.user_id).await?;
    let (admin_ids, snapshot) = if outcome.report.severity == "high" {
        (
            db::fetch_admin_ids(pool).await?,
            Some(db::daily_snapshot(pool, schedule::today()).await?),
        )
    } else {
        (Vec::new(), None)
    };

    let ctx = ReportContext {
        resident,
        admin_ids,
        snapshot,
    };
    let batch = notify::report_notifications(outcome, &ctx);
    notify::dispatch(&ConsoleSink, &batch).await;
    Ok(())
}
