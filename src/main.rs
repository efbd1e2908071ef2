use std::path::PathBuf;

use anyhow::Context;
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use clap::{ArgGroup, Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{error, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

mod access;
mod day;
mod db;
mod maint;
mod models;
mod prep;
mod report;
mod unlock;
mod zones;

use day::Phase;
use models::{Cohort, DayRecord, ProgressDoc, UserRecord};

#[derive(Parser)]
#[command(name = "daily-access")]
#[command(about = "Day-based access control engine for the LeaderReps program", long_about = None)]
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
    /// Import daily plan days from a CSV file
    ImportPlan {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Show a user's access snapshot
    Status {
        #[arg(long)]
        email: String,
        /// Evaluate as of this date instead of today (schedule testing)
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },
    /// Generate a markdown access report for a user
    Report {
        #[arg(long)]
        email: String,
        #[arg(long)]
        as_of: Option<NaiveDate>,
        #[arg(long, default_value = "access-report.md")]
        out: PathBuf,
    },
    /// Mark a checklist item complete (or undo it)
    CompleteItem {
        #[arg(long)]
        email: String,
        #[arg(long, allow_hyphen_values = true)]
        day: i32,
        #[arg(long)]
        item: String,
        #[arg(long)]
        undo: bool,
    },
    /// Mark a whole day complete
    CompleteDay {
        #[arg(long)]
        email: String,
        #[arg(long, allow_hyphen_values = true)]
        day: i32,
    },
    /// Write the fourteen prep-phase day records
    PopulatePrep {
        #[arg(long)]
        execute: bool,
    },
    /// Delete accounts whose name or email contains "test"
    CleanupTestUsers {
        #[arg(long)]
        execute: bool,
    },
    /// Move application data (the daily plan) between environments
    #[command(group(
        ArgGroup::new("mode")
            .args(["export", "import"])
            .required(true)
            .multiple(false)
    ))]
    MigrateAppData {
        #[arg(long, value_name = "FILE")]
        export: Option<PathBuf>,
        #[arg(long, value_name = "FILE")]
        import: Option<PathBuf>,
        #[arg(long)]
        execute: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let cli = Cli::parse();
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a Postgres instance")?;

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
        Commands::ImportPlan { csv } => {
            let imported = db::import_plan_csv(&pool, &csv).await?;
            println!("Imported {imported} plan days from {}.", csv.display());
        }
        Commands::Status { email, as_of } => {
            let (user, progress, plan, cohort) = load_snapshot_inputs(&pool, &email).await?;
            let tz = cohort
                .as_ref()
                .map(|record| day::cohort_timezone(&record.timezone))
                .unwrap_or(chrono_tz::UTC);
            let now = resolve_now(as_of, tz);
            let progress = auto_initialize(&pool, &user, &cohort, progress, now, tz).await;

            let snapshot = access::build_snapshot(&plan, &user, &progress, cohort.as_ref(), now);
            sync_progress_marks(&pool, &user, &progress, &snapshot, now, tz).await;
            print_status(&user, &cohort, &snapshot);
        }
        Commands::Report { email, as_of, out } => {
            let (user, progress, plan, cohort) = load_snapshot_inputs(&pool, &email).await?;
            let tz = cohort
                .as_ref()
                .map(|record| day::cohort_timezone(&record.timezone))
                .unwrap_or(chrono_tz::UTC);
            let now = resolve_now(as_of, tz);

            let snapshot = access::build_snapshot(&plan, &user, &progress, cohort.as_ref(), now);
            let report = report::build_report(&user, &snapshot, now.with_timezone(&tz).date_naive());
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
        Commands::CompleteItem {
            email,
            day,
            item,
            undo,
        } => {
            let user = db::fetch_user_by_email(&pool, &email)
                .await?
                .with_context(|| format!("no user with email {email}"))?;
            let day_id = models::day_doc_id(day);
            db::set_item_completed(&pool, user.id, &day_id, &item, !undo, &Utc::now().to_rfc3339())
                .await?;
            if undo {
                println!("Unmarked {item} on day {day}.");
            } else {
                println!("Marked {item} complete on day {day}.");
            }
        }
        Commands::CompleteDay { email, day } => {
            let user = db::fetch_user_by_email(&pool, &email)
                .await?
                .with_context(|| format!("no user with email {email}"))?;
            let day_id = models::day_doc_id(day);
            db::mark_day_completed(&pool, user.id, &day_id, &Utc::now().to_rfc3339()).await?;
            println!("Day {day} marked complete.");
        }
        Commands::PopulatePrep { execute } => {
            maint::populate_prep(&pool, execute).await?;
        }
        Commands::CleanupTestUsers { execute } => {
            maint::cleanup_test_users(&pool, execute).await?;
        }
        Commands::MigrateAppData {
            export,
            import,
            execute,
        } => {
            if let Some(out) = export {
                maint::export_app_data(&pool, &out).await?;
            } else if let Some(from) = import {
                maint::import_app_data(&pool, &from, execute).await?;
            }
        }
    }

    Ok(())
}

/// Loads everything a snapshot needs. The user must exist; plan, cohort, and
/// progress reads degrade to empty defaults so a partial outage shows an
/// empty dashboard instead of an error.
async fn load_snapshot_inputs(
    pool: &PgPool,
    email: &str,
) -> anyhow::Result<(UserRecord, ProgressDoc, Vec<DayRecord>, Option<Cohort>)> {
    let user = db::fetch_user_by_email(pool, email)
        .await?
        .with_context(|| format!("no user with email {email}"))?;

    let progress = match db::fetch_progress(pool, user.id).await {
        Ok(progress) => progress,
        Err(err) => {
            warn!(%err, "failed to load progress, using defaults");
            ProgressDoc::default()
        }
    };

    let plan = match db::fetch_plan(pool).await {
        Ok(plan) => plan,
        Err(err) => {
            warn!(%err, "failed to load daily plan, treating as empty");
            Vec::new()
        }
    };

    let cohort = match user.cohort_id {
        Some(cohort_id) => match db::fetch_cohort(pool, cohort_id).await {
            Ok(cohort) => cohort,
            Err(err) => {
                warn!(%err, "failed to load cohort, using user start date");
                None
            }
        },
        None => None,
    };

    Ok((user, progress, plan, cohort))
}

fn resolve_now(as_of: Option<NaiveDate>, tz: Tz) -> DateTime<Utc> {
    match as_of {
        Some(date) => {
            // Noon keeps the override clear of midnight DST transitions.
            let noon = NaiveTime::from_hms_opt(12, 0, 0).unwrap_or(NaiveTime::MIN);
            tz.from_local_datetime(&date.and_time(noon))
                .earliest()
                .map(|instant| instant.with_timezone(&Utc))
                .unwrap_or_else(Utc::now)
        }
        None => Utc::now(),
    }
}

/// First-load start-date stamping for accounts outside a cohort. The write
/// is optimistic: on failure the attempted value is still used locally and
/// the user retries on the next run.
async fn auto_initialize(
    pool: &PgPool,
    user: &UserRecord,
    cohort: &Option<Cohort>,
    mut progress: ProgressDoc,
    now: DateTime<Utc>,
    tz: Tz,
) -> ProgressDoc {
    if cohort.is_some() || progress.start_date.is_some() {
        return progress;
    }
    let today = now.with_timezone(&tz).date_naive();
    if let Err(err) = db::ensure_start_date(pool, user.id, today).await {
        error!(%err, "failed to auto-initialize start date");
    }
    progress.start_date = Some(serde_json::Value::String(today.to_string()));
    progress
}

/// Post-evaluation bookkeeping: prep visits are logged while the user is in
/// the prep phase, and the one-way latch is persisted the first time the
/// gate is observed complete. Both writes are fire-and-forget.
async fn sync_progress_marks(
    pool: &PgPool,
    user: &UserRecord,
    progress: &ProgressDoc,
    snapshot: &access::AccessSnapshot<'_>,
    now: DateTime<Utc>,
    tz: Tz,
) {
    if snapshot.effective_day.phase() == Phase::Prep {
        let today = now.with_timezone(&tz).date_naive();
        if let Err(err) = db::record_prep_visit(pool, user.id, today).await {
            error!(%err, "failed to record prep visit");
        }
    }
    if snapshot.prep_status.is_complete && progress.prep_completed_at.is_none() {
        if let Err(err) = db::latch_prep_complete(pool, user.id, &now.to_rfc3339()).await {
            error!(%err, "failed to persist prep latch");
        }
    }
}

fn print_status(user: &UserRecord, cohort: &Option<Cohort>, snapshot: &access::AccessSnapshot<'_>) {
    println!("{} ({})", user.full_name, user.email);
    let phase = match snapshot.effective_day.phase() {
        Phase::Prep => "Prep",
        Phase::Program => "Program",
    };
    match cohort {
        Some(cohort) => println!(
            "Phase: {phase}, day {} (cohort {})",
            snapshot.effective_day.day_number(),
            cohort.name
        ),
        None => println!("Phase: {phase}, day {}", snapshot.effective_day.day_number()),
    }

    let prep = &snapshot.prep_status;
    if snapshot.prep_complete {
        println!("Prep gate: passed ({}/{})", prep.completed_count, prep.total_count);
    } else {
        println!(
            "Prep gate: {}/{} complete, missing: {}",
            prep.completed_count,
            prep.total_count,
            prep.missing_items.join(", ")
        );
    }

    let zones = &snapshot.zones;
    println!(
        "Zones: community {}, coaching {}, 1:1 window {}",
        if zones.is_community_zone_open { "open" } else { "locked" },
        if zones.is_coaching_zone_open { "open" } else { "locked" },
        if zones.is_coaching_1on1_window { "open" } else { "closed" },
    );

    let unlocks = &snapshot.unlocks;
    println!(
        "Unlocked: {} days, {} content, {} community, {} coaching, {} reps",
        unlocks.unlocked_days.len(),
        unlocks.content.len(),
        unlocks.community.len(),
        unlocks.coaching.len(),
        unlocks.reps.len()
    );

    if let Some(day) = snapshot.current_day {
        if !day.title.is_empty() {
            println!("Today: {}", day.title);
        }
    }
    if !snapshot.missed_days.is_empty() {
        println!("Missed days: {}", snapshot.missed_days.len());
    }
}
