use std::path::Path;

use anyhow::Context;
use sqlx::{PgPool, Row};
use tracing::info;
use uuid::Uuid;

use crate::db;
use crate::models::{ActionItem, ActionKind, DayRecord};

/// The fourteen prep days, day −14 through −1. Actions are introduced on
/// specific days and then carried forward: every later prep day repeats the
/// full accumulated list, which is the shape the prep gate expects.
pub fn prep_phase_days() -> Vec<DayRecord> {
    let mut accumulated: Vec<ActionItem> = Vec::new();
    let mut days = Vec::new();

    for day_number in -14..=-1 {
        let (title, description, mut introduced) = match day_number {
            -14 => (
                "Welcome & First Steps",
                "Your leadership journey begins. Complete these foundational tasks.",
                vec![
                    ActionItem::required_item(
                        "action-prep-video",
                        "Watch the QuickStart Prep Video",
                        ActionKind::Content,
                    ),
                    ActionItem::required_item(
                        "action-prep-workbook",
                        "Download the QuickStart Workbook",
                        ActionKind::Content,
                    ),
                ],
            ),
            -13 => (
                "Build Your Foundation",
                "Tell us who you are as a leader.",
                vec![
                    ActionItem::required_item(
                        "action-prep-profile",
                        "Complete Your Leader Profile",
                        ActionKind::WeeklyAction,
                    ),
                    ActionItem::required_item(
                        "action-prep-assessment",
                        "Complete the Baseline Assessment",
                        ActionKind::WeeklyAction,
                    ),
                ],
            ),
            -12 => (
                "Prepare for Session 1",
                "Start working through your prep exercises.",
                vec![ActionItem::required_item(
                    "action-prep-exercises",
                    "Work Through the Prep Exercises",
                    ActionKind::WeeklyAction,
                )],
            ),
            -10 => (
                "Midweek Check-in",
                "Review your progress so far.",
                vec![ActionItem::optional_item(
                    "action-prep-review",
                    "Review Your Assessment Results",
                    ActionKind::Task,
                )],
            ),
            -1 => (
                "Final Countdown",
                "Tomorrow the program begins. Wrap up anything outstanding.",
                Vec::new(),
            ),
            _ => (
                "Keep Preparing",
                "Continue working through your preparation materials.",
                Vec::new(),
            ),
        };

        accumulated.append(&mut introduced);
        let mut day = DayRecord::new(day_number, title, description);
        day.actions = accumulated.clone();
        days.push(day);
    }

    days
}

pub async fn populate_prep(pool: &PgPool, execute: bool) -> anyhow::Result<()> {
    let days = prep_phase_days();
    for day in &days {
        let required = day.actions.iter().filter(|action| action.required).count();
        if execute {
            db::upsert_plan_day(pool, day).await?;
            info!(day_number = day.day_number, required, "upserted prep day");
        } else {
            println!(
                "[dry-run] would upsert day {} ({}) with {} actions ({} required)",
                day.day_number,
                day.title,
                day.actions.len(),
                required
            );
        }
    }
    if execute {
        println!("Populated {} prep days.", days.len());
    } else {
        println!("Dry run only. Re-run with --execute to write.");
    }
    Ok(())
}

/// A test account is one whose email or name contains "test",
/// case-insensitive. Matches the historical cleanup tooling.
pub fn is_test_account(full_name: &str, email: &str) -> bool {
    full_name.to_lowercase().contains("test") || email.to_lowercase().contains("test")
}

pub async fn cleanup_test_users(pool: &PgPool, execute: bool) -> anyhow::Result<()> {
    let rows = sqlx::query("SELECT id, full_name, email FROM daily_access.users")
        .fetch_all(pool)
        .await?;

    let mut removed = 0usize;
    for row in rows {
        let id: Uuid = row.get("id");
        let full_name: String = row.get("full_name");
        let email: String = row.get("email");
        if !is_test_account(&full_name, &email) {
            continue;
        }

        if execute {
            // Progress rows go with the user via ON DELETE CASCADE.
            sqlx::query("DELETE FROM daily_access.users WHERE id = $1")
                .bind(id)
                .execute(pool)
                .await?;
            info!(%id, %email, "deleted test user");
        } else {
            println!("[dry-run] would delete {full_name} <{email}>");
        }
        removed += 1;
    }

    if execute {
        println!("Deleted {removed} test users.");
    } else {
        println!("{removed} test users matched. Re-run with --execute to delete.");
    }
    Ok(())
}

/// Application-data migration: the daily plan moves between environments as
/// a JSON file; user rows and progress documents never do.
pub async fn export_app_data(pool: &PgPool, out: &Path) -> anyhow::Result<()> {
    let plan = db::fetch_plan(pool).await?;
    let json = serde_json::to_string_pretty(&plan)?;
    std::fs::write(out, json)
        .with_context(|| format!("failed to write {}", out.display()))?;
    println!("Exported {} plan days to {}.", plan.len(), out.display());
    Ok(())
}

pub async fn import_app_data(pool: &PgPool, from: &Path, execute: bool) -> anyhow::Result<()> {
    let json = std::fs::read_to_string(from)
        .with_context(|| format!("failed to read {}", from.display()))?;
    let plan: Vec<DayRecord> =
        serde_json::from_str(&json).context("export file is not a daily plan")?;

    if !execute {
        println!(
            "[dry-run] would import {} plan days from {}. Re-run with --execute to write.",
            plan.len(),
            from.display()
        );
        return Ok(());
    }

    for day in &plan {
        db::upsert_plan_day(pool, day).await?;
    }
    println!("Imported {} plan days from {}.", plan.len(), from.display());
    Ok(())
}
