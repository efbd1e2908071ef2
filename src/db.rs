use anyhow::Context;
use chrono::NaiveDate;
use sqlx::{PgPool, Row};
use tracing::warn;
use uuid::Uuid;

use crate::models::{Cohort, DayProgress, DayRecord, DayStatus, ProgressDoc, RawRef, UserRecord};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn fetch_plan(pool: &PgPool) -> anyhow::Result<Vec<DayRecord>> {
    let rows = sqlx::query("SELECT day_number, doc FROM daily_access.daily_plan ORDER BY day_number")
        .fetch_all(pool)
        .await?;

    let mut days = Vec::new();
    for row in rows {
        let day_number: i32 = row.get("day_number");
        let doc: serde_json::Value = row.get("doc");
        match serde_json::from_value::<DayRecord>(doc) {
            Ok(day) => days.push(day),
            // A single malformed day must not take the whole plan down.
            Err(err) => warn!(day_number, %err, "skipping malformed day record"),
        }
    }
    Ok(days)
}

pub async fn upsert_plan_day(pool: &PgPool, day: &DayRecord) -> anyhow::Result<()> {
    let doc = serde_json::to_value(day).context("failed to serialize day record")?;
    sqlx::query(
        r#"
        INSERT INTO daily_access.daily_plan (day_number, doc)
        VALUES ($1, $2)
        ON CONFLICT (day_number) DO UPDATE SET doc = EXCLUDED.doc
        "#,
    )
    .bind(day.day_number)
    .bind(doc)
    .execute(pool)
    .await?;
    Ok(())
}

fn user_from_row(row: &sqlx::postgres::PgRow) -> UserRecord {
    UserRecord {
        id: row.get("id"),
        full_name: row.get("full_name"),
        email: row.get("email"),
        profile_complete: row.get("profile_complete"),
        cohort_id: row.get("cohort_id"),
    }
}

pub async fn fetch_user_by_email(pool: &PgPool, email: &str) -> anyhow::Result<Option<UserRecord>> {
    let row = sqlx::query(
        "SELECT id, full_name, email, profile_complete, cohort_id \
         FROM daily_access.users WHERE lower(email) = lower($1)",
    )
    .bind(email)
    .fetch_optional(pool)
    .await?;
    Ok(row.as_ref().map(user_from_row))
}

pub async fn fetch_cohort(pool: &PgPool, cohort_id: Uuid) -> anyhow::Result<Option<Cohort>> {
    let row = sqlx::query(
        "SELECT id, name, start_date, timezone FROM daily_access.cohorts WHERE id = $1",
    )
    .bind(cohort_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|row| Cohort {
        id: row.get("id"),
        name: row.get("name"),
        start_date: row.get("start_date"),
        timezone: row.get("timezone"),
    }))
}

/// Reads the progress document. A missing row or an unreadable document
/// degrades to the default (empty) document rather than failing the caller.
pub async fn fetch_progress(pool: &PgPool, user_id: Uuid) -> anyhow::Result<ProgressDoc> {
    let row = sqlx::query("SELECT doc FROM daily_access.user_progress WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

    let Some(row) = row else {
        return Ok(ProgressDoc::default());
    };
    let doc: serde_json::Value = row.get("doc");
    Ok(serde_json::from_value(doc).unwrap_or_else(|err| {
        warn!(%user_id, %err, "unreadable progress document, using defaults");
        ProgressDoc::default()
    }))
}

async fn ensure_progress_row(pool: &PgPool, user_id: Uuid) -> anyhow::Result<()> {
    sqlx::query(
        "INSERT INTO daily_access.user_progress (user_id, doc) VALUES ($1, '{}'::jsonb) \
         ON CONFLICT (user_id) DO NOTHING",
    )
    .bind(user_id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Auto-initialization: stamps a start date only when the document has none,
/// so an already-started account is never rewound.
pub async fn ensure_start_date(pool: &PgPool, user_id: Uuid, date: NaiveDate) -> anyhow::Result<()> {
    ensure_progress_row(pool, user_id).await?;
    sqlx::query(
        "UPDATE daily_access.user_progress \
         SET doc = jsonb_set(doc, '{startDate}', $2, true), updated_at = now() \
         WHERE user_id = $1 AND doc->'startDate' IS NULL",
    )
    .bind(user_id)
    .bind(serde_json::Value::String(date.to_string()))
    .execute(pool)
    .await?;
    Ok(())
}

async fn write_day_progress(
    pool: &PgPool,
    user_id: Uuid,
    day_id: &str,
    entry: &DayProgress,
) -> anyhow::Result<()> {
    let doc = serde_json::to_value(entry).context("failed to serialize day progress")?;
    // jsonb_set does not create intermediate keys, so the dailyProgress
    // object has to be materialized before the per-day entry is written.
    sqlx::query(
        "UPDATE daily_access.user_progress \
         SET doc = jsonb_set( \
                 jsonb_set(doc, '{dailyProgress}', COALESCE(doc->'dailyProgress', '{}'::jsonb), true), \
                 ARRAY['dailyProgress', $2], $3, true), \
             updated_at = now() \
         WHERE user_id = $1",
    )
    .bind(user_id)
    .bind(day_id)
    .bind(doc)
    .execute(pool)
    .await?;
    Ok(())
}

/// Merge-writes one day's item completion. Only the touched day entry is
/// replaced; the rest of the document is left as-is (last write wins across
/// devices, no conflict detection).
pub async fn set_item_completed(
    pool: &PgPool,
    user_id: Uuid,
    day_id: &str,
    item_id: &str,
    complete: bool,
    now_label: &str,
) -> anyhow::Result<()> {
    ensure_progress_row(pool, user_id).await?;
    let progress = fetch_progress(pool, user_id).await?;
    let mut entry = progress
        .daily_progress
        .get(day_id)
        .cloned()
        .unwrap_or_default();

    if complete {
        if !entry.items_completed.iter().any(|done| done == item_id) {
            entry.items_completed.push(item_id.to_string());
        }
    } else {
        entry.items_completed.retain(|done| done != item_id);
    }
    entry.last_updated = Some(now_label.to_string());

    write_day_progress(pool, user_id, day_id, &entry).await
}

pub async fn mark_day_completed(
    pool: &PgPool,
    user_id: Uuid,
    day_id: &str,
    now_label: &str,
) -> anyhow::Result<()> {
    ensure_progress_row(pool, user_id).await?;
    let progress = fetch_progress(pool, user_id).await?;
    let mut entry = progress
        .daily_progress
        .get(day_id)
        .cloned()
        .unwrap_or_default();
    entry.status = DayStatus::Completed;
    entry.completed_at = Some(now_label.to_string());

    write_day_progress(pool, user_id, day_id, &entry).await
}

/// Appends today's date to the prep visit log, once per calendar date.
pub async fn record_prep_visit(pool: &PgPool, user_id: Uuid, date: NaiveDate) -> anyhow::Result<()> {
    ensure_progress_row(pool, user_id).await?;
    let progress = fetch_progress(pool, user_id).await?;
    let stamp = date.to_string();
    if progress.prep_visit_log.iter().any(|entry| entry == &stamp) {
        return Ok(());
    }
    let mut log = progress.prep_visit_log;
    log.push(stamp);
    sqlx::query(
        "UPDATE daily_access.user_progress \
         SET doc = jsonb_set(doc, '{prepVisitLog}', $2, true), updated_at = now() \
         WHERE user_id = $1",
    )
    .bind(user_id)
    .bind(serde_json::to_value(log)?)
    .execute(pool)
    .await?;
    Ok(())
}

/// Trips the one-way prep latch. The guard on the existing value makes this
/// idempotent and means the latch can never move backward.
pub async fn latch_prep_complete(
    pool: &PgPool,
    user_id: Uuid,
    now_label: &str,
) -> anyhow::Result<()> {
    ensure_progress_row(pool, user_id).await?;
    sqlx::query(
        "UPDATE daily_access.user_progress \
         SET doc = jsonb_set(doc, '{prepCompletedAt}', $2, true), updated_at = now() \
         WHERE user_id = $1 AND doc->'prepCompletedAt' IS NULL",
    )
    .bind(user_id)
    .bind(serde_json::Value::String(now_label.to_string()))
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn import_plan_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        day_number: i32,
        title: String,
        #[serde(default)]
        description: String,
        #[serde(default)]
        content: String,
        #[serde(default)]
        community: String,
        #[serde(default)]
        coaching: String,
        #[serde(default)]
        reps: String,
    }

    fn split_refs(cell: &str) -> Vec<RawRef> {
        cell.split('|')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(RawRef::by_id)
            .collect()
    }

    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut imported = 0usize;

    for result in reader.deserialize::<CsvRow>() {
        let row = result?;
        let mut day = DayRecord::new(row.day_number, &row.title, &row.description);
        day.content = split_refs(&row.content);
        day.community = split_refs(&row.community);
        day.coaching = split_refs(&row.coaching);
        day.reps = split_refs(&row.reps);

        upsert_plan_day(pool, &day).await?;
        imported += 1;
    }

    Ok(imported)
}

pub async fn upsert_cohort(pool: &PgPool, cohort: &Cohort) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO daily_access.cohorts (id, name, start_date, timezone)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (name) DO UPDATE
        SET start_date = EXCLUDED.start_date, timezone = EXCLUDED.timezone
        "#,
    )
    .bind(cohort.id)
    .bind(&cohort.name)
    .bind(cohort.start_date)
    .bind(&cohort.timezone)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn upsert_user(
    pool: &PgPool,
    full_name: &str,
    email: &str,
    cohort_id: Option<Uuid>,
) -> anyhow::Result<Uuid> {
    let id: Uuid = sqlx::query(
        r#"
        INSERT INTO daily_access.users (id, full_name, email, profile_complete, cohort_id)
        VALUES ($1, $2, $3, FALSE, $4)
        ON CONFLICT (email) DO UPDATE
        SET full_name = EXCLUDED.full_name, cohort_id = EXCLUDED.cohort_id
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(full_name)
    .bind(email)
    .bind(cohort_id)
    .fetch_one(pool)
    .await?
    .get("id");
    Ok(id)
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let cohort = Cohort {
        id: Uuid::parse_str("7c3f2a1e-5b94-4f5e-9d27-61c8a0f4b6d3")?,
        name: "Quickstart Spring 2026".to_string(),
        start_date: NaiveDate::from_ymd_opt(2026, 3, 2).context("invalid date")?,
        timezone: "America/New_York".to_string(),
    };
    upsert_cohort(pool, &cohort).await?;

    let members = [
        ("Avery Lee", "avery.lee@leaderreps.com"),
        ("Jules Moreno", "jules.moreno@leaderreps.com"),
        ("Taylor Test", "taylor.test@leaderreps.com"),
    ];
    for (name, email) in members {
        upsert_user(pool, name, email, Some(cohort.id)).await?;
    }

    for day in crate::maint::prep_phase_days() {
        upsert_plan_day(pool, &day).await?;
    }

    let mut day1 = DayRecord::new(1, "Day One", "The program starts here.");
    day1.content = vec![RawRef::by_id("vid-session-1")];
    let mut day5 = DayRecord::new(5, "Momentum", "Keep the streak going.");
    day5.content = vec![RawRef {
        content_id: Some("vid-9".to_string()),
        ..RawRef::default()
    }];
    day5.reps = vec![RawRef {
        rep_id: Some("rep-breathing".to_string()),
        ..RawRef::default()
    }];
    let mut day15 = DayRecord::new(15, "Community Opens", "Meet your peers.");
    day15.community = vec![RawRef {
        community_item_id: Some("circle-1".to_string()),
        ..RawRef::default()
    }];
    let mut day22 = DayRecord::new(22, "Coaching Opens", "Coaching zone unlocks today.");
    day22.coaching = vec![RawRef {
        coaching_item_id: Some("coach-intro".to_string()),
        ..RawRef::default()
    }];
    let mut day23 = DayRecord::new(23, "Book Your 1:1", "The 1:1 scheduling window opens.");
    day23.coaching = vec![RawRef {
        coaching_item_id: Some("coach-1on1".to_string()),
        ..RawRef::default()
    }];
    day23.dashboard.show_notifications = true;

    for day in [&day1, &day5, &day15, &day22, &day23] {
        upsert_plan_day(pool, day).await?;
    }

    Ok(())
}
