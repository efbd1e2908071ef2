use std::collections::HashSet;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::day::{self, EffectiveDay};
use crate::models::{ActionItem, Cohort, DayProgress, DayRecord, ProgressDoc, UserRecord};
use crate::prep::{self, PrepStatus};
use crate::unlock::{self, UnlockSets};
use crate::zones::{self, ZoneVisibility};

/// Everything the dashboard needs to know about one user at one instant.
#[derive(Debug, Clone)]
pub struct AccessSnapshot<'a> {
    pub prep_status: PrepStatus,
    /// Live prep status OR the persisted latch; unlock decisions use this,
    /// so un-marking a requirement never re-locks unlocked days.
    pub prep_complete: bool,
    pub effective_day: EffectiveDay,
    pub unlocks: UnlockSets<'a>,
    pub zones: ZoneVisibility,
    pub current_day: Option<&'a DayRecord>,
    pub current_day_progress: DayProgress,
    pub missed_days: Vec<&'a DayRecord>,
}

/// Required prep items, in declaration order across the prep days. The plan
/// duplicates the same items into every prep day record, so the first
/// occurrence of each id wins.
pub fn required_prep_items(plan: &[DayRecord]) -> Vec<&ActionItem> {
    let mut prep_days: Vec<&DayRecord> = plan.iter().filter(|day| day.day_number < 0).collect();
    prep_days.sort_by_key(|day| day.day_number);

    let mut seen = HashSet::new();
    let mut items = Vec::new();
    for day in prep_days {
        for action in &day.actions {
            if action.required && action.enabled && seen.insert(action.id.as_str()) {
                items.push(action);
            }
        }
    }
    items
}

fn effective_timezone(cohort: Option<&Cohort>) -> Tz {
    cohort
        .map(|record| day::cohort_timezone(&record.timezone))
        .unwrap_or(chrono_tz::UTC)
}

/// Assembles the full access snapshot from plain records. Pure with respect
/// to its inputs; the store is never touched here.
pub fn build_snapshot<'a>(
    plan: &'a [DayRecord],
    user: &UserRecord,
    progress: &ProgressDoc,
    cohort: Option<&Cohort>,
    now: DateTime<Utc>,
) -> AccessSnapshot<'a> {
    let required = required_prep_items(plan);
    let prep_status = prep::evaluate_prep_gate(&required, user, progress);
    let prep_complete = prep_status.is_complete || progress.prep_completed_at.is_some();

    let tz = effective_timezone(cohort);
    let start_date = cohort.map(|record| record.start_date).or_else(|| {
        progress
            .start_date
            .as_ref()
            .and_then(|raw| day::parse_start_date(raw, tz))
    });
    let raw_day = start_date.map(|start| day::raw_day_number(now, start, tz));
    let manual_fallback = progress.manual_day_index.unwrap_or(0);
    let effective_day = day::resolve_effective_day(raw_day, manual_fallback, prep_complete);

    let unlocks = unlock::aggregate_unlocks(plan, effective_day, prep_complete);
    let current_day = plan
        .iter()
        .find(|day| day.day_number == effective_day.day_number());
    let current_day_progress = current_day
        .and_then(|day| progress.daily_progress.get(&day.id).cloned())
        .unwrap_or_default();

    let mut missed_days: Vec<&DayRecord> = plan
        .iter()
        .filter(|day| day.day_number < effective_day.day_number())
        .filter(|day| {
            progress
                .daily_progress
                .get(&day.id)
                .map_or(true, |entry| !entry.is_completed())
        })
        .collect();
    missed_days.sort_by_key(|day| day.day_number);

    let zones = zones::derive_zone_visibility(current_day, effective_day);

    AccessSnapshot {
        prep_status,
        prep_complete,
        effective_day,
        unlocks,
        zones,
        current_day,
        current_day_progress,
        missed_days,
    }
}

impl AccessSnapshot<'_> {
    pub fn is_content_unlocked(&self, id: &str) -> bool {
        self.unlocks.is_content_unlocked(id)
    }

    /// Community items require the zone to be open first; inside an open
    /// zone an absent item id is allowed.
    pub fn is_community_unlocked(&self, id: &str) -> bool {
        if !self.zones.is_community_zone_open {
            return false;
        }
        if id.trim().is_empty() {
            return true;
        }
        self.unlocks.is_community_unlocked(id)
    }

    pub fn is_coaching_unlocked(&self, id: &str) -> bool {
        if !self.zones.is_coaching_zone_open {
            return false;
        }
        if id.trim().is_empty() {
            return true;
        }
        self.unlocks.is_coaching_unlocked(id)
    }

    pub fn is_rep_unlocked(&self, id: &str) -> bool {
        self.unlocks.is_rep_unlocked(id)
    }

    pub fn is_day_unlocked(&self, day_number: i32) -> bool {
        if day_number < 0 {
            return true;
        }
        if !self.prep_complete {
            return false;
        }
        day_number <= self.effective_day.day_number()
    }
}
