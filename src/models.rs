use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One day of the daily plan. Negative day numbers are prep days,
/// non-negative day numbers are program days (day 0 = cohort start).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayRecord {
    #[serde(default)]
    pub id: String,
    pub day_number: i32,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub content: Vec<RawRef>,
    #[serde(default)]
    pub community: Vec<RawRef>,
    #[serde(default)]
    pub coaching: Vec<RawRef>,
    #[serde(default)]
    pub reps: Vec<RawRef>,
    #[serde(default)]
    pub actions: Vec<ActionItem>,
    #[serde(default)]
    pub dashboard: DashboardFlags,
}

impl DayRecord {
    pub fn new(day_number: i32, title: &str, description: &str) -> Self {
        Self {
            id: day_doc_id(day_number),
            day_number,
            title: title.to_string(),
            description: description.to_string(),
            content: Vec::new(),
            community: Vec::new(),
            coaching: Vec::new(),
            reps: Vec::new(),
            actions: Vec::new(),
            dashboard: DashboardFlags::default(),
        }
    }
}

/// Historical document ids: "day-005" for program days, "day-prep-05" for prep days.
pub fn day_doc_id(day_number: i32) -> String {
    if day_number < 0 {
        format!("day-prep-{:02}", -day_number)
    } else {
        format!("day-{:03}", day_number)
    }
}

/// An item reference as it appears in historical plan documents. Different
/// admin eras used different field names, so any subset may be present and
/// a single item can carry several aliases at once.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub community_item_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coaching_item_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rep_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl RawRef {
    pub fn by_id(id: &str) -> Self {
        Self {
            id: Some(id.to_string()),
            ..Self::default()
        }
    }

    /// Every present alias, normalized to lowercase. Identifier comparisons
    /// are case-insensitive because historical data mixes casing.
    pub fn identifier_keys(&self) -> Vec<String> {
        [
            &self.id,
            &self.content_id,
            &self.community_item_id,
            &self.coaching_item_id,
            &self.rep_id,
            &self.title,
        ]
        .into_iter()
        .flatten()
        .map(|value| value.trim().to_lowercase())
        .filter(|value| !value.is_empty())
        .collect()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Onboarding,
    Content,
    WeeklyAction,
    #[default]
    Task,
    #[serde(other)]
    Unknown,
}

/// A checklist action declared on a prep day. Required items feed the prep
/// gate; the same items are duplicated into every prep day record
/// (cumulative model), so consumers dedupe by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionItem {
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default, rename = "type")]
    pub kind: ActionKind,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub optional: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl ActionItem {
    pub fn required_item(id: &str, label: &str, kind: ActionKind) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            kind,
            required: true,
            optional: false,
            estimated_minutes: None,
            priority: None,
            enabled: true,
        }
    }

    pub fn optional_item(id: &str, label: &str, kind: ActionKind) -> Self {
        Self {
            required: false,
            optional: true,
            ..Self::required_item(id, label, kind)
        }
    }
}

fn default_true() -> bool {
    true
}

/// Dashboard widget visibility for one day. Absent fields fall back to the
/// designer defaults so partially-configured admin data stays usable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DashboardFlags {
    pub show_weekly_focus: bool,
    pub show_lis_builder: bool,
    pub show_grounding_rep: bool,
    pub show_win_the_day: bool,
    pub show_daily_reps: bool,
    pub show_notifications: bool,
    pub show_pm_reflection: bool,
}

impl Default for DashboardFlags {
    fn default() -> Self {
        Self {
            show_weekly_focus: true,
            show_lis_builder: false,
            show_grounding_rep: false,
            show_win_the_day: true,
            show_daily_reps: true,
            show_notifications: false,
            show_pm_reflection: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub profile_complete: bool,
    pub cohort_id: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub struct Cohort {
    pub id: Uuid,
    pub name: String,
    pub start_date: NaiveDate,
    pub timezone: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DayStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DayProgress {
    pub status: DayStatus,
    pub items_completed: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
}

impl DayProgress {
    pub fn is_completed(&self) -> bool {
        self.status == DayStatus::Completed
    }
}

/// The per-user progress document. Stored as one JSON document and updated
/// with partial merges only; every field tolerates absence.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProgressDoc {
    /// Loose historical shapes: `{"seconds": n}`, RFC 3339, `YYYY-MM-DD`,
    /// or epoch milliseconds. Parsed once by the day resolver.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manual_day_index: Option<i32>,
    pub focus_areas: Vec<String>,
    pub video_watched: bool,
    pub workbook_downloaded: bool,
    pub exercises_complete: bool,
    pub prep_visit_log: Vec<String>,
    /// One-way prep latch: set once the gate is first observed complete,
    /// never cleared by this engine.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prep_completed_at: Option<String>,
    pub daily_progress: BTreeMap<String, DayProgress>,
    /// Legacy week-based progress, kept opaque for migration tooling.
    pub week_progress: BTreeMap<String, serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}
