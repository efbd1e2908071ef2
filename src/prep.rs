use crate::models::{ActionItem, ProgressDoc, UserRecord};

/// Derived prep-gate state. Recomputed on every evaluation, never persisted;
/// the persisted latch lives on the progress document instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrepStatus {
    pub has_leader_profile: bool,
    pub has_baseline_assessment: bool,
    pub has_video: bool,
    pub has_workbook: bool,
    pub has_exercises: bool,
    pub is_complete: bool,
    pub completed_count: usize,
    pub total_count: usize,
    pub missing_items: Vec<String>,
}

/// Semantic role of a required prep item, recognized from its id and label.
/// Admin-authored items outside the known roles gate on their own explicit
/// completion mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Requirement {
    LeaderProfile,
    BaselineAssessment,
    PrepVideo,
    Workbook,
    PrepExercises,
    Custom,
}

fn classify(item: &ActionItem) -> Requirement {
    let key = format!("{} {}", item.id, item.label).to_lowercase();
    if key.contains("profile") {
        Requirement::LeaderProfile
    } else if key.contains("assessment") {
        Requirement::BaselineAssessment
    } else if key.contains("video") {
        Requirement::PrepVideo
    } else if key.contains("workbook") {
        Requirement::Workbook
    } else if key.contains("exercise") {
        Requirement::PrepExercises
    } else {
        Requirement::Custom
    }
}

fn item_marked_complete(progress: &ProgressDoc, item_id: &str) -> bool {
    progress
        .daily_progress
        .values()
        .any(|day| day.items_completed.iter().any(|done| done == item_id))
}

/// Evaluates the prep gate against the declared required items.
///
/// Every predicate treats missing data as "not complete". With no usable
/// required-item list (accounts that predate the dynamic prep model) the
/// legacy fallback checks exactly leader profile and baseline assessment.
pub fn evaluate_prep_gate(
    required_items: &[&ActionItem],
    user: &UserRecord,
    progress: &ProgressDoc,
) -> PrepStatus {
    let has_leader_profile = user.profile_complete || !user.full_name.trim().is_empty();
    let has_baseline_assessment = !progress.focus_areas.is_empty();
    let has_video = progress.video_watched;
    let has_workbook = progress.workbook_downloaded;
    let has_exercises = progress.exercises_complete;

    let checks: Vec<(bool, String)> = if required_items.is_empty() {
        vec![
            (has_leader_profile, "Leader Profile".to_string()),
            (has_baseline_assessment, "Baseline Assessment".to_string()),
        ]
    } else {
        required_items
            .iter()
            .map(|item| {
                let satisfied = match classify(item) {
                    Requirement::LeaderProfile => has_leader_profile,
                    Requirement::BaselineAssessment => has_baseline_assessment,
                    Requirement::PrepVideo => has_video,
                    Requirement::Workbook => has_workbook,
                    Requirement::PrepExercises => has_exercises,
                    Requirement::Custom => item_marked_complete(progress, &item.id),
                };
                let label = if item.label.is_empty() {
                    item.id.clone()
                } else {
                    item.label.clone()
                };
                (satisfied, label)
            })
            .collect()
    };

    let total_count = checks.len();
    let completed_count = checks.iter().filter(|(satisfied, _)| *satisfied).count();
    let missing_items = checks
        .into_iter()
        .filter(|(satisfied, _)| !satisfied)
        .map(|(_, label)| label)
        .collect();

    PrepStatus {
        has_leader_profile,
        has_baseline_assessment,
        has_video,
        has_workbook,
        has_exercises,
        is_complete: completed_count == total_count,
        completed_count,
        total_count,
        missing_items,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ActionKind;
    use uuid::Uuid;

    fn sample_user(name: &str, profile_complete: bool) -> UserRecord {
        UserRecord {
            id: Uuid::new_v4(),
            full_name: name.to_string(),
            email: "avery@example.com".to_string(),
            profile_complete,
            cohort_id: None,
        }
    }

    fn five_required_items() -> Vec<ActionItem> {
        vec![
            ActionItem::required_item("action-prep-video", "Watch the Prep Video", ActionKind::Content),
            ActionItem::required_item("action-prep-workbook", "Download the Workbook", ActionKind::Content),
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
            ActionItem::required_item(
                "action-prep-exercises",
                "Work Through the Prep Exercises",
                ActionKind::WeeklyAction,
            ),
        ]
    }

    #[test]
    fn all_items_incomplete_reports_every_label_in_order() {
        let items = five_required_items();
        let refs: Vec<&ActionItem> = items.iter().collect();
        let status = evaluate_prep_gate(&refs, &sample_user("", false), &ProgressDoc::default());

        assert!(!status.is_complete);
        assert_eq!(status.completed_count, 0);
        assert_eq!(status.total_count, 5);
        assert_eq!(
            status.missing_items,
            vec![
                "Watch the Prep Video",
                "Download the Workbook",
                "Complete Your Leader Profile",
                "Complete the Baseline Assessment",
                "Work Through the Prep Exercises",
            ]
        );
    }

    #[test]
    fn all_items_complete_closes_the_gate() {
        let items = five_required_items();
        let refs: Vec<&ActionItem> = items.iter().collect();
        let progress = ProgressDoc {
            focus_areas: vec!["delegation".to_string()],
            video_watched: true,
            workbook_downloaded: true,
            exercises_complete: true,
            ..ProgressDoc::default()
        };
        let status = evaluate_prep_gate(&refs, &sample_user("Avery Lee", false), &progress);

        assert!(status.is_complete);
        assert_eq!(status.completed_count, 5);
        assert!(status.missing_items.is_empty());
    }

    #[test]
    fn legacy_fallback_checks_exactly_profile_and_assessment() {
        let progress = ProgressDoc {
            focus_areas: vec!["feedback".to_string()],
            ..ProgressDoc::default()
        };
        let status = evaluate_prep_gate(&[], &sample_user("Avery Lee", false), &progress);

        assert_eq!(status.total_count, 2);
        assert!(status.is_complete);

        let status = evaluate_prep_gate(&[], &sample_user("", false), &progress);
        assert!(!status.is_complete);
        assert_eq!(status.missing_items, vec!["Leader Profile"]);
    }

    #[test]
    fn profile_counts_with_name_or_explicit_flag() {
        let progress = ProgressDoc::default();
        let by_name = evaluate_prep_gate(&[], &sample_user("Avery Lee", false), &progress);
        assert!(by_name.has_leader_profile);
        let by_flag = evaluate_prep_gate(&[], &sample_user("", true), &progress);
        assert!(by_flag.has_leader_profile);
        let neither = evaluate_prep_gate(&[], &sample_user("  ", false), &progress);
        assert!(!neither.has_leader_profile);
    }

    #[test]
    fn unrecognized_item_gates_on_explicit_completion() {
        let custom = ActionItem::required_item("action-prep-goals", "Set Your 90-Day Goals", ActionKind::Task);
        let refs = vec![&custom];
        let user = sample_user("Avery Lee", true);

        let status = evaluate_prep_gate(&refs, &user, &ProgressDoc::default());
        assert!(!status.is_complete);
        assert_eq!(status.missing_items, vec!["Set Your 90-Day Goals"]);

        let mut progress = ProgressDoc::default();
        progress
            .daily_progress
            .entry("day-prep-14".to_string())
            .or_default()
            .items_completed
            .push("action-prep-goals".to_string());
        let status = evaluate_prep_gate(&refs, &user, &progress);
        assert!(status.is_complete);
    }

    #[test]
    fn missing_progress_fields_mean_not_complete_rather_than_error() {
        let items = five_required_items();
        let refs: Vec<&ActionItem> = items.iter().collect();
        let status = evaluate_prep_gate(&refs, &sample_user("", false), &ProgressDoc::default());
        assert!(!status.has_baseline_assessment);
        assert!(!status.has_video);
        assert!(!status.has_workbook);
        assert!(!status.has_exercises);
    }
}
