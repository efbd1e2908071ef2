use std::collections::HashSet;

use crate::day::EffectiveDay;
use crate::models::{DayRecord, RawRef};

/// Union of identifiers unlocked by the effective day, one set per zone.
/// Keys are stored lowercase; membership checks are case-insensitive.
#[derive(Debug, Clone, PartialEq)]
pub struct UnlockSets<'a> {
    pub unlocked_days: Vec<&'a DayRecord>,
    pub content: HashSet<String>,
    pub community: HashSet<String>,
    pub coaching: HashSet<String>,
    pub reps: HashSet<String>,
}

fn insert_keys(set: &mut HashSet<String>, refs: &[RawRef]) {
    for item in refs {
        set.extend(item.identifier_keys());
    }
}

fn contains(set: &HashSet<String>, id: &str) -> bool {
    let normalized = id.trim().to_lowercase();
    !normalized.is_empty() && set.contains(&normalized)
}

/// Folds the plan from its first day through the effective day into the
/// four unlock sets.
///
/// Day selection: while prep is incomplete only prep days are unlocked,
/// regardless of elapsed time; once prep is complete every day up to the
/// effective day is unlocked, prep days included (they stay visible after
/// graduation). The output only grows as the effective day increases.
pub fn aggregate_unlocks<'a>(
    plan: &'a [DayRecord],
    effective_day: EffectiveDay,
    prep_complete: bool,
) -> UnlockSets<'a> {
    let unlocked_days: Vec<&DayRecord> = plan
        .iter()
        .filter(|day| {
            if prep_complete {
                day.day_number <= effective_day.day_number()
            } else {
                day.day_number < 0
            }
        })
        .collect();

    let mut content = HashSet::new();
    let mut community = HashSet::new();
    let mut coaching = HashSet::new();
    let mut reps = HashSet::new();

    for day in &unlocked_days {
        insert_keys(&mut content, &day.content);
        insert_keys(&mut community, &day.community);
        insert_keys(&mut coaching, &day.coaching);
        insert_keys(&mut reps, &day.reps);
    }

    UnlockSets {
        unlocked_days,
        content,
        community,
        coaching,
        reps,
    }
}

impl UnlockSets<'_> {
    pub fn is_content_unlocked(&self, id: &str) -> bool {
        contains(&self.content, id)
    }

    pub fn is_community_unlocked(&self, id: &str) -> bool {
        contains(&self.community, id)
    }

    pub fn is_coaching_unlocked(&self, id: &str) -> bool {
        contains(&self.coaching, id)
    }

    pub fn is_rep_unlocked(&self, id: &str) -> bool {
        contains(&self.reps, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawRef;

    fn day_with_content(day_number: i32, refs: Vec<RawRef>) -> DayRecord {
        let mut day = DayRecord::new(day_number, "", "");
        day.content = refs;
        day
    }

    fn sample_plan() -> Vec<DayRecord> {
        let mut prep = DayRecord::new(-14, "Welcome", "");
        prep.content = vec![RawRef::by_id("prep-video")];
        let mut day5 = day_with_content(
            5,
            vec![RawRef {
                content_id: Some("vid-9".to_string()),
                ..RawRef::default()
            }],
        );
        day5.reps = vec![RawRef {
            rep_id: Some("rep-breathing".to_string()),
            ..RawRef::default()
        }];
        let day10 = day_with_content(10, vec![RawRef::by_id("VID-9")]);
        let mut day15 = DayRecord::new(15, "Community opens", "");
        day15.community = vec![RawRef {
            community_item_id: Some("circle-1".to_string()),
            ..RawRef::default()
        }];
        vec![prep, day5, day10, day15]
    }

    #[test]
    fn prep_incomplete_unlocks_only_prep_days() {
        let plan = sample_plan();
        let sets = aggregate_unlocks(&plan, EffectiveDay::clamped_to_prep(), false);
        assert_eq!(sets.unlocked_days.len(), 1);
        assert_eq!(sets.unlocked_days[0].day_number, -14);
        assert!(sets.is_content_unlocked("prep-video"));
        assert!(!sets.is_content_unlocked("vid-9"));
    }

    #[test]
    fn prep_days_stay_visible_after_graduation() {
        let plan = sample_plan();
        let sets = aggregate_unlocks(&plan, EffectiveDay::from_day_number(5), true);
        assert!(sets.unlocked_days.iter().any(|day| day.day_number == -14));
        assert!(sets.is_content_unlocked("prep-video"));
    }

    #[test]
    fn alias_and_case_variants_collapse_to_one_membership() {
        // Day 5 carries the id as `contentId: "vid-9"`, day 10 as
        // `id: "VID-9"`; both land in the same lowercase key.
        let plan = sample_plan();
        let sets = aggregate_unlocks(&plan, EffectiveDay::from_day_number(10), true);
        assert!(sets.is_content_unlocked("vid-9"));
        assert!(sets.is_content_unlocked("VID-9"));
        assert_eq!(
            sets.content.iter().filter(|key| key.as_str() == "vid-9").count(),
            1
        );
    }

    #[test]
    fn membership_is_case_insensitive_both_directions() {
        let plan = vec![day_with_content(0, vec![RawRef::by_id("abc123")])];
        let sets = aggregate_unlocks(&plan, EffectiveDay::from_day_number(0), true);
        assert_eq!(sets.is_content_unlocked("ABC123"), sets.is_content_unlocked("abc123"));
        assert!(sets.is_content_unlocked("ABC123"));
    }

    #[test]
    fn empty_or_blank_ids_are_never_unlocked() {
        let plan = sample_plan();
        let sets = aggregate_unlocks(&plan, EffectiveDay::from_day_number(10), true);
        assert!(!sets.is_content_unlocked(""));
        assert!(!sets.is_content_unlocked("   "));
    }

    #[test]
    fn unlock_sets_grow_monotonically_with_the_effective_day() {
        let plan = sample_plan();
        let mut previous: HashSet<String> = HashSet::new();
        for day_number in -14..=20 {
            let sets = aggregate_unlocks(&plan, EffectiveDay::from_day_number(day_number), true);
            assert!(
                previous.is_subset(&sets.content),
                "content set shrank at day {day_number}"
            );
            previous = sets.content;
        }
    }

    #[test]
    fn aggregation_is_idempotent() {
        let plan = sample_plan();
        let first = aggregate_unlocks(&plan, EffectiveDay::from_day_number(15), true);
        let second = aggregate_unlocks(&plan, EffectiveDay::from_day_number(15), true);
        assert_eq!(first, second);
    }

    #[test]
    fn missing_plan_yields_empty_sets() {
        let sets = aggregate_unlocks(&[], EffectiveDay::from_day_number(30), true);
        assert!(sets.unlocked_days.is_empty());
        assert!(sets.content.is_empty());
        assert!(!sets.is_content_unlocked("anything"));
    }

    #[test]
    fn zones_accumulate_from_their_own_arrays() {
        let plan = sample_plan();
        let sets = aggregate_unlocks(&plan, EffectiveDay::from_day_number(15), true);
        assert!(sets.is_community_unlocked("circle-1"));
        assert!(sets.is_rep_unlocked("rep-breathing"));
        assert!(!sets.is_community_unlocked("rep-breathing"));
    }
}
