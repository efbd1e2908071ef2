use crate::day::EffectiveDay;
use crate::models::{DashboardFlags, DayRecord};

pub const COMMUNITY_OPENS_DAY: i32 = 15;
pub const COACHING_OPENS_DAY: i32 = 22;
pub const COACHING_1ON1_FIRST_DAY: i32 = 23;
pub const COACHING_1ON1_LAST_DAY: i32 = 35;

/// Zone-open flags plus the current day's widget visibility. Content and
/// locker zones are always open; their items are gated individually by the
/// unlock sets instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneVisibility {
    pub is_community_zone_open: bool,
    pub is_coaching_zone_open: bool,
    pub is_coaching_1on1_window: bool,
    pub is_content_zone_open: bool,
    pub is_locker_zone_open: bool,
    pub widgets: DashboardFlags,
}

pub fn derive_zone_visibility(
    current_day: Option<&DayRecord>,
    effective_day: EffectiveDay,
) -> ZoneVisibility {
    let day = effective_day.day_number();
    let widgets = current_day
        .map(|record| record.dashboard.clone())
        .unwrap_or_default();

    ZoneVisibility {
        is_community_zone_open: day >= COMMUNITY_OPENS_DAY,
        is_coaching_zone_open: day >= COACHING_OPENS_DAY,
        is_coaching_1on1_window: (COACHING_1ON1_FIRST_DAY..=COACHING_1ON1_LAST_DAY).contains(&day),
        is_content_zone_open: true,
        is_locker_zone_open: true,
        widgets,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zones_at(day: i32) -> ZoneVisibility {
        derive_zone_visibility(None, EffectiveDay::from_day_number(day))
    }

    #[test]
    fn community_opens_at_day_fifteen() {
        assert!(!zones_at(-1).is_community_zone_open);
        assert!(!zones_at(14).is_community_zone_open);
        assert!(zones_at(15).is_community_zone_open);
        assert!(zones_at(20).is_community_zone_open);
    }

    #[test]
    fn coaching_opens_at_day_twenty_two() {
        assert!(!zones_at(20).is_coaching_zone_open);
        assert!(!zones_at(21).is_coaching_zone_open);
        assert!(zones_at(22).is_coaching_zone_open);
    }

    #[test]
    fn one_on_one_window_spans_days_twenty_three_to_thirty_five() {
        assert!(!zones_at(22).is_coaching_1on1_window);
        assert!(zones_at(23).is_coaching_1on1_window);
        assert!(zones_at(30).is_coaching_1on1_window);
        assert!(zones_at(35).is_coaching_1on1_window);
        assert!(!zones_at(36).is_coaching_1on1_window);
    }

    #[test]
    fn content_and_locker_zones_are_always_open() {
        for day in [-14, -1, 0, 15, 40] {
            let zones = zones_at(day);
            assert!(zones.is_content_zone_open);
            assert!(zones.is_locker_zone_open);
        }
    }

    #[test]
    fn widget_flags_come_from_the_current_day_record() {
        let mut day = DayRecord::new(5, "Momentum", "");
        day.dashboard.show_weekly_focus = false;
        day.dashboard.show_lis_builder = true;
        let zones = derive_zone_visibility(Some(&day), EffectiveDay::from_day_number(5));
        assert!(!zones.widgets.show_weekly_focus);
        assert!(zones.widgets.show_lis_builder);
    }

    #[test]
    fn missing_day_record_uses_designer_defaults() {
        let zones = zones_at(7);
        assert_eq!(zones.widgets, DashboardFlags::default());
    }
}
