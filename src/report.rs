use std::fmt::Write;

use chrono::NaiveDate;

use crate::access::AccessSnapshot;
use crate::day::Phase;
use crate::models::UserRecord;

fn open_label(open: bool) -> &'static str {
    if open {
        "open"
    } else {
        "locked"
    }
}

pub fn build_report(user: &UserRecord, snapshot: &AccessSnapshot<'_>, as_of: NaiveDate) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Daily Access Report");
    let _ = writeln!(
        output,
        "Generated for {} ({}) as of {}",
        user.full_name, user.email, as_of
    );
    let _ = writeln!(output);

    let _ = writeln!(output, "## Prep Gate");
    let prep = &snapshot.prep_status;
    let _ = writeln!(
        output,
        "- {} of {} required items complete",
        prep.completed_count, prep.total_count
    );
    if snapshot.prep_complete && !prep.is_complete {
        let _ = writeln!(output, "- Gate passed earlier (latched); items since regressed");
    } else if snapshot.prep_complete {
        let _ = writeln!(output, "- Gate passed");
    }
    for label in &prep.missing_items {
        let _ = writeln!(output, "- Missing: {label}");
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Current Day");
    let phase = match snapshot.effective_day.phase() {
        Phase::Prep => "Prep",
        Phase::Program => "Program",
    };
    let _ = writeln!(
        output,
        "- {} phase, day {}",
        phase,
        snapshot.effective_day.day_number()
    );
    match snapshot.current_day {
        Some(day) if !day.title.is_empty() => {
            let _ = writeln!(output, "- Today: {}", day.title);
        }
        Some(_) => {}
        None => {
            let _ = writeln!(output, "- No plan record for this day");
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Zones");
    let zones = &snapshot.zones;
    let _ = writeln!(
        output,
        "- Community: {}",
        open_label(zones.is_community_zone_open)
    );
    let _ = writeln!(
        output,
        "- Coaching: {}",
        open_label(zones.is_coaching_zone_open)
    );
    let _ = writeln!(
        output,
        "- Coaching 1:1 window: {}",
        open_label(zones.is_coaching_1on1_window)
    );
    let _ = writeln!(output, "- Content: {}", open_label(zones.is_content_zone_open));
    let _ = writeln!(output, "- Locker: {}", open_label(zones.is_locker_zone_open));

    let _ = writeln!(output);
    let _ = writeln!(output, "## Unlocked Items");
    let unlocks = &snapshot.unlocks;
    let _ = writeln!(
        output,
        "- {} days unlocked ({} content, {} community, {} coaching, {} reps)",
        unlocks.unlocked_days.len(),
        unlocks.content.len(),
        unlocks.community.len(),
        unlocks.coaching.len(),
        unlocks.reps.len()
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Missed Days");
    if snapshot.missed_days.is_empty() {
        let _ = writeln!(output, "All caught up.");
    } else {
        for day in snapshot.missed_days.iter().take(10) {
            let _ = writeln!(output, "- Day {}: {}", day.day_number, day.title);
        }
        if snapshot.missed_days.len() > 10 {
            let _ = writeln!(
                output,
                "- ...and {} more",
                snapshot.missed_days.len() - 10
            );
        }
    }

    output
}
