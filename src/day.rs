use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Prep,
    Program,
}

/// Effective day with the two-phase transition made explicit: the phase is
/// determined by the sign of the plan day number, and the constructor keeps
/// the two in agreement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectiveDay {
    phase: Phase,
    day_number: i32,
}

impl EffectiveDay {
    pub const LAST_PREP_DAY: i32 = -1;

    pub fn from_day_number(day_number: i32) -> Self {
        let phase = if day_number < 0 {
            Phase::Prep
        } else {
            Phase::Program
        };
        Self { phase, day_number }
    }

    pub fn clamped_to_prep() -> Self {
        Self::from_day_number(Self::LAST_PREP_DAY)
    }

    pub fn phase(self) -> Phase {
        self.phase
    }

    pub fn day_number(self) -> i32 {
        self.day_number
    }
}

/// Cohort timezones are stored as IANA names; unknown names degrade to UTC
/// so a typo in admin data cannot take the dashboard down.
pub fn cohort_timezone(name: &str) -> Tz {
    name.parse().unwrap_or_else(|_| {
        warn!(timezone = name, "unknown cohort timezone, falling back to UTC");
        chrono_tz::UTC
    })
}

/// Parses the loose historical start-date shapes: a Firestore-style
/// `{"seconds": n}` object, an RFC 3339 string, a plain `YYYY-MM-DD` string,
/// or epoch milliseconds. Instants are projected into the cohort timezone
/// before the calendar date is taken. Returns `None` rather than erroring.
pub fn parse_start_date(raw: &serde_json::Value, tz: Tz) -> Option<NaiveDate> {
    match raw {
        serde_json::Value::Object(map) => map
            .get("seconds")
            .and_then(serde_json::Value::as_i64)
            .and_then(|seconds| DateTime::<Utc>::from_timestamp(seconds, 0))
            .map(|instant| instant.with_timezone(&tz).date_naive()),
        serde_json::Value::String(text) => NaiveDate::parse_from_str(text, "%Y-%m-%d")
            .ok()
            .or_else(|| {
                DateTime::parse_from_rfc3339(text)
                    .ok()
                    .map(|instant| instant.with_timezone(&tz).date_naive())
            }),
        serde_json::Value::Number(number) => number
            .as_i64()
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .map(|instant| instant.with_timezone(&tz).date_naive()),
        _ => None,
    }
}

/// Whole calendar days elapsed since the start date, both sides in the
/// cohort timezone. Day 0 is the start date itself; calendar-day difference
/// avoids drift from time-of-day login variance, and using one cohort-wide
/// timezone keeps every member on the same "Day N".
pub fn raw_day_number(now: DateTime<Utc>, start_date: NaiveDate, tz: Tz) -> i32 {
    (now.with_timezone(&tz).date_naive() - start_date).num_days() as i32
}

/// Applies the prep gate to the raw day number. With prep incomplete, any
/// raw day at or past the program start clamps to the last prep day; with
/// prep complete, time advances the day unmodified even while the app is
/// closed. A missing raw day falls back to the stored manual index.
pub fn resolve_effective_day(
    raw_day: Option<i32>,
    manual_fallback: i32,
    prep_complete: bool,
) -> EffectiveDay {
    let day = raw_day.unwrap_or(manual_fallback);
    if !prep_complete && day >= 0 {
        return EffectiveDay::clamped_to_prep();
    }
    EffectiveDay::from_day_number(day)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn day_zero_is_the_start_date() {
        let start = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        assert_eq!(raw_day_number(utc(2026, 3, 2, 15), start, chrono_tz::UTC), 0);
        assert_eq!(raw_day_number(utc(2026, 3, 12, 9), start, chrono_tz::UTC), 10);
        assert_eq!(raw_day_number(utc(2026, 2, 27, 9), start, chrono_tz::UTC), -3);
    }

    #[test]
    fn day_boundary_follows_the_cohort_timezone() {
        // 03:00 UTC on March 3rd is still March 2nd in New York but already
        // March 3rd in Tokyo: same instant, different cohort day.
        let start = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let instant = utc(2026, 3, 3, 3);
        assert_eq!(
            raw_day_number(instant, start, cohort_timezone("America/New_York")),
            0
        );
        assert_eq!(
            raw_day_number(instant, start, cohort_timezone("Asia/Tokyo")),
            1
        );
    }

    #[test]
    fn unknown_timezone_degrades_to_utc() {
        assert_eq!(cohort_timezone("Not/AZone"), chrono_tz::UTC);
    }

    #[test]
    fn prep_gate_clamps_program_days_to_last_prep_day() {
        let resolved = resolve_effective_day(Some(10), 0, false);
        assert_eq!(resolved.day_number(), -1);
        assert_eq!(resolved.phase(), Phase::Prep);
    }

    #[test]
    fn prep_days_pass_through_while_gate_is_closed() {
        let resolved = resolve_effective_day(Some(-5), 0, false);
        assert_eq!(resolved.day_number(), -5);
        assert_eq!(resolved.phase(), Phase::Prep);
    }

    #[test]
    fn completed_prep_lets_time_advance_the_day() {
        let resolved = resolve_effective_day(Some(20), 0, true);
        assert_eq!(resolved.day_number(), 20);
        assert_eq!(resolved.phase(), Phase::Program);
    }

    #[test]
    fn missing_start_date_uses_manual_fallback_without_panicking() {
        let resolved = resolve_effective_day(None, 0, true);
        assert_eq!(resolved.day_number(), 0);
        let resolved = resolve_effective_day(None, 3, true);
        assert_eq!(resolved.day_number(), 3);
    }

    #[test]
    fn start_date_parses_every_historical_shape() {
        let tz = chrono_tz::UTC;
        let expected = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();

        let seconds = serde_json::json!({ "seconds": 1_772_409_600_i64 });
        assert_eq!(parse_start_date(&seconds, tz), Some(expected));

        let plain = serde_json::json!("2026-03-02");
        assert_eq!(parse_start_date(&plain, tz), Some(expected));

        let rfc3339 = serde_json::json!("2026-03-02T09:30:00Z");
        assert_eq!(parse_start_date(&rfc3339, tz), Some(expected));

        let millis = serde_json::json!(1_772_409_600_000_i64);
        assert_eq!(parse_start_date(&millis, tz), Some(expected));

        assert_eq!(parse_start_date(&serde_json::json!("soon"), tz), None);
        assert_eq!(parse_start_date(&serde_json::Value::Null, tz), None);
        assert_eq!(parse_start_date(&serde_json::json!({ "nanos": 12 }), tz), None);
    }
}
