//! Send-slot heuristics shared by nurture and reactivation outreach
//!
//! Times are computed in UTC; the practice timezone is a display concern.

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use practice_growth_config::TimingConfig;

fn at_hour(date: NaiveDate, hour: u32) -> DateTime<Utc> {
    let naive = date.and_hms_opt(hour.min(23), 0, 0).unwrap_or_default();
    Utc.from_utc_datetime(&naive)
}

/// Slot hour for a recipient's click volume
pub fn slot_hour(timing: &TimingConfig, links_clicked: u32) -> u32 {
    if links_clicked >= timing.morning_min_clicks {
        timing.morning_hour
    } else {
        timing.afternoon_hour
    }
}

/// First allowed weekday on or after `earliest`, at the click-based slot.
///
/// An instant that is not after `now` moves forward one week.
pub fn next_send_slot(
    timing: &TimingConfig,
    earliest: DateTime<Utc>,
    now: DateTime<Utc>,
    links_clicked: u32,
) -> DateTime<Utc> {
    let hour = slot_hour(timing, links_clicked);
    let start = earliest.date_naive();

    let day = (0..7)
        .map(|offset| start + Duration::days(offset))
        .find(|date| timing.send_days.contains(&date.weekday()))
        .unwrap_or(start);

    let slot = at_hour(day, hour);
    if slot <= now {
        slot + Duration::weeks(1)
    } else {
        slot
    }
}

/// Next listed day-of-month strictly after `now`, at `hour`
pub fn next_day_of_month(days: &[u32], now: DateTime<Utc>, hour: u32) -> DateTime<Utc> {
    let mut year = now.year();
    let mut month = now.month();

    for _ in 0..2 {
        let mut candidates: Vec<DateTime<Utc>> = days
            .iter()
            .filter_map(|day| NaiveDate::from_ymd_opt(year, month, *day))
            .map(|date| at_hour(date, hour))
            .filter(|slot| *slot > now)
            .collect();
        candidates.sort();
        if let Some(first) = candidates.first() {
            return *first;
        }
        if month == 12 {
            year += 1;
            month = 1;
        } else {
            month += 1;
        }
    }

    // Only reached with an empty day list
    now + Duration::days(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn test_picks_next_allowed_weekday() {
        let timing = TimingConfig::default();
        // 2024-01-06 is a Saturday
        let now = utc(2024, 1, 6, 9);
        let slot = next_send_slot(&timing, now, now, 0);
        // Tuesday 2024-01-09 at 14:00
        assert_eq!(slot, utc(2024, 1, 9, 14));
    }

    #[test]
    fn test_heavy_clickers_get_morning_slot() {
        let timing = TimingConfig::default();
        let now = utc(2024, 1, 6, 9);
        assert_eq!(next_send_slot(&timing, now, now, 3), utc(2024, 1, 9, 10));
    }

    #[test]
    fn test_past_slot_falls_forward_a_week() {
        let timing = TimingConfig::default();
        // Tuesday 2024-01-09 at 15:00, afternoon slot already gone
        let now = utc(2024, 1, 9, 15);
        assert_eq!(next_send_slot(&timing, now, now, 0), utc(2024, 1, 16, 14));
    }

    #[test]
    fn test_same_day_slot_still_ahead() {
        let timing = TimingConfig::default();
        let now = utc(2024, 1, 10, 8);
        assert_eq!(next_send_slot(&timing, now, now, 0), utc(2024, 1, 10, 14));
    }

    #[test]
    fn test_next_day_of_month() {
        let days = [1, 15];
        assert_eq!(next_day_of_month(&days, utc(2024, 3, 3, 12), 10), utc(2024, 3, 15, 10));
        assert_eq!(next_day_of_month(&days, utc(2024, 3, 15, 11), 10), utc(2024, 4, 1, 10));
        assert_eq!(next_day_of_month(&days, utc(2024, 12, 20, 0), 10), utc(2025, 1, 1, 10));
        assert_eq!(next_day_of_month(&days, utc(2024, 3, 1, 9), 10), utc(2024, 3, 1, 10));
    }
}
