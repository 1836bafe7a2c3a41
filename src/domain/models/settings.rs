use chrono::{DateTime, Datelike, Duration, NaiveTime, Utc, Weekday};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationMode {
    Disabled,
    Enabled { messages_per_channel: u32 },
}

/// Persisted round-robin position: the channel currently serving new
/// recipients and how many of them it has served since the last rotation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RotationCursor {
    pub channel_id: Option<Uuid>,
    pub message_count: u32,
}

/// Allowed delivery window, evaluated in a fixed reference timezone given as
/// a UTC offset.
#[derive(Debug, Clone)]
pub struct ScheduleWindow {
    pub days: Vec<Weekday>,
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub utc_offset_minutes: i32,
}

impl ScheduleWindow {
    pub fn contains(&self, now: DateTime<Utc>) -> bool {
        let local = (now + Duration::minutes(i64::from(self.utc_offset_minutes))).naive_utc();
        let time = local.time();
        self.days.contains(&local.weekday()) && self.start <= time && time <= self.end
    }
}

#[derive(Debug, Clone)]
pub struct DispatchSettings {
    pub delay_min_secs: u32,
    pub delay_max_secs: u32,
    pub paused: bool,
    pub rotation: RotationMode,
    pub cursor: RotationCursor,
    pub window: Option<ScheduleWindow>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn window(days: Vec<Weekday>, start: (u32, u32), end: (u32, u32), offset: i32) -> ScheduleWindow {
        ScheduleWindow {
            days,
            start: NaiveTime::from_hms_opt(start.0, start.1, 0).unwrap(),
            end: NaiveTime::from_hms_opt(end.0, end.1, 0).unwrap(),
            utc_offset_minutes: offset,
        }
    }

    #[test]
    fn accepts_time_inside_window() {
        // 2024-01-10 is a Wednesday
        let now = Utc.with_ymd_and_hms(2024, 1, 10, 12, 0, 0).unwrap();
        let window = window(vec![Weekday::Wed], (9, 0), (18, 0), 0);
        assert!(window.contains(now));
    }

    #[test]
    fn bounds_are_inclusive() {
        let window = window(vec![Weekday::Wed], (9, 0), (18, 0), 0);
        let at_start = Utc.with_ymd_and_hms(2024, 1, 10, 9, 0, 0).unwrap();
        let at_end = Utc.with_ymd_and_hms(2024, 1, 10, 18, 0, 0).unwrap();
        assert!(window.contains(at_start));
        assert!(window.contains(at_end));
    }

    #[test]
    fn rejects_time_outside_window() {
        let window = window(vec![Weekday::Wed], (9, 0), (18, 0), 0);
        let too_late = Utc.with_ymd_and_hms(2024, 1, 10, 20, 0, 0).unwrap();
        assert!(!window.contains(too_late));
    }

    #[test]
    fn rejects_disallowed_weekday() {
        // 2024-01-14 is a Sunday
        let now = Utc.with_ymd_and_hms(2024, 1, 14, 12, 0, 0).unwrap();
        let window = window(vec![Weekday::Mon, Weekday::Wed], (9, 0), (18, 0), 0);
        assert!(!window.contains(now));
    }

    #[test]
    fn offset_shifts_weekday_and_time() {
        // 23:30 UTC on Wednesday is 20:30 the same day at UTC-3
        let now = Utc.with_ymd_and_hms(2024, 1, 10, 23, 30, 0).unwrap();
        let window = window(vec![Weekday::Wed], (18, 0), (22, 0), -180);
        assert!(window.contains(now));

        // 01:00 UTC on Thursday is still Wednesday evening at UTC-3
        let next_day = Utc.with_ymd_and_hms(2024, 1, 11, 1, 0, 0).unwrap();
        assert!(window.contains(next_day));
    }
}
