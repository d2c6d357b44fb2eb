use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Overview {
    pub id: i64,
    /// Monday of the covered week, `YYYY-MM-DD`.
    pub week_start: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Monday of the calendar week containing `now` (UTC).
pub fn week_start(now: DateTime<Utc>) -> NaiveDate {
    let today = now.date_naive();
    today - Duration::days(i64::from(today.weekday().num_days_from_monday()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn week_starts_on_monday() {
        // Sunday
        let sunday = Utc.with_ymd_and_hms(2026, 10, 18, 23, 0, 0).unwrap();
        assert_eq!(week_start(sunday).to_string(), "2026-10-12");

        let monday = Utc.with_ymd_and_hms(2026, 10, 12, 0, 0, 1).unwrap();
        assert_eq!(week_start(monday).to_string(), "2026-10-12");

        let wednesday = Utc.with_ymd_and_hms(2026, 10, 21, 8, 0, 0).unwrap();
        assert_eq!(week_start(wednesday).to_string(), "2026-10-19");
    }
}
