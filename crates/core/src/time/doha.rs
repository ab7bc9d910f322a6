use anyhow::Context;
use chrono::{DateTime, FixedOffset, Utc};

// Qatar runs on Arabia Standard Time (UTC+3), no daylight saving.
const DOHA_OFFSET_HOURS: i32 = 3;

/// Display offset for timestamps shown to the user. Defaults to Doha time;
/// override with DISPLAY_TZ_OFFSET_HOURS.
pub fn display_offset() -> anyhow::Result<FixedOffset> {
    let hours = std::env::var("DISPLAY_TZ_OFFSET_HOURS")
        .ok()
        .and_then(|s| s.parse::<i32>().ok())
        .unwrap_or(DOHA_OFFSET_HOURS);

    anyhow::ensure!(
        (-14..=14).contains(&hours),
        "DISPLAY_TZ_OFFSET_HOURS out of range: {hours}"
    );
    FixedOffset::east_opt(hours * 3600).context("invalid display offset")
}

pub fn format_timestamp(utc: DateTime<Utc>, offset: FixedOffset) -> String {
    utc.with_timezone(&offset)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn doha_is_three_hours_ahead_of_utc() {
        let offset = FixedOffset::east_opt(DOHA_OFFSET_HOURS * 3600).unwrap();
        let utc = Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap();
        assert_eq!(format_timestamp(utc, offset), "2026-03-01 12:30:00");
    }

    #[test]
    fn offset_rolls_the_date_forward_past_midnight() {
        let offset = FixedOffset::east_opt(DOHA_OFFSET_HOURS * 3600).unwrap();
        let utc = Utc.with_ymd_and_hms(2026, 3, 1, 22, 30, 0).unwrap();
        assert_eq!(format_timestamp(utc, offset), "2026-03-02 01:30:00");
    }
}
