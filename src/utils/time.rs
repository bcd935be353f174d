use anyhow::Result;
use chrono::{DateTime, Local, NaiveDate};
use chrono_english::Dialect;

/// This is the standard way of rendering a duration in punchclock. Hours are not capped at
/// 24, so a value spanning days keeps growing past "23:59:59".
pub fn hms(seconds: i64) -> String {
    let seconds = seconds.max(0);
    format!(
        "{:02}:{:02}:{:02}",
        seconds / 3600,
        (seconds % 3600) / 60,
        seconds % 60
    )
}

/// Parses a day argument. Plain `YYYY-MM-DD` input is taken as is, anything else goes
/// through the natural language parser, so "yesterday", "last friday" or "15/03/2025" all
/// work.
pub fn parse_day_arg(value: &str, now: DateTime<Local>, dialect: Dialect) -> Result<NaiveDate> {
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Ok(date);
    }
    Ok(chrono_english::parse_date_string(value, now, dialect)?.date_naive())
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Local, NaiveDate, TimeZone};
    use chrono_english::Dialect;

    use super::{hms, parse_day_arg};

    #[test]
    fn test_hms_basic() {
        assert_eq!(hms(0), "00:00:00");
        assert_eq!(hms(59), "00:00:59");
        assert_eq!(hms(3661), "01:01:01");
    }

    #[test]
    fn test_hms_does_not_wrap_at_24_hours() {
        assert_eq!(hms(90000), "25:00:00");
        assert_eq!(hms(360000), "100:00:00");
    }

    #[test]
    fn test_hms_clamps_negative() {
        assert_eq!(hms(-5), "00:00:00");
    }

    #[test]
    fn test_parse_day_arg_takes_iso_dates_verbatim() {
        let now = Local.with_ymd_and_hms(2025, 3, 14, 12, 0, 0).unwrap();

        let parsed = parse_day_arg("2025-01-02", now, Dialect::Uk).unwrap();

        assert_eq!(parsed, NaiveDate::from_ymd_opt(2025, 1, 2).unwrap());
    }

    #[test]
    fn test_parse_day_arg_understands_relative_phrases() {
        let now = Local.with_ymd_and_hms(2025, 3, 14, 12, 0, 0).unwrap();

        let parsed = parse_day_arg("yesterday", now, Dialect::Uk).unwrap();

        assert_eq!(parsed, now.date_naive() - Duration::days(1));
    }

    #[test]
    fn test_parse_day_arg_rejects_nonsense() {
        let now = Local.with_ymd_and_hms(2025, 3, 14, 12, 0, 0).unwrap();

        assert!(parse_day_arg("the heat death of the universe", now, Dialect::Uk).is_err());
    }
}
