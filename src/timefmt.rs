use chrono::{DateTime, Utc};

/// Format an instant as a calendar date (`YYYY-MM-DD`, UTC).
pub fn format_date(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d").to_string()
}

/// Format an optional instant, using '-' when missing.
pub fn format_date_opt(ts: Option<DateTime<Utc>>) -> String {
    ts.map(format_date).unwrap_or_else(|| "-".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_date() {
        let ts = Utc.with_ymd_and_hms(2018, 8, 28, 23, 59, 59).unwrap();
        assert_eq!(format_date(ts), "2018-08-28");
        assert_eq!(format_date_opt(Some(ts)), "2018-08-28");
        assert_eq!(format_date_opt(None), "-");
    }
}
