use chrono::{DateTime, ParseError, SecondsFormat, Utc};

pub type NexusDateTime = DateTime<Utc>;

/// Fallback format for date-times written without RFC 3339 separators in the offset.
pub const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%z";

/// Parses an ISO 8601 date-time, accepting RFC 3339 and [DATETIME_FORMAT].
pub fn parse_datetime(text: &str) -> Result<NexusDateTime, ParseError> {
    DateTime::parse_from_rfc3339(text)
        .or_else(|_| DateTime::parse_from_str(text, DATETIME_FORMAT))
        .map(|datetime| datetime.with_timezone(&Utc))
}

/// Renders a date-time as RFC 3339, keeping any sub-second precision.
pub fn format_datetime(datetime: &NexusDateTime) -> String {
    datetime.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_both_offset_styles() {
        let expected = Utc.with_ymd_and_hms(2023, 11, 2, 9, 0, 0).unwrap();
        assert_eq!(parse_datetime("2023-11-02T10:00:00+01:00").unwrap(), expected);
        assert_eq!(parse_datetime("2023-11-02T10:00:00+0100").unwrap(), expected);
    }

    #[test]
    fn format_is_reparsed() {
        let datetime = Utc.with_ymd_and_hms(2023, 11, 2, 9, 0, 0).unwrap()
            + chrono::Duration::milliseconds(250);
        let text = format_datetime(&datetime);
        assert_eq!(text, "2023-11-02T09:00:00.250Z");
        assert_eq!(parse_datetime(&text).unwrap(), datetime);
    }

    #[test]
    fn rejects_plain_dates() {
        assert!(parse_datetime("2023-11-02").is_err());
    }
}
