use chrono::{DateTime, SecondsFormat, Utc};

/// Current time as an ISO-8601 string with millisecond precision, e.g.
/// `2025-01-01T12:00:00.000Z`.
pub(crate) fn now_iso8601() -> String {
    iso8601(Utc::now())
}

pub(crate) fn iso8601(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// File name for an exported metrics snapshot. Colons are replaced so the
/// name is valid on every filesystem.
pub(crate) fn export_file_name(at: DateTime<Utc>) -> String {
    format!("metrics-{}.json", iso8601(at).replace(':', "-"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_iso8601_millis_utc() {
        let at = Utc.with_ymd_and_hms(2025, 3, 4, 5, 6, 7).unwrap();
        assert_eq!(iso8601(at), "2025-03-04T05:06:07.000Z");
    }

    #[test]
    fn test_export_file_name_has_no_colons() {
        let at = Utc.with_ymd_and_hms(2025, 3, 4, 5, 6, 7).unwrap();
        assert_eq!(export_file_name(at), "metrics-2025-03-04T05-06-07.000Z.json");
    }

    #[test]
    fn test_now_parses_back() {
        let now = now_iso8601();
        assert!(DateTime::parse_from_rfc3339(&now).is_ok());
    }
}
