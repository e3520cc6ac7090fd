use anyhow::Context;
use chrono::{DateTime, NaiveDateTime, Utc};

const GITHUB_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Instant standing in for "no publish date". Sorts before every real
/// timestamp, so missing dates always come out oldest.
pub fn missing_stamp() -> DateTime<Utc> {
    DateTime::from_timestamp(0, 0).expect("epoch is representable")
}

/// Maps an optional GitHub timestamp onto a comparable instant.
///
/// Absent input (missing key, JSON null, or a non-string value upstream)
/// falls back to [`missing_stamp`]; a present but malformed string is an
/// error.
pub fn normalize_timestamp(value: Option<&str>) -> anyhow::Result<DateTime<Utc>> {
    match value {
        None => Ok(missing_stamp()),
        Some(raw) => {
            let parsed = NaiveDateTime::parse_from_str(raw, GITHUB_TIME_FORMAT)
                .with_context(|| format!("invalid timestamp {raw:?}"))?;
            Ok(parsed.and_utc())
        }
    }
}
