// src/ingest/date.rs
//! Date normalization: whatever the feed put in its date field becomes a UTC
//! instant, or `None`.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use time::{format_description::well_known::Rfc2822, OffsetDateTime, UtcOffset};

const NAIVE_DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];
const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%Y/%m/%d"];

/// Parse a feed date. Empty or unparseable input yields `None`.
pub fn normalize_date(raw: Option<&str>) -> Option<DateTime<Utc>> {
    let s = raw?.trim();
    if s.is_empty() {
        return None;
    }
    parse_rfc3339(s)
        .or_else(|| parse_rfc2822(s))
        .or_else(|| parse_offset_with_space(s))
        .or_else(|| parse_naive(s))
}

/// Fixed-width `YYYY-MM-DDTHH:MM:SS.mmmZ`; string order equals time order.
pub fn to_canonical(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_rfc3339(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

fn parse_rfc2822(s: &str) -> Option<DateTime<Utc>> {
    OffsetDateTime::parse(s, &Rfc2822)
        .ok()
        .map(|dt| dt.to_offset(UtcOffset::UTC))
        .and_then(|dt| DateTime::from_timestamp(dt.unix_timestamp(), dt.nanosecond()))
        // lenient fallback (single-digit hours, odd zone names)
        .or_else(|| {
            DateTime::parse_from_rfc2822(s)
                .ok()
                .map(|d| d.with_timezone(&Utc))
        })
}

fn parse_offset_with_space(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f%:z")
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

/// Offset-less values are taken as UTC.
fn parse_naive(s: &str) -> Option<DateTime<Utc>> {
    for fmt in NAIVE_DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.and_utc());
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return d.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
        }
    }
    None
}

/// Serde adapter for `Option<DateTime<Utc>>` in canonical form.
/// Deserialization is lenient: anything `normalize_date` rejects becomes `None`.
pub mod canonical_opt {
    use super::{normalize_date, to_canonical};
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<DateTime<Utc>>,
        s: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(dt) => s.serialize_str(&to_canonical(dt)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        d: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        let raw: Option<String> = Option::deserialize(d)?;
        Ok(normalize_date(raw.as_deref()))
    }
}
