//! Standard converters between timestamps and their RFC 3339 text form.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::converter::Converter;

/// `DateTime<Utc>` → `String`, RFC 3339 with whole seconds and a `Z` suffix
/// (`2023-02-01T00:00:00Z`).
pub fn time_to_string() -> Converter {
    Converter::typed(|t: DateTime<Utc>| -> Result<String, std::convert::Infallible> {
        Ok(format_rfc3339(&t))
    })
}

/// `String` → `DateTime<Utc>`. Accepts any RFC 3339 offset and normalizes
/// to UTC. Unparsable text is a converter error.
pub fn string_to_time() -> Converter {
    Converter::typed(|s: String| parse_rfc3339(&s))
}

pub fn format_rfc3339(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn parse_rfc3339(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(s).map(|t| t.with_timezone(&Utc))
}
