use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};

/// Numeric identity of a ticket as assigned by the ticket service
pub type TicketId = i64;

/// Numeric identity of a user account
pub type UserId = i64;

/// Denormalized reference to a project or a category, as embedded in a ticket
#[derive(Clone, Debug, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct EntityRef {
    pub id: i64,
    #[serde(default, deserialize_with = "null_as_default", alias = "nom")]
    pub name: String,
}

lazy_static! {
    static ref SEPARATORS: Regex = Regex::new(r"[\s_\-]+").unwrap();
}

/// Folds free text into the lookup form used by the synonym tables:
/// trimmed, lower case, French accents removed and any run of blanks,
/// underscores or dashes collapsed into a single space.
#[must_use]
pub fn fold(raw: &str) -> String {
    let lowered: String = raw.trim().to_lowercase().chars().map(strip_accent).collect();
    SEPARATORS.replace_all(&lowered, " ").trim().to_string()
}

fn strip_accent(c: char) -> char {
    match c {
        'à' | 'â' | 'ä' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'î' | 'ï' => 'i',
        'ô' | 'ö' => 'o',
        'ù' | 'û' | 'ü' => 'u',
        'ç' => 'c',
        other => other,
    }
}

/// Parses the time stamps sent by the ticket service.
///
/// The service is not consistent: some fields carry an offset (RFC 3339),
/// others are naive local date times which are taken to be UTC.
#[must_use]
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Deserializes an explicit `null` like a missing field, as the default value.
/// Use together with `#[serde(default)]`.
#[allow(clippy::missing_errors_doc)]
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Serde adapter for optional time stamps in either of the formats accepted by
/// [`parse_timestamp`]. Unparseable values are treated as absent.
pub mod opt_timestamp {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    #[allow(clippy::missing_errors_doc)]
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().and_then(super::parse_timestamp))
    }

    #[allow(clippy::missing_errors_doc)]
    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(dt) => serializer.serialize_str(&dt.to_rfc3339()),
            None => serializer.serialize_none(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    #[test]
    fn test_fold() {
        assert_eq!(fold("  Non Résolu "), "non resolu");
        assert_eq!(fold("IN_PROGRESS"), "in progress");
        assert_eq!(fold("chef-de--projet"), "chef de projet");
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let with_offset = parse_timestamp("2024-03-01T10:15:00+01:00").unwrap();
        assert_eq!(with_offset.to_rfc3339(), "2024-03-01T09:15:00+00:00");

        let naive = parse_timestamp("2024-03-01T10:15:00.123").unwrap();
        assert_eq!(naive.day(), 1);
        assert!(parse_timestamp("yesterday").is_none());
    }
}
