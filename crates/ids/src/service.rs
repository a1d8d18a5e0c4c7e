//! Internal implementation of record identifiers.

use crate::{IdError, IdResult};
use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use std::{fmt, str::FromStr};
use uuid::Uuid;

const TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%S%.3f";

/// Opaque identity of a patient record or attachment.
///
/// Once constructed the id is guaranteed to be non-empty and free of surrounding
/// whitespace. Comparison is exact string equality; ids are never normalised beyond
/// trimming.
///
/// # Construction
/// - [`RecordId::generate`] allocates a fresh id for a new record.
/// - [`RecordId::parse`] accepts an id supplied from outside (snapshot, CLI argument).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId(String);

impl RecordId {
    /// Allocates a fresh id: a v4 UUID rendered as 32 lowercase hex characters.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Wraps an externally supplied id.
    ///
    /// # Errors
    ///
    /// Returns [`IdError::InvalidInput`] if `input` is empty or whitespace only.
    pub fn parse(input: &str) -> IdResult<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(IdError::InvalidInput("record id cannot be empty".into()));
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RecordId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RecordId::parse(s)
    }
}

impl From<TimestampId> for RecordId {
    fn from(id: TimestampId) -> Self {
        Self(id.to_string())
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for RecordId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for RecordId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        RecordId::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// A time-prefixed identifier.
///
/// Format:
/// `YYYYMMDDTHHMMSS.mmmZ-<32 hex uuid>`
///
/// Example:
/// `20260111T143522.045Z-550e8400e29b41d4a716446655440000`
///
/// When [`TimestampId::generate`] is given the previously issued id, the new timestamp is
/// strictly greater than the previous one (bumped by 1 ms if the clock has not moved on),
/// so several files attached in the same instant keep their selection order.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TimestampId {
    timestamp: DateTime<Utc>,
    uuid: Uuid,
}

impl TimestampId {
    /// Generates a new timestamp id, strictly after `last` when one is given.
    pub fn generate(last: Option<&TimestampId>) -> Self {
        Self::generate_at(Utc::now(), last)
    }

    /// Generates a timestamp id for the instant `now`.
    pub fn generate_at(now: DateTime<Utc>, last: Option<&TimestampId>) -> Self {
        let timestamp = match last {
            Some(prev) if now <= prev.timestamp => prev.timestamp + Duration::milliseconds(1),
            _ => now,
        };

        Self {
            timestamp,
            uuid: Uuid::new_v4(),
        }
    }

    /// Returns the timestamp component.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

impl FromStr for TimestampId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (ts_str, uuid_str) = s.split_once('-').ok_or_else(|| {
            IdError::InvalidInput(format!("Invalid timestamp id format: '{}'", s))
        })?;

        let ts_no_z = ts_str.strip_suffix('Z').ok_or_else(|| {
            IdError::InvalidInput(format!("Timestamp must end with 'Z': '{}'", ts_str))
        })?;

        let naive = NaiveDateTime::parse_from_str(ts_no_z, TIMESTAMP_FORMAT).map_err(|e| {
            IdError::InvalidInput(format!("Invalid timestamp format '{}': {}", ts_str, e))
        })?;

        let is_simple_hex = uuid_str.len() == 32
            && uuid_str
                .bytes()
                .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'));
        if !is_simple_hex {
            return Err(IdError::InvalidInput(format!(
                "UUID must be 32 lowercase hex characters, got: '{}'",
                uuid_str
            )));
        }
        let uuid = Uuid::parse_str(uuid_str)
            .map_err(|e| IdError::InvalidInput(format!("Invalid UUID '{}': {}", uuid_str, e)))?;

        Ok(Self {
            timestamp: DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc),
            uuid,
        })
    }
}

impl fmt::Display for TimestampId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}Z-{}",
            self.timestamp.format(TIMESTAMP_FORMAT),
            self.uuid.simple()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_generate_is_32_lowercase_hex() {
        let id = RecordId::generate();
        assert_eq!(id.as_str().len(), 32);
        assert!(id
            .as_str()
            .bytes()
            .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')));
    }

    #[test]
    fn test_generate_is_unique() {
        assert_ne!(RecordId::generate(), RecordId::generate());
    }

    #[test]
    fn test_parse_accepts_legacy_browser_ids() {
        let id = RecordId::parse("1718200000000").unwrap();
        assert_eq!(id.as_str(), "1718200000000");

        let id = RecordId::parse(" 1718200000000k3j9x0a1b ").unwrap();
        assert_eq!(id.as_str(), "1718200000000k3j9x0a1b");
    }

    #[test]
    fn test_parse_rejects_blank() {
        assert!(matches!(
            RecordId::parse("   "),
            Err(IdError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_record_id_serde_is_plain_string() {
        let id = RecordId::parse("abc").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"abc\"");
        assert!(serde_json::from_str::<RecordId>("\"\"").is_err());
    }

    #[test]
    fn test_timestamp_id_display_format() {
        let now = Utc.with_ymd_and_hms(2026, 1, 11, 14, 35, 22).unwrap()
            + Duration::milliseconds(45);
        let id = TimestampId::generate_at(now, None);
        let rendered = id.to_string();

        assert!(rendered.starts_with("20260111T143522.045Z-"));
        assert_eq!(rendered.len(), "20260111T143522.045Z-".len() + 32);
    }

    #[test]
    fn test_timestamp_id_monotonic_same_instant() {
        let now = Utc.with_ymd_and_hms(2026, 1, 11, 14, 35, 22).unwrap();
        let first = TimestampId::generate_at(now, None);
        let second = TimestampId::generate_at(now, Some(&first));

        assert_eq!(
            second.timestamp(),
            first.timestamp() + Duration::milliseconds(1)
        );
    }

    #[test]
    fn test_timestamp_id_uses_clock_when_ahead() {
        let earlier = Utc.with_ymd_and_hms(2026, 1, 11, 14, 35, 22).unwrap();
        let later = earlier + Duration::seconds(5);
        let first = TimestampId::generate_at(earlier, None);
        let second = TimestampId::generate_at(later, Some(&first));

        assert_eq!(second.timestamp(), later);
    }

    #[test]
    fn test_timestamp_id_round_trip() {
        let id = TimestampId::generate(None);
        let parsed: TimestampId = id.to_string().parse().unwrap();
        assert_eq!(parsed.to_string(), id.to_string());
    }

    #[test]
    fn test_timestamp_id_parse_errors() {
        assert!("no-hyphen-z".parse::<TimestampId>().is_err());
        assert!("20260111T143522.045-550e8400e29b41d4a716446655440000"
            .parse::<TimestampId>()
            .is_err());
        assert!("20260111T143522.045Z-notauuid"
            .parse::<TimestampId>()
            .is_err());
        assert!("2026XX11T143522.045Z-550e8400e29b41d4a716446655440000"
            .parse::<TimestampId>()
            .is_err());
    }

    #[test]
    fn test_timestamp_id_converts_to_record_id() {
        let ts = TimestampId::generate(None);
        let rendered = ts.to_string();
        let record: RecordId = ts.into();
        assert_eq!(record.as_str(), rendered);
    }
}
