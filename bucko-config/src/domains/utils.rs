//! Serde helpers shared by the configuration domains

use serde::{Deserialize, Deserializer, Serializer};
use std::time::Duration;

/// Durations are written as whole seconds, or as `"<n>ms"` when they carry a
/// sub-second part. They are read from either a number of seconds or a
/// string such as `"30s"`, `"1500ms"` or `"2m"`.
pub mod serde_duration {
    use super::*;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawDuration {
        Seconds(u64),
        Text(String),
    }

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if duration.subsec_nanos() == 0 {
            serializer.serialize_u64(duration.as_secs())
        } else {
            serializer.serialize_str(&format!("{}ms", duration.as_millis()))
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        match RawDuration::deserialize(deserializer)? {
            RawDuration::Seconds(seconds) => Ok(Duration::from_secs(seconds)),
            RawDuration::Text(text) => parse_duration(&text).map_err(serde::de::Error::custom),
        }
    }
}

/// Parse a duration with an optional `ms`, `s` or `m` suffix. A bare number
/// is seconds.
pub fn parse_duration(text: &str) -> Result<Duration, String> {
    let text = text.trim();
    let (digits, unit) = match text.find(|c: char| !c.is_ascii_digit()) {
        Some(idx) => text.split_at(idx),
        None => (text, "s"),
    };

    let value: u64 = digits
        .parse()
        .map_err(|_| format!("invalid duration '{}'", text))?;

    match unit.trim() {
        "ms" => Ok(Duration::from_millis(value)),
        "s" | "" => Ok(Duration::from_secs(value)),
        "m" => value
            .checked_mul(60)
            .map(Duration::from_secs)
            .ok_or_else(|| format!("duration '{}' is too large", text)),
        other => Err(format!("unknown duration unit '{}' in '{}'", other, text)),
    }
}

/// Default functions for serde
pub fn default_true() -> bool {
    true
}

pub fn default_false() -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration_units() {
        assert_eq!(parse_duration("30").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_duration("30s").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_duration("1500ms").unwrap(), Duration::from_millis(1500));
        assert_eq!(parse_duration("2m").unwrap(), Duration::from_secs(120));
        assert!(parse_duration("soon").is_err());
        assert!(parse_duration("5h").is_err());
    }

    #[test]
    fn test_parse_duration_rejects_overflowing_minutes() {
        let err = parse_duration("307445734561825861m").unwrap_err();
        assert!(err.contains("too large"));
        assert_eq!(
            parse_duration("307445734561825860m").unwrap(),
            Duration::from_secs(307445734561825860 * 60)
        );
    }

    #[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
    struct Timed {
        #[serde(with = "serde_duration")]
        after: Duration,
    }

    #[test]
    fn test_serde_duration_keeps_milliseconds() {
        let timed = Timed {
            after: Duration::from_millis(1500),
        };
        let yaml = serde_yaml::to_string(&timed).unwrap();
        assert!(yaml.contains("1500ms"));
        assert_eq!(serde_yaml::from_str::<Timed>(&yaml).unwrap(), timed);

        let whole = Timed {
            after: Duration::from_secs(30),
        };
        let json = serde_json::to_string(&whole).unwrap();
        assert_eq!(json, r#"{"after":30}"#);
        assert_eq!(serde_json::from_str::<Timed>(&json).unwrap(), whole);
    }
}
