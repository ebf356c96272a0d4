// Vital reading, sleep posture and the validated parse from raw store rows

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Sleep posture. The three fixed categories plus anything else the sensor reports.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Posture {
    Right,
    Left,
    Supine,
    /// Unrecognized label; kept verbatim so it can be flagged and displayed.
    Other(String),
}

impl Posture {
    /// Fixed category order used by the distribution.
    pub const CATEGORIES: [Posture; 3] = [Posture::Right, Posture::Left, Posture::Supine];

    /// Parse a sensor label. "Supine Position" is the label the posture model emits.
    pub fn from_label(s: &str) -> Self {
        match s {
            "Right" => Posture::Right,
            "Left" => Posture::Left,
            "Supine" | "Supine Position" => Posture::Supine,
            other => Posture::Other(other.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Posture::Right => "Right",
            Posture::Left => "Left",
            Posture::Supine => "Supine",
            Posture::Other(s) => s,
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, Posture::Other(_))
    }
}

impl From<String> for Posture {
    fn from(s: String) -> Self {
        Posture::from_label(&s)
    }
}

impl From<Posture> for String {
    fn from(p: Posture) -> Self {
        match p {
            Posture::Other(s) => s,
            known => known.label().to_string(),
        }
    }
}

impl std::fmt::Display for Posture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One timestamped snapshot of the patient's vitals. Any measurement may be absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VitalReading {
    pub recorded_at: DateTime<Utc>,
    #[serde(default)]
    pub temperature_c: Option<f64>,
    #[serde(default)]
    pub heart_rate_bpm: Option<u32>,
    #[serde(default)]
    pub spo2_percent: Option<f64>,
    #[serde(default)]
    pub posture: Option<Posture>,
}

/// Rejection reasons for a raw reading row.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("reading must be a JSON object")]
    NotAnObject,
    #[error("missing timestamp (recorded_at or last_updated_at)")]
    MissingTimestamp,
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),
    #[error("invalid {field}: {reason}")]
    InvalidField {
        field: &'static str,
        reason: String,
    },
}

impl ParseError {
    fn field(field: &'static str, reason: impl Into<String>) -> Self {
        ParseError::InvalidField {
            field,
            reason: reason.into(),
        }
    }
}

impl VitalReading {
    /// Reading with only a timestamp; fields are filled in by the caller.
    pub fn at(recorded_at: DateTime<Utc>) -> Self {
        Self {
            recorded_at,
            temperature_c: None,
            heart_rate_bpm: None,
            spo2_percent: None,
            posture: None,
        }
    }

    /// True when all four measurements are absent ("no data").
    pub fn is_empty(&self) -> bool {
        self.temperature_c.is_none()
            && self.heart_rate_bpm.is_none()
            && self.spo2_percent.is_none()
            && self.posture.is_none()
    }

    /// Parse a row as the store returns it (`recorded_at` / `last_updated_at`, `temperature`,
    /// `heart_rate`, `spo2`, `position`). `null` and missing keys are absent values;
    /// anything of the wrong shape is rejected.
    pub fn parse(raw: &Value) -> Result<Self, ParseError> {
        let obj = raw.as_object().ok_or(ParseError::NotAnObject)?;

        let ts = obj
            .get("recorded_at")
            .filter(|v| !v.is_null())
            .or_else(|| obj.get("last_updated_at").filter(|v| !v.is_null()))
            .ok_or(ParseError::MissingTimestamp)?;
        let recorded_at = parse_timestamp(ts)?;

        let temperature_c = match present(obj.get("temperature")) {
            None => None,
            Some(v) => {
                let t = v
                    .as_f64()
                    .ok_or_else(|| ParseError::field("temperature", "not a number"))?;
                if !t.is_finite() {
                    return Err(ParseError::field("temperature", "not finite"));
                }
                Some(t)
            }
        };

        let heart_rate_bpm = match present(obj.get("heart_rate")) {
            None => None,
            Some(v) => Some(parse_heart_rate(v)?),
        };

        let spo2_percent = match present(obj.get("spo2")) {
            None => None,
            Some(v) => {
                let s = v
                    .as_f64()
                    .ok_or_else(|| ParseError::field("spo2", "not a number"))?;
                if !(0.0..=100.0).contains(&s) {
                    return Err(ParseError::field("spo2", format!("{} outside 0..=100", s)));
                }
                Some(s)
            }
        };

        let posture = match present(obj.get("position")) {
            None => None,
            Some(v) => {
                let s = v
                    .as_str()
                    .ok_or_else(|| ParseError::field("position", "not a string"))?;
                if s.trim().is_empty() {
                    return Err(ParseError::field("position", "empty"));
                }
                Some(Posture::from_label(s))
            }
        };

        Ok(Self {
            recorded_at,
            temperature_c,
            heart_rate_bpm,
            spo2_percent,
            posture,
        })
    }
}

fn present(v: Option<&Value>) -> Option<&Value> {
    v.filter(|v| !v.is_null())
}

fn parse_timestamp(v: &Value) -> Result<DateTime<Utc>, ParseError> {
    if let Some(s) = v.as_str() {
        return DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| ParseError::InvalidTimestamp(format!("{}: {}", s, e)));
    }
    if let Some(ms) = v.as_i64() {
        return Utc
            .timestamp_millis_opt(ms)
            .single()
            .ok_or_else(|| ParseError::InvalidTimestamp(format!("{} out of range", ms)));
    }
    Err(ParseError::InvalidTimestamp(
        "expected RFC 3339 string or epoch milliseconds".into(),
    ))
}

fn parse_heart_rate(v: &Value) -> Result<u32, ParseError> {
    if let Some(n) = v.as_u64() {
        return u32::try_from(n).map_err(|_| ParseError::field("heart_rate", "too large"));
    }
    match v.as_f64() {
        Some(f) if f < 0.0 => Err(ParseError::field("heart_rate", "negative")),
        Some(f) if f.fract() == 0.0 && f <= u32::MAX as f64 => Ok(f as u32),
        Some(_) => Err(ParseError::field("heart_rate", "not a whole number")),
        None => Err(ParseError::field("heart_rate", "not a number")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn posture_labels_roundtrip() {
        assert_eq!(Posture::from_label("Supine Position"), Posture::Supine);
        assert_eq!(String::from(Posture::Supine), "Supine");
        assert_eq!(
            Posture::from_label("Prone"),
            Posture::Other("Prone".to_string())
        );
        assert!(!Posture::from_label("Prone").is_recognized());
    }

    #[test]
    fn heart_rate_accepts_whole_floats() {
        assert_eq!(parse_heart_rate(&serde_json::json!(72.0)), Ok(72));
        assert!(parse_heart_rate(&serde_json::json!(72.5)).is_err());
        assert!(parse_heart_rate(&serde_json::json!(-1)).is_err());
    }
}
