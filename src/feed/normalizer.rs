//! Outcome normalizer.
//!
//! Converts loosely-shaped feed records into canonical [`Outcome`]s.
//! Each field is looked up through a fixed, ordered list of key aliases;
//! the first alias present wins. Parsing never guesses: a color string
//! that matches no known spelling is a hard failure.

use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use tracing::debug;

use crate::types::{Color, Outcome};

/// Color key aliases, in priority order.
pub const COLOR_KEYS: &[&str] = &["color", "cor", "colour"];
/// Number key aliases, in priority order.
pub const NUMBER_KEYS: &[&str] = &["roll", "number", "numero", "value"];
/// Timestamp key aliases, in priority order.
pub const TIMESTAMP_KEYS: &[&str] = &["created_at", "timestamp", "time"];

const RED_MARKERS: &[&str] = &["red", "vermelho", "🔴"];
const BLACK_MARKERS: &[&str] = &["black", "preto", "⚫", "⬛"];
const ZERO_MARKERS: &[&str] = &["green", "verde", "zero", "🟢"];

/// Unix timestamps above this are taken to be milliseconds.
const MILLIS_CUTOFF: i64 = 100_000_000_000;

/// Why a single record could not be normalized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NormalizeError {
    #[error("record is not a JSON object")]
    NotAnObject,

    #[error("unrecognised color string: {0:?}")]
    UnknownColor(String),

    #[error("unrecognised color code: {0}")]
    InvalidColorCode(i64),

    #[error("record carries neither a color nor a number")]
    Unresolvable,
}

/// Normalize one raw feed record.
///
/// The color is taken from the first color alias present; if none is
/// present it is derived from the number (0 zero, 1–7 red, 8–14 black).
pub fn normalize(raw: &Value) -> Result<Outcome, NormalizeError> {
    let record = raw.as_object().ok_or(NormalizeError::NotAnObject)?;

    let number = NUMBER_KEYS
        .iter()
        .find_map(|k| record.get(*k))
        .and_then(parse_number);

    let color = match COLOR_KEYS.iter().find_map(|k| record.get(*k)) {
        Some(v) => Some(parse_color(v)?),
        None => None,
    };

    let color = match (color, number) {
        (Some(c), _) => c,
        (None, Some(n)) => Color::from_number(n),
        (None, None) => return Err(NormalizeError::Unresolvable),
    };

    let number = if color == Color::Zero { Some(0) } else { number };

    let source_time = TIMESTAMP_KEYS
        .iter()
        .find_map(|k| record.get(*k))
        .and_then(parse_timestamp);

    let id = record.get("id").and_then(|v| match v {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    });

    Ok(Outcome {
        id,
        color,
        number,
        timestamp: source_time.unwrap_or_else(Utc::now),
        ingested: source_time.is_none(),
    })
}

/// Normalize a batch, preserving feed order and dropping records that
/// fail. Never errors.
pub fn normalize_batch(raw: &[Value]) -> Vec<Outcome> {
    raw.iter()
        .enumerate()
        .filter_map(|(i, r)| match normalize(r) {
            Ok(o) => Some(o),
            Err(e) => {
                debug!(index = i, error = %e, "Dropping unparseable record");
                None
            }
        })
        .collect()
}

fn parse_color(value: &Value) -> Result<Color, NormalizeError> {
    match value {
        Value::Number(n) => {
            let code = n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
                .ok_or_else(|| NormalizeError::UnknownColor(n.to_string()))?;
            Color::from_code(code).ok_or(NormalizeError::InvalidColorCode(code))
        }
        Value::String(s) => parse_color_str(s),
        other => Err(NormalizeError::UnknownColor(other.to_string())),
    }
}

fn parse_color_str(s: &str) -> Result<Color, NormalizeError> {
    let trimmed = s.trim();
    if let Ok(code) = trimmed.parse::<i64>() {
        return Color::from_code(code).ok_or(NormalizeError::InvalidColorCode(code));
    }

    let lower = trimmed.to_lowercase();
    let has = |markers: &[&str]| markers.iter().any(|m| lower.contains(m));

    if has(RED_MARKERS) {
        Ok(Color::Red)
    } else if has(BLACK_MARKERS) {
        Ok(Color::Black)
    } else if has(ZERO_MARKERS) {
        Ok(Color::Zero)
    } else {
        Err(NormalizeError::UnknownColor(s.to_string()))
    }
}

fn parse_number(value: &Value) -> Option<u8> {
    let n = match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))?,
        Value::String(s) => s.trim().parse::<i64>().ok()?,
        _ => return None,
    };
    u8::try_from(n).ok()
}

fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s.trim())
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Value::Number(n) => {
            let raw = n.as_i64()?;
            if raw > MILLIS_CUTOFF {
                Utc.timestamp_millis_opt(raw).single()
            } else {
                Utc.timestamp_opt(raw, 0).single()
            }
        }
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
