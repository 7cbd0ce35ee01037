//! # Payload Validator
//!
//! Turns decoded QR text into a [`QrPayload`], or says why it cannot.
//!
//! Checks, in order:
//! 1. the text is a JSON object (`MalformedJson`),
//! 2. `stationId`, `expiredAt`, `signature` are present, reported in that
//!    order (`MissingField`); `null` and `""` count as absent,
//! 3. the fields have usable types and `expiredAt` is a timestamp (`InvalidField`),
//! 4. `expiredAt` is not strictly before now (`Expired`).
//!
//! The signature is only checked for presence here. Anything stronger goes
//! through a [`PayloadVerifier`].

use crate::error::PayloadError;
use crate::traits::verifier::PayloadVerifier;
use crate::types::QrPayload;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;

pub const STATION_ID: &str = "stationId";
pub const EXPIRED_AT: &str = "expiredAt";
pub const SIGNATURE: &str = "signature";

const REQUIRED: [&str; 3] = [STATION_ID, EXPIRED_AT, SIGNATURE];

/// Validates against the current time.
pub fn validate(decoded: &str) -> Result<QrPayload, PayloadError> {
    validate_at(decoded, Utc::now())
}

/// Validates, then runs `verifier` on the result.
pub fn validate_with(
    decoded: &str,
    now: DateTime<Utc>,
    verifier: &dyn PayloadVerifier,
) -> Result<QrPayload, PayloadError> {
    let payload = validate_at(decoded, now)?;
    verifier.verify(&payload)?;
    Ok(payload)
}

/// Validates with an explicit notion of "now".
pub fn validate_at(decoded: &str, now: DateTime<Utc>) -> Result<QrPayload, PayloadError> {
    let value: Value =
        serde_json::from_str(decoded).map_err(|e| PayloadError::MalformedJson(e.to_string()))?;
    let Value::Object(fields) = value else {
        return Err(PayloadError::MalformedJson("expected a JSON object".into()));
    };

    for name in REQUIRED {
        if is_absent(fields.get(name)) {
            return Err(PayloadError::MissingField(name));
        }
    }

    let station_id = match &fields[STATION_ID] {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        other => return Err(invalid(STATION_ID, format!("unexpected {}", kind(other)))),
    };
    let signature = match &fields[SIGNATURE] {
        Value::String(s) => s.clone(),
        other => return Err(invalid(SIGNATURE, format!("unexpected {}", kind(other)))),
    };
    let expired_at = parse_timestamp(&fields[EXPIRED_AT])?;

    if expired_at < now {
        return Err(PayloadError::Expired(expired_at));
    }

    Ok(QrPayload::new(station_id, expired_at, signature, fields))
}

fn is_absent(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(_) => false,
    }
}

fn invalid(field: &'static str, reason: String) -> PayloadError {
    PayloadError::InvalidField { field, reason }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Accepts RFC 3339, a naive ISO-8601 date-time taken as UTC, or epoch milliseconds.
fn parse_timestamp(value: &Value) -> Result<DateTime<Utc>, PayloadError> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Ok(dt.with_timezone(&Utc));
            }
            ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                .map(|naive| naive.and_utc())
                .ok_or_else(|| invalid(EXPIRED_AT, format!("{s:?} is not a timestamp")))
        }
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
            .ok_or_else(|| invalid(EXPIRED_AT, format!("{n} is out of range"))),
        other => Err(invalid(EXPIRED_AT, format!("unexpected {}", kind(other)))),
    }
}
