//! Core data types shared by every stage of the capture flow.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;

/// Which way the staff member is moving through the station.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    CheckIn,
    CheckOut,
}

impl Direction {
    pub fn label(self) -> &'static str {
        match self {
            Direction::CheckIn => "Check-in",
            Direction::CheckOut => "Check-out",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A single geolocation reading. Immutable once captured.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocationFix {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: Option<f64>,
}

impl LocationFix {
    pub fn new(latitude: f64, longitude: f64, accuracy: Option<f64>) -> Self {
        Self {
            latitude,
            longitude,
            accuracy,
        }
    }

    /// True when both coordinates are finite and inside the WGS84 ranges.
    pub fn is_plausible(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// Only the coordinates go over the wire; accuracy stays on the device.
impl Serialize for LocationFix {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut s = serializer.serialize_struct("LocationFix", 2)?;
        s.serialize_field("latitude", &self.latitude)?;
        s.serialize_field("longitude", &self.longitude)?;
        s.end()
    }
}

/// The decoded content of a station QR code.
///
/// Only [`crate::validator::validate`] builds one, so holding a `QrPayload`
/// means the required fields were present and the code had not expired when
/// it was checked. The full decoded object is kept so unknown fields reach the
/// server untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct QrPayload {
    station_id: String,
    expired_at: DateTime<Utc>,
    signature: String,
    fields: Map<String, Value>,
}

impl QrPayload {
    pub(crate) fn new(
        station_id: String,
        expired_at: DateTime<Utc>,
        signature: String,
        fields: Map<String, Value>,
    ) -> Self {
        Self {
            station_id,
            expired_at,
            signature,
            fields,
        }
    }

    pub fn station_id(&self) -> &str {
        &self.station_id
    }

    pub fn expired_at(&self) -> DateTime<Utc> {
        self.expired_at
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// Raw value of `expiredAt` exactly as it appeared in the code.
    pub fn raw_expired_at(&self) -> Option<&Value> {
        self.fields.get("expiredAt")
    }

    /// Every field of the decoded object, including the ones the client does not interpret.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }
}

impl Serialize for QrPayload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.fields.serialize(serializer)
    }
}

/// The signed-in staff member, as stored by the surrounding app after login.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    #[serde(deserialize_with = "string_or_number")]
    pub user_id: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Accepts `"42"` as well as `42`; older sign-in responses stored numeric ids.
fn string_or_number<'de, D: serde::Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, found {other}"
        ))),
    }
}

fn opt_text<'de, D: serde::Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

impl UserRecord {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// User plus bearer token; everything the submission needs from the app session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionContext {
    pub user: UserRecord,
    pub token: String,
}

/// Request body for the attendance endpoint.
///
/// Fields are private so the only way to get one is [`AttendanceSubmission::new`],
/// which needs a location fix and a validated payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceSubmission {
    user_id: String,
    #[serde(serialize_with = "rfc3339_millis")]
    scanned_at: DateTime<Utc>,
    location: LocationFix,
    qr_data: QrPayload,
}

fn rfc3339_millis<S: Serializer>(at: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&at.to_rfc3339_opts(SecondsFormat::Millis, true))
}

impl AttendanceSubmission {
    pub fn new(
        user_id: impl Into<String>,
        scanned_at: DateTime<Utc>,
        location: LocationFix,
        qr_data: QrPayload,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            scanned_at,
            location,
            qr_data,
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn scanned_at(&self) -> DateTime<Utc> {
        self.scanned_at
    }

    pub fn location(&self) -> &LocationFix {
        &self.location
    }

    pub fn qr_data(&self) -> &QrPayload {
        &self.qr_data
    }
}

/// Parsed success response from the attendance endpoint.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionReceipt {
    #[serde(default, deserialize_with = "opt_text")]
    pub location_label: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    pub terminal_id: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    pub timestamp: Option<String>,
    #[serde(skip)]
    pub message: Option<String>,
}

/// Title and message shown to the user for a finished attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub message: String,
}

impl Notice {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.title, self.message)
    }
}
