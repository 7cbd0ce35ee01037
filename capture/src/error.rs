//! Capture Error Types
//!
//! Every stage of the capture flow has its own error enum so each contract
//! stays narrow: [`LocationError`], [`ScannerError`], [`PayloadError`],
//! [`SubmitError`] and [`ContextError`]. The flow folds all of them into a
//! single [`FailureReason`], which is what a failed session carries and what
//! gets turned into the one [`Notice`] shown to the user.
//!
//! None of these are fatal. A failed session can always be retried.

use crate::types::Notice;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Failures of the Location Acquirer.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LocationError {
    #[error("location permission denied")]
    PermissionDenied,

    #[error("position unavailable: {0}")]
    PositionUnavailable(String),

    #[error("no position within {0:?}")]
    Timeout(Duration),

    #[error("geolocation is not supported on this device")]
    Unsupported,
}

/// Failures of the Scanner Controller. Per-frame misses are not errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScannerError {
    #[error("camera permission denied")]
    PermissionDenied,

    #[error("camera device error: {0}")]
    Device(String),

    #[error("camera did not start within {0:?}")]
    StartTimeout(Duration),

    #[error("camera stream ended before a code was read")]
    StreamEnded,

    #[error("scanner is already running")]
    Busy,
}

/// Failures of the Payload Validator.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PayloadError {
    #[error("QR content is not a JSON object: {0}")]
    MalformedJson(String),

    #[error("QR content is missing `{0}`")]
    MissingField(&'static str),

    #[error("QR field `{field}` is invalid: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("QR code expired at {0}")]
    Expired(DateTime<Utc>),

    #[error("QR signature rejected: {0}")]
    SignatureRejected(String),
}

/// Failures of the Submission Client.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SubmitError {
    #[error("network error: {0}")]
    Network(String),

    #[error("server rejected attendance: {0}")]
    ServerRejected(String),

    #[error("no credentials for request: {0}")]
    NotSignedIn(String),
}

impl From<reqwest::Error> for SubmitError {
    fn from(e: reqwest::Error) -> Self {
        SubmitError::Network(e.to_string())
    }
}

/// Failures reading the app session (signed-in user and token).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ContextError {
    #[error("no signed-in user")]
    NotSignedIn,

    #[error("session store unreadable: {0}")]
    Unreadable(String),
}

/// Why a scan session ended in `Failed`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FailureReason {
    #[error("location permission denied")]
    PermissionDenied,

    #[error("position unavailable: {0}")]
    PositionUnavailable(String),

    #[error("location timed out after {0:?}")]
    LocationTimeout(Duration),

    #[error("geolocation unsupported")]
    GeolocationUnsupported,

    #[error("camera permission denied")]
    CameraPermissionDenied,

    #[error("camera error: {0}")]
    CameraDeviceError(String),

    #[error("malformed QR payload: {0}")]
    MalformedPayload(String),

    #[error("QR payload missing `{0}`")]
    MissingPayloadField(&'static str),

    #[error("QR payload field `{field}` invalid: {reason}")]
    InvalidPayloadField { field: &'static str, reason: String },

    #[error("QR payload expired at {0}")]
    ExpiredPayload(DateTime<Utc>),

    #[error("QR signature rejected: {0}")]
    SignatureRejected(String),

    #[error("network error: {0}")]
    NetworkError(String),

    #[error("server rejected: {0}")]
    ServerRejected(String),

    #[error("not signed in: {0}")]
    NotSignedIn(String),
}

impl From<LocationError> for FailureReason {
    fn from(e: LocationError) -> Self {
        match e {
            LocationError::PermissionDenied => FailureReason::PermissionDenied,
            LocationError::PositionUnavailable(m) => FailureReason::PositionUnavailable(m),
            LocationError::Timeout(d) => FailureReason::LocationTimeout(d),
            LocationError::Unsupported => FailureReason::GeolocationUnsupported,
        }
    }
}

impl From<ScannerError> for FailureReason {
    fn from(e: ScannerError) -> Self {
        match e {
            ScannerError::PermissionDenied => FailureReason::CameraPermissionDenied,
            other => FailureReason::CameraDeviceError(other.to_string()),
        }
    }
}

impl From<PayloadError> for FailureReason {
    fn from(e: PayloadError) -> Self {
        match e {
            PayloadError::MalformedJson(m) => FailureReason::MalformedPayload(m),
            PayloadError::MissingField(f) => FailureReason::MissingPayloadField(f),
            PayloadError::InvalidField { field, reason } => {
                FailureReason::InvalidPayloadField { field, reason }
            }
            PayloadError::Expired(at) => FailureReason::ExpiredPayload(at),
            PayloadError::SignatureRejected(m) => FailureReason::SignatureRejected(m),
        }
    }
}

impl From<SubmitError> for FailureReason {
    fn from(e: SubmitError) -> Self {
        match e {
            SubmitError::Network(m) => FailureReason::NetworkError(m),
            SubmitError::ServerRejected(m) => FailureReason::ServerRejected(m),
            SubmitError::NotSignedIn(m) => FailureReason::NotSignedIn(m),
        }
    }
}

impl From<ContextError> for FailureReason {
    fn from(e: ContextError) -> Self {
        FailureReason::NotSignedIn(e.to_string())
    }
}

impl FailureReason {
    /// The notification shown to the user for this failure.
    pub fn notice(&self) -> Notice {
        match self {
            FailureReason::PermissionDenied => Notice::new(
                "Location access denied",
                "Allow location access for this app, then try again.",
            ),
            FailureReason::PositionUnavailable(_) => Notice::new(
                "Location unavailable",
                "Your position could not be determined. Move to an open area and try again.",
            ),
            FailureReason::LocationTimeout(_) => Notice::new(
                "Location timed out",
                "Finding your position took too long. Please try again.",
            ),
            FailureReason::GeolocationUnsupported => Notice::new(
                "Location not supported",
                "This device cannot provide a location, so attendance cannot be recorded here.",
            ),
            FailureReason::CameraPermissionDenied => Notice::new(
                "Camera access denied",
                "Allow camera access for this app, then try again.",
            ),
            FailureReason::CameraDeviceError(m) => Notice::new("Camera error", m.clone()),
            FailureReason::MalformedPayload(_) | FailureReason::InvalidPayloadField { .. } => {
                Notice::new("Invalid QR code", "This is not a station attendance code.")
            }
            FailureReason::MissingPayloadField(field) => Notice::new(
                "Invalid QR code",
                format!("The code is incomplete (missing {field})."),
            ),
            FailureReason::ExpiredPayload(_) => Notice::new(
                "QR code expired",
                "This code has expired. Scan the current code on the station screen.",
            ),
            FailureReason::SignatureRejected(_) => Notice::new(
                "Invalid QR code",
                "This code was not issued by a trusted station.",
            ),
            FailureReason::NetworkError(_) => Notice::new(
                "Connection problem",
                "Attendance could not be sent. Check your connection and try again.",
            ),
            FailureReason::ServerRejected(m) => Notice::new("Attendance failed", m.clone()),
            FailureReason::NotSignedIn(_) => {
                Notice::new("Not signed in", "Sign in again before recording attendance.")
            }
        }
    }

    /// True for failures raised before the camera was ever started.
    pub fn is_location_failure(&self) -> bool {
        matches!(
            self,
            FailureReason::PermissionDenied
                | FailureReason::PositionUnavailable(_)
                | FailureReason::LocationTimeout(_)
                | FailureReason::GeolocationUnsupported
        )
    }
}

/// A session event that is not allowed from the current status.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot {event} while {from}")]
pub struct InvalidTransition {
    pub from: &'static str,
    pub event: &'static str,
}
