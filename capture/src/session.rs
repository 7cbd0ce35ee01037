//! # Scan Session
//!
//! The state of one user-initiated check-in/out attempt, plus the data each
//! stage has produced so far.
//!
//! ```text
//! Idle --start--> AcquiringLocation --ok--> Scanning --decode--> Decoded --> Validating
//! Validating --valid--> Submitting --ok--> Succeeded
//! AcquiringLocation | Scanning | Decoded | Validating | Submitting --fail--> Failed
//! Failed --retry--> AcquiringLocation
//! ```
//!
//! An [`AttendanceSubmission`] can only come out of [`ScanSession::validated`],
//! which needs the location fix recorded earlier in the same attempt. Retrying
//! drops everything the failed attempt collected.

use crate::error::{FailureReason, InvalidTransition};
use crate::types::{AttendanceSubmission, Direction, LocationFix, QrPayload};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq)]
pub enum SessionStatus {
    Idle,
    AcquiringLocation,
    Scanning,
    Decoded,
    Validating,
    Submitting,
    Succeeded,
    Failed(FailureReason),
}

impl SessionStatus {
    pub fn name(&self) -> &'static str {
        match self {
            SessionStatus::Idle => "idle",
            SessionStatus::AcquiringLocation => "acquiring location",
            SessionStatus::Scanning => "scanning",
            SessionStatus::Decoded => "decoded",
            SessionStatus::Validating => "validating",
            SessionStatus::Submitting => "submitting",
            SessionStatus::Succeeded => "succeeded",
            SessionStatus::Failed(_) => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionStatus::Succeeded | SessionStatus::Failed(_))
    }
}

#[derive(Debug, Clone)]
pub struct ScanSession {
    direction: Direction,
    status: SessionStatus,
    attempt: u32,
    location: Option<LocationFix>,
    decoded: Option<String>,
}

impl ScanSession {
    pub fn new(direction: Direction) -> Self {
        Self {
            direction,
            status: SessionStatus::Idle,
            attempt: 0,
            location: None,
            decoded: None,
        }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn status(&self) -> &SessionStatus {
        &self.status
    }

    /// 1 for the first attempt, incremented by every retry.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn location(&self) -> Option<&LocationFix> {
        self.location.as_ref()
    }

    pub fn failure(&self) -> Option<&FailureReason> {
        match &self.status {
            SessionStatus::Failed(reason) => Some(reason),
            _ => None,
        }
    }

    fn reject(&self, event: &'static str) -> InvalidTransition {
        InvalidTransition {
            from: self.status.name(),
            event,
        }
    }

    /// Idle → AcquiringLocation.
    pub fn start(&mut self) -> Result<(), InvalidTransition> {
        if self.status != SessionStatus::Idle {
            return Err(self.reject("start"));
        }
        self.attempt = 1;
        self.status = SessionStatus::AcquiringLocation;
        Ok(())
    }

    /// AcquiringLocation → Scanning, recording the fix for this attempt.
    pub fn location_acquired(&mut self, fix: LocationFix) -> Result<(), InvalidTransition> {
        if self.status != SessionStatus::AcquiringLocation {
            return Err(self.reject("record a location"));
        }
        self.location = Some(fix);
        self.status = SessionStatus::Scanning;
        Ok(())
    }

    /// Scanning → Decoded.
    pub fn decoded(&mut self, text: String) -> Result<(), InvalidTransition> {
        if self.status != SessionStatus::Scanning {
            return Err(self.reject("accept a decode"));
        }
        self.decoded = Some(text);
        self.status = SessionStatus::Decoded;
        Ok(())
    }

    /// Decoded → Validating. Hands the raw text to the validator; it is not kept.
    pub fn begin_validation(&mut self) -> Result<String, InvalidTransition> {
        if self.status != SessionStatus::Decoded {
            return Err(self.reject("validate"));
        }
        let text = self.decoded.take().ok_or_else(|| self.reject("validate"))?;
        self.status = SessionStatus::Validating;
        Ok(text)
    }

    /// Validating → Submitting, building the one submission for this attempt.
    pub fn validated(
        &mut self,
        payload: QrPayload,
        user_id: &str,
        scanned_at: DateTime<Utc>,
    ) -> Result<AttendanceSubmission, InvalidTransition> {
        if self.status != SessionStatus::Validating {
            return Err(self.reject("submit"));
        }
        let location = self.location.ok_or_else(|| self.reject("submit"))?;
        self.status = SessionStatus::Submitting;
        Ok(AttendanceSubmission::new(user_id, scanned_at, location, payload))
    }

    /// Submitting → Succeeded.
    pub fn succeeded(&mut self) -> Result<(), InvalidTransition> {
        if self.status != SessionStatus::Submitting {
            return Err(self.reject("succeed"));
        }
        self.status = SessionStatus::Succeeded;
        Ok(())
    }

    /// Any in-progress status → Failed.
    pub fn fail(&mut self, reason: FailureReason) -> Result<(), InvalidTransition> {
        match self.status {
            SessionStatus::AcquiringLocation
            | SessionStatus::Scanning
            | SessionStatus::Decoded
            | SessionStatus::Validating
            | SessionStatus::Submitting => {
                self.decoded = None;
                self.status = SessionStatus::Failed(reason);
                Ok(())
            }
            _ => Err(self.reject("fail")),
        }
    }

    /// Failed → AcquiringLocation, discarding the previous attempt's data.
    pub fn retry(&mut self) -> Result<(), InvalidTransition> {
        if !matches!(self.status, SessionStatus::Failed(_)) {
            return Err(self.reject("retry"));
        }
        self.location = None;
        self.decoded = None;
        self.attempt += 1;
        self.status = SessionStatus::AcquiringLocation;
        Ok(())
    }
}
