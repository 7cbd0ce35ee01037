//! # Capture Flow
//!
//! Drives a [`ScanSession`] through one attempt:
//!
//! 1. read the signed-in user,
//! 2. acquire a location fix (bounded wait),
//! 3. start the camera and wait for the first decode,
//! 4. validate the decoded text and run the verifier hook,
//! 5. submit once and report the result.
//!
//! Every failure lands in `Failed` with a [`Notice`]. Nothing is retried
//! automatically; [`CaptureFlow::retry`] starts over from step 1 with a fresh
//! location and timestamp.
//!
//! Teardown (explicit, or by dropping the flow) abandons the location and
//! camera stages at once. A submission already on the wire is left to finish,
//! but its result is ignored.

use crate::error::{FailureReason, InvalidTransition, ScannerError, SubmitError};
use crate::location::acquire_location;
use crate::scanner::{ScannerController, ScannerState};
use crate::session::ScanSession;
use crate::traits::camera::Camera;
use crate::traits::context::SessionContextProvider;
use crate::traits::location::LocationProvider;
use crate::traits::submitter::AttendanceSubmitter;
use crate::traits::verifier::PayloadVerifier;
use crate::types::{Direction, Notice, SubmissionReceipt};
use crate::validator::validate_with;
use crate::verifier::AcceptUnsigned;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Timeouts and location options for the device stages.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlowSettings {
    pub location_timeout: Duration,
    pub high_accuracy: bool,
    pub camera_start_timeout: Duration,
}

impl Default for FlowSettings {
    fn default() -> Self {
        Self {
            location_timeout: Duration::from_secs(10),
            high_accuracy: true,
            camera_start_timeout: Duration::from_secs(15),
        }
    }
}

impl FlowSettings {
    pub fn from_config() -> Self {
        Self {
            location_timeout: Duration::from_millis(util::config::location_timeout_ms()),
            high_accuracy: util::config::location_high_accuracy(),
            camera_start_timeout: Duration::from_millis(util::config::camera_start_timeout_ms()),
        }
    }
}

/// How an attempt ended.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Succeeded {
        receipt: SubmissionReceipt,
        notice: Notice,
    },
    Failed {
        reason: FailureReason,
        notice: Notice,
    },
    /// The flow was torn down before the attempt finished.
    TornDown,
}

impl Outcome {
    pub fn notice(&self) -> Option<&Notice> {
        match self {
            Outcome::Succeeded { notice, .. } | Outcome::Failed { notice, .. } => Some(notice),
            Outcome::TornDown => None,
        }
    }
}

/// Cloneable trigger for tearing a flow down from elsewhere (navigation, shutdown).
#[derive(Debug, Clone)]
pub struct TeardownHandle(CancellationToken);

impl TeardownHandle {
    pub fn teardown(&self) {
        self.0.cancel();
    }
}

pub struct CaptureFlow {
    session: ScanSession,
    location: Arc<dyn LocationProvider>,
    scanner: ScannerController,
    submitter: Arc<dyn AttendanceSubmitter>,
    context: Arc<dyn SessionContextProvider>,
    verifier: Box<dyn PayloadVerifier>,
    settings: FlowSettings,
    teardown: CancellationToken,
}

impl CaptureFlow {
    pub fn new(
        direction: Direction,
        location: Arc<dyn LocationProvider>,
        camera: Arc<dyn Camera>,
        submitter: Arc<dyn AttendanceSubmitter>,
        context: Arc<dyn SessionContextProvider>,
    ) -> Self {
        let settings = FlowSettings::default();
        Self {
            session: ScanSession::new(direction),
            location,
            scanner: ScannerController::new(camera, settings.camera_start_timeout),
            submitter,
            context,
            verifier: Box::new(AcceptUnsigned),
            settings,
            teardown: CancellationToken::new(),
        }
    }

    /// Replaces the default accept-all signature hook.
    pub fn with_verifier<V: PayloadVerifier + 'static>(mut self, verifier: V) -> Self {
        self.verifier = Box::new(verifier);
        self
    }

    pub fn with_settings(mut self, settings: FlowSettings) -> Self {
        self.scanner = ScannerController::new(self.scanner.camera(), settings.camera_start_timeout);
        self.settings = settings;
        self
    }

    pub fn session(&self) -> &ScanSession {
        &self.session
    }

    pub fn scanner_state(&self) -> ScannerState {
        self.scanner.state()
    }

    pub fn teardown_handle(&self) -> TeardownHandle {
        TeardownHandle(self.teardown.clone())
    }

    /// Abandons whatever stage is running. Later results are ignored.
    pub fn teardown(&self) {
        self.teardown.cancel();
    }

    /// Runs the first attempt. Only valid on a fresh flow.
    pub async fn run(&mut self) -> Result<Outcome, InvalidTransition> {
        self.session.start()?;
        self.attempt().await
    }

    /// Runs another attempt after a failure, starting again at location acquisition.
    pub async fn retry(&mut self) -> Result<Outcome, InvalidTransition> {
        self.session.retry()?;
        info!(attempt = self.session.attempt(), "retrying");
        self.attempt().await
    }

    fn failed(&mut self, reason: FailureReason) -> Result<Outcome, InvalidTransition> {
        warn!(
            direction = %self.session.direction(),
            attempt = self.session.attempt(),
            stage = self.session.status().name(),
            error = %reason,
            "attempt failed"
        );
        self.session.fail(reason.clone())?;
        Ok(Outcome::Failed {
            notice: reason.notice(),
            reason,
        })
    }

    async fn attempt(&mut self) -> Result<Outcome, InvalidTransition> {
        let teardown = self.teardown.clone();
        if teardown.is_cancelled() {
            return Ok(Outcome::TornDown);
        }
        let direction = self.session.direction();

        let context = match self.context.current() {
            Ok(context) => context,
            Err(e) => return self.failed(e.into()),
        };

        let fix = tokio::select! {
            biased;
            _ = teardown.cancelled() => return Ok(Outcome::TornDown),
            fix = acquire_location(
                self.location.as_ref(),
                self.settings.location_timeout,
                self.settings.high_accuracy,
            ) => fix,
        };
        let fix = match fix {
            Ok(fix) => fix,
            Err(e) => return self.failed(e.into()),
        };
        self.session.location_acquired(fix)?;

        let (decode_tx, decode_rx) = oneshot::channel();
        let started = tokio::select! {
            biased;
            _ = teardown.cancelled() => return Ok(Outcome::TornDown),
            started = self.scanner.start(
                move |text| {
                    let _ = decode_tx.send(text);
                },
                |_| {},
            ) => started,
        };
        let handle = match started {
            Ok(handle) => handle,
            Err(e) => return self.failed(e.into()),
        };

        let decoded = tokio::select! {
            biased;
            _ = teardown.cancelled() => {
                handle.stop().await;
                return Ok(Outcome::TornDown);
            }
            decoded = decode_rx => decoded,
        };
        handle.stop().await;
        let text = match decoded {
            Ok(text) => text,
            Err(_) => return self.failed(ScannerError::StreamEnded.into()),
        };

        self.session.decoded(text)?;
        let text = self.session.begin_validation()?;
        let scanned_at = Utc::now();
        let payload = match validate_with(&text, scanned_at, self.verifier.as_ref()) {
            Ok(payload) => payload,
            Err(e) => return self.failed(e.into()),
        };
        info!(station = payload.station_id(), "payload valid");

        let submission = self
            .session
            .validated(payload, &context.user.user_id, scanned_at)?;

        if teardown.is_cancelled() {
            info!("torn down before submission; nothing sent");
            return Ok(Outcome::TornDown);
        }
        let submitter = self.submitter.clone();
        let in_flight =
            tokio::spawn(async move { submitter.submit(direction, &submission).await });
        let result = tokio::select! {
            biased;
            _ = teardown.cancelled() => {
                info!("torn down during submission; result will be ignored");
                return Ok(Outcome::TornDown);
            }
            joined = in_flight => joined
                .unwrap_or_else(|e| Err(SubmitError::Network(e.to_string()))),
        };

        match result {
            Ok(receipt) => {
                self.session.succeeded()?;
                let notice = success_notice(direction, &receipt);
                info!(%direction, "attendance recorded");
                Ok(Outcome::Succeeded { receipt, notice })
            }
            Err(e) => self.failed(e.into()),
        }
    }

    /// Ends the flow, releasing anything still held, and logs how it finished.
    pub fn close(self) {
        info!(
            direction = %self.session.direction(),
            attempts = self.session.attempt(),
            status = self.session.status().name(),
            "capture session closed"
        );
    }
}

impl Drop for CaptureFlow {
    fn drop(&mut self) {
        self.teardown.cancel();
    }
}

fn success_notice(direction: Direction, receipt: &SubmissionReceipt) -> Notice {
    let title = format!("{direction} recorded");
    let message = match (&receipt.location_label, &receipt.timestamp) {
        (Some(place), Some(at)) => format!("{place} at {at}"),
        (Some(place), None) => place.clone(),
        _ => receipt
            .message
            .clone()
            .unwrap_or_else(|| "Your attendance has been saved.".into()),
    };
    Notice::new(title, message)
}
