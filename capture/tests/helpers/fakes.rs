use async_trait::async_trait;
use capture::error::{LocationError, ScannerError, SubmitError};
use capture::traits::camera::{Camera, Frame};
use capture::traits::location::{LocationProvider, PositionOptions};
use capture::traits::submitter::AttendanceSubmitter;
use capture::types::{
    AttendanceSubmission, Direction, LocationFix, SessionContext, SubmissionReceipt, UserRecord,
};
use chrono::{DateTime, Utc};
use serde_json::Map;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{Notify, mpsc};

/// Signed-in context for user `u-42` with token `tok`.
pub fn signed_in() -> SessionContext {
    SessionContext {
        user: UserRecord {
            user_id: "u-42".into(),
            first_name: "Siti".into(),
            last_name: "Rahma".into(),
            extra: Map::new(),
        },
        token: "tok".into(),
    }
}

/// QR text as printed by a station.
pub fn station_code(station_id: &str, expired_at: DateTime<Utc>, signature: &str) -> String {
    format!(
        r#"{{"stationId":"{station_id}","expiredAt":"{}","signature":"{signature}"}}"#,
        expired_at.to_rfc3339()
    )
}

pub struct FakeLocation {
    result: Result<LocationFix, LocationError>,
    hang: bool,
    calls: AtomicUsize,
}

impl FakeLocation {
    pub fn at(latitude: f64, longitude: f64) -> Self {
        Self {
            result: Ok(LocationFix::new(latitude, longitude, Some(15.0))),
            hang: false,
            calls: AtomicUsize::new(0),
        }
    }

    /// Never answers, like a platform stuck waiting for a permission prompt.
    pub fn hanging() -> Self {
        Self {
            hang: true,
            ..Self::at(0.0, 0.0)
        }
    }

    pub fn failing(err: LocationError) -> Self {
        Self {
            result: Err(err),
            hang: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LocationProvider for FakeLocation {
    async fn current_position(
        &self,
        _options: PositionOptions,
    ) -> Result<LocationFix, LocationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.hang {
            std::future::pending::<()>().await;
        }
        self.result.clone()
    }
}

/// Camera that plays one script of frames per start and then stays open.
#[derive(Default)]
pub struct FakeCamera {
    scripts: Mutex<VecDeque<Vec<Frame>>>,
    fail_with: Mutex<Option<ScannerError>>,
    hang: bool,
    held: Mutex<Option<mpsc::Sender<Frame>>>,
    starts: AtomicUsize,
    stops: AtomicUsize,
}

impl FakeCamera {
    pub fn showing(frames: Vec<Frame>) -> Self {
        Self::with_scripts(vec![frames])
    }

    pub fn with_scripts(scripts: Vec<Vec<Frame>>) -> Self {
        Self {
            scripts: Mutex::new(scripts.into()),
            ..Default::default()
        }
    }

    pub fn failing(err: ScannerError) -> Self {
        Self {
            fail_with: Mutex::new(Some(err)),
            ..Default::default()
        }
    }

    pub fn hanging() -> Self {
        Self {
            hang: true,
            ..Default::default()
        }
    }

    /// Lets the next start succeed and play `frames`.
    pub fn recover_with(&self, frames: Vec<Frame>) {
        self.fail_with.lock().unwrap().take();
        self.scripts.lock().unwrap().push_back(frames);
    }

    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Camera for FakeCamera {
    async fn start(&self, frames: mpsc::Sender<Frame>) -> Result<(), ScannerError> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        if self.hang {
            std::future::pending::<()>().await;
        }
        if let Some(err) = self.fail_with.lock().unwrap().clone() {
            return Err(err);
        }

        let script = self.scripts.lock().unwrap().pop_front().unwrap_or_default();
        *self.held.lock().unwrap() = Some(frames.clone());
        tokio::spawn(async move {
            for frame in script {
                if frames.send(frame).await.is_err() {
                    break;
                }
            }
        });
        Ok(())
    }

    async fn stop(&self) {
        self.held.lock().unwrap().take();
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}

/// Records every submission and answers from a queue (success when empty).
#[derive(Default)]
pub struct RecordingSubmitter {
    responses: Mutex<VecDeque<Result<SubmissionReceipt, SubmitError>>>,
    calls: Mutex<Vec<(Direction, AttendanceSubmission)>>,
    gate: Option<Notify>,
}

impl RecordingSubmitter {
    pub fn answering(responses: Vec<Result<SubmissionReceipt, SubmitError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            ..Default::default()
        }
    }

    /// Holds every request until `release` is called.
    pub fn gated() -> Self {
        Self {
            gate: Some(Notify::new()),
            ..Default::default()
        }
    }

    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.notify_one();
        }
    }

    pub fn count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls(&self) -> Vec<(Direction, AttendanceSubmission)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl AttendanceSubmitter for RecordingSubmitter {
    async fn submit(
        &self,
        direction: Direction,
        submission: &AttendanceSubmission,
    ) -> Result<SubmissionReceipt, SubmitError> {
        self.calls
            .lock()
            .unwrap()
            .push((direction, submission.clone()));
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(SubmissionReceipt::default()))
    }
}
