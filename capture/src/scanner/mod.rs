//! # Scanner Controller
//!
//! Owns the camera stream for one logical scan.
//!
//! ```text
//! Stopped --start--> Starting --live--> Running --decode/stop--> Stopped
//!                    Starting --denied/device error/timeout--> Stopped
//! ```
//!
//! Start failures are returned once from [`ScannerController::start`]. Frames
//! with nothing to decode go to `on_frame_error` and are only logged at
//! `trace`. The first decode trips a [`DecodeLatch`], the camera is stopped,
//! and `on_decode` runs; later decodes of the same code are dropped.

pub mod latch;
pub mod lines;

use crate::error::ScannerError;
use crate::traits::camera::{Camera, Frame};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

pub use latch::DecodeLatch;
pub use lines::LineCamera;

/// Frames buffered between the camera and the pump before the camera blocks.
const FRAME_BUFFER: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScannerState {
    Stopped,
    Starting,
    Running,
}

pub struct ScannerController {
    camera: Arc<dyn Camera>,
    start_timeout: Duration,
    state: Arc<Mutex<ScannerState>>,
}

fn set_state(cell: &Mutex<ScannerState>, next: ScannerState) {
    let mut guard = cell.lock().unwrap_or_else(|p| p.into_inner());
    *guard = next;
}

impl ScannerController {
    pub fn new(camera: Arc<dyn Camera>, start_timeout: Duration) -> Self {
        Self {
            camera,
            start_timeout,
            state: Arc::new(Mutex::new(ScannerState::Stopped)),
        }
    }

    pub fn camera(&self) -> Arc<dyn Camera> {
        self.camera.clone()
    }

    pub fn state(&self) -> ScannerState {
        *self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Opens the camera and starts pumping frames.
    ///
    /// Resolves once the stream is live. `on_decode` receives the first
    /// decoded text and nothing after it; `on_frame_error` receives every miss.
    pub async fn start<D, E>(
        &self,
        on_decode: D,
        on_frame_error: E,
    ) -> Result<ScanHandle, ScannerError>
    where
        D: FnOnce(String) + Send + 'static,
        E: FnMut(&str) + Send + 'static,
    {
        {
            let mut guard = self.state.lock().unwrap_or_else(|p| p.into_inner());
            if *guard != ScannerState::Stopped {
                return Err(ScannerError::Busy);
            }
            *guard = ScannerState::Starting;
        }
        let mut starting = StartGuard {
            state: &self.state,
            camera: &self.camera,
            armed: true,
        };

        let (tx, rx) = mpsc::channel(FRAME_BUFFER);
        let started = tokio::time::timeout(self.start_timeout, self.camera.start(tx)).await;
        starting.armed = false;
        match started {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                warn!(error = %e, "camera failed to start");
                self.camera.stop().await;
                set_state(&self.state, ScannerState::Stopped);
                return Err(e);
            }
            Err(_) => {
                warn!(timeout = ?self.start_timeout, "camera start timed out");
                self.camera.stop().await;
                set_state(&self.state, ScannerState::Stopped);
                return Err(ScannerError::StartTimeout(self.start_timeout));
            }
        }

        set_state(&self.state, ScannerState::Running);
        info!("camera running");

        let cancel = CancellationToken::new();
        let latch = Arc::new(DecodeLatch::new());
        let pump = tokio::spawn(pump(
            rx,
            self.camera.clone(),
            self.state.clone(),
            cancel.clone(),
            latch.clone(),
            on_decode,
            on_frame_error,
        ));

        Ok(ScanHandle {
            cancel,
            latch,
            pump: Some(pump),
        })
    }

    /// Stops the scan behind `handle` and waits for the camera to be released.
    pub async fn stop(&self, handle: ScanHandle) {
        handle.stop().await;
    }
}

/// Puts the controller back to `Stopped` if a start is abandoned mid-way,
/// e.g. because the page was torn down while the camera was still opening.
struct StartGuard<'a> {
    state: &'a Mutex<ScannerState>,
    camera: &'a Arc<dyn Camera>,
    armed: bool,
}

impl Drop for StartGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        set_state(self.state, ScannerState::Stopped);
        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            let camera = self.camera.clone();
            runtime.spawn(async move { camera.stop().await });
        }
    }
}

async fn pump<D, E>(
    mut rx: mpsc::Receiver<Frame>,
    camera: Arc<dyn Camera>,
    state: Arc<Mutex<ScannerState>>,
    cancel: CancellationToken,
    latch: Arc<DecodeLatch>,
    on_decode: D,
    mut on_frame_error: E,
) where
    D: FnOnce(String) + Send + 'static,
    E: FnMut(&str) + Send + 'static,
{
    let mut on_decode = Some(on_decode);
    let mut misses: u64 = 0;

    loop {
        let frame = tokio::select! {
            _ = cancel.cancelled() => break,
            frame = rx.recv() => frame,
        };

        match frame {
            Some(Frame::Miss(reason)) => {
                misses += 1;
                trace!(%reason, "no code in frame");
                on_frame_error(&reason);
            }
            Some(Frame::Decoded(text)) => {
                if !latch.fire() {
                    debug!("duplicate decode dropped");
                    continue;
                }
                camera.stop().await;
                set_state(&state, ScannerState::Stopped);
                info!(misses, "code decoded, camera stopped");
                if let Some(callback) = on_decode.take() {
                    callback(text);
                }
                return;
            }
            None => {
                warn!(misses, "camera stream ended without a decode");
                break;
            }
        }
    }

    camera.stop().await;
    set_state(&state, ScannerState::Stopped);
}

/// A running scan. Dropping it requests the camera to stop.
pub struct ScanHandle {
    cancel: CancellationToken,
    latch: Arc<DecodeLatch>,
    pump: Option<JoinHandle<()>>,
}

impl ScanHandle {
    /// True once a decode has been accepted for this scan.
    pub fn decoded(&self) -> bool {
        self.latch.is_fired()
    }

    /// Requests a stop and waits until the camera has been released.
    pub async fn stop(mut self) {
        self.cancel.cancel();
        if let Some(pump) = self.pump.take() {
            let _ = pump.await;
        }
    }
}

impl Drop for ScanHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::oneshot;

    /// Sends a scripted burst of frames as soon as it starts.
    struct Scripted {
        frames: Vec<Frame>,
        stops: AtomicUsize,
    }

    impl Scripted {
        fn new(frames: Vec<Frame>) -> Arc<Self> {
            Arc::new(Self {
                frames,
                stops: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl Camera for Scripted {
        async fn start(&self, frames: mpsc::Sender<Frame>) -> Result<(), ScannerError> {
            let script = self.frames.clone();
            tokio::spawn(async move {
                for f in script {
                    if frames.send(f).await.is_err() {
                        break;
                    }
                }
            });
            Ok(())
        }

        async fn stop(&self) {
            self.stops.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct Hangs;

    #[async_trait]
    impl Camera for Hangs {
        async fn start(&self, _frames: mpsc::Sender<Frame>) -> Result<(), ScannerError> {
            std::future::pending().await
        }
        async fn stop(&self) {}
    }

    #[derive(Default)]
    struct Denies {
        stops: AtomicUsize,
    }

    #[async_trait]
    impl Camera for Denies {
        async fn start(&self, _frames: mpsc::Sender<Frame>) -> Result<(), ScannerError> {
            Err(ScannerError::PermissionDenied)
        }
        async fn stop(&self) {
            self.stops.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn first_decode_wins() {
        let camera = Scripted::new(vec![
            Frame::Miss("no code".into()),
            Frame::Decoded("first".into()),
            Frame::Decoded("first".into()),
            Frame::Decoded("second".into()),
        ]);
        let controller = ScannerController::new(camera.clone(), Duration::from_secs(1));

        let calls = Arc::new(AtomicUsize::new(0));
        let misses = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = oneshot::channel();
        let counted = calls.clone();
        let missed = misses.clone();
        let handle = controller
            .start(
                move |text| {
                    counted.fetch_add(1, Ordering::SeqCst);
                    let _ = tx.send(text);
                },
                move |_| {
                    missed.fetch_add(1, Ordering::SeqCst);
                },
            )
            .await
            .unwrap();

        assert_eq!(rx.await.unwrap(), "first");
        assert!(handle.decoded());
        handle.stop().await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(misses.load(Ordering::SeqCst), 1);
        assert_eq!(controller.state(), ScannerState::Stopped);
        assert!(camera.stops.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test(start_paused = true)]
    async fn start_timeout_is_a_device_error() {
        let controller = ScannerController::new(Arc::new(Hangs), Duration::from_secs(15));
        let err = controller.start(|_| {}, |_| {}).await.err().unwrap();
        assert_eq!(err, ScannerError::StartTimeout(Duration::from_secs(15)));
        assert_eq!(controller.state(), ScannerState::Stopped);
    }

    #[tokio::test]
    async fn denial_is_reported_once_and_leaves_scanner_stopped() {
        let camera = Arc::new(Denies::default());
        let controller = ScannerController::new(camera.clone(), Duration::from_secs(1));
        let err = controller.start(|_| {}, |_| {}).await.err().unwrap();
        assert_eq!(err, ScannerError::PermissionDenied);
        assert_eq!(controller.state(), ScannerState::Stopped);
        assert_eq!(camera.stops.load(Ordering::SeqCst), 1);

        // A user retry can call start again.
        let again = controller.start(|_| {}, |_| {}).await.err().unwrap();
        assert_eq!(again, ScannerError::PermissionDenied);
        assert_eq!(camera.stops.load(Ordering::SeqCst), 2);
    }

    /// Goes live but never produces a frame until stopped.
    #[derive(Default)]
    struct Idle {
        held: Mutex<Option<mpsc::Sender<Frame>>>,
        stops: AtomicUsize,
    }

    #[async_trait]
    impl Camera for Idle {
        async fn start(&self, frames: mpsc::Sender<Frame>) -> Result<(), ScannerError> {
            *self.held.lock().unwrap() = Some(frames);
            Ok(())
        }
        async fn stop(&self) {
            self.held.lock().unwrap().take();
            self.stops.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn second_start_while_running_is_busy() {
        let camera = Arc::new(Idle::default());
        let controller = ScannerController::new(camera.clone(), Duration::from_secs(1));
        let handle = controller.start(|_| {}, |_| {}).await.unwrap();
        assert_eq!(controller.state(), ScannerState::Running);

        let err = controller.start(|_| {}, |_| {}).await.err().unwrap();
        assert_eq!(err, ScannerError::Busy);

        controller.stop(handle).await;
        assert_eq!(controller.state(), ScannerState::Stopped);
        assert_eq!(camera.stops.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn dropping_the_handle_releases_the_camera() {
        let camera = Arc::new(Idle::default());
        let controller = ScannerController::new(camera.clone(), Duration::from_secs(1));
        let handle = controller.start(|_| {}, |_| {}).await.unwrap();
        drop(handle);

        for _ in 0..100 {
            if controller.state() == ScannerState::Stopped {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(controller.state(), ScannerState::Stopped);
        assert_eq!(camera.stops.load(Ordering::SeqCst), 1);
    }
}
