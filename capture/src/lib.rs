//! # Capture Library
//!
//! Client side of QR attendance: a staff member stands at a station, the
//! device takes a location fix, the camera reads the station's rotating QR
//! code, the code is checked, and one check-in or check-out record is posted to
//! the attendance backend.
//!
//! ## Key Concepts
//! - **CaptureFlow**: runs one scan session end to end and supports user retry.
//! - **ScanSession**: the state machine; the only place a submission is built.
//! - **ScannerController**: camera lifecycle with a one-shot decode latch.
//! - **Validator**: decoded text in, [`types::QrPayload`] out.
//! - **HttpSubmitter**: the attendance endpoint, authenticated with a bearer token.
//! - **Traits**: device, network and session seams, so the flow runs the same
//!   against hardware, a browser bridge, or test fakes.

pub mod context;
pub mod error;
pub mod flow;
pub mod location;
pub mod scanner;
pub mod session;
pub mod submission;
pub mod traits;
pub mod types;
pub mod validator;
pub mod verifier;

pub use error::FailureReason;
pub use flow::{CaptureFlow, FlowSettings, Outcome, TeardownHandle};
pub use session::{ScanSession, SessionStatus};
pub use types::{Direction, LocationFix, Notice, QrPayload};
