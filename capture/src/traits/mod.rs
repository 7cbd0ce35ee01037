//!
//! Traits Module
//!
//! The seams between the capture flow and the device or network it runs on.
//!
//! - [`location`]: device geolocation.
//! - [`camera`]: camera stream plus QR decoder.
//! - [`verifier`]: optional signature check on a validated payload.
//! - [`submitter`]: the attendance endpoint.
//! - [`context`]: the signed-in user and bearer token.
//!
//! Implement these traits to run the flow against real hardware, a browser
//! bridge, or test fakes.

pub mod camera;
pub mod context;
pub mod location;
pub mod submitter;
pub mod verifier;
