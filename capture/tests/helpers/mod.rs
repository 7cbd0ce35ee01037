#![allow(dead_code)]

pub mod fakes;
pub mod server;

pub use fakes::{FakeCamera, FakeLocation, RecordingSubmitter, signed_in, station_code};
pub use server::spawn_server;
