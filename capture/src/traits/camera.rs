use crate::error::ScannerError;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// One decoder result for one camera frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A QR code was found and decoded to this text.
    Decoded(String),
    /// Nothing readable in view. Arrives many times per second while scanning.
    Miss(String),
}

/// Camera stream with an attached QR decoder.
///
/// `start` resolves once the stream is live, after which frames are pushed into
/// `frames` until `stop` is called. Frames may arrive in bursts, and a decode
/// of the same code can be delivered several times before `stop` takes effect.
#[async_trait]
pub trait Camera: Send + Sync {
    async fn start(&self, frames: mpsc::Sender<Frame>) -> Result<(), ScannerError>;

    /// Releases the stream. Must be safe to call when not started.
    async fn stop(&self);
}
