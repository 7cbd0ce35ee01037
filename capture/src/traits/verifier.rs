use crate::error::PayloadError;
use crate::types::QrPayload;

/// Extra check run on a payload that already passed the structural checks.
pub trait PayloadVerifier: Send + Sync {
    fn verify(&self, payload: &QrPayload) -> Result<(), PayloadError>;
}
