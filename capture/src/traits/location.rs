use crate::error::LocationError;
use crate::types::LocationFix;
use async_trait::async_trait;
use std::time::Duration;

/// Options passed through to the platform geolocation call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionOptions {
    pub timeout: Duration,
    pub high_accuracy: bool,
}

impl Default for PositionOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            high_accuracy: true,
        }
    }
}

/// Source of a single position reading.
///
/// The first call may prompt the user for permission. Implementations must not
/// retry on their own; the caller decides whether to ask again.
#[async_trait]
pub trait LocationProvider: Send + Sync {
    async fn current_position(
        &self,
        options: PositionOptions,
    ) -> Result<LocationFix, LocationError>;
}
