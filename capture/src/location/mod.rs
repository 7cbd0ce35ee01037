//! # Location Acquirer
//!
//! Wraps a [`LocationProvider`] with a hard deadline and a plausibility check.
//! The provider is asked exactly once per call; nothing here retries.

pub mod fixed;

use crate::error::LocationError;
use crate::traits::location::{LocationProvider, PositionOptions};
use crate::types::LocationFix;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{info, warn};

pub use fixed::FixedLocation;

/// Requests one position from `provider`, failing with
/// [`LocationError::Timeout`] if none arrives within `timeout`.
///
/// The deadline is enforced here even if the provider ignores
/// [`PositionOptions::timeout`], so a stuck platform call cannot hang the flow.
pub async fn acquire_location(
    provider: &dyn LocationProvider,
    timeout: Duration,
    high_accuracy: bool,
) -> Result<LocationFix, LocationError> {
    let options = PositionOptions {
        timeout,
        high_accuracy,
    };

    let fix = match tokio::time::timeout(timeout, provider.current_position(options)).await {
        Ok(result) => result,
        Err(_) => Err(LocationError::Timeout(timeout)),
    };

    match fix {
        Ok(fix) if fix.is_plausible() => {
            info!(
                latitude = fix.latitude,
                longitude = fix.longitude,
                accuracy = ?fix.accuracy,
                "location acquired"
            );
            Ok(fix)
        }
        Ok(fix) => {
            warn!(?fix, "provider returned coordinates out of range");
            Err(LocationError::PositionUnavailable(format!(
                "coordinates out of range ({}, {})",
                fix.latitude, fix.longitude
            )))
        }
        Err(e) => {
            warn!(error = %e, "location acquisition failed");
            Err(e)
        }
    }
}

/// Provider for devices with no geolocation capability at all.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedLocation;

#[async_trait]
impl LocationProvider for UnsupportedLocation {
    async fn current_position(
        &self,
        _options: PositionOptions,
    ) -> Result<LocationFix, LocationError> {
        Err(LocationError::Unsupported)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Never;

    #[async_trait]
    impl LocationProvider for Never {
        async fn current_position(
            &self,
            _options: PositionOptions,
        ) -> Result<LocationFix, LocationError> {
            std::future::pending().await
        }
    }

    struct Denied;

    #[async_trait]
    impl LocationProvider for Denied {
        async fn current_position(
            &self,
            _options: PositionOptions,
        ) -> Result<LocationFix, LocationError> {
            Err(LocationError::PermissionDenied)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stuck_provider_times_out() {
        let timeout = Duration::from_secs(10);
        let err = acquire_location(&Never, timeout, true).await.unwrap_err();
        assert_eq!(err, LocationError::Timeout(timeout));
    }

    #[tokio::test]
    async fn provider_error_passes_through() {
        let err = acquire_location(&Denied, Duration::from_secs(1), false)
            .await
            .unwrap_err();
        assert_eq!(err, LocationError::PermissionDenied);
    }

    #[tokio::test]
    async fn unsupported_device() {
        let err = acquire_location(&UnsupportedLocation, Duration::from_secs(1), true)
            .await
            .unwrap_err();
        assert_eq!(err, LocationError::Unsupported);
    }

    #[tokio::test]
    async fn out_of_range_fix_is_unavailable() {
        let provider = FixedLocation::new(LocationFix::new(120.0, 10.0, None));
        let err = acquire_location(&provider, Duration::from_secs(1), true)
            .await
            .unwrap_err();
        assert!(matches!(err, LocationError::PositionUnavailable(_)));
    }
}
