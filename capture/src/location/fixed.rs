use crate::error::LocationError;
use crate::traits::location::{LocationProvider, PositionOptions};
use crate::types::LocationFix;
use async_trait::async_trait;

/// Always reports the same position.
///
/// Used for wall-mounted tablets and front-desk machines that never move and
/// have no GPS, with the coordinates taken from configuration.
#[derive(Debug, Clone, Copy)]
pub struct FixedLocation {
    fix: LocationFix,
}

impl FixedLocation {
    pub fn new(fix: LocationFix) -> Self {
        Self { fix }
    }

    /// Builds a provider from `STATION_LATITUDE`/`STATION_LONGITUDE`, if both are set.
    pub fn from_config() -> Option<Self> {
        util::config::station_location()
            .map(|(lat, lon, accuracy)| Self::new(LocationFix::new(lat, lon, accuracy)))
    }
}

#[async_trait]
impl LocationProvider for FixedLocation {
    async fn current_position(
        &self,
        _options: PositionOptions,
    ) -> Result<LocationFix, LocationError> {
        Ok(self.fix)
    }
}
