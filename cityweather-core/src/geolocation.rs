//! Device position providers.

use async_trait::async_trait;
use std::{fmt::Debug, time::Duration};

use crate::{
    error::{GeolocationError, WeatherError},
    model::Coordinates,
};

/// Upper bound on acquiring a position.
pub const GEOLOCATION_TIMEOUT: Duration = Duration::from_secs(10);

#[async_trait]
pub trait Geolocator: Send + Sync + Debug {
    async fn current_position(&self) -> Result<Coordinates, GeolocationError>;
}

/// Always reports the same position, e.g. coordinates given on the command line.
#[derive(Debug, Clone, Copy)]
pub struct FixedGeolocator(pub Coordinates);

#[async_trait]
impl Geolocator for FixedGeolocator {
    async fn current_position(&self) -> Result<Coordinates, GeolocationError> {
        Ok(self.0)
    }
}

/// Acquire a position within `limit`. No provider means the host has no
/// geolocation support.
pub async fn locate(
    geolocator: Option<&dyn Geolocator>,
    limit: Duration,
) -> Result<Coordinates, WeatherError> {
    let geolocator = geolocator.ok_or(WeatherError::GeolocationUnsupported)?;

    match tokio::time::timeout(limit, geolocator.current_position()).await {
        Ok(Ok(coords)) => Ok(coords),
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "geolocation failed");
            Err(e.into())
        }
        Err(_) => {
            tracing::warn!(?limit, "geolocation timed out");
            Err(WeatherError::GeolocationTimeout)
        }
    }
}
