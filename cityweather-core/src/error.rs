//! Error taxonomy surfaced to users.
//!
//! `Display` on these types is the message shown to the user; diagnostics go
//! through `tracing` instead.

use reqwest::StatusCode;

/// Everything a search can end in, other than success.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WeatherError {
    #[error("Please enter a city name.")]
    EmptyInput,
    #[error("Invalid API key. Please check your configuration.")]
    InvalidCredential,
    #[error("City not found. Please check the spelling and try again.")]
    LocationNotFound,
    #[error("Too many requests. Please wait a moment and try again.")]
    RateLimited,
    #[error("Weather service is temporarily unavailable. Please try again later.")]
    ServiceUnavailable,
    #[error("Network error. Please check your internet connection.")]
    NetworkUnreachable,
    #[error("Geolocation is not supported on this device.")]
    GeolocationUnsupported,
    #[error("Location access denied. Please enter a city name manually.")]
    GeolocationPermissionDenied,
    #[error("Location request timed out. Please try again.")]
    GeolocationTimeout,
    #[error("Unable to get your location. Please enter a city name manually.")]
    GeolocationUnavailable,
    /// Unmapped status with a message supplied by the provider.
    #[error("{0}")]
    Provider(String),
    #[error("An unexpected error occurred. Please try again.")]
    GenericFailure,
}

impl WeatherError {
    /// Maps a non-success HTTP status to a user-facing category. The
    /// provider's own message is used only for statuses without a category.
    pub fn from_status(status: StatusCode, server_message: Option<String>) -> Self {
        match status.as_u16() {
            401 => WeatherError::InvalidCredential,
            404 => WeatherError::LocationNotFound,
            429 => WeatherError::RateLimited,
            500 => WeatherError::ServiceUnavailable,
            _ => match server_message.filter(|m| !m.trim().is_empty()) {
                Some(message) => WeatherError::Provider(message),
                None => WeatherError::GenericFailure,
            },
        }
    }
}

/// Failures reported by a geolocation provider.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GeolocationError {
    #[error("geolocation permission denied")]
    PermissionDenied,
    #[error("geolocation request timed out")]
    Timeout,
    #[error("position unavailable: {0}")]
    PositionUnavailable(String),
}

impl From<GeolocationError> for WeatherError {
    fn from(e: GeolocationError) -> Self {
        match e {
            GeolocationError::PermissionDenied => WeatherError::GeolocationPermissionDenied,
            GeolocationError::Timeout => WeatherError::GeolocationTimeout,
            GeolocationError::PositionUnavailable(_) => WeatherError::GeolocationUnavailable,
        }
    }
}

/// Contract violations on the saved-city list.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SavedCityError {
    #[error("No saved city at position {index} (list has {len} entries)")]
    IndexOutOfRange { index: usize, len: usize },
}
