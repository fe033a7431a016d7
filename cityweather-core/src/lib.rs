//! Core library for the `cityweather` client.
//!
//! This crate defines:
//! - Configuration and durable user-state storage
//! - The OpenWeather gateway and its error taxonomy
//! - Forecast aggregation into daily summaries
//! - Preferences, saved cities and debounced suggestions
//! - The search session that ties them together behind a `Presenter`
//!
//! It is used by `cityweather-cli`, but any front end can drive a `Session`.

pub mod config;
pub mod error;
pub mod forecast;
pub mod geolocation;
pub mod model;
pub mod preferences;
pub mod provider;
pub mod saved_cities;
pub mod session;
pub mod storage;
pub mod suggest;

pub use config::Config;
pub use error::{GeolocationError, SavedCityError, WeatherError};
pub use forecast::aggregate;
pub use geolocation::{FixedGeolocator, Geolocator};
pub use model::{
    Coordinates, DailyForecast, ForecastSample, Locator, SavedCity, Suggestion, Units,
    WeatherSnapshot,
};
pub use preferences::{ColorScheme, Preferences, Theme};
pub use provider::{
    UnconfiguredGateway, WeatherGateway, gateway_from_config, openweather::OpenWeatherGateway,
};
pub use session::{Presenter, SearchState, Session, WeatherView};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use suggest::SuggestionLookup;
