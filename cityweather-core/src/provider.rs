use crate::{
    Config,
    error::WeatherError,
    model::{ForecastSample, Locator, Suggestion, Units, WeatherSnapshot},
    provider::openweather::OpenWeatherGateway,
};
use async_trait::async_trait;
use std::{fmt::Debug, sync::Arc};

pub mod openweather;

/// Network access to a weather provider. Implementations hold no state that
/// a call could mutate.
#[async_trait]
pub trait WeatherGateway: Send + Sync + Debug {
    async fn fetch_current(
        &self,
        locator: &Locator,
        units: Units,
    ) -> Result<WeatherSnapshot, WeatherError>;

    async fn fetch_forecast(
        &self,
        locator: &Locator,
        units: Units,
    ) -> Result<Vec<ForecastSample>, WeatherError>;

    async fn fetch_suggestions(&self, partial: &str) -> Result<Vec<Suggestion>, WeatherError>;
}

/// Construct the OpenWeather gateway from config.
pub fn gateway_from_config(config: &Config) -> anyhow::Result<Arc<dyn WeatherGateway>> {
    let api_key = config.api_key().ok_or_else(|| {
        anyhow::anyhow!(
            "No API key configured.\n\
                 Hint: run `cityweather configure` or set OPENWEATHER_API_KEY."
        )
    })?;

    let gateway = OpenWeatherGateway::new(api_key.to_owned())
        .with_base_urls(&config.base_url, &config.geocoding_url);

    Ok(Arc::new(gateway))
}

/// Stands in when no API key is configured, so local state stays usable.
/// Every call fails the way the provider answers a request without `appid`.
#[derive(Debug, Default)]
pub struct UnconfiguredGateway;

#[async_trait]
impl WeatherGateway for UnconfiguredGateway {
    async fn fetch_current(
        &self,
        _locator: &Locator,
        _units: Units,
    ) -> Result<WeatherSnapshot, WeatherError> {
        Err(WeatherError::InvalidCredential)
    }

    async fn fetch_forecast(
        &self,
        _locator: &Locator,
        _units: Units,
    ) -> Result<Vec<ForecastSample>, WeatherError> {
        Err(WeatherError::InvalidCredential)
    }

    async fn fetch_suggestions(&self, _partial: &str) -> Result<Vec<Suggestion>, WeatherError> {
        Err(WeatherError::InvalidCredential)
    }
}
