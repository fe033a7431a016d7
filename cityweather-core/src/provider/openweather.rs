use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Response};
use serde::{Deserialize, de::DeserializeOwned};

use crate::{
    error::WeatherError,
    model::{ForecastSample, Locator, Suggestion, Units, WeatherSnapshot},
};

use super::WeatherGateway;

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";
pub const DEFAULT_GEOCODING_URL: &str = "https://api.openweathermap.org/geo/1.0";
const SUGGESTION_LIMIT: &str = "5";

#[derive(Debug, Clone)]
pub struct OpenWeatherGateway {
    api_key: String,
    base_url: String,
    geocoding_url: String,
    http: Client,
}

impl OpenWeatherGateway {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            geocoding_url: DEFAULT_GEOCODING_URL.to_string(),
            http: Client::new(),
        }
    }

    /// Point the gateway at other hosts (self-hosted proxies, mock servers).
    pub fn with_base_urls(mut self, base_url: &str, geocoding_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self.geocoding_url = geocoding_url.trim_end_matches('/').to_string();
        self
    }

    fn locator_query(&self, locator: &Locator, units: Units) -> Vec<(&'static str, String)> {
        let mut query = match locator {
            Locator::City(name) => vec![("q", name.clone())],
            Locator::Coordinates(c) => vec![
                ("lat", c.latitude.to_string()),
                ("lon", c.longitude.to_string()),
            ],
        };
        query.push(("appid", self.api_key.clone()));
        query.push(("units", units.as_str().to_string()));
        query
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&'static str, String)],
        what: &str,
    ) -> Result<T, WeatherError> {
        tracing::debug!(url, what, "requesting OpenWeather");

        let res = self.http.get(url).query(query).send().await.map_err(|e| {
            let error = without_credentials(e);
            tracing::warn!(%error, what, "OpenWeather request failed before a response");
            WeatherError::NetworkUnreachable
        })?;

        let res = check_status(res, what).await?;

        let body = res.text().await.map_err(|e| {
            let error = without_credentials(e);
            tracing::warn!(%error, what, "failed to read OpenWeather response body");
            WeatherError::NetworkUnreachable
        })?;

        serde_json::from_str(&body).map_err(|e| {
            tracing::warn!(error = %e, what, body = %truncate_body(&body), "failed to parse OpenWeather JSON");
            WeatherError::GenericFailure
        })
    }
}

async fn check_status(res: Response, what: &str) -> Result<Response, WeatherError> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }

    let body = res.text().await.unwrap_or_default();
    tracing::warn!(%status, what, body = %truncate_body(&body), "OpenWeather request rejected");

    let message = serde_json::from_str::<OwErrorBody>(&body)
        .ok()
        .and_then(|b| b.message);

    Err(WeatherError::from_status(status, message))
}

#[derive(Debug, Deserialize)]
struct OwErrorBody {
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    #[serde(default)]
    feels_like: f64,
    #[serde(default)]
    humidity: u8,
    #[serde(default)]
    pressure: u32,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    description: String,
    icon: String,
}

#[derive(Debug, Deserialize)]
struct OwWind {
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct OwSys {
    #[serde(default)]
    country: String,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    name: String,
    dt: i64,
    sys: OwSys,
    main: OwMain,
    weather: Vec<OwWeather>,
    wind: OwWind,
    visibility: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct OwForecastEntry {
    dt: i64,
    main: OwMain,
    weather: Vec<OwWeather>,
}

#[derive(Debug, Deserialize)]
struct OwForecastResponse {
    list: Vec<OwForecastEntry>,
}

#[derive(Debug, Deserialize)]
struct OwGeocodeEntry {
    name: String,
    state: Option<String>,
    country: String,
    lat: f64,
    lon: f64,
}

/// Description and icon of the first condition, which the provider lists as primary.
fn primary_condition(weather: &[OwWeather]) -> (String, String) {
    weather
        .first()
        .map(|w| (w.description.clone(), w.icon.clone()))
        .unwrap_or_else(|| ("Unknown".to_string(), String::new()))
}

#[async_trait]
impl WeatherGateway for OpenWeatherGateway {
    async fn fetch_current(
        &self,
        locator: &Locator,
        units: Units,
    ) -> Result<WeatherSnapshot, WeatherError> {
        let url = format!("{}/weather", self.base_url);
        let parsed: OwCurrentResponse = self
            .get_json(&url, &self.locator_query(locator, units), "current weather")
            .await?;

        let (description, icon) = primary_condition(&parsed.weather);

        Ok(WeatherSnapshot {
            city: parsed.name,
            country: parsed.sys.country,
            description,
            temperature: parsed.main.temp,
            feels_like: parsed.main.feels_like,
            humidity_pct: parsed.main.humidity,
            wind_speed: parsed.wind.speed,
            visibility_m: parsed.visibility,
            pressure_hpa: parsed.main.pressure,
            icon,
            units,
            observed_at: unix_to_utc(parsed.dt).unwrap_or_else(Utc::now),
        })
    }

    async fn fetch_forecast(
        &self,
        locator: &Locator,
        units: Units,
    ) -> Result<Vec<ForecastSample>, WeatherError> {
        let url = format!("{}/forecast", self.base_url);
        let parsed: OwForecastResponse = self
            .get_json(&url, &self.locator_query(locator, units), "5-day forecast")
            .await?;

        let samples = parsed
            .list
            .into_iter()
            .filter_map(|entry| {
                let timestamp = unix_to_utc(entry.dt)?;
                let (description, icon) = primary_condition(&entry.weather);
                Some(ForecastSample {
                    timestamp,
                    temperature: entry.main.temp,
                    icon,
                    description,
                })
            })
            .collect();

        Ok(samples)
    }

    async fn fetch_suggestions(&self, partial: &str) -> Result<Vec<Suggestion>, WeatherError> {
        let url = format!("{}/direct", self.geocoding_url);
        let query = [
            ("q", partial.to_string()),
            ("limit", SUGGESTION_LIMIT.to_string()),
            ("appid", self.api_key.clone()),
        ];
        let parsed: Vec<OwGeocodeEntry> = self.get_json(&url, &query, "geocoding").await?;

        Ok(parsed
            .into_iter()
            .map(|e| Suggestion {
                name: e.name,
                state: e.state,
                country: e.country,
                latitude: e.lat,
                longitude: e.lon,
            })
            .collect())
    }
}

fn unix_to_utc(ts: i64) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(ts, 0)
}

/// Request URLs carry `appid`; errors are logged without them.
fn without_credentials(e: reqwest::Error) -> String {
    e.without_url().to_string()
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
