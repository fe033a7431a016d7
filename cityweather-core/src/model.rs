use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Measurement system requested from the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    #[default]
    Metric,
    Imperial,
}

impl Units {
    pub fn as_str(&self) -> &'static str {
        match self {
            Units::Metric => "metric",
            Units::Imperial => "imperial",
        }
    }

    pub fn temperature_symbol(&self) -> &'static str {
        match self {
            Units::Metric => "C",
            Units::Imperial => "F",
        }
    }

    pub fn wind_unit(&self) -> &'static str {
        match self {
            Units::Metric => "m/s",
            Units::Imperial => "mph",
        }
    }
}

impl fmt::Display for Units {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Units {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "metric" => Ok(Units::Metric),
            "imperial" => Ok(Units::Imperial),
            _ => Err(anyhow::anyhow!(
                "Unknown unit system '{value}'. Supported: metric, imperial."
            )),
        }
    }
}

/// Where to look up weather: a free-form city name or a coordinate pair.
#[derive(Debug, Clone, PartialEq)]
pub enum Locator {
    City(String),
    Coordinates(Coordinates),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Current conditions for one place, as observed by the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub city: String,
    pub country: String,
    pub description: String,
    pub temperature: f64,
    pub feels_like: f64,
    pub humidity_pct: u8,
    pub wind_speed: f64,
    /// Meters; the provider omits it for some stations.
    pub visibility_m: Option<u32>,
    pub pressure_hpa: u32,
    pub icon: String,
    pub units: Units,
    pub observed_at: DateTime<Utc>,
}

impl WeatherSnapshot {
    /// "Name, CC", also the saved-city key.
    pub fn display_name(&self) -> String {
        format!("{}, {}", self.city, self.country)
    }

    pub fn icon_url(&self) -> String {
        icon_url(&self.icon, 4)
    }
}

/// One 3-hour entry of the provider's forecast series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastSample {
    pub timestamp: DateTime<Utc>,
    pub temperature: f64,
    pub icon: String,
    pub description: String,
}

/// Summary of all samples that fall on one local calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyForecast {
    pub date: NaiveDate,
    pub high: i64,
    pub low: i64,
    pub icon: String,
    pub description: String,
}

impl DailyForecast {
    /// "Today" for the current day, otherwise the short weekday name.
    pub fn day_label(&self, today: NaiveDate) -> String {
        if self.date == today {
            "Today".to_string()
        } else {
            self.date.format("%a").to_string()
        }
    }

    pub fn icon_url(&self) -> String {
        icon_url(&self.icon, 2)
    }
}

/// A favorite city with the display data cached at its last lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedCity {
    pub key: String,
    pub name: String,
    pub country: String,
    pub temperature: i64,
    pub icon: String,
    pub units: Units,
    pub last_updated: DateTime<Utc>,
}

impl SavedCity {
    pub fn from_snapshot(snapshot: &WeatherSnapshot, now: DateTime<Utc>) -> Self {
        Self {
            key: snapshot.display_name(),
            name: snapshot.city.clone(),
            country: snapshot.country.clone(),
            temperature: round_half_up(snapshot.temperature),
            icon: snapshot.icon.clone(),
            units: snapshot.units,
            last_updated: now,
        }
    }
}

/// A geocoding candidate for partially typed input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub name: String,
    pub state: Option<String>,
    pub country: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl Suggestion {
    /// "Name, State CC", or "Name, CC" when the region is unknown.
    pub fn label(&self) -> String {
        match self.state.as_deref().filter(|s| !s.is_empty()) {
            Some(state) => format!("{}, {} {}", self.name, state, self.country),
            None => format!("{}, {}", self.name, self.country),
        }
    }
}

/// Rounds like the provider's own display widgets: halves go towards +inf,
/// so -2.5 becomes -2 rather than -3.
pub fn round_half_up(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

fn icon_url(icon: &str, scale: u8) -> String {
    format!("https://openweathermap.org/img/wn/{icon}@{scale}x.png")
}
