//! Unit system and theme, persisted on every change.

use serde::{Deserialize, Serialize};
use std::{fmt, sync::Arc};

use crate::{
    model::Units,
    storage::{KeyValueStore, THEME_KEY, UNITS_KEY},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
    /// Follow the host's colour scheme.
    Auto,
}

/// A concrete light/dark scheme, either the host's signal or a resolved theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ColorScheme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
            Theme::Auto => "auto",
        }
    }

    pub fn resolve(&self, host: ColorScheme) -> ColorScheme {
        match self {
            Theme::Light => ColorScheme::Light,
            Theme::Dark => ColorScheme::Dark,
            Theme::Auto => host,
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Theme {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            "auto" => Ok(Theme::Auto),
            _ => Err(anyhow::anyhow!(
                "Unknown theme '{value}'. Supported: light, dark, auto."
            )),
        }
    }
}

impl fmt::Display for ColorScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ColorScheme::Light => "light",
            ColorScheme::Dark => "dark",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Preferences {
    pub units: Units,
    pub theme: Theme,
}

#[derive(Debug)]
pub struct PreferenceStore {
    current: Preferences,
    storage: Arc<dyn KeyValueStore>,
}

impl PreferenceStore {
    /// Read preferences from storage. Absent or unrecognized values fall back
    /// to the defaults (metric, light).
    pub fn load(storage: Arc<dyn KeyValueStore>) -> Self {
        let units = storage
            .get(UNITS_KEY)
            .and_then(|s| Units::try_from(s.as_str()).ok())
            .unwrap_or_default();
        let theme = storage
            .get(THEME_KEY)
            .and_then(|s| Theme::try_from(s.as_str()).ok())
            .unwrap_or_default();

        tracing::debug!(%units, %theme, "loaded preferences");

        Self { current: Preferences { units, theme }, storage }
    }

    pub fn get(&self) -> Preferences {
        self.current
    }

    pub fn set_units(&mut self, units: Units) {
        self.current.units = units;
        if let Err(e) = self.storage.set(UNITS_KEY, units.as_str()) {
            tracing::warn!(error = %e, "failed to persist unit preference");
        }
    }

    pub fn set_theme(&mut self, theme: Theme) {
        self.current.theme = theme;
        if let Err(e) = self.storage.set(THEME_KEY, theme.as_str()) {
            tracing::warn!(error = %e, "failed to persist theme preference");
        }
    }
}
