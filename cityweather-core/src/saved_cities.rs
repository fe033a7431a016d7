//! Favorite cities, most recent first, capped at [`MAX_SAVED_CITIES`].

use chrono::{DateTime, Utc};
use std::{collections::HashSet, sync::Arc};

use crate::{
    error::SavedCityError,
    model::{SavedCity, WeatherSnapshot},
    storage::{KeyValueStore, SAVED_CITIES_KEY},
};

pub const MAX_SAVED_CITIES: usize = 10;

#[derive(Debug)]
pub struct SavedCityStore {
    cities: Vec<SavedCity>,
    storage: Arc<dyn KeyValueStore>,
}

impl SavedCityStore {
    /// Load the persisted list; a corrupt list is treated as empty. Repeated
    /// keys keep their first entry and the list is cut to the cap.
    pub fn load(storage: Arc<dyn KeyValueStore>) -> Self {
        let mut cities = match storage.get(SAVED_CITIES_KEY) {
            Some(json) => serde_json::from_str::<Vec<SavedCity>>(&json).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "discarding corrupt saved-city list");
                Vec::new()
            }),
            None => Vec::new(),
        };

        let stored = cities.len();
        let mut seen = HashSet::new();
        cities.retain(|c| seen.insert(c.key.clone()));
        cities.truncate(MAX_SAVED_CITIES);
        if cities.len() != stored {
            tracing::warn!(stored, kept = cities.len(), "trimmed persisted saved-city list");
        }

        Self { cities, storage }
    }

    pub fn list(&self) -> &[SavedCity] {
        &self.cities
    }

    pub fn len(&self) -> usize {
        self.cities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cities.is_empty()
    }

    pub fn upsert(&mut self, snapshot: &WeatherSnapshot) {
        self.upsert_at(snapshot, Utc::now());
    }

    /// An existing key is replaced in place and keeps its position; a new key
    /// goes to the front and the oldest entries beyond the cap are dropped.
    pub fn upsert_at(&mut self, snapshot: &WeatherSnapshot, now: DateTime<Utc>) {
        let city = SavedCity::from_snapshot(snapshot, now);

        match self.cities.iter_mut().find(|c| c.key == city.key) {
            Some(existing) => {
                tracing::info!(key = %city.key, "updated saved city");
                *existing = city;
            }
            None => {
                tracing::info!(key = %city.key, "saved new city");
                self.cities.insert(0, city);
                self.cities.truncate(MAX_SAVED_CITIES);
            }
        }

        self.persist();
    }

    pub fn remove(&mut self, index: usize) -> Result<SavedCity, SavedCityError> {
        if index >= self.cities.len() {
            return Err(SavedCityError::IndexOutOfRange { index, len: self.cities.len() });
        }

        let removed = self.cities.remove(index);
        tracing::info!(key = %removed.key, "removed saved city");
        self.persist();
        Ok(removed)
    }

    pub fn clear(&mut self) {
        self.cities.clear();
        if let Err(e) = self.storage.remove(SAVED_CITIES_KEY) {
            tracing::warn!(error = %e, "failed to clear saved cities");
        }
    }

    fn persist(&self) {
        let result = serde_json::to_string(&self.cities)
            .map_err(anyhow::Error::from)
            .and_then(|json| self.storage.set(SAVED_CITIES_KEY, &json));

        if let Err(e) = result {
            tracing::warn!(error = %e, "failed to persist saved cities");
        }
    }
}
