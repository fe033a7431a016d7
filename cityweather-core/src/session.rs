//! The search session: the single owner of user state.
//!
//! Every user action goes through [`Session`], which calls the gateway,
//! updates the stores and reports the outcome to a [`Presenter`]. Operations
//! take `&mut self`, so a session runs one search at a time.

use std::{sync::Arc, time::Duration};
use tokio::sync::mpsc;

use crate::{
    error::{SavedCityError, WeatherError},
    forecast,
    geolocation::{self, GEOLOCATION_TIMEOUT, Geolocator},
    model::{DailyForecast, Locator, SavedCity, Suggestion, Units, WeatherSnapshot},
    preferences::{ColorScheme, PreferenceStore, Preferences, Theme},
    provider::WeatherGateway,
    saved_cities::SavedCityStore,
    storage::{KeyValueStore, LAST_SEARCHED_CITY_KEY},
    suggest::SuggestionLookup,
};

/// What a successful search shows.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherView {
    pub snapshot: WeatherSnapshot,
    pub forecast: Vec<DailyForecast>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum SearchState {
    #[default]
    Idle,
    Loading,
    Displaying(WeatherView),
    Error(WeatherError),
}

impl SearchState {
    pub fn name(&self) -> &'static str {
        match self {
            SearchState::Idle => "idle",
            SearchState::Loading => "loading",
            SearchState::Displaying(_) => "displaying",
            SearchState::Error(_) => "error",
        }
    }

    /// The user-facing message of an error state.
    pub fn error_message(&self) -> Option<String> {
        match self {
            SearchState::Error(e) => Some(e.to_string()),
            _ => None,
        }
    }
}

/// Receives everything the session wants shown.
pub trait Presenter: Send + Sync {
    fn search_state_changed(&self, state: &SearchState);
    fn saved_cities_changed(&self, cities: &[SavedCity], units: Units);
    fn theme_changed(&self, scheme: ColorScheme);
}

pub struct Session {
    gateway: Arc<dyn WeatherGateway>,
    geolocator: Option<Arc<dyn Geolocator>>,
    geolocation_timeout: Duration,
    storage: Arc<dyn KeyValueStore>,
    preferences: PreferenceStore,
    saved_cities: SavedCityStore,
    presenter: Arc<dyn Presenter>,
    host_scheme: ColorScheme,
    state: SearchState,
    /// City name to refresh when units change; set by successful searches.
    displayed_city: Option<String>,
}

impl Session {
    /// Build a session over `storage`, loading preferences and saved cities.
    pub fn new(
        gateway: Arc<dyn WeatherGateway>,
        storage: Arc<dyn KeyValueStore>,
        presenter: Arc<dyn Presenter>,
    ) -> Self {
        Self {
            gateway,
            geolocator: None,
            geolocation_timeout: GEOLOCATION_TIMEOUT,
            preferences: PreferenceStore::load(Arc::clone(&storage)),
            saved_cities: SavedCityStore::load(Arc::clone(&storage)),
            storage,
            presenter,
            host_scheme: ColorScheme::default(),
            state: SearchState::Idle,
            displayed_city: None,
        }
    }

    pub fn with_geolocator(mut self, geolocator: Arc<dyn Geolocator>) -> Self {
        self.geolocator = Some(geolocator);
        self
    }

    pub fn with_geolocation_timeout(mut self, timeout: Duration) -> Self {
        self.geolocation_timeout = timeout;
        self
    }

    pub fn with_host_scheme(mut self, scheme: ColorScheme) -> Self {
        self.host_scheme = scheme;
        self
    }

    pub fn state(&self) -> &SearchState {
        &self.state
    }

    pub fn preferences(&self) -> Preferences {
        self.preferences.get()
    }

    pub fn saved_cities(&self) -> &[SavedCity] {
        self.saved_cities.list()
    }

    pub fn resolved_theme(&self) -> ColorScheme {
        self.preferences.get().theme.resolve(self.host_scheme)
    }

    pub fn last_searched_city(&self) -> Option<String> {
        self.storage
            .get(LAST_SEARCHED_CITY_KEY)
            .filter(|c| !c.trim().is_empty())
    }

    /// A suggestion lookup sharing this session's gateway.
    pub fn suggestion_lookup(
        &self,
        results: mpsc::UnboundedSender<Vec<Suggestion>>,
    ) -> SuggestionLookup {
        SuggestionLookup::new(Arc::clone(&self.gateway), results)
    }

    /// Push the initial theme and saved cities to the presenter, then search
    /// for the last searched city, if one was persisted.
    pub async fn start(&mut self) -> &SearchState {
        self.presenter.theme_changed(self.resolved_theme());
        self.notify_saved_cities();

        if let Some(city) = self.last_searched_city() {
            tracing::info!(%city, "resuming last search");
            self.search(&city).await;
        }

        &self.state
    }

    pub async fn search(&mut self, input: &str) -> &SearchState {
        let name = input.trim();
        if name.is_empty() {
            self.set_state(SearchState::Error(WeatherError::EmptyInput));
            return &self.state;
        }

        self.set_state(SearchState::Loading);
        self.complete_search(Locator::City(name.to_string())).await;
        &self.state
    }

    pub async fn select_suggestion(&mut self, suggestion: &Suggestion) -> &SearchState {
        self.search(&suggestion.name).await
    }

    pub async fn search_current_location(&mut self) -> &SearchState {
        if self.geolocator.is_none() {
            self.set_state(SearchState::Error(WeatherError::GeolocationUnsupported));
            return &self.state;
        }

        self.set_state(SearchState::Loading);

        let located =
            geolocation::locate(self.geolocator.as_deref(), self.geolocation_timeout).await;
        match located {
            Ok(coords) => self.complete_search(Locator::Coordinates(coords)).await,
            Err(e) => self.set_state(SearchState::Error(e)),
        }

        &self.state
    }

    /// Switch unit systems and refresh the displayed city under the new one.
    pub async fn set_units(&mut self, units: Units) -> &SearchState {
        self.preferences.set_units(units);
        self.notify_saved_cities();

        if let Some(city) = self.displayed_city.clone() {
            tracing::info!(%city, %units, "refreshing after unit change");
            self.search(&city).await;
        }

        &self.state
    }

    pub fn set_theme(&mut self, theme: Theme) {
        self.preferences.set_theme(theme);
        self.presenter.theme_changed(self.resolved_theme());
    }

    /// The host switched between light and dark.
    pub fn host_scheme_changed(&mut self, scheme: ColorScheme) {
        self.host_scheme = scheme;
        if self.preferences.get().theme == Theme::Auto {
            self.presenter.theme_changed(self.resolved_theme());
        }
    }

    /// Leave the error state without searching again.
    pub fn dismiss_error(&mut self) {
        if matches!(self.state, SearchState::Error(_)) {
            self.set_state(SearchState::Idle);
        }
    }

    pub fn remove_saved_city(&mut self, index: usize) -> Result<SavedCity, SavedCityError> {
        let removed = self.saved_cities.remove(index)?;
        self.notify_saved_cities();
        Ok(removed)
    }

    pub fn clear_saved_cities(&mut self) {
        self.saved_cities.clear();
        self.notify_saved_cities();
    }

    async fn complete_search(&mut self, locator: Locator) {
        let units = self.preferences.get().units;

        match self.fetch(&locator, units).await {
            Ok(view) => {
                let city = match locator {
                    Locator::City(name) => {
                        if let Err(e) = self.storage.set(LAST_SEARCHED_CITY_KEY, &name) {
                            tracing::warn!(error = %e, "failed to persist last searched city");
                        }
                        name
                    }
                    Locator::Coordinates(_) => view.snapshot.city.clone(),
                };

                tracing::info!(
                    city = %view.snapshot.display_name(),
                    %units,
                    days = view.forecast.len(),
                    "search succeeded"
                );

                self.displayed_city = Some(city);
                self.saved_cities.upsert(&view.snapshot);
                self.notify_saved_cities();
                self.set_state(SearchState::Displaying(view));
            }
            Err(e) => {
                tracing::warn!(error = ?e, ?locator, "search failed");
                self.set_state(SearchState::Error(e));
            }
        }
    }

    async fn fetch(&self, locator: &Locator, units: Units) -> Result<WeatherView, WeatherError> {
        let snapshot = self.gateway.fetch_current(locator, units).await?;
        let samples = self.gateway.fetch_forecast(locator, units).await?;

        Ok(WeatherView { snapshot, forecast: forecast::aggregate(&samples) })
    }

    fn set_state(&mut self, state: SearchState) {
        tracing::debug!(from = self.state.name(), to = state.name(), "search state");
        self.state = state;
        self.presenter.search_state_changed(&self.state);
    }

    fn notify_saved_cities(&self) {
        self.presenter
            .saved_cities_changed(self.saved_cities.list(), self.preferences.get().units);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::GeolocationError,
        geolocation::FixedGeolocator,
        model::{Coordinates, ForecastSample},
        saved_cities::MAX_SAVED_CITIES,
        storage::{MemoryStore, SAVED_CITIES_KEY},
    };
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use parking_lot::Mutex;

    /// Answers every city with fixed weather except those listed as missing.
    #[derive(Debug, Default)]
    struct FakeGateway {
        missing: Vec<String>,
        calls: Mutex<Vec<(Locator, Units)>>,
    }

    impl FakeGateway {
        fn missing(cities: &[&str]) -> Self {
            Self { missing: cities.iter().map(|c| c.to_string()).collect(), ..Self::default() }
        }

        fn calls(&self) -> Vec<(Locator, Units)> {
            self.calls.lock().clone()
        }

        fn lookup(&self, locator: &Locator, units: Units) -> Result<String, WeatherError> {
            self.calls.lock().push((locator.clone(), units));
            match locator {
                Locator::City(name) if self.missing.contains(name) => {
                    Err(WeatherError::LocationNotFound)
                }
                Locator::City(name) => Ok(name.clone()),
                Locator::Coordinates(_) => Ok("Lisbon".to_string()),
            }
        }
    }

    #[async_trait]
    impl WeatherGateway for FakeGateway {
        async fn fetch_current(
            &self,
            locator: &Locator,
            units: Units,
        ) -> Result<WeatherSnapshot, WeatherError> {
            let city = self.lookup(locator, units)?;
            let temperature = match units {
                Units::Metric => 20.0,
                Units::Imperial => 68.0,
            };
            Ok(WeatherSnapshot {
                city,
                country: "XX".into(),
                description: "clear sky".into(),
                temperature,
                feels_like: temperature,
                humidity_pct: 30,
                wind_speed: 1.5,
                visibility_m: Some(10_000),
                pressure_hpa: 1013,
                icon: "01d".into(),
                units,
                observed_at: Utc.with_ymd_and_hms(2026, 7, 1, 12, 0, 0).unwrap(),
            })
        }

        async fn fetch_forecast(
            &self,
            locator: &Locator,
            units: Units,
        ) -> Result<Vec<ForecastSample>, WeatherError> {
            self.lookup(locator, units)?;
            let at = |day, hour, temperature| ForecastSample {
                timestamp: Utc.with_ymd_and_hms(2026, 7, day, hour, 0, 0).unwrap(),
                temperature,
                icon: "01d".into(),
                description: "clear sky".into(),
            };
            Ok(vec![at(3, 12, 25.0), at(4, 12, 22.0), at(5, 12, 19.0)])
        }

        async fn fetch_suggestions(&self, _partial: &str) -> Result<Vec<Suggestion>, WeatherError> {
            Ok(Vec::new())
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    enum Shown {
        State(&'static str),
        Cities(Vec<String>, Units),
        Theme(ColorScheme),
    }

    #[derive(Default)]
    struct RecordingPresenter {
        shown: Mutex<Vec<Shown>>,
    }

    impl RecordingPresenter {
        fn states(&self) -> Vec<&'static str> {
            self.shown
                .lock()
                .iter()
                .filter_map(|s| match s {
                    Shown::State(name) => Some(*name),
                    _ => None,
                })
                .collect()
        }

        fn themes(&self) -> Vec<ColorScheme> {
            self.shown
                .lock()
                .iter()
                .filter_map(|s| match s {
                    Shown::Theme(t) => Some(*t),
                    _ => None,
                })
                .collect()
        }

        fn last_cities(&self) -> Option<Shown> {
            self.shown.lock().iter().rev().find(|s| matches!(s, Shown::Cities(..))).cloned()
        }
    }

    impl Presenter for RecordingPresenter {
        fn search_state_changed(&self, state: &SearchState) {
            self.shown.lock().push(Shown::State(state.name()));
        }

        fn saved_cities_changed(&self, cities: &[SavedCity], units: Units) {
            let keys = cities.iter().map(|c| c.key.clone()).collect();
            self.shown.lock().push(Shown::Cities(keys, units));
        }

        fn theme_changed(&self, scheme: ColorScheme) {
            self.shown.lock().push(Shown::Theme(scheme));
        }
    }

    struct Harness {
        session: Session,
        gateway: Arc<FakeGateway>,
        storage: Arc<MemoryStore>,
        presenter: Arc<RecordingPresenter>,
    }

    fn harness_with(gateway: FakeGateway, storage: Arc<MemoryStore>) -> Harness {
        let gateway = Arc::new(gateway);
        let presenter = Arc::new(RecordingPresenter::default());
        let session = Session::new(gateway.clone(), storage.clone(), presenter.clone());
        Harness { session, gateway, storage, presenter }
    }

    fn harness() -> Harness {
        harness_with(FakeGateway::default(), Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn empty_input_never_loads() {
        let mut h = harness();

        let state = h.session.search("   ").await;

        assert_eq!(state, &SearchState::Error(WeatherError::EmptyInput));
        assert_eq!(h.presenter.states(), vec!["error"]);
        assert!(h.gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn successful_search_displays_and_saves() {
        let mut h = harness();

        let state = h.session.search("  Paris ").await.clone();

        let SearchState::Displaying(view) = state else {
            panic!("expected displaying, got {state:?}");
        };
        assert_eq!(view.snapshot.city, "Paris");
        assert_eq!(view.forecast.len(), 3);
        assert_eq!(h.presenter.states(), vec!["loading", "displaying"]);
        assert_eq!(h.storage.get(LAST_SEARCHED_CITY_KEY).as_deref(), Some("Paris"));
        assert_eq!(h.session.saved_cities()[0].key, "Paris, XX");
        assert_eq!(
            h.presenter.last_cities(),
            Some(Shown::Cities(vec!["Paris, XX".into()], Units::Metric))
        );
        assert_eq!(h.gateway.calls().len(), 2);
    }

    #[tokio::test]
    async fn not_found_leaves_stores_untouched() {
        let storage = Arc::new(MemoryStore::new());
        let mut h = harness_with(FakeGateway::missing(&["Nowhereville"]), storage);
        h.session.search("Paris").await;
        let before = h.session.saved_cities().to_vec();

        let state = h.session.search("Nowhereville").await;

        assert_eq!(state, &SearchState::Error(WeatherError::LocationNotFound));
        assert!(state.error_message().unwrap().contains("City not found"));
        assert_eq!(h.session.saved_cities(), before.as_slice());
        assert_eq!(h.storage.get(LAST_SEARCHED_CITY_KEY).as_deref(), Some("Paris"));
    }

    #[tokio::test]
    async fn unit_change_refetches_displayed_city() {
        let mut h = harness();
        h.session.search("Paris").await;

        h.session.set_units(Units::Imperial).await;

        let calls = h.gateway.calls();
        assert_eq!(calls.last(), Some(&(Locator::City("Paris".into()), Units::Imperial)));
        let saved = &h.session.saved_cities()[0];
        assert_eq!(h.session.saved_cities().len(), 1);
        assert_eq!(saved.temperature, 68);
        assert_eq!(saved.units, Units::Imperial);
        assert_eq!(h.session.preferences().units, Units::Imperial);
        assert!(matches!(h.session.state(), SearchState::Displaying(v) if v.snapshot.units == Units::Imperial));
    }

    #[tokio::test]
    async fn unit_change_without_display_only_persists() {
        let mut h = harness();

        h.session.set_units(Units::Imperial).await;

        assert!(h.gateway.calls().is_empty());
        assert_eq!(h.session.state(), &SearchState::Idle);
        assert_eq!(h.storage.get(crate::storage::UNITS_KEY).as_deref(), Some("imperial"));
    }

    #[tokio::test]
    async fn start_resumes_last_search() {
        let storage = Arc::new(MemoryStore::new());
        storage.set(LAST_SEARCHED_CITY_KEY, "Oslo").unwrap();
        let mut h = harness_with(FakeGateway::default(), storage);

        h.session.start().await;

        assert_eq!(h.gateway.calls(), vec![
            (Locator::City("Oslo".into()), Units::Metric),
            (Locator::City("Oslo".into()), Units::Metric),
        ]);
        assert_eq!(h.presenter.themes(), vec![ColorScheme::Light]);
        assert!(matches!(h.session.state(), SearchState::Displaying(_)));
    }

    #[tokio::test]
    async fn start_without_history_stays_idle() {
        let mut h = harness();
        h.session.start().await;

        assert!(h.gateway.calls().is_empty());
        assert_eq!(h.session.state(), &SearchState::Idle);
        assert_eq!(h.presenter.last_cities(), Some(Shown::Cities(Vec::new(), Units::Metric)));
    }

    #[tokio::test]
    async fn start_with_corrupt_saved_cities_is_empty() {
        let storage = Arc::new(MemoryStore::new());
        storage.set(SAVED_CITIES_KEY, "not json").unwrap();
        let h = harness_with(FakeGateway::default(), storage);

        assert!(h.session.saved_cities().is_empty());
    }

    #[tokio::test]
    async fn location_search_without_provider_is_unsupported() {
        let mut h = harness();

        let state = h.session.search_current_location().await;

        assert_eq!(state, &SearchState::Error(WeatherError::GeolocationUnsupported));
        assert_eq!(h.presenter.states(), vec!["error"]);
    }

    #[tokio::test]
    async fn location_search_uses_coordinates() {
        let mut h = harness();
        let here = Coordinates { latitude: 38.72, longitude: -9.14 };
        h.session = h.session.with_geolocator(Arc::new(FixedGeolocator(here)));

        h.session.search_current_location().await;

        assert_eq!(h.gateway.calls()[0], (Locator::Coordinates(here), Units::Metric));
        assert_eq!(h.session.saved_cities()[0].key, "Lisbon, XX");
        assert!(h.storage.get(LAST_SEARCHED_CITY_KEY).is_none());

        h.session.set_units(Units::Imperial).await;
        assert_eq!(
            h.gateway.calls().last(),
            Some(&(Locator::City("Lisbon".into()), Units::Imperial))
        );
    }

    #[derive(Debug)]
    struct FailingGeolocator(GeolocationError);

    #[async_trait]
    impl Geolocator for FailingGeolocator {
        async fn current_position(&self) -> Result<Coordinates, GeolocationError> {
            Err(self.0.clone())
        }
    }

    #[derive(Debug)]
    struct StalledGeolocator;

    #[async_trait]
    impl Geolocator for StalledGeolocator {
        async fn current_position(&self) -> Result<Coordinates, GeolocationError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Err(GeolocationError::Timeout)
        }
    }

    #[tokio::test]
    async fn location_failures_map_to_distinct_errors() {
        for (failure, expected) in [
            (GeolocationError::PermissionDenied, WeatherError::GeolocationPermissionDenied),
            (GeolocationError::Timeout, WeatherError::GeolocationTimeout),
            (
                GeolocationError::PositionUnavailable("no fix".into()),
                WeatherError::GeolocationUnavailable,
            ),
        ] {
            let mut h = harness();
            h.session = h.session.with_geolocator(Arc::new(FailingGeolocator(failure)));

            let state = h.session.search_current_location().await;

            assert_eq!(state, &SearchState::Error(expected));
            assert_eq!(h.presenter.states(), vec!["loading", "error"]);
            assert!(h.gateway.calls().is_empty());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_location_times_out() {
        let mut h = harness();
        h.session = h
            .session
            .with_geolocator(Arc::new(StalledGeolocator))
            .with_geolocation_timeout(Duration::from_secs(2));

        let started = tokio::time::Instant::now();
        let state = h.session.search_current_location().await;

        assert_eq!(state, &SearchState::Error(WeatherError::GeolocationTimeout));
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test]
    async fn dismiss_error_returns_to_idle_without_search() {
        let mut h = harness();
        h.session.search("").await;

        h.session.dismiss_error();

        assert_eq!(h.session.state(), &SearchState::Idle);
        assert!(h.gateway.calls().is_empty());

        h.session.search("Rome").await;
        h.session.dismiss_error();
        assert!(matches!(h.session.state(), SearchState::Displaying(_)));
    }

    #[tokio::test]
    async fn auto_theme_tracks_host_scheme() {
        let mut h = harness();

        h.session.set_theme(Theme::Dark);
        h.session.host_scheme_changed(ColorScheme::Light);
        h.session.set_theme(Theme::Auto);
        h.session.host_scheme_changed(ColorScheme::Dark);

        assert_eq!(
            h.presenter.themes(),
            vec![ColorScheme::Dark, ColorScheme::Light, ColorScheme::Dark]
        );
        assert_eq!(h.session.resolved_theme(), ColorScheme::Dark);
        assert_eq!(h.storage.get(crate::storage::THEME_KEY).as_deref(), Some("auto"));
    }

    #[tokio::test]
    async fn remove_and_clear_saved_cities() {
        let mut h = harness();
        h.session.search("Paris").await;
        h.session.search("Rome").await;

        let err = h.session.remove_saved_city(7).unwrap_err();
        assert_eq!(err, SavedCityError::IndexOutOfRange { index: 7, len: 2 });

        let removed = h.session.remove_saved_city(0).unwrap();
        assert_eq!(removed.key, "Rome, XX");
        assert_eq!(
            h.presenter.last_cities(),
            Some(Shown::Cities(vec!["Paris, XX".into()], Units::Metric))
        );

        h.session.clear_saved_cities();
        assert!(h.session.saved_cities().is_empty());
    }

    #[tokio::test]
    async fn many_searches_stay_capped() {
        let mut h = harness();
        for i in 0..(MAX_SAVED_CITIES + 3) {
            h.session.search(&format!("City{i}")).await;
        }
        assert_eq!(h.session.saved_cities().len(), MAX_SAVED_CITIES);
        assert_eq!(h.session.saved_cities()[0].key, "City12, XX");
    }

    #[tokio::test]
    async fn selecting_suggestion_searches_by_name() {
        let mut h = harness();
        let pick = Suggestion {
            name: "Porto".into(),
            state: None,
            country: "PT".into(),
            latitude: 41.15,
            longitude: -8.61,
        };

        h.session.select_suggestion(&pick).await;

        assert_eq!(h.gateway.calls()[0], (Locator::City("Porto".into()), Units::Metric));
    }
}
