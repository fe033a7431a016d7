use std::{process::ExitCode, sync::Arc};

use anyhow::{Context, anyhow};
use clap::{Parser, Subcommand};
use cityweather_core::{
    ColorScheme, Config, Coordinates, FileStore, FixedGeolocator, SearchState, Session, Theme,
    UnconfiguredGateway, Units, WeatherGateway, gateway_from_config,
};
use inquire::{Confirm, Password, Select};
use tokio::sync::mpsc;

use crate::presenter::{TerminalPresenter, render_saved_cities};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "cityweather", version, about = "Current weather and 5-day forecast by city")]
pub struct Cli {
    /// Without a subcommand, shows the last searched city again.
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the OpenWeather API key and host colour scheme.
    Configure,

    /// Show weather for a city.
    Show {
        /// City name, optionally with a country code ("Paris, FR").
        city: String,
    },

    /// Show weather for a position.
    Here {
        #[arg(long, allow_negative_numbers = true, requires = "lon")]
        lat: Option<f64>,

        #[arg(long, allow_negative_numbers = true, requires = "lat")]
        lon: Option<f64>,
    },

    /// Look up matching city names and pick one to show.
    Suggest {
        /// At least three characters of a city name.
        partial: String,
    },

    /// Switch between "metric" and "imperial".
    Units { units: String },

    /// Switch between "light", "dark" and "auto".
    Theme { theme: String },

    /// Manage saved cities.
    Cities {
        #[command(subcommand)]
        action: Option<CitiesCommand>,
    },
}

#[derive(Debug, Subcommand)]
pub enum CitiesCommand {
    /// List saved cities (the default).
    List,

    /// Show weather for a saved city.
    Open {
        /// Position as listed, starting at 1.
        position: usize,
    },

    /// Remove a saved city.
    Remove {
        /// Position as listed, starting at 1.
        position: usize,
    },

    /// Remove all saved cities.
    Clear {
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },
}

impl Cli {
    /// Runs the command; a search that ends in an error exits non-zero.
    pub async fn run(self) -> anyhow::Result<ExitCode> {
        let mut config = Config::load()?;

        let failed = match self.command {
            None => {
                let mut session = open_session(&config, false)?;
                let state = session.start().await;
                if matches!(state, SearchState::Idle) {
                    println!("No previous search. Try `cityweather show <city>`.");
                }
                search_failed(state)
            }
            Some(Command::Configure) => {
                configure(&mut config)?;
                false
            }
            Some(Command::Show { city }) => {
                search_failed(open_session(&config, false)?.search(&city).await)
            }
            Some(Command::Here { lat, lon }) => {
                let mut session = open_session(&config, false)?;
                if let (Some(latitude), Some(longitude)) = (lat, lon) {
                    let here = Coordinates { latitude, longitude };
                    session = session.with_geolocator(Arc::new(FixedGeolocator(here)));
                }
                search_failed(session.search_current_location().await)
            }
            Some(Command::Suggest { partial }) => {
                let mut session = open_session(&config, false)?;
                suggest(&mut session, &partial).await?
            }
            Some(Command::Units { units }) => {
                change_units(&config, Units::try_from(units.as_str())?).await?
            }
            Some(Command::Theme { theme }) => {
                change_theme(&config, Theme::try_from(theme.as_str())?)?;
                false
            }
            Some(Command::Cities { action }) => {
                let action = action.unwrap_or(CitiesCommand::List);
                let mut session = match action {
                    CitiesCommand::Open { .. } => open_session(&config, true)?,
                    _ => open_local_session(&config, true)?,
                };
                cities(&mut session, action).await?
            }
        };

        Ok(if failed { ExitCode::FAILURE } else { ExitCode::SUCCESS })
    }
}

fn search_failed(state: &SearchState) -> bool {
    matches!(state, SearchState::Error(_))
}

/// For commands that search. Fails early when no API key is configured.
/// `show_cities` prints the saved-city list after every change to it.
fn open_session(config: &Config, show_cities: bool) -> anyhow::Result<Session> {
    build_session(config, gateway_from_config(config)?, show_cities)
}

/// For commands that only touch preferences and saved cities; works without
/// an API key.
fn open_local_session(config: &Config, show_cities: bool) -> anyhow::Result<Session> {
    let gateway = gateway_from_config(config)
        .unwrap_or_else(|_| Arc::new(UnconfiguredGateway) as Arc<dyn WeatherGateway>);
    build_session(config, gateway, show_cities)
}

fn build_session(
    config: &Config,
    gateway: Arc<dyn WeatherGateway>,
    show_cities: bool,
) -> anyhow::Result<Session> {
    let storage = FileStore::open(config.storage_file_path()?);
    tracing::debug!(path = %storage.path().display(), "opened state file");

    let presenter = TerminalPresenter::new(show_cities);

    Ok(Session::new(gateway, Arc::new(storage), Arc::new(presenter))
        .with_host_scheme(config.color_scheme))
}

fn configure(config: &mut Config) -> anyhow::Result<()> {
    let api_key = Password::new("OpenWeather API key:")
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;

    let schemes = vec![ColorScheme::Light, ColorScheme::Dark];
    let scheme = Select::new("Host colour scheme (used by the \"auto\" theme):", schemes)
        .prompt()
        .context("Failed to read colour scheme")?;

    config.set_api_key(api_key.trim().to_string());
    config.color_scheme = scheme;
    config.save()?;

    println!("Configuration saved to {}", Config::config_file_path()?.display());
    Ok(())
}

/// Persist the unit system, then show the last searched city in it when a
/// key is available. Returns whether that refresh failed.
async fn change_units(config: &Config, units: Units) -> anyhow::Result<bool> {
    let mut session = open_local_session(config, false)?;
    session.set_units(units).await;
    println!("Units set to {units}.");

    if config.api_key().is_none() {
        return Ok(false);
    }

    // A fresh process has nothing on screen; refresh the last city instead.
    match session.last_searched_city() {
        Some(city) => Ok(search_failed(session.search(&city).await)),
        None => Ok(false),
    }
}

fn change_theme(config: &Config, theme: Theme) -> anyhow::Result<()> {
    let mut session = open_local_session(config, false)?;
    session.set_theme(theme);
    println!("Theme set to {theme} (showing {}).", session.resolved_theme());
    Ok(())
}

/// Returns whether the picked city failed to load.
async fn suggest(session: &mut Session, partial: &str) -> anyhow::Result<bool> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut lookup = session.suggestion_lookup(tx);

    if lookup.on_input(partial).is_none() {
        println!("Type at least three characters to get suggestions.");
        return Ok(false);
    }

    let suggestions = rx.recv().await.unwrap_or_default();
    if suggestions.is_empty() {
        println!("No suggestions.");
        return Ok(false);
    }

    let labels: Vec<String> = suggestions.iter().map(|s| s.label()).collect();
    let choice = Select::new("Pick a city:", labels)
        .raw_prompt()
        .context("Failed to read selection")?;

    lookup.cancel();
    Ok(search_failed(session.select_suggestion(&suggestions[choice.index]).await))
}

/// Returns whether opening a saved city failed to load.
async fn cities(session: &mut Session, action: CitiesCommand) -> anyhow::Result<bool> {
    match action {
        CitiesCommand::List => println!("{}", render_saved_cities(session.saved_cities())),
        CitiesCommand::Open { position } => {
            let index = list_index(position)?;
            let name = session
                .saved_cities()
                .get(index)
                .map(|c| c.name.clone())
                .ok_or_else(|| anyhow!("No saved city at position {position}"))?;
            return Ok(search_failed(session.search(&name).await));
        }
        CitiesCommand::Remove { position } => {
            let removed = session.remove_saved_city(list_index(position)?)?;
            println!("Removed {}.", removed.key);
        }
        CitiesCommand::Clear { yes } => {
            let confirmed = yes
                || Confirm::new("Are you sure you want to clear all saved cities?")
                    .with_default(false)
                    .prompt()
                    .context("Failed to read confirmation")?;

            if confirmed {
                session.clear_saved_cities();
            }
        }
    }

    Ok(false)
}

fn list_index(position: usize) -> anyhow::Result<usize> {
    position
        .checked_sub(1)
        .ok_or_else(|| anyhow!("Positions start at 1"))
}
