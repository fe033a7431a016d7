use chrono::{Local, NaiveDate};
use cityweather_core::{
    ColorScheme, Presenter, SavedCity, SearchState, Units, WeatherSnapshot, WeatherView,
    model::round_half_up,
};

/// Prints session output to the terminal.
#[derive(Debug, Default)]
pub struct TerminalPresenter {
    /// Print the saved-city list whenever it changes.
    pub show_saved_cities: bool,
}

impl TerminalPresenter {
    pub fn new(show_saved_cities: bool) -> Self {
        Self { show_saved_cities }
    }
}

impl Presenter for TerminalPresenter {
    fn search_state_changed(&self, state: &SearchState) {
        match state {
            SearchState::Idle => {}
            SearchState::Loading => eprintln!("Fetching weather..."),
            SearchState::Displaying(view) => {
                println!("{}", render_view(view, Local::now().date_naive()));
            }
            SearchState::Error(e) => eprintln!("Error: {e}"),
        }
    }

    fn saved_cities_changed(&self, cities: &[SavedCity], _units: Units) {
        if self.show_saved_cities {
            println!("{}", render_saved_cities(cities));
        }
    }

    fn theme_changed(&self, scheme: ColorScheme) {
        tracing::debug!(%scheme, "theme applied");
    }
}

pub fn render_view(view: &WeatherView, today: NaiveDate) -> String {
    let mut out = render_snapshot(&view.snapshot);

    if !view.forecast.is_empty() {
        out.push_str("\n\n5-day forecast:");
        for day in &view.forecast {
            out.push_str(&format!(
                "\n  {:<6} {:>4}° / {:>4}°  {:<20} {}",
                day.day_label(today),
                day.high,
                day.low,
                day.description,
                day.icon_url()
            ));
        }
    }

    out
}

fn render_snapshot(s: &WeatherSnapshot) -> String {
    let symbol = s.units.temperature_symbol();
    let visibility = s
        .visibility_m
        .map(|m| format!("{:.1} km", f64::from(m) / 1000.0))
        .unwrap_or_else(|| "N/A".to_string());

    format!(
        "{name}: {description}\n\
         Temperature: {temp}°{symbol} (feels like {feels}°{symbol})\n\
         Humidity:    {humidity}%\n\
         Wind:        {wind} {wind_unit}\n\
         Visibility:  {visibility}\n\
         Pressure:    {pressure} hPa\n\
         Icon:        {icon}",
        name = s.display_name(),
        description = s.description,
        temp = round_half_up(s.temperature),
        feels = round_half_up(s.feels_like),
        humidity = s.humidity_pct,
        wind = s.wind_speed,
        wind_unit = s.units.wind_unit(),
        pressure = s.pressure_hpa,
        icon = s.icon_url(),
    )
}

pub fn render_saved_cities(cities: &[SavedCity]) -> String {
    if cities.is_empty() {
        return "No saved cities yet. Search for a city and it will be saved automatically."
            .to_string();
    }

    cities
        .iter()
        .enumerate()
        .map(|(i, c)| {
            format!(
                "{:>2}. {:<28} {:>4}°{}",
                i + 1,
                c.key,
                c.temperature,
                c.units.temperature_symbol()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
