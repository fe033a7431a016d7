//! Bucketing of 3-hour forecast samples into daily summaries.

use chrono::{Local, NaiveDate, TimeZone};

use crate::model::{DailyForecast, ForecastSample, round_half_up};

pub const MAX_FORECAST_DAYS: usize = 5;

/// Summarize samples per calendar day in the local time zone.
pub fn aggregate(samples: &[ForecastSample]) -> Vec<DailyForecast> {
    aggregate_in(samples, &Local)
}

/// Same as [`aggregate`], with days taken in `tz`.
///
/// Days come out in the order their first sample appears, at most
/// [`MAX_FORECAST_DAYS`] of them. Icon and description are those of each day's
/// first sample.
pub fn aggregate_in<Tz: TimeZone>(samples: &[ForecastSample], tz: &Tz) -> Vec<DailyForecast> {
    let mut days: Vec<DayBucket<'_>> = Vec::new();

    for sample in samples {
        let date = sample.timestamp.with_timezone(tz).date_naive();

        match days.iter_mut().find(|d| d.date == date) {
            Some(day) => day.add(sample.temperature),
            None => days.push(DayBucket::new(date, sample)),
        }
    }

    days.into_iter()
        .take(MAX_FORECAST_DAYS)
        .map(DayBucket::finish)
        .collect()
}

struct DayBucket<'a> {
    date: NaiveDate,
    first: &'a ForecastSample,
    high: f64,
    low: f64,
}

impl<'a> DayBucket<'a> {
    fn new(date: NaiveDate, first: &'a ForecastSample) -> Self {
        Self { date, first, high: first.temperature, low: first.temperature }
    }

    fn add(&mut self, temperature: f64) {
        self.high = self.high.max(temperature);
        self.low = self.low.min(temperature);
    }

    fn finish(self) -> DailyForecast {
        DailyForecast {
            date: self.date,
            high: round_half_up(self.high),
            low: round_half_up(self.low),
            icon: self.first.icon.clone(),
            description: self.first.description.clone(),
        }
    }
}
