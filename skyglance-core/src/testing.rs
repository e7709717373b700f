//! In-process fakes shared by the unit tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::StatusCode;
use std::{
    collections::HashMap,
    sync::atomic::{AtomicI64, Ordering},
};

use crate::{
    clock::Clock,
    error::WeatherError,
    model::{Coordinates, Unit, WeatherRecord},
    provider::WeatherProvider,
};

#[derive(Debug)]
pub struct ManualClock {
    now_ms: AtomicI64,
}

impl ManualClock {
    pub fn new(now_ms: i64) -> Self {
        Self {
            now_ms: AtomicI64::new(now_ms),
        }
    }

    pub fn advance_ms(&self, delta: i64) {
        self.now_ms.fetch_add(delta, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}

pub fn sample_record(name: &str, temperature: f64) -> WeatherRecord {
    WeatherRecord {
        name: name.to_string(),
        temperature,
        humidity_pct: Some(60),
        temp_min: Some(temperature - 2.0),
        temp_max: Some(temperature + 2.0),
        description: "clear sky".to_string(),
        icon: Some("01d".to_string()),
        wind_speed: Some(3.0),
        sunrise: Some(1_700_000_000),
        sunset: Some(1_700_040_000),
        unit: Unit::Metric,
    }
}

/// A call the fake provider received.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Name(String, Unit),
    Coords(Coordinates, Unit),
}

/// Answers from a table of city name to temperature. Unknown cities are 404.
#[derive(Debug, Default)]
pub struct FakeProvider {
    temperatures: Mutex<HashMap<String, f64>>,
    /// Display name returned for a requested name, when it differs.
    aliases: Mutex<HashMap<String, String>>,
    coords_answer: Mutex<Option<String>>,
    calls: Mutex<Vec<Call>>,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_city(self, city: &str, temperature: f64) -> Self {
        self.set_temperature(city, temperature);
        self
    }

    pub fn with_alias(self, requested: &str, resolved: &str) -> Self {
        self.aliases
            .lock()
            .insert(requested.to_string(), resolved.to_string());
        self
    }

    /// Coordinates resolve to this city; without it coordinate lookups are 404.
    pub fn with_coords_city(self, city: &str) -> Self {
        *self.coords_answer.lock() = Some(city.to_string());
        self
    }

    pub fn set_temperature(&self, city: &str, temperature: f64) {
        self.temperatures.lock().insert(city.to_string(), temperature);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    fn answer(&self, city: &str, unit: Unit) -> Result<WeatherRecord, WeatherError> {
        let resolved = self
            .aliases
            .lock()
            .get(city)
            .cloned()
            .unwrap_or_else(|| city.to_string());

        let temperature = self
            .temperatures
            .lock()
            .get(&resolved)
            .copied()
            .ok_or(WeatherError::NotFound {
                status: StatusCode::NOT_FOUND,
            })?;

        let mut record = sample_record(&resolved, temperature);
        record.unit = unit;
        Ok(record)
    }
}

#[async_trait]
impl WeatherProvider for FakeProvider {
    async fn fetch_by_name(&self, city: &str, unit: Unit) -> Result<WeatherRecord, WeatherError> {
        self.calls.lock().push(Call::Name(city.to_string(), unit));
        self.answer(city, unit)
    }

    async fn fetch_by_coords(
        &self,
        coords: Coordinates,
        unit: Unit,
    ) -> Result<WeatherRecord, WeatherError> {
        self.calls.lock().push(Call::Coords(coords, unit));
        let city = self.coords_answer.lock().clone();
        match city {
            Some(city) => self.answer(&city, unit),
            None => Err(WeatherError::NotFound {
                status: StatusCode::NOT_FOUND,
            }),
        }
    }
}
