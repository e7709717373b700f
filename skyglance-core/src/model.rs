use serde::{Deserialize, Serialize};
use std::fmt;

/// Unit system sent to the provider as the `units` query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    #[default]
    Metric,
    Imperial,
}

impl Unit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Unit::Metric => "metric",
            Unit::Imperial => "imperial",
        }
    }

    pub const fn all() -> &'static [Unit] {
        &[Unit::Metric, Unit::Imperial]
    }

    /// Temperature suffix, e.g. `°C`.
    pub fn temperature_symbol(&self) -> &'static str {
        match self {
            Unit::Metric => "°C",
            Unit::Imperial => "°F",
        }
    }

    /// OpenWeather reports wind in m/s for metric and mph for imperial.
    pub fn speed_symbol(&self) -> &'static str {
        match self {
            Unit::Metric => "m/s",
            Unit::Imperial => "mph",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Unit {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let lower = value.trim().to_lowercase();

        match lower.as_str() {
            "metric" | "c" | "celsius" => Ok(Unit::Metric),
            "imperial" | "f" | "fahrenheit" => Ok(Unit::Imperial),
            _ => Err(anyhow::anyhow!(
                "Unknown unit '{value}'. Supported units: metric, imperial."
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

/// Current conditions for one place, as returned by the provider.
///
/// Temperatures and wind speed are expressed in `unit`, the unit that was
/// active when the record was fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherRecord {
    pub name: String,
    pub temperature: f64,
    pub humidity_pct: Option<u8>,
    pub temp_min: Option<f64>,
    pub temp_max: Option<f64>,
    pub description: String,
    pub icon: Option<String>,
    pub wind_speed: Option<f64>,
    /// Epoch seconds.
    pub sunrise: Option<i64>,
    /// Epoch seconds.
    pub sunset: Option<i64>,
    #[serde(default)]
    pub unit: Unit,
}
