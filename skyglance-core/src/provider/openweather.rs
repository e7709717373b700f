use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::{
    error::WeatherError,
    model::{Coordinates, Unit, WeatherRecord},
};

use super::WeatherProvider;

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org";
const CURRENT_WEATHER_PATH: &str = "/data/2.5/weather";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: String,
    base_url: String,
    http: Client,
}

impl OpenWeatherProvider {
    pub fn new(api_key: String) -> Result<Self, WeatherError> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(api_key: String, base_url: &str) -> Result<Self, WeatherError> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    async fn fetch_current(
        &self,
        location: &[(&str, String)],
        unit: Unit,
    ) -> Result<WeatherRecord, WeatherError> {
        let url = format!("{}{}", self.base_url, CURRENT_WEATHER_PATH);

        let res = self
            .http
            .get(&url)
            .query(location)
            .query(&[("appid", self.api_key.as_str()), ("units", unit.as_str())])
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            tracing::debug!(%status, "OpenWeather current request failed");
            return Err(WeatherError::NotFound { status });
        }

        let body = res.text().await?;
        let parsed: OwCurrentResponse = serde_json::from_str(&body).inspect_err(|err| {
            tracing::debug!(error = %err, body = %truncate_body(&body), "unparseable OpenWeather body");
        })?;

        Ok(parsed.into_record(unit))
    }
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    humidity: Option<u8>,
    temp_min: Option<f64>,
    temp_max: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    description: String,
    icon: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OwWind {
    speed: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OwSys {
    sunrise: Option<i64>,
    sunset: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    name: String,
    main: OwMain,
    #[serde(default)]
    weather: Vec<OwWeather>,
    wind: Option<OwWind>,
    sys: Option<OwSys>,
}

impl OwCurrentResponse {
    fn into_record(self, unit: Unit) -> WeatherRecord {
        let (description, icon) = self
            .weather
            .into_iter()
            .next()
            .map(|w| (w.description, w.icon))
            .unwrap_or_else(|| ("Unknown".to_string(), None));

        WeatherRecord {
            name: self.name,
            temperature: self.main.temp,
            humidity_pct: self.main.humidity,
            temp_min: self.main.temp_min,
            temp_max: self.main.temp_max,
            description,
            icon,
            wind_speed: self.wind.and_then(|w| w.speed),
            sunrise: self.sys.as_ref().and_then(|s| s.sunrise),
            sunset: self.sys.as_ref().and_then(|s| s.sunset),
            unit,
        }
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    async fn fetch_by_name(&self, city: &str, unit: Unit) -> Result<WeatherRecord, WeatherError> {
        tracing::debug!(city, %unit, "fetching current weather by name");
        self.fetch_current(&[("q", city.to_string())], unit).await
    }

    async fn fetch_by_coords(
        &self,
        coords: Coordinates,
        unit: Unit,
    ) -> Result<WeatherRecord, WeatherError> {
        tracing::debug!(lat = coords.latitude, lon = coords.longitude, %unit, "fetching current weather by coordinates");
        self.fetch_current(
            &[
                ("lat", coords.latitude.to_string()),
                ("lon", coords.longitude.to_string()),
            ],
            unit,
        )
        .await
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
