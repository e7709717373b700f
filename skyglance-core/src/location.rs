//! Current-location resolution with a fixed fallback city.
//!
//! A [`LocationSource`] stands in for the device capability. Whatever it
//! reports, [`resolve_current_location`] settles on a place name: the name
//! the provider returns for the coordinates, or the fallback city.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::{fmt::Debug, time::Duration};

use crate::{
    error::LocationError,
    model::{Coordinates, WeatherRecord},
    service::WeatherService,
};

pub const DEFAULT_FALLBACK_CITY: &str = "Boston";

#[async_trait]
pub trait LocationSource: Send + Sync + Debug {
    async fn current_position(&self) -> Result<Coordinates, LocationError>;
}

/// No location capability at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLocation;

#[async_trait]
impl LocationSource for NoLocation {
    async fn current_position(&self) -> Result<Coordinates, LocationError> {
        Err(LocationError::Unavailable)
    }
}

/// Coordinates supplied up front, e.g. from the command line.
#[derive(Debug, Clone, Copy)]
pub struct FixedPosition(pub Coordinates);

#[async_trait]
impl LocationSource for FixedPosition {
    async fn current_position(&self) -> Result<Coordinates, LocationError> {
        Ok(self.0)
    }
}

pub const IP_API_URL: &str = "http://ip-api.com/json/";
const IP_LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

/// Approximate position from the public IP address via ip-api.com.
#[derive(Debug, Clone)]
pub struct IpLocator {
    url: String,
    http: Client,
}

#[derive(Debug, Deserialize)]
struct IpApiResponse {
    status: String,
    lat: Option<f64>,
    lon: Option<f64>,
    message: Option<String>,
}

impl IpLocator {
    pub fn new() -> Result<Self, LocationError> {
        Self::with_url(IP_API_URL)
    }

    pub fn with_url(url: &str) -> Result<Self, LocationError> {
        let http = Client::builder()
            .timeout(IP_LOOKUP_TIMEOUT)
            .build()
            .map_err(|e| LocationError::Failed(e.to_string()))?;

        Ok(Self {
            url: url.to_string(),
            http,
        })
    }
}

#[async_trait]
impl LocationSource for IpLocator {
    async fn current_position(&self) -> Result<Coordinates, LocationError> {
        let response = self
            .http
            .get(&self.url)
            .send()
            .await
            .map_err(|e| LocationError::Failed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(LocationError::Failed(format!(
                "IP lookup returned status {}",
                response.status()
            )));
        }

        let body: IpApiResponse = response
            .json()
            .await
            .map_err(|e| LocationError::Failed(e.to_string()))?;

        if body.status != "success" {
            tracing::debug!(message = ?body.message, "IP lookup refused");
            return Err(LocationError::Denied);
        }

        match (body.lat, body.lon) {
            (Some(lat), Some(lon)) => Ok(Coordinates::new(lat, lon)),
            _ => Err(LocationError::Failed(
                "IP lookup response had no coordinates".to_string(),
            )),
        }
    }
}

/// Where the current location settled. Both variants are terminal.
#[derive(Debug, Clone, PartialEq)]
pub enum CurrentLocation {
    /// Name the provider returned for the device coordinates.
    Resolved { name: String, record: WeatherRecord },
    /// The fixed fallback city; `record` is `None` if even that fetch failed.
    Fallback {
        name: String,
        record: Option<WeatherRecord>,
    },
}

impl CurrentLocation {
    pub fn name(&self) -> &str {
        match self {
            CurrentLocation::Resolved { name, .. } | CurrentLocation::Fallback { name, .. } => {
                name.as_str()
            }
        }
    }

    pub fn record(&self) -> Option<&WeatherRecord> {
        match self {
            CurrentLocation::Resolved { record, .. } => Some(record),
            CurrentLocation::Fallback { record, .. } => record.as_ref(),
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, CurrentLocation::Fallback { .. })
    }
}

/// Run the single location attempt. Never fails.
pub async fn resolve_current_location(
    service: &WeatherService,
    source: &dyn LocationSource,
    fallback_city: &str,
) -> CurrentLocation {
    match source.current_position().await {
        Ok(coords) => match service.fetch_by_coords(coords).await {
            Ok(record) => {
                tracing::info!(name = %record.name, "resolved current location");
                return CurrentLocation::Resolved {
                    name: record.name.clone(),
                    record,
                };
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to fetch current location weather");
            }
        },
        Err(LocationError::Unavailable) => {
            tracing::info!("location capability unavailable");
        }
        Err(err) => {
            tracing::warn!(error = %err, "error getting location");
        }
    }

    fallback(service, fallback_city).await
}

async fn fallback(service: &WeatherService, fallback_city: &str) -> CurrentLocation {
    tracing::info!(city = fallback_city, "using fallback location");
    let record = service.get_weather(fallback_city).await.ok();

    CurrentLocation::Fallback {
        name: fallback_city.to_string(),
        record,
    }
}
