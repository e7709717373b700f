use crate::{
    Config, WeatherError,
    model::{Coordinates, Unit, WeatherRecord},
    provider::openweather::OpenWeatherProvider,
};
use async_trait::async_trait;
use std::{fmt::Debug, sync::Arc};

pub mod openweather;

/// Remote source of current conditions. Implementations do not cache.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    async fn fetch_by_name(&self, city: &str, unit: Unit) -> Result<WeatherRecord, WeatherError>;

    async fn fetch_by_coords(
        &self,
        coords: Coordinates,
        unit: Unit,
    ) -> Result<WeatherRecord, WeatherError>;
}

/// Construct the OpenWeather provider from config.
pub fn provider_from_config(config: &Config) -> anyhow::Result<Arc<dyn WeatherProvider>> {
    let api_key = config.resolve_api_key()?;

    let provider = OpenWeatherProvider::with_base_url(api_key, config.base_url())?;
    Ok(Arc::new(provider))
}
