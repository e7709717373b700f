use futures::future::join_all;
use std::sync::Arc;

use crate::{
    cache::WeatherCache,
    clock::Clock,
    error::{StoreError, WeatherError},
    model::{Coordinates, Unit, WeatherRecord},
    provider::WeatherProvider,
    store::KeyValueStore,
};

/// Store key holding the selected unit.
pub const UNIT_KEY: &str = "unit";

/// Cached weather lookups plus the persisted unit setting.
#[derive(Debug, Clone)]
pub struct WeatherService {
    provider: Arc<dyn WeatherProvider>,
    store: Arc<dyn KeyValueStore>,
    cache: WeatherCache,
}

impl WeatherService {
    pub fn new(
        provider: Arc<dyn WeatherProvider>,
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let cache = WeatherCache::new(store.clone(), clock);
        Self {
            provider,
            store,
            cache,
        }
    }

    pub fn cache(&self) -> &WeatherCache {
        &self.cache
    }

    /// The persisted unit, metric when unset or unreadable.
    pub fn unit(&self) -> Unit {
        stored_unit(self.store.as_ref())
    }

    pub fn set_unit(&self, unit: Unit) -> Result<(), StoreError> {
        tracing::debug!(%unit, "persisting unit");
        self.store.set(UNIT_KEY, unit.as_str())
    }

    /// Fresh cached record for `city`, otherwise one fetch in the current unit.
    ///
    /// A failed fetch leaves any existing entry for `city` untouched.
    pub async fn get_weather(&self, city: &str) -> Result<WeatherRecord, WeatherError> {
        if let Some(record) = self.cache.get_cached(city) {
            return Ok(record);
        }

        self.fetch_by_name(city, self.unit()).await
    }

    /// Like [`get_weather`](Self::get_weather) in an explicit unit: a fresh
    /// record fetched in another unit is refetched in `unit`.
    pub async fn get_weather_in(&self, city: &str, unit: Unit) -> Result<WeatherRecord, WeatherError> {
        match self.cache.get_cached(city) {
            Some(record) if record.unit == unit => Ok(record),
            Some(record) => {
                tracing::debug!(city, cached = %record.unit, %unit, "cached record is in another unit");
                self.fetch_by_name(city, unit).await
            }
            None => self.fetch_by_name(city, unit).await,
        }
    }

    /// Bypass the cache gate and fetch `city`, caching the result on success.
    pub async fn fetch_by_name(&self, city: &str, unit: Unit) -> Result<WeatherRecord, WeatherError> {
        let record = self.provider.fetch_by_name(city, unit).await?;
        self.remember(Some(city), &record);
        Ok(record)
    }

    /// Fetch by coordinates in the current unit, caching under the returned name.
    pub async fn fetch_by_coords(&self, coords: Coordinates) -> Result<WeatherRecord, WeatherError> {
        let record = self.provider.fetch_by_coords(coords, self.unit()).await?;
        self.remember(None, &record);
        Ok(record)
    }

    /// Look up every city concurrently. Failed cities are dropped; the rest
    /// keep their input order.
    pub async fn get_weather_many(&self, cities: &[String]) -> Vec<(String, WeatherRecord)> {
        self.lookup_many(cities, None).await
    }

    /// [`get_weather_in`](Self::get_weather_in) for every city, concurrently.
    pub async fn get_weather_many_in(
        &self,
        cities: &[String],
        unit: Unit,
    ) -> Vec<(String, WeatherRecord)> {
        self.lookup_many(cities, Some(unit)).await
    }

    async fn lookup_many(&self, cities: &[String], unit: Option<Unit>) -> Vec<(String, WeatherRecord)> {
        let lookups = cities.iter().map(|city| async move {
            let result = match unit {
                Some(unit) => self.get_weather_in(city, unit).await,
                None => self.get_weather(city).await,
            };
            (city, result)
        });

        join_all(lookups)
            .await
            .into_iter()
            .filter_map(|(city, result)| match result {
                Ok(record) => Some((city.clone(), record)),
                Err(err) => {
                    tracing::warn!(city = %city, error = %err, "failed to fetch weather data");
                    None
                }
            })
            .collect()
    }

    fn remember(&self, requested: Option<&str>, record: &WeatherRecord) {
        let mut keys = vec![record.name.as_str()];
        if let Some(requested) = requested.filter(|r| *r != record.name) {
            keys.push(requested);
        }

        for key in keys {
            if let Err(err) = self.cache.put(key, record) {
                tracing::warn!(city = key, error = %err, "failed to cache weather data");
            }
        }
    }
}

/// Unit persisted in `store`, metric when unset or unreadable.
pub fn stored_unit(store: &dyn KeyValueStore) -> Unit {
    let Some(raw) = store.get(UNIT_KEY) else {
        return Unit::default();
    };

    Unit::try_from(raw.as_str()).unwrap_or_else(|err| {
        tracing::warn!(error = %err, "ignoring stored unit");
        Unit::default()
    })
}
