//! The home list: current location plus default cities, with periodic refresh.

use std::{future::Future, time::Duration};
use tokio::time::MissedTickBehavior;

use crate::{
    error::StoreError,
    location::{CurrentLocation, LocationSource, resolve_current_location},
    model::{Unit, WeatherRecord},
    service::WeatherService,
};

pub const DEFAULT_CITIES: [&str; 2] = ["Berlin", "London"];

/// Ten minutes.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(600);

#[derive(Debug, Clone, PartialEq)]
pub struct Tile {
    pub city: String,
    pub is_current: bool,
    /// `None` when the lookup for this city failed.
    pub record: Option<WeatherRecord>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// Unit selected when the snapshot was taken. Cached records may carry another.
    pub unit: Unit,
    pub tiles: Vec<Tile>,
}

impl Snapshot {
    pub fn tile(&self, city: &str) -> Option<&Tile> {
        self.tiles.iter().find(|t| t.city == city)
    }

    pub fn records(&self) -> impl Iterator<Item = &WeatherRecord> {
        self.tiles.iter().filter_map(|t| t.record.as_ref())
    }
}

#[derive(Debug)]
pub struct Dashboard {
    service: WeatherService,
    default_cities: Vec<String>,
    fallback_city: String,
    current: Option<CurrentLocation>,
}

impl Dashboard {
    pub fn new(
        service: WeatherService,
        default_cities: Vec<String>,
        fallback_city: impl Into<String>,
    ) -> Self {
        Self {
            service,
            default_cities,
            fallback_city: fallback_city.into(),
            current: None,
        }
    }

    pub fn service(&self) -> &WeatherService {
        &self.service
    }

    pub fn current_location(&self) -> Option<&CurrentLocation> {
        self.current.as_ref()
    }

    /// Settle the current location. Only the first call consults `source`.
    pub async fn locate(&mut self, source: &dyn LocationSource) -> &CurrentLocation {
        let current = match self.current.take() {
            Some(current) => current,
            None => resolve_current_location(&self.service, source, &self.fallback_city).await,
        };
        self.current.insert(current)
    }

    /// Current location first, then the default cities, without duplicates.
    pub fn cities(&self) -> Vec<String> {
        let mut cities: Vec<String> = Vec::with_capacity(self.default_cities.len() + 1);

        let current = self.current.as_ref().map(CurrentLocation::name);
        for city in current.into_iter().chain(self.default_cities.iter().map(String::as_str)) {
            if !cities.iter().any(|c| c == city) {
                cities.push(city.to_string());
            }
        }

        cities
    }

    /// Look up every displayed city through the cache gate.
    pub async fn refresh(&self) -> Snapshot {
        let cities = self.cities();
        let found = self.service.get_weather_many(&cities).await;
        self.snapshot(cities, self.service.unit(), found)
    }

    /// Like [`refresh`](Self::refresh), but any city whose cached record was
    /// fetched in another unit is refetched in `unit`.
    pub async fn refresh_in(&self, unit: Unit) -> Snapshot {
        let cities = self.cities();
        let found = self.service.get_weather_many_in(&cities, unit).await;
        self.snapshot(cities, unit, found)
    }

    /// Persist `unit` and refetch every displayed city in it.
    pub async fn set_unit(&self, unit: Unit) -> Result<Snapshot, StoreError> {
        self.service.set_unit(unit)?;
        Ok(self.refresh_in(unit).await)
    }

    fn snapshot(
        &self,
        cities: Vec<String>,
        unit: Unit,
        mut found: Vec<(String, WeatherRecord)>,
    ) -> Snapshot {
        let current = self.current.as_ref().map(CurrentLocation::name);

        let tiles = cities
            .into_iter()
            .map(|city| {
                let record = found
                    .iter()
                    .position(|(c, _)| *c == city)
                    .map(|idx| found.swap_remove(idx).1);

                Tile {
                    is_current: current == Some(city.as_str()),
                    city,
                    record,
                }
            })
            .collect();

        Snapshot { unit, tiles }
    }

    /// Refresh now and then every `period` until `shutdown` resolves.
    pub async fn run<S, F>(&self, period: Duration, shutdown: S, mut on_update: F)
    where
        S: Future<Output = ()>,
        F: FnMut(&Snapshot),
    {
        let mut ticker = tokio::time::interval(period.max(Duration::from_secs(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::debug!("refresh loop stopped");
                    return;
                }
                _ = ticker.tick() => {
                    let snapshot = self.refresh().await;
                    tracing::debug!(tiles = snapshot.tiles.len(), "dashboard refreshed");
                    on_update(&snapshot);
                }
            }
        }
    }
}
