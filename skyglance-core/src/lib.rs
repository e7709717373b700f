//! Core library for the `skyglance` CLI.
//!
//! This crate defines:
//! - Configuration handling
//! - The OpenWeather client behind the `WeatherProvider` trait
//! - A one-hour weather cache over a persistent key-value store
//! - Current-location resolution with a fallback city
//! - The home dashboard and its periodic refresh
//!
//! It is used by `skyglance-cli`, but can also be reused by other binaries or services.

pub mod cache;
pub mod clock;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod location;
pub mod model;
pub mod provider;
pub mod service;
pub mod store;

#[cfg(test)]
mod testing;

pub use cache::{CACHE_TTL_MS, CacheEntry, WeatherCache};
pub use clock::{Clock, SystemClock};
pub use config::Config;
pub use dashboard::{Dashboard, Snapshot, Tile};
pub use error::{LocationError, StoreError, WeatherError};
pub use location::{CurrentLocation, FixedPosition, IpLocator, LocationSource, NoLocation};
pub use model::{Coordinates, Unit, WeatherRecord};
pub use provider::{WeatherProvider, provider_from_config};
pub use service::{UNIT_KEY, WeatherService, stored_unit};
pub use store::{FileStore, KeyValueStore, MemoryStore};
