//! Time-boxed weather cache on top of a [`KeyValueStore`].
//!
//! Each city owns two entries: the serialized record under
//! `weatherData_<city>` and the fetch time in epoch milliseconds under
//! `weatherDataTimestamp_<city>`. Keys are case-sensitive.

use std::sync::Arc;

use crate::{clock::Clock, error::StoreError, model::WeatherRecord, store::KeyValueStore};

/// One hour.
pub const CACHE_TTL_MS: i64 = 3_600_000;

const RECORD_PREFIX: &str = "weatherData_";
const TIMESTAMP_PREFIX: &str = "weatherDataTimestamp_";

pub fn record_key(city: &str) -> String {
    format!("{RECORD_PREFIX}{city}")
}

pub fn timestamp_key(city: &str) -> String {
    format!("{TIMESTAMP_PREFIX}{city}")
}

/// A cached record and when it was written.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub record: WeatherRecord,
    pub fetched_at_ms: i64,
}

impl CacheEntry {
    pub fn age_ms(&self, now_ms: i64) -> i64 {
        now_ms.saturating_sub(self.fetched_at_ms)
    }

    pub fn is_fresh(&self, now_ms: i64) -> bool {
        self.age_ms(now_ms) < CACHE_TTL_MS
    }
}

#[derive(Debug, Clone)]
pub struct WeatherCache {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
}

impl WeatherCache {
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub fn now_millis(&self) -> i64 {
        self.clock.now_millis()
    }

    /// Raw entry for `city`, fresh or not. Missing or unreadable entries are `None`.
    pub fn entry(&self, city: &str) -> Option<CacheEntry> {
        let raw_record = self.store.get(&record_key(city))?;
        let raw_timestamp = self.store.get(&timestamp_key(city))?;

        let fetched_at_ms: i64 = match serde_json::from_str(&raw_timestamp) {
            Ok(ts) => ts,
            Err(err) => {
                tracing::warn!(city, error = %err, "ignoring unreadable cache timestamp");
                return None;
            }
        };

        let record: WeatherRecord = match serde_json::from_str(&raw_record) {
            Ok(record) => record,
            Err(err) => {
                tracing::warn!(city, error = %err, "ignoring unreadable cached record");
                return None;
            }
        };

        Some(CacheEntry {
            record,
            fetched_at_ms,
        })
    }

    /// The cached record for `city` if it is younger than [`CACHE_TTL_MS`].
    pub fn get_cached(&self, city: &str) -> Option<WeatherRecord> {
        let entry = self.entry(city)?;
        let now = self.now_millis();

        if entry.is_fresh(now) {
            tracing::debug!(city, age_ms = entry.age_ms(now), "using cached weather data");
            Some(entry.record)
        } else {
            tracing::debug!(city, age_ms = entry.age_ms(now), "cached weather data is stale");
            None
        }
    }

    /// Overwrite the entry for `city` with `record`, stamped with the current time.
    ///
    /// On error the previous record and timestamp are left as they were.
    pub fn put(&self, city: &str, record: &WeatherRecord) -> Result<(), StoreError> {
        let json = serde_json::to_string(record)?;
        let now = self.now_millis();
        let key = record_key(city);
        let previous = self.store.get(&key);

        self.store.set(&key, &json)?;

        if let Err(err) = self.store.set(&timestamp_key(city), &now.to_string()) {
            let restored = match &previous {
                Some(raw) => self.store.set(&key, raw),
                None => self.store.remove(&key),
            };
            if let Err(restore_err) = restored {
                tracing::warn!(city, error = %restore_err, "failed to restore cached record");
            }
            return Err(err);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        store::MemoryStore,
        testing::{ManualClock, sample_record},
    };
    use std::{
        io,
        sync::atomic::{AtomicBool, Ordering},
    };

    fn cache_with(clock: Arc<ManualClock>) -> (WeatherCache, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let cache = WeatherCache::new(store.clone(), clock);
        (cache, store)
    }

    /// Refuses timestamp writes once `fail_timestamps` is set.
    #[derive(Debug, Default)]
    struct TimestampFailingStore {
        inner: MemoryStore,
        fail_timestamps: AtomicBool,
    }

    impl TimestampFailingStore {
        fn start_failing(&self) {
            self.fail_timestamps.store(true, Ordering::SeqCst);
        }
    }

    impl KeyValueStore for TimestampFailingStore {
        fn get(&self, key: &str) -> Option<String> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
            if key.starts_with(TIMESTAMP_PREFIX) && self.fail_timestamps.load(Ordering::SeqCst) {
                return Err(StoreError::Io {
                    path: key.to_string(),
                    source: io::Error::other("disk full"),
                });
            }
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> Result<(), StoreError> {
            self.inner.remove(key)
        }
    }

    #[test]
    fn keys_follow_storage_layout() {
        assert_eq!(record_key("New York"), "weatherData_New York");
        assert_eq!(timestamp_key("Berlin"), "weatherDataTimestamp_Berlin");
    }

    #[test]
    fn miss_when_nothing_stored() {
        let (cache, _) = cache_with(Arc::new(ManualClock::new(0)));
        assert!(cache.get_cached("London").is_none());
    }

    #[test]
    fn hit_within_ttl_returns_stored_record() {
        let clock = Arc::new(ManualClock::new(1_000_000));
        let (cache, _) = cache_with(clock.clone());
        let record = sample_record("London", 15.0);

        cache.put("London", &record).unwrap();
        clock.advance_ms(CACHE_TTL_MS - 1);

        assert_eq!(cache.get_cached("London"), Some(record));
    }

    #[test]
    fn stale_at_exactly_one_hour() {
        let clock = Arc::new(ManualClock::new(1_000_000));
        let (cache, _) = cache_with(clock.clone());

        cache.put("London", &sample_record("London", 15.0)).unwrap();
        clock.advance_ms(CACHE_TTL_MS);

        assert!(cache.get_cached("London").is_none());
        // The entry itself is kept until overwritten.
        assert!(cache.entry("London").is_some());
    }

    #[test]
    fn missing_timestamp_is_a_miss() {
        let (cache, store) = cache_with(Arc::new(ManualClock::new(0)));
        let json = serde_json::to_string(&sample_record("Paris", 20.0)).unwrap();
        store.set(&record_key("Paris"), &json).unwrap();

        assert!(cache.get_cached("Paris").is_none());
    }

    #[test]
    fn garbage_entries_are_a_miss() {
        let (cache, store) = cache_with(Arc::new(ManualClock::new(0)));
        store.set(&record_key("Paris"), "{broken").unwrap();
        store.set(&timestamp_key("Paris"), "0").unwrap();
        assert!(cache.get_cached("Paris").is_none());

        let json = serde_json::to_string(&sample_record("Rome", 20.0)).unwrap();
        store.set(&record_key("Rome"), &json).unwrap();
        store.set(&timestamp_key("Rome"), "yesterday").unwrap();
        assert!(cache.get_cached("Rome").is_none());
    }

    #[test]
    fn cities_do_not_interact_and_keys_are_case_sensitive() {
        let (cache, _) = cache_with(Arc::new(ManualClock::new(0)));
        cache.put("London", &sample_record("London", 15.0)).unwrap();

        assert!(cache.get_cached("london").is_none());
        assert!(cache.get_cached("Berlin").is_none());
        assert!(cache.get_cached("London").is_some());
    }

    #[test]
    fn put_overwrites_and_restamps() {
        let clock = Arc::new(ManualClock::new(500));
        let (cache, _) = cache_with(clock.clone());

        cache.put("Oslo", &sample_record("Oslo", 1.0)).unwrap();
        clock.advance_ms(10);
        cache.put("Oslo", &sample_record("Oslo", 2.0)).unwrap();

        let entry = cache.entry("Oslo").unwrap();
        assert_eq!(entry.fetched_at_ms, 510);
        assert_eq!(entry.record.temperature, 2.0);
    }

    #[test]
    fn extreme_timestamp_does_not_overflow_age() {
        let (cache, store) = cache_with(Arc::new(ManualClock::new(1_700_000_000_000)));
        let json = serde_json::to_string(&sample_record("Oslo", 3.0)).unwrap();
        store.set(&record_key("Oslo"), &json).unwrap();
        store.set(&timestamp_key("Oslo"), "-9223372036854775808").unwrap();

        assert!(cache.get_cached("Oslo").is_none());
        assert_eq!(cache.entry("Oslo").unwrap().age_ms(1_700_000_000_000), i64::MAX);
    }

    #[test]
    fn failed_timestamp_write_restores_previous_record() {
        let store = Arc::new(TimestampFailingStore::default());
        let cache = WeatherCache::new(store.clone(), Arc::new(ManualClock::new(1_000)));

        cache.put("Oslo", &sample_record("Oslo", 1.0)).unwrap();
        let record_before = store.get(&record_key("Oslo")).unwrap();
        let ts_before = store.get(&timestamp_key("Oslo")).unwrap();

        store.start_failing();
        assert!(cache.put("Oslo", &sample_record("Oslo", 2.0)).is_err());

        assert_eq!(store.get(&record_key("Oslo")), Some(record_before));
        assert_eq!(store.get(&timestamp_key("Oslo")), Some(ts_before));
        assert_eq!(cache.get_cached("Oslo").map(|r| r.temperature), Some(1.0));
    }

    #[test]
    fn failed_timestamp_write_leaves_no_record_for_new_city() {
        let store = Arc::new(TimestampFailingStore::default());
        store.start_failing();
        let cache = WeatherCache::new(store.clone(), Arc::new(ManualClock::new(1_000)));

        assert!(cache.put("Lima", &sample_record("Lima", 19.0)).is_err());

        assert_eq!(store.get(&record_key("Lima")), None);
        assert_eq!(store.get(&timestamp_key("Lima")), None);
    }
}
