//! In-memory TTL cache for composed air-quality results.
//!
//! Keys are coordinates rounded by [`Coordinate::cache_key`]. Reads and
//! writes are not atomic across concurrent requests for the same key: two
//! simultaneous misses may both hit upstream, and the later write wins.

use std::collections::HashMap;

use tokio::sync::RwLock;
use tokio::time::{Duration, Instant};

use crate::model::AirQualityResult;

#[derive(Debug, Clone)]
struct Entry {
    value: AirQualityResult,
    expires_at: Instant,
}

#[derive(Debug)]
pub struct ResultCache {
    entries: RwLock<HashMap<String, Entry>>,
    ttl: Duration,
}

impl ResultCache {
    pub fn new(ttl: Duration) -> Self {
        Self { entries: RwLock::new(HashMap::new()), ttl }
    }

    /// Return the cached result for `key` if it has not expired yet.
    /// Expired entries are dropped so the map does not grow unbounded.
    pub async fn get(&self, key: &str) -> Option<AirQualityResult> {
        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if entry.expires_at > now => return Some(entry.value.clone()),
                Some(_) => {}
                None => return None,
            }
        }

        let mut entries = self.entries.write().await;
        if entries.get(key).is_some_and(|entry| entry.expires_at <= now) {
            entries.remove(key);
        }
        None
    }

    pub async fn insert(&self, key: String, value: AirQualityResult) {
        let expires_at = Instant::now() + self.ttl;
        let mut entries = self.entries.write().await;
        entries.insert(key, Entry { value, expires_at });
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_result(station: &str) -> AirQualityResult {
        AirQualityResult {
            sido_name: "서울".to_string(),
            station_name: station.to_string(),
            pm10_value: 30,
            pm25_value: 15,
            pm10_grade: 2,
            pm25_grade: 2,
            data_time: "2025-03-31 14:00".to_string(),
            grade_emoji: "🙂".to_string(),
            background_color: "#50A0E5".to_string(),
            warning_message: String::new(),
            temperature: Some(20),
            feels_like: Some(18),
            weather_icon: Some("01d".to_string()),
            weather_description: Some("맑음".to_string()),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn serves_entry_within_ttl() {
        let cache = ResultCache::new(Duration::from_secs(600));
        cache.insert("37.50:127.00".to_string(), sample_result("강남구")).await;

        tokio::time::advance(Duration::from_secs(599)).await;
        let hit = cache.get("37.50:127.00").await.expect("entry still valid");
        assert_eq!(hit.station_name, "강남구");
    }

    #[tokio::test(start_paused = true)]
    async fn expires_entry_after_ttl() {
        let cache = ResultCache::new(Duration::from_secs(600));
        cache.insert("37.50:127.00".to_string(), sample_result("강남구")).await;

        tokio::time::advance(Duration::from_secs(601)).await;
        assert!(cache.get("37.50:127.00").await.is_none());
        // Expired entry was evicted on read.
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test]
    async fn missing_key_is_none() {
        let cache = ResultCache::new(Duration::from_secs(600));
        assert!(cache.get("0.00:0.00").await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn insert_refreshes_expiry() {
        let cache = ResultCache::new(Duration::from_secs(600));
        cache.insert("k".to_string(), sample_result("강남구")).await;

        tokio::time::advance(Duration::from_secs(500)).await;
        cache.insert("k".to_string(), sample_result("서초구")).await;

        tokio::time::advance(Duration::from_secs(500)).await;
        let hit = cache.get("k").await.expect("refreshed entry still valid");
        assert_eq!(hit.station_name, "서초구");
    }
}
