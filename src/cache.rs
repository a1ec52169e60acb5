// Client-side caches: raw search responses keyed by query, and the hotel list

use crate::api::Hotel;
use crate::criteria::SearchQuery;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

#[derive(Debug, Default)]
struct CacheCounters {
    size_bytes: AtomicUsize,
    items_count: AtomicUsize,
    hit_count: AtomicUsize,
    miss_count: AtomicUsize,
    eviction_count: AtomicUsize,
    expired_count: AtomicUsize,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct ResponseCacheStats {
    pub size_bytes: usize,
    pub items_count: usize,
    pub max_items: usize,
    pub hit_count: usize,
    pub miss_count: usize,
    pub eviction_count: usize,
    pub expired_count: usize,
}

pub fn create_cache_key(query: &SearchQuery) -> String {
    format!(
        "{}:{}:{}:{}",
        query.hotel,
        query.check_in.format("%Y-%m-%d"),
        query.check_out.format("%Y-%m-%d"),
        if query.apply_booking_rules { "rules" } else { "norules" }
    )
}

fn calculate_item_size(key: &str, data: &[u8]) -> usize {
    key.len() + data.len() + std::mem::size_of::<CacheEntry>()
}

struct CacheEntry {
    data: Bytes,
    created_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn is_expired(&self) -> bool {
        self.created_at.elapsed() > self.ttl
    }
}

/// Bounded TTL cache of raw search response bodies. When full, the oldest
/// entry makes room.
pub struct SearchResponseCache {
    entries: DashMap<String, CacheEntry>,
    max_entries: usize,
    default_ttl: Duration,
    stats: CacheCounters,
}

impl SearchResponseCache {
    pub fn new(max_entries: usize, default_ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            max_entries: max_entries.max(1),
            default_ttl,
            stats: CacheCounters::default(),
        }
    }

    pub fn store(&self, query: &SearchQuery, data: Bytes, ttl: Option<Duration>) -> bool {
        let key = create_cache_key(query);

        // Replacing an entry never needs room
        if !self.entries.contains_key(&key) {
            while self.entries.len() >= self.max_entries {
                if !self.evict_one() {
                    break;
                }
            }
        }

        let item_size = calculate_item_size(&key, &data);
        let entry = CacheEntry {
            data,
            created_at: Instant::now(),
            ttl: ttl.unwrap_or(self.default_ttl),
        };
        debug!(%key, item_size, "caching search response");
        self.stats.items_count.fetch_add(1, Ordering::SeqCst);
        self.stats.size_bytes.fetch_add(item_size, Ordering::SeqCst);
        if let Some(old) = self.entries.insert(key.clone(), entry) {
            self.forget(&key, &old);
        }
        true
    }

    pub fn get(&self, query: &SearchQuery) -> Option<Bytes> {
        let key = create_cache_key(query);

        let expired = match self.entries.get(&key) {
            Some(entry) if !entry.is_expired() => {
                self.stats.hit_count.fetch_add(1, Ordering::SeqCst);
                debug!(%key, "search cache hit");
                return Some(entry.data.clone());
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            self.remove_entry(&key, true);
        }
        self.stats.miss_count.fetch_add(1, Ordering::SeqCst);
        None
    }

    pub fn clear(&self) {
        self.entries.clear();
        self.stats.items_count.store(0, Ordering::SeqCst);
        self.stats.size_bytes.store(0, Ordering::SeqCst);
        info!("search response cache cleared");
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> ResponseCacheStats {
        ResponseCacheStats {
            size_bytes: self.stats.size_bytes.load(Ordering::SeqCst),
            items_count: self.stats.items_count.load(Ordering::SeqCst),
            max_items: self.max_entries,
            hit_count: self.stats.hit_count.load(Ordering::SeqCst),
            miss_count: self.stats.miss_count.load(Ordering::SeqCst),
            eviction_count: self.stats.eviction_count.load(Ordering::SeqCst),
            expired_count: self.stats.expired_count.load(Ordering::SeqCst),
        }
    }

    fn evict_one(&self) -> bool {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|e| e.value().created_at)
            .map(|e| e.key().clone());

        match oldest {
            Some(key) => {
                debug!(%key, "evicting oldest search response");
                self.remove_entry(&key, false);
                self.stats.eviction_count.fetch_add(1, Ordering::SeqCst);
                true
            }
            None => false,
        }
    }

    fn remove_entry(&self, key: &str, expired: bool) {
        if let Some((key, removed)) = self.entries.remove(key) {
            self.forget(&key, &removed);
            if expired {
                self.stats.expired_count.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    fn forget(&self, key: &str, entry: &CacheEntry) {
        self.stats
            .size_bytes
            .fetch_sub(calculate_item_size(key, &entry.data), Ordering::SeqCst);
        self.stats.items_count.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedHotels {
    data: Vec<Hotel>,
    timestamp: DateTime<Utc>,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct HotelCacheStats {
    pub exists: bool,
    pub count: usize,
    pub age_minutes: Option<i64>,
    pub remaining_minutes: Option<i64>,
    pub expired: bool,
    pub size_bytes: usize,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct CacheStatsReport {
    pub hotel_list: HotelCacheStats,
    pub responses: ResponseCacheStats,
}

/// The hotel list rarely changes; keep it for a day, optionally on disk so
/// separate runs share it.
pub struct HotelListCache {
    ttl: Duration,
    entry: Mutex<Option<CachedHotels>>,
    path: Option<PathBuf>,
}

impl HotelListCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entry: Mutex::new(None),
            path: None,
        }
    }

    // Backed by a JSON file; an unreadable file just means an empty cache
    pub fn persistent(ttl: Duration, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entry = match std::fs::read(&path) {
            Ok(raw) => match serde_json::from_slice::<CachedHotels>(&raw) {
                Ok(cached) => Some(cached),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "ignoring corrupt hotel cache");
                    None
                }
            },
            Err(_) => None,
        };

        Self {
            ttl,
            entry: Mutex::new(entry),
            path: Some(path),
        }
    }

    fn is_expired(&self, stored_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(stored_at).num_milliseconds() > self.ttl.as_millis() as i64
    }

    pub fn get(&self, now: DateTime<Utc>) -> Option<Vec<Hotel>> {
        let mut entry = self.entry.lock();
        let cached = entry.as_ref()?;

        if self.is_expired(cached.timestamp, now) {
            info!("hotel cache expired");
            *entry = None;
            drop(entry);
            self.remove_file();
            return None;
        }

        let age = now.signed_duration_since(cached.timestamp).num_minutes();
        debug!(count = cached.data.len(), age_minutes = age, "using cached hotel list");
        Some(cached.data.clone())
    }

    pub fn set(&self, hotels: Vec<Hotel>, now: DateTime<Utc>) {
        let cached = CachedHotels {
            data: hotels,
            timestamp: now,
        };

        if let Some(path) = &self.path {
            match serde_json::to_vec(&cached) {
                Ok(raw) => {
                    if let Err(e) = std::fs::write(path, raw) {
                        warn!(path = %path.display(), error = %e, "failed to persist hotel cache");
                    }
                }
                Err(e) => warn!(error = %e, "failed to encode hotel cache"),
            }
        }

        info!(count = cached.data.len(), "cached hotel list");
        *self.entry.lock() = Some(cached);
    }

    pub fn clear(&self) {
        *self.entry.lock() = None;
        self.remove_file();
        info!("hotel cache cleared");
    }

    pub fn stats(&self, now: DateTime<Utc>) -> HotelCacheStats {
        let entry = self.entry.lock();
        let Some(cached) = entry.as_ref() else {
            return HotelCacheStats::default();
        };

        let age = now.signed_duration_since(cached.timestamp);
        let ttl_minutes = (self.ttl.as_secs() / 60) as i64;
        HotelCacheStats {
            exists: true,
            count: cached.data.len(),
            age_minutes: Some(age.num_minutes()),
            remaining_minutes: Some((ttl_minutes - age.num_minutes()).max(0)),
            expired: self.is_expired(cached.timestamp, now),
            size_bytes: serde_json::to_vec(cached).map(|v| v.len()).unwrap_or(0),
        }
    }

    fn remove_file(&self) {
        if let Some(path) = &self.path {
            let _ = std::fs::remove_file(path);
        }
    }
}
