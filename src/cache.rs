//! On-disk cache for provider lookups
//!
//! Amadeus calls are slow and rate limited, so fare and airport lookups are
//! kept in a small fjall store. TTL policy lives here rather than at the call
//! sites: fares expire after the configured interval, resolved airport codes
//! after a week, and every expiry gets a +/-10% jitter so entries written in
//! one burst do not all lapse together.

use anyhow::{Result, anyhow};
use chrono::NaiveDate;
use fjall::Keyspace;
use rand::RngExt;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::future::Future;
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::OnceCell;
use tokio::task;

static GLOBAL_CACHE: OnceCell<LookupCache> = OnceCell::const_new();

/// Resolved airport codes barely change
const AIRPORT_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// What is being looked up; determines the storage key and the TTL
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupKey {
    Fare {
        origin: String,
        destination: String,
        departure: String,
        passengers: u32,
    },
    Airport {
        city: String,
        country: String,
    },
}

impl LookupKey {
    #[must_use]
    pub fn fare(origin: &str, destination: &str, departure: NaiveDate, passengers: u32) -> Self {
        Self::Fare {
            origin: origin.to_uppercase(),
            destination: destination.to_uppercase(),
            departure: departure.format("%Y-%m-%d").to_string(),
            passengers,
        }
    }

    #[must_use]
    pub fn airport(city: &str, country: Option<&str>) -> Self {
        Self::Airport {
            city: city.trim().to_lowercase(),
            country: country.unwrap_or_default().trim().to_lowercase(),
        }
    }

    fn storage_key(&self) -> Vec<u8> {
        match self {
            Self::Fare {
                origin,
                destination,
                departure,
                passengers,
            } => format!("fare/{origin}/{destination}/{departure}/{passengers}").into_bytes(),
            Self::Airport { city, country } => format!("airport/{city}/{country}").into_bytes(),
        }
    }
}

/// A cached value, stored as its own postcard bytes plus a freshness deadline
#[derive(Serialize, Deserialize)]
struct Envelope {
    payload: Vec<u8>,
    fresh_until: u64, // Unix timestamp (seconds)
}

pub struct LookupCache {
    store: Keyspace,
    fare_ttl: Duration,
}

impl LookupCache {
    fn open(path: impl AsRef<Path>, fare_ttl: Duration) -> Result<Self> {
        let db = fjall::Database::builder(&path).open()?;
        let store = db.keyspace("lookups", fjall::KeyspaceCreateOptions::default)?;
        Ok(LookupCache { store, fare_ttl })
    }

    fn ttl_for(&self, key: &LookupKey) -> Duration {
        match key {
            LookupKey::Fare { .. } => self.fare_ttl,
            LookupKey::Airport { .. } => AIRPORT_TTL,
        }
    }

    /// Returns the cached value for `key`, or runs `fetch` and caches its
    /// result. Cache failures are logged and treated as misses; a broken
    /// store never breaks a lookup, and fetch errors are never cached.
    pub async fn fetch_or<T, E, F, Fut>(&self, key: &LookupKey, fetch: F) -> std::result::Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        match self.load(key).await {
            Ok(Some(hit)) => return Ok(hit),
            Ok(None) => {}
            Err(e) => tracing::warn!(?key, error = %e, "cache read failed, fetching"),
        }

        let value = fetch().await?;

        if let Err(e) = self.store(key, &value).await {
            // A write failure only costs us the next lookup
            tracing::warn!(?key, error = %e, "cache write failed");
        }

        Ok(value)
    }

    #[tracing::instrument(name = "query_cache", level = "debug", skip(self))]
    async fn load<T: DeserializeOwned>(&self, key: &LookupKey) -> Result<Option<T>> {
        let store = self.store.clone();
        let raw_key = key.storage_key();
        let bytes = task::spawn_blocking(move || -> Result<Option<Vec<u8>>> {
            Ok(store.get(raw_key)?.map(|v| v.to_vec()))
        })
        .await??;

        let Some(bytes) = bytes else {
            return Ok(None);
        };

        let envelope: Envelope = postcard::from_bytes(&bytes)?;
        if unix_now()? >= envelope.fresh_until {
            tracing::debug!("cached lookup expired");
            let store = self.store.clone();
            let raw_key = key.storage_key();
            let _ = task::spawn_blocking(move || store.remove(raw_key)).await?;
            return Ok(None);
        }

        Ok(Some(postcard::from_bytes(&envelope.payload)?))
    }

    #[tracing::instrument(name = "put_cache", level = "debug", skip(self, value))]
    async fn store<T: Serialize>(&self, key: &LookupKey, value: &T) -> Result<()> {
        let payload = postcard::to_stdvec(value)?;
        let ttl = jittered(self.ttl_for(key));
        let fresh_until = unix_now()?
            .checked_add(ttl.as_secs())
            .ok_or(anyhow!("TTL overflow"))?;
        let bytes = postcard::to_stdvec(&Envelope {
            payload,
            fresh_until,
        })?;

        let store = self.store.clone();
        let raw_key = key.storage_key();
        let _ = task::spawn_blocking(move || store.insert(raw_key, bytes)).await?;
        Ok(())
    }
}

fn unix_now() -> Result<u64> {
    Ok(SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs())
}

/// Adds a +/-10% jitter so entries written together expire spread out
fn jittered(ttl: Duration) -> Duration {
    let jitter: f32 = rand::rng().random_range(0.9..1.1);
    ttl.mul_f32(jitter)
}

/// Initializes the global lookup cache. **Must be called once before use.**
pub fn init(path: impl AsRef<Path>, fare_ttl: Duration) -> Result<()> {
    let cache = LookupCache::open(path, fare_ttl)?;
    GLOBAL_CACHE
        .set(cache)
        .map_err(|_| anyhow!("Cache already initialized"))?;
    Ok(())
}

/// Cached-or-fetch against the globally initialized cache.
/// # Panics
/// Panics if the cache has not been initialized by calling `cache::init()` first.
pub async fn fetch_or<T, E, F, Fut>(key: &LookupKey, fetch: F) -> std::result::Result<T, E>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
{
    GLOBAL_CACHE
        .get()
        .expect("Cache not initialized. Call cache::init() first.")
        .fetch_or(key, fetch)
        .await
}
