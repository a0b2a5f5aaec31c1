//! Cached view of one remote JSON object.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};

use objcache_core::error::{ObjcacheError, Result};
use objcache_core::traits::ObjectStore;
use objcache_core::types::{FetchOutcome, Location, RevisionTag};
use objcache_store::{HttpObjectStore, StoreConfig};

/// Last-known state of the remote object.
#[derive(Clone, Debug)]
struct CacheEntry<T> {
    revision: RevisionTag,
    payload: T,
}

/// Cache configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Drop the cached entry when the store reports the object missing.
    ///
    /// Off by default: a warm cache survives a 404 and the next `get`
    /// still revalidates against the old revision.
    pub invalidate_on_not_found: bool,
}

/// Cache statistics.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// `get` calls that reached the store
    pub fetches: u64,
    /// Fetches answered with fresh content
    pub downloads: u64,
    /// Fetches answered with not-modified
    pub revalidated: u64,
    /// Fetches answered with not-found
    pub not_found: u64,
    /// Successful `set` calls
    pub writes: u64,
    /// Failed `get` or `set` calls
    pub failures: u64,
    /// When the cached entry was last replaced
    pub last_refreshed: Option<DateTime<Utc>>,
}

struct Slot<T> {
    entry: Option<CacheEntry<T>>,
    stats: CacheStats,
}

/// One remote JSON object with a local, conditionally revalidated copy.
///
/// # Cache coherency
///
/// - `get` presents the cached revision as a precondition; a not-modified
///   answer is served from the cached value without touching the network
///   payload.
/// - `set` writes unconditionally and caches the written value under the
///   revision the store returned.
/// - Failures never modify the cached entry.
///
/// Values go in and out as owned clones, so nothing the caller holds can
/// alias the cached copy.
///
/// # Concurrency
///
/// Calls on one instance are serialized: the cache slot stays locked for
/// the duration of the remote request. Share an instance with `Arc`.
pub struct CachedObject<S, T = Value> {
    location: Location,
    store: S,
    config: CacheConfig,
    slot: Mutex<Slot<T>>,
}

impl<T> CachedObject<HttpObjectStore, T>
where
    T: Serialize + DeserializeOwned + Clone + Send,
{
    /// Builds a cached object backed by the default HTTP store.
    ///
    /// The location is validated before the client is built; no request is
    /// made.
    pub fn from_config(
        container: impl Into<String>,
        key: impl Into<String>,
        store_config: StoreConfig,
    ) -> Result<Self> {
        let location = Location::new(container, key)?;
        let store = HttpObjectStore::with_config(store_config)?;
        Ok(Self::new(location, store))
    }
}

impl<S, T> CachedObject<S, T>
where
    S: ObjectStore,
    T: Serialize + DeserializeOwned + Clone + Send,
{
    /// Creates an empty cache for `location` on top of `store`.
    pub fn new(location: Location, store: S) -> Self {
        Self::with_config(location, store, CacheConfig::default())
    }

    /// Validates `container` and `key`, then creates an empty cache.
    pub fn open(container: impl Into<String>, key: impl Into<String>, store: S) -> Result<Self> {
        Ok(Self::new(Location::new(container, key)?, store))
    }

    /// Creates an empty cache with custom configuration.
    pub fn with_config(location: Location, store: S, config: CacheConfig) -> Self {
        Self {
            location,
            store,
            config,
            slot: Mutex::new(Slot {
                entry: None,
                stats: CacheStats::default(),
            }),
        }
    }

    /// Returns the current value of the remote object, or `None` if it
    /// does not exist.
    #[instrument(skip(self), fields(location = %self.location))]
    pub async fn get(&self) -> Result<Option<T>> {
        let mut slot = self.slot.lock().await;
        slot.stats.fetches += 1;

        let result = self.refresh(&mut slot).await;
        if let Err(ref e) = result {
            slot.stats.failures += 1;
            warn!(error = %e, "Fetch failed, cache left unchanged");
        }
        result
    }

    async fn refresh(&self, slot: &mut Slot<T>) -> Result<Option<T>> {
        let if_none_match = slot.entry.as_ref().map(|e| e.revision.clone());
        let outcome = self
            .store
            .fetch(&self.location, if_none_match.as_ref())
            .await?;

        match outcome {
            FetchOutcome::Found { payload, revision } => {
                let value: T = serde_json::from_slice(&payload)?;
                debug!(%revision, "Cache refreshed from store");
                slot.entry = Some(CacheEntry {
                    revision,
                    payload: value.clone(),
                });
                slot.stats.downloads += 1;
                slot.stats.last_refreshed = Some(Utc::now());
                Ok(Some(value))
            }
            FetchOutcome::NotModified => match &slot.entry {
                Some(entry) => {
                    debug!(revision = %entry.revision, "Cache revalidated");
                    slot.stats.revalidated += 1;
                    Ok(Some(entry.payload.clone()))
                }
                None => Err(ObjcacheError::UnsolicitedNotModified(
                    self.location.to_string(),
                )),
            },
            FetchOutcome::NotFound => {
                slot.stats.not_found += 1;
                if self.config.invalidate_on_not_found && slot.entry.take().is_some() {
                    debug!("Object gone, cache invalidated");
                } else {
                    debug!("Object not found");
                }
                Ok(None)
            }
        }
    }

    /// Writes `value` to the store (last write wins) and caches it under the
    /// returned revision.
    #[instrument(skip(self, value), fields(location = %self.location))]
    pub async fn set(&self, value: &T) -> Result<()> {
        let mut slot = self.slot.lock().await;

        let result = self.write(&mut slot, value).await;
        if let Err(ref e) = result {
            slot.stats.failures += 1;
            warn!(error = %e, "Write failed, cache left unchanged");
        }
        result
    }

    async fn write(&self, slot: &mut Slot<T>, value: &T) -> Result<()> {
        let payload = Bytes::from(serde_json::to_vec(value)?);
        let revision = self.store.store(&self.location, payload).await?;

        debug!(%revision, "Cache updated from write");
        slot.entry = Some(CacheEntry {
            revision,
            payload: value.clone(),
        });
        slot.stats.writes += 1;
        slot.stats.last_refreshed = Some(Utc::now());
        Ok(())
    }

    /// Location of the remote object.
    pub fn location(&self) -> &Location {
        &self.location
    }

    /// Underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Revision of the cached entry, if any.
    pub async fn cached_revision(&self) -> Option<RevisionTag> {
        self.slot
            .lock()
            .await
            .entry
            .as_ref()
            .map(|e| e.revision.clone())
    }

    /// Returns true if a cached entry is present.
    pub async fn is_cached(&self) -> bool {
        self.slot.lock().await.entry.is_some()
    }

    /// Drops the cached entry; the next `get` fetches unconditionally.
    pub async fn invalidate(&self) {
        self.slot.lock().await.entry = None;
    }

    /// Returns cache statistics.
    pub async fn stats(&self) -> CacheStats {
        self.slot.lock().await.stats.clone()
    }
}

impl<S, T> std::fmt::Debug for CachedObject<S, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedObject")
            .field("location", &self.location)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
