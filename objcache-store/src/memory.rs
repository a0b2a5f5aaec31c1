//! In-memory object store.
//!
//! Thread-safe stand-in for a remote store, suitable for tests, demos and
//! offline use. Revisions are derived from content (quoted SHA3-256 hex),
//! so writing identical bytes twice yields the same tag, as with S3 ETags.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use sha3::{Digest, Sha3_256};
use tracing::{debug, instrument};

use objcache_core::error::Result;
use objcache_core::traits::ObjectStore;
use objcache_core::types::{FetchOutcome, Location, RevisionTag};

#[derive(Clone, Debug)]
struct StoredObject {
    payload: Bytes,
    revision: RevisionTag,
}

/// In-memory object store.
///
/// All operations are thread-safe and can be called concurrently.
#[derive(Debug, Default)]
pub struct MemoryStore {
    /// location → object
    objects: RwLock<HashMap<Location, StoredObject>>,
    /// Number of `fetch` calls served
    fetches: AtomicU64,
    /// Number of `store` calls served
    stores: AtomicU64,
}

impl MemoryStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Computes the content revision for a payload.
    pub fn revision_for(payload: &[u8]) -> RevisionTag {
        let digest = Sha3_256::digest(payload);
        RevisionTag::new(format!("\"{}\"", hex::encode(digest)))
    }

    /// Deletes the object at `location`. Returns true if it existed.
    pub fn remove(&self, location: &Location) -> bool {
        self.objects.write().remove(location).is_some()
    }

    /// Returns the current revision at `location`, if any.
    pub fn revision(&self, location: &Location) -> Option<RevisionTag> {
        self.objects.read().get(location).map(|o| o.revision.clone())
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    /// Returns true if the store holds no objects.
    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }

    /// Removes every object.
    pub fn clear(&self) {
        self.objects.write().clear();
    }

    /// Number of fetches served so far.
    pub fn fetch_count(&self) -> u64 {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Number of writes served so far.
    pub fn store_count(&self) -> u64 {
        self.stores.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    #[instrument(skip(self, location), fields(location = %location))]
    async fn fetch(
        &self,
        location: &Location,
        if_none_match: Option<&RevisionTag>,
    ) -> Result<FetchOutcome> {
        self.fetches.fetch_add(1, Ordering::SeqCst);

        let objects = self.objects.read();
        let outcome = match objects.get(location) {
            None => FetchOutcome::NotFound,
            Some(object) if Some(&object.revision) == if_none_match => FetchOutcome::NotModified,
            Some(object) => FetchOutcome::Found {
                payload: object.payload.clone(),
                revision: object.revision.clone(),
            },
        };

        debug!(outcome = outcome.kind(), "Memory fetch");
        Ok(outcome)
    }

    #[instrument(skip(self, location, payload), fields(location = %location, bytes = payload.len()))]
    async fn store(&self, location: &Location, payload: Bytes) -> Result<RevisionTag> {
        self.stores.fetch_add(1, Ordering::SeqCst);

        let revision = Self::revision_for(&payload);
        self.objects.write().insert(
            location.clone(),
            StoredObject {
                payload,
                revision: revision.clone(),
            },
        );

        debug!(%revision, "Memory store");
        Ok(revision)
    }
}
