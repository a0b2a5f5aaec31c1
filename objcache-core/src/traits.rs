//! The object store capability.
//!
//! The cache only needs a conditional read and an unconditional write;
//! everything else about the store (transport, auth, retries) stays behind
//! this trait.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;
use crate::types::{FetchOutcome, Location, RevisionTag};

/// Interface for a remote object store.
///
/// Implementations:
/// - `HttpObjectStore`: S3-compatible REST endpoint
/// - `MemoryStore`: in-process map, for tests and offline use
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetches the object at `location`.
    ///
    /// When `if_none_match` is given the store answers
    /// [`FetchOutcome::NotModified`] if the current revision equals it.
    async fn fetch(
        &self,
        location: &Location,
        if_none_match: Option<&RevisionTag>,
    ) -> Result<FetchOutcome>;

    /// Writes `payload` unconditionally and returns the new revision.
    async fn store(&self, location: &Location, payload: Bytes) -> Result<RevisionTag>;
}

#[async_trait]
impl<S: ObjectStore + ?Sized> ObjectStore for std::sync::Arc<S> {
    async fn fetch(
        &self,
        location: &Location,
        if_none_match: Option<&RevisionTag>,
    ) -> Result<FetchOutcome> {
        (**self).fetch(location, if_none_match).await
    }

    async fn store(&self, location: &Location, payload: Bytes) -> Result<RevisionTag> {
        (**self).store(location, payload).await
    }
}
