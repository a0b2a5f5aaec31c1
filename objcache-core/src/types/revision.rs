//! Revision tags and conditional fetch outcomes.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Opaque token identifying one version of the remote object's content.
///
/// Kept verbatim as the store returned it (quotes included for HTTP entity
/// tags) so it can be presented back unchanged.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RevisionTag(String);

impl RevisionTag {
    /// Wraps a raw tag value.
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    /// Returns the raw tag value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RevisionTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RevisionTag {
    fn from(tag: &str) -> Self {
        Self::new(tag)
    }
}

impl From<String> for RevisionTag {
    fn from(tag: String) -> Self {
        Self(tag)
    }
}

/// Result of a (possibly conditional) fetch.
///
/// The two non-error sentinels live here instead of in the error channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The object exists and differs from the presented revision (if any).
    Found {
        /// Raw UTF-8 JSON payload
        payload: Bytes,
        /// Revision of `payload`
        revision: RevisionTag,
    },
    /// The presented revision is still current.
    NotModified,
    /// No object at the location.
    NotFound,
}

impl FetchOutcome {
    /// Short label for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchOutcome::Found { .. } => "found",
            FetchOutcome::NotModified => "not_modified",
            FetchOutcome::NotFound => "not_found",
        }
    }
}
