//! Location of the remote object.

use serde::{Deserialize, Serialize};

use crate::error::{ObjcacheError, Result};

/// Immutable `(container, key)` pair identifying a remote object.
///
/// Both parts are validated on construction, so a `Location` in hand is
/// always usable.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct Location {
    container: String,
    key: String,
}

impl Location {
    /// Creates a location, rejecting an empty container or key.
    ///
    /// Dot segments (`.` / `..`) are rejected as well: URL normalization
    /// would collapse them and address a different resource.
    pub fn new(container: impl Into<String>, key: impl Into<String>) -> Result<Self> {
        let container = container.into();
        let key = key.into();

        if container.is_empty() {
            return Err(ObjcacheError::InvalidLocation(
                "container must be given".into(),
            ));
        }
        if container.contains('/') || is_dot_segment(&container) {
            return Err(ObjcacheError::InvalidLocation(format!(
                "container '{}' is not a single path segment",
                container
            )));
        }
        if key.is_empty() {
            return Err(ObjcacheError::InvalidLocation("key must be given".into()));
        }
        if key.split('/').any(is_dot_segment) {
            return Err(ObjcacheError::InvalidLocation(format!(
                "key '{}' contains a '.' or '..' segment",
                key
            )));
        }

        Ok(Self { container, key })
    }

    /// Container (bucket) name.
    pub fn container(&self) -> &str {
        &self.container
    }

    /// Object key within the container.
    pub fn key(&self) -> &str {
        &self.key
    }
}

// URL parsers also treat `%2e` as a dot.
fn is_dot_segment(segment: &str) -> bool {
    let decoded = segment.replace("%2e", ".").replace("%2E", ".");
    decoded == "." || decoded == ".."
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.container, self.key)
    }
}

// Deserialization goes through `new` so invalid locations never exist.
impl<'de> Deserialize<'de> for Location {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Raw {
            container: String,
            key: String,
        }

        let raw = Raw::deserialize(deserializer)?;
        Location::new(raw.container, raw.key).map_err(serde::de::Error::custom)
    }
}
