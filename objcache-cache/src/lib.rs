//! Single-object cache for a JSON document in a remote object store.
//!
//! [`CachedObject`] keeps the last-known `{revision, value}` of one remote
//! object and revalidates it with conditional fetches, so unchanged data is
//! never downloaded twice.
//!
//! ## Example
//!
//! ```rust,ignore
//! use objcache_cache::CachedObject;
//! use objcache_store::StoreConfig;
//!
//! let settings = CachedObject::<_, serde_json::Value>::from_config(
//!     "my-bucket",
//!     "settings.json",
//!     StoreConfig::from_env()?,
//! )?;
//!
//! settings.set(&serde_json::json!({"feature": true})).await?;
//! // Served via If-None-Match; only re-downloaded if someone else wrote.
//! let current = settings.get().await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod cache;

pub use cache::{CacheConfig, CacheStats, CachedObject};
