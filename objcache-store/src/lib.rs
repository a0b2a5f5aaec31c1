//! Object store backends for objcache.
//!
//! - **HTTP**: S3-compatible REST endpoint with `ETag` / `If-None-Match`
//! - **Memory**: in-process store for tests, demos and offline use

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod http;
mod memory;

pub use http::{HttpObjectStore, StoreConfig};
pub use memory::MemoryStore;

// Re-export the trait from core
pub use objcache_core::traits::ObjectStore;
