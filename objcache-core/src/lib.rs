//! # objcache core
//!
//! Core types, errors, and traits shared by the objcache crates.
//!
//! - **Types**: [`Location`], [`RevisionTag`] and the tagged [`FetchOutcome`]
//! - **Errors**: a single error enum with configuration / remote-access classification
//! - **Constants**: wire-level defaults (timeouts, headers, environment names)
//! - **Traits**: the [`ObjectStore`] capability the cache is built on
//!
//! ## Example
//!
//! ```rust
//! use objcache_core::{Location, ObjcacheError};
//!
//! let location = Location::new("settings", "app/state.json").unwrap();
//! assert_eq!(location.to_string(), "settings/app/state.json");
//!
//! let err = Location::new("", "key").unwrap_err();
//! assert!(matches!(err, ObjcacheError::InvalidLocation(_)));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, clippy::all)]

pub mod constants;
pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used items at crate root
pub use constants::*;
pub use error::{ObjcacheError, Result};
pub use traits::*;
pub use types::*;
