//! Domain types for objcache.
//!
//! - [`Location`]: container + key identifying the remote object
//! - [`RevisionTag`]: opaque version token (an HTTP entity tag)
//! - [`FetchOutcome`]: result of a conditional fetch

mod location;
mod revision;

pub use location::*;
pub use revision::*;
