//! Wire-level constants for objcache.

// ═══════════════════════════════════════════════════════════════════════════════
// HTTP
// ═══════════════════════════════════════════════════════════════════════════════

/// Default request timeout for the HTTP store, in seconds.
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

/// S3 REST API version sent with every request.
pub const S3_API_VERSION: &str = "2006-03-01";

/// Header carrying the API version.
pub const API_VERSION_HEADER: &str = "x-amz-api-version";

/// Content type of stored payloads.
pub const JSON_CONTENT_TYPE: &str = "application/json";

// ═══════════════════════════════════════════════════════════════════════════════
// ENVIRONMENT
// ═══════════════════════════════════════════════════════════════════════════════

/// Base URL of the object store (e.g. `https://s3.eu-west-1.amazonaws.com`).
pub const ENV_ENDPOINT: &str = "OBJCACHE_ENDPOINT";

/// Optional bearer token sent as `Authorization: Bearer <token>`.
pub const ENV_TOKEN: &str = "OBJCACHE_TOKEN";

/// Optional request timeout override, in seconds.
pub const ENV_TIMEOUT_SECS: &str = "OBJCACHE_TIMEOUT_SECS";
