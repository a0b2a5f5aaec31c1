//! S3-compatible HTTP object store.
//!
//! Objects are addressed path-style as `{endpoint}/{container}/{key}`.
//! Reads send the cached revision as `If-None-Match` and map 304 / 404 to
//! the non-error [`FetchOutcome`] variants. Writes are plain `PUT`s whose
//! `ETag` response header becomes the new revision.

use bytes::Bytes;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, ETAG, IF_NONE_MATCH};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use tracing::{debug, instrument, warn};
use url::Url;

use objcache_core::constants::{
    API_VERSION_HEADER, DEFAULT_TIMEOUT_SECONDS, ENV_ENDPOINT, ENV_TIMEOUT_SECS, ENV_TOKEN,
    JSON_CONTENT_TYPE, S3_API_VERSION,
};
use objcache_core::error::{ObjcacheError, Result};
use objcache_core::traits::ObjectStore;
use objcache_core::types::{FetchOutcome, Location, RevisionTag};

/// HTTP store configuration.
#[derive(Clone, serde::Serialize, serde::Deserialize)]
pub struct StoreConfig {
    /// Base URL of the store (e.g. "https://s3.eu-west-1.amazonaws.com")
    pub endpoint: String,
    /// Token sent as `Authorization: Bearer ...`, if any
    pub bearer_token: Option<String>,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
}

impl StoreConfig {
    /// Creates config for the given endpoint with default timeout and no auth.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            bearer_token: None,
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
        }
    }

    /// Adds a bearer token.
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    /// Overrides the request timeout.
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    /// Reads `OBJCACHE_ENDPOINT`, `OBJCACHE_TOKEN` and `OBJCACHE_TIMEOUT_SECS`,
    /// loading a `.env` file first if one exists.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();

        let endpoint = std::env::var(ENV_ENDPOINT)
            .map_err(|_| ObjcacheError::ConfigError(format!("{} is not set", ENV_ENDPOINT)))?;
        let mut config = Self::new(endpoint);

        if let Ok(token) = std::env::var(ENV_TOKEN) {
            if !token.is_empty() {
                config = config.with_bearer_token(token);
            }
        }

        if let Ok(raw) = std::env::var(ENV_TIMEOUT_SECS) {
            let seconds = raw.trim().parse().map_err(|_| {
                ObjcacheError::ConfigError(format!("{} must be a number, got '{}'", ENV_TIMEOUT_SECS, raw))
            })?;
            config = config.with_timeout(seconds);
        }

        Ok(config)
    }
}

impl std::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreConfig")
            .field("endpoint", &self.endpoint)
            .field("bearer_token", &self.bearer_token.as_ref().map(|_| "<redacted>"))
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

/// Object store client speaking the S3 REST dialect over HTTP.
pub struct HttpObjectStore {
    config: StoreConfig,
    endpoint: Url,
    http_client: reqwest::Client,
}

impl HttpObjectStore {
    /// Creates a new store client with the given config.
    pub fn with_config(config: StoreConfig) -> Result<Self> {
        let endpoint = Url::parse(&config.endpoint).map_err(|e| {
            ObjcacheError::ConfigError(format!("invalid endpoint '{}': {}", config.endpoint, e))
        })?;
        if !matches!(endpoint.scheme(), "http" | "https") || endpoint.cannot_be_a_base() {
            return Err(ObjcacheError::ConfigError(format!(
                "endpoint must be an http(s) base URL, got '{}'",
                config.endpoint
            )));
        }

        let http_client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| ObjcacheError::ConfigError(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            config,
            endpoint,
            http_client,
        })
    }

    /// Returns the configuration this store was built from.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Path-style URL of the object; key segments are percent-encoded one by one.
    pub(crate) fn object_url(&self, location: &Location) -> Result<Url> {
        let mut url = self.endpoint.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                ObjcacheError::ConfigError(format!("endpoint cannot be a base: {}", self.endpoint))
            })?;
            segments
                .pop_if_empty()
                .push(location.container())
                .extend(location.key().split('/'));
        }
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self
            .http_client
            .request(method, url)
            .header(API_VERSION_HEADER, S3_API_VERSION);

        match &self.config.bearer_token {
            Some(token) => builder.header(AUTHORIZATION, format!("Bearer {}", token)),
            None => builder,
        }
    }

    fn revision_from(response: &Response, location: &Location) -> Result<RevisionTag> {
        response
            .headers()
            .get(ETAG)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty())
            .map(RevisionTag::from)
            .ok_or_else(|| ObjcacheError::MissingRevisionTag(location.to_string()))
    }

    async fn unexpected_status(response: Response, location: &Location) -> ObjcacheError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        warn!(%location, status, "Unexpected store response");
        ObjcacheError::UnexpectedStatus {
            status,
            location: location.to_string(),
            body,
        }
    }
}

fn transport_error(err: reqwest::Error) -> ObjcacheError {
    if err.is_timeout() {
        ObjcacheError::ConnectionTimeout(err.to_string())
    } else {
        ObjcacheError::HttpError(err.to_string())
    }
}

#[async_trait::async_trait]
impl ObjectStore for HttpObjectStore {
    #[instrument(skip(self, location), fields(location = %location))]
    async fn fetch(
        &self,
        location: &Location,
        if_none_match: Option<&RevisionTag>,
    ) -> Result<FetchOutcome> {
        let url = self.object_url(location)?;

        let mut request = self.request(Method::GET, url);
        if let Some(tag) = if_none_match {
            request = request.header(IF_NONE_MATCH, tag.as_str());
        }

        let response = request.send().await.map_err(transport_error)?;

        match response.status() {
            StatusCode::NOT_MODIFIED => {
                debug!("Object not modified");
                Ok(FetchOutcome::NotModified)
            }
            StatusCode::NOT_FOUND => {
                debug!("Object not found");
                Ok(FetchOutcome::NotFound)
            }
            status if status.is_success() => {
                let revision = Self::revision_from(&response, location)?;
                let payload = response.bytes().await.map_err(transport_error)?;
                debug!(%revision, bytes = payload.len(), "Downloaded object");
                Ok(FetchOutcome::Found { payload, revision })
            }
            _ => Err(Self::unexpected_status(response, location).await),
        }
    }

    #[instrument(skip(self, location, payload), fields(location = %location, bytes = payload.len()))]
    async fn store(&self, location: &Location, payload: Bytes) -> Result<RevisionTag> {
        let url = self.object_url(location)?;

        let response = self
            .request(Method::PUT, url)
            .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
            .body(payload)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(Self::unexpected_status(response, location).await);
        }

        let revision = Self::revision_from(&response, location)?;
        debug!(%revision, "Stored object");
        Ok(revision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn location() -> Location {
        Location::new("bucket", "state/app.json").unwrap()
    }

    fn store_for(server: &MockServer) -> HttpObjectStore {
        HttpObjectStore::with_config(StoreConfig::new(server.uri())).unwrap()
    }

    #[test]
    fn test_object_url_encodes_segments() {
        let store = HttpObjectStore::with_config(StoreConfig::new("http://localhost:9000/prefix/")).unwrap();
        let location = Location::new("bucket", "dir/my file.json").unwrap();
        let url = store.object_url(&location).unwrap();
        assert_eq!(url.as_str(), "http://localhost:9000/prefix/bucket/dir/my%20file.json");
    }

    #[test]
    fn test_object_url_is_one_to_one_with_key() {
        let store = HttpObjectStore::with_config(StoreConfig::new("http://localhost:9000")).unwrap();
        let keys = ["a/b", "a/.b", "a/..b", ".../b", " ", "a//b"];

        let urls: Vec<String> = keys
            .iter()
            .map(|key| {
                let location = Location::new("bucket", *key).unwrap();
                store.object_url(&location).unwrap().to_string()
            })
            .collect();

        assert_eq!(urls[0], "http://localhost:9000/bucket/a/b");
        assert_eq!(urls[1], "http://localhost:9000/bucket/a/.b");
        assert_eq!(urls[4], "http://localhost:9000/bucket/%20");
        let distinct: std::collections::HashSet<_> = urls.iter().collect();
        assert_eq!(distinct.len(), keys.len());

        for key in ["..", "a/./b", "a/../b", "./x", "%2e%2e"] {
            assert!(Location::new("bucket", key).is_err(), "key {:?} accepted", key);
        }
    }

    #[test]
    fn test_invalid_endpoint() {
        let err = HttpObjectStore::with_config(StoreConfig::new("not a url")).err().unwrap();
        assert!(err.is_configuration_error());

        let err = HttpObjectStore::with_config(StoreConfig::new("mailto:ops@example.com")).err().unwrap();
        assert!(err.is_configuration_error());
    }

    #[test]
    fn test_config_builders_and_debug() {
        let config = StoreConfig::new("http://localhost")
            .with_bearer_token("secret-token")
            .with_timeout(5);
        assert_eq!(config.bearer_token.as_deref(), Some("secret-token"));
        assert_eq!(config.timeout_seconds, 5);
        assert!(!format!("{:?}", config).contains("secret-token"));
    }

    // One test owns the OBJCACHE_* variables so parallel tests never race on them.
    #[test]
    fn test_config_from_env() {
        std::env::remove_var(ENV_ENDPOINT);
        std::env::remove_var(ENV_TOKEN);
        std::env::remove_var(ENV_TIMEOUT_SECS);

        let err = StoreConfig::from_env().unwrap_err();
        assert!(matches!(err, ObjcacheError::ConfigError(_)));

        std::env::set_var(ENV_ENDPOINT, "http://localhost:9000");
        std::env::set_var(ENV_TOKEN, "");
        let config = StoreConfig::from_env().unwrap();
        assert_eq!(config.endpoint, "http://localhost:9000");
        assert!(config.bearer_token.is_none());
        assert_eq!(config.timeout_seconds, DEFAULT_TIMEOUT_SECONDS);

        std::env::set_var(ENV_TOKEN, "tok");
        std::env::set_var(ENV_TIMEOUT_SECS, " 7 ");
        let config = StoreConfig::from_env().unwrap();
        assert_eq!(config.bearer_token.as_deref(), Some("tok"));
        assert_eq!(config.timeout_seconds, 7);

        std::env::set_var(ENV_TIMEOUT_SECS, "soon");
        let err = StoreConfig::from_env().unwrap_err();
        assert!(err.is_configuration_error());
        assert!(err.to_string().contains(ENV_TIMEOUT_SECS));

        std::env::remove_var(ENV_ENDPOINT);
        std::env::remove_var(ENV_TOKEN);
        std::env::remove_var(ENV_TIMEOUT_SECS);
    }

    #[tokio::test]
    async fn test_fetch_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/bucket/state/app.json"))
            .and(header(API_VERSION_HEADER, S3_API_VERSION))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("etag", "\"v1\"")
                    .set_body_string(r#"{"a":"property"}"#),
            )
            .mount(&server)
            .await;

        let outcome = store_for(&server).fetch(&location(), None).await.unwrap();
        match outcome {
            FetchOutcome::Found { payload, revision } => {
                assert_eq!(&payload[..], br#"{"a":"property"}"#);
                assert_eq!(revision.as_str(), "\"v1\"");
            }
            other => panic!("expected found, got {:?}", other),
        }

        let requests = server.received_requests().await.unwrap();
        assert!(requests[0].headers.get("if-none-match").is_none());
    }

    #[tokio::test]
    async fn test_fetch_not_modified_sends_precondition() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/bucket/state/app.json"))
            .and(header("if-none-match", "\"v1\""))
            .respond_with(ResponseTemplate::new(304))
            .mount(&server)
            .await;

        let tag = RevisionTag::new("\"v1\"");
        let outcome = store_for(&server).fetch(&location(), Some(&tag)).await.unwrap();
        assert_eq!(outcome, FetchOutcome::NotModified);
    }

    #[tokio::test]
    async fn test_fetch_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string("NoSuchKey"))
            .mount(&server)
            .await;

        let outcome = store_for(&server).fetch(&location(), None).await.unwrap();
        assert_eq!(outcome, FetchOutcome::NotFound);
    }

    #[tokio::test]
    async fn test_fetch_forbidden_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403).set_body_string("AccessDenied"))
            .mount(&server)
            .await;

        let err = store_for(&server).fetch(&location(), None).await.unwrap_err();
        match err {
            ObjcacheError::UnexpectedStatus { status, body, .. } => {
                assert_eq!(status, 403);
                assert_eq!(body, "AccessDenied");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fetch_without_etag_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .mount(&server)
            .await;

        let err = store_for(&server).fetch(&location(), None).await.unwrap_err();
        assert!(matches!(err, ObjcacheError::MissingRevisionTag(_)));
    }

    #[tokio::test]
    async fn test_store_puts_json_and_returns_etag() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/bucket/state/app.json"))
            .and(header("content-type", JSON_CONTENT_TYPE))
            .and(body_json(json!({"a": "property"})))
            .respond_with(ResponseTemplate::new(200).insert_header("etag", "\"v2\""))
            .expect(1)
            .mount(&server)
            .await;

        let payload = Bytes::from(serde_json::to_vec(&json!({"a": "property"})).unwrap());
        let revision = store_for(&server).store(&location(), payload).await.unwrap();
        assert_eq!(revision.as_str(), "\"v2\"");
    }

    #[tokio::test]
    async fn test_store_failure_status() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = store_for(&server)
            .store(&location(), Bytes::from_static(b"{}"))
            .await
            .unwrap_err();
        assert!(err.is_remote_access_error());
        assert!(err.is_recoverable());
    }

    #[tokio::test]
    async fn test_bearer_token_sent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header("authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let store = HttpObjectStore::with_config(StoreConfig::new(server.uri()).with_bearer_token("tok")).unwrap();
        assert_eq!(store.fetch(&location(), None).await.unwrap(), FetchOutcome::NotFound);
    }

    #[tokio::test]
    async fn test_connection_refused_is_remote_access_error() {
        // Nothing listens on port 9 of localhost in the test environment.
        let store = HttpObjectStore::with_config(StoreConfig::new("http://127.0.0.1:9").with_timeout(2)).unwrap();
        let err = store.fetch(&location(), None).await.unwrap_err();
        assert!(err.is_remote_access_error());
        assert!(err.is_recoverable());
    }
}
