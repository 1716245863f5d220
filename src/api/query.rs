//! Managed query layer: cached, de-duplicated reads and tag-invalidating
//! writes.
//!
//! Reads made through [`QueryClient::query`] are cached per request key for a
//! TTL and tagged; identical reads in flight at the same time share one
//! network call. [`QueryClient::mutate`] is never cached and drops every
//! cached entry carrying one of the tags it invalidates. Failures surface as
//! a serialized [`QueryError`] and go through the same [`AuthInterceptor`] as
//! the direct client.

use futures::future::{BoxFuture, FutureExt, Shared};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

use super::endpoints::{self, Method, SESSION_EXPIRED_STATUS};
use super::interceptor::{AuthInterceptor, CallPath, FailureShape};
use super::models::{ArticleList, HealthResponse, LogoutResponse};
use crate::error::{AuthError, NetworkError, PortalError};
use crate::invalidation::SESSION_EXPIRED_MESSAGE;
use crate::session::Identity;
use crate::traits::{Headers, HttpClient};

pub const DEFAULT_QUERY_TTL: Duration = Duration::from_secs(60);

/// Tag carried by everything derived from the member's profile.
pub const TAG_USER: &str = "User";

/// Serialized failure: `status` is absent when no response arrived.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryError {
    pub status: Option<u16>,
    pub data: Value,
}

impl QueryError {
    fn fetch(message: impl Into<String>) -> Self {
        Self {
            status: None,
            data: Value::String(message.into()),
        }
    }

    fn parsing(status: Option<u16>, err: serde_json::Error) -> Self {
        Self {
            status,
            data: Value::String(format!("PARSING_ERROR: {}", err)),
        }
    }

    /// Best-effort human readable text from `data`.
    pub fn message(&self) -> String {
        match &self.data {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| other.to_string()),
        }
    }

    pub fn is_session_expired(&self) -> bool {
        self.status == Some(SESSION_EXPIRED_STATUS)
    }
}

impl std::fmt::Display for QueryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.status {
            Some(status) => write!(f, "Query failed ({}): {}", status, self.message()),
            None => write!(f, "Query failed: {}", self.message()),
        }
    }
}

impl std::error::Error for QueryError {}

impl From<QueryError> for PortalError {
    fn from(err: QueryError) -> Self {
        match err.status {
            Some(SESSION_EXPIRED_STATUS) => PortalError::Auth(AuthError::SessionExpired {
                message: SESSION_EXPIRED_MESSAGE.to_string(),
            }),
            Some(status) => PortalError::Network(NetworkError::HttpStatus {
                status,
                message: err.message(),
            }),
            None => PortalError::Network(NetworkError::Other {
                message: err.message(),
            }),
        }
    }
}

/// One request through the query layer.
#[derive(Debug, Clone)]
pub struct QueryArgs {
    pub method: Method,
    pub path: String,
    pub params: Vec<(String, String)>,
    pub body: Option<Value>,
    pub tags: Vec<String>,
    /// Whether a 403 on this request goes through the session-expired flow.
    pub expires_session: bool,
}

impl QueryArgs {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            params: Vec::new(),
            body: None,
            tags: Vec::new(),
            expires_session: true,
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Path plus URL-encoded query string.
    pub fn path_and_query(&self) -> String {
        if self.params.is_empty() {
            return self.path.clone();
        }
        let query = self
            .params
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        format!("{}?{}", self.path, query)
    }

    fn cache_key(&self) -> String {
        match &self.body {
            Some(body) => format!("{} {} {}", self.method.as_str(), self.path_and_query(), body),
            None => format!("{} {}", self.method.as_str(), self.path_and_query()),
        }
    }
}

type InFlight = Shared<BoxFuture<'static, Result<Value, QueryError>>>;

struct CacheEntry {
    stored_at: Instant,
    value: Value,
    tags: Vec<String>,
}

struct QueryInner {
    base_url: String,
    http: Arc<dyn HttpClient>,
    interceptor: AuthInterceptor,
    ttl: Duration,
    cache: Mutex<HashMap<String, CacheEntry>>,
    in_flight: Mutex<HashMap<String, InFlight>>,
    // Bumped by purge so requests started earlier neither cache nor unlink
    // newer in-flight entries.
    generation: AtomicU64,
    network_calls: AtomicU64,
}

impl QueryInner {
    fn cache(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn in_flight(&self) -> MutexGuard<'_, HashMap<String, InFlight>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn execute(&self, args: &QueryArgs) -> Result<Value, QueryError> {
        let url = endpoints::join(&self.base_url, &args.path_and_query());
        let mut headers = Headers::new();
        headers.insert("Accept".to_string(), "application/json".to_string());
        self.interceptor.authorize(&mut headers).await;

        self.network_calls.fetch_add(1, Ordering::Relaxed);
        let result = match args.method {
            Method::Get => self.http.get(&url, &headers).await,
            Method::Post => {
                let body = args
                    .body
                    .as_ref()
                    .map(Value::to_string)
                    .unwrap_or_else(|| "{}".to_string());
                self.http.post(&url, &body, &headers).await
            }
        };

        let failure = match result {
            Ok(response) if response.is_success() => {
                if response.body.is_empty() {
                    return Ok(Value::Null);
                }
                return response
                    .json::<Value>()
                    .map_err(|e| QueryError::parsing(Some(response.status), e));
            }
            Ok(response) => QueryError {
                status: Some(response.status),
                data: serde_json::from_slice(&response.body)
                    .unwrap_or_else(|_| Value::String(response.text())),
            },
            Err(e) => QueryError::fetch(e.to_string()),
        };

        if args.expires_session {
            let message = failure.message();
            self.interceptor
                .inspect(
                    CallPath::Query,
                    &args.path,
                    FailureShape::Serialized {
                        status: failure.status,
                        message: &message,
                    },
                )
                .await;
        }
        Err(failure)
    }
}

#[derive(Clone)]
pub struct QueryClient {
    inner: Arc<QueryInner>,
}

impl QueryClient {
    pub fn new(
        base_url: impl Into<String>,
        http: Arc<dyn HttpClient>,
        interceptor: AuthInterceptor,
        ttl: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(QueryInner {
                base_url: base_url.into(),
                http,
                interceptor,
                ttl,
                cache: Mutex::new(HashMap::new()),
                in_flight: Mutex::new(HashMap::new()),
                generation: AtomicU64::new(0),
                network_calls: AtomicU64::new(0),
            }),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.inner.ttl
    }

    /// Requests that actually reached the transport.
    pub fn network_calls(&self) -> u64 {
        self.inner.network_calls.load(Ordering::Relaxed)
    }

    pub async fn query<T: DeserializeOwned>(&self, args: &QueryArgs) -> Result<T, QueryError> {
        let value = self.query_value(args).await?;
        serde_json::from_value(value).map_err(|e| QueryError::parsing(None, e))
    }

    pub async fn query_value(&self, args: &QueryArgs) -> Result<Value, QueryError> {
        let key = args.cache_key();
        if let Some(value) = self.cached(&key) {
            tracing::trace!(key = %key, "Query cache hit");
            return Ok(value);
        }

        let request = {
            let mut in_flight = self.inner.in_flight();
            match in_flight.get(&key) {
                Some(existing) => {
                    tracing::trace!(key = %key, "Joining in-flight query");
                    existing.clone()
                }
                None => {
                    let request = Self::spawn_request(self.inner.clone(), key.clone(), args.clone());
                    in_flight.insert(key, request.clone());
                    request
                }
            }
        };
        request.await
    }

    fn spawn_request(inner: Arc<QueryInner>, key: String, args: QueryArgs) -> InFlight {
        let generation = inner.generation.load(Ordering::SeqCst);
        async move {
            let result = inner.execute(&args).await;
            if inner.generation.load(Ordering::SeqCst) == generation {
                inner.in_flight().remove(&key);
                if let Ok(value) = &result {
                    inner.cache().insert(
                        key,
                        CacheEntry {
                            stored_at: Instant::now(),
                            value: value.clone(),
                            tags: args.tags.clone(),
                        },
                    );
                }
            }
            result
        }
        .boxed()
        .shared()
    }

    fn cached(&self, key: &str) -> Option<Value> {
        let mut cache = self.inner.cache();
        let fresh = cache
            .get(key)
            .map(|entry| entry.stored_at.elapsed() < self.inner.ttl)?;
        if fresh {
            cache.get(key).map(|entry| entry.value.clone())
        } else {
            cache.remove(key);
            None
        }
    }

    /// Run a write. Never cached; on success every entry tagged with one of
    /// `invalidates` is dropped.
    pub async fn mutate<T: DeserializeOwned>(
        &self,
        args: &QueryArgs,
        invalidates: &[&str],
    ) -> Result<T, QueryError> {
        let value = self.inner.execute(args).await?;
        for tag in invalidates {
            self.invalidate_tag(tag);
        }
        serde_json::from_value(value).map_err(|e| QueryError::parsing(None, e))
    }

    /// Drop cached entries carrying `tag`. Returns how many went.
    pub fn invalidate_tag(&self, tag: &str) -> usize {
        let mut cache = self.inner.cache();
        let before = cache.len();
        cache.retain(|_, entry| !entry.tags.iter().any(|t| t == tag));
        let dropped = before - cache.len();
        if dropped > 0 {
            tracing::debug!(tag, dropped, "Invalidated cached queries");
        }
        dropped
    }

    /// Forget everything, including requests still in flight.
    pub fn purge(&self) {
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        self.inner.cache().clear();
        self.inner.in_flight().clear();
        tracing::debug!("Query cache purged");
    }

    pub fn cached_entries(&self) -> usize {
        self.inner.cache().len()
    }

    pub async fn health_check(&self) -> Result<HealthResponse, QueryError> {
        self.query(&QueryArgs::get(endpoints::HEALTH)).await
    }

    pub async fn profile(&self) -> Result<Identity, QueryError> {
        self.query(&QueryArgs::get(endpoints::PROFILE).with_tag(TAG_USER))
            .await
    }

    pub async fn articles(&self) -> Result<ArticleList, QueryError> {
        self.query(&QueryArgs::get(endpoints::ARTICLES)).await
    }

    /// POST with an empty object body. The caller is already leaving, so a
    /// rejection is returned without raising the expiry notice.
    pub async fn logout(&self) -> Result<LogoutResponse, QueryError> {
        let args = QueryArgs {
            method: Method::Post,
            expires_session: false,
            ..QueryArgs::get(endpoints::LOGOUT)
        };
        let value: Value = self.mutate(&args, &[TAG_USER]).await?;
        Ok(serde_json::from_value(value).unwrap_or_default())
    }
}

impl std::fmt::Debug for QueryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryClient")
            .field("base_url", &self.inner.base_url)
            .field("ttl", &self.inner.ttl)
            .field("cached_entries", &self.cached_entries())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{InMemoryTokenStore, MockHttpClient, MockResponse};
    use crate::invalidation::FailureBroadcaster;
    use crate::traits::{HttpError, Response};
    use bytes::Bytes;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;

    const BASE: &str = "http://portal.test";

    fn queries(
        http: &MockHttpClient,
        tokens: &InMemoryTokenStore,
        broadcaster: &FailureBroadcaster,
    ) -> QueryClient {
        let interceptor = AuthInterceptor::new(Arc::new(tokens.clone()), broadcaster.clone());
        QueryClient::new(BASE, Arc::new(http.clone()), interceptor, DEFAULT_QUERY_TTL)
    }

    fn profile_json() -> Value {
        json!({"id": "17", "name": "Taro", "custom_fields": {"worshipid": "1024"}})
    }

    #[test]
    fn test_path_and_query_encodes() {
        let args = QueryArgs::get("/index.php/v1/content/articles")
            .with_param("filter[search]", "礼拝 案内")
            .with_param("page", "2");
        assert_eq!(
            args.path_and_query(),
            "/index.php/v1/content/articles?filter%5Bsearch%5D=%E7%A4%BC%E6%8B%9D%20%E6%A1%88%E5%86%85&page=2"
        );
    }

    #[test]
    fn test_query_error_message() {
        let err = QueryError {
            status: Some(403),
            data: json!({"message": "Forbidden"}),
        };
        assert_eq!(err.message(), "Forbidden");
        assert!(err.is_session_expired());
        assert_eq!(err.to_string(), "Query failed (403): Forbidden");

        let portal: PortalError = err.into();
        assert!(portal.requires_login());
    }

    #[tokio::test]
    async fn test_profile_is_cached() {
        let http = MockHttpClient::new();
        http.set_response(
            "http://portal.test/auth/profile",
            MockResponse::json(200, profile_json()),
        );
        let tokens = InMemoryTokenStore::with_token("abc");
        let client = queries(&http, &tokens, &FailureBroadcaster::new());

        let first = client.profile().await.unwrap();
        let second = client.profile().await.unwrap();
        assert_eq!(first, second);
        assert_eq!(client.network_calls(), 1);
        assert_eq!(
            http.requests_to("/auth/profile")[0].authorization(),
            Some("Bearer abc")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_cache_expires_after_ttl() {
        let http = MockHttpClient::new();
        http.set_response(
            "http://portal.test/health",
            MockResponse::json(200, json!({"status": "ok"})),
        );
        let client = queries(&http, &InMemoryTokenStore::new(), &FailureBroadcaster::new());

        client.health_check().await.unwrap();
        tokio::time::advance(DEFAULT_QUERY_TTL + Duration::from_secs(1)).await;
        client.health_check().await.unwrap();

        assert_eq!(client.network_calls(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_identical_queries_share_one_call() {
        let http = MockHttpClient::new();
        http.set_response(
            "http://portal.test/auth/profile",
            MockResponse::json(200, profile_json()),
        );
        let client = queries(&http, &InMemoryTokenStore::new(), &FailureBroadcaster::new());

        let (a, b) = tokio::join!(client.profile(), client.profile());
        assert_eq!(a.unwrap().member_id, "17");
        assert_eq!(b.unwrap().member_id, "17");
        assert_eq!(client.network_calls(), 1);
    }

    #[tokio::test]
    async fn test_logout_invalidates_user_tag() {
        let http = MockHttpClient::new();
        http.set_response(
            "http://portal.test/auth/profile",
            MockResponse::json(200, profile_json()),
        );
        http.set_response(
            "http://portal.test/auth/logout",
            MockResponse::json(200, json!({"message": "Logged out"})),
        );
        http.set_response(
            "http://portal.test/health",
            MockResponse::json(200, json!({"status": "ok"})),
        );
        let client = queries(&http, &InMemoryTokenStore::new(), &FailureBroadcaster::new());

        client.profile().await.unwrap();
        client.health_check().await.unwrap();
        assert_eq!(client.cached_entries(), 2);

        let response = client.logout().await.unwrap();
        assert_eq!(response.message.as_deref(), Some("Logged out"));
        assert_eq!(client.cached_entries(), 1);

        client.profile().await.unwrap();
        assert_eq!(http.requests_to("/auth/profile").len(), 2);
    }

    #[tokio::test]
    async fn test_logout_posts_empty_object() {
        let http = MockHttpClient::new();
        http.set_response(
            "http://portal.test/auth/logout",
            MockResponse::Success(Response::new(200, Bytes::new())),
        );
        let tokens = InMemoryTokenStore::with_token("abc");
        let client = queries(&http, &tokens, &FailureBroadcaster::new());

        let response = client.logout().await.unwrap();
        assert!(response.message.is_none());
        let sent = http.requests_to("/auth/logout");
        assert_eq!(sent[0].method, "POST");
        assert_eq!(sent[0].body.as_deref(), Some("{}"));
    }

    #[tokio::test]
    async fn test_rejected_logout_skips_interceptor() {
        let http = MockHttpClient::new();
        http.set_response(
            "http://portal.test/auth/logout",
            MockResponse::json(403, json!({"message": "Forbidden"})),
        );
        let tokens = InMemoryTokenStore::with_token("abc");
        let broadcaster = FailureBroadcaster::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let _registration = broadcaster.register(Arc::new(move |_: Option<&str>| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        let client = queries(&http, &tokens, &broadcaster);

        let err = client.logout().await.unwrap_err();
        assert_eq!(err.status, Some(403));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert_eq!(tokens.peek().as_deref(), Some("abc"));
    }

    #[tokio::test]
    async fn test_purge_empties_cache() {
        let http = MockHttpClient::new();
        http.set_response(
            "http://portal.test/health",
            MockResponse::json(200, json!({"status": "ok"})),
        );
        let client = queries(&http, &InMemoryTokenStore::new(), &FailureBroadcaster::new());
        client.health_check().await.unwrap();
        client.purge();
        assert_eq!(client.cached_entries(), 0);
    }

    #[tokio::test]
    async fn test_forbidden_goes_through_interceptor() {
        let http = MockHttpClient::new();
        http.set_response(
            "http://portal.test/auth/profile",
            MockResponse::json(403, json!({"message": "Forbidden"})),
        );
        let tokens = InMemoryTokenStore::with_token("abc");
        let broadcaster = FailureBroadcaster::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let _registration = broadcaster.register(Arc::new(move |_: Option<&str>| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        let client = queries(&http, &tokens, &broadcaster);

        let err = client.profile().await.unwrap_err();
        assert_eq!(err.status, Some(403));
        assert_eq!(err.data, json!({"message": "Forbidden"}));
        assert_eq!(tokens.peek(), None);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(client.cached_entries(), 0);
    }

    #[tokio::test]
    async fn test_transport_failure_has_no_status() {
        let http = MockHttpClient::new();
        http.set_default_response(MockResponse::Error(HttpError::Timeout("30s".to_string())));
        let tokens = InMemoryTokenStore::with_token("abc");
        let client = queries(&http, &tokens, &FailureBroadcaster::new());

        let err = client.health_check().await.unwrap_err();
        assert_eq!(err.status, None);
        assert!(err.message().contains("30s"));
        assert_eq!(tokens.peek().as_deref(), Some("abc"));
    }

    #[tokio::test]
    async fn test_non_json_error_body_kept_as_text() {
        let http = MockHttpClient::new();
        http.set_response(
            "http://portal.test/health",
            MockResponse::Success(Response::new(502, Bytes::from("Bad Gateway"))),
        );
        let client = queries(&http, &InMemoryTokenStore::new(), &FailureBroadcaster::new());
        let err = client.health_check().await.unwrap_err();
        assert_eq!(err.data, Value::String("Bad Gateway".to_string()));
    }
}
