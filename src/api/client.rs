//! Direct HTTP client for the portal backend.
//!
//! Every authenticated call goes through [`AuthInterceptor`]: the bearer token
//! is attached from the persisted slot, and a 403 answer clears the slot and
//! notifies whoever handles session failures before the error is returned.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

use super::endpoints::{self, Method, SESSION_EXPIRED_STATUS};
use super::interceptor::{AuthInterceptor, CallPath, FailureShape};
use super::models::{
    ArticleList, LoginRequest, LoginResponse, LogoutResponse, RefreshResponse,
};
use crate::error::{AuthError, NetworkError, PortalError};
use crate::invalidation::SESSION_EXPIRED_MESSAGE;
use crate::session::Identity;
use crate::traits::{Headers, HttpClient, HttpError, Response};

/// Error type for direct client calls.
#[derive(Debug)]
pub enum ApiError {
    /// The server answered with a non-2xx status.
    Status { status: u16, body: String },
    /// The request never got an answer.
    Http(HttpError),
    /// Request or response body was not the expected JSON.
    Json(serde_json::Error),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_session_expired(&self) -> bool {
        self.status() == Some(SESSION_EXPIRED_STATUS)
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::Status { status, body } if body.is_empty() => {
                write!(f, "Request failed with status {}", status)
            }
            ApiError::Status { status, body } => {
                write!(f, "Request failed with status {}: {}", status, body)
            }
            ApiError::Http(e) => write!(f, "{}", e),
            ApiError::Json(e) => write!(f, "JSON error: {}", e),
        }
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ApiError::Http(e) => Some(e),
            ApiError::Json(e) => Some(e),
            ApiError::Status { .. } => None,
        }
    }
}

impl From<HttpError> for ApiError {
    fn from(e: HttpError) -> Self {
        ApiError::Http(e)
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        ApiError::Json(e)
    }
}

impl From<ApiError> for PortalError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Status { status, .. } if status == SESSION_EXPIRED_STATUS => {
                PortalError::Auth(AuthError::SessionExpired {
                    message: SESSION_EXPIRED_MESSAGE.to_string(),
                })
            }
            ApiError::Status { status, body } => {
                PortalError::Network(NetworkError::HttpStatus { status, message: body })
            }
            ApiError::Http(e) => PortalError::Network(e.into()),
            ApiError::Json(e) => PortalError::Network(NetworkError::InvalidResponse {
                message: e.to_string(),
            }),
        }
    }
}

/// What a request carries and whether its failures are inspected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Credentials {
    /// No bearer token. Failures belong to the caller.
    Anonymous,
    /// Bearer token, failures belong to the caller.
    Bearer,
    /// Bearer token, and a 403 expires the session.
    Session,
}

#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    http: Arc<dyn HttpClient>,
    interceptor: AuthInterceptor,
}

impl ApiClient {
    pub fn new(
        base_url: impl Into<String>,
        http: Arc<dyn HttpClient>,
        interceptor: AuthInterceptor,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            http,
            interceptor,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<String>,
        credentials: Credentials,
    ) -> Result<Response, ApiError> {
        let url = endpoints::join(&self.base_url, path);
        let mut headers = Headers::new();
        headers.insert("Accept".to_string(), "application/json".to_string());
        if credentials != Credentials::Anonymous {
            self.interceptor.authorize(&mut headers).await;
        }

        tracing::debug!(method = method.as_str(), path, "Sending request");
        let response = match method {
            Method::Get => self.http.get(&url, &headers).await?,
            Method::Post => {
                let body = body.unwrap_or_else(|| "{}".to_string());
                self.http.post(&url, &body, &headers).await?
            }
        };

        if response.is_success() {
            return Ok(response);
        }

        let body = response.text();
        if credentials == Credentials::Session {
            self.interceptor
                .inspect(
                    CallPath::Direct,
                    path,
                    FailureShape::Transport {
                        status: response.status,
                        body: &body,
                    },
                )
                .await;
        }
        Err(ApiError::Status {
            status: response.status,
            body,
        })
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.send(Method::Get, path, None, Credentials::Session).await?;
        Ok(response.json()?)
    }

    pub async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let body = serde_json::to_string(body)?;
        let response = self.send(Method::Post, path, Some(body), Credentials::Session).await?;
        Ok(response.json()?)
    }

    /// Log in with username and password. Sent without a bearer token, and a
    /// rejection never triggers the session-expired flow.
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, ApiError> {
        let body = serde_json::to_string(&LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        })?;
        let response = self
            .send(Method::Post, endpoints::LOGIN, Some(body), Credentials::Anonymous)
            .await?;
        Ok(response.json()?)
    }

    /// POST /auth/logout. An empty body counts as success, and a rejection
    /// does not raise the expiry notice.
    pub async fn logout(&self) -> Result<LogoutResponse, ApiError> {
        let response = self
            .send(Method::Post, endpoints::LOGOUT, None, Credentials::Bearer)
            .await?;
        if response.body.is_empty() {
            return Ok(LogoutResponse::default());
        }
        Ok(response.json()?)
    }

    pub async fn fetch_profile(&self) -> Result<Identity, ApiError> {
        self.get_json(endpoints::PROFILE).await
    }

    pub async fn refresh_token(&self) -> Result<RefreshResponse, ApiError> {
        let response = self.send(Method::Post, endpoints::REFRESH, None, Credentials::Session).await?;
        Ok(response.json()?)
    }

    pub async fn fetch_articles(&self) -> Result<ArticleList, ApiError> {
        self.get_json(endpoints::ARTICLES).await
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}
