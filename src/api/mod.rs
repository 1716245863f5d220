//! Network boundary to the portal backend.
//!
//! Two independent call paths share one [`AuthInterceptor`]:
//! - [`ApiClient`] - direct calls (login, logout, profile, refresh)
//! - [`QueryClient`] - cached, de-duplicated reads with tag invalidation

pub mod client;
pub mod endpoints;
pub mod interceptor;
pub mod models;
pub mod query;

pub use client::{ApiClient, ApiError};
pub use endpoints::{Method, DEFAULT_API_URL};
pub use interceptor::{normalize, AuthInterceptor, CallPath, FailureClass, FailureShape};
pub use models::{
    Article, ArticleList, HealthResponse, LoginRequest, LoginResponse, LogoutResponse,
    RefreshResponse,
};
pub use query::{QueryArgs, QueryClient, QueryError, DEFAULT_QUERY_TTL, TAG_USER};
