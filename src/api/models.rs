//! Request and response bodies of the portal backend.

use serde::{Deserialize, Serialize};

use crate::session::Identity;

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Response from POST /index.php/v1/ccbc_plugin/login.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: Identity,
}

/// Response from POST /auth/refresh.
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshResponse {
    pub token: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogoutResponse {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

/// One entry of the content articles listing.
#[derive(Debug, Clone, Deserialize)]
pub struct Article {
    #[serde(deserialize_with = "crate::session::identity::deserialize_id")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub alias: Option<String>,
}

/// Envelope of GET /index.php/v1/content/articles.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArticleList {
    #[serde(default)]
    pub data: Vec<Article>,
}
