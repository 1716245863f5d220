//! Canned backend responses and wiremock helpers.

pub use memberpass::adapters::mock::{InMemoryTokenStore, MockHttpClient, MockResponse};

use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const LOGIN_PATH: &str = "/index.php/v1/ccbc_plugin/login";
pub const PROFILE_PATH: &str = "/auth/profile";
pub const LOGOUT_PATH: &str = "/auth/logout";

/// Profile body with a worship id.
pub fn profile_body(worship_id: &str) -> Value {
    json!({
        "id": 17,
        "name": "Taro Yamada",
        "email": "taro@example.org",
        "custom_fields": { "worshipid": worship_id }
    })
}

/// Profile body without any custom fields.
pub fn profile_without_worship_id() -> Value {
    json!({ "id": "18", "name": "Hanako" })
}

pub fn login_body(token: &str, worship_id: &str) -> Value {
    json!({ "token": token, "user": profile_body(worship_id) })
}

/// Answer GET /auth/profile with `status` and `body`.
pub async fn mount_profile(server: &MockServer, status: u16, body: Value) {
    Mock::given(method("GET"))
        .and(path(PROFILE_PATH))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .mount(server)
        .await;
}

/// Answer GET /auth/profile with a bare 403.
pub async fn mount_forbidden_profile(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(PROFILE_PATH))
        .respond_with(ResponseTemplate::new(403).set_body_string("Forbidden"))
        .mount(server)
        .await;
}
