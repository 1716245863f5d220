//! Portal backend routes.

/// Default backend when `MEMBERPASS_API_URL` is not set.
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

pub const LOGIN: &str = "/index.php/v1/ccbc_plugin/login";
pub const ARTICLES: &str = "/index.php/v1/content/articles";
pub const PROFILE: &str = "/auth/profile";
pub const LOGOUT: &str = "/auth/logout";
pub const REFRESH: &str = "/auth/refresh";
pub const HEALTH: &str = "/health";

/// Status that marks a request as rejected because the session is gone.
pub const SESSION_EXPIRED_STATUS: u16 = 403;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

/// Join `base` and `path` with exactly one slash between them.
pub fn join(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_normalizes_slashes() {
        assert_eq!(
            join("http://portal/", PROFILE),
            "http://portal/auth/profile"
        );
        assert_eq!(join("http://portal", "health"), "http://portal/health");
    }
}
