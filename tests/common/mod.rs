//! Common test utilities for integration tests.
//!
//! Builds a [`Portal`] against a wiremock server with in-memory seams, and
//! provides canned backend bodies.
//!
//! # Example
//!
//! ```ignore
//! let server = MockServer::start().await;
//! let fixture = PortalFixture::new(&server, Some("abc"));
//! fixture.portal.start().await;
//! ```

#![allow(dead_code)]

pub mod mocks;

pub use mocks::*;

use chrono::{NaiveDate, NaiveDateTime};
use memberpass::adapters::{InMemoryTokenStore, ReqwestHttpClient};
use memberpass::credential::ManualClock;
use memberpass::invalidation::{FailureBroadcaster, RecordingNavigator};
use memberpass::startup::{Portal, PortalConfig, PortalDeps};
use memberpass::traits::HttpClient;
use std::sync::Arc;
use std::time::Duration;
use wiremock::MockServer;

/// 2025-01-01 12:30:00, the minute used across the pass scenarios.
pub fn half_past_noon() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 1, 1)
        .unwrap()
        .and_hms_opt(12, 30, 0)
        .unwrap()
}

pub struct PortalFixture {
    pub portal: Portal,
    pub tokens: InMemoryTokenStore,
    pub broadcaster: FailureBroadcaster,
    pub navigator: RecordingNavigator,
    pub clock: ManualClock,
}

impl PortalFixture {
    /// Portal talking to `server` over real HTTP with a private broadcaster.
    pub fn new(server: &MockServer, token: Option<&str>) -> Self {
        let http = ReqwestHttpClient::with_timeout(Duration::from_secs(5))
            .expect("reqwest client should build");
        Self::with_http(&server.uri(), Arc::new(http), token)
    }

    /// Portal over any transport, e.g. `MockHttpClient` for paused-time tests.
    pub fn with_http(api_url: &str, http: Arc<dyn HttpClient>, token: Option<&str>) -> Self {
        let tokens = match token {
            Some(t) => InMemoryTokenStore::with_token(t),
            None => InMemoryTokenStore::new(),
        };
        let broadcaster = FailureBroadcaster::new();
        let navigator = RecordingNavigator::new();
        let clock = ManualClock::at(half_past_noon());

        let portal = Portal::with_deps(
            PortalConfig::default().with_api_url(api_url),
            PortalDeps {
                http,
                token_store: Arc::new(tokens.clone()),
                broadcaster: broadcaster.clone(),
                navigator: Arc::new(navigator.clone()),
                clock: Arc::new(clock.clone()),
            },
        );

        Self {
            portal,
            tokens,
            broadcaster,
            navigator,
            clock,
        }
    }
}
