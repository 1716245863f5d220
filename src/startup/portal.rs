//! Composition root: one [`Portal`] per process.
//!
//! Wires the token store, HTTP transport, both call paths, the session, the
//! invalidation coordinator and the member pass generator. Production wiring
//! comes from [`Portal::build`]; tests inject every seam through
//! [`PortalDeps`].

use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::config::PortalConfig;
use crate::adapters::{FileTokenStore, ReqwestHttpClient};
use crate::api::{endpoints, ApiClient, ApiError, AuthInterceptor, QueryClient};
use crate::credential::{
    reference_for, spawn_session_follower, Clock, PassDisplay, RotatingCredential, SystemClock,
};
use crate::error::{
    AuthError, ErrorContext, NetworkError, PortalError, PortalResult, ResultExt, SystemError,
};
use crate::invalidation::{
    ChannelNavigator, FailureBroadcaster, InvalidationCoordinator, NavigationEvent, Navigator,
    NoticeState,
};
use crate::session::{Identity, SessionStore};
use crate::traits::{HttpClient, TokenStore};

/// Injectable seams.
pub struct PortalDeps {
    pub http: Arc<dyn HttpClient>,
    pub token_store: Arc<dyn TokenStore>,
    pub broadcaster: FailureBroadcaster,
    pub navigator: Arc<dyn Navigator>,
    pub clock: Arc<dyn Clock>,
}

/// Navigation reset that first drops everything held in memory for the
/// previous session.
struct ResettingNavigator {
    queries: QueryClient,
    pass: Arc<RotatingCredential>,
    inner: Arc<dyn Navigator>,
}

impl Navigator for ResettingNavigator {
    fn reset_to_entry(&self) {
        self.queries.purge();
        self.pass.stop();
        self.inner.reset_to_entry();
    }
}

pub struct Portal {
    config: PortalConfig,
    session: SessionStore,
    token_store: Arc<dyn TokenStore>,
    api: ApiClient,
    queries: QueryClient,
    coordinator: InvalidationCoordinator,
    pass: Arc<RotatingCredential>,
    follower: Mutex<Option<JoinHandle<()>>>,
}

impl Portal {
    /// Production wiring: reqwest transport, file token store, the global
    /// broadcaster and a channel navigator whose receiver is returned.
    pub fn build(
        config: PortalConfig,
    ) -> PortalResult<(Self, mpsc::UnboundedReceiver<NavigationEvent>)> {
        let http = ReqwestHttpClient::with_timeout(config.request_timeout)
            .map_err(NetworkError::from)
            .context(ErrorContext::new("build_http_client"))?;

        let token_store = match &config.storage_dir {
            Some(dir) => FileTokenStore::in_dir(dir),
            None => FileTokenStore::new().ok_or(SystemError::NoHomeDirectory)?,
        };
        tracing::debug!(path = %token_store.path().display(), "Using token store");

        let (navigator, navigation_rx) = ChannelNavigator::channel();
        let deps = PortalDeps {
            http: Arc::new(http),
            token_store: Arc::new(token_store),
            broadcaster: FailureBroadcaster::global(),
            navigator: Arc::new(navigator),
            clock: Arc::new(SystemClock),
        };
        Ok((Self::with_deps(config, deps), navigation_rx))
    }

    pub fn with_deps(config: PortalConfig, deps: PortalDeps) -> Self {
        let session = SessionStore::new();
        let interceptor = AuthInterceptor::new(deps.token_store.clone(), deps.broadcaster.clone());
        let api = ApiClient::new(config.api_url.clone(), deps.http.clone(), interceptor.clone());
        let queries = QueryClient::new(
            config.api_url.clone(),
            deps.http,
            interceptor,
            config.query_ttl,
        );
        let pass = Arc::new(RotatingCredential::new(
            config.codec(),
            deps.clock,
            config.rotation_interval,
        ));
        let navigator = Arc::new(ResettingNavigator {
            queries: queries.clone(),
            pass: pass.clone(),
            inner: deps.navigator,
        });
        let coordinator = InvalidationCoordinator::new(
            session.clone(),
            deps.token_store.clone(),
            deps.broadcaster,
            navigator,
        );

        Self {
            config,
            session,
            token_store: deps.token_store,
            api,
            queries,
            coordinator,
            pass,
            follower: Mutex::new(None),
        }
    }

    /// Mount the coordinator (binds the failure handler, restores the
    /// persisted session) and start feeding identity changes to the pass.
    pub async fn start(&self) {
        self.coordinator.mount().await;

        let mut follower = self.follower.lock().unwrap_or_else(PoisonError::into_inner);
        if follower.is_none() {
            *follower = Some(spawn_session_follower(
                &self.session,
                self.pass.identity_feed(),
            ));
        }
        tracing::info!(
            authenticated = self.session.is_authenticated(),
            api_url = %self.config.api_url,
            "Portal started"
        );
    }

    pub async fn login(&self, username: &str, password: &str) -> PortalResult<Identity> {
        let response = self
            .api
            .login(username, password)
            .await
            .map_err(|e| -> PortalError {
                match e {
                    ApiError::Status { status, body } if (400..500).contains(&status) => {
                        AuthError::LoginRejected {
                            status,
                            message: body,
                        }
                        .into()
                    }
                    other => other.into(),
                }
            })?;

        self.token_store
            .save(&response.token)
            .await
            .context(ErrorContext::new("save_token"))?;
        self.queries.purge();
        self.session.login_success(response.user.clone(), response.token);

        tracing::info!(member_id = %response.user.member_id, "Logged in");
        Ok(response.user)
    }

    /// Manual logout. The backend call is best effort and a rejection never
    /// shows the expiry notice; local state is always cleared.
    pub async fn logout(&self) {
        if self.session.is_authenticated() {
            if let Err(e) = self.queries.logout().await {
                tracing::warn!(error = %e, "Logout request failed; clearing local session anyway");
            }
        }
        if let Err(e) = self.token_store.clear().await {
            tracing::warn!(error = %e, "Failed to clear persisted token");
        }
        self.session.logout();
        self.queries.purge();
        self.pass.stop();
        tracing::info!("Logged out");
    }

    /// Fetch the profile through the query layer and store it in the session.
    pub async fn refresh_profile(&self) -> PortalResult<Identity> {
        if !self.session.is_authenticated() {
            return Err(AuthError::NotAuthenticated.into());
        }
        let identity = self
            .queries
            .profile()
            .await
            .context(ErrorContext::new("refresh_profile").with_endpoint(endpoints::PROFILE))?;
        self.session.update_identity(identity.clone());
        Ok(identity)
    }

    /// Begin showing the member pass for the current session.
    pub fn start_member_pass(&self) {
        self.pass.start(reference_for(&self.session.snapshot()));
    }

    pub fn stop_member_pass(&self) -> bool {
        self.pass.stop()
    }

    pub fn refresh_member_pass(&self) {
        self.pass.refresh_now();
    }

    pub fn member_pass(&self) -> PassDisplay {
        self.pass.display()
    }

    pub fn subscribe_member_pass(&self) -> tokio::sync::watch::Receiver<String> {
        self.pass.subscribe()
    }

    pub fn notice(&self) -> NoticeState {
        self.coordinator.notice()
    }

    pub fn subscribe_notice(&self) -> tokio::sync::watch::Receiver<NoticeState> {
        self.coordinator.subscribe_notice()
    }

    /// Dismiss the expiry notice; resets to the entry point.
    pub fn acknowledge_notice(&self) -> bool {
        self.coordinator.acknowledge()
    }

    /// Stop background work and unbind from the broadcaster.
    pub fn shutdown(&self) {
        self.pass.stop();
        if let Some(handle) = self
            .follower
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.abort();
        }
        self.coordinator.unmount();
    }

    pub fn config(&self) -> &PortalConfig {
        &self.config
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn queries(&self) -> &QueryClient {
        &self.queries
    }

    pub fn coordinator(&self) -> &InvalidationCoordinator {
        &self.coordinator
    }

    pub fn credential(&self) -> &RotatingCredential {
        &self.pass
    }
}

impl Drop for Portal {
    fn drop(&mut self) {
        self.shutdown();
    }
}
