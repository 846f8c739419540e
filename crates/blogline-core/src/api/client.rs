//! Session client for the blog REST API.
//!
//! Every outbound request goes through [`SessionClient::request`], which
//! attaches the stored access token and, when the backend answers 401,
//! refreshes the token once and replays the request once.

use std::sync::Arc;

use reqwest::StatusCode;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::error::server_message;
use super::transport::{ApiRequest, ApiResponse, AuthMode, Transport};
use super::ApiError;
use crate::auth::{
    CredentialPair, EndReason, Session, SessionPublisher, SessionWatcher, TokenStore, TokenVault,
};
use crate::models::{ProfileUpdate, Registration, User, UserProfile};

// ============================================================================
// Endpoints
// ============================================================================

const LOGIN_PATH: &str = "login/";
const REGISTER_PATH: &str = "register/";
const REFRESH_PATH: &str = "token/refresh/";
const PROFILE_PATH: &str = "profile/";
const PROFILE_UPDATE_PATH: &str = "profile/update/";

/// Reported when a failed login carries no message of its own
const LOGIN_FAILED_MESSAGE: &str = "Login failed";

/// What to do with the session when the refresh call fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshFailurePolicy {
    /// Any refresh failure clears the tokens and ends the session.
    #[default]
    EndSession,
    /// A refresh that got no response keeps the tokens; the network error is
    /// surfaced and the next request tries again.
    KeepOnNetworkError,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    access: String,
    refresh: String,
    user: User,
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
    refresh: &'a str,
}

#[derive(Deserialize)]
struct RefreshResponse {
    access: String,
    /// Present when the backend rotates refresh tokens
    #[serde(default)]
    refresh: Option<String>,
}

struct Inner {
    transport: Arc<dyn Transport>,
    vault: TokenVault,
    session: SessionPublisher,
    /// Serializes refreshes so concurrent 401s share one refresh call
    refresh_lock: Mutex<()>,
    refresh_policy: RefreshFailurePolicy,
}

/// Authenticated API client. Clone is cheap and clones share session state.
#[derive(Clone)]
pub struct SessionClient {
    inner: Arc<Inner>,
}

impl SessionClient {
    pub fn new(transport: Arc<dyn Transport>, store: Arc<dyn TokenStore>) -> Self {
        Self::with_policy(transport, store, RefreshFailurePolicy::default())
    }

    pub fn with_policy(
        transport: Arc<dyn Transport>,
        store: Arc<dyn TokenStore>,
        refresh_policy: RefreshFailurePolicy,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                transport,
                vault: TokenVault::new(store),
                session: SessionPublisher::new(),
                refresh_lock: Mutex::new(()),
                refresh_policy,
            }),
        }
    }

    // ===== Session state =====

    /// Snapshot of the current session.
    pub fn session(&self) -> Session {
        self.inner.session.snapshot()
    }

    pub fn subscribe(&self) -> SessionWatcher {
        self.inner.session.subscribe()
    }

    pub fn current_user(&self) -> Option<User> {
        self.session().user
    }

    pub fn is_authenticated(&self) -> bool {
        self.session().is_authenticated()
    }

    pub fn tokens(&self) -> &TokenVault {
        &self.inner.vault
    }

    // ===== Request pipeline =====

    /// Send a request, returning the successful response or the mapped error.
    pub async fn request(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        if request.auth == AuthMode::Anonymous {
            return self
                .inner
                .transport
                .send(&request, None)
                .await?
                .error_for_status();
        }

        let mut retried = false;
        loop {
            // A half pair is cleared here and the request goes out without a token
            let bearer = self.inner.vault.load_pair()?.map(|pair| pair.access);
            let response = self.inner.transport.send(&request, bearer.as_deref()).await?;

            if response.status != StatusCode::UNAUTHORIZED {
                return response.error_for_status();
            }

            if retried {
                warn!(
                    method = %request.method,
                    path = %request.path,
                    "Still unauthorized after refresh, ending session"
                );
                let error = ApiError::from_status(response.status, &response.text());
                self.end_session(EndReason::RetryExhausted)?;
                return Err(error);
            }

            debug!(method = %request.method, path = %request.path, "Unauthorized, attempting token refresh");
            retried = true;
            self.refresh_access(bearer.as_deref(), &response).await?;
        }
    }

    /// Make sure the stored access token is newer than `sent`, refreshing it
    /// unless another request already did.
    async fn refresh_access(
        &self,
        sent: Option<&str>,
        unauthorized: &ApiResponse,
    ) -> Result<(), ApiError> {
        let _guard = self.inner.refresh_lock.lock().await;

        // Read before the pair so a logout in between is always detected
        let generation = self.inner.vault.generation()?;
        let pair = match self.inner.vault.load_pair()? {
            Some(pair) => pair,
            None => {
                debug!("No refresh token available, not refreshing");
                let error = ApiError::from_status(unauthorized.status, &unauthorized.text());
                if sent.is_some() || self.inner.session.snapshot().is_authenticated() {
                    self.end_session(EndReason::MissingRefreshToken)?;
                }
                return Err(error);
            }
        };

        if sent != Some(pair.access.as_str()) {
            debug!("Access token changed while waiting, replaying with the new token");
            return Ok(());
        }

        match self.call_refresh(&pair.refresh).await {
            Ok(refreshed) => {
                let stored = self.inner.vault.store_refreshed(
                    generation,
                    &refreshed.access,
                    refreshed.refresh.as_deref(),
                )?;
                if !stored {
                    info!("Session ended during token refresh, discarding the new token");
                    return Err(ApiError::SessionExpired);
                }
                info!(rotated = refreshed.refresh.is_some(), "Access token refreshed");
                Ok(())
            }
            Err(e)
                if e.is_network()
                    && self.inner.refresh_policy == RefreshFailurePolicy::KeepOnNetworkError =>
            {
                warn!(error = %e, "Token refresh unreachable, keeping session");
                Err(e)
            }
            Err(e) => {
                // A logout or new login since the refresh started owns the store now
                if self.inner.vault.generation()? == generation {
                    warn!(error = %e, "Token refresh failed, ending session");
                    self.end_session(EndReason::RefreshFailed)?;
                } else {
                    debug!(error = %e, "Token refresh failed after the session changed");
                }
                Err(ApiError::SessionExpired)
            }
        }
    }

    async fn call_refresh(&self, refresh: &str) -> Result<RefreshResponse, ApiError> {
        let request = ApiRequest::post(REFRESH_PATH)
            .anonymous()
            .json(&RefreshRequest { refresh })?;
        self.inner
            .transport
            .send(&request, None)
            .await?
            .error_for_status()?
            .json()
    }

    /// Clear both tokens, then publish the end of the session.
    fn end_session(&self, reason: EndReason) -> Result<(), ApiError> {
        let cleared = self.inner.vault.clear();
        self.inner.session.end(reason);
        cleared.map_err(ApiError::from)
    }

    pub(crate) async fn send_json<T: DeserializeOwned>(
        &self,
        request: ApiRequest,
    ) -> Result<T, ApiError> {
        self.request(request).await?.json()
    }

    pub(crate) async fn send_empty(&self, request: ApiRequest) -> Result<(), ApiError> {
        self.request(request).await.map(|_| ())
    }

    // ===== Authentication =====

    /// Log in and adopt the returned token pair and user.
    pub async fn login(&self, username: &str, password: &str) -> Result<User, ApiError> {
        let request = ApiRequest::post(LOGIN_PATH)
            .anonymous()
            .json(&LoginRequest { username, password })?;
        let response = self.inner.transport.send(&request, None).await?;

        if !response.status.is_success() {
            let body = response.text();
            warn!(status = response.status.as_u16(), username = username, "Login rejected");
            return Err(match ApiError::from_status(response.status, &body) {
                ApiError::Unauthorized(_) | ApiError::Validation(_) => ApiError::Unauthorized(
                    server_message(&body).unwrap_or_else(|| LOGIN_FAILED_MESSAGE.to_string()),
                ),
                other => other,
            });
        }

        let login: LoginResponse = response.json()?;
        self.inner.vault.store_pair(&CredentialPair {
            access: login.access,
            refresh: login.refresh,
        })?;
        self.inner.session.authenticate(login.user.clone());
        Ok(login.user)
    }

    /// Create an account. The caller stays signed out.
    pub async fn register(&self, registration: &Registration) -> Result<(), ApiError> {
        let request = ApiRequest::post(REGISTER_PATH)
            .anonymous()
            .json(registration)?;
        self.request(request).await?;
        info!(username = %registration.username, "Account registered");
        Ok(())
    }

    /// Forget the tokens and the cached user. Local only and idempotent.
    pub fn logout(&self) -> Result<(), ApiError> {
        self.end_session(EndReason::LoggedOut)
    }

    /// Settle the session at startup from whatever tokens were persisted.
    ///
    /// Without a stored pair this resolves immediately with no network call.
    /// Any failure of the profile probe clears the tokens.
    pub async fn check_session(&self) -> Option<User> {
        let pair = match self.inner.vault.load_pair() {
            Ok(pair) => pair,
            Err(e) => {
                warn!(error = %e, "Failed to read stored tokens");
                None
            }
        };
        if pair.is_none() {
            debug!("No stored tokens, starting signed out");
            self.inner.session.mark_unauthenticated();
            return None;
        }

        match self.send_json::<User>(ApiRequest::get(PROFILE_PATH)).await {
            Ok(user) => {
                self.inner.session.authenticate(user.clone());
                Some(user)
            }
            Err(e) => {
                warn!(error = %e, "Session check failed, clearing tokens");
                if let Err(e) = self.end_session(EndReason::ProfileCheckFailed) {
                    warn!(error = %e, "Failed to clear tokens");
                }
                None
            }
        }
    }

    // ===== Profile =====

    /// Fetch the signed-in user's profile and refresh the cached copy.
    pub async fn profile(&self) -> Result<User, ApiError> {
        let user: User = self.send_json(ApiRequest::get(PROFILE_PATH)).await?;
        let fresh = user.clone();
        self.inner.session.update_user(move |cached| *cached = fresh);
        Ok(user)
    }

    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<UserProfile, ApiError> {
        let request = ApiRequest::patch(PROFILE_UPDATE_PATH).multipart(update.to_form());
        let profile: UserProfile = self.send_json(request).await?;
        let fresh = profile.clone();
        self.inner
            .session
            .update_user(move |cached| cached.profile = Some(fresh));
        Ok(profile)
    }
}
