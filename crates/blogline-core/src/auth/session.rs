use tokio::sync::watch;
use tracing::info;

use crate::models::User;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// Startup check has not finished yet
    Initializing,
    Authenticated,
    Unauthenticated,
}

/// Why an authenticated session was torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    LoggedOut,
    /// The refresh endpoint rejected the refresh token or could not be reached
    RefreshFailed,
    /// A 401 arrived and there was no refresh token to recover with
    MissingRefreshToken,
    /// A request was still unauthorized after refreshing and replaying it
    RetryExhausted,
    /// The stored token failed the startup profile check
    ProfileCheckFailed,
}

impl EndReason {
    /// Whether the presentation layer should send the user back to login.
    pub fn requires_login(&self) -> bool {
        !matches!(self, EndReason::LoggedOut)
    }
}

/// Immutable snapshot of the session, handed to consumers.
///
/// `user` is set exactly when `status` is `Authenticated`.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub status: SessionStatus,
    pub user: Option<User>,
    /// Set when the most recent transition ended a session
    pub ended: Option<EndReason>,
}

impl Session {
    fn initializing() -> Self {
        Self {
            status: SessionStatus::Initializing,
            user: None,
            ended: None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.status == SessionStatus::Authenticated
    }

    pub fn is_ready(&self) -> bool {
        self.status != SessionStatus::Initializing
    }
}

/// The single writer of session state. Owned by the session client.
pub(crate) struct SessionPublisher {
    tx: watch::Sender<Session>,
}

impl SessionPublisher {
    pub(crate) fn new() -> Self {
        let (tx, _rx) = watch::channel(Session::initializing());
        Self { tx }
    }

    pub(crate) fn snapshot(&self) -> Session {
        self.tx.borrow().clone()
    }

    pub(crate) fn subscribe(&self) -> SessionWatcher {
        SessionWatcher {
            rx: self.tx.subscribe(),
        }
    }

    pub(crate) fn authenticate(&self, user: User) {
        info!(user_id = user.id, username = %user.username, "Session authenticated");
        self.tx.send_replace(Session {
            status: SessionStatus::Authenticated,
            user: Some(user),
            ended: None,
        });
    }

    /// Leave `Initializing` without a user (nothing stored to check).
    pub(crate) fn mark_unauthenticated(&self) {
        self.tx.send_if_modified(|session| {
            if session.status == SessionStatus::Unauthenticated {
                return false;
            }
            *session = Session {
                status: SessionStatus::Unauthenticated,
                user: None,
                ended: None,
            };
            true
        });
    }

    /// Tear the session down. Returns whether anything changed.
    ///
    /// Only a session that is authenticated or still being checked can end;
    /// when already signed out this is a no-op and no reason is recorded.
    pub(crate) fn end(&self, reason: EndReason) -> bool {
        self.tx.send_if_modified(|session| {
            if session.status == SessionStatus::Unauthenticated {
                return false;
            }
            let was_authenticated = session.status == SessionStatus::Authenticated;
            *session = Session {
                status: SessionStatus::Unauthenticated,
                user: None,
                ended: Some(reason),
            };
            if was_authenticated {
                info!(?reason, "Session ended");
            }
            true
        })
    }

    /// Replace the cached user in place, only while authenticated.
    pub(crate) fn update_user(&self, apply: impl FnOnce(&mut User)) {
        self.tx.send_if_modified(|session| match session.user.as_mut() {
            Some(user) if session.status == SessionStatus::Authenticated => {
                apply(user);
                true
            }
            _ => false,
        });
    }
}

/// Read-only, cloneable handle on session state.
#[derive(Clone)]
pub struct SessionWatcher {
    rx: watch::Receiver<Session>,
}

impl SessionWatcher {
    pub fn current(&self) -> Session {
        self.rx.borrow().clone()
    }

    /// Wait for the next change. Returns `None` once the client is gone.
    pub async fn changed(&mut self) -> Option<Session> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    /// Resolve once the startup check has settled the session.
    pub async fn wait_until_ready(&mut self) -> Session {
        if let Ok(session) = self.rx.wait_for(Session::is_ready).await {
            return session.clone();
        }
        self.current()
    }
}
