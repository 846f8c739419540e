//! Route guarding derived from session snapshots.

use super::session::{Session, SessionStatus};
use crate::models::User;

/// What a protected screen or command should do for a given session.
#[derive(Debug, PartialEq)]
pub enum Access<'a> {
    /// Startup check still running; show a loading state
    Pending,
    Granted(&'a User),
    RedirectToLogin,
}

pub fn guard(session: &Session) -> Access<'_> {
    match (session.status, session.user.as_ref()) {
        (SessionStatus::Initializing, _) => Access::Pending,
        (SessionStatus::Authenticated, Some(user)) => Access::Granted(user),
        _ => Access::RedirectToLogin,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::EndReason;

    fn user() -> User {
        serde_json::from_str(r#"{"id": 9, "username": "nadia"}"#).expect("user")
    }

    #[test]
    fn test_guard_states() {
        let initializing = Session {
            status: SessionStatus::Initializing,
            user: None,
            ended: None,
        };
        assert_eq!(guard(&initializing), Access::Pending);

        let signed_in = Session {
            status: SessionStatus::Authenticated,
            user: Some(user()),
            ended: None,
        };
        assert!(matches!(guard(&signed_in), Access::Granted(u) if u.username == "nadia"));

        let ended = Session {
            status: SessionStatus::Unauthenticated,
            user: None,
            ended: Some(EndReason::RefreshFailed),
        };
        assert_eq!(guard(&ended), Access::RedirectToLogin);
    }
}
