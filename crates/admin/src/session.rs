//! Session issuance.

use leaddesk_core::{AdminId, Time};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// How long an issued session stays valid.
pub const SESSION_TTL_HOURS: i64 = 24;

/// An opaque session issued after successful authentication.
///
/// There is no renewal; a caller re-authenticates when the session expires.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Opaque bearer token
    pub token: String,

    /// The authenticated admin
    pub admin_id: AdminId,

    /// Issuance timestamp
    pub issued_at: Time,

    /// Expiry timestamp
    pub expires_at: Time,
}

impl Session {
    /// Issue a fresh session for an admin.
    pub fn issue(admin_id: AdminId) -> Self {
        let issued_at = chrono::Utc::now();
        Self {
            token: format!("{}{}", Ulid::new(), Ulid::new()),
            admin_id,
            issued_at,
            expires_at: issued_at + chrono::Duration::hours(SESSION_TTL_HOURS),
        }
    }

    /// Whether the session is still valid at `now`.
    pub fn is_valid_at(&self, now: Time) -> bool {
        now < self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_lasts_24_hours() {
        let session = Session::issue(AdminId::new());
        assert!(session.is_valid_at(session.issued_at));
        assert!(session.is_valid_at(session.issued_at + chrono::Duration::hours(23)));
        assert!(!session.is_valid_at(session.issued_at + chrono::Duration::hours(25)));
    }

    #[test]
    fn tokens_are_unique() {
        let a = Session::issue(AdminId::new());
        let b = Session::issue(AdminId::new());
        assert_ne!(a.token, b.token);
    }
}
