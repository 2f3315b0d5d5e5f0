//! Identity credential passed into every authenticated operation
//!
//! There is no ambient signed-in user anywhere in this crate: whoever
//! drives the SDK constructs a [`Session`] from whatever their identity
//! provider issued and hands it to each call that needs one. Guests are
//! simply the absence of a session.

use std::fmt;

/// Authenticated identity: the CMS user id plus its bearer token
#[derive(Clone)]
pub struct Session {
    /// CMS user id the token belongs to
    pub user_id: i64,
    token: String,
}

impl Session {
    pub fn new(user_id: i64, token: impl Into<String>) -> Self {
        Self {
            user_id,
            token: token.into(),
        }
    }

    /// Bearer token for the CMS API
    pub fn token(&self) -> &str {
        &self.token
    }
}

// Tokens must never end up in logs
impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("user_id", &self.user_id)
            .field("token", &"<redacted>")
            .finish()
    }
}
