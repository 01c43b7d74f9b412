//! Authenticated caller identity.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::UserId;

/// Role carried in the bearer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Ticket buyer.
    User,
    /// Box office operator.
    Admin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => f.write_str("user"),
            Self::Admin => f.write_str("admin"),
        }
    }
}

/// Who is calling, as established by [`crate::auth::Authenticator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    /// Caller's user id.
    pub user_id: UserId,
    /// Caller's role.
    pub role: Role,
}

impl Identity {
    /// Returns `true` for operators.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}
