//! Bearer token verification.
//!
//! The service never issues credentials to end users; an identity provider
//! signs HS256 JWTs with a shared secret and this module only verifies
//! them. [`JwtAuthenticator::issue`] exists for operators and tests.

pub mod extractors;

use std::fmt;

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{Identity, Role, UserId};
use crate::error::BoxOfficeError;

pub use extractors::{AuthUser, RequireAdmin};

/// Turns a bearer token into an [`Identity`].
pub trait Authenticator: Send + Sync + fmt::Debug {
    /// Verifies `token`.
    ///
    /// # Errors
    ///
    /// Returns [`BoxOfficeError::Unauthorized`] if the token is malformed,
    /// expired or signed with another key.
    fn authenticate(&self, token: &str) -> Result<Identity, BoxOfficeError>;
}

/// JWT claims carried by bearer tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User id as a UUID string.
    pub sub: String,
    /// Caller role.
    pub role: Role,
    /// Expiry as seconds since the Unix epoch.
    pub exp: i64,
}

/// HS256 verifier over a shared secret.
pub struct JwtAuthenticator {
    decoding: DecodingKey,
    encoding: EncodingKey,
    validation: Validation,
}

impl fmt::Debug for JwtAuthenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtAuthenticator")
            .field("algorithm", &Algorithm::HS256)
            .finish_non_exhaustive()
    }
}

impl JwtAuthenticator {
    /// Creates an authenticator for tokens signed with `secret`.
    #[must_use]
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "sub"]);
        Self {
            decoding: DecodingKey::from_secret(secret),
            encoding: EncodingKey::from_secret(secret),
            validation,
        }
    }

    /// Signs a token for `identity` valid for `ttl`.
    ///
    /// # Errors
    ///
    /// Returns [`BoxOfficeError::Internal`] if signing fails.
    pub fn issue(&self, identity: Identity, ttl: Duration) -> Result<String, BoxOfficeError> {
        let claims = Claims {
            sub: identity.user_id.to_string(),
            role: identity.role,
            exp: (Utc::now() + ttl).timestamp(),
        };
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| BoxOfficeError::Internal(format!("token signing failed: {e}")))
    }
}

impl Authenticator for JwtAuthenticator {
    fn authenticate(&self, token: &str) -> Result<Identity, BoxOfficeError> {
        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation)
            .map_err(|e| BoxOfficeError::Unauthorized(e.to_string()))?;
        let user_id = Uuid::parse_str(&data.claims.sub)
            .map(UserId::from_uuid)
            .map_err(|_| BoxOfficeError::Unauthorized("subject is not a user id".to_string()))?;
        Ok(Identity {
            user_id,
            role: data.claims.role,
        })
    }
}
