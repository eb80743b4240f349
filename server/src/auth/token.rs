//! Session token codec.
//!
//! Tokens are HS256 JWTs carrying [`SessionClaims`].  Expiry is absolute:
//! `exp = iat + 24h`, checked against an injected [`Clock`] with no leeway so
//! the outcome is deterministic for a given "now".

use std::fmt;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use thiserror::Error;
use tracing::debug;

use shared::types::jwt::{Role, SessionClaims};

/// Session lifetime, also used as the cookie `Max-Age`.
pub const SESSION_TTL_SECS: u64 = 24 * 60 * 60;

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Wall-clock source for `iat` / `exp`.
pub trait Clock: Send + Sync {
    /// Current Unix time in seconds.
    fn now(&self) -> u64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        // Clocks set before the epoch read as 0.
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}

/// A clock frozen at a given instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub u64);

impl Clock for FixedClock {
    fn now(&self) -> u64 {
        self.0
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Error, Debug)]
pub enum TokenError {
    /// Bad encoding, bad signature, wrong algorithm or missing claims.
    #[error("invalid token: {0}")]
    Invalid(jsonwebtoken::errors::Error),

    #[error("token expired at {exp} (now {now})")]
    Expired { exp: u64, now: u64 },

    #[error("failed to sign token: {0}")]
    Signing(jsonwebtoken::errors::Error),
}

// ---------------------------------------------------------------------------
// Codec
// ---------------------------------------------------------------------------

/// Who a token is being issued for.
#[derive(Debug, Clone)]
pub struct SessionSubject {
    pub id: String,
    pub email: String,
    pub role: Role,
    pub name: String,
}

#[derive(Clone)]
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCodec")
            .field("algorithm", &Algorithm::HS256)
            .field("ttl_secs", &SESSION_TTL_SECS)
            .finish_non_exhaustive()
    }
}

impl TokenCodec {
    /// Codec over `secret` using the system clock.
    pub fn new(secret: &[u8]) -> Self {
        Self::with_clock(secret, Arc::new(SystemClock))
    }

    pub fn with_clock(secret: &[u8], clock: Arc<dyn Clock>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked by `verify` against `clock`, not by the library
        // against the system time.
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            clock,
        }
    }

    /// Sign a fresh 24-hour token for `subject`.
    pub fn issue(&self, subject: &SessionSubject) -> Result<String, TokenError> {
        let iat = self.clock.now();
        let claims = SessionClaims {
            sub: subject.id.clone(),
            email: subject.email.clone(),
            role: subject.role,
            name: subject.name.clone(),
            iat,
            exp: iat + SESSION_TTL_SECS,
        };

        debug!(
            "Issuing {} token for {} (exp {})",
            claims.role, claims.email, claims.exp
        );

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(TokenError::Signing)
    }

    /// Check signature and expiry, returning the claims on success.
    pub fn verify(&self, token: &str) -> Result<SessionClaims, TokenError> {
        let data = decode::<SessionClaims>(token, &self.decoding, &self.validation)
            .map_err(TokenError::Invalid)?;

        let now = self.clock.now();
        if now >= data.claims.exp {
            return Err(TokenError::Expired {
                exp: data.claims.exp,
                now,
            });
        }

        Ok(data.claims)
    }
}
