use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The two tenants of the portal.
///
/// A credential carries exactly one role for its whole lifetime; there is no
/// upgrade or downgrade path short of logging in again as a different
/// account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Partner,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Partner => "partner",
        }
    }

    /// Landing page for an already signed-in user of this role.
    pub fn dashboard_path(&self) -> &'static str {
        match self {
            Role::Admin => "/dashboard",
            Role::Partner => "/partner/dashboard",
        }
    }

    /// Login page a browser is sent to when it lacks a session for this role.
    pub fn login_path(&self) -> &'static str {
        match self {
            Role::Admin => "/login",
            Role::Partner => "/partner/login",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "partner" => Ok(Role::Partner),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

/// Claims embedded in every session token issued by the server.
///
/// The token is verified on every request by the access gateway: HMAC
/// signature plus absolute expiry.  Nothing is stored server-side, so a
/// token stays valid until `exp` unless the signing secret is rotated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Standard JWT subject: the admin or affiliate record id.
    pub sub: String,

    pub email: String,

    pub role: Role,

    /// Display name: `"Admin"` for admins, the affiliate's name for partners.
    pub name: String,

    /// Issued-at (Unix timestamp, seconds).
    pub iat: u64,

    /// Absolute expiry (Unix timestamp, seconds).
    pub exp: u64,
}
