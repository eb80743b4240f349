use serde::{Deserialize, Serialize};

use crate::types::json_error::ErrorBody;
use crate::types::jwt::Role;

// ---------------------------------------------------------------------------
// Login wire types
// ---------------------------------------------------------------------------

/// Body of `POST /api/auth/login`.
///
/// Every field defaults to empty so that a partially filled form reaches the
/// handler's validation step instead of failing deserialization.
#[derive(Debug, Default, Deserialize)]
pub struct LoginData {
    #[serde(default, alias = "username")]
    pub email: String,
    #[serde(default)]
    pub password: String,
    /// `"admin"` or `"partner"`; selects which account table is searched.
    #[serde(default, rename = "type")]
    pub login_type: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub success: bool,
    pub role: Role,
}

impl LoginResponse {
    pub fn success(role: Role) -> Self {
        Self {
            success: true,
            role,
        }
    }
}

// ---------------------------------------------------------------------------
// Login errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginError {
    MissingCredentials,
    InvalidLoginType,
    /// Unknown email and wrong password share this variant on purpose.
    InvalidCredentials,
    InternalError,
}

impl LoginError {
    pub fn to_message(&self) -> &'static str {
        match self {
            Self::MissingCredentials => "Missing credentials",
            Self::InvalidLoginType => "Invalid login type",
            Self::InvalidCredentials => "Invalid credentials",
            Self::InternalError => "Internal Server Error",
        }
    }

    pub fn to_response(&self) -> ErrorBody {
        ErrorBody::new(self.to_message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_type_is_read_from_type_key() {
        let d: LoginData =
            serde_json::from_str(r#"{"email":"a@b.c","password":"x","type":"partner"}"#).unwrap();
        assert_eq!(d.login_type, "partner");
    }

    #[test]
    fn missing_fields_default_to_empty() {
        let d: LoginData = serde_json::from_str("{}").unwrap();
        assert!(d.email.is_empty());
        assert!(d.password.is_empty());
        assert!(d.login_type.is_empty());
    }
}
