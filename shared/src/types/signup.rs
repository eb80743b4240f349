use serde::{Deserialize, Serialize};

use crate::types::json_error::ErrorBody;

/// Body of `POST /api/auth/signup` (partner self-registration).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignupData {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    /// Collected by the signup form but not persisted.
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SignupResponse {
    pub success: bool,
    pub message: String,
}

impl SignupResponse {
    pub fn created() -> Self {
        Self {
            success: true,
            message: "Account created successfully".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignupError {
    MissingFields,
    InvalidEmail,
    EmailTaken,
    InternalError,
}

impl SignupError {
    pub fn to_message(&self) -> &'static str {
        match self {
            Self::MissingFields => "Missing required fields",
            Self::InvalidEmail => "Invalid email address",
            Self::EmailTaken => "Email already in use",
            Self::InternalError => "Internal Server Error",
        }
    }

    pub fn to_response(&self) -> ErrorBody {
        ErrorBody::new(self.to_message())
    }
}
