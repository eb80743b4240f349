pub mod admin;
pub mod json_error;
pub mod jwt;
pub mod login;
pub mod partner;
pub mod server_config;
pub mod signup;

pub use self::admin::*;
pub use self::json_error::ErrorBody;
pub use self::jwt::{Role, SessionClaims};
pub use self::login::{LoginData, LoginError, LoginResponse};
pub use self::partner::{NewReferral, PartnerStats};
pub use self::signup::{SignupData, SignupError, SignupResponse};
