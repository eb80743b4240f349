pub mod gateway;
pub mod policy;
pub mod token;

pub use gateway::{AUTH_COOKIE, AccessDenied, AccessGateway, Decision, Identity, TokenState};
pub use policy::{PathClass, PathPattern, PathPolicy};
pub use token::{Clock, FixedClock, SESSION_TTL_SECS, SessionSubject, SystemClock, TokenCodec, TokenError};
