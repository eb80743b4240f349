//! Access decision for a single request.
//!
//! [`AccessGateway::evaluate`] is a pure function of (path, cookie, now):
//! classify the path, verify the `auth_token` cookie if present, then look
//! the pair up in the decision table.  The tower service in
//! `tower_middle::tower_access_gateway` turns the resulting [`Decision`]
//! into a forwarded request or a short-circuit response.

use std::sync::Arc;

use http::{HeaderMap, HeaderValue, StatusCode};
use thiserror::Error;
use tracing::{debug, warn};

use shared::types::jwt::{Role, SessionClaims};

use crate::auth::policy::{PathClass, PathPolicy};
use crate::auth::token::{TokenCodec, TokenError};
use crate::handlers::http::utils::headers::get_cookie;

/// Cookie holding the session token.
pub const AUTH_COOKIE: &str = "auth_token";

pub const HEADER_USER_ID: &str = "x-user-id";
pub const HEADER_USER_EMAIL: &str = "x-user-email";
pub const HEADER_USER_ROLE: &str = "x-user-role";
/// Legacy alias of `x-user-email` read by partner handlers.
pub const HEADER_PARTNER_EMAIL: &str = "x-partner-email";

const IDENTITY_HEADERS: [&str; 4] = [
    HEADER_USER_ID,
    HEADER_USER_EMAIL,
    HEADER_USER_ROLE,
    HEADER_PARTNER_EMAIL,
];

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Verified caller, attached to forwarded requests as an extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub subject_id: String,
    pub email: String,
    pub role: Role,
    pub name: String,
}

impl From<SessionClaims> for Identity {
    fn from(claims: SessionClaims) -> Self {
        Self {
            subject_id: claims.sub,
            email: claims.email,
            role: claims.role,
            name: claims.name,
        }
    }
}

impl Identity {
    /// Write the identity headers, replacing anything already present.
    ///
    /// A value that is not a valid header (non-visible ASCII in an email) is
    /// skipped; the typed extension still carries it.
    pub fn write_headers(&self, headers: &mut HeaderMap) {
        let pairs = [
            (HEADER_USER_ID, self.subject_id.as_str()),
            (HEADER_USER_EMAIL, self.email.as_str()),
            (HEADER_USER_ROLE, self.role.as_str()),
            (HEADER_PARTNER_EMAIL, self.email.as_str()),
        ];
        for (name, value) in pairs {
            match HeaderValue::from_str(value) {
                Ok(v) => {
                    headers.insert(name, v);
                }
                Err(_) => warn!("Identity value for {} is not a valid header; skipped", name),
            }
        }
    }

    /// Rebuild an identity from forwarded headers.
    ///
    /// `x-user-email` + `x-user-role` win; a lone `x-partner-email` yields a
    /// partner identity with no subject id.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let read = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let role = read(HEADER_USER_ROLE).and_then(|r| r.parse::<Role>().ok());
        if let (Some(email), Some(role)) = (read(HEADER_USER_EMAIL), role) {
            return Some(Self {
                subject_id: read(HEADER_USER_ID).unwrap_or_default(),
                email,
                role,
                name: String::new(),
            });
        }

        read(HEADER_PARTNER_EMAIL).map(|email| Self {
            subject_id: String::new(),
            email,
            role: Role::Partner,
            name: String::new(),
        })
    }
}

/// Remove identity headers a client may have sent itself.
pub fn strip_identity_headers(headers: &mut HeaderMap) {
    for name in IDENTITY_HEADERS {
        headers.remove(name);
    }
}

// ---------------------------------------------------------------------------
// Token state / denial reasons / decision
// ---------------------------------------------------------------------------

/// Outcome of reading and verifying the session cookie.
#[derive(Debug)]
pub enum TokenState {
    Absent,
    Invalid(TokenError),
    Valid(SessionClaims),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccessDenied {
    #[error("no session token")]
    MissingToken,

    #[error("session token invalid or expired")]
    InvalidSignatureOrExpired,

    #[error("role {presented} cannot access {required} resources")]
    RoleMismatch { required: Role, presented: Role },
}

impl AccessDenied {
    /// Status used for JSON API denials.
    pub fn status(&self) -> StatusCode {
        match self {
            AccessDenied::RoleMismatch { .. } => StatusCode::FORBIDDEN,
            AccessDenied::MissingToken | AccessDenied::InvalidSignatureOrExpired => {
                StatusCode::UNAUTHORIZED
            }
        }
    }

    /// Message placed in the `{"error": ...}` body.
    pub fn public_message(&self) -> &'static str {
        match self {
            AccessDenied::RoleMismatch { .. } => "Forbidden",
            AccessDenied::MissingToken | AccessDenied::InvalidSignatureOrExpired => {
                "Unauthorized"
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Pass the request through untouched.
    Forward,
    /// Pass the request through annotated with the caller's identity.
    ForwardAs {
        identity: Identity,
        /// Also write identity headers (protected APIs only).
        inject_headers: bool,
    },
    /// Browser redirect; `denied` is set when the redirect is a denial.
    Redirect {
        location: &'static str,
        denied: Option<AccessDenied>,
    },
    /// JSON error response.
    Reject(AccessDenied),
}

// ---------------------------------------------------------------------------
// Gateway
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct AccessGateway {
    codec: Arc<TokenCodec>,
    policy: PathPolicy,
}

impl AccessGateway {
    pub fn new(codec: Arc<TokenCodec>, policy: PathPolicy) -> Self {
        Self { codec, policy }
    }

    /// Read the session cookie from `headers` and verify it.
    pub fn token_state(&self, headers: &HeaderMap) -> TokenState {
        match get_cookie(headers, AUTH_COOKIE) {
            None => TokenState::Absent,
            Some(token) if token.is_empty() => TokenState::Absent,
            Some(token) => match self.codec.verify(&token) {
                Ok(claims) => TokenState::Valid(claims),
                Err(e) => TokenState::Invalid(e),
            },
        }
    }

    /// Classify `path` and decide what happens to the request.
    pub fn evaluate(&self, path: &str, headers: &HeaderMap) -> (PathClass, Decision) {
        let class = self.policy.classify(path);

        // Public paths never look at the cookie.
        if class == PathClass::Public {
            return (class, Decision::Forward);
        }

        let state = self.token_state(headers);
        if let TokenState::Invalid(ref e) = state {
            debug!("Session token rejected on {}: {}", path, e);
        }

        (class, Self::decide(class, state))
    }

    /// The decision table.
    pub fn decide(class: PathClass, state: TokenState) -> Decision {
        let claims = match state {
            TokenState::Valid(claims) => Ok(claims),
            TokenState::Absent => Err(AccessDenied::MissingToken),
            TokenState::Invalid(_) => Err(AccessDenied::InvalidSignatureOrExpired),
        };

        match class {
            PathClass::Public => Decision::Forward,

            PathClass::Login(_) => match claims {
                Ok(claims) => Decision::Redirect {
                    location: claims.role.dashboard_path(),
                    denied: None,
                },
                Err(_) => Decision::Forward,
            },

            PathClass::ProtectedPage(required) => match authorize(required, claims) {
                Ok(identity) => Decision::ForwardAs {
                    identity,
                    inject_headers: false,
                },
                Err(denied) => Decision::Redirect {
                    location: required.login_path(),
                    denied: Some(denied),
                },
            },

            PathClass::ProtectedApi(required) => match authorize(required, claims) {
                Ok(identity) => Decision::ForwardAs {
                    identity,
                    inject_headers: true,
                },
                Err(denied) => Decision::Reject(denied),
            },
        }
    }
}

fn authorize(
    required: Role,
    claims: Result<SessionClaims, AccessDenied>,
) -> Result<Identity, AccessDenied> {
    let claims = claims?;
    if claims.role != required {
        return Err(AccessDenied::RoleMismatch {
            required,
            presented: claims.role,
        });
    }
    Ok(Identity::from(claims))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::token::{FixedClock, SessionSubject};

    const SECRET: &[u8] = b"gateway-test-secret-0123456789abcdef";
    const NOW: u64 = 1_700_000_000;

    fn claims(role: Role) -> SessionClaims {
        SessionClaims {
            sub: "id-1".into(),
            email: "p@example.com".into(),
            role,
            name: "P".into(),
            iat: NOW,
            exp: NOW + 60,
        }
    }

    fn invalid() -> TokenState {
        TokenState::Invalid(TokenError::Expired { exp: 1, now: 2 })
    }

    fn gateway() -> AccessGateway {
        let codec = TokenCodec::with_clock(SECRET, Arc::new(FixedClock(NOW)));
        AccessGateway::new(Arc::new(codec), PathPolicy::standard())
    }

    fn cookie_headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            http::header::COOKIE,
            HeaderValue::from_str(&format!("theme=dark; {}={}", AUTH_COOKIE, value)).unwrap(),
        );
        headers
    }

    #[test]
    fn public_always_forwards() {
        for state in [
            TokenState::Absent,
            invalid(),
            TokenState::Valid(claims(Role::Admin)),
        ] {
            assert_eq!(AccessGateway::decide(PathClass::Public, state), Decision::Forward);
        }
    }

    #[test]
    fn login_page_without_session_is_shown() {
        for class in [PathClass::Login(Role::Admin), PathClass::Login(Role::Partner)] {
            assert_eq!(AccessGateway::decide(class, TokenState::Absent), Decision::Forward);
            assert_eq!(AccessGateway::decide(class, invalid()), Decision::Forward);
        }
    }

    #[test]
    fn login_page_bounces_to_own_dashboard_for_either_role() {
        for class in [PathClass::Login(Role::Admin), PathClass::Login(Role::Partner)] {
            assert_eq!(
                AccessGateway::decide(class, TokenState::Valid(claims(Role::Partner))),
                Decision::Redirect {
                    location: "/partner/dashboard",
                    denied: None
                }
            );
            assert_eq!(
                AccessGateway::decide(class, TokenState::Valid(claims(Role::Admin))),
                Decision::Redirect {
                    location: "/dashboard",
                    denied: None
                }
            );
        }
    }

    #[test]
    fn admin_page_denials_redirect_to_admin_login() {
        let class = PathClass::ProtectedPage(Role::Admin);
        for state in [
            TokenState::Absent,
            invalid(),
            TokenState::Valid(claims(Role::Partner)),
        ] {
            match AccessGateway::decide(class, state) {
                Decision::Redirect { location, denied } => {
                    assert_eq!(location, "/login");
                    assert!(denied.is_some());
                }
                other => panic!("unexpected {:?}", other),
            }
        }
    }

    #[test]
    fn partner_page_denials_redirect_to_partner_login() {
        let class = PathClass::ProtectedPage(Role::Partner);
        match AccessGateway::decide(class, TokenState::Valid(claims(Role::Admin))) {
            Decision::Redirect { location, denied } => {
                assert_eq!(location, "/partner/login");
                assert_eq!(
                    denied,
                    Some(AccessDenied::RoleMismatch {
                        required: Role::Partner,
                        presented: Role::Admin
                    })
                );
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn page_with_matching_role_forwards_without_headers() {
        let decision = AccessGateway::decide(
            PathClass::ProtectedPage(Role::Admin),
            TokenState::Valid(claims(Role::Admin)),
        );
        assert!(matches!(
            decision,
            Decision::ForwardAs {
                inject_headers: false,
                ..
            }
        ));
    }

    #[test]
    fn api_denials_map_to_401_and_403() {
        let class = PathClass::ProtectedApi(Role::Partner);

        let missing = AccessGateway::decide(class, TokenState::Absent);
        assert_eq!(missing, Decision::Reject(AccessDenied::MissingToken));

        let bad = AccessGateway::decide(class, invalid());
        assert_eq!(bad, Decision::Reject(AccessDenied::InvalidSignatureOrExpired));

        match AccessGateway::decide(class, TokenState::Valid(claims(Role::Admin))) {
            Decision::Reject(denied) => {
                assert_eq!(denied.status(), StatusCode::FORBIDDEN);
                assert_eq!(denied.public_message(), "Forbidden");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(AccessDenied::MissingToken.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AccessDenied::InvalidSignatureOrExpired.public_message(),
            "Unauthorized"
        );
    }

    #[test]
    fn api_with_matching_role_forwards_with_headers() {
        let decision = AccessGateway::decide(
            PathClass::ProtectedApi(Role::Partner),
            TokenState::Valid(claims(Role::Partner)),
        );
        match decision {
            Decision::ForwardAs {
                identity,
                inject_headers,
            } => {
                assert!(inject_headers);
                assert_eq!(identity.email, "p@example.com");
                assert_eq!(identity.role, Role::Partner);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn token_state_reads_cookie() {
        let gw = gateway();
        let token = TokenCodec::with_clock(SECRET, Arc::new(FixedClock(NOW)))
            .issue(&SessionSubject {
                id: "id-9".into(),
                email: "a@example.com".into(),
                role: Role::Admin,
                name: "Admin".into(),
            })
            .unwrap();

        assert!(matches!(gw.token_state(&HeaderMap::new()), TokenState::Absent));
        assert!(matches!(gw.token_state(&cookie_headers("")), TokenState::Absent));
        assert!(matches!(
            gw.token_state(&cookie_headers("garbage")),
            TokenState::Invalid(_)
        ));
        match gw.token_state(&cookie_headers(&token)) {
            TokenState::Valid(c) => assert_eq!(c.sub, "id-9"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn evaluate_skips_verification_on_public_paths() {
        let gw = gateway();
        let (class, decision) = gw.evaluate("/api/auth/login", &cookie_headers("garbage"));
        assert_eq!(class, PathClass::Public);
        assert_eq!(decision, Decision::Forward);
    }

    #[test]
    fn identity_headers_overwrite_client_values() {
        let mut headers = HeaderMap::new();
        headers.insert(HEADER_PARTNER_EMAIL, HeaderValue::from_static("spoof@evil.io"));
        let identity = Identity::from(claims(Role::Partner));
        identity.write_headers(&mut headers);
        assert_eq!(headers[HEADER_PARTNER_EMAIL], "p@example.com");
        assert_eq!(headers[HEADER_USER_ROLE], "partner");
        assert_eq!(headers[HEADER_USER_ID], "id-1");
        assert_eq!(headers.get_all(HEADER_PARTNER_EMAIL).iter().count(), 1);
    }

    #[test]
    fn strip_removes_all_identity_headers() {
        let mut headers = HeaderMap::new();
        for name in IDENTITY_HEADERS {
            headers.insert(name, HeaderValue::from_static("x"));
        }
        headers.insert("accept", HeaderValue::from_static("*/*"));
        strip_identity_headers(&mut headers);
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn identity_survives_header_round_trip_without_name() {
        let identity = Identity::from(claims(Role::Admin));
        let mut headers = HeaderMap::new();
        identity.write_headers(&mut headers);
        let read = Identity::from_headers(&headers).unwrap();
        assert_eq!(read.email, identity.email);
        assert_eq!(read.role, Role::Admin);
        assert_eq!(read.subject_id, "id-1");
        assert!(read.name.is_empty());
    }

    #[test]
    fn lone_partner_email_header_is_a_partner() {
        let mut headers = HeaderMap::new();
        headers.insert(HEADER_PARTNER_EMAIL, HeaderValue::from_static("legacy@example.com"));
        let read = Identity::from_headers(&headers).unwrap();
        assert_eq!(read.role, Role::Partner);
        assert_eq!(read.email, "legacy@example.com");

        assert!(Identity::from_headers(&HeaderMap::new()).is_none());
    }
}
