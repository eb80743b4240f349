use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use anyhow::{Context, Result};
use hyper::{Method, StatusCode};
use tracing::{debug, error, warn};

use shared::types::jwt::Role;

use crate::auth::{Identity, PathPolicy};
use crate::database::affiliates::{self, Affiliate};
use crate::handlers::http::{admin, auth, partner, utils::*};
use crate::{AppState, HttpResponse, IncomingRequest};

// ---------------------------------------------------------------------------
// Handler type aliases
// ---------------------------------------------------------------------------
//
// Three tiers, all behind the access gateway:
//
//   OpenHandler     Receives (req, state).
//                   Use for: /health, /api/auth/*.
//
//   AdminHandler    Receives (req, state, identity) once the router has
//                   confirmed an admin identity.
//
//   PartnerHandler  Receives (req, state, affiliate): the router resolves
//                   the caller's email to an affiliate row first.

type RouteFuture = Pin<Box<dyn Future<Output = Result<HttpResponse>> + Send>>;

type OpenHandler = Box<dyn Fn(IncomingRequest, AppState) -> RouteFuture + Send + Sync>;

type AdminHandler = Box<dyn Fn(IncomingRequest, AppState, Identity) -> RouteFuture + Send + Sync>;

type PartnerHandler =
    Box<dyn Fn(IncomingRequest, AppState, Affiliate) -> RouteFuture + Send + Sync>;

enum RouteKind {
    Open(OpenHandler),
    Admin(AdminHandler),
    Partner(PartnerHandler),
}

struct Route {
    method: Method,
    path: String,
    kind: RouteKind,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct Router {
    routes: Vec<Route>,
    /// Guards the page fallback the same way the gateway guards requests.
    pages: PathPolicy,
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("routes_count", &self.routes.len())
            .finish()
    }
}

impl Router {
    pub fn new() -> Self {
        Self {
            routes: Vec::new(),
            pages: PathPolicy::standard(),
        }
    }

    fn push(mut self, method: Method, path: &str, kind: RouteKind) -> Self {
        self.routes.push(Route {
            method,
            path: path.to_string(),
            kind,
        });
        self
    }

    // ── Open ──────────────────────────────────────────────────────────────────

    pub fn get<F, Fut>(self, path: &str, handler: F) -> Self
    where
        F: Fn(IncomingRequest, AppState) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<HttpResponse>> + Send + 'static,
    {
        self.push(
            Method::GET,
            path,
            RouteKind::Open(Box::new(move |req, state| Box::pin(handler(req, state)))),
        )
    }

    pub fn post<F, Fut>(self, path: &str, handler: F) -> Self
    where
        F: Fn(IncomingRequest, AppState) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<HttpResponse>> + Send + 'static,
    {
        self.push(
            Method::POST,
            path,
            RouteKind::Open(Box::new(move |req, state| Box::pin(handler(req, state)))),
        )
    }

    // ── Admin ─────────────────────────────────────────────────────────────────

    pub fn get_admin<F, Fut>(self, path: &str, handler: F) -> Self
    where
        F: Fn(IncomingRequest, AppState, Identity) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<HttpResponse>> + Send + 'static,
    {
        self.push(
            Method::GET,
            path,
            RouteKind::Admin(Box::new(move |req, state, identity| {
                Box::pin(handler(req, state, identity))
            })),
        )
    }

    pub fn post_admin<F, Fut>(self, path: &str, handler: F) -> Self
    where
        F: Fn(IncomingRequest, AppState, Identity) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<HttpResponse>> + Send + 'static,
    {
        self.push(
            Method::POST,
            path,
            RouteKind::Admin(Box::new(move |req, state, identity| {
                Box::pin(handler(req, state, identity))
            })),
        )
    }

    // ── Partner ───────────────────────────────────────────────────────────────

    pub fn get_partner<F, Fut>(self, path: &str, handler: F) -> Self
    where
        F: Fn(IncomingRequest, AppState, Affiliate) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<HttpResponse>> + Send + 'static,
    {
        self.push(
            Method::GET,
            path,
            RouteKind::Partner(Box::new(move |req, state, partner| {
                Box::pin(handler(req, state, partner))
            })),
        )
    }

    pub fn post_partner<F, Fut>(self, path: &str, handler: F) -> Self
    where
        F: Fn(IncomingRequest, AppState, Affiliate) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<HttpResponse>> + Send + 'static,
    {
        self.push(
            Method::POST,
            path,
            RouteKind::Partner(Box::new(move |req, state, partner| {
                Box::pin(handler(req, state, partner))
            })),
        )
    }

    // ── Dispatch ──────────────────────────────────────────────────────────────

    /// Route the request; a handler error becomes a 500 JSON response.
    pub async fn dispatch(&self, req: IncomingRequest, state: AppState) -> HttpResponse {
        let method = req.method().clone();
        let path = req.uri().path().to_string();

        match self.route(req, state).await {
            Ok(response) => response,
            Err(e) => {
                error!("{} {} failed: {:#}", method, path, e);
                error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
            }
        }
    }

    pub async fn route(&self, req: IncomingRequest, state: AppState) -> Result<HttpResponse> {
        let method = req.method().clone();
        let path = req.uri().path().to_string();
        let mut path_known = false;

        for route in &self.routes {
            if !Self::path_matches(&route.path, &path) {
                continue;
            }
            path_known = true;
            if route.method != method {
                continue;
            }

            return match &route.kind {
                RouteKind::Open(h) => h(req, state).await,

                RouteKind::Admin(h) => {
                    let identity = resolve_identity(&req);
                    match identity {
                        Some(identity) if identity.role == Role::Admin => {
                            h(req, state, identity).await
                        }
                        Some(other) => {
                            warn!("{} {} refused for role {}", method, path, other.role);
                            deliver_error_json("Forbidden", StatusCode::FORBIDDEN)
                        }
                        None => deliver_error_json("Unauthorized", StatusCode::UNAUTHORIZED),
                    }
                }

                RouteKind::Partner(h) => {
                    let identity = resolve_identity(&req);
                    let email = match identity {
                        Some(identity) if identity.role == Role::Partner => identity.email,
                        Some(other) => {
                            warn!("{} {} refused for role {}", method, path, other.role);
                            return deliver_error_json("Forbidden", StatusCode::FORBIDDEN);
                        }
                        None => {
                            return deliver_error_json("Unauthorized", StatusCode::UNAUTHORIZED);
                        }
                    };

                    let partner = affiliates::find_affiliate_by_email(&state.db, &email)
                        .await
                        .context("Failed to look up partner")?;
                    match partner {
                        Some(partner) => h(req, state, partner).await,
                        None => {
                            warn!("No affiliate for {} on {}", email, path);
                            deliver_error_json("Partner not found", StatusCode::NOT_FOUND)
                        }
                    }
                }
            };
        }

        if path_known {
            return deliver_error_json("Method Not Allowed", StatusCode::METHOD_NOT_ALLOWED);
        }

        // No registered route matched; try the page / static file fallback.
        if method == Method::GET || method == Method::HEAD {
            if !self.page_allowed(&req, &path) {
                warn!("Page {} requested without a matching session", path);
                return deliver_error_json("Not Found", StatusCode::NOT_FOUND);
            }
            if let Some(response) = try_serve_static(&path, &state).await? {
                return Ok(response);
            }
        }

        deliver_error_json("Not Found", StatusCode::NOT_FOUND)
    }

    /// Protected pages are only served to a request the gateway forwarded
    /// with an identity of the right role; headers do not count here.
    fn page_allowed(&self, req: &IncomingRequest, path: &str) -> bool {
        match self.pages.classify(path).required_role() {
            None => true,
            Some(role) => req
                .extensions()
                .get::<Identity>()
                .is_some_and(|identity| identity.role == role),
        }
    }

    // ── Path matching ─────────────────────────────────────────────────────────

    pub fn path_matches(route_path: &str, request_path: &str) -> bool {
        // Strip query string from incoming request path before comparing.
        let clean = request_path.split('?').next().unwrap_or(request_path);

        if route_path == clean {
            return true;
        }

        // Segment-by-segment matching for `:param` wildcards.
        let route_segs: Vec<&str> = route_path.split('/').collect();
        let path_segs: Vec<&str> = clean.split('/').collect();

        if route_segs.len() != path_segs.len() {
            return false;
        }

        route_segs
            .iter()
            .zip(path_segs.iter())
            .all(|(r, p)| r.starts_with(':') || r == p)
    }
}

/// Caller identity: the gateway's typed extension, else forwarded headers.
fn resolve_identity(req: &IncomingRequest) -> Option<Identity> {
    req.extensions()
        .get::<Identity>()
        .cloned()
        .or_else(|| Identity::from_headers(req.headers()))
}

// ---------------------------------------------------------------------------
// Static file fallback
// ---------------------------------------------------------------------------

async fn try_serve_static(path: &str, state: &AppState) -> Result<Option<HttpResponse>> {
    let web_dir = Path::new(&state.config.paths.web_dir);

    for (candidate, cache) in page_candidates(web_dir, path) {
        let is_file = tokio::fs::metadata(&candidate)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false);
        if !is_file {
            continue;
        }

        debug!("Serving {} from {}", path, candidate.display());
        return deliver_file(&candidate, StatusCode::OK, cache)
            .await
            .map(Some)
            .context("Failed to deliver static file");
    }

    Ok(None)
}

// ---------------------------------------------------------------------------
// Application router
//
// Access control happens in the gateway layer before any of this runs; the
// Admin / Partner tiers only resolve who is calling.
// ---------------------------------------------------------------------------

pub fn build_router() -> Router {
    Router::new()
        // ── Public ────────────────────────────────────────────────────────────
        .get("/health", |_req, _state| async move {
            deliver_serialized_json(&serde_json::json!({ "status": "ok" }), StatusCode::OK)
        })
        .post("/api/auth/login", |req, state| async move {
            auth::handle_login(req, state).await.context("Login failed")
        })
        .post("/api/auth/signup", |req, state| async move {
            auth::handle_signup(req, state).await.context("Signup failed")
        })
        .post("/api/auth/logout", |req, state| async move {
            auth::handle_logout(req, state).await.context("Logout failed")
        })
        // ── Admin ─────────────────────────────────────────────────────────────
        .get_admin("/api/admin/stats", |_req, state, _identity| async move {
            admin::handle_stats(state).await.context("Admin stats failed")
        })
        .get_admin("/api/admin/partners", |_req, state, _identity| async move {
            admin::handle_list_partners(state)
                .await
                .context("Partner list failed")
        })
        .get_admin("/api/admin/enrollments", |_req, state, _identity| async move {
            admin::handle_list_enrollments(state)
                .await
                .context("Enrollment list failed")
        })
        .get_admin("/api/admin/transactions", |_req, state, _identity| async move {
            admin::handle_list_transactions(state)
                .await
                .context("Transaction list failed")
        })
        .get_admin("/api/admin/payouts", |_req, state, _identity| async move {
            admin::handle_pending_payouts(state)
                .await
                .context("Pending payouts failed")
        })
        .post_admin("/api/admin/payouts", |req, state, identity| async move {
            admin::handle_record_payout(req, state, identity)
                .await
                .context("Payout failed")
        })
        .post_admin("/api/admin/invite", |req, state, identity| async move {
            admin::handle_invite(req, state, identity)
                .await
                .context("Invite failed")
        })
        // ── Partner ───────────────────────────────────────────────────────────
        .get_partner("/api/partner/stats", |_req, state, partner| async move {
            partner::handle_stats(state, partner)
                .await
                .context("Partner stats failed")
        })
        .get_partner("/api/partner/enrollments", |_req, state, partner| async move {
            partner::handle_enrollments(state, partner)
                .await
                .context("Partner enrollments failed")
        })
        .get_partner("/api/partner/earnings", |_req, state, partner| async move {
            partner::handle_earnings(state, partner)
                .await
                .context("Partner earnings failed")
        })
        .get_partner("/api/partner/referrals", |_req, state, partner| async move {
            partner::handle_list_referrals(state, partner)
                .await
                .context("Referral list failed")
        })
        .post_partner("/api/partner/referrals", |req, state, partner| async move {
            partner::handle_create_referral(req, state, partner)
                .await
                .context("Referral create failed")
        })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::TokenCodec;
    use crate::database::test_pool;
    use crate::handlers::http::utils::full;
    use bytes::Bytes;
    use http_body_util::{BodyExt, Full};
    use hyper::{Request, Response};
    use shared::types::server_config::AppConfig;

    fn request(method: Method, path: &str) -> IncomingRequest {
        Request::builder()
            .method(method)
            .uri(path)
            .body(
                Full::new(Bytes::new())
                    .map_err(|never| match never {})
                    .boxed_unsync(),
            )
            .unwrap()
    }

    async fn state_with_web_dir(web_dir: &str) -> AppState {
        let mut config = AppConfig::default();
        config.paths.web_dir = web_dir.to_string();
        AppState::new(config, test_pool().await, TokenCodec::new(b"router-test-secret"))
    }

    fn as_role(mut req: IncomingRequest, role: Role) -> IncomingRequest {
        req.extensions_mut().insert(Identity {
            subject_id: "sub-1".into(),
            email: "who@example.com".into(),
            role,
            name: String::new(),
        });
        req
    }

    async fn body_string(res: HttpResponse) -> String {
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn exact_path_matches() {
        assert!(Router::path_matches("/api/admin/stats", "/api/admin/stats"));
    }

    #[test]
    fn trailing_slash_does_not_match_without_slash() {
        assert!(!Router::path_matches("/api/admin/stats", "/api/admin/stats/"));
    }

    #[test]
    fn wildcard_segment_matches() {
        assert!(Router::path_matches("/api/partner/:id", "/api/partner/42"));
        assert!(!Router::path_matches("/api/partner/:id", "/api/partner/42/x"));
    }

    #[test]
    fn query_string_stripped_before_match() {
        assert!(Router::path_matches(
            "/api/partner/referrals",
            "/api/partner/referrals?page=2"
        ));
    }

    #[test]
    fn builders_register_the_right_kinds() {
        let r = Router::new()
            .get("/a", |_req, _state| async move {
                Ok::<_, anyhow::Error>(Response::new(full("a")))
            })
            .get_admin("/b", |_req, _state, _id| async move {
                Ok::<_, anyhow::Error>(Response::new(full("b")))
            })
            .post_partner("/c", |_req, _state, _p| async move {
                Ok::<_, anyhow::Error>(Response::new(full("c")))
            });
        assert_eq!(r.routes.len(), 3);
        assert!(matches!(r.routes[0].kind, RouteKind::Open(_)));
        assert!(matches!(r.routes[1].kind, RouteKind::Admin(_)));
        assert!(matches!(r.routes[2].kind, RouteKind::Partner(_)));
        assert_eq!(r.routes[2].method, Method::POST);
    }

    #[test]
    fn application_router_registers_every_endpoint() {
        let r = build_router();
        let registered: Vec<(Method, &str)> = r
            .routes
            .iter()
            .map(|route| (route.method.clone(), route.path.as_str()))
            .collect();
        assert!(registered.contains(&(Method::GET, "/api/admin/payouts")));
        assert!(registered.contains(&(Method::POST, "/api/admin/payouts")));
        assert!(registered.contains(&(Method::POST, "/api/partner/referrals")));
        assert_eq!(registered.len(), 16);
    }

    #[tokio::test]
    async fn health_is_ok() {
        let state = state_with_web_dir("web").await;
        let res = build_router()
            .dispatch(request(Method::GET, "/health"), state)
            .await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body_string(res).await, r#"{"status":"ok"}"#);
    }

    #[tokio::test]
    async fn wrong_method_is_405() {
        let state = state_with_web_dir("web").await;
        let res = build_router()
            .dispatch(request(Method::GET, "/api/auth/login"), state)
            .await;
        assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn unknown_path_is_404_json() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_with_web_dir(dir.path().to_str().unwrap()).await;
        let res = build_router()
            .dispatch(request(Method::GET, "/nowhere"), state)
            .await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_string(res).await, r#"{"error":"Not Found"}"#);
    }

    #[tokio::test]
    async fn pages_fall_back_to_web_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<h1>home</h1>").unwrap();
        std::fs::create_dir(dir.path().join("dashboard")).unwrap();
        std::fs::write(dir.path().join("dashboard").join("index.html"), "dash").unwrap();
        let state = state_with_web_dir(dir.path().to_str().unwrap()).await;
        let router = build_router();

        let res = router.dispatch(request(Method::GET, "/"), state.clone()).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body_string(res).await, "<h1>home</h1>");

        let res = router
            .dispatch(as_role(request(Method::GET, "/dashboard"), Role::Admin), state)
            .await;
        assert_eq!(body_string(res).await, "dash");
    }

    #[tokio::test]
    async fn protected_page_files_need_a_forwarded_identity() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("dashboard.html"), "ADMIN").unwrap();
        std::fs::create_dir(dir.path().join("partner")).unwrap();
        std::fs::write(dir.path().join("partner").join("dashboard.html"), "PARTNER").unwrap();
        let state = state_with_web_dir(dir.path().to_str().unwrap()).await;
        let router = build_router();

        for path in ["/dashboard", "/dashboard.html", "//dashboard", "/partner//dashboard"] {
            let res = router
                .dispatch(request(Method::GET, path), state.clone())
                .await;
            assert_eq!(res.status(), StatusCode::NOT_FOUND, "{}", path);
        }

        // Spoofed identity headers are not an identity.
        let mut req = request(Method::GET, "/partner/dashboard.html");
        req.headers_mut().insert(
            crate::auth::gateway::HEADER_PARTNER_EMAIL,
            "p@example.com".parse().unwrap(),
        );
        let res = router.dispatch(req, state.clone()).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);

        let res = router
            .dispatch(
                as_role(request(Method::GET, "/partner/dashboard.html"), Role::Admin),
                state.clone(),
            )
            .await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);

        let res = router
            .dispatch(
                as_role(request(Method::GET, "/partner/dashboard"), Role::Partner),
                state,
            )
            .await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body_string(res).await, "PARTNER");
    }

    #[tokio::test]
    async fn admin_route_without_identity_is_401() {
        let state = state_with_web_dir("web").await;
        let res = build_router()
            .dispatch(request(Method::GET, "/api/admin/stats"), state)
            .await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn partner_route_with_unknown_email_is_404() {
        let state = state_with_web_dir("web").await;
        let mut req = request(Method::GET, "/api/partner/stats");
        req.headers_mut().insert(
            crate::auth::gateway::HEADER_PARTNER_EMAIL,
            "ghost@example.com".parse().unwrap(),
        );
        let res = build_router().dispatch(req, state).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_string(res).await, r#"{"error":"Partner not found"}"#);
    }

    #[tokio::test]
    async fn handler_error_becomes_500() {
        let state = state_with_web_dir("web").await;
        let router = Router::new().get("/boom", |_req, _state| async move {
            Err::<HttpResponse, _>(anyhow::anyhow!("boom"))
        });
        let res = router.dispatch(request(Method::GET, "/boom"), state).await;
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_string(res).await, r#"{"error":"Internal Server Error"}"#);
    }
}
