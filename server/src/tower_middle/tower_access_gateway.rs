use hyper::{Request, Uri};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};
use tracing::{debug, warn};

use crate::HttpResponse;
use crate::auth::gateway::{AccessGateway, Decision, strip_identity_headers};
use crate::auth::policy::normalize_path;
use crate::handlers::http::utils::{error_response, redirect};

/// Tower layer that runs every request through the [`AccessGateway`]
/// before it reaches the router.
#[derive(Clone)]
pub struct AccessGatewayLayer {
    gateway: Arc<AccessGateway>,
}

impl AccessGatewayLayer {
    pub fn new(gateway: AccessGateway) -> Self {
        Self {
            gateway: Arc::new(gateway),
        }
    }
}

impl<S> Layer<S> for AccessGatewayLayer {
    type Service = AccessGatewayService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AccessGatewayService {
            inner,
            gateway: self.gateway.clone(),
        }
    }
}

/// The actual service that applies access decisions
#[derive(Clone)]
pub struct AccessGatewayService<S> {
    inner: S,
    gateway: Arc<AccessGateway>,
}

impl<S, ReqBody> Service<Request<ReqBody>> for AccessGatewayService<S>
where
    S: Service<Request<ReqBody>, Response = HttpResponse> + Clone + Send + 'static,
    S::Future: Send + 'static,
    ReqBody: Send + 'static,
{
    type Response = HttpResponse;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<ReqBody>) -> Self::Future {
        // Routing downstream sees the same spelling the decision was made on.
        let path = normalize_path(req.uri().path());
        if path != req.uri().path() {
            match with_path(req.uri(), &path) {
                Some(uri) => *req.uri_mut() = uri,
                None => debug!("Could not rewrite {} as {}", req.uri(), path),
            }
        }

        let (class, decision) = self.gateway.evaluate(&path, req.headers());

        // The clone may not be ready; keep the one that was polled.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        match decision {
            Decision::Forward => Box::pin(inner.call(req)),

            Decision::ForwardAs {
                identity,
                inject_headers,
            } => {
                debug!(
                    "Forwarding {} ({}) as {} {}",
                    path, class, identity.role, identity.email
                );
                strip_identity_headers(req.headers_mut());
                if inject_headers {
                    identity.write_headers(req.headers_mut());
                }
                req.extensions_mut().insert(identity);
                Box::pin(inner.call(req))
            }

            Decision::Redirect { location, denied } => {
                match denied {
                    Some(reason) => warn!(
                        "Denied {} ({}): {}; redirecting to {}",
                        path, class, reason, location
                    ),
                    None => debug!("Signed-in visitor on {}; redirecting to {}", path, location),
                }
                Box::pin(async move { Ok(redirect(location)) })
            }

            Decision::Reject(reason) => {
                warn!("Denied {} ({}): {}", path, class, reason);
                let response = error_response(reason.status(), reason.public_message());
                Box::pin(async move { Ok(response) })
            }
        }
    }
}

/// `uri` with its path replaced, query kept.
fn with_path(uri: &Uri, path: &str) -> Option<Uri> {
    let path_and_query = match uri.query() {
        Some(query) => format!("{}?{}", path, query),
        None => path.to_string(),
    };
    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(path_and_query.parse().ok()?);
    Uri::from_parts(parts).ok()
}
