/// Tower middleware module
///
/// Layers wrapped around the router, outermost first:
/// - request timeout
/// - access gateway (session cookie, role checks, identity forwarding)
pub mod tower_access_gateway;
pub mod tower_timeout_handler;

pub use tower_access_gateway::{AccessGatewayLayer, AccessGatewayService};
pub use tower_timeout_handler::{TimeoutLayer, TimeoutService};
