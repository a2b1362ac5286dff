//! Navigation guard and conditional render gate. Both read the token store
//! and a permission checker synchronously; neither waits on I/O.

mod routes;
mod route_guard;
mod render;

pub use routes::{RouteSpec, RouteTable};
pub use route_guard::{GuardConfig, GuardDecision, RouteGuard};
pub use render::{PermissionGate, ViewContainer};

/// Router hook used for redirects.
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: &str);
}
