use serde::{Deserialize, Serialize};

use crate::policy::catalog;
use crate::policy::FunctionId;

/// One navigable path and the function it requires, if any.
/// `:name` segments match any single non-empty segment. A `public` route is
/// not guarded at all; every other route needs a valid credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteSpec {
    pub pattern: String,
    #[serde(default)]
    pub required_function: Option<FunctionId>,
    #[serde(default)]
    pub public: bool,
}

impl RouteSpec {
    /// Reachable without a credential, e.g. the login page.
    pub fn public(pattern: &str) -> Self {
        Self { pattern: pattern.to_string(), required_function: None, public: true }
    }

    /// Any signed-in user.
    pub fn authenticated(pattern: &str) -> Self {
        Self { pattern: pattern.to_string(), required_function: None, public: false }
    }

    pub fn guarded(pattern: &str, function: &str) -> Self {
        Self { pattern: pattern.to_string(), required_function: Some(FunctionId::new(function)), public: false }
    }

    fn matches(&self, segments: &[&str]) -> bool {
        let pat = split_path(&self.pattern);
        pat.len() == segments.len()
            && pat.iter().zip(segments).all(|(p, s)| p.starts_with(':') || p == s)
    }
}

fn split_path(path: &str) -> Vec<&str> {
    let path = path.split(['?', '#']).next().unwrap_or("");
    path.split('/').filter(|s| !s.is_empty()).collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteTable {
    routes: Vec<RouteSpec>,
}

impl RouteTable {
    pub fn new(routes: Vec<RouteSpec>) -> Self { Self { routes } }

    /// The inventory front-end's routes.
    pub fn inventory_default() -> Self {
        Self::new(vec![
            RouteSpec::guarded("", catalog::PRODUCT_VIEW),
            RouteSpec::guarded("add", catalog::PRODUCT_CREATE),
            RouteSpec::guarded("add/:id", catalog::PRODUCT_EDIT),
            RouteSpec::public("login"),
            RouteSpec::guarded("register", catalog::USER_CREATE),
            RouteSpec::guarded("users", catalog::USER_VIEW),
            RouteSpec::guarded("barcode", catalog::PRODUCT_SCAN),
            RouteSpec::guarded("charts", catalog::REPORT_VIEW),
            RouteSpec::guarded("orders", catalog::ORDER_VIEW),
            RouteSpec::guarded("invoice", catalog::ORDER_INVOICE),
            RouteSpec::guarded("clearance-levels", catalog::ADMIN_CLEARANCE_LEVELS),
        ])
    }

    pub fn routes(&self) -> &[RouteSpec] { &self.routes }

    /// First declared route matching `path`.
    pub fn resolve(&self, path: &str) -> Option<&RouteSpec> {
        let segments = split_path(path);
        self.routes.iter().find(|r| r.matches(&segments))
    }

    /// Whether `path` resolves to a route that skips the guard.
    pub fn is_public(&self, path: &str) -> bool {
        self.resolve(path).is_some_and(|r| r.public)
    }

    /// Function required by `path`; `None` for public, login-only or unknown paths.
    pub fn required_function(&self, path: &str) -> Option<&FunctionId> {
        self.resolve(path).and_then(|r| r.required_function.as_ref())
    }
}
