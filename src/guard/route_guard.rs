use std::sync::Arc;

use tracing::{debug, info};

use super::routes::RouteTable;
use super::Navigator;
use crate::identity::TokenStore;
use crate::notify::{Notification, NotificationKind, Notifier};
use crate::policy::{FunctionId, PermissionCheck};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardConfig {
    pub login_route: String,
    /// Where a denied-but-authenticated navigation lands.
    pub denied_route: String,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self { login_route: "/login".into(), denied_route: "/login".into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    /// No valid credential.
    Unauthenticated { redirect: String },
    /// Authenticated, but the current level lacks the function.
    Denied { function: FunctionId, level: i32, redirect: String },
}

impl GuardDecision {
    pub fn is_allowed(&self) -> bool { matches!(self, GuardDecision::Allow) }
}

/// Decides every navigation attempt against the token store and whatever
/// policy snapshot is current at that moment. Never refreshes the policy.
pub struct RouteGuard {
    tokens: Arc<TokenStore>,
    checker: Arc<dyn PermissionCheck>,
    navigator: Arc<dyn Navigator>,
    notifier: Arc<dyn Notifier>,
    routes: RouteTable,
    config: GuardConfig,
}

impl RouteGuard {
    pub fn new(
        tokens: Arc<TokenStore>,
        checker: Arc<dyn PermissionCheck>,
        navigator: Arc<dyn Navigator>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self { tokens, checker, navigator, notifier, routes: RouteTable::inventory_default(), config: GuardConfig::default() }
    }

    pub fn with_routes(mut self, routes: RouteTable) -> Self {
        self.routes = routes;
        self
    }

    pub fn with_config(mut self, config: GuardConfig) -> Self {
        self.config = config;
        self
    }

    pub fn routes(&self) -> &RouteTable { &self.routes }

    /// Decision only. Reading the token may still drop an expired credential.
    pub fn evaluate(&self, required: Option<&FunctionId>) -> GuardDecision {
        if self.tokens.token().is_none() {
            return GuardDecision::Unauthenticated { redirect: self.config.login_route.clone() };
        }
        let Some(function) = required else { return GuardDecision::Allow; };
        let level = self.tokens.clearance_level();
        if self.checker.has_permission(level, function) {
            GuardDecision::Allow
        } else {
            GuardDecision::Denied { function: function.clone(), level, redirect: self.config.denied_route.clone() }
        }
    }

    /// Route-guard entry point: decide, then redirect and notify as needed.
    pub fn can_activate(&self, required: Option<&FunctionId>) -> bool {
        match self.evaluate(required) {
            GuardDecision::Allow => {
                debug!(target: "stockgate::guard", "allow required={:?}", required.map(FunctionId::as_str));
                true
            }
            GuardDecision::Unauthenticated { redirect } => {
                self.tokens.clear();
                info!(target: "stockgate::guard", "no credential; redirecting to {}", redirect);
                self.navigator.navigate(&redirect);
                false
            }
            GuardDecision::Denied { function, level, redirect } => {
                info!(target: "stockgate::guard", "deny level={} function={} redirect={}", level, function, redirect);
                self.notifier.notify(Notification::new(
                    NotificationKind::AccessDenied,
                    format!("Not allowed: clearance level {} lacks '{}'", level, function),
                ));
                self.navigator.navigate(&redirect);
                false
            }
        }
    }

    /// Guard a concrete path using the route table. Public routes pass without
    /// touching the token store; paths the table does not know carry no
    /// requirement but still need a credential.
    pub fn can_activate_path(&self, path: &str) -> bool {
        if self.routes.is_public(path) {
            debug!(target: "stockgate::guard", "allow public path {}", path);
            return true;
        }
        let required = self.routes.required_function(path).cloned();
        self.can_activate(required.as_ref())
    }
}
