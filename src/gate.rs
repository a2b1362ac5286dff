//! Explicit wiring of the authorization components. One `Gate` per
//! application instance; every component gets its collaborators by `Arc`.

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::config::GateConfig;
use crate::guard::{Navigator, PermissionGate, RouteGuard, RouteTable, ViewContainer};
use crate::identity::{SessionLifecycle, TokenStore};
use crate::notify::Notifier;
use crate::policy::{FunctionId, HttpPolicyAuthority, PermissionEvaluator, PolicyAuthority, PolicyCache};
use crate::storage::{FileStore, KeyValueStore};

pub struct Gate {
    config: GateConfig,
    tokens: Arc<TokenStore>,
    cache: Arc<PolicyCache>,
    evaluator: Arc<PermissionEvaluator>,
    session: SessionLifecycle,
    notifier: Arc<dyn Notifier>,
}

impl Gate {
    /// File-backed store and HTTP authority, as configured.
    pub fn from_config(config: GateConfig, notifier: Arc<dyn Notifier>) -> Result<Self> {
        let store: Arc<dyn KeyValueStore> = Arc::new(
            FileStore::open(&config.store_path)
                .with_context(|| format!("opening local store {}", config.store_path.display()))?,
        );
        let tokens = Arc::new(TokenStore::new(store.clone()));
        let authority = HttpPolicyAuthority::new(&config.api_url, config.request_timeout())?.with_tokens(tokens.clone());
        Ok(Self::assemble(config, store, tokens, Arc::new(authority), notifier))
    }

    /// Any store and authority; used for embedding and tests.
    pub fn with_parts(
        config: GateConfig,
        store: Arc<dyn KeyValueStore>,
        authority: Arc<dyn PolicyAuthority>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let tokens = Arc::new(TokenStore::new(store.clone()));
        Self::assemble(config, store, tokens, authority, notifier)
    }

    fn assemble(
        config: GateConfig,
        store: Arc<dyn KeyValueStore>,
        tokens: Arc<TokenStore>,
        authority: Arc<dyn PolicyAuthority>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let mut cache = PolicyCache::new(authority.clone(), store);
        if !config.persist_policy {
            cache = cache.without_persistence();
        }
        let cache = Arc::new(cache);
        let evaluator = Arc::new(PermissionEvaluator::new(cache.clone()));
        let session = SessionLifecycle::new(authority, tokens.clone(), cache.clone())
            .with_notifier(notifier.clone())
            .clear_policy_on_logout(config.clear_policy_on_logout);
        Self { config, tokens, cache, evaluator, session, notifier }
    }

    /// Send the user to `home_route` after each successful login.
    pub fn with_navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.session = self.session.with_landing(navigator, self.config.home_route.clone());
        self
    }

    pub fn config(&self) -> &GateConfig { &self.config }
    pub fn tokens(&self) -> &Arc<TokenStore> { &self.tokens }
    pub fn cache(&self) -> &Arc<PolicyCache> { &self.cache }
    pub fn evaluator(&self) -> &Arc<PermissionEvaluator> { &self.evaluator }
    pub fn session(&self) -> &SessionLifecycle { &self.session }

    pub fn route_guard(&self, navigator: Arc<dyn Navigator>, routes: RouteTable) -> RouteGuard {
        RouteGuard::new(self.tokens.clone(), self.evaluator.clone(), navigator, self.notifier.clone())
            .with_routes(routes)
            .with_config(self.config.guard_config())
    }

    pub fn permission_gate<V: ViewContainer>(&self, view: V) -> PermissionGate<V> {
        PermissionGate::new(view, self.tokens.clone(), self.evaluator.clone())
    }

    /// Imperative check for the current user, e.g. before submitting an order.
    pub fn current_user_can(&self, function: &FunctionId) -> bool {
        self.tokens.is_logged_in() && self.evaluator.has_permission(self.tokens.clearance_level(), function)
    }

    /// Drop cache subscribers when the application shuts down.
    pub fn dispose(&self) { self.cache.dispose(); }
}
