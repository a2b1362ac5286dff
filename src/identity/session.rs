use std::sync::Arc;

use tracing::{info, warn};

use super::provider::LoginRequest;
use super::token_store::TokenStore;
use crate::error::{AuthError, FetchError};
use crate::guard::Navigator;
use crate::notify::{Notification, NotificationKind, Notifier};
use crate::policy::{PolicyAuthority, PolicyCache};

/// Login / logout / start-up orchestration over the token store and the
/// policy cache.
pub struct SessionLifecycle {
    authority: Arc<dyn PolicyAuthority>,
    tokens: Arc<TokenStore>,
    cache: Arc<PolicyCache>,
    notifier: Option<Arc<dyn Notifier>>,
    /// Where a successful login lands.
    landing: Option<(Arc<dyn Navigator>, String)>,
    /// Also wipe the policy table on logout. Off by default: the table is not
    /// user specific and stays warm for the next login.
    clear_policy_on_logout: bool,
}

impl SessionLifecycle {
    pub fn new(authority: Arc<dyn PolicyAuthority>, tokens: Arc<TokenStore>, cache: Arc<PolicyCache>) -> Self {
        Self { authority, tokens, cache, notifier: None, landing: None, clear_policy_on_logout: false }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn with_landing(mut self, navigator: Arc<dyn Navigator>, route: impl Into<String>) -> Self {
        self.landing = Some((navigator, route.into()));
        self
    }

    pub fn clear_policy_on_logout(mut self, yes: bool) -> Self {
        self.clear_policy_on_logout = yes;
        self
    }

    pub fn tokens(&self) -> &Arc<TokenStore> { &self.tokens }

    pub fn cache(&self) -> &Arc<PolicyCache> { &self.cache }

    /// Application start-up: restore the persisted table, then refresh it when
    /// a valid credential is already present.
    pub async fn start(&self) -> Result<(), FetchError> {
        let restored = self.cache.init();
        if !self.tokens.is_logged_in() {
            info!(target: "stockgate::session", "start: no credential (restored_table={})", restored);
            return Ok(());
        }
        self.cache.refresh().await?;
        info!(target: "stockgate::session", "start: resumed session for {:?}", self.tokens.user_identity());
        Ok(())
    }

    /// On rejection the token store is untouched and the authority's message
    /// is returned as-is. A policy refresh failure after a successful login
    /// does not fail the login; the cache keeps its last good table.
    pub async fn login(&self, identity: &str, secret: &str) -> Result<(), AuthError> {
        let req = LoginRequest::new(identity, secret);
        let resp = match self.authority.login(&req).await {
            Ok(r) => r,
            Err(e) => {
                warn!(target: "stockgate::session", "login failed for {}: {}", identity, e);
                if let Some(n) = &self.notifier {
                    n.notify(Notification::new(NotificationKind::Error, e.user_message()));
                }
                return Err(e);
            }
        };
        self.tokens.set_token(&resp.access_token)?;
        info!(target: "stockgate::session", "login ok user={} level={}", identity, self.tokens.clearance_level());
        if let Err(e) = self.cache.refresh().await {
            warn!(target: "stockgate::session", "policy refresh after login failed: {}", e);
        }
        if let Some((nav, route)) = &self.landing {
            nav.navigate(route);
        }
        Ok(())
    }

    pub fn logout(&self) {
        let who = self.tokens.user_identity();
        self.tokens.clear();
        if self.clear_policy_on_logout {
            self.cache.clear();
        }
        info!(target: "stockgate::session", "logout user={:?} policy_cleared={}", who, self.clear_policy_on_logout);
    }
}
