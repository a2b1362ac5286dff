use std::sync::Arc;

use crate::identity::TokenStore;
use crate::policy::{FunctionId, PermissionCheck};

/// The fragment a [`PermissionGate`] shows or hides.
pub trait ViewContainer {
    fn create_view(&mut self);
    fn clear(&mut self);
}

/// Renders its fragment only while the current clearance level holds the bound
/// function. Re-evaluated on `init` and whenever the bound function changes;
/// policy updates take effect on the next remount.
pub struct PermissionGate<V: ViewContainer> {
    view: V,
    function: Option<FunctionId>,
    has_view: bool,
    tokens: Arc<TokenStore>,
    checker: Arc<dyn PermissionCheck>,
}

impl<V: ViewContainer> PermissionGate<V> {
    pub fn new(view: V, tokens: Arc<TokenStore>, checker: Arc<dyn PermissionCheck>) -> Self {
        Self { view, function: None, has_view: false, tokens, checker }
    }

    pub fn init(&mut self) { self.update_view(); }

    /// Bind a new function id (the `appHasPermission` input).
    pub fn set_function(&mut self, function: impl Into<FunctionId>) {
        self.function = Some(function.into());
        self.update_view();
    }

    pub fn is_rendered(&self) -> bool { self.has_view }

    pub fn view(&self) -> &V { &self.view }

    fn update_view(&mut self) {
        let Some(function) = self.function.as_ref().filter(|f| !f.is_empty()) else {
            self.view.clear();
            self.has_view = false;
            return;
        };
        let allowed = self.checker.has_permission(self.tokens.clearance_level(), function);
        if allowed && !self.has_view {
            self.view.create_view();
            self.has_view = true;
        } else if !allowed && self.has_view {
            self.view.clear();
            self.has_view = false;
        }
    }
}
