//! Permission evaluation over the cached policy table.
//! Pure and synchronous; safe to call from navigation and render paths.

use std::collections::BTreeSet;
use std::sync::Arc;

use super::cache::PolicyCache;
use super::model::{ClearanceLevel, FunctionId};

/// `true` iff an entry for `level` exists and lists `function`.
pub fn has_permission(levels: &[ClearanceLevel], level: i32, function: &FunctionId) -> bool {
    levels.iter().any(|e| e.level == level && e.allows(function))
}

/// Anything that can answer "may this level perform this function".
pub trait PermissionCheck: Send + Sync {
    fn has_permission(&self, level: i32, function: &FunctionId) -> bool;
}

#[derive(Clone)]
pub struct PermissionEvaluator {
    cache: Arc<PolicyCache>,
}

impl PermissionEvaluator {
    pub fn new(cache: Arc<PolicyCache>) -> Self { Self { cache } }

    pub fn has_permission(&self, level: i32, function: &FunctionId) -> bool {
        has_permission(&self.cache.current_snapshot().levels, level, function)
    }

    /// Functions granted to `level`; empty when the level is unknown.
    pub fn allowed_functions(&self, level: i32) -> BTreeSet<FunctionId> {
        self.cache
            .current_snapshot()
            .level(level)
            .map(|e| e.allowed_functions.clone())
            .unwrap_or_default()
    }
}

impl PermissionCheck for PermissionEvaluator {
    fn has_permission(&self, level: i32, function: &FunctionId) -> bool {
        PermissionEvaluator::has_permission(self, level, function)
    }
}
