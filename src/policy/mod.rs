//! Clearance-level policy: table model, static function catalog, the remote
//! authority seam, the client-side cache and the permission evaluator.
//! Keep each concern in its own sub-module; re-export the working surface.

pub mod model;
pub mod catalog;
pub mod authority;
pub mod http;
pub mod listeners;
pub mod cache;
pub mod evaluator;

pub use model::{ClearanceLevel, ClearanceLevelUpdate, FunctionId, FunctionPermission, PolicySnapshot};
pub use authority::{MemoryAuthority, PolicyAuthority};
pub use http::HttpPolicyAuthority;
pub use listeners::{SnapshotListener, SubscriptionId};
pub use cache::PolicyCache;
pub use evaluator::{has_permission, PermissionCheck, PermissionEvaluator};
