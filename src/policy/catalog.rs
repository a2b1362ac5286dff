//! Static catalog of the functions the front-end gates on.

use super::model::{FunctionId, FunctionPermission};

pub const PRODUCT_VIEW: &str = "product:view";
pub const PRODUCT_CREATE: &str = "product:create";
pub const PRODUCT_EDIT: &str = "product:edit";
pub const PRODUCT_DELETE: &str = "product:delete";
pub const PRODUCT_SCAN: &str = "product:scan";

pub const ORDER_VIEW: &str = "order:view";
pub const ORDER_CREATE: &str = "order:create";
pub const ORDER_MANAGE: &str = "order:manage";
pub const ORDER_INVOICE: &str = "order:invoice";

pub const USER_VIEW: &str = "user:view";
pub const USER_CREATE: &str = "user:create";
pub const USER_EDIT: &str = "user:edit";
pub const USER_DISABLE: &str = "user:disable";

pub const REPORT_VIEW: &str = "report:view";
pub const REPORT_EXPORT: &str = "report:export";

pub const ADMIN_CLEARANCE_LEVELS: &str = "admin:clearance-levels";

pub const PRODUCT_FUNCTIONS: &[&str] = &[PRODUCT_VIEW, PRODUCT_CREATE, PRODUCT_EDIT, PRODUCT_DELETE, PRODUCT_SCAN];
pub const ORDER_FUNCTIONS: &[&str] = &[ORDER_VIEW, ORDER_CREATE, ORDER_MANAGE, ORDER_INVOICE];
pub const USER_FUNCTIONS: &[&str] = &[USER_VIEW, USER_CREATE, USER_EDIT, USER_DISABLE];
pub const REPORT_FUNCTIONS: &[&str] = &[REPORT_VIEW, REPORT_EXPORT];
pub const ADMIN_FUNCTIONS: &[&str] = &[ADMIN_CLEARANCE_LEVELS];

pub fn all_functions() -> impl Iterator<Item = FunctionId> {
    [PRODUCT_FUNCTIONS, ORDER_FUNCTIONS, USER_FUNCTIONS, REPORT_FUNCTIONS, ADMIN_FUNCTIONS]
        .into_iter()
        .flatten()
        .map(|s| FunctionId::new(*s))
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `product:edit` -> `{name: "Edit Product", category: "Product",
/// description: "Permission to edit products"}`.
pub fn describe(id: &FunctionId) -> FunctionPermission {
    let (cat, act) = id.as_str().split_once(':').unwrap_or((id.as_str(), ""));
    let category = capitalize(cat);
    FunctionPermission {
        id: id.clone(),
        name: format!("{} {}", capitalize(act), category).trim().to_string(),
        description: Some(format!("Permission to {} {}s", act, cat)),
        category,
    }
}

pub fn catalog_permissions() -> Vec<FunctionPermission> {
    all_functions().map(|f| describe(&f)).collect()
}
