//! End-to-end session flow through `Gate`: login, restart with a file-backed
//! store, logout and authority outages.

use std::sync::Arc;

use anyhow::Result;
use futures_util::future::{self, BoxFuture};
use parking_lot::Mutex;
use tempfile::tempdir;

use stockgate::notify::{Notification, NotificationKind, Notifier};
use stockgate::identity::{LoginRequest, LoginResponse};
use stockgate::policy::{catalog, ClearanceLevel, ClearanceLevelUpdate, FunctionId, FunctionPermission, MemoryAuthority, PolicyAuthority};
use stockgate::storage::{FileStore, KeyValueStore, MemoryStore, CLEARANCE_LEVELS_KEY, TOKEN_KEY};
use stockgate::{AuthError, FetchError, Gate, GateConfig};

#[derive(Default)]
struct Toasts(Mutex<Vec<Notification>>);

impl Notifier for Toasts {
    fn notify(&self, n: Notification) { self.0.lock().push(n); }
}

/// Logs users in but cannot serve the clearance-level table.
struct TableDown(Arc<MemoryAuthority>);

impl PolicyAuthority for TableDown {
    fn login<'a>(&'a self, req: &'a LoginRequest) -> BoxFuture<'a, Result<LoginResponse, AuthError>> { self.0.login(req) }
    fn fetch_levels(&self) -> BoxFuture<'_, Result<Vec<ClearanceLevel>, FetchError>> {
        Box::pin(future::ready(Err(FetchError::status(503, "maintenance"))))
    }
    fn create_level<'a>(&'a self, level: &'a ClearanceLevel) -> BoxFuture<'a, Result<ClearanceLevel, FetchError>> { self.0.create_level(level) }
    fn update_level<'a>(&'a self, level: i32, update: &'a ClearanceLevelUpdate) -> BoxFuture<'a, Result<ClearanceLevel, FetchError>> {
        self.0.update_level(level, update)
    }
    fn delete_level(&self, level: i32) -> BoxFuture<'_, Result<(), FetchError>> { self.0.delete_level(level) }
    fn add_function<'a>(&'a self, level: i32, function: &'a FunctionId) -> BoxFuture<'a, Result<(), FetchError>> { self.0.add_function(level, function) }
    fn remove_function<'a>(&'a self, level: i32, function: &'a FunctionId) -> BoxFuture<'a, Result<(), FetchError>> {
        self.0.remove_function(level, function)
    }
    fn fetch_functions(&self) -> BoxFuture<'_, Result<Vec<FunctionPermission>, FetchError>> { self.0.fetch_functions() }
    fn create_functions<'a>(&'a self, functions: &'a [FunctionPermission]) -> BoxFuture<'a, Result<(), FetchError>> {
        self.0.create_functions(functions)
    }
}

fn authority() -> Arc<MemoryAuthority> {
    let auth = Arc::new(MemoryAuthority::with_levels([
        ClearanceLevel::new(1, "Associate").with_functions([catalog::PRODUCT_VIEW, catalog::ORDER_CREATE]),
        ClearanceLevel::new(2, "Manager").with_functions([catalog::PRODUCT_VIEW, catalog::ORDER_VIEW, catalog::ORDER_MANAGE]),
    ]));
    auth.add_account("associate@shop.test", "s3cret", 1);
    auth.add_account("manager@shop.test", "s3cret", 2);
    auth
}

#[tokio::test]
async fn login_survives_restart_with_file_store() -> Result<()> {
    let tmp = tempdir()?;
    let path = tmp.path().join("state").join("local.json");
    let auth = authority();

    {
        let store = Arc::new(FileStore::open(&path)?);
        let gate = Gate::with_parts(GateConfig::default(), store, auth.clone(), Arc::new(Toasts::default()));
        gate.session().login("manager@shop.test", "s3cret").await?;
        assert!(gate.current_user_can(&FunctionId::new(catalog::ORDER_MANAGE)));
        assert_eq!(gate.tokens().user_identity().as_deref(), Some("manager@shop.test"));
    }

    // Authority unreachable after restart: the persisted table still answers.
    auth.set_offline(true);
    let store = Arc::new(FileStore::open(&path)?);
    assert!(store.get(TOKEN_KEY).is_some());
    assert!(store.get(CLEARANCE_LEVELS_KEY).is_some());
    let gate = Gate::with_parts(GateConfig::default(), store, auth.clone(), Arc::new(Toasts::default()));
    assert!(gate.session().start().await.is_err());
    assert!(gate.tokens().is_logged_in());
    assert_eq!(gate.tokens().clearance_level(), 2);
    assert!(gate.current_user_can(&FunctionId::new(catalog::ORDER_VIEW)));
    assert!(!gate.current_user_can(&FunctionId::new(catalog::ORDER_CREATE)));
    Ok(())
}

#[tokio::test]
async fn rejected_login_notifies_with_authority_message() -> Result<()> {
    let tmp = tempdir()?;
    let toasts = Arc::new(Toasts::default());
    let store = Arc::new(FileStore::open(tmp.path().join("local.json"))?);
    let gate = Gate::with_parts(GateConfig::default(), store, authority(), toasts.clone());

    let err = gate.session().login("associate@shop.test", "wrong").await.unwrap_err();
    assert!(matches!(err, AuthError::Rejected { .. }));
    assert_eq!(err.to_string(), "Invalid credentials");
    assert!(!gate.tokens().is_logged_in());

    let t = toasts.0.lock();
    assert_eq!(t.len(), 1);
    assert_eq!(t[0].kind, NotificationKind::Error);
    assert_eq!(t[0].message, "Invalid credentials");
    Ok(())
}

#[tokio::test]
async fn login_succeeds_even_when_table_fetch_fails() -> Result<()> {
    let inner = authority();
    let store = Arc::new(MemoryStore::new());
    let gate = Gate::with_parts(GateConfig::default(), store, Arc::new(TableDown(inner)), Arc::new(Toasts::default()));

    gate.session().login("associate@shop.test", "s3cret").await?;
    assert!(gate.tokens().is_logged_in());
    assert_eq!(gate.tokens().clearance_level(), 1);
    assert!(gate.cache().current_snapshot().is_empty());
    assert!(!gate.current_user_can(&FunctionId::new(catalog::PRODUCT_VIEW)));
    Ok(())
}

#[tokio::test]
async fn logout_policy_retention_is_configurable() -> Result<()> {
    let auth = authority();

    let keep = Gate::with_parts(GateConfig::default(), Arc::new(MemoryStore::new()), auth.clone(), Arc::new(Toasts::default()));
    keep.session().login("associate@shop.test", "s3cret").await?;
    keep.session().logout();
    assert!(!keep.tokens().is_logged_in());
    assert_eq!(keep.cache().current_snapshot().levels.len(), 2);
    assert!(!keep.current_user_can(&FunctionId::new(catalog::PRODUCT_VIEW)));

    let cfg = GateConfig { clear_policy_on_logout: true, ..GateConfig::default() };
    let wipe = Gate::with_parts(cfg, Arc::new(MemoryStore::new()), auth, Arc::new(Toasts::default()));
    wipe.session().login("associate@shop.test", "s3cret").await?;
    wipe.session().logout();
    assert!(wipe.cache().current_snapshot().is_empty());
    Ok(())
}

#[tokio::test]
async fn start_without_credential_only_restores() -> Result<()> {
    let auth = authority();
    let gate = Gate::with_parts(GateConfig::default(), Arc::new(MemoryStore::new()), auth.clone(), Arc::new(Toasts::default()));
    gate.session().start().await?;
    assert_eq!(auth.fetch_count(), 0);
    assert!(gate.cache().current_snapshot().is_empty());
    Ok(())
}

#[tokio::test]
async fn persist_policy_off_keeps_table_out_of_the_store() -> Result<()> {
    let tmp = tempdir()?;
    let path = tmp.path().join("local.json");
    let cfg = GateConfig { persist_policy: false, ..GateConfig::default() };
    let store = Arc::new(FileStore::open(&path)?);
    let gate = Gate::with_parts(cfg, store.clone(), authority(), Arc::new(Toasts::default()));
    gate.session().login("associate@shop.test", "s3cret").await?;
    assert_eq!(gate.cache().current_snapshot().levels.len(), 2);
    assert!(store.get(TOKEN_KEY).is_some());
    assert!(store.get(CLEARANCE_LEVELS_KEY).is_none());
    Ok(())
}

#[tokio::test]
async fn unwritable_store_fails_login_without_half_signing_in() -> Result<()> {
    let tmp = tempdir()?;
    let path = tmp.path().join("local.json");
    let store = Arc::new(FileStore::open(&path)?);
    std::fs::create_dir(path.with_extension("tmp"))?;
    let auth = authority();
    let gate = Gate::with_parts(GateConfig::default(), store.clone(), auth.clone(), Arc::new(Toasts::default()));

    let err = gate.session().login("manager@shop.test", "s3cret").await.unwrap_err();
    assert!(matches!(err, AuthError::Storage(_)));
    assert!(!gate.tokens().is_logged_in());
    assert!(store.get(TOKEN_KEY).is_none());
    assert!(FileStore::open(&path)?.get(TOKEN_KEY).is_none());
    assert_eq!(auth.fetch_count(), 0);
    Ok(())
}
