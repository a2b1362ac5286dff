//! The remote service owning the canonical clearance-level table.
//!
//! `PolicyAuthority` is the only seam through which the cache and the session
//! lifecycle reach the network. Implementations return boxed futures so the
//! components can hold an `Arc<dyn PolicyAuthority>`.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use futures_util::future::{self, BoxFuture};
use parking_lot::RwLock;

use super::model::{ClearanceLevel, ClearanceLevelUpdate, FunctionId, FunctionPermission};
use crate::error::{AuthError, FetchError, DEFAULT_AUTH_MESSAGE};
use crate::identity::{Claims, LoginRequest, LoginResponse};

pub trait PolicyAuthority: Send + Sync {
    /// `POST /auth/login`
    fn login<'a>(&'a self, req: &'a LoginRequest) -> BoxFuture<'a, Result<LoginResponse, AuthError>>;
    /// `GET /clearance-levels`
    fn fetch_levels(&self) -> BoxFuture<'_, Result<Vec<ClearanceLevel>, FetchError>>;
    /// `POST /clearance-levels`
    fn create_level<'a>(&'a self, level: &'a ClearanceLevel) -> BoxFuture<'a, Result<ClearanceLevel, FetchError>>;
    /// `PUT /clearance-levels/{level}`
    fn update_level<'a>(&'a self, level: i32, update: &'a ClearanceLevelUpdate) -> BoxFuture<'a, Result<ClearanceLevel, FetchError>>;
    /// `DELETE /clearance-levels/{level}`
    fn delete_level(&self, level: i32) -> BoxFuture<'_, Result<(), FetchError>>;
    /// `POST /clearance-levels/{level}/functions/{functionId}`
    fn add_function<'a>(&'a self, level: i32, function: &'a FunctionId) -> BoxFuture<'a, Result<(), FetchError>>;
    /// `DELETE /clearance-levels/{level}/functions/{functionId}`
    fn remove_function<'a>(&'a self, level: i32, function: &'a FunctionId) -> BoxFuture<'a, Result<(), FetchError>>;
    /// `GET /clearance-levels/functions`
    fn fetch_functions(&self) -> BoxFuture<'_, Result<Vec<FunctionPermission>, FetchError>>;
    /// `POST /clearance-levels/functions/batch`
    fn create_functions<'a>(&'a self, functions: &'a [FunctionPermission]) -> BoxFuture<'a, Result<(), FetchError>>;
}

struct Account {
    secret: String,
    level: i32,
}

/// In-process authority holding the table in memory. Issues unsigned
/// credentials on login. Can be switched offline to simulate an unreachable
/// authority.
pub struct MemoryAuthority {
    levels: RwLock<BTreeMap<i32, ClearanceLevel>>,
    functions: RwLock<Vec<FunctionPermission>>,
    accounts: RwLock<HashMap<String, Account>>,
    offline: AtomicBool,
    fetches: AtomicUsize,
    token_ttl_secs: i64,
}

impl Default for MemoryAuthority {
    fn default() -> Self {
        Self {
            levels: RwLock::new(BTreeMap::new()),
            functions: RwLock::new(Vec::new()),
            accounts: RwLock::new(HashMap::new()),
            offline: AtomicBool::new(false),
            fetches: AtomicUsize::new(0),
            token_ttl_secs: 60 * 60,
        }
    }
}

impl MemoryAuthority {
    pub fn new() -> Self { Self::default() }

    pub fn with_levels(levels: impl IntoIterator<Item = ClearanceLevel>) -> Self {
        let me = Self::default();
        {
            let mut m = me.levels.write();
            for l in levels { m.insert(l.level, l); }
        }
        me
    }

    pub fn add_account(&self, identity: &str, secret: &str, level: i32) {
        self.accounts.write().insert(identity.to_lowercase(), Account { secret: secret.to_string(), level });
    }

    pub fn set_offline(&self, offline: bool) { self.offline.store(offline, Ordering::SeqCst); }

    /// Number of `GET /clearance-levels` calls served so far.
    pub fn fetch_count(&self) -> usize { self.fetches.load(Ordering::SeqCst) }

    pub fn levels(&self) -> Vec<ClearanceLevel> { self.levels.read().values().cloned().collect() }

    pub fn functions(&self) -> Vec<FunctionPermission> { self.functions.read().clone() }

    fn online(&self) -> Result<(), FetchError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(FetchError::transport("connection refused"));
        }
        Ok(())
    }

    fn do_login(&self, req: &LoginRequest) -> Result<LoginResponse, AuthError> {
        self.online().map_err(|e| AuthError::Transport { message: e.to_string() })?;
        let accounts = self.accounts.read();
        let Some(acct) = accounts.get(&req.identity.to_lowercase()) else {
            return Err(AuthError::rejected(DEFAULT_AUTH_MESSAGE));
        };
        if acct.secret != req.secret {
            return Err(AuthError::rejected(DEFAULT_AUTH_MESSAGE));
        }
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: Some(req.identity.clone()),
            email: Some(req.identity.clone()),
            clearance_level: Some(acct.level),
            exp: Some(now + self.token_ttl_secs),
            iat: Some(now),
        };
        Ok(LoginResponse { access_token: claims.encode_unsigned() })
    }

    fn do_create(&self, level: &ClearanceLevel) -> Result<ClearanceLevel, FetchError> {
        self.online()?;
        let mut m = self.levels.write();
        if m.contains_key(&level.level) {
            return Err(FetchError::status(409, format!("clearance level {} already exists", level.level)));
        }
        m.insert(level.level, level.clone());
        Ok(level.clone())
    }

    fn do_update(&self, level: i32, update: &ClearanceLevelUpdate) -> Result<ClearanceLevel, FetchError> {
        self.online()?;
        let mut m = self.levels.write();
        let Some(current) = m.get(&level) else {
            return Err(FetchError::status(404, format!("clearance level {} not found", level)));
        };
        let mut entry = current.clone();
        update.apply_to(&mut entry);
        if entry.level != level && m.contains_key(&entry.level) {
            return Err(FetchError::status(409, format!("clearance level {} already exists", entry.level)));
        }
        m.remove(&level);
        m.insert(entry.level, entry.clone());
        Ok(entry)
    }

    fn do_delete(&self, level: i32) -> Result<(), FetchError> {
        self.online()?;
        match self.levels.write().remove(&level) {
            Some(_) => Ok(()),
            None => Err(FetchError::status(404, format!("clearance level {} not found", level))),
        }
    }

    fn do_toggle(&self, level: i32, function: &FunctionId, grant: bool) -> Result<(), FetchError> {
        self.online()?;
        let mut m = self.levels.write();
        let Some(entry) = m.get_mut(&level) else {
            return Err(FetchError::status(404, format!("clearance level {} not found", level)));
        };
        if grant {
            entry.allowed_functions.insert(function.clone());
        } else {
            entry.allowed_functions.remove(function);
        }
        Ok(())
    }

    fn do_create_functions(&self, functions: &[FunctionPermission]) -> Result<(), FetchError> {
        self.online()?;
        let mut existing = self.functions.write();
        for f in functions {
            if !existing.iter().any(|e| e.id == f.id) {
                existing.push(f.clone());
            }
        }
        Ok(())
    }
}

impl PolicyAuthority for MemoryAuthority {
    fn login<'a>(&'a self, req: &'a LoginRequest) -> BoxFuture<'a, Result<LoginResponse, AuthError>> {
        Box::pin(future::ready(self.do_login(req)))
    }

    fn fetch_levels(&self) -> BoxFuture<'_, Result<Vec<ClearanceLevel>, FetchError>> {
        let out = self.online().map(|_| {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            self.levels()
        });
        Box::pin(future::ready(out))
    }

    fn create_level<'a>(&'a self, level: &'a ClearanceLevel) -> BoxFuture<'a, Result<ClearanceLevel, FetchError>> {
        Box::pin(future::ready(self.do_create(level)))
    }

    fn update_level<'a>(&'a self, level: i32, update: &'a ClearanceLevelUpdate) -> BoxFuture<'a, Result<ClearanceLevel, FetchError>> {
        Box::pin(future::ready(self.do_update(level, update)))
    }

    fn delete_level(&self, level: i32) -> BoxFuture<'_, Result<(), FetchError>> {
        Box::pin(future::ready(self.do_delete(level)))
    }

    fn add_function<'a>(&'a self, level: i32, function: &'a FunctionId) -> BoxFuture<'a, Result<(), FetchError>> {
        Box::pin(future::ready(self.do_toggle(level, function, true)))
    }

    fn remove_function<'a>(&'a self, level: i32, function: &'a FunctionId) -> BoxFuture<'a, Result<(), FetchError>> {
        Box::pin(future::ready(self.do_toggle(level, function, false)))
    }

    fn fetch_functions(&self) -> BoxFuture<'_, Result<Vec<FunctionPermission>, FetchError>> {
        Box::pin(future::ready(self.online().map(|_| self.functions())))
    }

    fn create_functions<'a>(&'a self, functions: &'a [FunctionPermission]) -> BoxFuture<'a, Result<(), FetchError>> {
        Box::pin(future::ready(self.do_create_functions(functions)))
    }
}
