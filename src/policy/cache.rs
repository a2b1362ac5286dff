//! Client-side cache of the clearance-level table.
//!
//! One authoritative `Arc<PolicySnapshot>` lives behind a lock and is replaced
//! wholesale, never mutated in place. Reads are synchronous and never touch
//! the network. Only `refresh` (directly or after an administrative mutation)
//! and `clear` write it.
//!
//! On fetch failure the previous snapshot stays in place: permission checks
//! keep running against the last known policy instead of denying every
//! authenticated user during a network blip. This is the opposite choice from
//! the token store, which fails closed to the lowest level when a credential
//! cannot be decoded. One guards availability, the other identity.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use super::authority::PolicyAuthority;
use super::listeners::{ListenerRegistry, SnapshotListener, SubscriptionId};
use super::model::{ClearanceLevel, ClearanceLevelUpdate, FunctionId, FunctionPermission, PolicySnapshot};
use crate::error::FetchError;
use crate::storage::{KeyValueStore, CLEARANCE_LEVELS_KEY};

pub struct PolicyCache {
    authority: Arc<dyn PolicyAuthority>,
    store: Arc<dyn KeyValueStore>,
    persist: bool,
    snapshot: RwLock<Arc<PolicySnapshot>>,
    functions: RwLock<Arc<Vec<FunctionPermission>>>,
    listeners: ListenerRegistry,
    epoch: AtomicU64,
}

impl PolicyCache {
    pub fn new(authority: Arc<dyn PolicyAuthority>, store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            authority,
            store,
            persist: true,
            snapshot: RwLock::new(Arc::new(PolicySnapshot::empty())),
            functions: RwLock::new(Arc::new(Vec::new())),
            listeners: ListenerRegistry::default(),
            epoch: AtomicU64::new(0),
        }
    }

    /// Keep the snapshot in memory only.
    pub fn without_persistence(mut self) -> Self {
        self.persist = false;
        self
    }

    /// Restore the persisted table so a restart does not deny everyone until
    /// the first refresh lands. Returns whether anything was restored. A
    /// snapshot already fetched in this process is never overwritten.
    pub fn init(&self) -> bool {
        if !self.persist {
            return false;
        }
        let Some(raw) = self.store.get(CLEARANCE_LEVELS_KEY) else { return false; };
        let levels = match serde_json::from_str::<Vec<ClearanceLevel>>(&raw) {
            Ok(l) => l,
            Err(e) => {
                warn!(target: "stockgate::policy", "ignoring unreadable persisted policy table: {}", e);
                return false;
            }
        };
        let mut w = self.snapshot.write();
        if w.generation > 0 {
            return false;
        }
        debug!(target: "stockgate::policy", "restored {} clearance levels from local store", levels.len());
        *w = Arc::new(PolicySnapshot { generation: 0, levels, fetched_at: None });
        true
    }

    /// Drop every subscriber. The snapshot itself is left alone.
    pub fn dispose(&self) {
        let n = self.listeners.len();
        self.listeners.clear();
        debug!(target: "stockgate::policy", "policy cache disposed; dropped {} listeners", n);
    }

    pub fn current_snapshot(&self) -> Arc<PolicySnapshot> {
        self.snapshot.read().clone()
    }

    pub fn subscribe<L: SnapshotListener + 'static>(&self, listener: L) -> SubscriptionId {
        self.listeners.subscribe(Arc::new(listener))
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.listeners.unsubscribe(id)
    }

    pub fn subscriber_count(&self) -> usize { self.listeners.len() }

    // Generation, swap and persisted copy all happen under the write lock, so
    // the installed generation only grows and the store matches memory.
    // Subscribers run after the lock is released.
    fn install(&self, levels: Vec<ClearanceLevel>) -> Arc<PolicySnapshot> {
        let snap = {
            let mut w = self.snapshot.write();
            let generation = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
            let snap = Arc::new(PolicySnapshot { generation, levels, fetched_at: Some(chrono::Utc::now()) });
            *w = snap.clone();
            if self.persist {
                self.persist_levels(&snap.levels);
            }
            snap
        };
        self.listeners.publish(&snap);
        snap
    }

    fn persist_levels(&self, levels: &[ClearanceLevel]) {
        match serde_json::to_string(levels) {
            Ok(text) => {
                if let Err(e) = self.store.set(CLEARANCE_LEVELS_KEY, &text) {
                    warn!(target: "stockgate::policy", "could not persist policy table: {}", e);
                }
            }
            Err(e) => warn!(target: "stockgate::policy", "could not serialize policy table: {}", e),
        }
    }

    /// Fetch the whole table and swap it in. Concurrent refreshes are not
    /// ordered; whichever completes last wins.
    pub async fn refresh(&self) -> Result<Arc<PolicySnapshot>, FetchError> {
        match self.authority.fetch_levels().await {
            Ok(levels) => {
                let snap = self.install(levels);
                debug!(target: "stockgate::policy", "policy table refreshed: generation={} levels={}", snap.generation, snap.levels.len());
                Ok(snap)
            }
            Err(e) => {
                let kept = self.snapshot.read().generation;
                warn!(target: "stockgate::policy", "policy refresh failed, keeping generation {}: {}", kept, e);
                Err(e)
            }
        }
    }

    /// Empty the table and forget the persisted copy.
    pub fn clear(&self) {
        {
            let mut w = self.snapshot.write();
            *w = Arc::new(PolicySnapshot::empty());
            if let Err(e) = self.store.remove(CLEARANCE_LEVELS_KEY) {
                warn!(target: "stockgate::policy", "could not remove persisted policy table: {}", e);
            }
        }
        self.listeners.publish(&PolicySnapshot::empty());
        info!(target: "stockgate::policy", "policy cache cleared");
    }

    // ---- administrative mutations: remote write, then refresh ----

    pub async fn create_level(&self, level: &ClearanceLevel) -> Result<ClearanceLevel, FetchError> {
        let created = self.authority.create_level(level).await?;
        info!(target: "stockgate::policy", "created clearance level {} ({})", created.level, created.name);
        self.refresh().await?;
        Ok(created)
    }

    pub async fn update_level(&self, level: i32, update: &ClearanceLevelUpdate) -> Result<ClearanceLevel, FetchError> {
        let updated = self.authority.update_level(level, update).await?;
        info!(target: "stockgate::policy", "updated clearance level {}", level);
        self.refresh().await?;
        Ok(updated)
    }

    pub async fn delete_level(&self, level: i32) -> Result<(), FetchError> {
        self.authority.delete_level(level).await?;
        info!(target: "stockgate::policy", "deleted clearance level {}", level);
        self.refresh().await?;
        Ok(())
    }

    pub async fn add_function_to_level(&self, level: i32, function: &FunctionId) -> Result<(), FetchError> {
        self.authority.add_function(level, function).await?;
        info!(target: "stockgate::policy", "granted {} to level {}", function, level);
        self.refresh().await?;
        Ok(())
    }

    pub async fn remove_function_from_level(&self, level: i32, function: &FunctionId) -> Result<(), FetchError> {
        self.authority.remove_function(level, function).await?;
        info!(target: "stockgate::policy", "revoked {} from level {}", function, level);
        self.refresh().await?;
        Ok(())
    }

    // ---- function metadata (display only) ----

    pub fn functions(&self) -> Arc<Vec<FunctionPermission>> {
        self.functions.read().clone()
    }

    pub async fn refresh_functions(&self) -> Result<Arc<Vec<FunctionPermission>>, FetchError> {
        let list = Arc::new(self.authority.fetch_functions().await?);
        *self.functions.write() = list.clone();
        Ok(list)
    }

    /// Register catalog entries the authority does not know yet. Returns how
    /// many were sent.
    pub async fn ensure_functions(&self, catalog: &[FunctionPermission]) -> Result<usize, FetchError> {
        let existing = self.refresh_functions().await?;
        let missing: Vec<FunctionPermission> = catalog
            .iter()
            .filter(|f| !existing.iter().any(|e| e.id == f.id))
            .cloned()
            .collect();
        if missing.is_empty() {
            return Ok(0);
        }
        self.authority.create_functions(&missing).await?;
        info!(target: "stockgate::policy", "registered {} missing functions with the policy authority", missing.len());
        self.refresh_functions().await?;
        Ok(missing.len())
    }
}
