use std::sync::Arc;

use tracing::{debug, warn};

use super::claims::{decode_valid, Claims};
use crate::error::StorageError;
use crate::storage::{KeyValueStore, TOKEN_KEY};

/// Level reported whenever there is no usable credential.
pub const LOWEST_LEVEL: i32 = 0;

/// Owner of the persisted bearer credential.
///
/// Every read re-validates the stored credential: a malformed or expired one is
/// removed and reported as absent. Nothing here performs network I/O.
pub struct TokenStore {
    store: Arc<dyn KeyValueStore>,
}

impl TokenStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self { Self { store } }

    /// Persist the credential as-is.
    pub fn set_token(&self, raw: &str) -> Result<(), StorageError> {
        self.store.set(TOKEN_KEY, raw)
    }

    fn current(&self) -> Option<(String, Claims)> {
        let raw = self.store.get(TOKEN_KEY)?;
        let now_ms = chrono::Utc::now().timestamp_millis();
        match decode_valid(&raw, now_ms) {
            Ok(claims) => Some((raw, claims)),
            Err(e) => {
                debug!(target: "stockgate::token", "discarding stored credential: {}", e);
                self.clear();
                None
            }
        }
    }

    pub fn token(&self) -> Option<String> {
        self.current().map(|(raw, _)| raw)
    }

    pub fn claims(&self) -> Option<Claims> {
        self.current().map(|(_, c)| c)
    }

    /// Fails closed: any absence or decode problem yields [`LOWEST_LEVEL`].
    pub fn clearance_level(&self) -> i32 {
        self.claims().and_then(|c| c.clearance_level).unwrap_or(LOWEST_LEVEL)
    }

    /// `email` claim, falling back to `sub`.
    pub fn user_identity(&self) -> Option<String> {
        self.claims().and_then(|c| c.identity().map(str::to_string))
    }

    pub fn is_logged_in(&self) -> bool { self.token().is_some() }

    /// `Authorization` header value for authority requests.
    pub fn bearer_header(&self) -> Option<String> {
        self.token().map(|t| format!("Bearer {}", t))
    }

    pub fn clear(&self) {
        if let Err(e) = self.store.remove(TOKEN_KEY) {
            warn!(target: "stockgate::token", "failed to remove stored credential: {}", e);
        }
    }
}
