//! Runtime configuration: defaults, then an optional JSON file, then
//! `STOCKGATE_*` environment variables.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::guard::GuardConfig;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Base URL of the policy authority, e.g. `http://localhost:3000`.
    pub api_url: String,
    /// JSON document holding the credential and the cached policy table.
    pub store_path: PathBuf,
    pub login_route: String,
    pub denied_route: String,
    pub home_route: String,
    pub clear_policy_on_logout: bool,
    pub persist_policy: bool,
    pub request_timeout_secs: u64,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:3000".into(),
            store_path: PathBuf::from(".stockgate/local.json"),
            login_route: "/login".into(),
            denied_route: "/login".into(),
            home_route: "/".into(),
            clear_policy_on_logout: false,
            persist_policy: true,
            request_timeout_secs: 30,
        }
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl GateConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    /// Apply overrides from a variable lookup. Unparseable values are logged
    /// and ignored.
    pub fn apply_overrides<F: Fn(&str) -> Option<String>>(&mut self, var: F) {
        if let Some(v) = var("STOCKGATE_API_URL") { self.api_url = v; }
        if let Some(v) = var("STOCKGATE_STORE_PATH") { self.store_path = PathBuf::from(v); }
        if let Some(v) = var("STOCKGATE_LOGIN_ROUTE") { self.login_route = v; }
        if let Some(v) = var("STOCKGATE_DENIED_ROUTE") { self.denied_route = v; }
        if let Some(v) = var("STOCKGATE_HOME_ROUTE") { self.home_route = v; }
        if let Some(v) = var("STOCKGATE_CLEAR_POLICY_ON_LOGOUT") {
            match parse_bool(&v) {
                Some(b) => self.clear_policy_on_logout = b,
                None => warn!(target: "stockgate::config", "ignoring STOCKGATE_CLEAR_POLICY_ON_LOGOUT='{}'", v),
            }
        }
        if let Some(v) = var("STOCKGATE_PERSIST_POLICY") {
            match parse_bool(&v) {
                Some(b) => self.persist_policy = b,
                None => warn!(target: "stockgate::config", "ignoring STOCKGATE_PERSIST_POLICY='{}'", v),
            }
        }
        if let Some(v) = var("STOCKGATE_REQUEST_TIMEOUT_SECS") {
            match v.trim().parse::<u64>() {
                Ok(n) if n > 0 => self.request_timeout_secs = n,
                _ => warn!(target: "stockgate::config", "ignoring STOCKGATE_REQUEST_TIMEOUT_SECS='{}'", v),
            }
        }
    }

    /// Defaults, then `file` if given, then the process environment.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let mut cfg = match file {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        cfg.apply_overrides(|k| std::env::var(k).ok());
        Ok(cfg)
    }

    pub fn request_timeout(&self) -> Duration { Duration::from_secs(self.request_timeout_secs) }

    pub fn guard_config(&self) -> GuardConfig {
        GuardConfig { login_route: self.login_route.clone(), denied_route: self.denied_route.clone() }
    }
}
