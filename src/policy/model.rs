use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Capability string of the form `<category>:<action>`, e.g. `product:edit`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FunctionId(String);

impl FunctionId {
    /// Wrap without checking the format.
    pub fn new(id: impl Into<String>) -> Self { FunctionId(id.into()) }

    /// Wrap only well-formed `<category>:<action>` ids.
    pub fn parse(id: &str) -> Option<Self> {
        let (cat, act) = id.split_once(':')?;
        if cat.is_empty() || act.is_empty() || act.contains(':') {
            return None;
        }
        Some(FunctionId(id.to_string()))
    }

    pub fn as_str(&self) -> &str { &self.0 }

    pub fn category(&self) -> Option<&str> { self.0.split_once(':').map(|(c, _)| c) }

    pub fn action(&self) -> Option<&str> { self.0.split_once(':').map(|(_, a)| a) }

    pub fn is_empty(&self) -> bool { self.0.is_empty() }
}

impl fmt::Display for FunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.pad(&self.0) }
}

impl From<&str> for FunctionId {
    fn from(s: &str) -> Self { FunctionId::new(s) }
}

impl From<String> for FunctionId {
    fn from(s: String) -> Self { FunctionId(s) }
}

/// One privilege tier and the functions it may perform. Tiers do not inherit
/// from one another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearanceLevel {
    pub level: i32,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub allowed_functions: BTreeSet<FunctionId>,
}

impl ClearanceLevel {
    pub fn new(level: i32, name: impl Into<String>) -> Self {
        Self { level, name: name.into(), description: None, allowed_functions: BTreeSet::new() }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_functions<I, F>(mut self, functions: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<FunctionId>,
    {
        self.allowed_functions.extend(functions.into_iter().map(Into::into));
        self
    }

    pub fn allows(&self, function: &FunctionId) -> bool { self.allowed_functions.contains(function) }
}

/// Partial body for `PUT /clearance-levels/{level}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearanceLevelUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_functions: Option<BTreeSet<FunctionId>>,
}

impl ClearanceLevelUpdate {
    /// Apply onto an existing entry. A `level` change re-keys the entry.
    pub fn apply_to(&self, target: &mut ClearanceLevel) {
        if let Some(l) = self.level { target.level = l; }
        if let Some(n) = &self.name { target.name = n.clone(); }
        if let Some(d) = &self.description { target.description = Some(d.clone()); }
        if let Some(f) = &self.allowed_functions { target.allowed_functions = f.clone(); }
    }
}

/// Descriptive metadata for a function; display only, never consulted when
/// deciding access.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionPermission {
    pub id: FunctionId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub category: String,
}

/// Immutable point-in-time copy of the whole policy table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicySnapshot {
    /// 0 until the first successful fetch in this process.
    pub generation: u64,
    pub levels: Vec<ClearanceLevel>,
    pub fetched_at: Option<DateTime<Utc>>,
}

impl PolicySnapshot {
    pub fn empty() -> Self { Self::default() }

    pub fn is_empty(&self) -> bool { self.levels.is_empty() }

    pub fn level(&self, level: i32) -> Option<&ClearanceLevel> {
        self.levels.iter().find(|e| e.level == level)
    }

    /// Same table, regardless of when or how often it was fetched.
    pub fn same_table(&self, other: &PolicySnapshot) -> bool { self.levels == other.levels }
}
