//! Store-related types and error definitions

use std::time::{SystemTime, UNIX_EPOCH};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// State value: arbitrary JSON-shaped data, opaque to the store.
///
/// The store performs no validation and enforces no schema; agreement on
/// shape between the component that writes a state and the components that
/// read it is the caller's responsibility.
pub type StateValue = serde_json::Value;

/// Errors surfaced by store and registry operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store already exists: {0}")]
    DuplicateName(String),

    #[error("Store not found: {0}")]
    NotFound(String),

    #[error("Event not declared at store construction: {0}")]
    UndeclaredEvent(String),

    #[error("Registry is full (max {0} stores)")]
    RegistryFull(usize),
}

/// Point-in-time view of a store, for diagnostics and host introspection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSnapshot {
    /// Store instance id
    pub id: Uuid,
    /// Creation timestamp in unix milliseconds
    pub created_at: u64,
    /// Named state values, in insertion order
    pub states: IndexMap<String, StateValue>,
    /// Declared event counters, in declaration order
    pub events: IndexMap<String, u64>,
}

/// Get current timestamp in milliseconds
pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
