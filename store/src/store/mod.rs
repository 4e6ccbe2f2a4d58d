//! State store module for session-scoped shared state
//!
//! This module provides:
//! - `StateStore` holding named state values and declared event counters
//! - `StoreSnapshot` for point-in-time serializable views of a store
//! - `StoreError` covering registry and event failures

mod events;
mod store;
mod types;

pub use store::StateStore;
pub use types::{StateValue, StoreError, StoreSnapshot};
