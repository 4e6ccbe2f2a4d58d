//! Statecast: session-scoped shared state with event signaling
//!
//! A small convenience layer for sharing state between independent parts of
//! one logical application session. A [`StateStore`] holds named state
//! values (arbitrary JSON) together with named event counters that holders
//! can trigger and subscribe to; a [`SessionRegistry`] hands out stores by
//! name so nested components reach the same instance without passing it
//! around explicitly.
//!
//! State operations are synchronous; event handlers are deferred onto the
//! Tokio runtime, firing once per trigger and never for the counter value
//! that was current when they subscribed.
//!
//! ```
//! use statecast_store::SessionRegistry;
//! use serde_json::json;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let registry = SessionRegistry::new();
//! let store = registry
//!     .create_store("filters", &[("data", json!("mtcars"))], &["data_changed"])
//!     .unwrap();
//!
//! // Any component can look the store up by name and see the same state
//! let same = registry.get_store("filters").unwrap();
//! same.set_state("data", json!("iris"));
//! assert_eq!(store.get_state("data"), Some(json!("iris")));
//!
//! store.on("data_changed", || println!("data changed")).unwrap();
//! store.trigger("data_changed").unwrap();
//! # }
//! ```

pub mod config;
pub mod registry;
pub mod store;

// Re-export commonly used types
pub use config::RegistryConfig;
pub use registry::{SessionRegistry, create_store, get_store};
pub use store::{StateStore, StateValue, StoreError, StoreSnapshot};
