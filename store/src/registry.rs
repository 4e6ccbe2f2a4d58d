//! Session registry: named creation and retrieval of state stores

use std::sync::{Arc, OnceLock};
use std::time::Instant;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use metrics::{counter, histogram};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::RegistryConfig;
use crate::store::{StateStore, StateValue, StoreError};

/// Registry of named state stores for one logical session.
///
/// Holds at most one store per name. Creation under an occupied name is
/// rejected without touching the existing store; retrieval hands back the
/// same `Arc` that creation returned, so every caller that looks a store up
/// by name shares one instance.
///
/// Backed by a `DashMap`, so concurrent creates and lookups from many tasks
/// are safe and the duplicate-name check is race-free. Stores live until
/// the registry (and every other `Arc` holder) drops them; there is no
/// removal API.
pub struct SessionRegistry {
    id: Uuid,
    stores: DashMap<String, Arc<StateStore>>,
    config: RegistryConfig,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            id: Uuid::new_v4(),
            stores: DashMap::new(),
            config,
        }
    }

    /// Registry instance id, used for log correlation
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Create a store under `name` and return a handle to it.
    ///
    /// Fails with [`StoreError::DuplicateName`] if the name is already
    /// taken; the existing store is left untouched and stays retrievable.
    /// Fails with [`StoreError::RegistryFull`] once the configured
    /// `max_stores` cap is reached. A taken name reports as duplicate even
    /// when the registry is full.
    pub fn create_store(
        &self,
        name: &str,
        initial_states: &[(&str, StateValue)],
        event_names: &[&str],
    ) -> Result<Arc<StateStore>, StoreError> {
        let start = Instant::now();

        // Best-effort guardrail, skipped for occupied names so a duplicate
        // reports as such even at the cap. The entry match below stays the
        // race-free authority on occupancy; both checks here run outside
        // the entry guard, which holds the shard lock.
        if !self.stores.contains_key(name) && self.stores.len() >= self.config.max_stores {
            warn!(
                "Rejected store {} in registry {}: registry is full (max {})",
                name, self.id, self.config.max_stores
            );
            counter!("statecast_store_creates_rejected_total", "reason" => "registry_full")
                .increment(1);
            return Err(StoreError::RegistryFull(self.config.max_stores));
        }

        match self.stores.entry(name.to_string()) {
            Entry::Occupied(_) => {
                warn!(
                    "Rejected store {} in registry {}: name already in use",
                    name, self.id
                );
                counter!("statecast_store_creates_rejected_total", "reason" => "duplicate_name")
                    .increment(1);
                Err(StoreError::DuplicateName(name.to_string()))
            }
            Entry::Vacant(slot) => {
                let store = Arc::new(StateStore::new(initial_states, event_names));
                slot.insert(Arc::clone(&store));

                info!("Created store {} ({}) in registry {}", name, store.id(), self.id);
                counter!("statecast_stores_created_total").increment(1);
                histogram!("statecast_store_create_duration_seconds").record(start.elapsed());

                Ok(store)
            }
        }
    }

    /// Get the store registered under `name`.
    ///
    /// Returns the same `Arc` identity that [`create_store`] produced;
    /// retrieval never copies the store. Fails with
    /// [`StoreError::NotFound`] if no store was created under that name.
    ///
    /// [`create_store`]: Self::create_store
    pub fn get_store(&self, name: &str) -> Result<Arc<StateStore>, StoreError> {
        self.stores
            .get(name)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }

    /// Whether a store is registered under `name`
    pub fn contains(&self, name: &str) -> bool {
        self.stores.contains_key(name)
    }

    /// Number of stores currently registered
    pub fn store_count(&self) -> usize {
        self.stores.len()
    }

    /// Names of all registered stores, sorted
    pub fn store_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.stores.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Process-wide default registry, lazily initialized on first use.
    ///
    /// Used by the free [`create_store`](crate::create_store) and
    /// [`get_store`](crate::get_store) functions; code that manages its own
    /// session scope should construct registries explicitly instead.
    pub fn global() -> &'static SessionRegistry {
        static GLOBAL: OnceLock<SessionRegistry> = OnceLock::new();
        GLOBAL.get_or_init(|| SessionRegistry::with_config(RegistryConfig::from_env()))
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Create a store in the process-wide default registry.
///
/// See [`SessionRegistry::create_store`].
pub fn create_store(
    name: &str,
    initial_states: &[(&str, StateValue)],
    event_names: &[&str],
) -> Result<Arc<StateStore>, StoreError> {
    SessionRegistry::global().create_store(name, initial_states, event_names)
}

/// Retrieve a store from the process-wide default registry.
///
/// See [`SessionRegistry::get_store`].
pub fn get_store(name: &str) -> Result<Arc<StateStore>, StoreError> {
    SessionRegistry::global().get_store(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn create_then_get_returns_the_same_store() {
        let registry = SessionRegistry::new();

        let created = registry
            .create_store("cart", &[("items", json!([]))], &[])
            .unwrap();
        let fetched = registry.get_store("cart").unwrap();

        assert!(Arc::ptr_eq(&created, &fetched));
        assert_eq!(registry.store_count(), 1);
        assert!(registry.contains("cart"));
    }

    #[test]
    fn duplicate_name_is_rejected_and_the_original_survives() {
        let registry = SessionRegistry::new();

        let original = registry
            .create_store("cart", &[("items", json!(["apple"]))], &[])
            .unwrap();

        let result = registry.create_store("cart", &[("items", json!([]))], &[]);
        assert!(matches!(result, Err(StoreError::DuplicateName(_))));

        // The first store is untouched and still the one registered
        let fetched = registry.get_store("cart").unwrap();
        assert!(Arc::ptr_eq(&original, &fetched));
        assert_eq!(fetched.get_state("items"), Some(json!(["apple"])));
        assert_eq!(registry.store_count(), 1);
    }

    #[test]
    fn get_before_create_is_not_found() {
        let registry = SessionRegistry::new();

        let result = registry.get_store("missing");
        assert!(matches!(result, Err(StoreError::NotFound(_))));
        assert!(!registry.contains("missing"));
    }

    #[test]
    fn full_registry_rejects_further_creates() {
        let registry = SessionRegistry::with_config(RegistryConfig { max_stores: 2 });

        registry.create_store("a", &[], &[]).unwrap();
        registry.create_store("b", &[], &[]).unwrap();

        let result = registry.create_store("c", &[], &[]);
        assert!(matches!(result, Err(StoreError::RegistryFull(2))));
        assert_eq!(registry.store_count(), 2);
    }

    #[test]
    fn duplicate_name_outranks_a_full_registry() {
        let registry = SessionRegistry::with_config(RegistryConfig { max_stores: 1 });

        let original = registry
            .create_store("only", &[("n", json!(1))], &[])
            .unwrap();

        // At the cap, a taken name still reports as duplicate
        let result = registry.create_store("only", &[], &[]);
        assert!(matches!(result, Err(StoreError::DuplicateName(_))));

        let fetched = registry.get_store("only").unwrap();
        assert!(Arc::ptr_eq(&original, &fetched));
        assert_eq!(fetched.get_state("n"), Some(json!(1)));

        // A fresh name is what the cap rejects
        assert!(matches!(
            registry.create_store("other", &[], &[]),
            Err(StoreError::RegistryFull(1))
        ));
    }

    #[test]
    fn registries_get_distinct_ids() {
        let a = SessionRegistry::new();
        let b = SessionRegistry::new();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn store_names_are_sorted() {
        let registry = SessionRegistry::new();

        registry.create_store("gamma", &[], &[]).unwrap();
        registry.create_store("alpha", &[], &[]).unwrap();
        registry.create_store("beta", &[], &[]).unwrap();

        assert_eq!(registry.store_names(), vec!["alpha", "beta", "gamma"]);
    }

    #[test]
    fn free_functions_share_one_global_registry() {
        // Unique names: the global registry is shared by every test in this
        // binary.
        let created = create_store("registry_unit_global", &[("n", json!(1))], &[]).unwrap();
        let fetched = get_store("registry_unit_global").unwrap();

        assert!(Arc::ptr_eq(&created, &fetched));
        assert!(matches!(
            create_store("registry_unit_global", &[], &[]),
            Err(StoreError::DuplicateName(_))
        ));
    }
}
