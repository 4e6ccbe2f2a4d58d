//! Shared state store: named values plus declared event counters

use std::sync::RwLock;

use indexmap::IndexMap;
use metrics::counter;
use tracing::debug;
use uuid::Uuid;

use super::events::{EventChannel, spawn_dispatcher};
use super::types::{StateValue, StoreError, StoreSnapshot, now_millis};

/// Shared state container for one logical application session.
///
/// A store holds two things: named state values that any holder can read
/// and write, and named event counters that holders can trigger and
/// subscribe to. State names are open (writing an unknown name inserts
/// it); the event name set is fixed at construction and triggering or
/// subscribing to an undeclared event fails.
///
/// Stores are usually created through a [`SessionRegistry`] and shared as
/// `Arc<StateStore>`, so every component that retrieves the store by name
/// operates on the same instance and sees every mutation immediately.
///
/// State operations are synchronous and run to completion. Event handlers
/// are deferred: [`trigger`](Self::trigger) returns as soon as the new
/// counter value is published, and handlers registered with
/// [`on`](Self::on) run on the Tokio runtime, once per trigger, in
/// occurrence order.
///
/// [`SessionRegistry`]: crate::SessionRegistry
#[derive(Debug)]
pub struct StateStore {
    id: Uuid,
    created_at: u64,
    states: RwLock<IndexMap<String, StateValue>>,
    // Key set fixed at construction; the channels handle their own interior
    // mutability, so no outer lock is needed here.
    events: IndexMap<String, EventChannel>,
}

impl StateStore {
    /// Create a store from initial states and declared event names.
    ///
    /// Every entry of `initial_states` is copied into the state map (later
    /// entries win on a repeated name). Every name in `event_names` gets an
    /// event counter initialized to 0; repeated names collapse to one
    /// counter. Neither names nor values are validated.
    ///
    /// Construction has no side effects and does not require a runtime.
    pub fn new(initial_states: &[(&str, StateValue)], event_names: &[&str]) -> Self {
        let mut states = IndexMap::with_capacity(initial_states.len());
        for (name, value) in initial_states {
            states.insert((*name).to_string(), value.clone());
        }

        let mut events = IndexMap::with_capacity(event_names.len());
        for name in event_names {
            events
                .entry((*name).to_string())
                .or_insert_with(EventChannel::new);
        }

        Self {
            id: Uuid::new_v4(),
            created_at: now_millis(),
            states: RwLock::new(states),
            events,
        }
    }

    /// Store instance id, assigned at construction
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Creation timestamp in unix milliseconds
    pub fn created_at(&self) -> u64 {
        self.created_at
    }

    /// Get a clone of the value stored under `name`.
    ///
    /// Returns `None` if the name was never set; a lookup miss is silent,
    /// never an error.
    pub fn get_state(&self, name: &str) -> Option<StateValue> {
        self.states.read().unwrap().get(name).cloned()
    }

    /// Read the value stored under `name` without cloning it.
    pub fn with_state<R>(&self, name: &str, f: impl FnOnce(Option<&StateValue>) -> R) -> R {
        let states = self.states.read().unwrap();
        f(states.get(name))
    }

    /// Insert or overwrite the value stored under `name`. Always succeeds.
    pub fn set_state(&self, name: &str, value: StateValue) {
        self.states.write().unwrap().insert(name.to_string(), value);
        debug!("Set state {} in store {}", name, self.id);
    }

    /// Replace the value stored under `name` with `f(current)`.
    ///
    /// The read and the write happen under one lock, so concurrent updates
    /// to the same name cannot lose each other's changes.
    pub fn update_state(&self, name: &str, f: impl FnOnce(Option<StateValue>) -> StateValue) {
        let mut states = self.states.write().unwrap();
        let next = f(states.get(name).cloned());
        states.insert(name.to_string(), next);
        debug!("Updated state {} in store {}", name, self.id);
    }

    /// Names of all states currently set, in insertion order
    pub fn state_names(&self) -> Vec<String> {
        self.states.read().unwrap().keys().cloned().collect()
    }

    /// Number of states currently set
    pub fn state_count(&self) -> usize {
        self.states.read().unwrap().len()
    }

    /// Trigger a declared event.
    ///
    /// Increments the event's counter by 1, publishes the new value to
    /// every subscription, and returns the new counter value. Handlers do
    /// not run inside this call; they run when the runtime next polls
    /// their dispatcher tasks.
    ///
    /// Fails with [`StoreError::UndeclaredEvent`] if `event` was not among
    /// the names declared at construction.
    pub fn trigger(&self, event: &str) -> Result<u64, StoreError> {
        let channel = self
            .events
            .get(event)
            .ok_or_else(|| StoreError::UndeclaredEvent(event.to_string()))?;

        let count = channel.publish();
        counter!("statecast_events_triggered_total").increment(1);
        debug!("Triggered event {} in store {} (count {})", event, self.id, count);
        Ok(count)
    }

    /// Register `handler` to run once per subsequent trigger of `event`.
    ///
    /// The counter value current at registration time never fires the
    /// handler; only later triggers do. Multiple handlers for one event
    /// fire independently. A subscription cannot be cancelled: it lives
    /// until the store drops, at which point already-queued triggers still
    /// drain before the dispatcher retires. A handler that panics kills
    /// only its own subscription.
    ///
    /// Must be called from within a Tokio runtime; the dispatcher task is
    /// spawned onto it.
    ///
    /// Fails with [`StoreError::UndeclaredEvent`] if `event` was not among
    /// the names declared at construction.
    pub fn on<F>(&self, event: &str, handler: F) -> Result<(), StoreError>
    where
        F: FnMut() + Send + 'static,
    {
        let channel = self
            .events
            .get(event)
            .ok_or_else(|| StoreError::UndeclaredEvent(event.to_string()))?;

        let rx = channel.subscribe();
        spawn_dispatcher(event.to_string(), rx, handler);
        counter!("statecast_event_subscriptions_total").increment(1);
        debug!("Registered handler for event {} in store {}", event, self.id);
        Ok(())
    }

    /// Current counter value for a declared event
    pub fn event_count(&self, event: &str) -> Result<u64, StoreError> {
        self.events
            .get(event)
            .map(EventChannel::count)
            .ok_or_else(|| StoreError::UndeclaredEvent(event.to_string()))
    }

    /// Number of live subscriptions for a declared event
    pub fn subscriber_count(&self, event: &str) -> Result<usize, StoreError> {
        self.events
            .get(event)
            .map(EventChannel::subscriber_count)
            .ok_or_else(|| StoreError::UndeclaredEvent(event.to_string()))
    }

    /// Names of all declared events, in declaration order
    pub fn declared_events(&self) -> Vec<String> {
        self.events.keys().cloned().collect()
    }

    /// Whether `event` was declared at construction
    pub fn has_event(&self, event: &str) -> bool {
        self.events.contains_key(event)
    }

    /// Point-in-time view of all states and event counters
    pub fn snapshot(&self) -> StoreSnapshot {
        let states = self.states.read().unwrap().clone();
        let events = self
            .events
            .iter()
            .map(|(name, channel)| (name.clone(), channel.count()))
            .collect();

        StoreSnapshot {
            id: self.id,
            created_at: self.created_at,
            states,
            events,
        }
    }
}
