use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use crate::pattern::Pattern;
use crate::value::{State, StateValue, SubscriptionId};

/// Callback type for state change notifications.
pub type ChangeHandler = Arc<dyn Fn(&str, &StateValue) + Send + Sync>;

/// Path-addressed state store with pattern subscriptions.
///
/// - `set(path, value)` stores a value, bumps the path revision and
///   notifies every subscriber whose pattern matches.
/// - `get(path)` / `get_state::<T>()` read the current value.
/// - `subscribe(pattern, handler)` registers a change handler.
///
/// Handlers run synchronously on the writer's thread, after the write is
/// visible, and may read the store.
pub struct StateStore {
    entries: RwLock<BTreeMap<String, Entry>>,
    subscriptions: RwLock<Vec<Subscription>>,
    next_id: AtomicU64,
}

struct Entry {
    value: StateValue,
    revision: u64,
}

#[derive(Clone)]
struct Subscription {
    id: SubscriptionId,
    pattern: Arc<Pattern>,
    handler: ChangeHandler,
}

impl StateStore {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
            subscriptions: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Store a typed value at `path` and notify matching subscribers.
    pub fn set<T: std::any::Any + Send + Sync>(&self, path: &str, value: T) {
        self.set_value(path, StateValue::new(value));
    }

    /// Store a `State` value at its well-known path.
    pub fn set_state<T: State>(&self, value: T) {
        self.set(T::PATH, value);
    }

    pub fn set_value(&self, path: &str, value: StateValue) {
        {
            let mut entries = self.entries.write().unwrap();
            let entry = entries.entry(path.to_string()).or_insert_with(|| Entry {
                value: value.clone(),
                revision: 0,
            });
            entry.value = value.clone();
            entry.revision += 1;
        }

        let matching: Vec<Subscription> = self
            .subscriptions
            .read()
            .unwrap()
            .iter()
            .filter(|sub| sub.pattern.matches(path))
            .cloned()
            .collect();
        for sub in matching {
            (sub.handler)(path, &value);
        }
    }

    pub fn get(&self, path: &str) -> Option<StateValue> {
        let entries = self.entries.read().unwrap();
        entries.get(path).map(|e| e.value.clone())
    }

    /// Read a `State` value from its well-known path, cloned out.
    pub fn get_state<T: State + Clone>(&self) -> Option<T> {
        self.get(T::PATH).and_then(|v| v.cloned::<T>())
    }

    /// Number of writes seen at `path` (0 if never written).
    pub fn revision(&self, path: &str) -> u64 {
        let entries = self.entries.read().unwrap();
        entries.get(path).map(|e| e.revision).unwrap_or(0)
    }

    /// Remove the value at `path`. Does NOT notify subscribers.
    pub fn remove(&self, path: &str) -> Option<StateValue> {
        let mut entries = self.entries.write().unwrap();
        entries.remove(path).map(|e| e.value)
    }

    /// All entries strictly below `prefix`, ordered by path.
    pub fn scan(&self, prefix: &str) -> Vec<(String, StateValue)> {
        let entries = self.entries.read().unwrap();
        let scan_prefix = format!("{}/", prefix);
        entries
            .range(scan_prefix.clone()..)
            .take_while(|(k, _)| k.starts_with(&scan_prefix))
            .map(|(k, e)| (k.clone(), e.value.clone()))
            .collect()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.read().unwrap().contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Subscribe to writes on paths matching `pattern` (see [`Pattern`]).
    pub fn subscribe<F>(&self, pattern: &str, handler: F) -> SubscriptionId
    where
        F: Fn(&str, &StateValue) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscriptions.write().unwrap().push(Subscription {
            id,
            pattern: Arc::new(Pattern::parse(pattern)),
            handler: Arc::new(handler),
        });
        tracing::trace!(pattern, id = id.0, "subscribed");
        id
    }

    /// Remove a subscription. Returns false if the id was unknown.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subs = self.subscriptions.write().unwrap();
        let before = subs.len();
        subs.retain(|sub| sub.id != id);
        subs.len() < before
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscriptions.read().unwrap().len()
    }
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}
