use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

type ItemValue = Arc<dyn Any + Send + Sync>;

/// Request-scoped key/value bag.
///
/// Lives exactly as long as one request; clones share the same map.
#[derive(Clone, Default)]
pub struct RequestItems {
    inner: Arc<Mutex<HashMap<String, ItemValue>>>,
}

impl RequestItems {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, ItemValue>> {
        // A poisoned map still holds consistent entries; keep serving it.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn insert<V: Any + Send + Sync>(&self, key: impl Into<String>, value: V) {
        self.lock().insert(key.into(), Arc::new(value));
    }

    /// Typed lookup; `None` when absent or stored under another type.
    pub fn get<V: Any + Send + Sync + Clone>(&self, key: &str) -> Option<V> {
        self.lock()
            .get(key)
            .and_then(|v| v.downcast_ref::<V>())
            .cloned()
    }

    /// Atomic get-or-insert. `init` runs under the map lock.
    pub fn get_or_insert_with<V, F>(&self, key: &str, init: F) -> Option<V>
    where
        V: Any + Send + Sync + Clone,
        F: FnOnce() -> V,
    {
        let mut map = self.lock();
        let entry = map
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(init()) as ItemValue);
        entry.downcast_ref::<V>().cloned()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }

    /// Returns true when the key was present.
    pub fn remove(&self, key: &str) -> bool {
        self.lock().remove(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl std::fmt::Debug for RequestItems {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let keys: Vec<String> = self.lock().keys().cloned().collect();
        f.debug_struct("RequestItems").field("keys", &keys).finish()
    }
}
