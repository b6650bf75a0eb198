//! Request-scoped state that may cross task boundaries.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

type Value = Arc<dyn Any + Send + Sync>;

/// A string-keyed map guarded by a read/write lock.
///
/// Cloning is cheap and every clone sees the same map, so a handler can move
/// a clone into a spawned task and read back what the task published:
///
/// ```rust
/// # async fn demo() {
/// use burrow::SharedState;
///
/// let state = SharedState::default();
/// let worker = state.clone();
/// tokio::spawn(async move { worker.set("rows", 42_u64) }).await.unwrap();
/// assert_eq!(state.get::<u64>("rows").as_deref(), Some(&42));
/// # }
/// ```
#[derive(Clone, Default)]
pub struct SharedState(Arc<RwLock<HashMap<String, Value>>>);

impl SharedState {
    /// Stores `value` under `key`, replacing any previous value.
    pub fn set<T: Any + Send + Sync>(&self, key: impl Into<String>, value: T) {
        self.0.write().insert(key.into(), Arc::new(value));
    }

    /// Returns the value under `key` if it exists and is a `T`.
    pub fn get<T: Any + Send + Sync>(&self, key: &str) -> Option<Arc<T>> {
        let value = Arc::clone(self.0.read().get(key)?);
        value.downcast::<T>().ok()
    }

    /// Removes `key`. Returns whether it was present.
    pub fn delete(&self, key: &str) -> bool {
        self.0.write().remove(key).is_some()
    }

    /// Whether a value is stored under `key`, whatever its type.
    pub fn contains(&self, key: &str) -> bool {
        self.0.read().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.read().is_empty()
    }
}

impl fmt::Debug for SharedState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let map = self.0.read();
        f.debug_set().entries(map.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_access() {
        let state = SharedState::default();
        state.set("user", String::from("ada"));

        assert_eq!(state.get::<String>("user").as_deref().map(String::as_str), Some("ada"));
        assert!(state.get::<u32>("user").is_none());
        assert!(state.get::<String>("missing").is_none());
        assert!(state.contains("user"));
        assert!(!state.contains("missing"));
        assert!(state.delete("user"));
        assert!(!state.contains("user"));
        assert!(!state.delete("user"));
        assert!(state.is_empty());
    }

    #[tokio::test]
    async fn clones_share_one_map() {
        let state = SharedState::default();
        let handles: Vec<_> = (0..8_u32)
            .map(|i| {
                let state = state.clone();
                tokio::spawn(async move { state.set(format!("k{i}"), i) })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(state.len(), 8);
        assert_eq!(state.get::<u32>("k3").as_deref(), Some(&3));
    }
}
