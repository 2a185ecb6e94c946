use std::cell::RefCell;
use std::collections::HashMap;

use crate::ClientError;

/// Durable string key/value storage (browser `localStorage` in the app).
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), ClientError>;
    fn remove(&self, key: &str);

    fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(|v| v.parse::<f64>().ok())
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for &S {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ClientError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) {
        (**self).remove(key)
    }
}

/// In-memory store, used when no durable storage is available and in tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RefCell<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ClientError> {
        self.entries.borrow_mut().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) {
        self.entries.borrow_mut().remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_round_trip() {
        let store = MemoryStore::new();
        assert_eq!(store.get("missing"), None);
        store.set("wheel_last_spin", "1500.5").unwrap();
        assert_eq!(store.get_f64("wheel_last_spin"), Some(1500.5));
        store.remove("wheel_last_spin");
        assert_eq!(store.get("wheel_last_spin"), None);
    }

    #[test]
    fn test_non_numeric_value_reads_as_none() {
        let store = MemoryStore::new();
        store.set("wheel_last_spin", "soon").unwrap();
        assert_eq!(store.get_f64("wheel_last_spin"), None);
    }
}
