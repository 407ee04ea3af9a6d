use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use crate::constants::ACTIVE_ACCOUNT_KEY;

/// Session-scoped string key/value store. Nothing here outlives the session
/// and nothing is synced to the server.
#[derive(Default, Clone)]
pub struct SessionStorage {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl SessionStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.lock().get(key).cloned()
    }

    pub fn set(&self, key: &str, value: &str) {
        self.lock().insert(key.to_string(), value.to_string());
    }

    pub fn remove(&self, key: &str) {
        self.lock().remove(key);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        // a poisoned map is still a valid map of strings
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

pub trait SelectionStore: Send + Sync {
    fn read(&self) -> Option<String>;
    fn write(&self, account_id: &str);
    fn clear(&self);
}

/// The persisted active account id, stored under [`ACTIVE_ACCOUNT_KEY`].
#[derive(Clone)]
pub struct PersistedSelection {
    storage: SessionStorage,
}

impl PersistedSelection {
    pub fn new(storage: SessionStorage) -> Self {
        Self { storage }
    }
}

impl SelectionStore for PersistedSelection {
    fn read(&self) -> Option<String> {
        self.storage
            .get(ACTIVE_ACCOUNT_KEY)
            .filter(|value| !value.is_empty())
    }

    fn write(&self, account_id: &str) {
        if account_id.is_empty() {
            self.clear();
        } else {
            self.storage.set(ACTIVE_ACCOUNT_KEY, account_id);
        }
    }

    fn clear(&self) {
        self.storage.remove(ACTIVE_ACCOUNT_KEY);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_read_clear() {
        let selection = PersistedSelection::new(SessionStorage::new());
        assert_eq!(selection.read(), None);
        selection.write("acc-3");
        assert_eq!(selection.read(), Some("acc-3".to_string()));
        selection.clear();
        assert_eq!(selection.read(), None);
    }

    #[test]
    fn empty_write_clears() {
        let storage = SessionStorage::new();
        let selection = PersistedSelection::new(storage.clone());
        selection.write("acc-1");
        selection.write("");
        assert_eq!(storage.get(ACTIVE_ACCOUNT_KEY), None);
    }

    #[test]
    fn sessions_do_not_share_values() {
        let first = PersistedSelection::new(SessionStorage::new());
        let second = PersistedSelection::new(SessionStorage::new());
        first.write("acc-1");
        assert_eq!(second.read(), None);
    }
}
