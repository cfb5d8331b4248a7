/// Key-value store adapter over the extension's local storage area
use std::cell::RefCell;
use std::collections::HashMap;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::Result;

pub const GROUPS_KEY: &str = "groups";
pub const SETTINGS_KEY: &str = "settings";
pub const LAST_SAVED_TABS_KEY: &str = "lastSavedTabs";
pub const RECENTLY_REMOVED_KEY: &str = "recentlyRemovedTabs";

/// Async get/set/remove over one namespaced store.
///
/// Values are whole JSON records; there is no partial update.
#[allow(async_fn_in_trait)]
pub trait KeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    async fn set(&self, key: &str, value: Value) -> Result<()>;

    async fn remove(&self, key: &str) -> Result<()>;
}

/// Read and deserialize a record, `None` when the key was never written
pub async fn load_json<S, T>(store: &S, key: &str) -> Result<Option<T>>
where
    S: KeyValueStore,
    T: DeserializeOwned,
{
    match store.get(key).await? {
        None | Some(Value::Null) => Ok(None),
        Some(value) => Ok(Some(serde_json::from_value(value)?)),
    }
}

pub async fn save_json<S, T>(store: &S, key: &str, value: &T) -> Result<()>
where
    S: KeyValueStore,
    T: Serialize,
{
    let value = serde_json::to_value(value)?;
    store.set(key, value).await
}

/// In-process store, used natively and in tests
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RefCell<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        self.entries.borrow_mut().insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}
