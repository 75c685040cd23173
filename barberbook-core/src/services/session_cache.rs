//! Typed JSON cache of the signed-in user

use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::domain::result::Result;
use crate::ports::KeyValueStore;

/// Storage key of the cached client (`User`)
pub const CLIENT_USER_KEY: &str = "@client_user_data";

/// Storage key of the cached barber (`AuthUser`)
pub const BARBER_USER_KEY: &str = "@user_data";

pub struct SessionCache<T> {
    store: Arc<dyn KeyValueStore>,
    key: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Serialize + DeserializeOwned> SessionCache<T> {
    pub fn new(store: Arc<dyn KeyValueStore>, key: &'static str) -> Self {
        Self {
            store,
            key,
            _marker: PhantomData,
        }
    }

    /// Cached value, if any. Unparseable content is an error.
    pub fn load(&self) -> Result<Option<T>> {
        match self.store.get_item(self.key)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    pub fn save(&self, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value)?;
        self.store.set_item(self.key, &raw)
    }

    pub fn clear(&self) -> Result<()> {
        self.store.remove_item(self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::key_value::MemoryKeyValueStore;
    use crate::domain::User;

    fn user() -> User {
        User {
            id: "u1".to_string(),
            name: "Ada".to_string(),
            phone: "+250788000000".to_string(),
            email: None,
            created_at: None,
        }
    }

    #[test]
    fn test_save_load_clear() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryKeyValueStore::new());
        let cache = SessionCache::<User>::new(store.clone(), CLIENT_USER_KEY);

        assert!(cache.load().unwrap().is_none());
        cache.save(&user()).unwrap();
        assert_eq!(cache.load().unwrap(), Some(user()));

        let raw = store.get_item(CLIENT_USER_KEY).unwrap().unwrap();
        assert!(!raw.contains("password"));

        cache.clear().unwrap();
        assert!(cache.load().unwrap().is_none());
    }

    #[test]
    fn test_corrupt_cache_is_error() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryKeyValueStore::new());
        store.set_item(CLIENT_USER_KEY, "{not json").unwrap();
        let cache = SessionCache::<User>::new(store, CLIENT_USER_KEY);
        assert!(cache.load().is_err());
    }
}
