//! User record store
//!
//! The core only needs load/upsert/all for a single-identity keyed record;
//! `JsonStore` is the built-in implementation: an in-process map, optionally
//! persisted to a JSON file with an atomic rename on every write.

use crate::error::{Error, Result};
use crate::user::{ChatId, User};
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::NamedTempFile;

/// Record store collaborator. Read-your-writes per identity is required;
/// cross-identity consistency is not.
pub trait UserStore: Send + Sync {
    fn load(&self, chat_id: ChatId) -> Result<Option<User>>;
    fn upsert(&self, user: &User) -> Result<()>;
    fn all(&self) -> Result<Vec<User>>;
}

/// JSON-file backed store. With no path it is memory-only (records live for
/// the process lifetime).
pub struct JsonStore {
    path: Option<PathBuf>,
    data: Mutex<HashMap<ChatId, User>>,
}

impl JsonStore {
    /// Open (or create) a store at `path`, loading any existing records.
    pub fn open(path: impl Into<PathBuf>) -> Result<JsonStore> {
        let path = path.into();
        let data = if path.exists() {
            let content = fs::read_to_string(&path)?;
            serde_json::from_str(&content)?
        } else {
            HashMap::new()
        };

        Ok(JsonStore {
            path: Some(path),
            data: Mutex::new(data),
        })
    }

    /// Memory-only store, used when no store path is configured and in tests.
    pub fn in_memory() -> JsonStore {
        JsonStore {
            path: None,
            data: Mutex::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.data.lock().expect("store lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write the whole map to disk via a temp file in the same directory,
    /// then rename over the target.
    fn save(&self, data: &HashMap<ChatId, User>, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let parent = path.parent().unwrap_or(Path::new("."));
        let mut temp = NamedTempFile::new_in(parent)?;

        let json = serde_json::to_string_pretty(data)?;
        temp.write_all(json.as_bytes())?;
        temp.as_file().sync_all()?;

        temp.persist(path).map_err(|e| Error::Io(e.error))?;
        Ok(())
    }
}

impl UserStore for JsonStore {
    fn load(&self, chat_id: ChatId) -> Result<Option<User>> {
        let data = self.data.lock().expect("store lock poisoned");
        Ok(data.get(&chat_id).cloned())
    }

    fn upsert(&self, user: &User) -> Result<()> {
        let mut data = self.data.lock().expect("store lock poisoned");
        data.insert(user.chat_id, user.clone());
        if let Some(path) = &self.path {
            self.save(&data, path)?;
        }
        Ok(())
    }

    fn all(&self) -> Result<Vec<User>> {
        let data = self.data.lock().expect("store lock poisoned");
        let mut users: Vec<User> = data.values().cloned().collect();
        // Stable iteration order for the scheduler and for tests.
        users.sort_by_key(|u| u.chat_id);
        Ok(users)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::State;
    use tempfile::TempDir;

    #[test]
    fn test_in_memory_round_trip() {
        let store = JsonStore::in_memory();
        assert!(store.load(42).unwrap().is_none());

        let mut user = User::new(42);
        user.state = State::Wait;
        store.upsert(&user).unwrap();

        let loaded = store.load(42).unwrap().unwrap();
        assert_eq!(loaded.state, State::Wait);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_upsert_replaces() {
        let store = JsonStore::in_memory();
        let mut user = User::new(42);
        store.upsert(&user).unwrap();

        user.state = State::Stop;
        store.upsert(&user).unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.load(42).unwrap().unwrap().state, State::Stop);
    }

    #[test]
    fn test_persist_and_reload() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("state/users.json");

        {
            let store = JsonStore::open(&path).unwrap();
            let mut user = User::new(42);
            user.state = State::Wait;
            store.upsert(&user).unwrap();
            store.upsert(&User::new(7)).unwrap();
        }

        let store = JsonStore::open(&path).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.load(42).unwrap().unwrap().state, State::Wait);
        assert_eq!(store.load(7).unwrap().unwrap().state, State::Initial);
    }

    #[test]
    fn test_all_sorted_by_chat_id() {
        let store = JsonStore::in_memory();
        store.upsert(&User::new(9)).unwrap();
        store.upsert(&User::new(1)).unwrap();
        store.upsert(&User::new(5)).unwrap();

        let ids: Vec<i64> = store.all().unwrap().iter().map(|u| u.chat_id).collect();
        assert_eq!(ids, vec![1, 5, 9]);
    }

    #[test]
    fn test_open_missing_file_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonStore::open(temp_dir.path().join("nope.json")).unwrap();
        assert!(store.is_empty());
    }
}
