//! Key/value storage areas holding the session: a persistent one that
//! survives restarts and a session-scoped one.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use crate::error::Result;

pub const TOKEN_KEY: &str = "APP_AUTH_TOKEN";
pub const REFRESH_TOKEN_KEY: &str = "APP_REFRESH_TOKEN";
pub const KEEP_LOGGED_IN_KEY: &str = "APP_KEEP_LOGGED_IN";
pub const USER_ROLE_KEY: &str = "APP_USER_ROLE";
pub const STRUCTURE_ID_KEY: &str = "APP_USER_STRUCTURE_ID";

/// Keys written on login, removed on logout.
pub const AUTH_KEYS: [&str; 4] = [TOKEN_KEY, REFRESH_TOKEN_KEY, USER_ROLE_KEY, STRUCTURE_ID_KEY];

pub trait Storage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    // a panic while holding the guard cannot leave a map half-written
    m.lock().unwrap_or_else(|e| e.into_inner())
}

#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(lock(&self.entries).get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        lock(&self.entries).insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        lock(&self.entries).remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        lock(&self.entries).clear();
        Ok(())
    }
}

/// A JSON object on disk, rewritten on every change.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStorage {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let entries = if path.exists() {
            let raw = fs::read_to_string(&path)?;
            if raw.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&raw)?
            }
        } else {
            BTreeMap::new()
        };
        tracing::debug!("Opened storage file {} ({} keys)", path.display(), entries.len());
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    fn flush(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, serde_json::to_string_pretty(entries)?)?;
        Ok(())
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(lock(&self.entries).get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = lock(&self.entries);
        entries.insert(key.to_owned(), value.to_owned());
        self.flush(&entries)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = lock(&self.entries);
        if entries.remove(key).is_some() {
            self.flush(&entries)?;
        }
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut entries = lock(&self.entries);
        entries.clear();
        self.flush(&entries)
    }
}

/// Both storage areas of a client session.
pub struct SessionStore {
    persistent: Box<dyn Storage>,
    session: Box<dyn Storage>,
}

impl SessionStore {
    pub fn new(persistent: Box<dyn Storage>, session: Box<dyn Storage>) -> Self {
        Self {
            persistent,
            session,
        }
    }

    /// Two fresh in-memory areas.
    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryStorage::new()), Box::new(MemoryStorage::new()))
    }

    pub fn persistent(&self) -> &dyn Storage {
        self.persistent.as_ref()
    }

    pub fn session(&self) -> &dyn Storage {
        self.session.as_ref()
    }

    /// The "keep me logged in" preference, stored persistently.
    pub fn keep_logged_in(&self) -> Result<bool> {
        Ok(self.persistent.get(KEEP_LOGGED_IN_KEY)?.as_deref() == Some("true"))
    }

    pub fn set_keep_logged_in(&self, keep: bool) -> Result<()> {
        self.persistent.set(KEEP_LOGGED_IN_KEY, if keep { "true" } else { "false" })
    }

    /// Persistent area when the user asked to stay logged in, session area
    /// otherwise.
    pub fn area_for(&self, keep_logged_in: bool) -> &dyn Storage {
        if keep_logged_in {
            self.persistent()
        } else {
            self.session()
        }
    }

    /// The area auth data currently lives in, per the stored preference.
    pub fn auth_area(&self) -> Result<&dyn Storage> {
        Ok(self.area_for(self.keep_logged_in()?))
    }

    pub fn token(&self) -> Result<Option<String>> {
        self.auth_area()?.get(TOKEN_KEY)
    }

    /// Removes the auth keys from both areas. The preference survives.
    pub fn clear_auth(&self) -> Result<()> {
        for key in AUTH_KEYS {
            self.persistent.remove(key)?;
            self.session.remove(key)?;
        }
        Ok(())
    }

    /// Wipes both areas entirely.
    pub fn clear_all(&self) -> Result<()> {
        self.persistent.clear()?;
        self.session.clear()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn area_follows_keep_logged_in() {
        let store = SessionStore::in_memory();
        store.area_for(true).set(TOKEN_KEY, "p").unwrap();
        store.area_for(false).set(TOKEN_KEY, "s").unwrap();

        assert_eq!(store.persistent().get(TOKEN_KEY).unwrap().as_deref(), Some("p"));
        assert_eq!(store.session().get(TOKEN_KEY).unwrap().as_deref(), Some("s"));

        assert_eq!(store.token().unwrap().as_deref(), Some("s"));
        store.set_keep_logged_in(true).unwrap();
        assert_eq!(store.token().unwrap().as_deref(), Some("p"));
    }

    #[test]
    fn clear_auth_keeps_preference() {
        let store = SessionStore::in_memory();
        store.set_keep_logged_in(true).unwrap();
        store.persistent().set(TOKEN_KEY, "t").unwrap();
        store.session().set(USER_ROLE_KEY, "SPECTATOR").unwrap();
        store.persistent().set("unrelated", "x").unwrap();

        store.clear_auth().unwrap();

        assert!(store.keep_logged_in().unwrap());
        assert_eq!(store.persistent().get(TOKEN_KEY).unwrap(), None);
        assert_eq!(store.session().get(USER_ROLE_KEY).unwrap(), None);
        assert_eq!(store.persistent().get("unrelated").unwrap().as_deref(), Some("x"));
    }

    #[test]
    fn clear_all_wipes_everything() {
        let store = SessionStore::in_memory();
        store.set_keep_logged_in(true).unwrap();
        store.session().set("other", "y").unwrap();
        store.clear_all().unwrap();
        assert!(!store.keep_logged_in().unwrap());
        assert_eq!(store.session().get("other").unwrap(), None);
    }

    #[test]
    fn file_storage_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("persistent.json");

        let first = FileStorage::open(&path).unwrap();
        first.set(TOKEN_KEY, "abc").unwrap();
        first.set(KEEP_LOGGED_IN_KEY, "true").unwrap();
        first.remove(KEEP_LOGGED_IN_KEY).unwrap();
        drop(first);

        let second = FileStorage::open(&path).unwrap();
        assert_eq!(second.get(TOKEN_KEY).unwrap().as_deref(), Some("abc"));
        assert_eq!(second.get(KEEP_LOGGED_IN_KEY).unwrap(), None);

        second.clear().unwrap();
        let third = FileStorage::open(&path).unwrap();
        assert_eq!(third.get(TOKEN_KEY).unwrap(), None);
    }
}
