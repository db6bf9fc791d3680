//!
//! session storage port
//! --------------------
//! The session manager persists its state through the small `SessionStorage`
//! port: a synchronous, string-keyed key/value store. Two implementations ship
//! with the crate:
//!
//! - `MemoryStorage`: process-local map, used in tests and when no session file
//!   is configured.
//! - `FileStorage`: JSON snapshot on disk, rewritten on every mutation so the
//!   session survives restarts (the browser's durable local storage).
//!
//! Storage operations are total: they never return errors. Implementations that
//! can fail internally (disk I/O) log and keep serving their in-memory copy.

use std::collections::HashMap;

use parking_lot::RwLock;

mod file;

pub use file::FileStorage;

/// Persisted key layout. All of these are removed together on logout.
pub mod keys {
    pub const TOKEN: &str = "token";
    pub const REFRESH_TOKEN: &str = "refresh_token";
    pub const CURRENT_USER: &str = "currentUser";
    pub const USER_ID: &str = "userId";
    pub const USER_TYPE: &str = "userType";
    pub const CSRF_TOKEN: &str = "csrf_token";

    pub const ALL: [&str; 6] = [TOKEN, REFRESH_TOKEN, CURRENT_USER, USER_ID, USER_TYPE, CSRF_TOKEN];
}

pub trait SessionStorage: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);

    /// Write several keys. Durable implementations override this to persist once.
    fn set_many(&self, entries: &[(&str, &str)]) {
        for (k, v) in entries {
            self.set(k, v);
        }
    }

    fn remove_many(&self, keys: &[&str]) {
        for k in keys {
            self.remove(k);
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryStorage {
    map: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self { Self::default() }

    pub fn len(&self) -> usize { self.map.read().len() }

    pub fn is_empty(&self) -> bool { self.map.read().is_empty() }
}

impl SessionStorage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.map.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.map.write().insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.map.write().remove(key);
    }

    fn set_many(&self, entries: &[(&str, &str)]) {
        let mut w = self.map.write();
        for (k, v) in entries {
            w.insert(k.to_string(), v.to_string());
        }
    }

    fn remove_many(&self, keys: &[&str]) {
        let mut w = self.map.write();
        for k in keys {
            w.remove(*k);
        }
    }
}
