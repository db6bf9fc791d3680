use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::SessionStorage;

#[derive(Serialize, Deserialize)]
struct Snapshot {
    version: u32,
    saved_ms: i64,
    entries: BTreeMap<String, String>,
}

const SNAPSHOT_VERSION: u32 = 1;

/// Durable storage backed by a single JSON file.
///
/// Every mutation rewrites the file through a temp file plus rename, so a crash
/// mid-write leaves the previous snapshot intact.
pub struct FileStorage {
    path: PathBuf,
    map: RwLock<BTreeMap<String, String>>,
}

impl FileStorage {
    /// Open (or lazily create) the session file. A missing file starts empty;
    /// an unreadable or corrupt one is logged and also starts empty.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match Self::load(&path) {
            Ok(Some(entries)) => {
                debug!(target: "storage", "loaded session file {:?} ({} keys)", path, entries.len());
                entries
            }
            Ok(None) => BTreeMap::new(),
            Err(e) => {
                warn!(target: "storage", "ignoring unreadable session file {:?}: {}", path, e);
                BTreeMap::new()
            }
        };
        Self { path, map: RwLock::new(entries) }
    }

    pub fn path(&self) -> &Path { &self.path }

    fn load(path: &Path) -> anyhow::Result<Option<BTreeMap<String, String>>> {
        if !path.exists() { return Ok(None); }
        let bytes = std::fs::read(path)?;
        let snap: Snapshot = serde_json::from_slice(&bytes)?;
        if snap.version != SNAPSHOT_VERSION {
            anyhow::bail!("unsupported snapshot version {}", snap.version);
        }
        Ok(Some(snap.entries))
    }

    fn persist(&self, entries: &BTreeMap<String, String>) {
        if let Err(e) = self.write_snapshot(entries) {
            warn!(target: "storage", "failed to persist session file {:?}: {}", self.path, e);
        }
    }

    fn write_snapshot(&self, entries: &BTreeMap<String, String>) -> anyhow::Result<()> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() { std::fs::create_dir_all(dir)?; }
        }
        let snap = Snapshot {
            version: SNAPSHOT_VERSION,
            saved_ms: chrono::Utc::now().timestamp_millis(),
            entries: entries.clone(),
        };
        let bytes = serde_json::to_vec_pretty(&snap)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, bytes)?;
        std::fs::rename(tmp, &self.path)?;
        Ok(())
    }
}

impl SessionStorage for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.map.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.set_many(&[(key, value)]);
    }

    fn remove(&self, key: &str) {
        self.remove_many(&[key]);
    }

    fn set_many(&self, entries: &[(&str, &str)]) {
        // Hold the write lock across persist so snapshots land in mutation order
        let mut w = self.map.write();
        for (k, v) in entries {
            w.insert(k.to_string(), v.to_string());
        }
        self.persist(&w);
    }

    fn remove_many(&self, keys: &[&str]) {
        let mut w = self.map.write();
        let mut changed = false;
        for k in keys {
            changed |= w.remove(*k).is_some();
        }
        if changed { self.persist(&w); }
    }
}
