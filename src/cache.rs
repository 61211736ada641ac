//! Local single-user cache.
//!
//! A one-table key/value store backed by SQLite. Unauthenticated sessions
//! persist their single map here; authenticated sessions use it for the
//! "last opened" pointer, the cached credential, and the UI toggles, all of
//! which survive across restarts.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use rusqlite::{Connection, OptionalExtension};

use crate::error::MapResult;

/// Slot holding the serialized tree of an unauthenticated session.
pub const MAP_SLOT_KEY: &str = "map_state";
/// Key of the map to resume on next start.
pub const LAST_OPENED_KEY: &str = "last_opened_map";
/// Cached bearer credential.
pub const TOKEN_KEY: &str = "auth_token";
/// Emoji annotations requested from the expansion service.
pub const EMOJIS_KEY: &str = "emojis_enabled";
/// Focus-mode toggle.
pub const FOCUS_KEY: &str = "focus_mode";

#[derive(Clone)]
pub struct LocalCache {
    conn: Arc<Mutex<Connection>>,
}

impl LocalCache {
    pub fn open(path: PathBuf) -> MapResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(&path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Self::init(conn)
    }

    pub fn open_default() -> MapResult<Self> {
        let dirs = directories::ProjectDirs::from("", "", "mindgraph").ok_or_else(|| {
            std::io::Error::other("could not determine a data directory")
        })?;
        Self::open(dirs.data_dir().join("cache.db"))
    }

    pub fn open_memory() -> MapResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> MapResult<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            [],
        )?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn get(&self, key: &str) -> MapResult<Option<String>> {
        let conn = self.conn.lock().expect("cache lock poisoned");
        let value = conn
            .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    pub fn set(&self, key: &str, value: &str) -> MapResult<()> {
        let conn = self.conn.lock().expect("cache lock poisoned");
        conn.execute(
            "INSERT INTO kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            [key, value],
        )?;
        Ok(())
    }

    pub fn remove(&self, key: &str) -> MapResult<()> {
        let conn = self.conn.lock().expect("cache lock poisoned");
        conn.execute("DELETE FROM kv WHERE key = ?1", [key])?;
        Ok(())
    }

    pub fn get_flag(&self, key: &str) -> MapResult<bool> {
        Ok(matches!(self.get(key)?.as_deref(), Some("1") | Some("true")))
    }

    pub fn set_flag(&self, key: &str, value: bool) -> MapResult<()> {
        self.set(key, if value { "1" } else { "0" })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_remove_round_trip() {
        let cache = LocalCache::open_memory().expect("open");
        assert_eq!(cache.get("k").expect("get"), None);

        cache.set("k", "v1").expect("set");
        assert_eq!(cache.get("k").expect("get").as_deref(), Some("v1"));

        cache.set("k", "v2").expect("overwrite");
        assert_eq!(cache.get("k").expect("get").as_deref(), Some("v2"));

        cache.remove("k").expect("remove");
        assert_eq!(cache.get("k").expect("get"), None);
    }

    #[test]
    fn flags_default_to_false() {
        let cache = LocalCache::open_memory().expect("open");
        assert!(!cache.get_flag(EMOJIS_KEY).expect("flag"));
        cache.set_flag(EMOJIS_KEY, true).expect("set");
        assert!(cache.get_flag(EMOJIS_KEY).expect("flag"));
    }

    #[test]
    fn survives_reopen_on_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("cache.db");

        let cache = LocalCache::open(path.clone()).expect("open");
        cache.set(LAST_OPENED_KEY, "map-7").expect("set");
        drop(cache);

        let reopened = LocalCache::open(path).expect("reopen");
        assert_eq!(
            reopened.get(LAST_OPENED_KEY).expect("get").as_deref(),
            Some("map-7")
        );
    }
}
