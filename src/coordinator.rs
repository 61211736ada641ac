//! Persistence coordination.
//!
//! Two backends, selected by session identity: unauthenticated sessions own
//! a single local cache slot, authenticated sessions own a remote per-user
//! document collection plus a "last opened" pointer that survives restarts.
//! All writes pass the sanitizer gate first; all reads normalize the legacy
//! document shapes before anything else sees them.

use serde_json::Value;

use crate::cache::{LocalCache, LAST_OPENED_KEY, MAP_SLOT_KEY};
use crate::error::{MapError, MapResult};
use crate::models::map::{display_name, document_id, normalize_document};
use crate::models::Node;
use crate::remote::DocumentStore;
use crate::sanitize;
use crate::session::MapSession;

/// Where a save landed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Local slot overwritten (unauthenticated session).
    Local,
    /// Existing remote document overwritten.
    Updated(String),
    /// New remote document; the key is now the session's `current_map_id`.
    Created(String),
}

pub struct Coordinator<S: DocumentStore> {
    cache: LocalCache,
    remote: Option<S>,
}

impl<S: DocumentStore> Coordinator<S> {
    pub fn new(cache: LocalCache, remote: Option<S>) -> Self {
        Self { cache, remote }
    }

    pub fn is_authenticated(&self) -> bool {
        self.remote.is_some()
    }

    pub fn cache(&self) -> &LocalCache {
        &self.cache
    }

    /// Save the session's tree: update when the session owns a remote key,
    /// create otherwise. Every successful remote save refreshes the "last
    /// opened" pointer. The raw saved document comes back so callers can
    /// fold a freshly created map into the visible list.
    pub async fn save(&self, session: &mut MapSession) -> MapResult<(SaveOutcome, Value)> {
        let tree = session
            .tree_value()
            .ok_or_else(|| MapError::Validation("no map to save".to_string()))?;
        let doc = sanitize::prepare_for_save(&tree)?;

        let Some(store) = &self.remote else {
            let serialized = serde_json::to_string(&doc)
                .map_err(|e| MapError::Malformed(format!("cannot serialize map: {e}")))?;
            self.cache.set(MAP_SLOT_KEY, &serialized)?;
            tracing::debug!("map persisted to the local slot");
            return Ok((SaveOutcome::Local, doc));
        };

        if let Some(id) = session.current_map_id.clone() {
            store.update(&id, &doc).await?;
            self.cache.set(LAST_OPENED_KEY, &id)?;
            tracing::debug!(%id, "map updated");
            Ok((SaveOutcome::Updated(id), doc))
        } else {
            let id = store.create(&doc).await?;
            session.current_map_id = Some(id.clone());
            self.cache.set(LAST_OPENED_KEY, &id)?;
            tracing::debug!(%id, "map created");
            Ok((SaveOutcome::Created(id), doc))
        }
    }

    /// Best-effort incremental content write during an expansion. Failures
    /// are for the caller to log, not surface: the full save that follows is
    /// the fallback.
    pub async fn update_content(&self, session: &MapSession) -> MapResult<()> {
        let (Some(store), Some(id)) = (&self.remote, &session.current_map_id) else {
            return Ok(());
        };
        let tree = session
            .tree_value()
            .ok_or_else(|| MapError::Validation("no map to save".to_string()))?;
        let doc = sanitize::prepare_for_save(&tree)?;
        store.update_content(id, &doc).await
    }

    /// Fetch, normalize, and install a remote document. Failure of any step
    /// leaves the session cleared.
    pub async fn open(&self, session: &mut MapSession, id: &str) -> MapResult<()> {
        let store = self
            .remote
            .as_ref()
            .ok_or_else(|| MapError::Auth("sign in to open saved maps".to_string()))?;

        session.reset();
        let doc = store.get(id).await?;
        let tree = normalize_document(&doc)?;
        session.install_tree(tree);
        session.current_map_id = Some(id.to_string());
        self.cache.set(LAST_OPENED_KEY, id)?;
        tracing::debug!(%id, "map opened");
        Ok(())
    }

    pub async fn list(&self) -> MapResult<Vec<Value>> {
        let store = self
            .remote
            .as_ref()
            .ok_or_else(|| MapError::Auth("sign in to list saved maps".to_string()))?;
        store.list().await
    }

    /// Remove a remote document. Deleting the open map resets the session
    /// and drops the stale "last opened" pointer.
    pub async fn delete(&self, session: &mut MapSession, id: &str) -> MapResult<()> {
        let store = self
            .remote
            .as_ref()
            .ok_or_else(|| MapError::Auth("sign in to delete saved maps".to_string()))?;
        store.delete(id).await?;
        if session.current_map_id.as_deref() == Some(id) {
            session.reset();
        }
        if self.cache.get(LAST_OPENED_KEY)?.as_deref() == Some(id) {
            self.cache.remove(LAST_OPENED_KEY)?;
        }
        tracing::debug!(%id, "map deleted");
        Ok(())
    }

    /// Update only the display name. The caller refreshes the whole list
    /// afterwards; a targeted in-place update is deliberately not attempted.
    pub async fn rename(&self, id: &str, name: &str) -> MapResult<()> {
        let store = self
            .remote
            .as_ref()
            .ok_or_else(|| MapError::Auth("sign in to rename saved maps".to_string()))?;
        store.rename(id, name).await
    }

    /// Restore state at startup: authenticated sessions reopen the map named
    /// by the "last opened" pointer, unauthenticated sessions reload the
    /// local slot. Returns whether a map was restored; failures are the
    /// caller's to log (a missing resume target is not an error state).
    pub async fn resume(&self, session: &mut MapSession) -> MapResult<bool> {
        if self.is_authenticated() {
            let Some(last) = self.cache.get(LAST_OPENED_KEY)? else {
                return Ok(false);
            };
            self.open(session, &last).await?;
            return Ok(true);
        }
        match self.load_local_slot()? {
            Some(tree) => {
                session.reset();
                session.install_tree(tree);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Read the unauthenticated slot. Absence means "no map yet", not an
    /// error.
    pub fn load_local_slot(&self) -> MapResult<Option<Node>> {
        let Some(serialized) = self.cache.get(MAP_SLOT_KEY)? else {
            return Ok(None);
        };
        let doc: Value = serde_json::from_str(&serialized)
            .map_err(|e| MapError::Malformed(format!("local slot does not parse: {e}")))?;
        normalize_document(&doc).map(Some)
    }

    pub fn clear_local_slot(&self) -> MapResult<()> {
        self.cache.remove(MAP_SLOT_KEY)
    }
}

/// One row of the visible map list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapEntry {
    pub id: String,
    pub name: String,
}

/// The visible list of a user's maps. Merging is idempotent: keys already
/// rendered are skipped, and the placeholder "no maps yet" row disappears
/// once a real entry exists.
#[derive(Debug, Default)]
pub struct MapList {
    entries: Vec<MapEntry>,
    placeholder: bool,
}

impl MapList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[MapEntry] {
        &self.entries
    }

    pub fn has_placeholder(&self) -> bool {
        self.placeholder
    }

    /// Full refresh: clear and merge the fetched set.
    pub fn refresh(&mut self, docs: &[Value]) {
        self.entries.clear();
        self.placeholder = false;
        self.merge(docs);
        if self.entries.is_empty() {
            self.placeholder = true;
        }
    }

    /// Append entries for documents not yet listed.
    pub fn merge(&mut self, docs: &[Value]) {
        for doc in docs {
            self.merge_one(doc);
        }
    }

    pub fn merge_one(&mut self, doc: &Value) {
        let id = document_id(doc).unwrap_or_else(|| "unknown".to_string());
        if self.entries.iter().any(|entry| entry.id == id) {
            tracing::debug!(%id, "map already listed, skipping duplicate");
            return;
        }
        let name = display_name(doc, &id);
        self.entries.push(MapEntry { id, name });
        self.placeholder = false;
    }

    pub fn remove(&mut self, id: &str) {
        self.entries.retain(|entry| entry.id != id);
    }
}
