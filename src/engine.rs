//! The session controller and synchronization bridge.
//!
//! One struct owns the collaborators and the session, and every user-facing
//! operation is a method: interaction mutates the tree through path or id
//! lookup, the bridge pushes the whole tree back to the renderer, and the
//! coordinator persists it. Single-threaded: correctness of the shared
//! session relies on handlers running to completion between suspensions.

use serde_json::Value;

use crate::coordinator::{Coordinator, MapEntry, MapList, SaveOutcome};
use crate::error::{MapError, MapResult};
use crate::interact::{ClickAction, ClickArbiter, EditSession};
use crate::models::{all_ids, filter_matches, focus_set};
use crate::remote::{DocumentStore, Expander};
use crate::render::{Notifier, Renderer};
use crate::session::MapSession;

/// Label decoration while an expansion is on the wire.
pub const EXPAND_PENDING_SUFFIX: &str = " ...";
/// Label decoration after a failed expansion.
pub const EXPAND_ERROR_SUFFIX: &str = " [!]";

/// How an expansion attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpandOutcome {
    /// Children attached (count).
    Expanded(usize),
    /// The node already had children in memory; the service was not called.
    AlreadyExpanded,
    /// An expansion of the same path is still in flight.
    AlreadyPending,
    /// The service had nothing to add; tree untouched.
    NoFurtherDetail,
    /// The tree changed while the request was in flight; response dropped.
    StaleDropped,
    /// The addressed node is no longer in the tree.
    NodeGone,
}

pub struct Engine<S: DocumentStore, X, R, N> {
    pub session: MapSession,
    coordinator: Coordinator<S>,
    expander: X,
    renderer: R,
    notifier: N,
    arbiter: ClickArbiter,
    edit: Option<EditSession>,
    map_list: MapList,
}

impl<S, X, R, N> Engine<S, X, R, N>
where
    S: DocumentStore,
    X: Expander,
    R: Renderer,
    N: Notifier,
{
    pub fn new(coordinator: Coordinator<S>, expander: X, renderer: R, notifier: N) -> Self {
        Self {
            session: MapSession::new(),
            coordinator,
            expander,
            renderer,
            notifier,
            arbiter: ClickArbiter::new(),
            edit: None,
            map_list: MapList::new(),
        }
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn map_list(&self) -> &[MapEntry] {
        self.map_list.entries()
    }

    pub fn coordinator(&self) -> &Coordinator<S> {
        &self.coordinator
    }

    /// Push the current tree to the renderer (replace-all) and re-apply the
    /// search filter. The one place renderer state is written from the tree.
    fn push_tree(&mut self) {
        if let Some(root) = &self.session.root {
            self.renderer.set_data(root);
            let matches = match &self.session.search_filter {
                Some(term) => filter_matches(root, term),
                None => Default::default(),
            };
            self.renderer.set_highlights(matches);
        } else {
            self.renderer.clear();
        }
    }

    // ============================================================
    // Map lifecycle
    // ============================================================

    /// Generate a fresh map for `topic` and persist it.
    pub async fn generate(&mut self, topic: &str) -> MapResult<()> {
        if topic.trim().is_empty() {
            let err = MapError::Validation("enter a topic to analyze".to_string());
            self.notifier.notify(&err.to_string());
            return Err(err);
        }
        let emojis = self.session.emojis_enabled;
        let tree = match self.expander.generate(topic, emojis).await {
            Ok(tree) => tree,
            Err(e) => {
                self.notifier.notify(&format!("Generating the map failed: {e}"));
                return Err(e);
            }
        };
        self.session.reset();
        self.session.install_tree(tree);
        self.push_tree();
        self.renderer.fit();
        let _ = self.save().await;
        Ok(())
    }

    /// The standard save protocol, with user feedback once the write
    /// settles.
    pub async fn save(&mut self) -> MapResult<SaveOutcome> {
        match self.coordinator.save(&mut self.session).await {
            Ok((outcome, doc)) => {
                match &outcome {
                    SaveOutcome::Created(id) => {
                        self.merge_created(id, doc);
                        self.notifier
                            .notify("Map saved. You can find it in your maps panel.");
                    }
                    SaveOutcome::Updated(_) => {
                        self.notifier.notify("Map updated; your changes are stored.");
                    }
                    SaveOutcome::Local => {}
                }
                Ok(outcome)
            }
            Err(e) => {
                let message = match &e {
                    MapError::Validation(_) => format!("Cannot save this map: {e}"),
                    MapError::Auth(_) => format!("Saving needs a valid sign-in: {e}"),
                    _ => "Saving the map failed.".to_string(),
                };
                self.notifier.notify(&message);
                Err(e)
            }
        }
    }

    fn merge_created(&mut self, id: &str, mut doc: Value) {
        if let Some(obj) = doc.as_object_mut() {
            obj.insert("id".to_string(), Value::String(id.to_string()));
        }
        self.map_list.merge_one(&doc);
    }

    pub async fn open_map(&mut self, id: &str) -> MapResult<()> {
        self.edit = None;
        self.arbiter.cancel();
        match self.coordinator.open(&mut self.session, id).await {
            Ok(()) => {
                self.push_tree();
                self.renderer.fit();
                Ok(())
            }
            Err(e) => {
                let message = match &e {
                    MapError::NotFound(_) => format!("No map found under the key {id}."),
                    MapError::Malformed(_) => {
                        "Cannot load this map: the document has an unknown format.".to_string()
                    }
                    _ => format!("Loading the map failed: {e}"),
                };
                self.notifier.notify(&message);
                self.push_tree();
                Err(e)
            }
        }
    }

    /// Refetch the remote set and rebuild the visible list.
    pub async fn refresh_list(&mut self) -> MapResult<&[MapEntry]> {
        let docs = self.coordinator.list().await?;
        self.map_list.refresh(&docs);
        Ok(self.map_list.entries())
    }

    pub async fn delete_map(&mut self, id: &str) -> MapResult<()> {
        let was_open = self.session.current_map_id.as_deref() == Some(id);
        if let Err(e) = self.coordinator.delete(&mut self.session, id).await {
            self.notifier.notify(&format!("Deleting the map failed: {e}"));
            return Err(e);
        }
        if was_open {
            self.edit = None;
            self.arbiter.cancel();
            self.push_tree();
        }
        self.map_list.remove(id);
        if let Err(e) = self.refresh_list().await {
            tracing::warn!("list refresh after delete failed: {e}");
        }
        Ok(())
    }

    /// Rename updates only the display name remotely, then refetches the
    /// whole list rather than patching one row; refresh failures are
    /// logged, not surfaced.
    pub async fn rename_map(&mut self, id: &str, name: &str) -> MapResult<()> {
        if let Err(e) = self.coordinator.rename(id, name).await {
            self.notifier.notify(&format!("Renaming the map failed: {e}"));
            return Err(e);
        }
        if let Err(e) = self.refresh_list().await {
            tracing::warn!("list refresh after rename failed: {e}");
        }
        Ok(())
    }

    /// Restore the last session at startup; failures only log.
    pub async fn resume(&mut self) -> bool {
        match self.coordinator.resume(&mut self.session).await {
            Ok(true) => {
                self.push_tree();
                self.renderer.fit();
                true
            }
            Ok(false) => false,
            Err(e) => {
                tracing::warn!("resuming the last map failed: {e}");
                false
            }
        }
    }

    /// Close the current view. Unauthenticated sessions also clear their
    /// local slot; the cloud copy of a saved map is untouched.
    pub fn reset_view(&mut self) -> MapResult<()> {
        self.session.reset();
        self.edit = None;
        self.arbiter.cancel();
        self.renderer.clear();
        if !self.coordinator.is_authenticated() {
            self.coordinator.clear_local_slot()?;
        }
        Ok(())
    }

    // ============================================================
    // Interaction
    // ============================================================

    /// A press on a rendered node. Arms the click timer, or resolves to an
    /// edit or a focus highlight; the driver loop calls
    /// [`Engine::fire_timer`] once [`Engine::deadline`] passes.
    pub fn press(&mut self, node_id: u64) -> ClickAction {
        let action = self.arbiter.press(node_id, self.session.focus_mode);
        match action {
            ClickAction::Edit(id) => self.begin_edit(id),
            ClickAction::Focus(id) => self.focus_on(id),
            ClickAction::Armed => {}
        }
        action
    }

    pub fn deadline(&self) -> Option<tokio::time::Instant> {
        self.arbiter.deadline()
    }

    /// Commit a pending lone click as an expansion once its window elapsed.
    pub async fn fire_timer(&mut self) -> MapResult<Option<ExpandOutcome>> {
        match self.arbiter.fire() {
            Some(node_id) => self.expand_node(node_id).await.map(Some),
            None => Ok(None),
        }
    }

    /// Expand the node with `node_id`, resolving its path through the
    /// renderer's live index first and the tree as a fallback.
    pub async fn expand_node(&mut self, node_id: u64) -> MapResult<ExpandOutcome> {
        let path = self
            .renderer
            .path_of(node_id)
            .or_else(|| self.session.root.as_ref()?.path_to_id(node_id));
        let Some(path) = path else {
            tracing::warn!(node_id, "expand target is not in the rendered tree");
            return Ok(ExpandOutcome::NodeGone);
        };
        self.expand_path(path).await
    }

    /// The expand-on-demand flow: in-memory children always win,
    /// one request per path at a time, stale responses dropped.
    pub async fn expand_path(&mut self, path: Vec<String>) -> MapResult<ExpandOutcome> {
        let Some(root) = &self.session.root else {
            return Ok(ExpandOutcome::NodeGone);
        };
        let Some(target) = root.find_path(&path) else {
            tracing::warn!(?path, "expand target not found");
            return Ok(ExpandOutcome::NodeGone);
        };
        if !target.is_leaf() {
            return Ok(ExpandOutcome::AlreadyExpanded);
        }
        let node_id = target.id;

        if !self.session.in_flight.try_begin(&path) {
            self.notifier.notify("That branch is already being expanded.");
            return Ok(ExpandOutcome::AlreadyPending);
        }
        let version = self.session.version();
        self.renderer.set_suffix(node_id, Some(EXPAND_PENDING_SUFFIX));

        let emojis = self.session.emojis_enabled;
        let result = self.expander.expand(&path, emojis).await;
        self.session.in_flight.finish(&path);

        let mut children = match result {
            Ok(children) => children,
            Err(e) => {
                self.renderer.set_suffix(node_id, Some(EXPAND_ERROR_SUFFIX));
                self.notifier.notify(&format!("Expanding the branch failed: {e}"));
                return Err(e);
            }
        };

        if self.session.version() != version {
            self.renderer.set_suffix(node_id, None);
            tracing::warn!(?path, "tree changed while expanding; response dropped");
            return Ok(ExpandOutcome::StaleDropped);
        }

        if children.is_empty() {
            self.renderer.set_suffix(node_id, None);
            self.notifier
                .notify("No further detail here; maximum depth reached.");
            return Ok(ExpandOutcome::NoFurtherDetail);
        }

        self.session.register_subtree(&mut children);
        let count = children.len();
        let attached = match self
            .session
            .root
            .as_mut()
            .and_then(|root| root.find_path_mut(&path))
        {
            Some(target) => {
                target.replace_children(children);
                true
            }
            None => false,
        };
        if !attached {
            self.renderer.set_suffix(node_id, Some(EXPAND_ERROR_SUFFIX));
            self.notifier.notify("Could not attach the new branches.");
            return Ok(ExpandOutcome::NodeGone);
        }

        self.session.touch();
        self.renderer.set_suffix(node_id, None);
        self.push_tree();

        // Best-effort incremental write first; the full save is the
        // fallback and carries the user feedback.
        if let Err(e) = self.coordinator.update_content(&self.session).await {
            tracing::warn!("incremental update after expand failed: {e}");
        }
        let _ = self.save().await;

        Ok(ExpandOutcome::Expanded(count))
    }

    // ============================================================
    // Editing
    // ============================================================

    fn begin_edit(&mut self, node_id: u64) {
        let Some(root) = &self.session.root else {
            return;
        };
        let Some(node) = root.find_by_id(node_id) else {
            tracing::warn!(node_id, "edit target is not in the tree");
            return;
        };
        self.edit = Some(EditSession::begin(node_id, node.content.clone()));
    }

    pub fn edit(&self) -> Option<&EditSession> {
        self.edit.as_ref()
    }

    pub fn edit_mut(&mut self) -> Option<&mut EditSession> {
        self.edit.as_mut()
    }

    /// Accept the edit: write the text back into the tree through the path
    /// rebuilt from the renderer, persist, re-render.
    pub async fn confirm_edit(&mut self) -> MapResult<()> {
        let Some(edit) = self.edit.take() else {
            return Ok(());
        };
        let (node_id, text) = edit.into_confirmed();
        let path = self
            .renderer
            .path_of(node_id)
            .or_else(|| self.session.root.as_ref()?.path_to_id(node_id));
        let target = path.and_then(|path| {
            self.session
                .root
                .as_mut()
                .and_then(|root| root.find_path_mut(&path))
        });
        let Some(target) = target else {
            tracing::warn!(node_id, "edited node vanished before confirm");
            return Ok(());
        };
        target.set_content(text);
        self.session.touch();
        self.push_tree();
        let _ = self.save().await;
        Ok(())
    }

    /// Discard the edit without touching the tree or any backend.
    pub fn cancel_edit(&mut self) {
        self.edit = None;
    }

    // ============================================================
    // View modes
    // ============================================================

    pub fn set_focus_mode(&mut self, enabled: bool) {
        self.session.focus_mode = enabled;
        if !enabled {
            self.renderer.set_dimmed(Default::default());
        }
    }

    /// Focus highlight: everything outside the clicked node's ancestor and
    /// descendant chain is dimmed.
    fn focus_on(&mut self, node_id: u64) {
        let Some(root) = &self.session.root else {
            return;
        };
        let lit = focus_set(root, node_id);
        let mut dimmed = all_ids(root);
        dimmed.retain(|id| !lit.contains(id));
        self.renderer.set_dimmed(dimmed);
    }

    pub fn set_search(&mut self, term: Option<String>) {
        self.session.search_filter = term.filter(|t| !t.trim().is_empty());
        self.push_tree();
    }
}
