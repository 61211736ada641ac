//! End-to-end engine scenarios against the in-process store and a scripted
//! expansion service.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use serde_json::json;

use mindgraph::cache::{LocalCache, LAST_OPENED_KEY, MAP_SLOT_KEY};
use mindgraph::coordinator::Coordinator;
use mindgraph::engine::{Engine, ExpandOutcome, EXPAND_ERROR_SUFFIX};
use mindgraph::error::{MapError, MapResult};
use mindgraph::interact::{ClickAction, DOUBLE_CLICK_WINDOW};
use mindgraph::models::Node;
use mindgraph::remote::{Expander, MemoryStore};
use mindgraph::render::{Notifier, TextRenderer};

#[derive(Default)]
struct ExpanderState {
    expansions: VecDeque<MapResult<Vec<Node>>>,
    generate_calls: usize,
    expand_calls: usize,
}

/// Expansion service with pre-scripted responses. Clones share state so a
/// test can keep a counting handle while the engine owns another.
#[derive(Default, Clone)]
struct ScriptedExpander {
    state: Arc<Mutex<ExpanderState>>,
}

impl ScriptedExpander {
    fn new() -> Self {
        Self::default()
    }

    fn queue(&self, result: MapResult<Vec<Node>>) {
        self.state
            .lock()
            .expect("expander lock")
            .expansions
            .push_back(result);
    }

    fn generate_calls(&self) -> usize {
        self.state.lock().expect("expander lock").generate_calls
    }

    fn expand_calls(&self) -> usize {
        self.state.lock().expect("expander lock").expand_calls
    }
}

impl Expander for ScriptedExpander {
    async fn generate(&self, topic: &str, _emojis: bool) -> MapResult<Node> {
        self.state.lock().expect("expander lock").generate_calls += 1;
        Ok(Node::new(topic))
    }

    async fn expand(&self, _path: &[String], _emojis: bool) -> MapResult<Vec<Node>> {
        let mut state = self.state.lock().expect("expander lock");
        state.expand_calls += 1;
        state.expansions.pop_front().unwrap_or_else(|| Ok(Vec::new()))
    }
}

/// Captures every user-facing message for assertions.
#[derive(Default, Clone)]
struct RecordingNotifier {
    messages: Arc<Mutex<Vec<String>>>,
}

impl RecordingNotifier {
    fn new() -> Self {
        Self::default()
    }

    fn saw(&self, needle: &str) -> bool {
        self.messages
            .lock()
            .expect("notifier lock")
            .iter()
            .any(|m| m.contains(needle))
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, message: &str) {
        self.messages
            .lock()
            .expect("notifier lock")
            .push(message.to_string());
    }
}

type TestEngine = Engine<MemoryStore, ScriptedExpander, TextRenderer, RecordingNotifier>;

fn engine_with(
    store: Option<MemoryStore>,
    expander: ScriptedExpander,
    notifier: RecordingNotifier,
) -> TestEngine {
    let cache = LocalCache::open_memory().expect("memory cache");
    let coordinator = Coordinator::new(cache, store);
    Engine::new(coordinator, expander, TextRenderer::new(), notifier)
}

fn path(segments: &[&str]) -> Vec<String> {
    segments.iter().map(|s| s.to_string()).collect()
}

mod generation {
    use super::*;

    #[tokio::test]
    async fn unauthenticated_generate_fills_the_local_slot() {
        let mut engine = engine_with(None, ScriptedExpander::new(), RecordingNotifier::new());

        engine.generate("Rust").await.expect("generate");

        let root = engine.session.root.as_ref().expect("root installed");
        assert_eq!(root.content, "Rust");
        assert!(engine.session.current_map_id.is_none());

        let slot = engine
            .coordinator()
            .cache()
            .get(MAP_SLOT_KEY)
            .expect("cache read")
            .expect("slot written");
        let doc: serde_json::Value = serde_json::from_str(&slot).expect("slot parses");
        assert_eq!(doc["content"], "Rust");
        assert_eq!(doc["title"], "Rust");
    }

    #[tokio::test]
    async fn blank_topic_is_rejected_before_the_service_is_called() {
        let expander = ScriptedExpander::new();
        let notifier = RecordingNotifier::new();
        let mut engine = engine_with(None, expander.clone(), notifier.clone());

        let result = engine.generate("   ").await;
        assert!(matches!(result, Err(MapError::Validation(_))));
        assert_eq!(expander.generate_calls(), 0);
        assert!(notifier.saw("enter a topic"));
        assert!(engine.session.root.is_none());
    }

    #[tokio::test]
    async fn generate_fits_the_view_once() {
        let mut engine = engine_with(None, ScriptedExpander::new(), RecordingNotifier::new());
        engine.generate("Rust").await.expect("generate");
        assert_eq!(engine.renderer().fit_calls(), 1);
        assert_eq!(engine.renderer().render(), "Rust\n");
    }
}

mod persistence {
    use super::*;

    #[tokio::test]
    async fn first_save_creates_a_remote_document_and_sets_the_pointer() {
        let store = MemoryStore::new();
        let notifier = RecordingNotifier::new();
        let mut engine = engine_with(
            Some(store.clone()),
            ScriptedExpander::new(),
            notifier.clone(),
        );

        engine.generate("Rust").await.expect("generate");

        assert_eq!(store.create_calls(), 1);
        let id = engine
            .session
            .current_map_id
            .clone()
            .expect("created map owns a key");
        let pointer = engine
            .coordinator()
            .cache()
            .get(LAST_OPENED_KEY)
            .expect("cache read");
        assert_eq!(pointer.as_deref(), Some(id.as_str()));
        assert!(notifier.saw("Map saved"));

        // The fresh map is already in the visible list.
        assert!(engine.map_list().iter().any(|entry| entry.id == id));
    }

    #[tokio::test]
    async fn save_then_open_round_trips_the_tree() {
        let store = MemoryStore::new();
        let mut engine = engine_with(
            Some(store.clone()),
            ScriptedExpander::new(),
            RecordingNotifier::new(),
        );

        engine.generate("Rust").await.expect("generate");
        let saved = engine.session.tree_value().expect("tree");
        let id = engine.session.current_map_id.clone().expect("id");

        engine.open_map(&id).await.expect("open");
        let reopened = engine.session.tree_value().expect("tree");
        assert_eq!(saved, reopened);
    }

    #[tokio::test]
    async fn open_of_a_missing_key_clears_the_session_and_notifies() {
        let notifier = RecordingNotifier::new();
        let mut engine = engine_with(
            Some(MemoryStore::new()),
            ScriptedExpander::new(),
            notifier.clone(),
        );
        engine.generate("Rust").await.expect("generate");

        let result = engine.open_map("nope").await;
        assert!(matches!(result, Err(MapError::NotFound(_))));
        assert!(engine.session.root.is_none());
        assert!(notifier.saw("No map found under the key nope."));
        assert_eq!(engine.renderer().render(), "");
    }

    #[tokio::test]
    async fn legacy_document_shapes_open_identically() {
        let tree = json!({ "content": "Root", "children": [{ "content": "A" }] });
        for field in ["content", "mapData", "mapStructure"] {
            let store = MemoryStore::new();
            store.seed("legacy", json!({ "id": "legacy", field: tree }));
            let mut engine = engine_with(
                Some(store),
                ScriptedExpander::new(),
                RecordingNotifier::new(),
            );

            engine.open_map("legacy").await.expect("open");
            let root = engine.session.root.as_ref().expect("root");
            assert_eq!(root.content, "Root");
            assert_eq!(root.children.len(), 1);
        }
    }

    #[tokio::test]
    async fn deleting_the_open_map_resets_session_pointer_and_list() {
        let store = MemoryStore::new();
        let mut engine = engine_with(
            Some(store.clone()),
            ScriptedExpander::new(),
            RecordingNotifier::new(),
        );
        engine.generate("Rust").await.expect("generate");
        let id = engine.session.current_map_id.clone().expect("id");

        engine.delete_map(&id).await.expect("delete");

        assert!(engine.session.root.is_none());
        assert!(engine.session.current_map_id.is_none());
        assert!(store.is_empty());
        let pointer = engine
            .coordinator()
            .cache()
            .get(LAST_OPENED_KEY)
            .expect("cache read");
        assert!(pointer.is_none());
        assert!(engine.map_list().iter().all(|entry| entry.id != id));
        assert_eq!(engine.renderer().render(), "");
    }

    #[tokio::test]
    async fn refresh_list_is_stable_across_calls() {
        let store = MemoryStore::new();
        store.seed("a", json!({ "title": "First" }));
        store.seed("b", json!({ "title": "Second" }));
        let mut engine = engine_with(
            Some(store),
            ScriptedExpander::new(),
            RecordingNotifier::new(),
        );

        engine.refresh_list().await.expect("refresh");
        engine.refresh_list().await.expect("refresh again");
        let names: Vec<_> = engine.map_list().iter().map(|e| e.name.clone()).collect();
        assert_eq!(names, ["First", "Second"]);
    }

    #[tokio::test]
    async fn resume_restores_the_local_slot_when_signed_out() {
        let cache = LocalCache::open_memory().expect("memory cache");
        {
            let coordinator: Coordinator<MemoryStore> = Coordinator::new(cache.clone(), None);
            let mut engine = Engine::new(
                coordinator,
                ScriptedExpander::new(),
                TextRenderer::new(),
                RecordingNotifier::new(),
            );
            engine.generate("Rust").await.expect("generate");
        }

        let coordinator: Coordinator<MemoryStore> = Coordinator::new(cache, None);
        let mut engine = Engine::new(
            coordinator,
            ScriptedExpander::new(),
            TextRenderer::new(),
            RecordingNotifier::new(),
        );
        assert!(engine.resume().await);
        assert_eq!(
            engine.session.root.as_ref().map(|r| r.content.as_str()),
            Some("Rust")
        );
    }

    #[tokio::test]
    async fn reset_view_clears_the_local_slot_when_signed_out() {
        let mut engine = engine_with(None, ScriptedExpander::new(), RecordingNotifier::new());
        engine.generate("Rust").await.expect("generate");

        engine.reset_view().expect("reset");
        assert!(engine.session.root.is_none());
        let slot = engine
            .coordinator()
            .cache()
            .get(MAP_SLOT_KEY)
            .expect("cache read");
        assert!(slot.is_none());
        assert_eq!(engine.renderer().render(), "");
    }
}

mod expansion {
    use super::*;

    #[tokio::test]
    async fn expand_attaches_children_and_syncs_both_writes() {
        let store = MemoryStore::new();
        let expander = ScriptedExpander::new();
        expander.queue(Ok(vec![Node::new("Ownership"), Node::new("Lifetimes")]));
        let mut engine = engine_with(
            Some(store.clone()),
            expander.clone(),
            RecordingNotifier::new(),
        );
        engine.generate("Rust").await.expect("generate");

        let outcome = engine.expand_path(path(&["Rust"])).await.expect("expand");
        assert_eq!(outcome, ExpandOutcome::Expanded(2));

        let root = engine.session.root.as_ref().expect("root");
        assert_eq!(root.children.len(), 2);
        assert!(root.children.iter().all(|c| c.id != 0));

        // Incremental content write first, then the full save.
        assert_eq!(store.content_calls(), 1);
        assert_eq!(store.update_calls(), 1);
        assert!(engine.renderer().render().contains("Ownership"));
    }

    #[tokio::test]
    async fn in_memory_children_always_win_over_the_service() {
        let expander = ScriptedExpander::new();
        expander.queue(Ok(vec![Node::new("Ownership")]));
        let mut engine = engine_with(None, expander.clone(), RecordingNotifier::new());
        engine.generate("Rust").await.expect("generate");
        engine.expand_path(path(&["Rust"])).await.expect("expand");
        assert_eq!(expander.expand_calls(), 1);

        let outcome = engine.expand_path(path(&["Rust"])).await.expect("expand");
        assert_eq!(outcome, ExpandOutcome::AlreadyExpanded);
        assert_eq!(expander.expand_calls(), 1);
    }

    #[tokio::test]
    async fn empty_expansion_reports_maximum_depth_and_leaves_the_tree_alone() {
        let expander = ScriptedExpander::new();
        expander.queue(Ok(Vec::new()));
        let notifier = RecordingNotifier::new();
        let mut engine = engine_with(None, expander, notifier.clone());
        engine.generate("Rust").await.expect("generate");

        let outcome = engine.expand_path(path(&["Rust"])).await.expect("expand");
        assert_eq!(outcome, ExpandOutcome::NoFurtherDetail);
        assert!(notifier.saw("No further detail"));

        let root = engine.session.root.as_ref().expect("root");
        assert!(root.is_leaf());
        // Pending marker removed again.
        assert_eq!(engine.renderer().render(), "Rust\n");
    }

    #[tokio::test]
    async fn failed_expansion_marks_the_node_and_surfaces_the_error() {
        let expander = ScriptedExpander::new();
        expander.queue(Err(MapError::Server {
            status: 500,
            body: "boom".to_string(),
        }));
        let notifier = RecordingNotifier::new();
        let mut engine = engine_with(None, expander, notifier.clone());
        engine.generate("Rust").await.expect("generate");

        let result = engine.expand_path(path(&["Rust"])).await;
        assert!(matches!(result, Err(MapError::Server { .. })));
        assert!(notifier.saw("Expanding the branch failed"));
        assert!(engine.renderer().render().contains(EXPAND_ERROR_SUFFIX));
        assert!(engine.session.root.as_ref().expect("root").is_leaf());

        // The guard was released; a retry reaches the service again.
        assert!(!engine.session.in_flight.contains(&path(&["Rust"])));
    }

    #[tokio::test]
    async fn expanding_a_path_that_is_not_in_the_tree_is_reported_gone() {
        let mut engine = engine_with(None, ScriptedExpander::new(), RecordingNotifier::new());
        engine.generate("Rust").await.expect("generate");

        let outcome = engine
            .expand_path(path(&["Rust", "Missing"]))
            .await
            .expect("expand");
        assert_eq!(outcome, ExpandOutcome::NodeGone);
    }
}

mod clicks {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn lone_click_expands_once_the_window_elapses() {
        let expander = ScriptedExpander::new();
        expander.queue(Ok(vec![Node::new("Ownership")]));
        let mut engine = engine_with(None, expander.clone(), RecordingNotifier::new());
        engine.generate("Rust").await.expect("generate");
        let root_id = engine.session.root.as_ref().expect("root").id;

        assert_eq!(engine.press(root_id), ClickAction::Armed);
        assert_eq!(engine.fire_timer().await.expect("fire"), None);

        tokio::time::advance(DOUBLE_CLICK_WINDOW).await;
        let outcome = engine.fire_timer().await.expect("fire");
        assert_eq!(outcome, Some(ExpandOutcome::Expanded(1)));
        assert!(engine.edit().is_none());
        assert_eq!(expander.expand_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn double_click_opens_an_edit_and_never_expands() {
        let expander = ScriptedExpander::new();
        let mut engine = engine_with(None, expander.clone(), RecordingNotifier::new());
        engine.generate("Rust").await.expect("generate");
        let root_id = engine.session.root.as_ref().expect("root").id;

        assert_eq!(engine.press(root_id), ClickAction::Armed);
        tokio::time::advance(std::time::Duration::from_millis(100)).await;
        assert_eq!(engine.press(root_id), ClickAction::Edit(root_id));

        let edit = engine.edit().expect("edit session");
        assert_eq!(edit.text(), "Rust");

        tokio::time::advance(DOUBLE_CLICK_WINDOW).await;
        assert_eq!(engine.fire_timer().await.expect("fire"), None);
        assert_eq!(expander.expand_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn focus_mode_press_dims_everything_off_the_path() {
        let expander = ScriptedExpander::new();
        expander.queue(Ok(vec![Node::new("Ownership"), Node::new("Lifetimes")]));
        let mut engine = engine_with(None, expander, RecordingNotifier::new());
        engine.generate("Rust").await.expect("generate");
        engine.expand_path(path(&["Rust"])).await.expect("expand");

        engine.set_focus_mode(true);
        let first_child = engine.session.root.as_ref().expect("root").children[0].id;
        assert_eq!(engine.press(first_child), ClickAction::Focus(first_child));

        let rendered = engine.renderer().render();
        assert!(rendered.contains("· Lifetimes"));
        assert!(!rendered.contains("· Ownership"));
        assert!(!rendered.contains("· Rust"));

        // Leaving focus mode lifts the dimming.
        engine.set_focus_mode(false);
        assert!(!engine.renderer().render().contains('·'));
    }
}

mod editing {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn confirmed_edit_writes_back_and_persists() {
        let mut engine = engine_with(None, ScriptedExpander::new(), RecordingNotifier::new());
        engine.generate("Rust").await.expect("generate");
        let root_id = engine.session.root.as_ref().expect("root").id;

        engine.press(root_id);
        engine.press(root_id);
        engine.edit_mut().expect("edit").insert("Rust 2024");
        engine.confirm_edit().await.expect("confirm");

        assert!(engine.edit().is_none());
        let root = engine.session.root.as_ref().expect("root");
        assert_eq!(root.content, "Rust 2024");

        let slot = engine
            .coordinator()
            .cache()
            .get(MAP_SLOT_KEY)
            .expect("cache read")
            .expect("slot written");
        assert!(slot.contains("Rust 2024"));
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_edit_leaves_the_tree_untouched() {
        let mut engine = engine_with(None, ScriptedExpander::new(), RecordingNotifier::new());
        engine.generate("Rust").await.expect("generate");
        let root_id = engine.session.root.as_ref().expect("root").id;

        engine.press(root_id);
        engine.press(root_id);
        engine.edit_mut().expect("edit").insert("discarded");
        engine.cancel_edit();

        assert!(engine.edit().is_none());
        let root = engine.session.root.as_ref().expect("root");
        assert_eq!(root.content, "Rust");
    }
}

mod search {
    use super::*;

    #[tokio::test]
    async fn search_highlights_survive_an_expansion() {
        let expander = ScriptedExpander::new();
        expander.queue(Ok(vec![Node::new("Ownership"), Node::new("Lifetimes")]));
        let mut engine = engine_with(None, expander, RecordingNotifier::new());
        engine.generate("Rust").await.expect("generate");

        engine.set_search(Some("life".to_string()));
        engine.expand_path(path(&["Rust"])).await.expect("expand");

        let rendered = engine.renderer().render();
        assert!(rendered.contains("● Lifetimes"));
        assert!(!rendered.contains("● Ownership"));
    }

    #[tokio::test]
    async fn blank_search_clears_the_highlights() {
        let expander = ScriptedExpander::new();
        expander.queue(Ok(vec![Node::new("Ownership")]));
        let mut engine = engine_with(None, expander, RecordingNotifier::new());
        engine.generate("Rust").await.expect("generate");
        engine.expand_path(path(&["Rust"])).await.expect("expand");

        engine.set_search(Some("owner".to_string()));
        assert!(engine.renderer().render().contains('●'));

        engine.set_search(Some("   ".to_string()));
        assert!(!engine.renderer().render().contains('●'));
    }
}
