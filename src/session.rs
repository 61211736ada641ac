//! Explicit session state: the one tree being displayed and the identity of
//! the document that owns it. Everything that used to be scattered globals
//! lives here, with a single reset.

use serde_json::Value;

use crate::interact::InFlight;
use crate::models::Node;

pub struct MapSession {
    /// The in-memory tree currently displayed, if any.
    pub root: Option<Node>,
    /// Remote key of the owning document; absent for an unsaved/local map.
    pub current_map_id: Option<String>,
    /// Focus mode: clicks highlight instead of expanding/editing.
    pub focus_mode: bool,
    /// Emoji annotations requested from the expansion service.
    pub emojis_enabled: bool,
    /// Active search term, re-applied after expansions.
    pub search_filter: Option<String>,
    /// Expansion requests currently on the wire.
    pub in_flight: InFlight,
    version: u64,
    next_node_id: u64,
}

impl Default for MapSession {
    fn default() -> Self {
        Self::new()
    }
}

impl MapSession {
    pub fn new() -> Self {
        Self {
            root: None,
            current_map_id: None,
            focus_mode: false,
            emojis_enabled: false,
            search_filter: None,
            in_flight: InFlight::default(),
            version: 0,
            next_node_id: 1,
        }
    }

    /// Monotonic tree version; bumped on every mutation so a response that
    /// raced a mutation can be recognized as stale.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Record a tree mutation.
    pub fn touch(&mut self) {
        self.version += 1;
    }

    /// Install a freshly generated or loaded tree, numbering every node.
    pub fn install_tree(&mut self, mut tree: Node) {
        self.next_node_id = tree.assign_ids(self.next_node_id);
        self.root = Some(tree);
        self.touch();
    }

    /// Number a subtree about to be attached to the installed tree.
    pub fn register_subtree(&mut self, nodes: &mut [Node]) {
        for node in nodes {
            self.next_node_id = node.assign_ids(self.next_node_id);
        }
    }

    /// Serialized form of the current tree, for persistence.
    pub fn tree_value(&self) -> Option<Value> {
        self.root
            .as_ref()
            .and_then(|root| serde_json::to_value(root).ok())
    }

    pub fn is_open(&self) -> bool {
        self.root.is_some()
    }

    /// Close the map: tree, owning key, pending expansions, and the search
    /// filter all go together. UI toggles survive.
    pub fn reset(&mut self) {
        self.root = None;
        self.current_map_id = None;
        self.search_filter = None;
        self.in_flight.clear();
        self.touch();
    }
}
