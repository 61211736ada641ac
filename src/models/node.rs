use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A mind-map tree element: a display label plus ordered children.
///
/// `content` doubles as the addressing key — a node is located by the
/// root-to-node sequence of labels (a *path*). Path lookup assumes no two
/// siblings share the same label; if they do, the first match wins. The
/// synthetic `id` exists to make in-memory interaction (clicks, edits)
/// immune to that ambiguity: it is assigned when a tree is installed into a
/// session and is never serialized or persisted.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Node {
    #[serde(skip)]
    pub id: u64,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Node>,
}

impl Node {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            id: 0,
            content: content.into(),
            children: Vec::new(),
        }
    }

    /// A leaf (no children in memory) is eligible for expansion.
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Walk from this node along `path`, matching child labels.
    ///
    /// `path[0]` names this node itself and is not checked against it beyond
    /// the walk starting here; a one-element path returns the node, an empty
    /// path is not-found.
    pub fn find_path(&self, path: &[String]) -> Option<&Node> {
        if path.is_empty() {
            return None;
        }
        let mut current = self;
        for segment in &path[1..] {
            current = current
                .children
                .iter()
                .find(|child| child.content == *segment)?;
        }
        Some(current)
    }

    pub fn find_path_mut(&mut self, path: &[String]) -> Option<&mut Node> {
        if path.is_empty() {
            return None;
        }
        let mut current = self;
        for segment in &path[1..] {
            current = current
                .children
                .iter_mut()
                .find(|child| child.content == *segment)?;
        }
        Some(current)
    }

    pub fn find_by_id(&self, id: u64) -> Option<&Node> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find_by_id(id))
    }

    pub fn find_by_id_mut(&mut self, id: u64) -> Option<&mut Node> {
        if self.id == id {
            return Some(self);
        }
        self.children
            .iter_mut()
            .find_map(|child| child.find_by_id_mut(id))
    }

    /// Root-to-node label sequence for the node with `id`, or `None` if the
    /// id is not in this tree.
    pub fn path_to_id(&self, id: u64) -> Option<Vec<String>> {
        if self.id == id {
            return Some(vec![self.content.clone()]);
        }
        for child in &self.children {
            if let Some(mut tail) = child.path_to_id(id) {
                let mut path = vec![self.content.clone()];
                path.append(&mut tail);
                return Some(path);
            }
        }
        None
    }

    /// In-place label rewrite. Callers re-render and persist afterwards; the
    /// tree has no observers.
    pub fn set_content(&mut self, text: impl Into<String>) {
        self.content = text.into();
    }

    pub fn replace_children(&mut self, children: Vec<Node>) {
        self.children = children;
    }

    /// Renumber the whole subtree from a monotonic counter. Returns the next
    /// unused id.
    pub fn assign_ids(&mut self, mut next: u64) -> u64 {
        self.id = next;
        next += 1;
        for child in &mut self.children {
            next = child.assign_ids(next);
        }
        next
    }

    pub fn node_count(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(Node::node_count)
            .sum::<usize>()
    }
}

/// Ids to keep lit in focus mode: the target node, its ancestors, and all of
/// its descendants. Everything else gets dimmed.
pub fn focus_set(root: &Node, target: u64) -> HashSet<u64> {
    let mut lit = HashSet::new();
    collect_ancestor_chain(root, target, &mut lit);
    if let Some(node) = root.find_by_id(target) {
        collect_subtree(node, &mut lit);
    }
    lit
}

fn collect_ancestor_chain(node: &Node, target: u64, lit: &mut HashSet<u64>) -> bool {
    if node.id == target {
        lit.insert(node.id);
        return true;
    }
    for child in &node.children {
        if collect_ancestor_chain(child, target, lit) {
            lit.insert(node.id);
            return true;
        }
    }
    false
}

fn collect_subtree(node: &Node, lit: &mut HashSet<u64>) {
    lit.insert(node.id);
    for child in &node.children {
        collect_subtree(child, lit);
    }
}

/// Every id in the tree; the complement of a focus set is what gets dimmed.
pub fn all_ids(root: &Node) -> HashSet<u64> {
    let mut ids = HashSet::new();
    collect_subtree(root, &mut ids);
    ids
}

/// Ids of nodes whose label contains `term` (case-insensitive). An empty or
/// blank term matches nothing, which callers treat as "no filter".
pub fn filter_matches(root: &Node, term: &str) -> HashSet<u64> {
    let term = term.trim().to_lowercase();
    let mut hits = HashSet::new();
    if term.is_empty() {
        return hits;
    }
    collect_matches(root, &term, &mut hits);
    hits
}

fn collect_matches(node: &Node, term: &str, hits: &mut HashSet<u64>) {
    if node.content.to_lowercase().contains(term) {
        hits.insert(node.id);
    }
    for child in &node.children {
        collect_matches(child, term, hits);
    }
}
