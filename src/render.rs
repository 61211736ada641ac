//! Rendering boundary.
//!
//! The engine never draws anything itself: after every visible mutation it
//! hands the whole tree to a [`Renderer`] (replace-all, no diffing). The
//! renderer keeps a read-only id → path index the interaction layer uses to
//! rebuild a node's path from the live scene, plus the transient label
//! decorations (pending/error suffixes, focus dimming, search highlights)
//! that never belong in the tree model.

use std::collections::{HashMap, HashSet};

use crate::models::Node;

pub trait Renderer {
    /// Replace the rendered tree wholesale.
    fn set_data(&mut self, tree: &Node);
    /// Tear the rendered tree down (map closed or reset).
    fn clear(&mut self);
    /// Refit the viewport to the current tree.
    fn fit(&mut self);
    /// Root-to-node path of a currently rendered node.
    fn path_of(&self, id: u64) -> Option<Vec<String>>;
    /// Transient label suffix (expansion pending/error marker); `None`
    /// restores the plain label.
    fn set_suffix(&mut self, id: u64, suffix: Option<&str>);
    /// Focus-mode dimming: everything in `dimmed` is greyed out.
    fn set_dimmed(&mut self, dimmed: HashSet<u64>);
    /// Search highlighting: `matches` lit, the rest untouched.
    fn set_highlights(&mut self, matches: HashSet<u64>);
}

/// One line of user-visible feedback (the status banner of the UI).
pub trait Notifier {
    fn notify(&self, message: &str);
}

/// Feedback to the log stream; what the CLI uses.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, message: &str) {
        tracing::info!("{message}");
    }
}

const HIGHLIGHTED: char = '●';
const DIMMED: char = '·';

/// Text renderer: an indented outline with branch characters, decoration
/// markers, and the id → path index the engine reads back.
#[derive(Default)]
pub struct TextRenderer {
    snapshot: Option<Node>,
    index: HashMap<u64, Vec<String>>,
    suffixes: HashMap<u64, String>,
    dimmed: HashSet<u64>,
    highlights: HashSet<u64>,
    fit_calls: usize,
}

impl TextRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fit_calls(&self) -> usize {
        self.fit_calls
    }

    /// Render the current tree to a string, one node per line.
    pub fn render(&self) -> String {
        let mut output = String::new();
        if let Some(root) = &self.snapshot {
            self.render_node(&mut output, root, "", true, true);
        }
        output
    }

    fn render_node(&self, output: &mut String, node: &Node, prefix: &str, is_last: bool, is_root: bool) {
        let marker = if self.highlights.contains(&node.id) {
            Some(HIGHLIGHTED)
        } else if self.dimmed.contains(&node.id) {
            Some(DIMMED)
        } else {
            None
        };

        if !is_root {
            output.push_str(prefix);
            output.push_str(if is_last { "└── " } else { "├── " });
        }
        if let Some(marker) = marker {
            output.push(marker);
            output.push(' ');
        }
        output.push_str(&node.content);
        if let Some(suffix) = self.suffixes.get(&node.id) {
            output.push_str(suffix);
        }
        output.push('\n');

        let child_prefix = if is_root {
            String::new()
        } else {
            format!("{}{}", prefix, if is_last { "    " } else { "│   " })
        };
        for (i, child) in node.children.iter().enumerate() {
            let child_is_last = i == node.children.len() - 1;
            self.render_node(output, child, &child_prefix, child_is_last, false);
        }
    }

    fn index_tree(node: &Node, trail: &mut Vec<String>, index: &mut HashMap<u64, Vec<String>>) {
        trail.push(node.content.clone());
        index.insert(node.id, trail.clone());
        for child in &node.children {
            Self::index_tree(child, trail, index);
        }
        trail.pop();
    }
}

impl Renderer for TextRenderer {
    fn set_data(&mut self, tree: &Node) {
        self.index.clear();
        let mut trail = Vec::new();
        Self::index_tree(tree, &mut trail, &mut self.index);
        // Decorations belong to the previous frame's nodes.
        self.suffixes.retain(|id, _| self.index.contains_key(id));
        self.snapshot = Some(tree.clone());
    }

    fn clear(&mut self) {
        self.snapshot = None;
        self.index.clear();
        self.suffixes.clear();
        self.dimmed.clear();
        self.highlights.clear();
    }

    fn fit(&mut self) {
        self.fit_calls += 1;
    }

    fn path_of(&self, id: u64) -> Option<Vec<String>> {
        self.index.get(&id).cloned()
    }

    fn set_suffix(&mut self, id: u64, suffix: Option<&str>) {
        match suffix {
            Some(s) => {
                self.suffixes.insert(id, s.to_string());
            }
            None => {
                self.suffixes.remove(&id);
            }
        }
    }

    fn set_dimmed(&mut self, dimmed: HashSet<u64>) {
        self.dimmed = dimmed;
    }

    fn set_highlights(&mut self, matches: HashSet<u64>) {
        self.highlights = matches;
    }
}
