//! Pure export formatting: a markdown outline of the tree and the filename
//! derived from the root topic.

use crate::models::Node;

/// Bulleted outline, one line per node, two-space indent per depth level.
/// Single deterministic pass; trees are small.
pub fn to_markdown(node: &Node) -> String {
    let mut output = String::new();
    render(node, 0, &mut output);
    output
}

fn render(node: &Node, depth: usize, output: &mut String) {
    for _ in 0..depth {
        output.push_str("  ");
    }
    output.push_str("- ");
    output.push_str(&node.content);
    output.push('\n');
    for child in &node.children {
        render(child, depth + 1, output);
    }
}

/// Download filename for an export: first 30 characters of the root topic,
/// non-alphanumerics replaced by `_`, lowercased.
pub fn export_filename(root_content: &str, extension: &str) -> String {
    let stem: String = root_content
        .chars()
        .take(30)
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect();
    format!("{stem}.{extension}")
}
