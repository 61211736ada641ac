use mindgraph::coordinator::MapList;
use mindgraph::models::map::{display_name, normalize_document};
use mindgraph::models::Node;
use mindgraph::sanitize::{sanitize, strip_undefined};
use mindgraph::export::to_markdown;
use serde_json::json;
use speculate2::speculate;

fn tree(value: serde_json::Value) -> Node {
    serde_json::from_value(value).expect("fixture tree")
}

speculate! {
    describe "path lookup" {
        before {
            let root = tree(json!({
                "content": "Root",
                "children": [
                    { "content": "Alpha", "children": [{ "content": "Leaf" }] },
                    { "content": "Beta" }
                ]
            }));
        }

        it "follows content-matching children to the addressed node" {
            let path: Vec<String> = ["Root", "Alpha", "Leaf"].iter().map(|s| s.to_string()).collect();
            let found = root.find_path(&path).expect("leaf");
            assert_eq!(found.content, "Leaf");
        }

        it "returns the root for a one-element path" {
            let path = vec!["Root".to_string()];
            assert_eq!(root.find_path(&path).map(|n| n.content.as_str()), Some("Root"));
        }

        it "is not-found for absent paths and the empty path" {
            let missing: Vec<String> = ["Root", "Gamma"].iter().map(|s| s.to_string()).collect();
            assert!(root.find_path(&missing).is_none());
            assert!(root.find_path(&[]).is_none());
        }
    }

    describe "sanitizer" {
        it "is idempotent" {
            let raw = json!({
                "content": "Root",
                "depth": 2,
                "children": [{ "content": "A", "payload": {} }]
            });
            let once = sanitize(&raw);
            assert_eq!(sanitize(&once), once);
        }

        it "never leaves a null anywhere after stripping" {
            let raw = json!({
                "content": "Root",
                "title": null,
                "children": [null, { "content": "A", "children": [null] }]
            });
            let clean = strip_undefined(&raw);
            fn has_null(v: &serde_json::Value) -> bool {
                match v {
                    serde_json::Value::Null => true,
                    serde_json::Value::Array(items) => items.iter().any(has_null),
                    serde_json::Value::Object(entries) => entries.values().any(has_null),
                    _ => false,
                }
            }
            assert!(!has_null(&clean));
        }

        it "leaves defined values unchanged" {
            let raw = json!({ "content": "Root", "children": [{ "content": "A" }] });
            assert_eq!(strip_undefined(&raw), raw);
        }
    }

    describe "document normalization" {
        it "reads all three legacy layouts to the same tree" {
            let payload = json!({ "content": "Root", "children": [{ "content": "A" }] });
            let from_content = normalize_document(&json!({ "content": payload })).expect("content");
            let from_map_data = normalize_document(&json!({ "mapData": payload })).expect("mapData");
            let from_structure = normalize_document(&json!({ "mapStructure": payload })).expect("mapStructure");
            assert_eq!(from_content, from_map_data);
            assert_eq!(from_map_data, from_structure);
        }

        it "names list entries by title, name, root label, then key" {
            assert_eq!(display_name(&json!({ "title": "T" }), "k"), "T");
            assert_eq!(display_name(&json!({ "name": "N" }), "k"), "N");
            assert_eq!(display_name(&json!({ "content": { "content": "R" } }), "k"), "R");
            assert_eq!(display_name(&json!({}), "0123456789abcdef"), "Map 01234567…");
        }
    }

    describe "map list" {
        it "does not duplicate entries across repeated refreshes" {
            let docs = vec![
                json!({ "id": "a", "title": "First" }),
                json!({ "id": "b", "title": "Second" }),
            ];
            let mut list = MapList::new();
            list.refresh(&docs);
            list.refresh(&docs);
            list.merge(&docs);
            let ids: Vec<_> = list.entries().iter().map(|e| e.id.as_str()).collect();
            assert_eq!(ids, ["a", "b"]);
        }

        it "drops the placeholder once a real entry arrives" {
            let mut list = MapList::new();
            list.refresh(&[]);
            assert!(list.has_placeholder());
            list.merge_one(&json!({ "id": "a", "title": "First" }));
            assert!(!list.has_placeholder());
            assert_eq!(list.entries().len(), 1);
        }
    }

    describe "markdown outline" {
        it "emits one bulleted line per node with two-space indents" {
            let root = tree(json!({
                "content": "Root",
                "children": [{ "content": "Alpha", "children": [{ "content": "Leaf" }] }]
            }));
            assert_eq!(to_markdown(&root), "- Root\n  - Alpha\n    - Leaf\n");
        }
    }
}
