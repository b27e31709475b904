#![allow(dead_code)]

/**
 * ML Parser Test Utilities
 *
 * Helpers turning parse trees into flat rows that read well in assertions
 */
use tagforge_compiler::ml_parser::ast::Node;
use tagforge_compiler::ml_parser::parser::ParseTreeResult;

/// One row per node: `["Raw", text, depth]` or `["Component", name, depth]`,
/// followed by `["Attr", name, value]` rows for each attribute
pub fn humanize_nodes(result: &ParseTreeResult) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    humanize_into(&result.root_nodes, 0, &mut rows);
    rows
}

fn humanize_into(nodes: &[Node], depth: usize, rows: &mut Vec<Vec<String>>) {
    for node in nodes {
        match node {
            Node::Raw(text) => rows.push(vec!["Raw".to_string(), text.clone(), depth.to_string()]),
            Node::Component(component) => {
                rows.push(vec![
                    "Component".to_string(),
                    component.name.clone(),
                    depth.to_string(),
                ]);
                for (name, value) in &component.attributes {
                    rows.push(vec!["Attr".to_string(), name.clone(), value.clone()]);
                }
                humanize_into(&component.children, depth + 1, rows);
            }
        }
    }
}

/// Concatenated raw text of the whole tree
pub fn raw_text(nodes: &[Node]) -> String {
    nodes.iter().filter_map(Node::as_raw).collect()
}

pub fn row(kind: &str, text: &str, depth: usize) -> Vec<String> {
    vec![kind.to_string(), text.to_string(), depth.to_string()]
}

pub fn attr(name: &str, value: &str) -> Vec<String> {
    vec!["Attr".to_string(), name.to_string(), value.to_string()]
}
