//! Plain-text dump of a project's structure

use crate::graph::VersionedGraph;
use crate::model::NodeId;
use crate::version::Version;
use std::fmt::Write;

/// Indented tree of `node` and its descendants existing at `at`, with their
/// own dependencies listed below each node.
pub fn render_tree(graph: &VersionedGraph, node: NodeId, at: Version) -> String {
    let mut out = String::new();
    render_node(graph, node, at, 0, &mut out);
    out
}

fn render_node(graph: &VersionedGraph, node: NodeId, at: Version, depth: usize, out: &mut String) {
    let Some(n) = graph.node(node) else {
        return;
    };
    let indent = "  ".repeat(depth);
    let marker = if n.is_service() { " [service]" } else { "" };
    let _ = writeln!(out, "{}{} {}{}", indent, n.kind(), n.name, marker);

    for edge_id in graph.dependency_edges(node) {
        if !graph.edge_exists(edge_id, at) {
            continue;
        }
        if let Some(target) = graph.edge(edge_id).and_then(|e| graph.path(e.target)) {
            let _ = writeln!(out, "{}  -> {}", indent, target);
        }
    }
    for version in graph.manifest_dependencies(node, Some(at)) {
        let _ = writeln!(
            out,
            "{}  => {}",
            indent,
            graph.describe_version(version)
        );
    }

    for child in graph.children(node, Some(at)) {
        render_node(graph, child, at, depth + 1, out);
    }
}
