//! Transitive enumeration and roll-up of dependencies

use crate::graph::VersionedGraph;
use crate::model::{AggregatedEdge, EdgeKind, NodeId, NodeKind};
use crate::version::Version;
use std::collections::{BTreeMap, BTreeSet, HashMap};

impl VersionedGraph {
    /// All descendants of `node` existing at `at` (all known when `None`), depth first.
    pub fn all_children(&self, node: NodeId, at: Option<Version>) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut stack = self.children(node, at);
        stack.reverse();
        while let Some(child) = stack.pop() {
            result.push(child);
            let mut grandchildren = self.children(child, at);
            grandchildren.reverse();
            stack.extend(grandchildren);
        }
        result
    }

    /// Dependency targets of the given kind owned by `node` or any of its descendants.
    /// Targets inside `node` itself are dropped unless `include_internal` is set.
    pub fn all_dependencies(
        &self,
        node: NodeId,
        target: NodeKind,
        at: Option<Version>,
        include_internal: bool,
    ) -> BTreeSet<NodeId> {
        std::iter::once(node)
            .chain(self.all_children(node, at))
            .flat_map(|n| self.own_dependencies(n, target, at))
            .filter(|&t| include_internal || !self.is_ancestor_or_self(node, t))
            .collect()
    }

    /// Dependency targets of the given kind, including those rolled up from one
    /// level further down:
    ///
    /// * project targets also cover package targets, mapped to their project;
    /// * package targets also cover aggregated class targets, mapped to their nearest package;
    /// * class targets also cover method targets, mapped to their class.
    pub fn aggregated_dependencies(
        &self,
        node: NodeId,
        target: NodeKind,
        at: Option<Version>,
        include_internal: bool,
    ) -> BTreeSet<NodeId> {
        let mut result = self.all_dependencies(node, target, at, include_internal);
        let lifted: BTreeSet<NodeId> = match target {
            NodeKind::Project => self
                .all_dependencies(node, NodeKind::Package, at, include_internal)
                .into_iter()
                .filter_map(|t| self.project_of(t))
                .collect(),
            NodeKind::Package => self
                .aggregated_dependencies(node, NodeKind::Class, at, include_internal)
                .into_iter()
                .filter_map(|t| self.nearest_ancestor_of_kind(t, NodeKind::Package))
                .collect(),
            NodeKind::Class => self
                .all_dependencies(node, NodeKind::Method, at, include_internal)
                .into_iter()
                .filter_map(|t| self.nearest_ancestor_of_kind(t, NodeKind::Class))
                .collect(),
            NodeKind::Root | NodeKind::Method => BTreeSet::new(),
        };
        result.extend(
            lifted
                .into_iter()
                .filter(|&t| include_internal || !self.is_ancestor_or_self(node, t)),
        );
        result
    }

    /// Nearest ancestor-or-self whose kind is at most `level`.
    fn collapse_to(&self, mut node: NodeId, level: NodeKind) -> NodeId {
        while self.kind(node).is_some_and(|k| k > level) {
            match self.parent(node) {
                Some(parent) => node = parent,
                None => break,
            }
        }
        node
    }
}

/// Collapse every own dependency of `project` existing at `at` to `level`.
///
/// Both endpoints are lifted to their nearest ancestor at or above `level`;
/// edges that collapse into a single node are dropped.
pub fn rollup(graph: &VersionedGraph, project: NodeId, at: Version, level: NodeKind) -> Vec<AggregatedEdge> {
    let mut agg_map: HashMap<(NodeId, NodeId), AggregatedEdge> = HashMap::new();

    let scope = std::iter::once(project).chain(graph.all_children(project, Some(at)));
    for node in scope {
        for edge_id in graph.dependency_edges(node) {
            if !graph.edge_exists(edge_id, at) {
                continue;
            }
            let Some(edge) = graph.edge(edge_id) else {
                continue;
            };

            let source = graph.collapse_to(edge.source, level);
            let target = graph.collapse_to(edge.target, level);
            if source == target {
                continue;
            }

            let agg = agg_map.entry((source, target)).or_insert_with(|| AggregatedEdge {
                source,
                target,
                count: 0,
                kind_counts: BTreeMap::new(),
                underlying_edge_ids: Vec::new(),
            });
            agg.count += 1;
            *agg.kind_counts.entry(edge.kind).or_insert(0) += 1;
            agg.underlying_edge_ids.push(edge_id);
        }
    }

    let mut edges: Vec<AggregatedEdge> = agg_map.into_values().collect();
    edges.sort_by(|a, b| {
        (graph.path(a.source), graph.path(a.target)).cmp(&(graph.path(b.source), graph.path(b.target)))
    });
    edges
}

/// Number of underlying edges of one kind in a roll-up.
pub fn count_of_kind(edges: &[AggregatedEdge], kind: EdgeKind) -> u32 {
    edges
        .iter()
        .filter_map(|e| e.kind_counts.get(&kind))
        .sum()
}
