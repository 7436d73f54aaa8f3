//! Dependency edges between nodes

use crate::error::{GraphError, Result};
use crate::graph::VersionedGraph;
use crate::model::{EdgeId, EdgeKind, GraphEdge, NodeId, NodeKind};
use crate::path::split_segment;
use crate::version::Version;

impl VersionedGraph {
    /// Create or reuse the dependency edge `from -> to` and confirm it at `at`
    /// (the latest version of `from`'s project when `None`).
    ///
    /// Returns `None` for a self-reference: a target on the same containment
    /// chain as the source is never stored.
    pub fn add_dependency(&mut self, from: NodeId, to: NodeId, at: Option<Version>) -> Result<Option<EdgeId>> {
        let target_kind = self.kind(to).ok_or(GraphError::UnknownNode(to))?;
        if self.node(from).is_none() {
            return Err(GraphError::UnknownNode(from));
        }
        let Some(kind) = EdgeKind::dependency_to(target_kind) else {
            return Ok(None);
        };
        if self.same_chain(from, to) {
            tracing::trace!(
                "Skipping self-reference {} -> {}",
                self.path(from).unwrap_or_default(),
                self.path(to).unwrap_or_default()
            );
            return Ok(None);
        }

        let at = match at {
            Some(v) => Some(v),
            None => self.project_of(from).and_then(|p| self.latest_version(p)),
        };
        let edge = match self.find_edge(from, to, kind) {
            Some(edge) => edge,
            None => self.insert_absent_edge(GraphEdge::new(from, to, kind)),
        };
        if let Some(v) = at {
            self.set_edge_exists(edge, v, true)?;
        }
        Ok(Some(edge))
    }

    /// Resolve `to_path` from the root (creating it if needed) and confirm a
    /// dependency on it at `at`.
    ///
    /// The target path is only confirmed inside `at`'s own project. Nodes of
    /// other projects are resolved without touching their timelines.
    pub fn record_dependency(
        &mut self,
        from: NodeId,
        to_path: &str,
        to_kind: NodeKind,
        at: Version,
    ) -> Result<Option<EdgeId>> {
        let root = self.root;
        let (head, _) = split_segment(to_path);
        let target = if self.path(at.project) == Some(head) {
            self.find_or_create(root, to_path, Some(at), to_kind)?
        } else {
            self.find_or_create_unconfirmed(root, to_path, to_kind)?
        };
        self.add_dependency(from, target, Some(at))
    }

    /// Own dependency targets of `node` with the given target kind, existing at `at`
    /// (all known targets when `None`).
    pub fn own_dependencies(&self, node: NodeId, target: NodeKind, at: Option<Version>) -> Vec<NodeId> {
        let Some(kind) = EdgeKind::dependency_to(target) else {
            return Vec::new();
        };
        self.outgoing(node, kind)
            .into_iter()
            .filter(|&e| at.is_none_or(|v| self.edge_exists(e, v)))
            .filter_map(|e| self.edge(e).map(|e| e.target))
            .collect()
    }

    /// Insert a fresh edge that does not exist before it is confirmed.
    pub(crate) fn insert_absent_edge(&mut self, edge: GraphEdge) -> EdgeId {
        let edge = self.insert_edge(edge);
        if let Some(first) = self.edge_first_existence(edge) {
            self.force_absent_at(edge, first);
        }
        edge
    }
}
