//! Versioned graph store using petgraph::StableDiGraph with custom NodeId/EdgeId

use crate::error::{GraphError, Result};
use crate::model::*;
use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::HashMap;

pub(crate) type Arena = StableDiGraph<GraphNode, GraphEdge>;

/// The dependency graph. Nodes are addressed by path; every edge carries a
/// sparse existence timeline.
#[derive(Clone)]
pub struct VersionedGraph {
    pub(crate) inner: Arena,
    pub(crate) root: NodeId,
    /// Path to node. Paths are unique across the graph.
    pub(crate) paths: HashMap<String, NodeId>,
}

impl std::fmt::Debug for VersionedGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VersionedGraph")
            .field("node_count", &self.inner.node_count())
            .field("edge_count", &self.inner.edge_count())
            .finish()
    }
}

fn node_index(id: NodeId) -> NodeIndex {
    NodeIndex::new(id.0 as usize)
}

fn edge_index(id: EdgeId) -> EdgeIndex {
    EdgeIndex::new(id.0 as usize)
}

fn node_id(idx: NodeIndex) -> NodeId {
    NodeId(idx.index() as u64)
}

fn edge_id(idx: EdgeIndex) -> EdgeId {
    EdgeId(idx.index() as u64)
}

impl VersionedGraph {
    /// An empty graph holding only the root.
    pub fn new() -> Self {
        let mut inner = Arena::default();
        let idx = inner.add_node(GraphNode {
            name: String::new(),
            path: String::new(),
            parent_edge: None,
            detail: NodeDetail::for_kind(NodeKind::Root),
        });
        let root = node_id(idx);
        let mut paths = HashMap::new();
        paths.insert(String::new(), root);
        VersionedGraph { inner, root, paths }
    }

    /// Rebuild the path index over a loaded arena.
    pub(crate) fn from_arena(inner: Arena) -> Result<Self> {
        let mut root = None;
        let mut paths = HashMap::with_capacity(inner.node_count());
        for idx in inner.node_indices() {
            let node = &inner[idx];
            if node.kind() == NodeKind::Root {
                root = Some(node_id(idx));
            }
            if paths.insert(node.path.clone(), node_id(idx)).is_some() {
                return Err(GraphError::CorruptStore(format!("duplicate path `{}`", node.path)));
            }
        }
        let root = root.ok_or_else(|| GraphError::CorruptStore("no root node".to_string()))?;
        Ok(VersionedGraph { inner, root, paths })
    }

    pub(crate) fn arena(&self) -> &Arena {
        &self.inner
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Get a node by ID.
    pub fn node(&self, id: NodeId) -> Option<&GraphNode> {
        self.inner.node_weight(node_index(id))
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Option<&mut GraphNode> {
        self.inner.node_weight_mut(node_index(id))
    }

    /// Get an edge by ID.
    pub fn edge(&self, id: EdgeId) -> Option<&GraphEdge> {
        self.inner.edge_weight(edge_index(id))
    }

    pub(crate) fn edge_mut(&mut self, id: EdgeId) -> Option<&mut GraphEdge> {
        self.inner.edge_weight_mut(edge_index(id))
    }

    pub(crate) fn insert_edge(&mut self, edge: GraphEdge) -> EdgeId {
        let source = node_index(edge.source);
        let target = node_index(edge.target);
        edge_id(self.inner.add_edge(source, target, edge))
    }

    /// Total number of nodes.
    pub fn node_count(&self) -> usize {
        self.inner.node_count()
    }

    /// Total number of edges.
    pub fn edge_count(&self) -> usize {
        self.inner.edge_count()
    }

    /// Iterate over all nodes.
    pub fn all_nodes(&self) -> impl Iterator<Item = (NodeId, &GraphNode)> {
        self.inner
            .node_indices()
            .filter_map(move |idx| self.inner.node_weight(idx).map(|n| (node_id(idx), n)))
    }

    /// Iterate over all edges.
    pub fn all_edges(&self) -> impl Iterator<Item = (EdgeId, &GraphEdge)> {
        self.inner
            .edge_indices()
            .filter_map(move |idx| self.inner.edge_weight(idx).map(|e| (edge_id(idx), e)))
    }

    /// Find a node by its full path.
    pub fn lookup(&self, path: &str) -> Option<NodeId> {
        self.paths.get(path).copied()
    }

    /// Find a project by name.
    pub fn project_by_name(&self, name: &str) -> Option<NodeId> {
        self.lookup(name)
            .filter(|&id| self.kind(id) == Some(NodeKind::Project))
    }

    pub fn kind(&self, id: NodeId) -> Option<NodeKind> {
        self.node(id).map(GraphNode::kind)
    }

    pub fn path(&self, id: NodeId) -> Option<&str> {
        self.node(id).map(|n| n.path.as_str())
    }

    pub fn parent_edge(&self, id: NodeId) -> Option<EdgeId> {
        self.node(id).and_then(|n| n.parent_edge)
    }

    /// Structural parent. `None` for the root.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.parent_edge(id)
            .and_then(|e| self.edge(e))
            .map(|e| e.target)
    }

    fn edges_directed(&self, id: NodeId, direction: Direction, kind: EdgeKind) -> Vec<EdgeId> {
        let mut edges: Vec<EdgeId> = self
            .inner
            .edges_directed(node_index(id), direction)
            .filter(|e| e.weight().kind == kind)
            .map(|e| edge_id(e.id()))
            .collect();
        edges.sort_unstable();
        edges
    }

    /// Parent edges of every child ever attached to `id`, in creation order.
    pub fn child_edges(&self, id: NodeId) -> Vec<EdgeId> {
        self.edges_directed(id, Direction::Incoming, EdgeKind::Parent)
    }

    /// Every child ever attached to `id`, regardless of existence.
    pub fn child_nodes(&self, id: NodeId) -> Vec<NodeId> {
        self.child_edges(id)
            .into_iter()
            .filter_map(|e| self.edge(e).map(|e| e.source))
            .collect()
    }

    /// Outgoing edges of one kind.
    pub fn outgoing(&self, id: NodeId, kind: EdgeKind) -> Vec<EdgeId> {
        self.edges_directed(id, Direction::Outgoing, kind)
    }

    /// Outgoing edges of all four dependency kinds.
    pub fn dependency_edges(&self, id: NodeId) -> Vec<EdgeId> {
        EdgeKind::DEPENDENCIES
            .iter()
            .flat_map(|&kind| self.outgoing(id, kind))
            .collect()
    }

    /// Check if an edge of a specific kind exists between two nodes.
    pub fn find_edge(&self, source: NodeId, target: NodeId, kind: EdgeKind) -> Option<EdgeId> {
        self.inner
            .edges_directed(node_index(source), Direction::Outgoing)
            .find(|e| e.target() == node_index(target) && e.weight().kind == kind)
            .map(|e| edge_id(e.id()))
    }

    /// The project containing `id` (itself for a project). `None` for the root.
    pub fn project_of(&self, id: NodeId) -> Option<NodeId> {
        let mut current = id;
        loop {
            match self.kind(current)? {
                NodeKind::Root => return None,
                NodeKind::Project => return Some(current),
                _ => current = self.parent(current)?,
            }
        }
    }

    /// The project whose version space an edge's timeline lives in.
    pub fn edge_project(&self, edge: EdgeId) -> Option<NodeId> {
        self.edge(edge).and_then(|e| self.project_of(e.source))
    }

    /// Strict ancestors of `id`, nearest first, excluding the root.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut ancestors = Vec::new();
        let mut current = self.parent(id);
        while let Some(node) = current {
            if node == self.root {
                break;
            }
            ancestors.push(node);
            current = self.parent(node);
        }
        ancestors
    }

    /// Nearest strict ancestor of the given kind.
    pub fn nearest_ancestor_of_kind(&self, id: NodeId, kind: NodeKind) -> Option<NodeId> {
        self.ancestors(id)
            .into_iter()
            .find(|&a| self.kind(a) == Some(kind))
    }

    /// Whether `ancestor` is `node` or one of its ancestors.
    pub fn is_ancestor_or_self(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(n) = current {
            if n == ancestor {
                return true;
            }
            current = self.parent(n);
        }
        false
    }

    /// Whether two nodes lie on the same containment chain.
    pub fn same_chain(&self, a: NodeId, b: NodeId) -> bool {
        self.is_ancestor_or_self(a, b) || self.is_ancestor_or_self(b, a)
    }

    pub(crate) fn child_path(&self, parent: NodeId, sub_path: &str) -> String {
        match self.path(parent) {
            Some(p) if !p.is_empty() => format!("{}.{}", p, sub_path),
            _ => sub_path.to_string(),
        }
    }

    /// Attach a new child. Does not check for an existing child of that name.
    pub(crate) fn create_child(&mut self, parent: NodeId, kind: NodeKind, name: &str) -> Result<NodeId> {
        let parent_kind = self.kind(parent).ok_or(GraphError::UnknownNode(parent))?;
        let path = self.child_path(parent, name);
        if !parent_kind.can_contain(kind) {
            return Err(GraphError::StructuralType {
                parent: parent_kind,
                path,
                leaf: kind,
            });
        }

        let idx = self.inner.add_node(GraphNode {
            name: name.to_string(),
            path: path.clone(),
            parent_edge: None,
            detail: NodeDetail::for_kind(kind),
        });
        let child = node_id(idx);
        let edge = self.insert_edge(GraphEdge::new(child, parent, EdgeKind::Parent));
        if let Some(node) = self.node_mut(child) {
            node.parent_edge = Some(edge);
        }
        tracing::trace!("Created {} `{}`", kind, path);
        self.paths.insert(path, child);
        Ok(child)
    }

    /// Flag a project as analyzed by this system (as opposed to only referenced).
    pub fn set_internal(&mut self, project: NodeId, internal: bool) -> Result<()> {
        match self.node_mut(project).map(|n| &mut n.detail) {
            Some(NodeDetail::Project { is_internal, .. }) => {
                *is_internal = internal;
                Ok(())
            }
            Some(_) => Err(GraphError::NotAProject(project)),
            None => Err(GraphError::UnknownNode(project)),
        }
    }

    /// Flag a class as a service. Ignored for other kinds.
    pub fn set_service(&mut self, class: NodeId, service: bool) {
        if let Some(NodeDetail::Class { is_service }) = self.node_mut(class).map(|n| &mut n.detail) {
            *is_service = service;
        }
    }
}

impl Default for VersionedGraph {
    fn default() -> Self {
        Self::new()
    }
}
