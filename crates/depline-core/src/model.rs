//! Core data structures for the versioned dependency graph

use serde::{Deserialize, Serialize};

use crate::timeline::{Timeline, VersionIdx};
use crate::version::VersionSequence;

/// Schema constant carried by the root node and every persisted snapshot.
pub const SCHEMA_VERSION: u32 = 1;

/// Stable identifier for a node (index into the graph arena).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct NodeId(pub u64);

/// Stable identifier for an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct EdgeId(pub u64);

/// Structural kind of a node. The order is the containment order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Root,
    Project,
    Package,
    Class,
    Method,
}

impl NodeKind {
    /// Whether a node of this kind may directly contain a node of `child` kind.
    pub fn can_contain(self, child: NodeKind) -> bool {
        matches!(
            (self, child),
            (NodeKind::Root, NodeKind::Project)
                | (NodeKind::Project, NodeKind::Package)
                | (NodeKind::Project, NodeKind::Class)
                | (NodeKind::Package, NodeKind::Package)
                | (NodeKind::Package, NodeKind::Class)
                | (NodeKind::Class, NodeKind::Class)
                | (NodeKind::Class, NodeKind::Method)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Root => "root",
            NodeKind::Project => "project",
            NodeKind::Package => "package",
            NodeKind::Class => "class",
            NodeKind::Method => "method",
        }
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for NodeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "root" => Ok(NodeKind::Root),
            "project" => Ok(NodeKind::Project),
            "package" => Ok(NodeKind::Package),
            "class" => Ok(NodeKind::Class),
            "method" => Ok(NodeKind::Method),
            other => Err(format!("unknown node kind `{}`", other)),
        }
    }
}

/// Per-kind payload. The node kind is derived from the variant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum NodeDetail {
    Root { schema_version: u32 },
    Project { is_internal: bool, versions: VersionSequence },
    Package,
    Class { is_service: bool },
    Method,
}

impl NodeDetail {
    /// Fresh payload for a newly created node of `kind`.
    pub fn for_kind(kind: NodeKind) -> Self {
        match kind {
            NodeKind::Root => NodeDetail::Root { schema_version: SCHEMA_VERSION },
            NodeKind::Project => NodeDetail::Project {
                is_internal: false,
                versions: VersionSequence::new(),
            },
            NodeKind::Package => NodeDetail::Package,
            NodeKind::Class => NodeDetail::Class { is_service: false },
            NodeKind::Method => NodeDetail::Method,
        }
    }
}

/// A single node in the graph.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GraphNode {
    /// Own path segment.
    pub name: String,
    /// Dot-joined ancestor names plus own name. Empty for the root.
    pub path: String,
    /// Structural parent edge. `None` only for the root.
    pub parent_edge: Option<EdgeId>,
    pub detail: NodeDetail,
}

impl GraphNode {
    pub fn kind(&self) -> NodeKind {
        match self.detail {
            NodeDetail::Root { .. } => NodeKind::Root,
            NodeDetail::Project { .. } => NodeKind::Project,
            NodeDetail::Package => NodeKind::Package,
            NodeDetail::Class { .. } => NodeKind::Class,
            NodeDetail::Method => NodeKind::Method,
        }
    }

    /// Version sequence of a project node.
    pub fn versions(&self) -> Option<&VersionSequence> {
        match &self.detail {
            NodeDetail::Project { versions, .. } => Some(versions),
            _ => None,
        }
    }

    pub fn is_internal(&self) -> bool {
        matches!(self.detail, NodeDetail::Project { is_internal: true, .. })
    }

    pub fn is_service(&self) -> bool {
        matches!(self.detail, NodeDetail::Class { is_service: true })
    }
}

/// What kind of relationship an edge represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EdgeKind {
    // ── Structural ──────────────────────────────────────────
    /// Child to parent.
    Parent,

    // ── Dependencies, keyed by target kind ──────────────────
    ProjectDependency,
    PackageDependency,
    ClassDependency,
    MethodDependency,

    // ── Build manifest ──────────────────────────────────────
    /// Project to project, with a remote version per local version.
    ManifestDependency,
}

impl EdgeKind {
    /// The four dependency kinds, in target order.
    pub const DEPENDENCIES: [EdgeKind; 4] = [
        EdgeKind::ProjectDependency,
        EdgeKind::PackageDependency,
        EdgeKind::ClassDependency,
        EdgeKind::MethodDependency,
    ];

    /// Dependency edge kind for a target of the given kind.
    pub fn dependency_to(target: NodeKind) -> Option<Self> {
        match target {
            NodeKind::Root => None,
            NodeKind::Project => Some(EdgeKind::ProjectDependency),
            NodeKind::Package => Some(EdgeKind::PackageDependency),
            NodeKind::Class => Some(EdgeKind::ClassDependency),
            NodeKind::Method => Some(EdgeKind::MethodDependency),
        }
    }

    pub fn is_dependency(self) -> bool {
        Self::DEPENDENCIES.contains(&self)
    }
}

/// A directed edge in the graph.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GraphEdge {
    pub source: NodeId,
    pub target: NodeId,
    pub kind: EdgeKind,
    /// Sparse existence markers in the source project's version space.
    pub presence: Timeline<bool>,
    /// Remote version per local version. Only used by manifest edges.
    pub remote_versions: Timeline<Option<VersionIdx>>,
}

impl GraphEdge {
    pub fn new(source: NodeId, target: NodeId, kind: EdgeKind) -> Self {
        GraphEdge {
            source,
            target,
            kind,
            presence: Timeline::new(),
            remote_versions: Timeline::new(),
        }
    }

    /// The endpoint whose parent edge anchors this edge's default existence.
    pub fn owner(&self) -> NodeId {
        match self.kind {
            EdgeKind::Parent => self.target,
            _ => self.source,
        }
    }
}

/// A summary edge between two nodes of a collapsed view.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AggregatedEdge {
    /// The collapsed source node.
    pub source: NodeId,
    /// The collapsed target node.
    pub target: NodeId,
    /// How many underlying edges this represents.
    pub count: u32,
    /// Breakdown by edge kind.
    pub kind_counts: std::collections::BTreeMap<EdgeKind, u32>,
    /// The underlying edge IDs (for drill-down).
    pub underlying_edge_ids: Vec<EdgeId>,
}
