//! Per-run producer context
//!
//! An [`AnalysisRun`] binds a graph to the project and version being
//! analyzed, so producers never pass the current version around themselves.

use crate::error::Result;
use crate::graph::VersionedGraph;
use crate::manifest::project_segment;
use crate::model::{EdgeId, NodeId, NodeKind};
use crate::version::Version;

/// Attributes a producer may attach to a node it reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NodeAttributes {
    pub is_service: bool,
}

/// Operations through which producers report facts about one version.
pub trait FactSink {
    /// The version facts are recorded for.
    fn version(&self) -> Version;

    /// Find or create the node at `path` and confirm it (and its ancestors).
    fn ensure_node(&mut self, path: &str, kind: NodeKind, attrs: NodeAttributes) -> Result<NodeId>;

    /// Confirm a dependency from `from` on the node at `to_path`.
    fn record_dependency(&mut self, from: NodeId, to_path: &str, to_kind: NodeKind) -> Result<Option<EdgeId>>;

    /// Mark every direct child of `scope` absent until it is reported again.
    fn reset_children_presence(&mut self, scope: NodeId) -> Result<()>;

    fn record_manifest_dependency(&mut self, remote_name: &str, remote_version: &str) -> Result<Option<EdgeId>>;

    fn reset_manifest_dependencies(&mut self) -> Result<()>;
}

/// One analysis of one project version.
pub struct AnalysisRun<'g> {
    graph: &'g mut VersionedGraph,
    project: NodeId,
    version: Version,
}

impl<'g> AnalysisRun<'g> {
    /// Find or create the project, mark it internal and append `version_name`.
    pub fn begin(graph: &'g mut VersionedGraph, project_name: &str, version_name: &str) -> Result<Self> {
        let root = graph.root();
        let project = graph.find_or_create(root, &project_segment(project_name), None, NodeKind::Project)?;
        graph.set_internal(project, true)?;
        let version = graph.begin_version(project, version_name)?;
        tracing::info!("Analyzing {}", graph.describe_version(version));
        Ok(AnalysisRun {
            graph,
            project,
            version,
        })
    }

    pub fn project(&self) -> NodeId {
        self.project
    }

    pub fn graph(&self) -> &VersionedGraph {
        self.graph
    }
}

impl FactSink for AnalysisRun<'_> {
    fn version(&self) -> Version {
        self.version
    }

    fn ensure_node(&mut self, path: &str, kind: NodeKind, attrs: NodeAttributes) -> Result<NodeId> {
        let root = self.graph.root();
        let node = self.graph.find_or_create(root, path, Some(self.version), kind)?;
        if attrs.is_service {
            self.graph.set_service(node, true);
        }
        Ok(node)
    }

    fn record_dependency(&mut self, from: NodeId, to_path: &str, to_kind: NodeKind) -> Result<Option<EdgeId>> {
        self.graph.record_dependency(from, to_path, to_kind, self.version)
    }

    fn reset_children_presence(&mut self, scope: NodeId) -> Result<()> {
        self.graph.reset_children_presence(scope, self.version)
    }

    fn record_manifest_dependency(&mut self, remote_name: &str, remote_version: &str) -> Result<Option<EdgeId>> {
        self.graph
            .add_manifest_dependency(self.project, remote_name, remote_version, self.version)
    }

    fn reset_manifest_dependencies(&mut self) -> Result<()> {
        self.graph.reset_manifest_dependencies(self.project, self.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GraphError;

    #[test]
    fn begin_marks_project_internal() {
        let mut graph = VersionedGraph::new();
        let run = AnalysisRun::begin(&mut graph, "com.acme.shop", "1.0").unwrap();
        let project = run.project();
        let version = run.version();

        assert_eq!(graph.path(project), Some("com-acme-shop"));
        assert!(graph.node(project).unwrap().is_internal());
        assert_eq!(graph.version_name(version), Some("1.0"));
    }

    #[test]
    fn repeated_version_is_rejected() {
        let mut graph = VersionedGraph::new();
        AnalysisRun::begin(&mut graph, "shop", "1").unwrap();
        assert!(matches!(
            AnalysisRun::begin(&mut graph, "shop", "1"),
            Err(GraphError::DuplicateVersion { .. })
        ));
    }

    #[test]
    fn service_attribute_is_recorded() {
        let mut graph = VersionedGraph::new();
        let mut run = AnalysisRun::begin(&mut graph, "shop", "1").unwrap();
        let class = run
            .ensure_node("shop.orders.OrderService", NodeKind::Class, NodeAttributes { is_service: true })
            .unwrap();
        let plain = run
            .ensure_node("shop.orders.Order", NodeKind::Class, NodeAttributes::default())
            .unwrap();
        let v = run.version();

        assert!(graph.node(class).unwrap().is_service());
        assert!(!graph.node(plain).unwrap().is_service());
        assert!(graph.exists(class, v));
    }
}
