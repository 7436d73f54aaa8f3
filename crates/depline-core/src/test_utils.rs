//! Test utilities for Depline

use crate::context::{AnalysisRun, FactSink, NodeAttributes};
use crate::graph::VersionedGraph;
use crate::model::{EdgeId, NodeKind};
use crate::version::Version;

/// One analyzed unit: a class and the classes it depends on.
pub struct ClassFacts<'a> {
    pub path: &'a str,
    pub depends_on: &'a [&'a str],
}

/// Analyze one version of `project` the way an indexer does: mark the
/// project's children absent, then confirm every reported class and edge.
pub fn scan(graph: &mut VersionedGraph, project: &str, version: &str, classes: &[ClassFacts<'_>]) -> Version {
    let mut run = AnalysisRun::begin(graph, project, version).unwrap();
    let scope = run.project();
    run.reset_children_presence(scope).unwrap();
    for class in classes {
        let node = run
            .ensure_node(class.path, NodeKind::Class, NodeAttributes::default())
            .unwrap();
        for target in class.depends_on {
            run.record_dependency(node, target, NodeKind::Class).unwrap();
        }
    }
    run.version()
}

/// Paths of the own class dependencies of `from` existing at `at`.
pub fn class_targets(graph: &VersionedGraph, from: &str, at: Version) -> Vec<String> {
    let Some(node) = graph.lookup(from) else {
        return Vec::new();
    };
    let mut targets: Vec<String> = graph
        .own_dependencies(node, NodeKind::Class, Some(at))
        .into_iter()
        .filter_map(|t| graph.path(t).map(str::to_string))
        .collect();
    targets.sort();
    targets
}

/// A project with one class `A` depending on `B`, confirmed at the first of
/// `versions` versions and carried forward from there.
pub fn single_edge_graph(versions: usize) -> (VersionedGraph, EdgeId, Vec<Version>) {
    let mut graph = VersionedGraph::new();
    let root = graph.root();
    let project = graph.find_or_create(root, "p", None, NodeKind::Project).unwrap();
    let versions: Vec<Version> = (0..versions)
        .map(|i| graph.begin_version(project, &format!("{}", i + 1)).unwrap())
        .collect();
    let a = graph.find_or_create(root, "p.A", Some(versions[0]), NodeKind::Class).unwrap();
    let edge = graph
        .record_dependency(a, "p.B", NodeKind::Class, versions[0])
        .unwrap()
        .unwrap();
    (graph, edge, versions)
}
