//! Path-based lookup and creation of nodes

use crate::error::{GraphError, Result};
use crate::graph::VersionedGraph;
use crate::model::{NodeId, NodeKind};
use crate::version::Version;

/// Split off the first path segment. Segments are separated by `.`, or by `$`
/// between a class and its nested class. An opening parenthesis before the
/// first separator means the remainder is a single method segment.
pub fn split_segment(path: &str) -> (&str, &str) {
    let paren = path.find('(');
    match path.find(['.', '$']) {
        Some(sep) if paren.is_none_or(|p| sep < p) => (&path[..sep], &path[sep + 1..]),
        _ => (path, ""),
    }
}

/// Kind of the next node below a `current` node on the way to a `leaf` at `sub_path`.
/// `None` when the leaf cannot be reached from there.
pub fn next_segment_kind(current: NodeKind, sub_path: &str, leaf: NodeKind) -> Option<NodeKind> {
    let bare = sub_path.split_once('(').map_or(sub_path, |(head, _)| head);
    let segments = bare.split('.').count();

    if leaf < current {
        return None;
    }
    if segments == 1 {
        // `Outer$Inner`: the head encloses the rest
        return Some(if bare.contains('$') && leaf >= NodeKind::Class {
            NodeKind::Class
        } else {
            leaf
        });
    }
    match current {
        NodeKind::Root => Some(NodeKind::Project),
        NodeKind::Project | NodeKind::Package => {
            if segments == 2 && leaf == NodeKind::Method {
                Some(NodeKind::Class)
            } else {
                Some(NodeKind::Package)
            }
        }
        // a method is always the last segment
        NodeKind::Class => Some(NodeKind::Class),
        NodeKind::Method => None,
    }
}

/// When the nodes on a descended path are confirmed.
#[derive(Debug, Clone, Copy)]
enum Confirm {
    At(Version),
    Latest,
    Never,
}

impl VersionedGraph {
    /// Direct child named `name`, existing at `at` (at any time when `None`).
    pub fn child_named(&self, parent: NodeId, name: &str, at: Option<Version>) -> Option<NodeId> {
        self.child_nodes(parent).into_iter().find(|&child| {
            self.node(child).is_some_and(|n| n.name == name)
                && at.is_none_or(|v| self.exists(child, v))
        })
    }

    /// Direct children existing at `at` (all known children when `None`).
    pub fn children(&self, parent: NodeId, at: Option<Version>) -> Vec<NodeId> {
        self.child_nodes(parent)
            .into_iter()
            .filter(|&child| at.is_none_or(|v| self.exists(child, v)))
            .collect()
    }

    /// Descend `sub_path` from `start`. Absence is not an error.
    pub fn find(&self, start: NodeId, sub_path: &str, at: Option<Version>) -> Option<NodeId> {
        if sub_path.is_empty() {
            return Some(start);
        }
        let (head, rest) = split_segment(sub_path);
        let child = self.child_named(start, head, at)?;
        self.find(child, rest, at)
    }

    /// Descend `sub_path` from `start`, creating missing nodes on the way.
    ///
    /// Every node on the path is confirmed at `version`; `None` means the latest
    /// version of the project being descended (nothing is confirmed at the
    /// project level itself). New nodes below a project start out absent at
    /// their first version, so they never appear in history they were not part of.
    /// An existing node is returned as is even when its kind differs from `leaf`.
    pub fn find_or_create(
        &mut self,
        start: NodeId,
        sub_path: &str,
        version: Option<Version>,
        leaf: NodeKind,
    ) -> Result<NodeId> {
        let confirm = version.map_or(Confirm::Latest, Confirm::At);
        self.descend(start, sub_path, confirm, leaf)
    }

    /// Like [`find_or_create`](Self::find_or_create), but nothing on the path is
    /// confirmed. Existing timelines are left untouched.
    pub fn find_or_create_unconfirmed(&mut self, start: NodeId, sub_path: &str, leaf: NodeKind) -> Result<NodeId> {
        self.descend(start, sub_path, Confirm::Never, leaf)
    }

    fn descend(&mut self, start: NodeId, sub_path: &str, confirm: Confirm, leaf: NodeKind) -> Result<NodeId> {
        if sub_path.is_empty() {
            return Ok(start);
        }
        let start_kind = self.kind(start).ok_or(GraphError::UnknownNode(start))?;
        let version = match confirm {
            Confirm::At(v) => Some(v),
            Confirm::Latest if start_kind != NodeKind::Root => self
                .project_of(start)
                .and_then(|p| self.latest_version(p)),
            Confirm::Latest | Confirm::Never => None,
        };

        let (head, rest) = split_segment(sub_path);
        let child = match self.child_named(start, head, None) {
            Some(child) => child,
            None => {
                let kind = next_segment_kind(start_kind, sub_path, leaf).ok_or_else(|| {
                    GraphError::StructuralType {
                        parent: start_kind,
                        path: self.child_path(start, sub_path),
                        leaf,
                    }
                })?;
                let child = self.create_child(start, kind, head)?;
                if start_kind != NodeKind::Root {
                    if let Some(first) = self.first_existence(child) {
                        self.set_exists(child, first, false)?;
                    }
                }
                child
            }
        };

        if let Some(v) = version.filter(|&v| self.applies_to(v, child)) {
            self.set_exists(child, v, true)?;
        }
        self.descend(child, rest, confirm, leaf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::plain("a.b.c", ("a", "b.c"))]
    #[case::single("a", ("a", ""))]
    #[case::method_last("m(a.B).x", ("m(a.B).x", ""))]
    #[case::method_after_dot("C.m(a.B)", ("C", "m(a.B)"))]
    #[case::nested_class("Outer$Inner.m()", ("Outer", "Inner.m()"))]
    #[case::dollar_in_parameters("m(a.B$C)", ("m(a.B$C)", ""))]
    #[case::empty("", ("", ""))]
    fn splits_segments(#[case] path: &str, #[case] expected: (&str, &str)) {
        assert_eq!(split_segment(path), expected);
    }

    #[rstest]
    #[case::project_from_root(NodeKind::Root, "p.a.C", NodeKind::Class, Some(NodeKind::Project))]
    #[case::package_default(NodeKind::Project, "a.b.C", NodeKind::Class, Some(NodeKind::Package))]
    #[case::class_before_method(NodeKind::Package, "C.m(x.Y)", NodeKind::Method, Some(NodeKind::Class))]
    #[case::package_before_class(NodeKind::Package, "b.C.m()", NodeKind::Method, Some(NodeKind::Package))]
    #[case::leaf(NodeKind::Class, "m()", NodeKind::Method, Some(NodeKind::Method))]
    #[case::nested_below_class(NodeKind::Class, "Inner.m()", NodeKind::Method, Some(NodeKind::Class))]
    #[case::enclosing_class(NodeKind::Package, "Outer$Inner", NodeKind::Class, Some(NodeKind::Class))]
    #[case::enclosing_class_of_method(NodeKind::Package, "Outer$Inner.m()", NodeKind::Method, Some(NodeKind::Class))]
    #[case::nothing_below_method(NodeKind::Method, "x.y", NodeKind::Method, None)]
    #[case::no_package_below_class(NodeKind::Class, "x.Y", NodeKind::Package, None)]
    #[case::leaf_above_current(NodeKind::Package, "a", NodeKind::Project, None)]
    fn infers_intermediate_kinds(
        #[case] current: NodeKind,
        #[case] sub_path: &str,
        #[case] leaf: NodeKind,
        #[case] expected: Option<NodeKind>,
    ) {
        assert_eq!(next_segment_kind(current, sub_path, leaf), expected);
    }

    #[test]
    fn find_or_create_is_stable() {
        let mut graph = VersionedGraph::new();
        let root = graph.root();
        let first = graph
            .find_or_create(root, "p.a.b.C.run(java.lang.String)", None, NodeKind::Method)
            .unwrap();
        let second = graph
            .find_or_create(root, "p.a.b.C.run(java.lang.String)", None, NodeKind::Method)
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(graph.kind(first), Some(NodeKind::Method));
        assert_eq!(graph.path(first), Some("p.a.b.C.run(java.lang.String)"));

        let class = graph.lookup("p.a.b.C").unwrap();
        assert_eq!(graph.kind(class), Some(NodeKind::Class));
        assert_eq!(graph.kind(graph.lookup("p.a.b").unwrap()), Some(NodeKind::Package));
        assert_eq!(graph.find(root, "p.a.b.C", None), Some(class));
        assert_eq!(graph.find(root, "p.a.x", None), None);
    }

    #[test]
    fn structural_error_leaves_graph_usable() {
        let mut graph = VersionedGraph::new();
        let root = graph.root();
        graph.find_or_create(root, "p.C", None, NodeKind::Class).unwrap();
        let before = graph.node_count();

        let err = graph
            .find_or_create(root, "p.C.sub.D", None, NodeKind::Package)
            .unwrap_err();
        assert!(matches!(err, GraphError::StructuralType { parent: NodeKind::Class, .. }));
        assert_eq!(graph.node_count(), before);
    }

    #[test]
    fn new_nodes_do_not_leak_into_history() {
        let mut graph = VersionedGraph::new();
        let root = graph.root();
        let p = graph.find_or_create(root, "p", None, NodeKind::Project).unwrap();
        let v1 = graph.begin_version(p, "1").unwrap();
        let old = graph.find_or_create(root, "p.Old", None, NodeKind::Class).unwrap();
        let v2 = graph.begin_version(p, "2").unwrap();
        let new = graph.find_or_create(root, "p.New", None, NodeKind::Class).unwrap();

        assert!(graph.exists(old, v1));
        assert!(graph.exists(old, v2));
        assert!(!graph.exists(new, v1));
        assert!(graph.exists(new, v2));
        assert_eq!(graph.first_existence(new), Some(v2));
        assert_eq!(graph.find(root, "p.New", Some(v1)), None);
        assert_eq!(graph.find(root, "p.New", Some(v2)), Some(new));
    }

    #[test]
    fn unversioned_project_gets_no_markers() {
        let mut graph = VersionedGraph::new();
        let root = graph.root();
        let class = graph
            .find_or_create(root, "ext.lib.Thing", None, NodeKind::Class)
            .unwrap();
        let edge = graph.parent_edge(class).unwrap();
        assert!(graph.edge(edge).unwrap().presence.is_empty());
    }

    #[test]
    fn nested_classes_are_children_of_their_outer_class() {
        let mut graph = VersionedGraph::new();
        let root = graph.root();
        let method = graph
            .find_or_create(root, "p.a.Outer$Inner.run()", None, NodeKind::Method)
            .unwrap();
        let outer = graph.lookup("p.a.Outer").unwrap();
        let inner = graph.lookup("p.a.Outer.Inner").unwrap();

        assert_eq!(graph.kind(outer), Some(NodeKind::Class));
        assert_eq!(graph.kind(inner), Some(NodeKind::Class));
        assert_eq!(graph.parent(inner), Some(outer));
        assert_eq!(graph.parent(method), Some(inner));
        assert_eq!(graph.path(method), Some("p.a.Outer.Inner.run()"));
        assert_eq!(graph.find(root, "p.a.Outer$Inner", None), Some(inner));
        assert_eq!(
            graph.find_or_create(root, "p.a.Outer.Inner", None, NodeKind::Class).unwrap(),
            inner
        );
    }

    #[test]
    fn unconfirmed_descent_keeps_existing_history() {
        let mut graph = VersionedGraph::new();
        let root = graph.root();
        let q = graph.find_or_create(root, "q", None, NodeKind::Project).unwrap();
        let v1 = graph.begin_version(q, "1").unwrap();
        let x = graph.find_or_create(root, "q.X", Some(v1), NodeKind::Class).unwrap();
        let v2 = graph.begin_version(q, "2").unwrap();
        graph.set_exists(x, v2, false).unwrap();

        assert_eq!(graph.find_or_create_unconfirmed(root, "q.X", NodeKind::Class).unwrap(), x);
        assert!(!graph.exists(x, v2));

        let y = graph.find_or_create_unconfirmed(root, "q.y.Y", NodeKind::Class).unwrap();
        assert!(!graph.exists(y, v1));
        assert!(!graph.exists(y, v2));
        assert_eq!(graph.first_existence(y), None);
    }
}
