//! Cross-module tests for depline-core

use crate::test_utils::{class_targets, scan, single_edge_graph, ClassFacts};
use crate::*;
use proptest::prelude::*;
use std::collections::BTreeSet;

fn two_scans() -> (VersionedGraph, Version, Version) {
    let mut graph = VersionedGraph::new();
    let v1 = scan(&mut graph, "P", "1.0", &[ClassFacts {
        path: "P.A",
        depends_on: &["P.B"],
    }]);
    let v2 = scan(&mut graph, "P", "2.0", &[ClassFacts {
        path: "P.A",
        depends_on: &["P.C"],
    }]);
    (graph, v1, v2)
}

#[test]
fn rescan_replaces_dependency() {
    let (graph, v1, v2) = two_scans();
    assert_eq!(class_targets(&graph, "P.A", v1), vec!["P.B"]);
    assert_eq!(class_targets(&graph, "P.A", v2), vec!["P.C"]);

    let engine = DiffEngine::new(&graph, Some(v1), v2).unwrap();
    let entries = engine.dependency_diff(AggregationOptions::none());
    let summary: Vec<_> = entries
        .iter()
        .map(|e| (e.start_path.as_str(), e.end_path.as_str(), e.change_status))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("P.A", "P.B", ChangeStatus::Removed),
            ("P.A", "P.C", ChangeStatus::Added),
        ]
    );
}

#[test]
fn diff_artifact_snapshot() {
    let (graph, v1, v2) = two_scans();
    let artifact = DiffEngine::new(&graph, Some(v1), v2)
        .unwrap()
        .artifact(AggregationOptions::none());
    insta::assert_json_snapshot!(artifact, @r#"
    {
      "projectName": "P",
      "versionName": "2.0",
      "dependencyEntries": [
        {
          "startType": "class",
          "startPath": "P.A",
          "startName": "A",
          "syntheticStart": false,
          "endType": "class",
          "endPath": "P.B",
          "endName": "B",
          "syntheticEnd": false,
          "changeStatus": "removed"
        },
        {
          "startType": "class",
          "startPath": "P.A",
          "startName": "A",
          "syntheticStart": false,
          "endType": "class",
          "endPath": "P.C",
          "endName": "C",
          "syntheticEnd": false,
          "changeStatus": "added"
        }
      ],
      "manifestEntries": []
    }
    "#);
}

#[test]
fn rescan_invalidates_unconfirmed_siblings() {
    let mut graph = VersionedGraph::new();
    let facts = |path| ClassFacts { path, depends_on: &[] };
    let v0 = scan(&mut graph, "P", "0", &[facts("P.A"), facts("P.B"), facts("P.C")]);
    let v1 = scan(&mut graph, "P", "1", &[facts("P.A")]);

    let [a, b, c] = ["P.A", "P.B", "P.C"].map(|p| graph.lookup(p).unwrap());
    assert!(graph.exists(a, v0) && graph.exists(b, v0) && graph.exists(c, v0));
    assert!(graph.exists(a, v1));
    assert!(!graph.exists(b, v1));
    assert!(!graph.exists(c, v1));
    assert_eq!(graph.last_existence(b), Some(v0));
}

#[test]
fn diff_from_nothing_lists_existing_dependencies() {
    let (graph, _, v2) = two_scans();
    let engine = DiffEngine::new(&graph, None, v2).unwrap();

    let plain = engine.dependency_diff(AggregationOptions::none());
    assert!(plain.iter().all(|e| e.change_status == ChangeStatus::Added));
    let plain_keys: BTreeSet<(String, String)> = plain
        .iter()
        .map(|e| (e.start_path.clone(), e.end_path.clone()))
        .collect();

    let own: BTreeSet<(String, String)> = graph
        .all_edges()
        .filter(|(id, e)| e.kind.is_dependency() && graph.edge_exists(*id, v2))
        .map(|(_, e)| {
            (
                graph.path(e.source).unwrap().to_string(),
                graph.path(e.target).unwrap().to_string(),
            )
        })
        .collect();
    assert_eq!(plain_keys, own);

    let aggregated = engine.dependency_diff(AggregationOptions::all());
    assert!(aggregated.len() > plain.len());
    assert!(aggregated
        .iter()
        .filter(|e| !e.synthetic_start && !e.synthetic_end)
        .all(|e| plain_keys.contains(&(e.start_path.clone(), e.end_path.clone()))));
}

#[test]
fn node_existence_follows_parent_edge() {
    let (graph, v1, v2) = two_scans();
    let root = graph.root();
    for v in [v1, v2] {
        assert!(graph.exists(root, v));
        for (id, node) in graph.all_nodes() {
            if let Some(edge) = node.parent_edge {
                assert_eq!(graph.exists(id, v), graph.edge_exists(edge, v), "{}", node.path);
            }
        }
    }
}

#[test]
fn snapshot_round_trip_keeps_diff() {
    let dir = tempfile::TempDir::new().unwrap();
    let (graph, v1, v2) = two_scans();
    let before = DiffEngine::new(&graph, Some(v1), v2)
        .unwrap()
        .artifact(AggregationOptions::all());

    save_graph(&graph, dir.path(), StoreFormat::Bincode).unwrap();
    let loaded = load_graph(dir.path(), StoreFormat::Bincode).unwrap().unwrap();
    let p = loaded.project_by_name("P").unwrap();
    let from = loaded.version(p, "1.0").unwrap();
    let to = loaded.version(p, "2.0").unwrap();
    let after = DiffEngine::new(&loaded, Some(from), to)
        .unwrap()
        .artifact(AggregationOptions::all());
    assert_eq!(before, after);
}

#[test]
fn dependency_on_another_project_keeps_its_history() {
    let mut graph = VersionedGraph::new();
    let facts = |path| ClassFacts { path, depends_on: &[] };
    let q1 = scan(&mut graph, "q", "1", &[facts("q.X")]);
    let q2 = scan(&mut graph, "q", "2", &[facts("q.Y")]);
    let x = graph.lookup("q.X").unwrap();
    assert!(!graph.exists(x, q2));

    let p1 = scan(&mut graph, "p", "1", &[ClassFacts {
        path: "p.A",
        depends_on: &["q.X", "q.Z"],
    }]);
    assert!(graph.exists(x, q1));
    assert!(!graph.exists(x, q2));
    let z = graph.lookup("q.Z").unwrap();
    assert!(!graph.exists(z, q1));
    assert!(!graph.exists(z, q2));
    assert_eq!(class_targets(&graph, "p.A", p1), vec!["q.X", "q.Z"]);
}

#[test]
fn nested_class_dependencies_roll_up_to_outer_class() {
    let mut graph = VersionedGraph::new();
    let v1 = scan(&mut graph, "P", "1", &[
        ClassFacts { path: "P.a.Outer", depends_on: &[] },
        ClassFacts { path: "P.a.Outer$Inner", depends_on: &[] },
    ]);
    let v2 = scan(&mut graph, "P", "2", &[
        ClassFacts { path: "P.a.Outer", depends_on: &[] },
        ClassFacts { path: "P.a.Outer$Inner", depends_on: &["P.b.B"] },
    ]);
    let inner = graph.lookup("P.a.Outer.Inner").unwrap();
    assert_eq!(graph.parent(inner), graph.lookup("P.a.Outer"));
    assert!(graph.exists(inner, v1) && graph.exists(inner, v2));

    let options = AggregationOptions {
        aggregate_start: true,
        aggregate_end: false,
    };
    let entries = DiffEngine::new(&graph, Some(v1), v2)
        .unwrap()
        .dependency_diff(options);
    let starts: Vec<(&str, bool)> = entries
        .iter()
        .filter(|e| e.end_path == "P.b.B" && e.change_status == ChangeStatus::Added)
        .map(|e| (e.start_path.as_str(), e.synthetic_start))
        .collect();
    assert_eq!(
        starts,
        vec![
            ("P", true),
            ("P.a", true),
            ("P.a.Outer", true),
            ("P.a.Outer.Inner", false),
        ]
    );
}

fn effective(graph: &VersionedGraph, edge: EdgeId, versions: &[Version]) -> Vec<bool> {
    versions.iter().map(|&v| graph.edge_exists(edge, v)).collect()
}

proptest! {
    #[test]
    fn presence_edits_are_idempotent_and_minimal(
        ops in prop::collection::vec((0usize..5, any::<bool>()), 1..16)
    ) {
        let (mut graph, edge, versions) = single_edge_graph(5);

        for (i, desired) in ops {
            let before = effective(&graph, edge, &versions);
            let next_marker = graph
                .edge(edge)
                .unwrap()
                .presence
                .next_after(versions[i].idx)
                .map_or(versions.len(), |(idx, _)| idx.index());

            graph.set_edge_exists(edge, versions[i], desired).unwrap();
            let once = graph.edge(edge).unwrap().presence.clone();
            graph.set_edge_exists(edge, versions[i], desired).unwrap();
            prop_assert_eq!(&once, &graph.edge(edge).unwrap().presence);

            let after = effective(&graph, edge, &versions);
            for (j, value) in after.iter().enumerate() {
                if j < i || j >= next_marker {
                    prop_assert_eq!(*value, before[j]);
                } else {
                    prop_assert_eq!(*value, desired);
                }
            }

            for (idx, _) in once.iter() {
                let mut pruned = graph.clone();
                pruned.edge_mut(edge).unwrap().presence.remove(idx);
                let at = versions[idx.index()];
                prop_assert_ne!(pruned.edge_exists(edge, at), graph.edge_exists(edge, at));
            }
        }
    }

    #[test]
    fn find_or_create_returns_same_node(
        segments in prop::collection::vec("[a-z]{1,4}", 2..6)
    ) {
        let mut graph = VersionedGraph::new();
        let root = graph.root();
        let path = segments.join(".");
        let first = graph.find_or_create(root, &path, None, NodeKind::Class).unwrap();
        let count = graph.node_count();
        let second = graph.find_or_create(root, &path, None, NodeKind::Class).unwrap();

        prop_assert_eq!(first, second);
        prop_assert_eq!(graph.node_count(), count);
        prop_assert_eq!(graph.path(first), Some(path.as_str()));
        prop_assert_eq!(graph.find(root, &path, None), Some(first));
    }

    #[test]
    fn nested_edits_stay_local_and_minimal(edits in prop::collection::vec(edit(), 1..12)) {
        let mut f = nested_graph();
        let foreign: Vec<Version> = f.graph.versions(f.foreign);

        for edit in edits {
            let before = f.graph.clone();
            let at = apply(&mut f, &edit);
            let once = f.graph.clone();
            apply(&mut f, &edit);
            prop_assert_eq!(timelines(&once), timelines(&f.graph));

            for (id, edge) in before.all_edges() {
                let Some(project) = before.edge_project(id) else {
                    continue;
                };
                let checked: &[Version] = if project == f.project {
                    &f.versions[..at]
                } else if project == f.foreign {
                    &foreign
                } else {
                    &[]
                };
                for &v in checked {
                    prop_assert_eq!(
                        before.edge_exists(id, v),
                        f.graph.edge_exists(id, v),
                        "{:?} of {} changed at {:?}", edge.kind, before.path(edge.source).unwrap_or_default(), v
                    );
                }
            }

            let edges: Vec<EdgeId> = f.graph.all_edges().map(|(id, _)| id).collect();
            for id in edges {
                let written: Vec<(VersionIdx, bool)> = f.graph.edge(id).unwrap().presence.iter()
                    .map(|(idx, value)| (idx, *value))
                    .filter(|(idx, value)| {
                        before.edge(id).and_then(|e| e.presence.get(*idx)) != Some(value)
                    })
                    .collect();
                for (idx, value) in written {
                    f.graph.edge_mut(id).unwrap().presence.remove(idx);
                    let without = f.graph.presence_at(id, idx);
                    f.graph.edge_mut(id).unwrap().presence.insert(idx, value);
                    prop_assert_ne!(without, value);
                }
            }

            let manifest = f.graph.manifest_edges(f.project);
            for &edge in &manifest {
                let remote = &f.graph.edge(edge).unwrap().remote_versions;
                for (idx, value) in remote.iter() {
                    let previous = idx
                        .previous()
                        .and_then(|prev| remote.latest_at_or_before(prev))
                        .and_then(|(_, r)| *r);
                    prop_assert_ne!(previous, *value);
                }
                for &v in &f.versions {
                    prop_assert_eq!(
                        f.graph.edge_exists(edge, v),
                        f.graph.manifest_version_at(edge, Some(v)).is_some()
                    );
                }
            }
        }
    }
}

/// Nodes of the nested fixture, created in this order.
const NESTED: [(&str, NodeKind); 6] = [
    ("p.a", NodeKind::Package),
    ("p.a.A", NodeKind::Class),
    ("p.a.B", NodeKind::Class),
    ("p.a.A.m()", NodeKind::Method),
    ("p.a.A$In", NodeKind::Class),
    ("p.a.A$In.n()", NodeKind::Method),
];

struct Nested {
    graph: VersionedGraph,
    project: NodeId,
    foreign: NodeId,
    versions: Vec<Version>,
    nodes: Vec<NodeId>,
    dependencies: Vec<EdgeId>,
}

/// Project `p` with four versions, the `NESTED` tree and two dependencies
/// confirmed at its first version, one of them on class `X` of project `q`.
fn nested_graph() -> Nested {
    let mut graph = VersionedGraph::new();
    let root = graph.root();
    let foreign = graph.find_or_create(root, "q", None, NodeKind::Project).unwrap();
    let q1 = graph.begin_version(foreign, "q1").unwrap();
    graph.find_or_create(root, "q.X", Some(q1), NodeKind::Class).unwrap();
    let q2 = graph.begin_version(foreign, "q2").unwrap();
    graph.find_or_create(root, "q.Y", Some(q2), NodeKind::Class).unwrap();

    let project = graph.find_or_create(root, "p", None, NodeKind::Project).unwrap();
    let versions: Vec<Version> = (1..=4)
        .map(|i| graph.begin_version(project, &i.to_string()).unwrap())
        .collect();
    let nodes: Vec<NodeId> = NESTED
        .iter()
        .map(|&(path, kind)| graph.find_or_create(root, path, Some(versions[0]), kind).unwrap())
        .collect();
    let dependencies = vec![
        graph.record_dependency(nodes[1], "p.a.B", NodeKind::Class, versions[0]).unwrap().unwrap(),
        graph.record_dependency(nodes[3], "q.X", NodeKind::Class, versions[0]).unwrap().unwrap(),
    ];
    Nested {
        graph,
        project,
        foreign,
        versions,
        nodes,
        dependencies,
    }
}

#[derive(Debug, Clone)]
enum Edit {
    Node(usize, usize, bool),
    Dependency(usize, usize, bool),
    /// `None` resets every declaration at that version.
    Manifest(usize, Option<u8>),
}

fn edit() -> impl Strategy<Value = Edit> {
    prop_oneof![
        (0..NESTED.len(), 0usize..4, any::<bool>()).prop_map(|(n, v, b)| Edit::Node(n, v, b)),
        (0usize..2, 0usize..4, any::<bool>()).prop_map(|(d, v, b)| Edit::Dependency(d, v, b)),
        (0usize..4, prop::option::of(1u8..4)).prop_map(|(v, r)| Edit::Manifest(v, r)),
    ]
}

/// Apply one edit and return the position of the version it wrote.
fn apply(f: &mut Nested, edit: &Edit) -> usize {
    match *edit {
        Edit::Node(n, v, desired) => {
            f.graph.set_exists(f.nodes[n], f.versions[v], desired).unwrap();
            v
        }
        Edit::Dependency(d, v, desired) => {
            f.graph.set_edge_exists(f.dependencies[d], f.versions[v], desired).unwrap();
            v
        }
        Edit::Manifest(v, Some(remote)) => {
            f.graph
                .add_manifest_dependency(f.project, "r", &remote.to_string(), f.versions[v])
                .unwrap();
            v
        }
        Edit::Manifest(v, None) => {
            f.graph.reset_manifest_dependencies(f.project, f.versions[v]).unwrap();
            v
        }
    }
}

fn timelines(graph: &VersionedGraph) -> Vec<(EdgeId, Timeline<bool>, Timeline<Option<VersionIdx>>)> {
    graph
        .all_edges()
        .map(|(id, e)| (id, e.presence.clone(), e.remote_versions.clone()))
        .collect()
}
