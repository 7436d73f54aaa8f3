//! Dependency diff between two versions of a project

use crate::error::{GraphError, Result};
use crate::graph::VersionedGraph;
use crate::model::{NodeId, NodeKind};
use crate::version::Version;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Which synthesized roll-up entries to add to each dependency set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AggregationOptions {
    /// Repeat descendants' dependencies at every enclosing node.
    pub aggregate_start: bool,
    /// Repeat each dependency towards every ancestor of its target.
    pub aggregate_end: bool,
}

impl AggregationOptions {
    pub fn all() -> Self {
        AggregationOptions {
            aggregate_start: true,
            aggregate_end: true,
        }
    }

    pub fn none() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeStatus {
    Added,
    Removed,
}

/// One changed dependency. Identity is `(start_path, end_path)`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DependencyEntry {
    pub start_type: NodeKind,
    pub start_path: String,
    pub start_name: String,
    pub synthetic_start: bool,
    pub end_type: NodeKind,
    pub end_path: String,
    pub end_name: String,
    pub synthetic_end: bool,
    pub change_status: ChangeStatus,
}

impl DependencyEntry {
    pub fn key(&self) -> (&str, &str) {
        (&self.start_path, &self.end_path)
    }
}

/// One changed manifest dependency, per remote project.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ManifestEntry {
    pub to_project: String,
    /// `None` when the dependency was dropped.
    pub new_version: Option<String>,
    /// The dependency existed on both sides with different versions.
    pub updated: bool,
}

/// The serializable result handed to report generators.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DiffArtifact {
    pub project_name: String,
    pub version_name: String,
    pub dependency_entries: Vec<DependencyEntry>,
    pub manifest_entries: Vec<ManifestEntry>,
}

impl DiffArtifact {
    /// Check if this diff is empty (no changes).
    pub fn is_empty(&self) -> bool {
        self.dependency_entries.is_empty() && self.manifest_entries.is_empty()
    }

    pub fn added(&self) -> impl Iterator<Item = &DependencyEntry> {
        self.dependency_entries
            .iter()
            .filter(|e| e.change_status == ChangeStatus::Added)
    }

    pub fn removed(&self) -> impl Iterator<Item = &DependencyEntry> {
        self.dependency_entries
            .iter()
            .filter(|e| e.change_status == ChangeStatus::Removed)
    }
}

/// A `(source, target)` pair before it is flattened into an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DependencyPair {
    pub start: NodeId,
    pub synthetic_start: bool,
    pub end: NodeId,
    pub synthetic_end: bool,
}

type PairKey = (String, String);

/// Computes diffs between two versions of one project.
pub struct DiffEngine<'g> {
    graph: &'g VersionedGraph,
    project: NodeId,
    from: Option<Version>,
    to: Version,
}

impl<'g> DiffEngine<'g> {
    /// `from = None` compares against an empty graph.
    pub fn new(graph: &'g VersionedGraph, from: Option<Version>, to: Version) -> Result<Self> {
        if let Some(from) = from {
            if from.project != to.project {
                return Err(GraphError::ForeignVersion {
                    left: graph.describe_version(from),
                    right: graph.describe_version(to),
                });
            }
        }
        Ok(DiffEngine {
            graph,
            project: to.project,
            from,
            to,
        })
    }

    /// Every dependency of the project existing at `at`, plus requested roll-ups,
    /// keyed by `(start_path, end_path)`. The first form of a key wins.
    pub fn dependency_set(&self, at: Version, options: AggregationOptions) -> BTreeMap<PairKey, DependencyPair> {
        let mut pairs = Vec::new();
        self.collect(self.project, at, options, &mut pairs);

        let mut set = BTreeMap::new();
        for pair in pairs {
            let key = (self.path_of(pair.start), self.path_of(pair.end));
            set.entry(key).or_insert(pair);
        }
        set
    }

    fn collect(&self, node: NodeId, at: Version, options: AggregationOptions, out: &mut Vec<DependencyPair>) {
        for edge_id in self.graph.dependency_edges(node) {
            if !self.graph.edge_exists(edge_id, at) {
                continue;
            }
            let Some(edge) = self.graph.edge(edge_id) else {
                continue;
            };
            push_pair(out, DependencyPair {
                start: node,
                synthetic_start: false,
                end: edge.target,
                synthetic_end: false,
            });
            if options.aggregate_end {
                for ancestor in self.graph.ancestors(edge.target) {
                    push_pair(out, DependencyPair {
                        start: node,
                        synthetic_start: false,
                        end: ancestor,
                        synthetic_end: true,
                    });
                }
            }
        }

        for child in self.graph.children(node, Some(at)) {
            let mut child_pairs = Vec::new();
            self.collect(child, at, options, &mut child_pairs);
            let rolled: Vec<DependencyPair> = if options.aggregate_start {
                child_pairs
                    .iter()
                    .map(|p| DependencyPair {
                        start: node,
                        synthetic_start: true,
                        ..*p
                    })
                    .collect()
            } else {
                Vec::new()
            };
            out.extend(child_pairs);
            for pair in rolled {
                push_pair(out, pair);
            }
        }
    }

    fn path_of(&self, node: NodeId) -> String {
        self.graph.path(node).unwrap_or_default().to_string()
    }

    fn entry(&self, pair: &DependencyPair, change_status: ChangeStatus) -> DependencyEntry {
        let describe = |id: NodeId| {
            self.graph
                .node(id)
                .map(|n| (n.kind(), n.path.clone(), n.name.clone()))
                .unwrap_or((NodeKind::Root, String::new(), String::new()))
        };
        let (start_type, start_path, start_name) = describe(pair.start);
        let (end_type, end_path, end_name) = describe(pair.end);
        DependencyEntry {
            start_type,
            start_path,
            start_name,
            synthetic_start: pair.synthetic_start,
            end_type,
            end_path,
            end_name,
            synthetic_end: pair.synthetic_end,
            change_status,
        }
    }

    /// Entries only at `to` are added, entries only at `from` are removed.
    pub fn dependency_diff(&self, options: AggregationOptions) -> Vec<DependencyEntry> {
        let before = self
            .from
            .map(|v| self.dependency_set(v, options))
            .unwrap_or_default();
        let after = self.dependency_set(self.to, options);

        let mut entries: Vec<DependencyEntry> = after
            .iter()
            .filter(|(key, _)| !before.contains_key(*key))
            .map(|(_, pair)| self.entry(pair, ChangeStatus::Added))
            .chain(
                before
                    .iter()
                    .filter(|(key, _)| !after.contains_key(*key))
                    .map(|(_, pair)| self.entry(pair, ChangeStatus::Removed)),
            )
            .collect();
        entries.sort_by(|a, b| a.key().cmp(&b.key()));
        entries
    }

    /// One entry per remote project whose resolved version differs.
    pub fn manifest_diff(&self) -> Vec<ManifestEntry> {
        let resolve = |at: Option<Version>| -> BTreeMap<NodeId, Version> {
            at.map(|v| self.graph.manifest_dependencies(self.project, Some(v)))
                .unwrap_or_default()
                .into_iter()
                .map(|v| (v.project, v))
                .collect()
        };
        let before = resolve(self.from);
        let after = resolve(Some(self.to));

        let remotes: BTreeSet<NodeId> = before.keys().chain(after.keys()).copied().collect();
        let mut entries: Vec<ManifestEntry> = remotes
            .into_iter()
            .filter_map(|remote| {
                let (new_version, updated) = match (before.get(&remote), after.get(&remote)) {
                    (old, new) if old == new => return None,
                    (None, Some(new)) => (Some(*new), false),
                    (Some(_), None) => (None, false),
                    (Some(_), Some(new)) => (Some(*new), true),
                    (None, None) => return None,
                };
                Some(ManifestEntry {
                    to_project: self.path_of(remote),
                    new_version: new_version
                        .and_then(|v| self.graph.version_name(v))
                        .map(str::to_string),
                    updated,
                })
            })
            .collect();
        entries.sort_by(|a, b| a.to_project.cmp(&b.to_project));
        entries
    }

    pub fn artifact(&self, options: AggregationOptions) -> DiffArtifact {
        DiffArtifact {
            project_name: self.path_of(self.project),
            version_name: self
                .graph
                .version_name(self.to)
                .unwrap_or_default()
                .to_string(),
            dependency_entries: self.dependency_diff(options),
            manifest_entries: self.manifest_diff(),
        }
    }
}

fn push_pair(out: &mut Vec<DependencyPair>, pair: DependencyPair) {
    if pair.start != pair.end {
        out.push(pair);
    }
}
