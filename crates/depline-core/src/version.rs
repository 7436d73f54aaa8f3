//! Per-project version sequences

use serde::{Deserialize, Serialize};

use crate::error::{GraphError, Result};
use crate::graph::VersionedGraph;
use crate::model::{NodeDetail, NodeId};
use crate::timeline::VersionIdx;

/// Append-only ordered list of version names. Names are unique.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct VersionSequence {
    names: Vec<String>,
}

impl VersionSequence {
    pub fn new() -> Self {
        VersionSequence { names: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Append a name. Returns `None` if it is already taken.
    pub fn push(&mut self, name: &str) -> Option<VersionIdx> {
        if self.position(name).is_some() {
            return None;
        }
        self.names.push(name.to_string());
        Some(VersionIdx(self.names.len() as u32 - 1))
    }

    pub fn position(&self, name: &str) -> Option<VersionIdx> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| VersionIdx(i as u32))
    }

    pub fn name(&self, idx: VersionIdx) -> Option<&str> {
        self.names.get(idx.index()).map(String::as_str)
    }

    pub fn contains(&self, idx: VersionIdx) -> bool {
        idx.index() < self.names.len()
    }

    pub fn first(&self) -> Option<VersionIdx> {
        (!self.names.is_empty()).then_some(VersionIdx(0))
    }

    pub fn latest(&self) -> Option<VersionIdx> {
        self.names.len().checked_sub(1).map(|i| VersionIdx(i as u32))
    }

    pub fn next(&self, idx: VersionIdx) -> Option<VersionIdx> {
        Some(idx.next()).filter(|n| self.contains(*n))
    }

    pub fn iter(&self) -> impl Iterator<Item = (VersionIdx, &str)> {
        self.names
            .iter()
            .enumerate()
            .map(|(i, n)| (VersionIdx(i as u32), n.as_str()))
    }
}

/// Handle to one version of one project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub project: NodeId,
    pub idx: VersionIdx,
}

impl VersionedGraph {
    fn sequence(&self, project: NodeId) -> Result<&VersionSequence> {
        match self.node(project).map(|n| &n.detail) {
            Some(NodeDetail::Project { versions, .. }) => Ok(versions),
            Some(_) => Err(GraphError::NotAProject(project)),
            None => Err(GraphError::UnknownNode(project)),
        }
    }

    fn sequence_mut(&mut self, project: NodeId) -> Result<&mut VersionSequence> {
        match self.node_mut(project).map(|n| &mut n.detail) {
            Some(NodeDetail::Project { versions, .. }) => Ok(versions),
            Some(_) => Err(GraphError::NotAProject(project)),
            None => Err(GraphError::UnknownNode(project)),
        }
    }

    /// All versions of a project in order. Empty for non-projects.
    pub fn versions(&self, project: NodeId) -> Vec<Version> {
        self.sequence(project)
            .map(|seq| {
                seq.iter()
                    .map(|(idx, _)| Version { project, idx })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Append a new, previously unused version name.
    pub fn begin_version(&mut self, project: NodeId, name: &str) -> Result<Version> {
        let project_name = self.path(project).unwrap_or_default().to_string();
        let idx = self
            .sequence_mut(project)?
            .push(name)
            .ok_or_else(|| GraphError::DuplicateVersion {
                project: project_name.clone(),
                version: name.to_string(),
            })?;
        tracing::debug!("Project `{}` now at version `{}`", project_name, name);
        Ok(Version { project, idx })
    }

    /// The version with this name, appending it if it is unknown.
    pub fn get_or_create_version(&mut self, project: NodeId, name: &str) -> Result<Version> {
        match self.version(project, name) {
            Some(v) => Ok(v),
            None => self.begin_version(project, name),
        }
    }

    pub fn version(&self, project: NodeId, name: &str) -> Option<Version> {
        let idx = self.sequence(project).ok()?.position(name)?;
        Some(Version { project, idx })
    }

    /// Like [`VersionedGraph::version`] but reports a missing version.
    pub fn require_version(&self, project: NodeId, name: &str) -> Result<Version> {
        self.version(project, name)
            .ok_or_else(|| GraphError::UnknownVersion {
                project: self.path(project).unwrap_or_default().to_string(),
                version: name.to_string(),
            })
    }

    pub fn version_name(&self, version: Version) -> Option<&str> {
        self.sequence(version.project).ok()?.name(version.idx)
    }

    pub fn first_version(&self, project: NodeId) -> Option<Version> {
        let idx = self.sequence(project).ok()?.first()?;
        Some(Version { project, idx })
    }

    pub fn latest_version(&self, project: NodeId) -> Option<Version> {
        let idx = self.sequence(project).ok()?.latest()?;
        Some(Version { project, idx })
    }

    /// Positional predecessor.
    pub fn previous(&self, version: Version) -> Option<Version> {
        let idx = version.idx.previous()?;
        Some(Version { idx, ..version })
    }

    /// Positional successor.
    pub fn next(&self, version: Version) -> Option<Version> {
        let idx = self.sequence(version.project).ok()?.next(version.idx)?;
        Some(Version { idx, ..version })
    }

    /// `project@name`, for logs and error messages.
    pub fn describe_version(&self, version: Version) -> String {
        format!(
            "{}@{}",
            self.path(version.project).unwrap_or("?"),
            self.version_name(version).unwrap_or("?")
        )
    }

    /// Position of `version` inside `project`'s sequence. Versions of another
    /// project are matched by name.
    pub(crate) fn resolve_in(&self, version: Version, project: NodeId) -> Option<VersionIdx> {
        let sequence = self.sequence(project).ok()?;
        if version.project == project {
            return Some(version.idx).filter(|idx| sequence.contains(*idx));
        }
        sequence.position(self.version_name(version)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NodeKind;

    fn project(graph: &mut VersionedGraph, name: &str) -> NodeId {
        let root = graph.root();
        graph.create_child(root, NodeKind::Project, name).unwrap()
    }

    #[test]
    fn sequence_is_positional() {
        let mut graph = VersionedGraph::new();
        let p = project(&mut graph, "p");
        let v1 = graph.begin_version(p, "1.0").unwrap();
        let v2 = graph.begin_version(p, "0.9").unwrap();

        assert_eq!(graph.previous(v2), Some(v1));
        assert_eq!(graph.next(v1), Some(v2));
        assert_eq!(graph.next(v2), None);
        assert_eq!(graph.previous(v1), None);
        assert_eq!(graph.latest_version(p), Some(v2));
        assert_eq!(graph.first_version(p), Some(v1));
        assert_eq!(graph.version_name(v2), Some("0.9"));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut graph = VersionedGraph::new();
        let p = project(&mut graph, "p");
        graph.begin_version(p, "1.0").unwrap();
        let err = graph.begin_version(p, "1.0").unwrap_err();
        assert!(matches!(err, GraphError::DuplicateVersion { .. }));
        assert_eq!(graph.get_or_create_version(p, "1.0").unwrap().idx, VersionIdx(0));
        assert_eq!(graph.versions(p).len(), 1);
    }

    #[test]
    fn foreign_versions_resolve_by_name() {
        let mut graph = VersionedGraph::new();
        let p = project(&mut graph, "p");
        let q = project(&mut graph, "q");
        graph.begin_version(p, "a").unwrap();
        let pb = graph.begin_version(p, "b").unwrap();
        graph.begin_version(q, "b").unwrap();

        assert_eq!(graph.resolve_in(pb, q), Some(VersionIdx(0)));
        let pa = graph.version(p, "a").unwrap();
        assert_eq!(graph.resolve_in(pa, q), None);
        assert_eq!(graph.describe_version(pb), "p@b");
    }
}
