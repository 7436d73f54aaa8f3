//! Declared project-to-project dependencies with a remote version per version

use crate::error::{GraphError, Result};
use crate::graph::VersionedGraph;
use crate::model::{EdgeId, EdgeKind, GraphEdge, NodeId, NodeKind};
use crate::timeline::VersionIdx;
use crate::version::Version;

/// Project names are single path segments.
pub fn project_segment(name: &str) -> String {
    name.replace('.', "-")
}

impl VersionedGraph {
    /// Manifest edges leaving `project`.
    pub fn manifest_edges(&self, project: NodeId) -> Vec<EdgeId> {
        self.outgoing(project, EdgeKind::ManifestDependency)
    }

    fn remote_at(&self, edge: EdgeId, at: VersionIdx) -> Option<VersionIdx> {
        self.edge(edge)?
            .remote_versions
            .latest_at_or_before(at)
            .and_then(|(_, remote)| *remote)
    }

    /// Remote version the edge resolves to at `at` (latest local version when `None`).
    pub fn manifest_version_at(&self, edge: EdgeId, at: Option<Version>) -> Option<Version> {
        let e = self.edge(edge)?;
        let idx = match at {
            Some(v) => self.resolve_in(v, e.source)?,
            None => self.latest_version(e.source)?.idx,
        };
        self.remote_at(edge, idx).map(|idx| Version {
            project: e.target,
            idx,
        })
    }

    /// Record which remote version `edge` points to at `at`. `None` drops the dependency.
    pub fn set_manifest_version(&mut self, edge: EdgeId, at: Version, remote: Option<Version>) -> Result<()> {
        let target = self.edge(edge).map(|e| e.target).ok_or(GraphError::UnknownEdge(edge))?;
        let idx = self.require_edge_version(edge, at)?;
        let remote = match remote {
            Some(r) if r.project != target => {
                return Err(GraphError::ForeignVersion {
                    left: self.describe_version(r),
                    right: self.path(target).unwrap_or_default().to_string(),
                });
            }
            other => other.map(|r| r.idx),
        };

        if self.remote_at(edge, idx) != remote {
            let before = idx.previous().and_then(|prev| self.remote_at(edge, prev));
            if let Some(e) = self.edge_mut(edge) {
                if before == remote {
                    e.remote_versions.remove(idx);
                } else {
                    e.remote_versions.insert(idx, remote);
                }
            }
            self.prune_remote_after(edge, idx);
        }
        self.apply_presence(edge, idx, remote.is_some());
        // Presence must follow the remote timeline up to its next marker.
        let next = self
            .edge(edge)
            .and_then(|e| e.remote_versions.next_after(idx))
            .map(|(next, remote)| (next, remote.is_some()));
        if let Some((next, declared)) = next {
            self.apply_presence(edge, next, declared);
        }
        Ok(())
    }

    fn prune_remote_after(&mut self, edge: EdgeId, at: VersionIdx) {
        let Some((next, value)) = self
            .edge(edge)
            .and_then(|e| e.remote_versions.next_after(at))
            .map(|(idx, value)| (idx, *value))
        else {
            return;
        };
        if self.remote_at(edge, at) == value {
            if let Some(e) = self.edge_mut(edge) {
                e.remote_versions.remove(next);
            }
        }
    }

    /// Declare that `project` depends on `remote_version_name` of the project
    /// `remote_name` at `at`. Returns `None` when a project names itself.
    pub fn add_manifest_dependency(
        &mut self,
        project: NodeId,
        remote_name: &str,
        remote_version_name: &str,
        at: Version,
    ) -> Result<Option<EdgeId>> {
        if self.kind(project) != Some(NodeKind::Project) {
            return Err(GraphError::NotAProject(project));
        }
        let root = self.root;
        let remote = self.find_or_create(root, &project_segment(remote_name), None, NodeKind::Project)?;
        if remote == project {
            return Ok(None);
        }
        let remote_version = self.get_or_create_version(remote, remote_version_name)?;

        let edge = match self.find_edge(project, remote, EdgeKind::ManifestDependency) {
            Some(edge) => edge,
            None => self.insert_absent_edge(GraphEdge::new(project, remote, EdgeKind::ManifestDependency)),
        };
        self.set_manifest_version(edge, at, Some(remote_version))?;
        Ok(Some(edge))
    }

    /// Clear every declared dependency of `project` at `at` before re-declaring.
    pub fn reset_manifest_dependencies(&mut self, project: NodeId, at: Version) -> Result<()> {
        for edge in self.manifest_edges(project) {
            self.set_manifest_version(edge, at, None)?;
        }
        Ok(())
    }

    /// Remote versions declared by `project` at `at`, ordered by remote project path.
    pub fn manifest_dependencies(&self, project: NodeId, at: Option<Version>) -> Vec<Version> {
        let mut versions: Vec<Version> = self
            .manifest_edges(project)
            .into_iter()
            .filter_map(|e| self.manifest_version_at(e, at))
            .collect();
        versions.sort_by(|a, b| self.path(a.project).cmp(&self.path(b.project)));
        versions
    }
}
