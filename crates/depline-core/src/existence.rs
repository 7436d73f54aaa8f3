//! Existence resolution over sparse timelines.
//!
//! An edge exists at a version unless the most recent marker says otherwise.
//! Two timelines are consulted: the edge's own, and the own timeline of the
//! owner's parent edge (one level, not the full ancestor chain). The later
//! marker wins; on a tie the edge's own marker wins. Without any marker the
//! edge exists.
//!
//! Writes keep every timeline minimal. Confirming a parent edge invalidates
//! the scope of the confirmed node: its children and its own dependencies are
//! forced absent at that version until they are confirmed again.

use crate::error::{GraphError, Result};
use crate::graph::VersionedGraph;
use crate::model::{EdgeId, EdgeKind, NodeId};
use crate::timeline::VersionIdx;
use crate::version::Version;

impl VersionedGraph {
    /// Whether a node exists at `at`. The root always exists.
    pub fn exists(&self, node: NodeId, at: Version) -> bool {
        match self.node(node) {
            Some(n) => match n.parent_edge {
                Some(edge) => self.edge_exists(edge, at),
                None => node == self.root,
            },
            None => false,
        }
    }

    /// Whether an edge exists at `at`. Nothing exists in a project without versions.
    pub fn edge_exists(&self, edge: EdgeId, at: Version) -> bool {
        self.locate(edge, at)
            .is_some_and(|idx| self.presence_at(edge, idx))
    }

    /// Most recent own marker of `edge` inside `[from..=until]`.
    pub fn latest_change(&self, edge: EdgeId, from: Version, until: Version) -> Result<Option<(Version, bool)>> {
        let e = self.edge(edge).ok_or(GraphError::UnknownEdge(edge))?;
        let project = self
            .edge_project(edge)
            .ok_or(GraphError::UnknownNode(e.source))?;
        let start = self.require_in(from, project)?;
        let end = self.require_in(until, project)?;
        if start > end {
            return Err(GraphError::VersionRange {
                from: self.describe_version(from),
                until: self.describe_version(until),
            });
        }
        Ok(e.presence
            .latest_between(start, end)
            .map(|(idx, value)| (Version { project, idx }, *value)))
    }

    /// First version at which the node exists.
    pub fn first_existence(&self, node: NodeId) -> Option<Version> {
        let project = self.project_of(node)?;
        self.versions(project)
            .into_iter()
            .find(|&v| self.exists(node, v))
    }

    /// Last version at which the node exists.
    pub fn last_existence(&self, node: NodeId) -> Option<Version> {
        let project = self.project_of(node)?;
        self.versions(project)
            .into_iter()
            .rev()
            .find(|&v| self.exists(node, v))
    }

    /// Set a node's existence at `at` through its parent edge.
    pub fn set_exists(&mut self, node: NodeId, at: Version, desired: bool) -> Result<()> {
        let n = self.node(node).ok_or(GraphError::UnknownNode(node))?;
        match n.parent_edge {
            Some(edge) => self.set_edge_exists(edge, at, desired),
            None if desired => Ok(()),
            None => Err(GraphError::RootExistence),
        }
    }

    /// Set an edge's existence at `at`, keeping its timeline minimal.
    pub fn set_edge_exists(&mut self, edge: EdgeId, at: Version, desired: bool) -> Result<()> {
        let idx = self.require_edge_version(edge, at)?;
        self.apply_presence(edge, idx, desired);
        Ok(())
    }

    /// Force an edge absent at `at`. Does not forward and does not cascade.
    pub fn force_absent(&mut self, edge: EdgeId, at: Version) -> Result<()> {
        let idx = self.require_edge_version(edge, at)?;
        self.force_absent_at(edge, idx);
        Ok(())
    }

    /// Mark every known direct child of `scope` absent at `at`.
    pub fn reset_children_presence(&mut self, scope: NodeId, at: Version) -> Result<()> {
        for edge in self.child_edges(scope) {
            let idx = self.require_edge_version(edge, at)?;
            self.force_absent_at(edge, idx);
        }
        Ok(())
    }

    // ── Internals ───────────────────────────────────────────

    /// Position of `at` in the edge's project, if that project knows it.
    pub(crate) fn locate(&self, edge: EdgeId, at: Version) -> Option<VersionIdx> {
        let project = self.edge_project(edge)?;
        self.resolve_in(at, project)
    }

    fn require_in(&self, at: Version, project: NodeId) -> Result<VersionIdx> {
        self.resolve_in(at, project)
            .ok_or_else(|| GraphError::UnknownVersion {
                project: self.path(project).unwrap_or_default().to_string(),
                version: self.version_name(at).unwrap_or("?").to_string(),
            })
    }

    pub(crate) fn require_edge_version(&self, edge: EdgeId, at: Version) -> Result<VersionIdx> {
        let source = self
            .edge(edge)
            .map(|e| e.source)
            .ok_or(GraphError::UnknownEdge(edge))?;
        let project = self.project_of(source).ok_or(GraphError::NotAProject(source))?;
        self.require_in(at, project)
    }

    /// Whether `at` is meaningful for `node`'s project.
    pub(crate) fn applies_to(&self, at: Version, node: NodeId) -> bool {
        self.project_of(node)
            .and_then(|p| self.resolve_in(at, p))
            .is_some()
    }

    /// Latest marker at or before `until` on the edge or the owner's parent edge.
    fn latest_relevant_marker(&self, edge: EdgeId, until: VersionIdx) -> Option<(VersionIdx, bool)> {
        let e = self.edge(edge)?;
        let own = e
            .presence
            .latest_at_or_before(until)
            .map(|(idx, value)| (idx, *value));
        let inherited = self
            .parent_edge(e.owner())
            .and_then(|p| self.edge(p))
            .and_then(|p| p.presence.latest_at_or_before(until))
            .map(|(idx, value)| (idx, *value));

        match (own, inherited) {
            (Some(own), Some(inherited)) if own.0 < inherited.0 => Some(inherited),
            (Some(own), _) => Some(own),
            (None, inherited) => inherited,
        }
    }

    pub(crate) fn presence_at(&self, edge: EdgeId, at: VersionIdx) -> bool {
        self.latest_relevant_marker(edge, at)
            .map_or(true, |(_, value)| value)
    }

    /// Effective value at the predecessor; the default before the first version.
    fn presence_before(&self, edge: EdgeId, at: VersionIdx) -> bool {
        at.previous()
            .map_or(true, |prev| self.presence_at(edge, prev))
    }

    pub(crate) fn apply_presence(&mut self, edge: EdgeId, at: VersionIdx, desired: bool) {
        let Some((kind, source, owner)) = self.edge(edge).map(|e| (e.kind, e.source, e.owner())) else {
            return;
        };
        if self.presence_at(edge, at) == desired {
            return;
        }

        if self.presence_before(edge, at) == desired {
            let removed = self
                .edge_mut(edge)
                .and_then(|e| e.presence.remove(at))
                .is_some();
            // Nothing of our own to drop: the owner's timeline is in the way.
            // Only a confirmation is forwarded. Forwarding an absence would
            // also hide the owner and every sibling still present.
            if !removed && desired && kind == EdgeKind::Parent {
                if let Some(owner_edge) = self.parent_edge(owner) {
                    self.apply_presence(owner_edge, at, true);
                }
            }
        }

        // Forwarding may have cascaded back onto this edge.
        self.settle(edge, at, desired);
        self.prune_after(edge, at);

        if desired && kind == EdgeKind::Parent {
            self.invalidate_scope(source, at);
        }
    }

    pub(crate) fn force_absent_at(&mut self, edge: EdgeId, at: VersionIdx) {
        if !self.presence_at(edge, at) {
            return;
        }
        self.settle(edge, at, false);
        self.prune_after(edge, at);
    }

    /// Reach `desired` at `at` with at most one own marker there.
    fn settle(&mut self, edge: EdgeId, at: VersionIdx, desired: bool) {
        if self.presence_at(edge, at) == desired {
            return;
        }
        if let Some(e) = self.edge_mut(edge) {
            e.presence.remove(at);
        }
        if self.presence_at(edge, at) != desired {
            if let Some(e) = self.edge_mut(edge) {
                e.presence.insert(at, desired);
            }
        }
    }

    /// Drop the next own marker after `at` if a change at `at` made it redundant.
    fn prune_after(&mut self, edge: EdgeId, at: VersionIdx) {
        let Some((next, value)) = self
            .edge(edge)
            .and_then(|e| e.presence.next_after(at))
            .map(|(idx, value)| (idx, *value))
        else {
            return;
        };
        if let Some(e) = self.edge_mut(edge) {
            e.presence.remove(next);
        }
        if self.presence_at(edge, next) != value {
            if let Some(e) = self.edge_mut(edge) {
                e.presence.insert(next, value);
            }
        }
    }

    /// A node was (re)confirmed at `at`: its children and own dependencies
    /// must be confirmed again.
    fn invalidate_scope(&mut self, node: NodeId, at: VersionIdx) {
        let mut owned = self.child_edges(node);
        owned.extend(self.dependency_edges(node));
        for edge in owned {
            self.force_absent_at(edge, at);
        }
    }

    /// First position at which an edge exists.
    pub(crate) fn edge_first_existence(&self, edge: EdgeId) -> Option<VersionIdx> {
        let project = self.edge_project(edge)?;
        self.versions(project)
            .into_iter()
            .map(|v| v.idx)
            .find(|&idx| self.presence_at(edge, idx))
    }
}
