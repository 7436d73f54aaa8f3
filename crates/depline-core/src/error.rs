//! Error types for graph operations and the snapshot store.
//!
//! Structural and range errors are fatal to the triggering call only; the graph
//! stays consistent because every mutation validates before it writes.

use thiserror::Error;

use crate::model::{EdgeId, NodeId, NodeKind};

/// Result type for depline-core operations.
pub type Result<T> = std::result::Result<T, GraphError>;

#[derive(Debug, Error)]
pub enum GraphError {
    // ── Structure ───────────────────────────────────────────
    /// The requested leaf kind cannot be placed at the implied depth.
    #[error("cannot place a {leaf} at `{path}` below a {parent}")]
    StructuralType {
        parent: NodeKind,
        path: String,
        leaf: NodeKind,
    },

    #[error("node {0:?} is not a project")]
    NotAProject(NodeId),

    #[error("node {0:?} does not exist in this graph")]
    UnknownNode(NodeId),

    #[error("edge {0:?} does not exist in this graph")]
    UnknownEdge(EdgeId),

    #[error("project `{0}` not found")]
    UnknownProject(String),

    #[error("the root node always exists")]
    RootExistence,

    // ── Versions ────────────────────────────────────────────
    /// A search range whose start lies after its end.
    #[error("search range too small: `{from}` comes after `{until}`")]
    VersionRange { from: String, until: String },

    #[error("version `{version}` already exists in project `{project}`")]
    DuplicateVersion { project: String, version: String },

    #[error("version `{version}` not found in project `{project}`")]
    UnknownVersion { project: String, version: String },

    #[error("versions of `{left}` and `{right}` cannot be compared")]
    ForeignVersion { left: String, right: String },

    // ── Snapshot store ──────────────────────────────────────
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("bincode error: {0}")]
    Bincode(#[from] bincode::Error),

    #[error("snapshot schema {found} does not match expected {expected}")]
    SchemaMismatch { found: u32, expected: u32 },

    #[error("snapshot is corrupt: {0}")]
    CorruptStore(String),
}
