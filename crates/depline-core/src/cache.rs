//! Snapshot store for the versioned graph

use crate::error::{GraphError, Result};
use crate::graph::{Arena, VersionedGraph};
use crate::model::SCHEMA_VERSION;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Store directory: .depline/
pub const CACHE_DIR: &str = ".depline";

/// JSON snapshot file
pub const GRAPH_CACHE: &str = "graph.json";

/// Bincode snapshot file
pub const GRAPH_CACHE_BIN: &str = "graph.bin";

/// On-disk encoding of the snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreFormat {
    #[default]
    Json,
    Bincode,
}

#[derive(Serialize)]
struct SnapshotRef<'a> {
    schema_version: u32,
    saved_at: String,
    graph: &'a Arena,
}

#[derive(Deserialize)]
struct Snapshot {
    schema_version: u32,
    saved_at: String,
    graph: Arena,
}

/// Get store directory path
pub fn cache_dir(root: &Path) -> PathBuf {
    root.join(CACHE_DIR)
}

/// Get snapshot file path for a format
pub fn graph_cache_path(root: &Path, format: StoreFormat) -> PathBuf {
    let file = match format {
        StoreFormat::Json => GRAPH_CACHE,
        StoreFormat::Bincode => GRAPH_CACHE_BIN,
    };
    root.join(CACHE_DIR).join(file)
}

/// Ensure store directory exists
pub fn ensure_cache_dir(root: &Path) -> std::io::Result<()> {
    let cache = cache_dir(root);
    if !cache.exists() {
        std::fs::create_dir_all(&cache)?;
    }
    Ok(())
}

/// Write the whole graph. The file is replaced atomically.
pub fn save_graph(graph: &VersionedGraph, root: &Path, format: StoreFormat) -> Result<PathBuf> {
    ensure_cache_dir(root)?;
    let path = graph_cache_path(root, format);
    let snapshot = SnapshotRef {
        schema_version: SCHEMA_VERSION,
        saved_at: chrono::Utc::now().to_rfc3339(),
        graph: graph.arena(),
    };

    let bytes = match format {
        StoreFormat::Json => serde_json::to_vec(&snapshot)?,
        StoreFormat::Bincode => bincode::serialize(&snapshot)?,
    };
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, bytes)?;
    std::fs::rename(&tmp, &path)?;

    tracing::debug!(
        "Graph saved: {} ({} nodes, {} edges)",
        path.display(),
        graph.node_count(),
        graph.edge_count()
    );
    Ok(path)
}

/// Load the graph, or `None` when no snapshot exists yet.
pub fn load_graph(root: &Path, format: StoreFormat) -> Result<Option<VersionedGraph>> {
    let path = graph_cache_path(root, format);
    if !path.exists() {
        return Ok(None);
    }

    let bytes = std::fs::read(&path)?;
    let snapshot: Snapshot = match format {
        StoreFormat::Json => serde_json::from_slice(&bytes)?,
        StoreFormat::Bincode => bincode::deserialize(&bytes)?,
    };
    if snapshot.schema_version != SCHEMA_VERSION {
        return Err(GraphError::SchemaMismatch {
            found: snapshot.schema_version,
            expected: SCHEMA_VERSION,
        });
    }

    let graph = VersionedGraph::from_arena(snapshot.graph)?;
    tracing::debug!("Graph loaded from {} (saved {})", path.display(), snapshot.saved_at);
    Ok(Some(graph))
}

/// Clear store directory
pub fn clear_cache(root: &Path) -> std::io::Result<()> {
    let cache = cache_dir(root);
    if cache.exists() {
        std::fs::remove_dir_all(&cache)?;
    }
    Ok(())
}
