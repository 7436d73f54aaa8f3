//! Depline core: versioned dependency graph, existence timelines and diff engine

pub mod model;
pub mod timeline;
pub mod error;
pub mod graph;
pub mod version;
pub mod existence;
pub mod path;
pub mod dependency;
pub mod manifest;
pub mod aggregation;
pub mod diff;
pub mod context;
pub mod cache;
pub mod render;

#[cfg(test)]
pub mod tests;

#[cfg(test)]
pub mod test_utils;

pub use model::{NodeId, EdgeId, NodeKind, NodeDetail, EdgeKind, GraphNode, GraphEdge, AggregatedEdge, SCHEMA_VERSION};
pub use timeline::{Timeline, VersionIdx};
pub use error::{GraphError, Result};
pub use graph::VersionedGraph;
pub use version::{Version, VersionSequence};
pub use path::{split_segment, next_segment_kind};
pub use manifest::project_segment;
pub use aggregation::{rollup, count_of_kind};
pub use diff::{AggregationOptions, ChangeStatus, DependencyEntry, DependencyPair, DiffArtifact, DiffEngine, ManifestEntry};
pub use context::{AnalysisRun, FactSink, NodeAttributes};
pub use cache::{CACHE_DIR, GRAPH_CACHE, GRAPH_CACHE_BIN, StoreFormat, cache_dir, graph_cache_path, ensure_cache_dir, save_graph, load_graph, clear_cache};
pub use render::render_tree;
