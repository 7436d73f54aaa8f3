//! CLI command implementations

use crate::config::Config;
use anyhow::{Context, bail};
use clap::{Args, ValueEnum};
use depline_core::{
    AggregationOptions, DiffEngine, NodeId, NodeKind, Version, VersionedGraph, count_of_kind, load_graph,
    project_segment, render_tree, rollup, save_graph,
};
use depline_indexer::{Coordinator, IndexOptions};
use std::path::{Path, PathBuf};

#[derive(Debug, Args)]
pub struct AnalyzeArgs {
    /// Project name
    #[arg(short, long)]
    pub project: String,

    /// Name of the version being analyzed
    #[arg(long = "version")]
    pub version: String,

    /// Source directory (defaults to the workspace root)
    #[arg(short, long)]
    pub source: Option<PathBuf>,

    /// Build manifest (detected in the source directory when omitted)
    #[arg(short, long)]
    pub manifest: Option<PathBuf>,

    /// Write the run report as JSON to this file
    #[arg(long)]
    pub report: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct DiffArgs {
    #[arg(short, long)]
    pub project: String,

    /// Newer version
    #[arg(long)]
    pub to: String,

    /// Older version (defaults to the version before `--to`)
    #[arg(long)]
    pub from: Option<String>,

    /// Do not roll dependencies up to enclosing source nodes
    #[arg(long)]
    pub no_start: bool,

    /// Do not roll dependencies up to enclosing target nodes
    #[arg(long)]
    pub no_end: bool,

    /// Write the diff artifact to this file instead of stdout
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Level {
    Project,
    Package,
    Class,
}

impl From<Level> for NodeKind {
    fn from(level: Level) -> Self {
        match level {
            Level::Project => NodeKind::Project,
            Level::Package => NodeKind::Package,
            Level::Class => NodeKind::Class,
        }
    }
}

fn open_graph(root: &Path, config: &Config) -> anyhow::Result<VersionedGraph> {
    let graph = load_graph(root, config.store_format)
        .with_context(|| format!("Failed to load the graph stored under {}", root.display()))?;
    Ok(graph.unwrap_or_default())
}

fn stored_graph(root: &Path, config: &Config) -> anyhow::Result<VersionedGraph> {
    match load_graph(root, config.store_format)? {
        Some(graph) => Ok(graph),
        None => bail!("No analysis stored under {}; run `depline analyze` first", root.display()),
    }
}

fn find_project(graph: &VersionedGraph, name: &str) -> anyhow::Result<NodeId> {
    match graph.project_by_name(&project_segment(name)) {
        Some(project) => Ok(project),
        None => bail!("Project {} has not been analyzed", name),
    }
}

fn version_or_latest(graph: &VersionedGraph, project: NodeId, name: Option<&str>) -> anyhow::Result<Version> {
    match name {
        Some(name) => Ok(graph.require_version(project, name)?),
        None => graph
            .latest_version(project)
            .context("Project has no analyzed versions"),
    }
}

fn emit(content: &str, out: Option<&Path>) -> anyhow::Result<()> {
    match out {
        Some(path) => {
            std::fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
            tracing::info!("Wrote {}", path.display());
        }
        None => println!("{}", content),
    }
    Ok(())
}

pub async fn analyze(root: PathBuf, config: Config, args: AnalyzeArgs) -> anyhow::Result<()> {
    let mut graph = open_graph(&root, &config)?;

    let options = IndexOptions {
        manifest: args.manifest,
        exclude: config.exclude.clone(),
        workers: config.workers,
        external_project: config.external_project.clone(),
        ..IndexOptions::new(&args.project, &args.version, args.source.unwrap_or_else(|| root.clone()))
    };
    let report = Coordinator::new(options).run_full_index(&mut graph).await?;

    if !report.skipped {
        let path = save_graph(&graph, &root, config.store_format)?;
        tracing::info!(
            "Saved {} nodes, {} edges to {}",
            graph.node_count(),
            graph.edge_count(),
            path.display()
        );
    }
    for error in &report.errors {
        tracing::warn!("{}", error);
    }

    match args.report {
        Some(path) => emit(&serde_json::to_string_pretty(&report)?, Some(&path)),
        None => {
            println!(
                "{}@{}: {} files, {} classes, {} methods, {} dependencies, {} errors{}",
                report.project,
                report.version,
                report.files_discovered,
                report.classes,
                report.methods,
                report.dependencies_recorded,
                report.errors.len(),
                if report.skipped { " (skipped)" } else { "" }
            );
            Ok(())
        }
    }
}

pub fn diff(root: PathBuf, config: Config, args: DiffArgs) -> anyhow::Result<()> {
    let graph = stored_graph(&root, &config)?;
    let project = find_project(&graph, &args.project)?;
    let to = graph.require_version(project, &args.to)?;
    let from = match &args.from {
        Some(name) => Some(graph.require_version(project, name)?),
        None => graph.previous(to),
    };

    let defaults = config.aggregation();
    let options = AggregationOptions {
        aggregate_start: defaults.aggregate_start && !args.no_start,
        aggregate_end: defaults.aggregate_end && !args.no_end,
    };
    let artifact = DiffEngine::new(&graph, from, to)?.artifact(options);
    tracing::info!(
        "{} dependencies added, {} removed, {} manifest changes",
        artifact.added().count(),
        artifact.removed().count(),
        artifact.manifest_entries.len()
    );

    emit(&serde_json::to_string_pretty(&artifact)?, args.out.as_deref())
}

pub fn versions(root: PathBuf, config: Config, project: String) -> anyhow::Result<()> {
    let graph = stored_graph(&root, &config)?;
    let node = find_project(&graph, &project)?;
    for version in graph.versions(node) {
        println!("{}", graph.version_name(version).unwrap_or_default());
    }
    Ok(())
}

pub fn show(root: PathBuf, config: Config, project: String, version: Option<String>) -> anyhow::Result<()> {
    let graph = stored_graph(&root, &config)?;
    let node = find_project(&graph, &project)?;
    let at = version_or_latest(&graph, node, version.as_deref())?;
    print!("{}", render_tree(&graph, node, at));
    Ok(())
}

pub fn rollup_view(root: PathBuf, config: Config, project: String, version: String, level: Level) -> anyhow::Result<()> {
    let graph = stored_graph(&root, &config)?;
    let node = find_project(&graph, &project)?;
    let at = graph.require_version(node, &version)?;

    let edges = rollup(&graph, node, at, level.into());
    for edge in &edges {
        println!(
            "{} -> {} ({})",
            graph.path(edge.source).unwrap_or_default(),
            graph.path(edge.target).unwrap_or_default(),
            edge.count
        );
    }
    tracing::info!(
        "{} aggregated edges ({} class, {} method dependencies)",
        edges.len(),
        count_of_kind(&edges, depline_core::EdgeKind::ClassDependency),
        count_of_kind(&edges, depline_core::EdgeKind::MethodDependency)
    );
    Ok(())
}

pub fn clear(root: PathBuf) -> anyhow::Result<()> {
    tracing::info!("Clearing stored graph for: {}", root.display());

    depline_core::clear_cache(&root)?;

    tracing::info!("Store cleared");
    Ok(())
}
