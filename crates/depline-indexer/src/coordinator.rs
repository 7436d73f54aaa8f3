//! Orchestrates one analysis run
//!
//! Units are discovered and extracted in parallel on blocking tasks. Facts are
//! then applied to the graph on the caller's task, one unit at a time in path
//! order, after the project's children were reset for the new version.

use crate::class_index::{ClassIndex, MethodEntry};
use crate::error::ExtractionError;
use crate::extractor::ExtractionResult;
use crate::languages::get_extractor;
use crate::manifest::{detect_manifest, read_manifest, DeclaredDependency};
use crate::parser_pool::{create_parser_pool, FileType, ParserPool};
use crate::resolve::TypeResolver;
use anyhow::{Context, Result};
use depline_core::{project_segment, AnalysisRun, FactSink, GraphError, NodeAttributes, NodeId, NodeKind, VersionedGraph};
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use tokio::task::JoinSet;

pub const DEFAULT_EXTERNAL_PROJECT: &str = "external";

/// What to analyze and how.
#[derive(Debug, Clone)]
pub struct IndexOptions {
    pub project: String,
    pub version: String,
    pub source_root: PathBuf,
    /// Build manifest; detected in `source_root` when unset.
    pub manifest: Option<PathBuf>,
    /// Glob patterns, relative to `source_root`, of files to skip.
    pub exclude: Vec<String>,
    /// Parser threads; one per core when unset.
    pub workers: Option<usize>,
    /// Project that receives classes not declared in the analyzed sources.
    pub external_project: String,
}

impl IndexOptions {
    pub fn new(project: impl Into<String>, version: impl Into<String>, source_root: impl Into<PathBuf>) -> Self {
        Self {
            project: project.into(),
            version: version.into(),
            source_root: source_root.into(),
            manifest: None,
            exclude: Vec::new(),
            workers: None,
            external_project: DEFAULT_EXTERNAL_PROJECT.to_string(),
        }
    }
}

/// Outcome of one run.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexReport {
    pub project: String,
    pub version: String,
    /// The version was already analyzed; nothing was recorded.
    pub skipped: bool,
    pub files_discovered: usize,
    pub units_applied: usize,
    pub classes: usize,
    pub methods: usize,
    pub dependencies_recorded: usize,
    pub manifest_dependencies: usize,
    /// Classes of other analyzed projects available for resolution.
    pub known_classes: usize,
    /// Facts the graph refused, e.g. a class path colliding with a package.
    pub rejected_facts: usize,
    pub errors: Vec<ExtractionError>,
}

pub struct Coordinator {
    options: IndexOptions,
    parser_pool: ParserPool,
}

impl Coordinator {
    pub fn new(options: IndexOptions) -> Self {
        let parser_pool = create_parser_pool(options.workers);
        Coordinator { options, parser_pool }
    }

    pub fn options(&self) -> &IndexOptions {
        &self.options
    }

    /// Source files below the root, honoring `.gitignore` and exclude patterns, sorted.
    pub fn discover(&self) -> Result<Vec<PathBuf>> {
        let root = &self.options.source_root;
        let excludes = build_globset(&self.options.exclude)?;
        let mut files = Vec::new();

        for entry in WalkBuilder::new(root).require_git(false).build() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Cannot read entry: {}", e);
                    continue;
                }
            };
            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }
            let path = entry.path();
            let relative = path.strip_prefix(root).unwrap_or(path);
            if excludes.is_match(relative) || FileType::from_path(path).is_none() {
                continue;
            }
            files.push(path.to_path_buf());
        }

        files.sort();
        Ok(files)
    }

    /// Extract every file on blocking tasks. Results are sorted by path.
    pub async fn extract_all(&self, files: Vec<PathBuf>) -> (Vec<ExtractionResult>, Vec<ExtractionError>) {
        let mut tasks = JoinSet::new();
        for path in files {
            let pool = self.parser_pool.clone();
            let root = self.options.source_root.clone();
            tasks.spawn_blocking(move || extract_file(&root, &path, &pool));
        }

        let mut units = Vec::new();
        let mut errors = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(unit)) => units.push(unit),
                Ok(Err(e)) => {
                    tracing::warn!("Skipping {}", e);
                    errors.push(e);
                }
                Err(e) => tracing::error!("Extraction task failed: {}", e),
            }
        }

        units.sort_by(|a, b| a.path.cmp(&b.path));
        errors.sort_by(|a, b| a.path.cmp(&b.path));
        (units, errors)
    }

    /// Analyze the sources as a new version of the project.
    ///
    /// A version that is already known is left untouched and reported as skipped.
    pub async fn run_full_index(&self, graph: &mut VersionedGraph) -> Result<IndexReport> {
        let options = &self.options;
        let mut report = IndexReport {
            project: options.project.clone(),
            version: options.version.clone(),
            ..Default::default()
        };

        let known = graph
            .project_by_name(&project_segment(&options.project))
            .and_then(|p| graph.version(p, &options.version));
        if known.is_some() {
            tracing::warn!(
                "Version {} of {} was already analyzed, skipping",
                options.version,
                options.project
            );
            report.skipped = true;
            return Ok(report);
        }

        let files = self.discover()?;
        report.files_discovered = files.len();
        tracing::info!("Discovered {} source files in {}", files.len(), options.source_root.display());

        let (units, errors) = self.extract_all(files).await;
        report.errors = errors;

        let declared = self.declared_dependencies(&mut report);
        let index = ClassIndex::new();
        report.known_classes = seed_known_classes(&index, graph, &project_segment(&options.project), &declared);
        index_units(&index, &options.project, &units);

        let mut run = AnalysisRun::begin(graph, &options.project, &options.version)
            .with_context(|| format!("Failed to start {}@{}", options.project, options.version))?;
        let project = run.project();
        run.reset_children_presence(project)?;

        let mut applier = Applier {
            run: &mut run,
            index: &index,
            external: project_segment(&options.external_project),
            report: &mut report,
        };
        for unit in &units {
            tracing::debug!("Applying {}", unit.path.display());
            applier.apply(unit);
        }

        run.reset_manifest_dependencies()?;
        for dep in &declared {
            run.record_manifest_dependency(&dep.name, &dep.version)?;
            report.manifest_dependencies += 1;
        }

        tracing::info!(
            "Analyzed {}@{}: {} units, {} classes, {} dependencies, {} errors",
            options.project,
            options.version,
            report.units_applied,
            report.classes,
            report.dependencies_recorded,
            report.errors.len()
        );
        Ok(report)
    }

    fn declared_dependencies(&self, report: &mut IndexReport) -> Vec<DeclaredDependency> {
        let path = match self.options.manifest.clone().or_else(|| detect_manifest(&self.options.source_root)) {
            Some(path) => path,
            None => return Vec::new(),
        };
        match read_manifest(&path) {
            Ok(declared) => declared,
            Err(e) => {
                tracing::warn!("Ignoring manifest {}", e);
                report.errors.push(e);
                Vec::new()
            }
        }
    }
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern).with_context(|| format!("Invalid exclude pattern {}", pattern))?);
    }
    Ok(builder.build()?)
}

fn extract_file(root: &Path, path: &Path, pool: &ParserPool) -> Result<ExtractionResult, ExtractionError> {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let extractor = get_extractor(path, pool)
        .ok_or_else(|| ExtractionError::read_failed(relative.to_path_buf(), "no extractor for file type"))?;
    let content = std::fs::read(path).map_err(|e| ExtractionError::read_failed(relative.to_path_buf(), e.to_string()))?;
    extractor.extract(relative, &content)
}

/// Register the classes of every other analyzed project, as of its latest
/// version. Projects named in the manifest go last and win name clashes.
/// Declared dependencies with a package namespace also own the unindexed
/// classes below it.
fn seed_known_classes(
    index: &ClassIndex,
    graph: &VersionedGraph,
    current: &str,
    declared: &[DeclaredDependency],
) -> usize {
    let declared_names: HashSet<String> = declared.iter().map(|d| project_segment(&d.name)).collect();
    let mut projects: Vec<(bool, String, NodeId)> = graph
        .all_nodes()
        .filter(|(_, n)| n.kind() == NodeKind::Project && n.is_internal() && n.name != current)
        .map(|(id, n)| (declared_names.contains(&n.name), n.name.clone(), id))
        .collect();
    projects.sort();

    let mut seeded = 0;
    for (_, name, project) in projects {
        let Some(latest) = graph.latest_version(project) else {
            continue;
        };
        for class in graph.all_children(project, Some(latest)) {
            if graph.kind(class) != Some(NodeKind::Class) {
                continue;
            }
            let Some(qualified_name) = binary_name(graph, class) else {
                continue;
            };
            let methods = graph
                .children(class, Some(latest))
                .into_iter()
                .filter(|&m| graph.kind(m) == Some(NodeKind::Method))
                .filter_map(|m| graph.node(m).map(|n| method_entry(&n.name)))
                .collect();
            index.insert_known(qualified_name, &name, methods);
            seeded += 1;
        }
    }
    tracing::debug!("Seeded {} classes of other projects", seeded);

    for dep in declared {
        if let Some(group) = &dep.group {
            index.add_package_owner(group, &dep.name);
        }
    }
    seeded
}

/// `a.b.Outer$Inner` for a class node at `project.a.b.Outer.Inner`.
fn binary_name(graph: &VersionedGraph, class: NodeId) -> Option<String> {
    let node = graph.node(class)?;
    let parent = graph.parent(class)?;
    if graph.kind(parent) == Some(NodeKind::Class) {
        return Some(format!("{}${}", binary_name(graph, parent)?, node.name));
    }
    node.path.split_once('.').map(|(_, rest)| rest.to_string())
}

/// Callable shape of a stored method segment such as `save(a.Order, int)`.
fn method_entry(signature: &str) -> MethodEntry {
    let (name, params) = signature.split_once('(').unwrap_or((signature, ""));
    let params = params.trim_end_matches(')').trim();
    let mut arity = usize::from(!params.is_empty());
    let mut depth = 0usize;
    for c in params.chars() {
        match c {
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => arity += 1,
            _ => {}
        }
    }
    MethodEntry {
        name: name.to_string(),
        arity,
        signature: signature.to_string(),
    }
}

/// Two passes: every class name first, then method signatures, which need
/// the names to resolve parameter types.
fn index_units(index: &ClassIndex, project: &str, units: &[ExtractionResult]) {
    for unit in units {
        for class in &unit.classes {
            index.insert(unit.qualified(&class.name), project, &unit.path);
        }
    }
    for unit in units {
        let resolver = TypeResolver::new(unit, index);
        for class in &unit.classes {
            let entries = resolver.method_entries(&class.methods);
            index.set_methods(&unit.qualified(&class.name), entries);
        }
    }
}

/// Writes the facts of one unit through the run.
struct Applier<'r, 'g> {
    run: &'r mut AnalysisRun<'g>,
    index: &'r ClassIndex,
    external: String,
    report: &'r mut IndexReport,
}

impl Applier<'_, '_> {
    /// Graph path of a class. The `$` of a nested class's binary name places
    /// it below its outer class.
    fn class_path(&self, qualified_name: &str) -> String {
        let project = match self.index.project_of(qualified_name) {
            Some(owner) => project_segment(&owner),
            None => self.external.clone(),
        };
        format!("{}.{}", project, qualified_name)
    }

    fn apply(&mut self, unit: &ExtractionResult) {
        let resolver = TypeResolver::new(unit, self.index);
        for class in &unit.classes {
            let fqn = unit.qualified(&class.name);
            let class_path = self.class_path(&fqn);
            let attrs = NodeAttributes {
                is_service: class.is_service,
            };
            let node = match self.run.ensure_node(&class_path, NodeKind::Class, attrs) {
                Ok(node) => node,
                Err(e) => {
                    self.reject(&class_path, e);
                    continue;
                }
            };
            self.report.classes += 1;

            for target in resolved_targets(&resolver, &class.type_refs) {
                let path = self.class_path(&target);
                self.depend(node, &path, NodeKind::Class);
            }

            for method in &class.methods {
                let method_path = format!("{}.{}", class_path, resolver.signature(method));
                let method_node = match self.run.ensure_node(&method_path, NodeKind::Method, NodeAttributes::default()) {
                    Ok(node) => node,
                    Err(e) => {
                        self.reject(&method_path, e);
                        continue;
                    }
                };
                self.report.methods += 1;

                for target in resolved_targets(&resolver, &method.type_refs) {
                    let path = self.class_path(&target);
                    self.depend(method_node, &path, NodeKind::Class);
                }
                for call in &method.calls {
                    if let Some((class, signature)) = resolver.call_target(&fqn, call) {
                        let path = format!("{}.{}", self.class_path(&class), signature);
                        self.depend(method_node, &path, NodeKind::Method);
                    }
                }
            }
        }
        self.report.units_applied += 1;
    }

    fn depend(&mut self, from: NodeId, to_path: &str, to_kind: NodeKind) {
        match self.run.record_dependency(from, to_path, to_kind) {
            Ok(Some(_)) => self.report.dependencies_recorded += 1,
            Ok(None) => {}
            Err(e) => self.reject(to_path, e),
        }
    }

    fn reject(&mut self, path: &str, error: GraphError) {
        tracing::warn!("Rejected {}: {}", path, error);
        self.report.rejected_facts += 1;
    }
}

/// Distinct dependency targets of a list of type names, in name order.
fn resolved_targets(resolver: &TypeResolver<'_>, names: &[String]) -> BTreeSet<String> {
    names.iter().filter_map(|name| resolver.class_target(name)).collect()
}
