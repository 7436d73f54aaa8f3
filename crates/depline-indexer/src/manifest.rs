//! Build manifest readers for declared external dependencies

use crate::error::ExtractionError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("valid regex"));

/// Placeholders may refer to properties that hold placeholders themselves.
const MAX_INTERPOLATION_DEPTH: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestType {
    Maven, // pom.xml
    Cargo, // Cargo.toml
    Npm,   // package.json
}

impl ManifestType {
    pub fn file_name(self) -> &'static str {
        match self {
            ManifestType::Maven => "pom.xml",
            ManifestType::Cargo => "Cargo.toml",
            ManifestType::Npm => "package.json",
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        match path.file_name()?.to_str()? {
            "pom.xml" => Some(ManifestType::Maven),
            "Cargo.toml" => Some(ManifestType::Cargo),
            "package.json" => Some(ManifestType::Npm),
            _ => None,
        }
    }
}

/// Detect the build manifest of a source tree by file presence.
pub fn detect_manifest(root: &Path) -> Option<PathBuf> {
    [ManifestType::Maven, ManifestType::Cargo, ManifestType::Npm]
        .into_iter()
        .map(|ty| root.join(ty.file_name()))
        .find(|path| path.is_file())
}

/// One declared dependency: remote project and the version it is pinned to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeclaredDependency {
    pub name: String,
    pub version: String,
    /// Package namespace of the dependency's classes, when the manifest names one
    /// (a Maven `groupId`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

#[derive(Deserialize)]
struct CargoManifest {
    #[serde(default)]
    dependencies: BTreeMap<String, CargoDependency>,
    #[serde(default, rename = "build-dependencies")]
    build_dependencies: BTreeMap<String, CargoDependency>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CargoDependency {
    Version(String),
    Detailed {
        #[serde(default)]
        version: Option<String>,
    },
}

#[derive(Deserialize)]
struct PackageJson {
    #[serde(default)]
    dependencies: BTreeMap<String, String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Pom {
    group_id: Option<String>,
    artifact_id: Option<String>,
    version: Option<String>,
    parent: Option<PomParent>,
    #[serde(default)]
    properties: BTreeMap<String, String>,
    #[serde(default)]
    dependencies: PomDependencies,
    dependency_management: Option<PomDependencyManagement>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PomParent {
    group_id: Option<String>,
    version: Option<String>,
}

#[derive(Deserialize, Default)]
struct PomDependencies {
    #[serde(default)]
    dependency: Vec<PomDependency>,
}

#[derive(Deserialize)]
struct PomDependencyManagement {
    #[serde(default)]
    dependencies: PomDependencies,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PomDependency {
    group_id: String,
    artifact_id: String,
    version: Option<String>,
    scope: Option<String>,
}

/// Read the declared dependencies of a manifest, sorted by name.
pub fn read_manifest(path: &Path) -> Result<Vec<DeclaredDependency>, ExtractionError> {
    let ty = ManifestType::from_path(path)
        .ok_or_else(|| ExtractionError::manifest(path.to_path_buf(), "unsupported manifest type"))?;
    let content = std::fs::read_to_string(path).map_err(|e| ExtractionError::read_failed(path.to_path_buf(), e.to_string()))?;
    let parsed = match ty {
        ManifestType::Maven => parse_pom_xml(&content),
        ManifestType::Cargo => parse_cargo_toml(&content),
        ManifestType::Npm => parse_package_json(&content),
    };
    parsed.map_err(|message| ExtractionError::manifest(path.to_path_buf(), message))
}

pub fn parse_cargo_toml(content: &str) -> Result<Vec<DeclaredDependency>, String> {
    let manifest: CargoManifest = toml::from_str(content).map_err(|e| e.to_string())?;
    let mut declared = BTreeMap::new();
    // [dependencies] takes precedence over [build-dependencies]
    for (name, dep) in manifest.dependencies.into_iter().chain(manifest.build_dependencies) {
        let version = match dep {
            CargoDependency::Version(v) => Some(v),
            CargoDependency::Detailed { version } => version,
        };
        if let Some(version) = version {
            declared.entry(name).or_insert(version);
        }
    }
    Ok(collect(declared))
}

pub fn parse_package_json(content: &str) -> Result<Vec<DeclaredDependency>, String> {
    let package: PackageJson = serde_json::from_str(content).map_err(|e| e.to_string())?;
    Ok(collect(package.dependencies))
}

/// Dependencies of a Maven `pom.xml`, named by artifact id.
///
/// `${...}` placeholders are filled from `<properties>` and the project's
/// own coordinates (inherited from `<parent>` when missing). A dependency
/// without a version takes the one from `<dependencyManagement>`. Test-scoped
/// dependencies and those whose version stays unresolved are skipped.
pub fn parse_pom_xml(content: &str) -> Result<Vec<DeclaredDependency>, String> {
    let pom: Pom = quick_xml::de::from_str(content).map_err(|e| e.to_string())?;

    let mut properties = pom.properties.clone();
    let group_id = pom.group_id.clone().or_else(|| pom.parent.as_ref().and_then(|p| p.group_id.clone()));
    let version = pom.version.clone().or_else(|| pom.parent.as_ref().and_then(|p| p.version.clone()));
    let builtin = [
        ("project.groupId", group_id),
        ("project.artifactId", pom.artifact_id.clone()),
        ("project.version", version),
        ("project.parent.groupId", pom.parent.as_ref().and_then(|p| p.group_id.clone())),
        ("project.parent.version", pom.parent.as_ref().and_then(|p| p.version.clone())),
    ];
    for (key, value) in builtin {
        if let Some(value) = value {
            properties.entry(key.to_string()).or_insert(value);
        }
    }

    let managed: BTreeMap<(String, String), String> = pom
        .dependency_management
        .iter()
        .flat_map(|m| &m.dependencies.dependency)
        .filter_map(|d| {
            let version = d.version.clone()?;
            Some(((d.group_id.clone(), d.artifact_id.clone()), version))
        })
        .collect();

    let mut declared = BTreeMap::new();
    for dep in pom.dependencies.dependency {
        if dep.scope.as_deref() == Some("test") {
            continue;
        }
        let raw = dep
            .version
            .clone()
            .or_else(|| managed.get(&(dep.group_id.clone(), dep.artifact_id.clone())).cloned());
        let Some(version) = raw.and_then(|v| interpolate(&v, &properties)) else {
            tracing::debug!("No resolvable version for {}:{}", dep.group_id, dep.artifact_id);
            continue;
        };
        let group = interpolate(&dep.group_id, &properties);
        declared.entry(dep.artifact_id).or_insert((version, group));
    }

    Ok(declared
        .into_iter()
        .map(|(name, (version, group))| DeclaredDependency { name, version, group })
        .collect())
}

/// Replace every `${key}` in `value`. `None` if a placeholder stays unresolved.
fn interpolate(value: &str, properties: &BTreeMap<String, String>) -> Option<String> {
    let mut current = value.trim().to_string();
    for _ in 0..MAX_INTERPOLATION_DEPTH {
        if !PLACEHOLDER.is_match(&current) {
            return Some(current);
        }
        let mut missing = false;
        let next = PLACEHOLDER.replace_all(&current, |caps: &regex::Captures<'_>| match properties.get(&caps[1]) {
            Some(value) => value.trim().to_string(),
            None => {
                missing = true;
                String::new()
            }
        });
        if missing {
            return None;
        }
        current = next.into_owned();
    }
    None
}

fn collect(declared: BTreeMap<String, String>) -> Vec<DeclaredDependency> {
    declared
        .into_iter()
        .map(|(name, version)| DeclaredDependency {
            name,
            version,
            group: None,
        })
        .collect()
}
