//! Class index for cross-file resolution

use dashmap::DashMap;
use std::path::{Path, PathBuf};

/// A method as it can be called from other classes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodEntry {
    pub name: String,
    pub arity: usize,
    /// Path segment of the method node, e.g. `save(com.acme.Order)`.
    pub signature: String,
}

#[derive(Debug, Clone)]
pub struct ClassEntry {
    pub project: String,
    /// Source file, for classes of the analyzed sources.
    pub file: Option<PathBuf>,
    pub methods: Vec<MethodEntry>,
}

/// Fully qualified class names of the analyzed sources and of other known
/// projects. Thread-safe for concurrent access.
pub struct ClassIndex {
    classes: DashMap<String, ClassEntry>,
    /// For fast file lookup: file path -> classes declared in that file
    file_classes: DashMap<PathBuf, Vec<String>>,
    /// Package prefix -> projects declaring it, for classes not indexed by name
    package_owners: DashMap<String, Vec<String>>,
}

impl ClassIndex {
    pub fn new() -> Self {
        ClassIndex {
            classes: DashMap::new(),
            file_classes: DashMap::new(),
            package_owners: DashMap::new(),
        }
    }

    /// Register a class declared in `file` of `project`.
    pub fn insert(&self, qualified_name: String, project: &str, file: &Path) {
        self.classes.insert(
            qualified_name.clone(),
            ClassEntry {
                project: project.to_string(),
                file: Some(file.to_path_buf()),
                methods: Vec::new(),
            },
        );
        self.file_classes
            .entry(file.to_path_buf())
            .or_default()
            .push(qualified_name);
    }

    /// Register a class of another project, known without its sources.
    pub fn insert_known(&self, qualified_name: String, project: &str, methods: Vec<MethodEntry>) {
        self.classes.insert(
            qualified_name,
            ClassEntry {
                project: project.to_string(),
                file: None,
                methods,
            },
        );
    }

    /// Attribute classes below `prefix` that are not indexed by name to `project`.
    pub fn add_package_owner(&self, prefix: &str, project: &str) {
        let mut owners = self.package_owners.entry(prefix.to_string()).or_default();
        if !owners.iter().any(|o| o == project) {
            owners.push(project.to_string());
        }
    }

    pub fn contains(&self, qualified_name: &str) -> bool {
        self.classes.contains_key(qualified_name)
    }

    /// Project owning a class. Classes not indexed by name go to the sole
    /// owner of their longest registered package prefix.
    pub fn project_of(&self, qualified_name: &str) -> Option<String> {
        if let Some(entry) = self.classes.get(qualified_name) {
            return Some(entry.project.clone());
        }
        let mut prefix = qualified_name;
        while let Some((head, _)) = prefix.rsplit_once('.') {
            prefix = head;
            if let Some(owners) = self.package_owners.get(prefix) {
                return match owners.as_slice() {
                    [only] => Some(only.clone()),
                    _ => None,
                };
            }
        }
        None
    }

    pub fn set_methods(&self, qualified_name: &str, methods: Vec<MethodEntry>) {
        if let Some(mut entry) = self.classes.get_mut(qualified_name) {
            entry.methods = methods;
        }
    }

    /// Signature of the only method of `class` with this name and arity.
    pub fn find_method(&self, qualified_name: &str, name: &str, arity: usize) -> Option<String> {
        let entry = self.classes.get(qualified_name)?;
        let mut matches = entry
            .methods
            .iter()
            .filter(|m| m.name == name && m.arity == arity);
        match (matches.next(), matches.next()) {
            (Some(only), None) => Some(only.signature.clone()),
            _ => None,
        }
    }

    /// Get all classes declared in a file.
    pub fn classes_in_file(&self, file: &Path) -> Vec<String> {
        self.file_classes
            .get(file)
            .map(|r| r.value().clone())
            .unwrap_or_default()
    }

    /// Remove all classes of a file.
    pub fn remove_file(&self, file: &Path) {
        if let Some((_, names)) = self.file_classes.remove(file) {
            for name in names {
                self.classes.remove(&name);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

impl Default for ClassIndex {
    fn default() -> Self {
        Self::new()
    }
}
