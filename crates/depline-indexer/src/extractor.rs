//! Facts extracted from one source unit, before name resolution

use crate::error::ExtractionError;
use std::path::{Path, PathBuf};

/// One `import` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    /// Dotted path without the trailing `.*`.
    pub path: String,
    pub wildcard: bool,
    pub is_static: bool,
}

/// Whom a call is made on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Receiver {
    /// Unqualified call, or on `this`.
    This,
    /// Call on a type, or on a variable whose declared type is known.
    Type(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSite {
    pub receiver: Receiver,
    pub name: String,
    pub arity: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MethodFacts {
    /// `<init>` for constructors.
    pub name: String,
    /// Erased parameter types as written, e.g. `List`, `int`, `String[]`.
    pub param_types: Vec<String>,
    /// Type names referenced anywhere in the signature or body.
    pub type_refs: Vec<String>,
    pub calls: Vec<CallSite>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassFacts {
    /// Binary name inside the package, `Outer$Inner` for nested classes.
    pub name: String,
    pub is_service: bool,
    /// Supertypes, annotations and field types.
    pub type_refs: Vec<String>,
    pub methods: Vec<MethodFacts>,
}

/// Everything one source unit says about its classes.
#[derive(Debug, Clone, Default)]
pub struct ExtractionResult {
    pub path: PathBuf,
    pub package: Option<String>,
    pub imports: Vec<Import>,
    pub classes: Vec<ClassFacts>,
}

impl ExtractionResult {
    /// Fully qualified binary name of a class declared in this unit.
    pub fn qualified(&self, class: &str) -> String {
        match &self.package {
            Some(package) => format!("{}.{}", package, class),
            None => class.to_string(),
        }
    }
}

/// A source language front end.
pub trait LanguageExtractor: Send + Sync {
    fn extract(&self, path: &Path, content: &[u8]) -> Result<ExtractionResult, ExtractionError>;
}
