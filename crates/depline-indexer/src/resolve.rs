//! Type name resolution within one source unit
//!
//! Order: explicit import, same package, nested class of the unit, wildcard
//! imports, then the name taken as fully qualified. Platform types
//! (`java.*`, `javax.*`) resolve but never become dependencies.

use crate::class_index::{ClassIndex, MethodEntry};
use crate::extractor::{CallSite, ExtractionResult, MethodFacts, Receiver};
use regex::Regex;
use std::sync::LazyLock;

static QUALIFIED_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_$][\w$]*(\.[A-Za-z_$][\w$]*)*$").expect("valid regex"));

static ARRAY_SUFFIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\[\]|\.\.\.)+$").expect("valid regex"));

const PRIMITIVES: &[&str] = &[
    "boolean", "byte", "char", "short", "int", "long", "float", "double", "void", "var",
];

/// Platform classes that are never tracked.
pub fn is_jre(qualified_name: &str) -> bool {
    qualified_name.starts_with("java.") || qualified_name.starts_with("javax.")
}

pub struct TypeResolver<'a> {
    unit: &'a ExtractionResult,
    index: &'a ClassIndex,
}

impl<'a> TypeResolver<'a> {
    pub fn new(unit: &'a ExtractionResult, index: &'a ClassIndex) -> Self {
        Self { unit, index }
    }

    /// Binary name of a type as written in this unit.
    pub fn resolve(&self, name: &str) -> Option<String> {
        if PRIMITIVES.contains(&name) || !QUALIFIED_NAME.is_match(name) {
            return None;
        }
        match name.split_once('.') {
            Some((first, _)) if first.starts_with(|c: char| c.is_lowercase()) => Some(self.normalize(name)),
            Some((first, tail)) => {
                let outer = self.resolve_simple(first)?;
                Some(self.normalize(&format!("{}.{}", outer, tail)))
            }
            None => self.resolve_simple(name),
        }
    }

    fn resolve_simple(&self, simple: &str) -> Option<String> {
        let explicit = self.unit.imports.iter().find(|i| {
            !i.wildcard && !i.is_static && i.path.rsplit('.').next() == Some(simple)
        });
        if let Some(import) = explicit {
            return Some(self.normalize(&import.path));
        }

        let local = self.unit.qualified(simple);
        if self.index.contains(&local) {
            return Some(local);
        }

        let nested_suffix = format!("${}", simple);
        if let Some(class) = self.unit.classes.iter().find(|c| c.name.ends_with(&nested_suffix)) {
            return Some(self.unit.qualified(&class.name));
        }

        self.unit
            .imports
            .iter()
            .filter(|i| i.wildcard && !i.is_static)
            .map(|i| self.normalize(&format!("{}.{}", i.path, simple)))
            .find(|candidate| self.index.contains(candidate))
    }

    /// Map a dotted name onto a known nested class (`a.Outer.Inner` to `a.Outer$Inner`).
    fn normalize(&self, dotted: &str) -> String {
        if self.index.contains(dotted) {
            return dotted.to_string();
        }
        let parts: Vec<&str> = dotted.split('.').collect();
        for split in (1..parts.len()).rev() {
            let candidate = format!("{}${}", parts[..split].join("."), parts[split..].join("$"));
            if self.index.contains(&candidate) {
                return candidate;
            }
        }
        dotted.to_string()
    }

    /// Class a dependency should point to, or `None` when no edge is recorded.
    pub fn class_target(&self, name: &str) -> Option<String> {
        self.resolve(name).filter(|fqn| !is_jre(fqn))
    }

    /// Path segment of a method node: `name(T1, T2)` with resolved parameter types.
    pub fn signature(&self, method: &MethodFacts) -> String {
        let params: Vec<String> = method
            .param_types
            .iter()
            .map(|param| {
                let base = ARRAY_SUFFIX.replace(param, "");
                let suffix = &param[base.len()..];
                let resolved = self.resolve(&base).unwrap_or_else(|| base.to_string());
                format!("{}{}", resolved, suffix)
            })
            .collect();
        format!("{}({})", method.name, params.join(", "))
    }

    pub fn method_entries(&self, methods: &[MethodFacts]) -> Vec<MethodEntry> {
        methods
            .iter()
            .map(|m| MethodEntry {
                name: m.name.clone(),
                arity: m.param_types.len(),
                signature: self.signature(m),
            })
            .collect()
    }

    /// Class and method signature a call lands on, if it is unambiguous.
    /// Unqualified calls fall back to enclosing classes.
    pub fn call_target(&self, current_class: &str, call: &CallSite) -> Option<(String, String)> {
        let (mut candidate, walk_outward) = match &call.receiver {
            Receiver::This => (Some(current_class.to_string()), true),
            Receiver::Type(ty) => (self.resolve(ty), false),
        };
        while let Some(class) = candidate {
            if let Some(signature) = self.index.find_method(&class, &call.name, call.arity) {
                return Some((class, signature));
            }
            candidate = if walk_outward {
                class.rsplit_once('$').map(|(outer, _)| outer.to_string())
            } else {
                None
            };
        }
        None
    }
}
