//! Java language extractor using tree-sitter

use crate::error::ExtractionError;
use crate::extractor::{CallSite, ClassFacts, ExtractionResult, Import, LanguageExtractor, MethodFacts, Receiver};
use crate::parser_pool::{FileType, ParseRequest, ParserPool};
use std::collections::HashMap;
use std::path::Path;
use tree_sitter::Node;

const TYPE_DECLARATIONS: &[&str] = &[
    "class_declaration",
    "interface_declaration",
    "enum_declaration",
    "record_declaration",
    "annotation_type_declaration",
];

const CALLABLE_DECLARATIONS: &[&str] = &[
    "method_declaration",
    "constructor_declaration",
    "compact_constructor_declaration",
];

pub struct JavaExtractor {
    parser_pool: ParserPool,
}

impl JavaExtractor {
    pub fn new(parser_pool: ParserPool) -> Self {
        Self { parser_pool }
    }
}

impl LanguageExtractor for JavaExtractor {
    fn extract(&self, path: &Path, content: &[u8]) -> Result<ExtractionResult, ExtractionError> {
        let source_code =
            std::str::from_utf8(content).map_err(|_| ExtractionError::encoding_error(path.to_path_buf()))?;

        let request = ParseRequest {
            file_type: FileType::Java,
            content: source_code.to_string(),
            path: path.to_path_buf(),
        };
        let parse_result = self
            .parser_pool
            .parse_blocking(request)
            .map_err(|e| ExtractionError::read_failed(path.to_path_buf(), e.to_string()))?;

        let root = parse_result.tree.root_node();
        if root.has_error() {
            let line = first_error(root).map_or(0, |n| n.start_position().row + 1);
            return Err(ExtractionError::parse_failed(
                path.to_path_buf(),
                format!("syntax error at line {}", line),
            ));
        }

        let mut collector = JavaCollector::new(source_code.as_bytes());
        collector.visit_program(root);
        Ok(collector.into_result(path))
    }
}

fn first_error(node: Node) -> Option<Node> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    let mut cursor = node.walk();
    let children: Vec<Node> = node.children(&mut cursor).collect();
    children
        .into_iter()
        .filter(|child| child.has_error())
        .find_map(first_error)
}

fn named_children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).collect()
}

fn starts_uppercase(name: &str) -> bool {
    name.chars().next().is_some_and(char::is_uppercase)
}

/// Variable name to erased declared type, for the scope being walked.
type Scope = HashMap<String, String>;

struct JavaCollector<'a> {
    source: &'a [u8],
    package: Option<String>,
    imports: Vec<Import>,
    classes: Vec<ClassFacts>,
}

impl<'a> JavaCollector<'a> {
    fn new(source: &'a [u8]) -> Self {
        Self {
            source,
            package: None,
            imports: Vec::new(),
            classes: Vec::new(),
        }
    }

    fn into_result(self, path: &Path) -> ExtractionResult {
        ExtractionResult {
            path: path.to_path_buf(),
            package: self.package,
            imports: self.imports,
            classes: self.classes,
        }
    }

    fn text(&self, node: Node) -> &'a str {
        node.utf8_text(self.source).unwrap_or_default()
    }

    fn visit_program(&mut self, root: Node) {
        for child in named_children(root) {
            match child.kind() {
                "package_declaration" => {
                    self.package = named_children(child)
                        .into_iter()
                        .find(|c| matches!(c.kind(), "scoped_identifier" | "identifier"))
                        .map(|c| self.text(c).to_string());
                }
                "import_declaration" => self.visit_import(child),
                kind if TYPE_DECLARATIONS.contains(&kind) => self.visit_type(child, None),
                _ => {}
            }
        }
    }

    fn visit_import(&mut self, node: Node) {
        let mut cursor = node.walk();
        let children: Vec<Node> = node.children(&mut cursor).collect();
        let is_static = children.iter().any(|c| c.kind() == "static");
        let wildcard = children.iter().any(|c| c.kind() == "asterisk");
        if let Some(path) = children
            .iter()
            .find(|c| matches!(c.kind(), "scoped_identifier" | "identifier"))
        {
            self.imports.push(Import {
                path: self.text(*path).to_string(),
                wildcard,
                is_static,
            });
        }
    }

    fn visit_type(&mut self, node: Node, outer: Option<&str>) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let simple = self.text(name_node);
        let name = match outer {
            Some(outer) => format!("{}${}", outer, simple),
            None => simple.to_string(),
        };

        let mut class = ClassFacts {
            name: name.clone(),
            ..Default::default()
        };
        for child in named_children(node) {
            match child.kind() {
                "modifiers" => {
                    let annotations = self.annotations(child);
                    class.is_service = annotations
                        .iter()
                        .any(|a| a == "Service" || a.ends_with(".Service"));
                    class.type_refs.extend(annotations);
                }
                "superclass" | "super_interfaces" | "extends_interfaces" => {
                    self.collect_types(child, &mut class.type_refs);
                }
                _ => {}
            }
        }

        let mut fields = Scope::new();
        // Record components are fields.
        if node.kind() == "record_declaration" {
            if let Some(params) = node.child_by_field_name("parameters") {
                for param in named_children(params) {
                    self.declare_parameter(param, &mut fields, &mut class.type_refs);
                }
            }
        }

        let members = node
            .child_by_field_name("body")
            .map(|body| self.members(body))
            .unwrap_or_default();

        for member in &members {
            if matches!(member.kind(), "field_declaration" | "constant_declaration") {
                for child in named_children(*member) {
                    if child.kind() == "modifiers" {
                        class.type_refs.extend(self.annotations(child));
                    }
                }
                self.declare_variables(*member, &mut fields, &mut class.type_refs);
            }
        }

        for member in &members {
            if CALLABLE_DECLARATIONS.contains(&member.kind()) {
                let method = self.visit_method(*member, &fields);
                class.methods.push(method);
            }
        }

        tracing::trace!("Extracted class {} ({} methods)", name, class.methods.len());
        self.classes.push(class);

        for member in members {
            if TYPE_DECLARATIONS.contains(&member.kind()) {
                self.visit_type(member, Some(&name));
            }
        }
    }

    fn members<'t>(&self, body: Node<'t>) -> Vec<Node<'t>> {
        let mut members = Vec::new();
        for child in named_children(body) {
            if child.kind() == "enum_body_declarations" {
                members.extend(named_children(child));
            } else {
                members.push(child);
            }
        }
        members
    }

    fn visit_method(&self, node: Node, fields: &Scope) -> MethodFacts {
        let name = match node.kind() {
            "method_declaration" => node
                .child_by_field_name("name")
                .map(|n| self.text(n).to_string())
                .unwrap_or_default(),
            _ => "<init>".to_string(),
        };
        let mut method = MethodFacts {
            name,
            ..Default::default()
        };
        let mut scope = fields.clone();

        for child in named_children(node) {
            match child.kind() {
                "modifiers" => method.type_refs.extend(self.annotations(child)),
                "throws" => self.collect_types(child, &mut method.type_refs),
                _ => {}
            }
        }
        if let Some(return_type) = node.child_by_field_name("type") {
            self.collect_types(return_type, &mut method.type_refs);
        }
        if let Some(params) = node.child_by_field_name("parameters") {
            for param in named_children(params) {
                if let Some(erased) = self.declare_parameter(param, &mut scope, &mut method.type_refs) {
                    method.param_types.push(erased);
                }
            }
        }
        if let Some(body) = node.child_by_field_name("body") {
            self.visit_body(body, &mut scope, &mut method);
        }
        method
    }

    /// Declare a formal or spread parameter, returning its erased type.
    fn declare_parameter(&self, param: Node, scope: &mut Scope, refs: &mut Vec<String>) -> Option<String> {
        match param.kind() {
            "formal_parameter" => {
                let ty = param.child_by_field_name("type")?;
                self.collect_types(ty, refs);
                let erased = self.erasure(ty);
                if let Some(name) = param.child_by_field_name("name") {
                    scope.insert(self.text(name).to_string(), erased.clone());
                }
                Some(erased)
            }
            "spread_parameter" => {
                let children = named_children(param);
                let ty = children
                    .iter()
                    .find(|c| !matches!(c.kind(), "modifiers" | "variable_declarator"))?;
                self.collect_types(*ty, refs);
                let erased = format!("{}...", self.erasure(*ty));
                if let Some(name) = children
                    .iter()
                    .find(|c| c.kind() == "variable_declarator")
                    .and_then(|d| d.child_by_field_name("name"))
                {
                    scope.insert(self.text(name).to_string(), format!("{}[]", self.erasure(*ty)));
                }
                Some(erased)
            }
            _ => None,
        }
    }

    /// Field, constant or local variable declaration.
    fn declare_variables(&self, node: Node, scope: &mut Scope, refs: &mut Vec<String>) {
        let Some(ty) = node.child_by_field_name("type") else {
            return;
        };
        self.collect_types(ty, refs);
        let erased = self.erasure(ty);
        for declarator in named_children(node) {
            if declarator.kind() != "variable_declarator" {
                continue;
            }
            if let Some(name) = declarator.child_by_field_name("name") {
                scope.insert(self.text(name).to_string(), erased.clone());
            }
        }
    }

    fn visit_body(&self, node: Node, scope: &mut Scope, method: &mut MethodFacts) {
        match node.kind() {
            "local_variable_declaration" | "field_declaration" => {
                self.declare_variables(node, scope, &mut method.type_refs);
            }
            "enhanced_for_statement" => {
                if let Some(ty) = node.child_by_field_name("type") {
                    self.collect_types(ty, &mut method.type_refs);
                    if let Some(name) = node.child_by_field_name("name") {
                        scope.insert(self.text(name).to_string(), self.erasure(ty));
                    }
                }
            }
            "catch_type" => self.collect_types(node, &mut method.type_refs),
            "object_creation_expression" | "cast_expression" | "array_creation_expression" => {
                if let Some(ty) = node.child_by_field_name("type") {
                    self.collect_types(ty, &mut method.type_refs);
                }
            }
            "instanceof_expression" => {
                if let Some(ty) = node.child_by_field_name("right") {
                    self.collect_types(ty, &mut method.type_refs);
                }
            }
            "class_literal" => {
                if let Some(ty) = node.named_child(0) {
                    self.collect_types(ty, &mut method.type_refs);
                }
            }
            "marker_annotation" | "annotation" => {
                if let Some(name) = node.child_by_field_name("name") {
                    method.type_refs.push(self.text(name).to_string());
                }
            }
            "method_invocation" => {
                if let Some(call) = self.call_site(node, scope, &mut method.type_refs) {
                    method.calls.push(call);
                }
            }
            "field_access" => {
                if let Some(object) = node.child_by_field_name("object") {
                    let text = self.text(object);
                    if object.kind() == "identifier" && !scope.contains_key(text) && starts_uppercase(text) {
                        method.type_refs.push(text.to_string());
                    }
                }
            }
            _ => {}
        }

        for child in named_children(node) {
            self.visit_body(child, scope, method);
        }
    }

    fn call_site(&self, node: Node, scope: &Scope, refs: &mut Vec<String>) -> Option<CallSite> {
        let name = self.text(node.child_by_field_name("name")?).to_string();
        let arity = node
            .child_by_field_name("arguments")
            .map(|args| {
                named_children(args)
                    .iter()
                    .filter(|a| !a.kind().ends_with("comment"))
                    .count()
            })
            .unwrap_or(0);

        let receiver = match node.child_by_field_name("object") {
            None => Receiver::This,
            Some(object) => match object.kind() {
                "this" => Receiver::This,
                "identifier" => {
                    let text = self.text(object);
                    match scope.get(text) {
                        Some(ty) => Receiver::Type(ty.clone()),
                        None if starts_uppercase(text) => {
                            refs.push(text.to_string());
                            Receiver::Type(text.to_string())
                        }
                        None => return None,
                    }
                }
                "field_access" => {
                    let inner = object.child_by_field_name("object")?;
                    let field = self.text(object.child_by_field_name("field")?);
                    if inner.kind() == "this" {
                        Receiver::Type(scope.get(field)?.clone())
                    } else if starts_uppercase(field) {
                        let qualified = self.text(object).to_string();
                        refs.push(qualified.clone());
                        Receiver::Type(qualified)
                    } else {
                        return None;
                    }
                }
                _ => return None,
            },
        };

        Some(CallSite { receiver, name, arity })
    }

    fn annotations(&self, modifiers: Node) -> Vec<String> {
        named_children(modifiers)
            .into_iter()
            .filter(|c| matches!(c.kind(), "marker_annotation" | "annotation"))
            .filter_map(|c| c.child_by_field_name("name"))
            .map(|n| self.text(n).to_string())
            .collect()
    }

    /// Every class name mentioned in a type, including generic arguments.
    fn collect_types(&self, node: Node, out: &mut Vec<String>) {
        match node.kind() {
            "type_identifier" | "scoped_type_identifier" => {
                out.push(self.text(node).split_whitespace().collect());
            }
            _ => {
                for child in named_children(node) {
                    self.collect_types(child, out);
                }
            }
        }
    }

    /// Type as it appears in a signature: generics dropped, arrays kept.
    fn erasure(&self, node: Node) -> String {
        match node.kind() {
            "generic_type" => node
                .named_child(0)
                .map(|base| self.erasure(base))
                .unwrap_or_default(),
            "array_type" => {
                let element = node
                    .child_by_field_name("element")
                    .map(|e| self.erasure(e))
                    .unwrap_or_default();
                let dims = node
                    .child_by_field_name("dimensions")
                    .map_or(1, |d| self.text(d).matches('[').count());
                format!("{}{}", element, "[]".repeat(dims))
            }
            "annotated_type" => named_children(node)
                .last()
                .map(|ty| self.erasure(*ty))
                .unwrap_or_default(),
            _ => self.text(node).split_whitespace().collect(),
        }
    }
}
