//! Python import and call resolution using tree-sitter
//!
//! Resolution is best-effort and purely syntactic: import aliases are mapped
//! to their dotted paths and call targets are rebuilt from the callee
//! expression. No type information is used, so `obj.method()` resolves to the
//! literal `obj.method` unless `obj` is an imported name.

use std::collections::HashMap;

use tree_sitter::{Node, Parser, Point, Tree};

use crate::IndexError;

/// Outcome of resolving one call expression. Only `Resolved` produces an edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved(String),
    Unresolved,
}

/// Local alias → fully-qualified path, built from a file's import statements.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportMap {
    aliases: HashMap<String, String>,
}

impl ImportMap {
    /// Collect every `import` / `from ... import` in the tree, nested ones included.
    pub fn collect(root: Node, source: &[u8]) -> Self {
        let mut map = ImportMap::default();
        visit(root, &mut |node| match node.kind() {
            "import_statement" => map.record_import(node, source),
            "import_from_statement" => map.record_import_from(node, source),
            _ => {}
        });
        map
    }

    pub fn get(&self, alias: &str) -> Option<&str> {
        self.aliases.get(alias).map(String::as_str)
    }

    pub fn insert(&mut self, alias: impl Into<String>, path: impl Into<String>) {
        self.aliases.insert(alias.into(), path.into());
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }

    /// `import a.b` binds `b`; `import a.b as c` binds `c`.
    fn record_import(&mut self, node: Node, source: &[u8]) {
        let mut cursor = node.walk();
        for name in node.children_by_field_name("name", &mut cursor) {
            match name.kind() {
                "dotted_name" => {
                    if let Some(path) = text(name, source) {
                        let alias = path.rsplit('.').next().unwrap_or(path);
                        self.insert(alias, path);
                    }
                }
                "aliased_import" => {
                    let path = name.child_by_field_name("name").and_then(|n| text(n, source));
                    let alias = name.child_by_field_name("alias").and_then(|n| text(n, source));
                    if let (Some(path), Some(alias)) = (path, alias) {
                        self.insert(alias, path);
                    }
                }
                _ => {}
            }
        }
    }

    /// `from m import x` binds `x` to `m.x`; `from m import x as y` binds `y`.
    /// Relative prefixes are dropped; a bare `from . import x` has no module
    /// and is skipped.
    fn record_import_from(&mut self, node: Node, source: &[u8]) {
        let Some(module) = node
            .child_by_field_name("module_name")
            .and_then(|n| text(n, source))
            .map(|m| m.trim_start_matches('.'))
            .filter(|m| !m.is_empty())
        else {
            return;
        };

        let mut cursor = node.walk();
        for name in node.children_by_field_name("name", &mut cursor) {
            let (symbol, alias) = match name.kind() {
                "dotted_name" => (text(name, source), text(name, source)),
                "aliased_import" => (
                    name.child_by_field_name("name").and_then(|n| text(n, source)),
                    name.child_by_field_name("alias").and_then(|n| text(n, source)),
                ),
                _ => continue,
            };
            if let (Some(symbol), Some(alias)) = (symbol, alias) {
                self.insert(alias, format!("{}.{}", module, symbol));
            }
        }
    }
}

/// Resolves call targets inside one module.
pub struct SymbolResolver<'a> {
    imports: &'a ImportMap,
    module: &'a str,
}

impl<'a> SymbolResolver<'a> {
    pub fn new(imports: &'a ImportMap, module: &'a str) -> Self {
        SymbolResolver { imports, module }
    }

    /// Resolve the `function` child of a `call` node.
    ///
    /// - `name()` → the imported path, else `module.name`
    /// - `a.b.c()` → `a` resolved through imports (or kept literal), then `.b.c`
    /// - anything rooted in a call, subscript or other expression → `Unresolved`
    pub fn resolve(&self, callee: Node, source: &[u8]) -> Resolution {
        match callee.kind() {
            "identifier" => match text(callee, source) {
                Some(name) => Resolution::Resolved(self.resolve_name(name)),
                None => Resolution::Unresolved,
            },
            "attribute" => self
                .resolve_attribute(callee, source)
                .map_or(Resolution::Unresolved, Resolution::Resolved),
            _ => Resolution::Unresolved,
        }
    }

    fn resolve_name(&self, name: &str) -> String {
        match self.imports.get(name) {
            Some(path) => path.to_string(),
            None => format!("{}.{}", self.module, name),
        }
    }

    fn resolve_attribute(&self, callee: Node, source: &[u8]) -> Option<String> {
        let mut parts = Vec::new();
        let mut current = callee;
        while current.kind() == "attribute" {
            parts.push(text(current.child_by_field_name("attribute")?, source)?);
            current = current.child_by_field_name("object")?;
        }
        if current.kind() != "identifier" {
            return None;
        }

        let root = text(current, source)?;
        let root = self.imports.get(root).unwrap_or(root);
        parts.push(root);
        parts.reverse();
        Some(parts.join("."))
    }
}

/// A function definition and the resolved targets of the calls inside it.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef {
    pub name: String,
    pub line_start: u32,
    pub line_end: u32,
    /// Resolved call targets in source order; duplicates are kept.
    pub calls: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileSymbols {
    pub imports: ImportMap,
    pub functions: Vec<FunctionDef>,
}

/// Owns a tree-sitter parser configured for Python.
pub struct PythonParser {
    parser: Parser,
}

impl PythonParser {
    pub fn new() -> Result<Self, IndexError> {
        let mut parser = Parser::new();
        parser.set_language(&tree_sitter_python::LANGUAGE.into())?;
        Ok(PythonParser { parser })
    }

    /// Parse `content` as module `module` and collect its functions and calls.
    ///
    /// Returns `None` for sources that do not parse cleanly; such files
    /// contribute nothing to the graph.
    pub fn parse(&mut self, module: &str, content: &str) -> Option<FileSymbols> {
        let tree = self.parser.parse(content, None)?;
        if tree.root_node().has_error() {
            return None;
        }
        Some(extract_symbols(&tree, module, content.as_bytes()))
    }
}

fn extract_symbols(tree: &Tree, module: &str, source: &[u8]) -> FileSymbols {
    let root = tree.root_node();
    let imports = ImportMap::collect(root, source);
    let resolver = SymbolResolver::new(&imports, module);

    let mut functions = Vec::new();
    visit(root, &mut |node| {
        if node.kind() != "function_definition" {
            return;
        }
        let Some(name) = node.child_by_field_name("name").and_then(|n| text(n, source)) else {
            return;
        };
        functions.push(FunctionDef {
            name: name.to_string(),
            line_start: line(node.start_position()),
            line_end: line(node.end_position()),
            calls: collect_calls(node, &resolver, source),
        });
    });

    FileSymbols { imports, functions }
}

/// Calls made anywhere inside a function, its decorators included.
fn collect_calls(function: Node, resolver: &SymbolResolver, source: &[u8]) -> Vec<String> {
    let mut calls = Vec::new();
    let mut on_node = |node: Node| {
        if node.kind() != "call" {
            return;
        }
        let Some(callee) = node.child_by_field_name("function") else {
            return;
        };
        match resolver.resolve(callee, source) {
            Resolution::Resolved(target) => calls.push(target),
            Resolution::Unresolved => {
                tracing::trace!("Dropping dynamic call at line {}", line(node.start_position()));
            }
        }
    };

    if let Some(parent) = function.parent().filter(|p| p.kind() == "decorated_definition") {
        let mut cursor = parent.walk();
        for decorator in parent.named_children(&mut cursor).filter(|c| c.kind() == "decorator") {
            visit(decorator, &mut on_node);
        }
    }
    visit(function, &mut on_node);
    calls
}

/// Pre-order walk over named nodes.
fn visit<'t>(node: Node<'t>, f: &mut impl FnMut(Node<'t>)) {
    f(node);
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        visit(child, f);
    }
}

fn text<'s>(node: Node, source: &'s [u8]) -> Option<&'s str> {
    node.utf8_text(source).ok()
}

fn line(point: Point) -> u32 {
    point.row as u32 + 1
}
