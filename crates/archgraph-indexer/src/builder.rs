//! Orchestrates scanning, resolution and graph assembly

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

use archgraph_core::{Edge, GraphData, Node, WeightModel, finalize};

use crate::classify::RuleTable;
use crate::resolver::PythonParser;
use crate::scanner::{ScanOptions, SourceScanner};
use crate::IndexError;

/// Dotted module path for a file relative to the project root:
/// `app/services/billing.py` → `app.services.billing`.
pub fn module_path(relative: &Path) -> String {
    let no_ext = relative.with_extension("");
    no_ext
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join(".")
}

/// `/`-separated relative path, independent of the host separator.
fn display_path(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Builds a [`GraphData`] for one project root. Every build re-walks and
/// re-parses the full tree.
pub struct GraphBuilder {
    scanner: SourceScanner,
    rules: RuleTable,
    weights: WeightModel,
}

impl GraphBuilder {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        GraphBuilder {
            scanner: SourceScanner::new(root, ScanOptions::default()),
            rules: RuleTable::default(),
            weights: WeightModel::default(),
        }
    }

    pub fn with_scan_options(mut self, options: ScanOptions) -> Self {
        let root = self.scanner.root().to_path_buf();
        self.scanner = SourceScanner::new(root, options);
        self
    }

    pub fn with_rules(mut self, rules: RuleTable) -> Self {
        self.rules = rules;
        self
    }

    pub fn with_weights(mut self, weights: WeightModel) -> Self {
        self.weights = weights;
        self
    }

    pub fn root(&self) -> &Path {
        self.scanner.root()
    }

    /// Scan, resolve and assemble the graph.
    ///
    /// Files that cannot be read or parsed are skipped. The first definition
    /// of a duplicate id wins, but calls made by later duplicates are still
    /// attributed to that id.
    pub fn build(&self) -> Result<GraphData, IndexError> {
        let root = self.scanner.root();
        if !root.is_dir() {
            return Err(IndexError::RootNotFound(root.to_path_buf()));
        }

        let mut parser = PythonParser::new()?;
        let mut seen: HashSet<String> = HashSet::new();
        let mut nodes = Vec::new();
        let mut edges = Vec::new();
        let mut skipped = 0usize;

        let files = self.scanner.scan();
        for path in &files {
            let relative = path.strip_prefix(root).unwrap_or(path);
            let content = match std::fs::read_to_string(path) {
                Ok(content) => content,
                Err(e) => {
                    tracing::warn!("Cannot read {}: {}", path.display(), e);
                    skipped += 1;
                    continue;
                }
            };

            let module = module_path(relative);
            let Some(symbols) = parser.parse(&module, &content) else {
                tracing::warn!("Skipping unparseable file {}", path.display());
                skipped += 1;
                continue;
            };

            let class = self.rules.classify(relative);
            let file = display_path(relative);
            tracing::debug!(
                "{}: {} functions, {} imports ({}/{})",
                file,
                symbols.functions.len(),
                symbols.imports.len(),
                class.role,
                class.subsystem
            );

            for function in symbols.functions {
                let id = format!("{}.{}", module, function.name);
                if seen.insert(id.clone()) {
                    nodes.push(Node::function(
                        id.clone(),
                        function.name,
                        class.role.clone(),
                        class.subsystem.clone(),
                        file.clone(),
                        (function.line_start, function.line_end),
                    ));
                }
                edges.extend(function.calls.into_iter().map(|target| Edge::calls(id.clone(), target)));
            }
        }

        let graph = finalize(nodes, edges, &self.weights);
        tracing::info!(
            "Parsed {} files ({} skipped): {} nodes, {} edges",
            files.len(),
            skipped,
            graph.stats.total_nodes,
            graph.stats.total_edges
        );
        Ok(graph)
    }
}
