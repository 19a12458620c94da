//! Source scanning, symbol resolution and call-graph construction

pub mod scanner;
pub mod resolver;
pub mod classify;
pub mod builder;
pub mod tasks;


#[cfg(test)]
pub mod test_utils;

use std::path::PathBuf;

pub use scanner::{ScanOptions, SourceScanner};
pub use resolver::{FileSymbols, FunctionDef, ImportMap, PythonParser, Resolution, SymbolResolver};
pub use classify::{Classification, PathRule, RuleTable};
pub use builder::{GraphBuilder, module_path};
pub use tasks::{RoadmapTask, TaskRelation, TaskSync};

/// Errors that abort a build. Per-file problems are never reported here.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("project root {0} is not a directory")]
    RootNotFound(PathBuf),
    #[error("failed to load python grammar: {0}")]
    Grammar(#[from] tree_sitter::LanguageError),
}
