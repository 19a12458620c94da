//! Recursive source file discovery

use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use serde::{Deserialize, Serialize};

/// What the scanner picks up while walking a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanOptions {
    /// File extensions to collect, without the leading dot.
    pub extensions: Vec<String>,
    /// Honour `.gitignore`/`.ignore` files.
    pub respect_gitignore: bool,
    /// Descend into dot-directories and collect dot-files.
    pub include_hidden: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        ScanOptions {
            extensions: vec!["py".to_string()],
            respect_gitignore: false,
            include_hidden: true,
        }
    }
}

pub struct SourceScanner {
    root: PathBuf,
    options: ScanOptions,
}

impl SourceScanner {
    pub fn new(root: impl Into<PathBuf>, options: ScanOptions) -> Self {
        SourceScanner {
            root: root.into(),
            options,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Walk the project and return candidate source files, sorted.
    ///
    /// Entries that cannot be read are skipped; nothing here aborts the walk.
    pub fn scan(&self) -> Vec<PathBuf> {
        let respect = self.options.respect_gitignore;
        let mut builder = WalkBuilder::new(&self.root);
        builder
            .hidden(!self.options.include_hidden)
            .ignore(respect)
            .parents(respect)
            .git_ignore(respect)
            .git_global(respect)
            .git_exclude(respect);

        let mut files = Vec::new();
        for entry in builder.build() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::debug!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };
            let is_file = entry.file_type().is_some_and(|t| t.is_file());
            if is_file && self.matches_extension(entry.path()) {
                files.push(entry.into_path());
            }
        }

        files.sort();
        tracing::debug!("Found {} source files under {}", files.len(), self.root.display());
        files
    }

    fn matches_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.options.extensions.iter().any(|want| want == ext))
    }
}
