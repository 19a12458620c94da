//! Roadmap checklist extraction and task-to-function relations

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use archgraph_core::{GraphData, NodeType};
use regex::Regex;
use serde::{Deserialize, Serialize};

static CHECKLIST_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*- \[( |x|X)\]\s+(.*)$").expect("valid checklist regex"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoadmapTask {
    pub title: String,
    pub done: bool,
    /// File name the task was read from.
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRelation {
    pub task: String,
    pub function_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSync {
    pub tasks: Vec<RoadmapTask>,
    pub relations: Vec<TaskRelation>,
}

/// Checklist items (`- [ ] title`, `- [x] title`) in a Markdown document.
pub fn extract_tasks(content: &str, source: &str) -> Vec<RoadmapTask> {
    content
        .lines()
        .filter_map(|line| CHECKLIST_ITEM.captures(line))
        .map(|caps| RoadmapTask {
            title: caps[2].trim().to_string(),
            done: caps[1].eq_ignore_ascii_case("x"),
            source: source.to_string(),
        })
        .collect()
}

/// Read every roadmap file under `root`. Missing or unreadable files are skipped.
pub fn collect_tasks(root: &Path, sources: &[PathBuf]) -> Vec<RoadmapTask> {
    let mut tasks = Vec::new();
    for source in sources {
        let path = root.join(source);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                tracing::debug!("Skipping roadmap {}: {}", path.display(), e);
                continue;
            }
        };
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        tasks.extend(extract_tasks(&content, &name));
    }
    tasks
}

/// Relate each task to every function whose label occurs in its title
/// (case-insensitive).
pub fn relate_tasks(tasks: Vec<RoadmapTask>, graph: &GraphData) -> TaskSync {
    let labels: Vec<(&str, String)> = graph
        .nodes
        .iter()
        .filter(|n| n.node_type == NodeType::Function && !n.label.is_empty())
        .map(|n| (n.id.as_str(), n.label.to_lowercase()))
        .collect();

    let mut relations = Vec::new();
    for task in &tasks {
        let title = task.title.to_lowercase();
        for (id, label) in &labels {
            if title.contains(label.as_str()) {
                relations.push(TaskRelation {
                    task: task.title.clone(),
                    function_id: id.to_string(),
                });
            }
        }
    }

    TaskSync { tasks, relations }
}
