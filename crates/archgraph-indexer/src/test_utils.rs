//! Test utilities for archgraph-indexer

use std::fs;
use tempfile::TempDir;

/// Create a repository with a specific file structure
pub fn create_repo_with_structure(structure: &[(&str, &str)]) -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();

    for (path, content) in structure {
        let full_path = root.join(path);

        // Create parent directories if needed
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).unwrap();
        }

        fs::write(&full_path, content).unwrap();
    }

    temp_dir
}

/// A small project laid out the way the classifier expects
pub fn create_staff_project() -> TempDir {
    create_repo_with_structure(&[
        (
            "app/routes/owner/shifts/api.py",
            r#"
from app.services.shifts.planner import plan_week
from app.entities.shift import Shift as ShiftEntity
import logging

log = logging.getLogger(__name__)

def list_shifts(owner_id):
    rows = plan_week(owner_id)
    log.info("listed")
    return [ShiftEntity(r) for r in rows]

def create_shift(payload):
    validate(payload)
    return ShiftEntity(payload).save()

def validate(payload):
    return bool(payload)
"#,
        ),
        (
            "app/services/shifts/planner.py",
            r#"
import datetime as dt

def plan_week(owner_id):
    start = dt.date.today()
    return build_rows(start)

def build_rows(start):
    return []
"#,
        ),
        (
            "app/entities/shift.py",
            r#"
class Shift:
    def __init__(self, data):
        self.data = data

    def save(self):
        return self.data
"#,
        ),
        ("app/broken.py", "def broken(:\n    pass\n"),
        ("docs/readme.md", "# not python"),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_staff_project() {
        let temp_dir = create_staff_project();
        let root = temp_dir.path();

        assert!(root.join("app/routes/owner/shifts/api.py").exists());
        assert!(root.join("app/services/shifts/planner.py").exists());
        assert!(root.join("app/broken.py").exists());
    }
}
