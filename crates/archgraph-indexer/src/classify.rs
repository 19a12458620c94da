//! Role and subsystem tags derived from directory conventions

use std::path::{Component, Path};

/// Directory names under `routes/` that name a role.
pub const ROLE_FOLDERS: &[&str] = &["owner", "manager", "employee", "admin", "moderator"];

pub const DEFAULT_ROLE: &str = "system";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub role: String,
    pub subsystem: String,
}

/// One entry of the rule table. A rule applies when its marker segment occurs
/// anywhere in the relative path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathRule {
    /// `<marker>/<role>/<subsystem>/...` where `<role>` is a known role folder.
    RoleRoutes { marker: String },
    /// Any of `markers` forces the default role; the segment after
    /// `subsystem_marker` (if present) is the subsystem.
    Handlers {
        markers: Vec<String>,
        subsystem_marker: String,
    },
    /// `<marker>/<subsystem>/...`
    Subsystem { marker: String },
}

impl PathRule {
    fn markers(&self) -> Vec<&str> {
        match self {
            PathRule::RoleRoutes { marker } | PathRule::Subsystem { marker } => vec![marker.as_str()],
            PathRule::Handlers { markers, .. } => markers.iter().map(String::as_str).collect(),
        }
    }
}

/// Ordered rule table; the first rule whose marker is present decides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleTable {
    rules: Vec<PathRule>,
    role_folders: Vec<String>,
}

impl Default for RuleTable {
    fn default() -> Self {
        RuleTable {
            rules: vec![
                PathRule::RoleRoutes {
                    marker: "routes".into(),
                },
                PathRule::Handlers {
                    markers: vec!["handlers".into(), "handlers_div".into()],
                    subsystem_marker: "handlers_div".into(),
                },
                PathRule::Subsystem {
                    marker: "services".into(),
                },
                PathRule::Subsystem {
                    marker: "entities".into(),
                },
            ],
            role_folders: ROLE_FOLDERS.iter().map(|r| r.to_string()).collect(),
        }
    }
}

impl RuleTable {
    pub fn new(rules: Vec<PathRule>, role_folders: Vec<String>) -> Self {
        RuleTable {
            rules,
            role_folders,
        }
    }

    /// Classify a path relative to the project root. Defaults to role
    /// `system` and the file stem as subsystem.
    pub fn classify(&self, relative: &Path) -> Classification {
        let parts: Vec<&str> = relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(s) => s.to_str(),
                _ => None,
            })
            .collect();

        let stem = relative
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default();
        let mut result = Classification {
            role: DEFAULT_ROLE.to_string(),
            subsystem: stem.to_string(),
        };

        let Some(rule) = self
            .rules
            .iter()
            .find(|rule| rule.markers().iter().any(|m| parts.contains(m)))
        else {
            return result;
        };

        match rule {
            PathRule::RoleRoutes { marker } => {
                let after = segments_after(&parts, marker);
                if let Some(role) = after
                    .first()
                    .filter(|r| self.role_folders.iter().any(|known| known == *r))
                {
                    result.role = role.to_string();
                    if after.len() > 1 {
                        result.subsystem = segment_name(&after[1..]);
                    }
                }
            }
            PathRule::Handlers {
                subsystem_marker, ..
            } => {
                let after = segments_after(&parts, subsystem_marker);
                if !after.is_empty() {
                    result.subsystem = segment_name(after);
                }
            }
            PathRule::Subsystem { marker } => {
                let after = segments_after(&parts, marker);
                if !after.is_empty() {
                    result.subsystem = segment_name(after);
                }
            }
        }
        result
    }
}

/// Segments following the first occurrence of `marker`; empty if absent.
fn segments_after<'a, 'p>(parts: &'a [&'p str], marker: &str) -> &'a [&'p str] {
    match parts.iter().position(|p| *p == marker) {
        Some(i) => &parts[i + 1..],
        None => &[],
    }
}

/// Name of the first of `rest`. A directory segment is used as-is; the file
/// segment (the last one) loses its extension.
fn segment_name(rest: &[&str]) -> String {
    let segment = rest[0];
    if rest.len() == 1 {
        Path::new(segment)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(segment)
            .to_string()
    } else {
        segment.to_string()
    }
}
