//! Importance scoring from role, subsystem and connectivity

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

/// Weight of a role that has no entry in the role table.
pub const UNKNOWN_ROLE_WEIGHT: f64 = 0.4;

/// Weight of a subsystem that has no entry in the subsystem table.
pub const UNKNOWN_SUBSYSTEM_WEIGHT: f64 = 0.5;

const ROLE_FACTOR: f64 = 0.4;
const SUBSYSTEM_FACTOR: f64 = 0.3;
const CONNECTIVITY_FACTOR: f64 = 0.3;

/// Weights are rounded to this many decimal places.
const PRECISION: i32 = 6;

pub fn default_role_weights() -> HashMap<String, f64> {
    [
        ("owner", 0.9),
        ("manager", 0.8),
        ("admin", 0.7),
        ("employee", 0.6),
        ("moderator", 0.5),
        ("system", 0.4),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

/// Runtime overrides for the role and subsystem tables.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeightOverrides {
    #[serde(default)]
    pub roles: BTreeMap<String, f64>,
    #[serde(default)]
    pub subsystems: BTreeMap<String, f64>,
}

impl WeightOverrides {
    pub fn is_empty(&self) -> bool {
        self.roles.is_empty() && self.subsystems.is_empty()
    }
}

/// Deterministic scoring function:
/// `role*0.4 + subsystem*0.3 + connectivity*0.3`, rounded.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightModel {
    roles: HashMap<String, f64>,
    subsystems: HashMap<String, f64>,
}

impl Default for WeightModel {
    fn default() -> Self {
        WeightModel {
            roles: default_role_weights(),
            subsystems: HashMap::new(),
        }
    }
}

impl WeightModel {
    /// Built-in tables with `overrides` laid on top, key by key.
    pub fn with_overrides(overrides: &WeightOverrides) -> Self {
        let mut model = Self::default();
        model.apply(overrides);
        model
    }

    pub fn apply(&mut self, overrides: &WeightOverrides) {
        for (role, w) in &overrides.roles {
            self.roles.insert(role.clone(), *w);
        }
        for (subsystem, w) in &overrides.subsystems {
            self.subsystems.insert(subsystem.clone(), *w);
        }
    }

    pub fn role_weight(&self, role: &str) -> f64 {
        self.roles.get(role).copied().unwrap_or(UNKNOWN_ROLE_WEIGHT)
    }

    pub fn subsystem_weight(&self, subsystem: &str) -> f64 {
        self.subsystems
            .get(subsystem)
            .copied()
            .unwrap_or(UNKNOWN_SUBSYSTEM_WEIGHT)
    }

    pub fn weight(
        &self,
        role: &str,
        subsystem: &str,
        degree_in: u32,
        degree_out: u32,
        max_degree: u32,
    ) -> f64 {
        let raw = self.role_weight(role) * ROLE_FACTOR
            + self.subsystem_weight(subsystem) * SUBSYSTEM_FACTOR
            + connectivity(degree_in, degree_out, max_degree) * CONNECTIVITY_FACTOR;
        round(raw)
    }
}

/// Normalized connection count in `[0, 1]`. Zero when `max_degree` is zero.
pub fn connectivity(degree_in: u32, degree_out: u32, max_degree: u32) -> f64 {
    if max_degree == 0 {
        return 0.0;
    }
    let connections = f64::from(degree_in) + f64::from(degree_out);
    (connections / f64::from(max_degree)).clamp(0.0, 1.0)
}

fn round(value: f64) -> f64 {
    let scale = 10f64.powi(PRECISION);
    (value * scale).round() / scale
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_role_and_default_subsystem() {
        let model = WeightModel::default();
        // 0.9*0.4 + 0.5*0.3 + 1.0*0.3
        assert_eq!(model.weight("owner", "billing", 3, 1, 4), 0.81);
    }

    #[test]
    fn test_unknown_role_falls_back() {
        let model = WeightModel::default();
        assert_eq!(model.role_weight("intern"), UNKNOWN_ROLE_WEIGHT);
        assert_eq!(model.weight("intern", "x", 0, 0, 1), 0.31);
    }

    #[test]
    fn test_zero_degrees_and_zero_max_degree() {
        assert_eq!(connectivity(0, 0, 5), 0.0);
        assert_eq!(connectivity(3, 2, 0), 0.0);
        let model = WeightModel::default();
        assert_eq!(model.weight("system", "x", 3, 2, 0), 0.31);
    }

    #[test]
    fn test_connectivity_is_clamped() {
        assert_eq!(connectivity(10, 10, 4), 1.0);
    }

    #[test]
    fn test_overrides_merge_over_defaults() {
        let mut overrides = WeightOverrides::default();
        overrides.roles.insert("owner".into(), 0.1);
        overrides.subsystems.insert("billing".into(), 1.0);
        let model = WeightModel::with_overrides(&overrides);

        assert_eq!(model.role_weight("owner"), 0.1);
        assert_eq!(model.role_weight("manager"), 0.8);
        assert_eq!(model.subsystem_weight("billing"), 1.0);
        assert_eq!(model.subsystem_weight("shifts"), UNKNOWN_SUBSYSTEM_WEIGHT);
    }

    #[test]
    fn test_weight_is_deterministic() {
        let model = WeightModel::default();
        let a = model.weight("manager", "shifts", 7, 3, 13);
        let b = model.weight("manager", "shifts", 7, 3, 13);
        assert_eq!(a.to_bits(), b.to_bits());
    }
}
