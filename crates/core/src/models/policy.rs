//! Department to group assignment policy.

use std::collections::BTreeMap;

use crate::config::GroupsConfig;

/// Groups assigned to newly created accounts, keyed by department.
///
/// Loaded once per run and read-only afterwards. Department lookup ignores
/// ASCII case; unknown departments resolve to the default group list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepartmentGroupPolicy {
    departments: BTreeMap<String, Vec<String>>,
    default_groups: Vec<String>,
}

impl DepartmentGroupPolicy {
    pub fn new(departments: BTreeMap<String, Vec<String>>, default_groups: Vec<String>) -> Self {
        Self {
            departments,
            default_groups,
        }
    }

    pub fn from_config(config: &GroupsConfig) -> Self {
        Self::new(config.departments.clone(), config.default.clone())
    }

    /// Ordered group names for a department.
    pub fn groups_for(&self, department: &str) -> &[String] {
        let department = department.trim();
        if let Some(groups) = self.departments.get(department) {
            return groups;
        }
        self.departments
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(department))
            .map(|(_, groups)| groups.as_slice())
            .unwrap_or(&self.default_groups)
    }
}
