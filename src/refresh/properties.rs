//! Property allow-list

use crate::domain::ProjectProperty;
use crate::error::{DepotError, DepotResult};
use regex::Regex;
use std::collections::BTreeMap;

/// Selects the upstream build properties kept on a version
///
/// An entry admits a property whose name equals it, or fully matches it
/// read as a regular expression. Every entry must be a valid expression.
#[derive(Debug, Clone, Default)]
pub struct PropertyFilter {
    names: Vec<String>,
    patterns: Vec<Regex>,
}

impl PropertyFilter {
    pub fn new(allow_list: &[String]) -> DepotResult<Self> {
        let patterns = allow_list
            .iter()
            .map(|entry| {
                Regex::new(&format!("^(?:{})$", entry)).map_err(|e| {
                    DepotError::SettingsInvalid(format!(
                        "include_properties entry '{}' is not a valid pattern: {}",
                        entry, e
                    ))
                })
            })
            .collect::<DepotResult<Vec<_>>>()?;

        Ok(Self {
            names: allow_list.to_vec(),
            patterns,
        })
    }

    pub fn matches(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name) || self.patterns.iter().any(|p| p.is_match(name))
    }

    /// Admitted properties of one version, in name order
    pub fn select(
        &self,
        version_id: &str,
        properties: &BTreeMap<String, String>,
    ) -> Vec<ProjectProperty> {
        properties
            .iter()
            .filter(|(name, _)| self.matches(name))
            .map(|(name, value)| ProjectProperty::new(name.clone(), value.clone(), version_id))
            .collect()
    }
}
