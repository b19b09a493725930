//! Terminal classification of asynchronous cloud tasks

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Tri-partition of cloud identifiers produced when polling finishes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseDoneResult {
    /// Identifiers whose task completed successfully
    pub success_cloud_ids: Vec<String>,

    /// Identifiers whose task reported a terminal failure
    pub failed_cloud_ids: Vec<String>,

    /// Identifiers whose terminal status could not be mapped to either
    pub unknown_cloud_ids: Vec<String>,
}

impl BaseDoneResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_success(&mut self, id: impl Into<String>) {
        self.success_cloud_ids.push(id.into());
    }

    pub fn add_failed(&mut self, id: impl Into<String>) {
        self.failed_cloud_ids.push(id.into());
    }

    pub fn add_unknown(&mut self, id: impl Into<String>) {
        self.unknown_cloud_ids.push(id.into());
    }

    /// Number of classified identifiers across all three sets
    pub fn total(&self) -> usize {
        self.success_cloud_ids.len() + self.failed_cloud_ids.len() + self.unknown_cloud_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    pub fn is_all_success(&self) -> bool {
        !self.success_cloud_ids.is_empty()
            && self.failed_cloud_ids.is_empty()
            && self.unknown_cloud_ids.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.success_cloud_ids.iter().any(|s| s == id)
            || self.failed_cloud_ids.iter().any(|s| s == id)
            || self.unknown_cloud_ids.iter().any(|s| s == id)
    }

    /// Append another classification to this one
    pub fn merge(&mut self, other: BaseDoneResult) {
        self.success_cloud_ids.extend(other.success_cloud_ids);
        self.failed_cloud_ids.extend(other.failed_cloud_ids);
        self.unknown_cloud_ids.extend(other.unknown_cloud_ids);
    }

    /// Sort every set so results are reproducible regardless of map order
    pub fn sorted(mut self) -> Self {
        self.success_cloud_ids.sort();
        self.failed_cloud_ids.sort();
        self.unknown_cloud_ids.sort();
        self
    }

    /// Check that `expected` is partitioned exactly: every id lands in one set,
    /// no id appears twice and nothing outside `expected` was classified.
    ///
    /// Returns a description of the first violation found.
    pub fn check_partition(&self, expected: &[String]) -> std::result::Result<(), String> {
        let expected_set: HashSet<&str> = expected.iter().map(String::as_str).collect();
        let mut seen: HashSet<&str> = HashSet::with_capacity(self.total());

        let all = self
            .success_cloud_ids
            .iter()
            .chain(&self.failed_cloud_ids)
            .chain(&self.unknown_cloud_ids);
        for id in all {
            if !expected_set.contains(id.as_str()) {
                return Err(format!("unexpected id {id} in result"));
            }
            if !seen.insert(id.as_str()) {
                return Err(format!("id {id} classified more than once"));
            }
        }

        if let Some(missing) = expected.iter().find(|id| !seen.contains(id.as_str())) {
            return Err(format!("id {missing} was not classified"));
        }
        Ok(())
    }

    /// Map task identifiers to the cloud objects each task acted upon
    ///
    /// Tasks missing from `lookup` are dropped, so callers must pass a lookup
    /// covering every classified task.
    pub fn expand<F>(&self, mut lookup: F) -> BaseDoneResult
    where
        F: FnMut(&str) -> Vec<String>,
    {
        let mut out = BaseDoneResult::new();
        for id in &self.success_cloud_ids {
            out.success_cloud_ids.extend(lookup(id));
        }
        for id in &self.failed_cloud_ids {
            out.failed_cloud_ids.extend(lookup(id));
        }
        for id in &self.unknown_cloud_ids {
            out.unknown_cloud_ids.extend(lookup(id));
        }
        out
    }
}

impl std::fmt::Display for BaseDoneResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} succeeded, {} failed, {} unknown",
            self.success_cloud_ids.len(),
            self.failed_cloud_ids.len(),
            self.unknown_cloud_ids.len()
        )
    }
}
