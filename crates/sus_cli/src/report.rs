//! Run reports

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Passed,
    Failed,
}

/// A failed expectation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Failure {
    /// Zero-based step index
    pub step: usize,
    pub widget: String,
    pub field: String,
    pub expected: Value,
    pub actual: Value,
}

impl std::fmt::Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "step {}: {}.{} expected {}, got {}",
            self.step, self.widget, self.field, self.expected, self.actual
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub scenario: String,
    pub status: Status,
    pub steps: usize,
    pub expectations: usize,
    pub failures: Vec<Failure>,
    /// Observable state of every widget after the last step
    pub widgets: IndexMap<String, Value>,
}

impl RunReport {
    pub fn new(scenario: impl Into<String>) -> Self {
        Self {
            scenario: scenario.into(),
            status: Status::Passed,
            steps: 0,
            expectations: 0,
            failures: Vec::new(),
            widgets: IndexMap::new(),
        }
    }

    pub fn record_failure(&mut self, failure: Failure) {
        self.status = Status::Failed;
        self.failures.push(failure);
    }

    pub fn passed(&self) -> bool {
        self.status == Status::Passed
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize report")
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_json()?).with_context(|| format!("Failed to write {}", path.display()))
    }
}
