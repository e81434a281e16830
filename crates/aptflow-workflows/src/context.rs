//! Execution Context - Accumulating state for one workflow run
//!
//! Seeded from the caller's input and extended after every step with
//! `"<worker>_result"`. Keys keep insertion order and are never removed
//! during a run. One context belongs to exactly one execution.

use chrono::{DateTime, Utc};
use serde_json::Value;

use aptflow_core::Record;

/// Context key under which a worker's latest payload is stored
pub fn result_key(worker: &str) -> String {
    format!("{worker}_result")
}

/// Workflow execution context
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    /// Workflow label ("custom" for ad-hoc step lists)
    pub workflow: String,
    /// Execution ID (unique per run)
    pub execution_id: String,
    pub started_at: DateTime<Utc>,
    variables: Record,
}

impl ExecutionContext {
    pub fn new(workflow: &str, seed: Record) -> Self {
        Self {
            workflow: workflow.to_string(),
            execution_id: uuid::Uuid::new_v4().to_string(),
            started_at: Utc::now(),
            variables: seed,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.variables.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.variables.insert(key.into(), value);
    }

    /// Store a step payload under the worker's result key, replacing any earlier one
    pub fn record_result(&mut self, worker: &str, payload: Value) {
        self.set(result_key(worker), payload);
    }

    /// Input for the next step: the accumulated context with `overrides` merged on top
    pub fn step_input(&self, overrides: Option<&Record>) -> Record {
        let mut input = self.variables.clone();
        if let Some(overrides) = overrides {
            for (key, value) in overrides {
                input.insert(key.clone(), value.clone());
            }
        }
        input
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    pub fn variables(&self) -> &Record {
        &self.variables
    }

    pub fn into_variables(self) -> Record {
        self.variables
    }
}
