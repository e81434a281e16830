//! Worker Contract
//!
//! Single trait that every agent implements, regardless of its domain.
//! Generic orchestration code only ever calls [`Worker::execute`], which never fails;
//! domain-aware call sites may call [`Worker::process`] directly.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use thiserror::Error;
use tracing::warn;

use aptflow_core::Record;

/// Action every worker answers by probing its reasoning backend
pub const ACTION_HEALTH_CHECK: &str = "health_check";

/// Closed set of worker kinds. All per-kind rule tables match on this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerKind {
    /// Assessment scoring (dyslexia, ADHD)
    Assessment,
    /// Settings optimization and preference learning
    Personalization,
    /// Text complexity analysis and adaptation
    Content,
    /// Progress tracking and intervention recommendations
    Monitoring,
}

impl WorkerKind {
    pub const ALL: [WorkerKind; 4] = [
        WorkerKind::Assessment,
        WorkerKind::Personalization,
        WorkerKind::Content,
        WorkerKind::Monitoring,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerKind::Assessment => "assessment",
            WorkerKind::Personalization => "personalization",
            WorkerKind::Content => "content",
            WorkerKind::Monitoring => "monitoring",
        }
    }
}

impl fmt::Display for WorkerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Domain-level failure reported by a worker
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WorkerError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unsupported action '{action}' for worker '{worker}'")]
    UnsupportedAction { worker: String, action: String },

    #[error("Backend error: {0}")]
    Backend(String),

    /// Failure that halts the remaining steps of a sequential run
    #[error("Critical failure: {0}")]
    Critical(String),
}

impl WorkerError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        WorkerError::InvalidInput(msg.into())
    }

    pub fn unsupported(worker: &str, action: &str) -> Self {
        WorkerError::UnsupportedAction {
            worker: worker.to_string(),
            action: action.to_string(),
        }
    }

    pub fn is_critical(&self) -> bool {
        matches!(self, WorkerError::Critical(_))
    }
}

/// Structured outcome of [`Worker::execute`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerResponse {
    /// Whether the worker produced a result
    pub success: bool,
    /// Worker output on success
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Record>,
    /// Failure message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Set together with `success == false` to halt a sequential run
    #[serde(default)]
    pub critical: bool,
    /// Name of the worker that answered
    pub worker: String,
    /// What produced the answer (reasoning backend name, or "engine")
    pub provenance: String,
}

impl WorkerResponse {
    pub fn success(worker: &str, data: Record, provenance: &str) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            critical: false,
            worker: worker.to_string(),
            provenance: provenance.to_string(),
        }
    }

    pub fn failure(worker: &str, error: impl Into<String>, provenance: &str) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            critical: false,
            worker: worker.to_string(),
            provenance: provenance.to_string(),
        }
    }

    pub fn from_error(worker: &str, error: &WorkerError, provenance: &str) -> Self {
        Self::failure(worker, error.to_string(), provenance).with_critical(error.is_critical())
    }

    pub fn with_critical(mut self, critical: bool) -> Self {
        self.critical = critical && !self.success;
        self
    }

    /// Whether this response should stop a sequential run
    pub fn halts_run(&self) -> bool {
        !self.success && self.critical
    }
}

/// Worker Contract
///
/// Implementations must not depend on other workers: `process` is a function of
/// its input plus the worker's own internal state.
#[async_trait]
pub trait Worker: Send + Sync {
    /// Stable worker name (e.g. "assessment")
    fn name(&self) -> &str;

    /// Worker kind, used by the engine's shaping, collaboration and synthesis tables
    fn kind(&self) -> WorkerKind;

    /// Human-readable description
    fn description(&self) -> &str;

    /// Actions this worker understands
    fn actions(&self) -> Vec<&'static str>;

    /// What produced this worker's answers
    fn provenance(&self) -> &str {
        "local"
    }

    /// Domain entry point. Fails with [`WorkerError`] when the input is malformed.
    async fn process(&self, input: Record) -> Result<Record, WorkerError>;

    /// Generic invocation. Never fails: errors become `success: false` responses.
    async fn execute(&self, input: Record) -> WorkerResponse {
        match self.process(input).await {
            Ok(data) => WorkerResponse::success(self.name(), data, self.provenance()),
            Err(e) => {
                warn!(worker = %self.name(), error = %e, "Worker reported failure");
                WorkerResponse::from_error(self.name(), &e, self.provenance())
            }
        }
    }

    fn can_handle(&self, action: &str) -> bool {
        action == ACTION_HEALTH_CHECK || self.actions().contains(&action)
    }
}

/// Extension trait for worker metadata
pub trait WorkerMetadata: Worker {
    fn metadata(&self) -> Value {
        json!({
            "name": self.name(),
            "kind": self.kind(),
            "description": self.description(),
            "actions": self.actions(),
            "provenance": self.provenance(),
        })
    }
}

impl<T: Worker + ?Sized> WorkerMetadata for T {}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    #[async_trait]
    impl Worker for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        fn kind(&self) -> WorkerKind {
            WorkerKind::Content
        }

        fn description(&self) -> &str {
            "Echoes its input"
        }

        fn actions(&self) -> Vec<&'static str> {
            vec!["echo"]
        }

        async fn process(&self, input: Record) -> Result<Record, WorkerError> {
            match input.get("mode").and_then(Value::as_str) {
                Some("bad") => Err(WorkerError::invalid_input("bad mode")),
                Some("fatal") => Err(WorkerError::Critical("fatal mode".into())),
                _ => Ok(input),
            }
        }
    }

    fn record(value: Value) -> Record {
        aptflow_core::into_record(value)
    }

    #[tokio::test]
    async fn test_execute_wraps_success() {
        let response = Echo.execute(record(json!({"x": 1}))).await;
        assert!(response.success);
        assert_eq!(response.data.unwrap().get("x"), Some(&json!(1)));
        assert_eq!(response.provenance, "local");
    }

    #[tokio::test]
    async fn test_execute_converts_errors() {
        let response = Echo.execute(record(json!({"mode": "bad"}))).await;
        assert!(!response.success);
        assert!(!response.halts_run());
        assert_eq!(response.error.as_deref(), Some("Invalid input: bad mode"));

        let response = Echo.execute(record(json!({"mode": "fatal"}))).await;
        assert!(response.halts_run());
    }

    #[test]
    fn test_critical_requires_failure() {
        let ok = WorkerResponse::success("w", Record::new(), "local").with_critical(true);
        assert!(!ok.critical);
    }

    #[test]
    fn test_metadata_and_can_handle() {
        let meta = Echo.metadata();
        assert_eq!(meta["kind"], "content");
        assert!(Echo.can_handle("echo"));
        assert!(Echo.can_handle(ACTION_HEALTH_CHECK));
        assert!(!Echo.can_handle("other"));
    }

    #[test]
    fn test_response_serialization_skips_empty_fields() {
        let value = serde_json::to_value(WorkerResponse::failure("w", "nope", "engine")).unwrap();
        assert!(value.get("data").is_none());
        assert_eq!(value["critical"], false);
    }
}
