//! Reference workers
//!
//! Four domain workers backing the default workflow catalog. Each one shares the
//! plumbing in [`WorkerCore`]: backend consultation, private history and health probing.

mod assessment;
mod content;
mod monitoring;
mod personalization;

pub use assessment::AssessmentWorker;
pub use content::{ComplexityAnalyzer, ComplexityMetrics, ContentWorker};
pub use monitoring::MonitoringWorker;
pub use personalization::PersonalizationWorker;

use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, warn};

use aptflow_core::{OrchestratorConfig, Record, RecordExt};

use crate::backend::ReasoningBackend;
use crate::history::InteractionHistory;
use crate::registry::{RegistryError, WorkerRegistry};
use crate::worker::WorkerError;

/// Build a registry holding the four reference workers under their own names
pub fn builtin_registry(
    config: &OrchestratorConfig,
    backend: Arc<dyn ReasoningBackend>,
) -> Result<WorkerRegistry, RegistryError> {
    let capacity = config.history_capacity;
    let mut registry = WorkerRegistry::new();
    registry.register_worker(Arc::new(AssessmentWorker::new(backend.clone(), capacity)))?;
    registry.register_worker(Arc::new(PersonalizationWorker::new(backend.clone(), capacity)))?;
    registry.register_worker(Arc::new(ContentWorker::new(backend.clone(), capacity)))?;
    registry.register_worker(Arc::new(MonitoringWorker::new(backend, capacity)))?;
    Ok(registry)
}

/// Shared state and helpers for the reference workers
pub struct WorkerCore {
    name: &'static str,
    system_prompt: &'static str,
    backend: Arc<dyn ReasoningBackend>,
    history: InteractionHistory,
}

impl WorkerCore {
    pub fn new(
        name: &'static str,
        system_prompt: &'static str,
        backend: Arc<dyn ReasoningBackend>,
        history_capacity: usize,
    ) -> Self {
        Self {
            name,
            system_prompt,
            backend,
            history: InteractionHistory::new(history_capacity),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    pub fn history(&self) -> &InteractionHistory {
        &self.history
    }

    /// Read the action discriminator a worker dispatches on
    pub fn action<'a>(&self, input: &'a Record, field: &str) -> Result<&'a str, WorkerError> {
        input.str_field(field).ok_or_else(|| {
            WorkerError::invalid_input(format!("{} input is missing '{}'", self.name, field))
        })
    }

    /// Ask the backend for reasoning; `None` means callers use their fallback answer
    pub async fn consult(&self, context: Value) -> Option<String> {
        match self.backend.reason(self.system_prompt, &context).await {
            Ok(text) => Some(text),
            Err(e) => {
                warn!(worker = %self.name, error = %e, "Backend unavailable, using fallback");
                None
            }
        }
    }

    pub fn remember(&self, input: &Record, output: &Record) {
        self.history.record(input, &Value::Object(output.clone()));
        debug!(worker = %self.name, entries = self.history.len(), "Recorded interaction");
    }

    pub async fn health(&self) -> Result<Record, WorkerError> {
        self.backend.probe().await?;
        Ok(to_record(json!({
            "status": "ok",
            "backend": self.backend.name(),
            "history_entries": self.history.len(),
        })))
    }
}

/// Text to operate on: `text` at the top level, or nested under `context`
pub(crate) fn text_input(input: &Record) -> Option<&str> {
    input
        .str_field("text")
        .or_else(|| input.object_field("context").and_then(|c| c.str_field("text")))
}

/// Field at the top level, or nested under `context`
pub(crate) fn object_input<'a>(input: &'a Record, key: &str) -> Option<&'a Record> {
    input
        .object_field(key)
        .or_else(|| input.object_field("context").and_then(|c| c.object_field(key)))
}

pub(crate) fn to_record(value: Value) -> Record {
    aptflow_core::into_record(value)
}

pub(crate) fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

pub(crate) fn clamp01(x: f64) -> f64 {
    if x.is_nan() {
        0.0
    } else {
        x.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::HeuristicBackend;
    use crate::worker::{Worker, WorkerKind, ACTION_HEALTH_CHECK};
    use async_trait::async_trait;

    struct DownBackend;

    #[async_trait]
    impl ReasoningBackend for DownBackend {
        fn name(&self) -> &str {
            "down"
        }

        async fn reason(&self, _: &str, _: &Value) -> Result<String, WorkerError> {
            Err(WorkerError::Backend("connection refused".into()))
        }
    }

    #[test]
    fn test_builtin_registry_has_one_worker_per_kind() {
        let registry =
            builtin_registry(&OrchestratorConfig::default(), Arc::new(HeuristicBackend)).unwrap();
        assert_eq!(
            registry.list_names(),
            vec!["assessment", "content", "monitoring", "personalization"]
        );
        for kind in WorkerKind::ALL {
            assert_eq!(registry.resolve(kind.as_str()).unwrap().kind(), kind);
        }
    }

    #[tokio::test]
    async fn test_health_reports_backend_failure() {
        let worker = ContentWorker::new(Arc::new(DownBackend), 5);
        let mut input = Record::new();
        input.insert("content_type".into(), json!(ACTION_HEALTH_CHECK));

        let response = worker.execute(input).await;
        assert!(!response.success);
        assert!(response.error.unwrap().contains("connection refused"));
    }

    #[tokio::test]
    async fn test_fallback_when_backend_down() {
        let worker = AssessmentWorker::new(Arc::new(DownBackend), 5);
        let input = to_record(json!({"type": "dyslexia", "reading_time": 30, "comprehension_score": 1.0}));
        let output = worker.process(input).await.unwrap();
        assert_eq!(output["adaptive_feedback"], "Continue at your own pace");
        assert_eq!(output["confidence_level"], 0.5);
    }

    #[test]
    fn test_text_input_prefers_top_level() {
        let input = to_record(json!({"context": {"text": "nested"}}));
        assert_eq!(text_input(&input), Some("nested"));
        let input = to_record(json!({"text": "top", "context": {"text": "nested"}}));
        assert_eq!(text_input(&input), Some("top"));
    }
}
