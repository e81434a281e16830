//! Reasoning backends
//!
//! The language-model / fallback strategy a worker consults. Workers only see
//! [`ReasoningBackend`]; the heuristic backend answers locally and deterministically.

use async_trait::async_trait;
use serde_json::Value;

use aptflow_core::Record;

use crate::worker::WorkerError;

#[async_trait]
pub trait ReasoningBackend: Send + Sync {
    /// Backend name, recorded as provenance on worker responses
    fn name(&self) -> &str;

    /// Produce free-form reasoning text for a prompt and structured context
    async fn reason(&self, system_prompt: &str, context: &Value) -> Result<String, WorkerError>;

    /// Liveness probe used by health checks
    async fn probe(&self) -> Result<(), WorkerError> {
        self.reason("health check", &Value::Null).await.map(|_| ())
    }
}

/// Local responder that never calls out of process
#[derive(Debug, Clone, Default)]
pub struct HeuristicBackend;

impl HeuristicBackend {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ReasoningBackend for HeuristicBackend {
    fn name(&self) -> &str {
        "heuristic"
    }

    async fn reason(&self, system_prompt: &str, context: &Value) -> Result<String, WorkerError> {
        let task = context
            .get("task")
            .and_then(Value::as_str)
            .unwrap_or("unspecified task");
        let persona = system_prompt.lines().next().unwrap_or_default().trim();
        Ok(format!("Heuristic analysis ({persona}): {task}"))
    }
}

/// Extract the outermost `{...}` JSON object embedded in backend text
pub fn extract_json_object(text: &str) -> Option<Record> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str::<Value>(&text[start..=end])
        .ok()
        .and_then(|v| match v {
            Value::Object(map) => Some(map),
            _ => None,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_heuristic_backend_mentions_task() {
        let backend = HeuristicBackend::new();
        let text = backend
            .reason("Assessment persona\nmore", &json!({"task": "score it"}))
            .await
            .unwrap();
        assert_eq!(text, "Heuristic analysis (Assessment persona): score it");
        assert!(backend.probe().await.is_ok());
    }

    #[test]
    fn test_extract_json_object() {
        let parsed = extract_json_object("Sure! {\"feedback\": \"Great\"} hope that helps").unwrap();
        assert_eq!(parsed.get("feedback"), Some(&json!("Great")));

        assert!(extract_json_object("no braces").is_none());
        assert!(extract_json_object("} backwards {").is_none());
        assert!(extract_json_object("{not json}").is_none());
    }
}
