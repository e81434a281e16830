//! Execution results
//!
//! - [`StepResult`]: one entry of a workflow trace
//! - [`WorkflowResult`]: outcome of a template or custom run
//! - [`SingleWorkerResult`]: outcome of a direct dispatch

use serde::{Deserialize, Serialize};

use aptflow_agents::WorkerResponse;
use aptflow_core::Record;

/// Provenance recorded on failures the engine produces itself
pub const ENGINE_PROVENANCE: &str = "engine";

/// Result of one executed step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    /// `<worker>_<action>`
    pub step: String,
    pub success: bool,
    pub payload: WorkerResponse,
    /// Only ever true together with `success == false`
    pub critical: bool,
}

impl StepResult {
    pub fn new(step: impl Into<String>, payload: WorkerResponse) -> Self {
        Self {
            step: step.into(),
            success: payload.success,
            critical: payload.halts_run(),
            payload,
        }
    }

    /// Step failed without ever reaching a worker's `execute` result
    pub fn engine_failure(step: impl Into<String>, worker: &str, error: impl Into<String>) -> Self {
        Self::new(step, WorkerResponse::failure(worker, error, ENGINE_PROVENANCE))
    }
}

/// Outcome of a template or custom run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WorkflowResult {
    Completed {
        workflow: String,
        success: bool,
        results: Vec<StepResult>,
        final_context: Record,
        summary: String,
    },
    Aborted {
        workflow: String,
        success: bool,
        error: String,
        partial_results: Vec<StepResult>,
    },
}

impl WorkflowResult {
    pub fn completed(
        workflow: &str,
        results: Vec<StepResult>,
        final_context: Record,
        summary: String,
    ) -> Self {
        WorkflowResult::Completed {
            workflow: workflow.to_string(),
            success: true,
            results,
            final_context,
            summary,
        }
    }

    pub fn aborted(workflow: &str, error: impl Into<String>, partial_results: Vec<StepResult>) -> Self {
        WorkflowResult::Aborted {
            workflow: workflow.to_string(),
            success: false,
            error: error.into(),
            partial_results,
        }
    }

    pub fn workflow(&self) -> &str {
        match self {
            WorkflowResult::Completed { workflow, .. } | WorkflowResult::Aborted { workflow, .. } => {
                workflow.as_str()
            }
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, WorkflowResult::Completed { .. })
    }

    /// Trace entries, complete or partial
    pub fn results(&self) -> &[StepResult] {
        match self {
            WorkflowResult::Completed { results, .. } => results.as_slice(),
            WorkflowResult::Aborted { partial_results, .. } => partial_results.as_slice(),
        }
    }

    pub fn summary(&self) -> Option<&str> {
        match self {
            WorkflowResult::Completed { summary, .. } => Some(summary.as_str()),
            WorkflowResult::Aborted { .. } => None,
        }
    }

    pub fn final_context(&self) -> Option<&Record> {
        match self {
            WorkflowResult::Completed { final_context, .. } => Some(final_context),
            WorkflowResult::Aborted { .. } => None,
        }
    }
}

/// Outcome of a direct single-worker dispatch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SingleWorkerResult {
    pub worker: String,
    pub action: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Record>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SingleWorkerResult {
    pub fn failure(worker: &str, action: &str, error: impl Into<String>) -> Self {
        Self {
            worker: worker.to_string(),
            action: action.to_string(),
            success: false,
            result: None,
            error: Some(error.into()),
        }
    }

    pub fn from_response(action: &str, response: WorkerResponse) -> Self {
        Self {
            worker: response.worker,
            action: action.to_string(),
            success: response.success,
            result: response.data,
            error: response.error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_result_mirrors_payload() {
        let ok = StepResult::new(
            "content_process",
            WorkerResponse::success("content", Record::new(), "heuristic"),
        );
        assert!(ok.success);
        assert!(!ok.critical);

        let failed = StepResult::engine_failure("ghost_process", "ghost", "Unknown worker: ghost");
        assert!(!failed.success);
        assert_eq!(failed.payload.provenance, ENGINE_PROVENANCE);
    }

    #[test]
    fn test_workflow_result_tagging() {
        let aborted = WorkflowResult::aborted("demo", "Engine fault: boom", vec![]);
        let value = serde_json::to_value(&aborted).unwrap();
        assert_eq!(value["status"], "aborted");
        assert_eq!(value["success"], false);
        assert!(aborted.summary().is_none());
        assert_eq!(aborted.workflow(), "demo");
    }
}
