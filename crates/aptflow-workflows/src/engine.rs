//! Workflow Engine - Executes templates and ad-hoc step lists
//!
//! The engine runs steps strictly in order:
//! - Resolves each step's worker and shapes its input from the accumulated context
//! - Bounds every worker call by the step timeout
//! - Records each payload in the trace and under `"<worker>_result"` in the context
//! - Stops early on a critical failure, aborts on engine faults

use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use aptflow_agents::{Worker, WorkerRegistry, WorkerResponse};
use aptflow_core::Record;

use crate::catalog::{WorkflowCatalog, WorkflowStep};
use crate::context::ExecutionContext;
use crate::error::{OrchestratorError, Result};
use crate::shaping::shape_input;
use crate::step::{StepResult, WorkflowResult};

/// Workflow label used for ad-hoc step lists
pub const CUSTOM_WORKFLOW: &str = "custom";

pub const DEFAULT_STEP_TIMEOUT: Duration = Duration::from_secs(30);

const ALL_ACHIEVED: &str = "All objectives achieved";
const MOST_ACHIEVED: &str = "Most objectives achieved";
const PARTIAL: &str = "Partial completion, review needed";

/// Call `worker.execute` under a deadline.
///
/// Returns `WorkerTimeout` when the deadline passes and `EngineFault` when the
/// worker panics instead of reporting a failure.
pub(crate) async fn invoke_worker(
    worker: &Arc<dyn Worker>,
    input: Record,
    limit: Duration,
) -> Result<WorkerResponse> {
    let call = AssertUnwindSafe(worker.execute(input)).catch_unwind();
    match timeout(limit, call).await {
        Ok(Ok(response)) => Ok(response),
        Ok(Err(panic)) => Err(OrchestratorError::engine_fault(format!(
            "worker '{}' panicked: {}",
            worker.name(),
            panic_message(&*panic)
        ))),
        Err(_) => Err(OrchestratorError::WorkerTimeout {
            worker: worker.name().to_string(),
            timeout_ms: limit.as_millis() as u64,
        }),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// `"Workflow '<name>' completed: <ok>/<total> steps successful - <class>"`
pub fn compute_summary(workflow: &str, results: &[StepResult]) -> String {
    let total = results.len();
    let ok = results.iter().filter(|r| r.success).count();

    let class = if ok == total {
        ALL_ACHIEVED
    } else if ok * 10 > total * 7 {
        MOST_ACHIEVED
    } else {
        PARTIAL
    };

    format!("Workflow '{workflow}' completed: {ok}/{total} steps successful - {class}")
}

/// Workflow Engine - Executes workflows
pub struct WorkflowEngine {
    registry: Arc<WorkerRegistry>,
    catalog: Arc<WorkflowCatalog>,
    step_timeout: Duration,
}

impl WorkflowEngine {
    pub fn new(registry: Arc<WorkerRegistry>, catalog: Arc<WorkflowCatalog>) -> Self {
        Self {
            registry,
            catalog,
            step_timeout: DEFAULT_STEP_TIMEOUT,
        }
    }

    /// Set the deadline applied to each worker call
    pub fn with_step_timeout(mut self, step_timeout: Duration) -> Self {
        self.step_timeout = step_timeout;
        self
    }

    pub fn registry(&self) -> &Arc<WorkerRegistry> {
        &self.registry
    }

    pub fn catalog(&self) -> &Arc<WorkflowCatalog> {
        &self.catalog
    }

    pub fn step_timeout(&self) -> Duration {
        self.step_timeout
    }

    /// Execute a catalog template by name
    pub async fn run_template(&self, name: &str, input: Record) -> Result<WorkflowResult> {
        let template = self
            .catalog
            .get(name)
            .ok_or_else(|| OrchestratorError::UnknownWorkflow(name.to_string()))?;

        Ok(self.run_steps(&template.name, &template.steps, input).await)
    }

    /// Execute caller-supplied steps under the `custom` label
    pub async fn run_custom_steps(&self, steps: &[WorkflowStep], input: Record) -> WorkflowResult {
        self.run_steps(CUSTOM_WORKFLOW, steps, input).await
    }

    async fn run_steps(&self, workflow: &str, steps: &[WorkflowStep], input: Record) -> WorkflowResult {
        let start = Instant::now();
        let mut ctx = ExecutionContext::new(workflow, input);
        let mut results: Vec<StepResult> = Vec::with_capacity(steps.len());

        info!(
            workflow = %workflow,
            execution_id = %ctx.execution_id,
            steps = steps.len(),
            "Starting workflow execution"
        );

        for step in steps {
            let result = match self.run_step(&ctx, step).await {
                Ok(result) => result,
                Err(fault) => {
                    error!(workflow = %workflow, step = %step.label(), error = %fault, "Aborting workflow");
                    return WorkflowResult::aborted(workflow, fault.to_string(), results);
                }
            };

            let payload = match serde_json::to_value(&result.payload) {
                Ok(payload) => payload,
                Err(e) => {
                    let fault = OrchestratorError::engine_fault(format!(
                        "failed to serialize payload of step '{}': {}",
                        result.step, e
                    ));
                    error!(workflow = %workflow, step = %result.step, error = %fault, "Aborting workflow");
                    return WorkflowResult::aborted(workflow, fault.to_string(), results);
                }
            };
            ctx.record_result(&step.worker, payload);

            let halt = result.critical;
            let label = result.step.clone();
            results.push(result);

            if halt {
                let reason = OrchestratorError::CriticalStepFailure(label);
                warn!(
                    workflow = %workflow,
                    reason = %reason,
                    skipped = steps.len() - results.len(),
                    "Stopping workflow"
                );
                break;
            }
        }

        let summary = compute_summary(workflow, &results);
        info!(
            workflow = %workflow,
            duration_ms = start.elapsed().as_millis() as u64,
            summary = %summary,
            "Workflow execution complete"
        );

        WorkflowResult::completed(workflow, results, ctx.into_variables(), summary)
    }

    /// Run one step. Only engine faults are returned as errors; every other
    /// failure is folded into the step result.
    async fn run_step(&self, ctx: &ExecutionContext, step: &WorkflowStep) -> Result<StepResult> {
        let label = step.label();

        let worker = match self.registry.resolve(&step.worker) {
            Ok(worker) => worker,
            Err(e) => {
                let err = OrchestratorError::from(e);
                warn!(workflow = %ctx.workflow, step = %label, error = %err, "Skipping step");
                return Ok(StepResult::engine_failure(label, &step.worker, err.to_string()));
            }
        };

        let input = shape_input(worker.kind(), &step.action, ctx.step_input(step.data.as_ref()));
        debug!(workflow = %ctx.workflow, step = %label, worker = %step.worker, "Executing step");

        match invoke_worker(&worker, input, self.step_timeout).await {
            Ok(response) => {
                if !response.success {
                    warn!(
                        workflow = %ctx.workflow,
                        step = %label,
                        critical = response.critical,
                        error = response.error.as_deref().unwrap_or_default(),
                        "Step failed"
                    );
                }
                Ok(StepResult::new(label, response))
            }
            Err(err @ OrchestratorError::WorkerTimeout { .. }) => {
                warn!(workflow = %ctx.workflow, step = %label, error = %err, "Step timed out");
                Ok(StepResult::engine_failure(label, &step.worker, err.to_string()))
            }
            Err(err) => Err(err),
        }
    }
}
