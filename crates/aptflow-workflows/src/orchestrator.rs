//! Orchestrator - single entry point over catalog, engine, router and collaboration
//!
//! Built once at startup from a worker registry, a workflow catalog and an
//! [`OrchestratorConfig`]; afterwards it is shared read-only (wrap it in an
//! `Arc` to use it from several tasks).

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

use aptflow_agents::{
    builtin_registry, ReasoningBackend, WorkerKind, WorkerRegistry, ACTION_HEALTH_CHECK,
};
use aptflow_core::{OrchestratorConfig, Record};

use crate::catalog::{default_catalog, WorkflowCatalog, WorkflowStep};
use crate::collaboration::{CollaborationEngine, CollaborationResult};
use crate::engine::{invoke_worker, WorkflowEngine};
use crate::error::{OrchestratorError, Result};
use crate::routing::{plan, Route, RoutedResult};
use crate::shaping::shape_input;
use crate::step::{SingleWorkerResult, WorkflowResult};

/// Catalog entry as reported by [`Orchestrator::list_workflows`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowInfo {
    pub description: String,
    pub version: String,
    pub step_count: usize,
    pub workers_involved: Vec<String>,
    pub estimated_duration: String,
}

/// Registry entry as reported by [`Orchestrator::list_workers`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerInfo {
    pub kind: WorkerKind,
    pub description: String,
    pub actions: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerHealth {
    pub status: HealthStatus,
    /// Worker health payload, or the failure message
    pub detail: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub orchestrator_status: String,
    pub worker_statuses: IndexMap<String, WorkerHealth>,
    pub available_workflows: Vec<String>,
    pub total_workers: usize,
}

/// Rough wall-clock estimate for a template of `steps` steps
pub fn estimated_duration(steps: usize) -> &'static str {
    match steps {
        0..=2 => "1-2 minutes",
        3..=4 => "2-5 minutes",
        _ => "5-10 minutes",
    }
}

pub struct Orchestrator {
    registry: Arc<WorkerRegistry>,
    catalog: Arc<WorkflowCatalog>,
    engine: WorkflowEngine,
    collaboration: CollaborationEngine,
    config: OrchestratorConfig,
}

impl Orchestrator {
    pub fn new(
        registry: WorkerRegistry,
        catalog: WorkflowCatalog,
        config: OrchestratorConfig,
    ) -> Self {
        let registry = Arc::new(registry);
        let catalog = Arc::new(catalog);
        let engine = WorkflowEngine::new(Arc::clone(&registry), Arc::clone(&catalog))
            .with_step_timeout(config.step_timeout());
        let collaboration = CollaborationEngine::new(Arc::clone(&registry), config.max_parallel)
            .with_step_timeout(config.step_timeout());

        info!(
            workers = registry.count(),
            workflows = catalog.len(),
            step_timeout_ms = config.step_timeout_ms,
            max_parallel = config.max_parallel,
            "Orchestrator ready"
        );

        Self {
            registry,
            catalog,
            engine,
            collaboration,
            config,
        }
    }

    /// Reference workers plus the default catalog
    pub fn with_builtin_workers(
        config: OrchestratorConfig,
        backend: Arc<dyn ReasoningBackend>,
    ) -> Result<Self> {
        config.validate()?;
        let registry = builtin_registry(&config, backend)?;
        let catalog = default_catalog()?;
        Ok(Self::new(registry, catalog, config))
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn registry(&self) -> &WorkerRegistry {
        &self.registry
    }

    pub fn catalog(&self) -> &WorkflowCatalog {
        &self.catalog
    }

    pub async fn run_template(&self, name: &str, input: Record) -> Result<WorkflowResult> {
        self.engine.run_template(name, input).await
    }

    pub async fn run_custom_steps(&self, steps: &[WorkflowStep], input: Record) -> WorkflowResult {
        self.engine.run_custom_steps(steps, input).await
    }

    pub async fn run_collaboration(
        &self,
        workers: &[String],
        shared_data: Record,
    ) -> Result<CollaborationResult> {
        self.collaboration.run(workers, shared_data).await
    }

    /// Route a request by type; see [`crate::routing`] for the table
    pub async fn route(&self, request_type: &str, context: Record) -> Result<RoutedResult> {
        let route = plan(request_type, &context)?;
        info!(request_type = %request_type, route = route_name(&route), "Routing request");

        Ok(match route {
            Route::Template(name) => {
                RoutedResult::Workflow(self.run_template(name, context).await?)
            }
            Route::Custom(steps) => {
                RoutedResult::Workflow(self.run_custom_steps(&steps, context).await)
            }
            Route::Collaboration(workers) => {
                RoutedResult::Collaboration(self.run_collaboration(&workers, context).await?)
            }
            Route::Single { worker, action } => {
                RoutedResult::Single(self.dispatch_single(&worker, &action, context).await)
            }
        })
    }

    /// Invoke one worker directly. Never fails: every problem is reported in the result.
    pub async fn dispatch_single(
        &self,
        worker_name: &str,
        action: &str,
        data: Record,
    ) -> SingleWorkerResult {
        let worker = match self.registry.resolve(worker_name) {
            Ok(worker) => worker,
            Err(e) => {
                let err = OrchestratorError::from(e);
                warn!(worker = %worker_name, error = %err, "Dispatch rejected");
                return SingleWorkerResult::failure(worker_name, action, err.to_string());
            }
        };

        let input = shape_input(worker.kind(), action, data);
        match invoke_worker(&worker, input, self.config.step_timeout()).await {
            Ok(response) => SingleWorkerResult::from_response(action, response),
            Err(err) => {
                warn!(worker = %worker_name, error = %err, "Dispatch failed");
                SingleWorkerResult::failure(worker_name, action, err.to_string())
            }
        }
    }

    pub fn list_workflows(&self) -> IndexMap<String, WorkflowInfo> {
        self.catalog
            .iter()
            .map(|template| {
                (
                    template.name.clone(),
                    WorkflowInfo {
                        description: template.description.clone(),
                        version: template.version.clone(),
                        step_count: template.steps.len(),
                        workers_involved: template.workers_involved(),
                        estimated_duration: estimated_duration(template.steps.len()).to_string(),
                    },
                )
            })
            .collect()
    }

    pub fn list_workers(&self) -> IndexMap<String, WorkerInfo> {
        self.registry
            .iter()
            .map(|(name, worker)| {
                (
                    name,
                    WorkerInfo {
                        kind: worker.kind(),
                        description: worker.description().to_string(),
                        actions: worker.actions().into_iter().map(String::from).collect(),
                    },
                )
            })
            .collect()
    }

    /// Probe every worker with the health-check action, concurrently
    pub async fn health_check(&self) -> HealthReport {
        let limit = self.config.step_timeout();
        let probes = self.registry.iter().map(|(name, worker)| async move {
            let input = shape_input(worker.kind(), ACTION_HEALTH_CHECK, Record::new());
            let health = match invoke_worker(&worker, input, limit).await {
                Ok(response) if response.success => WorkerHealth {
                    status: HealthStatus::Healthy,
                    detail: response.data.map(Value::Object).unwrap_or(Value::Null),
                },
                Ok(response) => WorkerHealth {
                    status: HealthStatus::Error,
                    detail: Value::String(response.error.unwrap_or_default()),
                },
                Err(err) => WorkerHealth {
                    status: HealthStatus::Error,
                    detail: Value::String(err.to_string()),
                },
            };
            (name, health)
        });

        let worker_statuses: IndexMap<String, WorkerHealth> =
            futures::future::join_all(probes).await.into_iter().collect();

        let unhealthy = worker_statuses
            .values()
            .filter(|h| h.status == HealthStatus::Error)
            .count();
        info!(workers = worker_statuses.len(), unhealthy, "Health check complete");

        HealthReport {
            orchestrator_status: "active".to_string(),
            total_workers: self.registry.count(),
            available_workflows: self.catalog.names(),
            worker_statuses,
        }
    }
}

fn route_name(route: &Route) -> &'static str {
    match route {
        Route::Template(_) => "template",
        Route::Custom(_) => "custom",
        Route::Collaboration(_) => "collaboration",
        Route::Single { .. } => "single",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aptflow_agents::HeuristicBackend;
    use serde_json::json;

    fn orchestrator() -> Orchestrator {
        Orchestrator::with_builtin_workers(OrchestratorConfig::default(), Arc::new(HeuristicBackend))
            .unwrap()
    }

    #[test]
    fn test_estimated_duration() {
        assert_eq!(estimated_duration(2), "1-2 minutes");
        assert_eq!(estimated_duration(4), "2-5 minutes");
        assert_eq!(estimated_duration(5), "5-10 minutes");
    }

    #[test]
    fn test_list_workflows_and_workers() {
        let orchestrator = orchestrator();
        let workflows = orchestrator.list_workflows();
        assert_eq!(workflows.len(), 4);
        assert_eq!(workflows["complete_assessment"].estimated_duration, "2-5 minutes");
        assert_eq!(
            workflows["complete_assessment"].workers_involved,
            vec!["assessment", "personalization", "monitoring"]
        );

        let workers = orchestrator.list_workers();
        assert_eq!(workers["content"].kind, WorkerKind::Content);
        assert!(workers["monitoring"].actions.contains(&"track_progress".to_string()));
    }

    #[tokio::test]
    async fn test_health_check_all_healthy() {
        let report = orchestrator().health_check().await;
        assert_eq!(report.total_workers, 4);
        assert_eq!(report.orchestrator_status, "active");
        assert!(report
            .worker_statuses
            .values()
            .all(|h| h.status == HealthStatus::Healthy));
        assert_eq!(report.worker_statuses["content"].detail["backend"], "heuristic");
    }

    #[tokio::test]
    async fn test_dispatch_single() {
        let orchestrator = orchestrator();
        let data = aptflow_core::into_record(json!({"text": "One line. Another line."}));
        let result = orchestrator.dispatch_single("content", "generate_summary", data).await;
        assert!(result.success);
        assert_eq!(result.result.unwrap()["primary_summary"], "One line. Another line.");

        let result = orchestrator.dispatch_single("ghost", "process", Record::new()).await;
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("Unknown worker: ghost"));
    }

    #[tokio::test]
    async fn test_route_unknown_type_is_recoverable() {
        let err = orchestrator().route("teleport", Record::new()).await.unwrap_err();
        assert!(matches!(err, OrchestratorError::UnknownRequestType(_)));
        assert!(err.is_recoverable());
    }
}
