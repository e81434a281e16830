//! Collaboration Engine - runs several workers on one shared request
//!
//! Sequential-class workers run one at a time and see each other's output
//! through `collaborative_context`. Parallel-class workers then run as
//! spawned tasks against a snapshot of that context, bounded by a semaphore.
//! A failing worker never aborts the collaboration.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use aptflow_agents::{Worker, WorkerKind, WorkerRegistry, WorkerResponse};
use aptflow_core::Record;

use crate::engine::{invoke_worker, DEFAULT_STEP_TIMEOUT};
use crate::error::Result;
use crate::shaping::{action_field, shape_input};
use crate::step::ENGINE_PROVENANCE;
use crate::synthesis::{synthesize, SynthesisOutput};

/// Action used when the shared data does not name one for a worker's kind
pub const COLLABORATION_ACTION: &str = "process";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollaborationClass {
    /// Runs alone, in request order, and sees earlier outputs
    Sequential,
    /// Runs concurrently after all sequential members
    Parallel,
}

pub fn collaboration_class(kind: WorkerKind) -> CollaborationClass {
    match kind {
        WorkerKind::Assessment | WorkerKind::Personalization => CollaborationClass::Sequential,
        WorkerKind::Content | WorkerKind::Monitoring => CollaborationClass::Parallel,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollaborationResult {
    /// Every requested name, resolvable or not
    pub participating_workers: Vec<String>,
    /// Sequential members first, then parallel members
    pub individual_results: IndexMap<String, WorkerResponse>,
    pub synthesized_result: SynthesisOutput,
    pub success: bool,
}

type Member = (String, Arc<dyn Worker>);

pub struct CollaborationEngine {
    registry: Arc<WorkerRegistry>,
    step_timeout: Duration,
    semaphore: Arc<Semaphore>,
}

impl CollaborationEngine {
    pub fn new(registry: Arc<WorkerRegistry>, max_parallel: usize) -> Self {
        Self {
            registry,
            step_timeout: DEFAULT_STEP_TIMEOUT,
            semaphore: Arc::new(Semaphore::new(max_parallel.max(1))),
        }
    }

    pub fn with_step_timeout(mut self, step_timeout: Duration) -> Self {
        self.step_timeout = step_timeout;
        self
    }

    pub async fn run(&self, workers: &[String], shared: Record) -> Result<CollaborationResult> {
        let mut sequential: Vec<Member> = Vec::new();
        let mut parallel: Vec<Member> = Vec::new();
        for name in workers {
            match self.registry.resolve(name) {
                Ok(worker) => match collaboration_class(worker.kind()) {
                    CollaborationClass::Sequential => sequential.push((name.clone(), worker)),
                    CollaborationClass::Parallel => parallel.push((name.clone(), worker)),
                },
                Err(e) => warn!(worker = %name, error = %e, "Skipping collaborator"),
            }
        }

        info!(
            sequential = sequential.len(),
            parallel = parallel.len(),
            requested = workers.len(),
            "Starting collaboration"
        );

        let mut entries: Vec<(String, WorkerKind, WorkerResponse)> = Vec::new();
        let mut collaborative = Record::new();

        for (name, worker) in sequential {
            let input = collaboration_input(&shared, &collaborative, workers, worker.kind());
            debug!(worker = %name, "Running sequential collaborator");
            let response = call(&name, &worker, input, self.step_timeout).await;
            collaborative.insert(name.clone(), serde_json::to_value(&response)?);
            entries.push((name, worker.kind(), response));
        }

        let mut handles = Vec::with_capacity(parallel.len());
        let mut spawned = Vec::with_capacity(parallel.len());
        for (name, worker) in parallel {
            let input = collaboration_input(&shared, &collaborative, workers, worker.kind());
            let semaphore = Arc::clone(&self.semaphore);
            let limit = self.step_timeout;
            let task_name = name.clone();
            let task_worker = Arc::clone(&worker);

            handles.push(tokio::spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        return WorkerResponse::failure(
                            &task_name,
                            "collaboration semaphore closed",
                            ENGINE_PROVENANCE,
                        )
                    }
                };
                debug!(worker = %task_name, "Running parallel collaborator");
                call(&task_name, &task_worker, input, limit).await
            }));
            spawned.push((name, worker.kind()));
        }

        let outcomes = futures::future::join_all(handles).await;
        for ((name, kind), outcome) in spawned.into_iter().zip(outcomes) {
            let response = outcome.unwrap_or_else(|e| {
                warn!(worker = %name, error = %e, "Collaborator task failed");
                WorkerResponse::failure(&name, format!("task failed: {e}"), ENGINE_PROVENANCE)
            });
            entries.push((name, kind, response));
        }

        let synthesized_result = synthesize(
            entries
                .iter()
                .map(|(name, kind, response)| (name.as_str(), *kind, response)),
        );

        let mut individual_results = IndexMap::with_capacity(entries.len());
        for (name, _, response) in entries {
            individual_results.insert(name, response);
        }

        info!(
            contributors = individual_results.len(),
            confidence = synthesized_result.confidence_score,
            "Collaboration complete"
        );

        Ok(CollaborationResult {
            participating_workers: workers.to_vec(),
            individual_results,
            synthesized_result,
            success: true,
        })
    }
}

fn collaboration_input(
    shared: &Record,
    collaborative: &Record,
    participants: &[String],
    kind: WorkerKind,
) -> Record {
    let mut input = shared.clone();
    input.insert("collaborative_context".into(), Value::Object(collaborative.clone()));
    input.insert("participating_agents".into(), json!(participants));
    input.insert("collaboration_mode".into(), Value::Bool(true));
    input.insert("shared_context".into(), Value::Object(collaborative.clone()));

    if input.contains_key(action_field(kind)) {
        input
    } else {
        shape_input(kind, COLLABORATION_ACTION, input)
    }
}

/// Invoke one collaborator; every failure becomes a failed response
async fn call(name: &str, worker: &Arc<dyn Worker>, input: Record, limit: Duration) -> WorkerResponse {
    match invoke_worker(worker, input, limit).await {
        Ok(response) => response,
        Err(e) => {
            warn!(worker = %name, error = %e, "Collaborator failed");
            WorkerResponse::failure(name, e.to_string(), ENGINE_PROVENANCE)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aptflow_agents::WorkerError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Reports the collaborative context keys it saw and tracks concurrency
    struct Peer {
        name: &'static str,
        kind: WorkerKind,
        active: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Worker for Peer {
        fn name(&self) -> &str {
            self.name
        }

        fn kind(&self) -> WorkerKind {
            self.kind
        }

        fn description(&self) -> &str {
            "peer"
        }

        fn actions(&self) -> Vec<&'static str> {
            vec![COLLABORATION_ACTION]
        }

        async fn process(&self, input: Record) -> std::result::Result<Record, WorkerError> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.active.fetch_sub(1, Ordering::SeqCst);

            let seen: Vec<String> = input
                .get("collaborative_context")
                .and_then(Value::as_object)
                .map(|c| c.keys().cloned().collect())
                .unwrap_or_default();
            let mut out = Record::new();
            out.insert("seen".into(), json!(seen));
            out.insert("mode".into(), input["collaboration_mode"].clone());
            Ok(out)
        }
    }

    fn registry(max_seen: &Arc<AtomicUsize>) -> Arc<WorkerRegistry> {
        let active = Arc::new(AtomicUsize::new(0));
        let mut registry = WorkerRegistry::new();
        for (name, kind) in [
            ("s1", WorkerKind::Assessment),
            ("s2", WorkerKind::Personalization),
            ("p1", WorkerKind::Content),
            ("p2", WorkerKind::Monitoring),
        ] {
            registry
                .register_worker(Arc::new(Peer {
                    name,
                    kind,
                    active: Arc::clone(&active),
                    peak: Arc::clone(max_seen),
                }))
                .unwrap();
        }
        Arc::new(registry)
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_class_table() {
        assert_eq!(collaboration_class(WorkerKind::Assessment), CollaborationClass::Sequential);
        assert_eq!(collaboration_class(WorkerKind::Monitoring), CollaborationClass::Parallel);
    }

    #[tokio::test]
    async fn test_order_and_visibility() {
        let peak = Arc::new(AtomicUsize::new(0));
        let engine = CollaborationEngine::new(registry(&peak), 4);
        let result = engine
            .run(&names(&["p1", "s1", "ghost", "p2", "s2"]), Record::new())
            .await
            .unwrap();

        let order: Vec<&String> = result.individual_results.keys().collect();
        assert_eq!(order, ["s1", "s2", "p1", "p2"]);
        assert_eq!(result.participating_workers.len(), 5);

        let seen = |name: &str| {
            result.individual_results[name].data.as_ref().unwrap()["seen"].clone()
        };
        assert_eq!(seen("s1"), json!([]));
        assert_eq!(seen("s2"), json!(["s1"]));
        assert_eq!(seen("p1"), json!(["s1", "s2"]));
        assert_eq!(seen("p2"), json!(["s1", "s2"]));
        assert_eq!(result.individual_results["p1"].data.as_ref().unwrap()["mode"], true);
    }

    #[tokio::test]
    async fn test_parallel_fan_out_is_bounded() {
        let peak = Arc::new(AtomicUsize::new(0));
        let engine = CollaborationEngine::new(registry(&peak), 1);
        engine.run(&names(&["p1", "p2"]), Record::new()).await.unwrap();
        assert_eq!(peak.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_input_shaping_respects_shared_action() {
        let shared = aptflow_core::into_record(json!({"content_type": "generate_summary"}));
        let input = collaboration_input(&shared, &Record::new(), &[], WorkerKind::Content);
        assert_eq!(input["content_type"], "generate_summary");

        let input = collaboration_input(&shared, &Record::new(), &[], WorkerKind::Monitoring);
        assert_eq!(input["monitoring_type"], COLLABORATION_ACTION);
    }
}
