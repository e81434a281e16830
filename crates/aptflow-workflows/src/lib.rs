//! aptflow-workflows: Workflow catalog, execution engine and orchestration
//!
//! Features:
//! - Versioned workflow templates and ad-hoc step lists
//! - Sequential execution with an accumulating context and early stop on critical failures
//! - Request routing onto templates, custom steps, collaboration or direct dispatch
//! - Sequential-then-parallel collaboration with result synthesis

pub mod catalog;
pub mod collaboration;
pub mod context;
pub mod engine;
pub mod error;
pub mod orchestrator;
pub mod routing;
pub mod shaping;
pub mod step;
pub mod synthesis;

pub use catalog::{default_catalog, WorkflowCatalog, WorkflowStep, WorkflowTemplate};
pub use collaboration::{CollaborationEngine, CollaborationResult};
pub use context::ExecutionContext;
pub use engine::{compute_summary, WorkflowEngine};
pub use error::{OrchestratorError, Result};
pub use orchestrator::{HealthReport, HealthStatus, Orchestrator, WorkerInfo, WorkflowInfo};
pub use routing::{RequestType, RoutedResult};
pub use step::{SingleWorkerResult, StepResult, WorkflowResult};
pub use synthesis::{Insight, SynthesisOutput};

/// Prelude for convenient imports
pub mod prelude {
    pub use super::catalog::{WorkflowStep, WorkflowTemplate};
    pub use super::error::{OrchestratorError, Result};
    pub use super::orchestrator::Orchestrator;
    pub use super::routing::RoutedResult;
    pub use super::step::WorkflowResult;
}
