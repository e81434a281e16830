//! aptflow-agents: Worker contract and registry
//!
//! Every agent the orchestrator can dispatch to implements [`Worker`].
//! The [`WorkerRegistry`] is the single source of truth for which workers exist.
//! The reference workers in [`workers`] back the default workflow catalog.

pub mod backend;
pub mod history;
pub mod registry;
pub mod worker;
pub mod workers;

// Re-export main types
pub use backend::{HeuristicBackend, ReasoningBackend};
pub use history::{Interaction, InteractionHistory};
pub use registry::{RegistryError, WorkerRegistry};
pub use worker::{Worker, WorkerError, WorkerKind, WorkerMetadata, WorkerResponse, ACTION_HEALTH_CHECK};
pub use workers::builtin_registry;
