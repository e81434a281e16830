//! Core types and utilities for aptflow
//!
//! # Modules
//!
//! - `config`: Environment loading and orchestrator tuning
//! - `error`: Error types and Result alias
//! - `types`: Records and helpers shared by workers and workflows

pub mod config;
pub mod error;
pub mod types;

// Re-exports
pub use config::OrchestratorConfig;
pub use error::{Error, Result};
pub use types::*;
