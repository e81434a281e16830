//! Worker Registry
//!
//! Maps stable names to worker instances. Built once at startup and then
//! shared read-only, so lookups need no locking.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use crate::worker::{Worker, WorkerMetadata};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Worker name already registered: {0}")]
    DuplicateName(String),

    #[error("Unknown worker: {0}")]
    UnknownWorker(String),
}

/// Registry of named workers
#[derive(Default)]
pub struct WorkerRegistry {
    workers: HashMap<String, Arc<dyn Worker>>,
}

impl WorkerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a worker under an explicit name
    pub fn register(
        &mut self,
        name: impl Into<String>,
        worker: Arc<dyn Worker>,
    ) -> Result<(), RegistryError> {
        let name = name.into();
        if self.workers.contains_key(&name) {
            return Err(RegistryError::DuplicateName(name));
        }
        info!(worker = %name, kind = %worker.kind(), "Registering worker");
        self.workers.insert(name, worker);
        Ok(())
    }

    /// Register a worker under its own name
    pub fn register_worker(&mut self, worker: Arc<dyn Worker>) -> Result<(), RegistryError> {
        let name = worker.name().to_string();
        self.register(name, worker)
    }

    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Worker>, RegistryError> {
        self.workers
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownWorker(name.to_string()))
    }

    /// Registered names, sorted
    pub fn list_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.workers.keys().cloned().collect();
        names.sort();
        names
    }

    /// Metadata for every worker, keyed by registered name
    pub fn all_metadata(&self) -> Vec<(String, Value)> {
        self.list_names()
            .into_iter()
            .filter_map(|name| {
                self.workers
                    .get(&name)
                    .map(|worker| (name.clone(), worker.metadata()))
            })
            .collect()
    }

    /// Iterate `(name, worker)` pairs in name order
    pub fn iter(&self) -> impl Iterator<Item = (String, Arc<dyn Worker>)> + '_ {
        self.list_names().into_iter().filter_map(move |name| {
            self.workers
                .get(&name)
                .map(|worker| (name.clone(), Arc::clone(worker)))
        })
    }

    pub fn count(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }
}
