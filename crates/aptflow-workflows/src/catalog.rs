//! Workflow Catalog - Named, versioned step templates
//!
//! A template is an ordered list of (worker, action) pairs with optional
//! step-local data. Templates are validated on registration and immutable
//! afterwards.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::info;

use aptflow_core::Record;

use crate::error::{OrchestratorError, Result};

pub const DEFAULT_VERSION: &str = "1.0.0";

/// One invocation inside a workflow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowStep {
    /// Registered worker name
    #[serde(alias = "agent")]
    pub worker: String,
    /// Action passed to the worker through its kind's input field
    pub action: String,
    /// Step-local overrides merged over the accumulated context
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Record>,
}

impl WorkflowStep {
    pub fn new(worker: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            worker: worker.into(),
            action: action.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: Record) -> Self {
        self.data = Some(data);
        self
    }

    /// Trace label: `<worker>_<action>`
    pub fn label(&self) -> String {
        format!("{}_{}", self.worker, self.action)
    }
}

/// Workflow template (serializable)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowTemplate {
    /// Unique name
    pub name: String,
    pub description: String,
    pub version: String,
    pub steps: Vec<WorkflowStep>,
}

impl WorkflowTemplate {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            version: DEFAULT_VERSION.to_string(),
            steps: Vec::new(),
        }
    }

    pub fn step(mut self, worker: &str, action: &str) -> Self {
        self.steps.push(WorkflowStep::new(worker, action));
        self
    }

    /// Distinct worker names in first-use order
    pub fn workers_involved(&self) -> Vec<String> {
        let mut seen = BTreeSet::new();
        self.steps
            .iter()
            .filter(|s| seen.insert(s.worker.as_str()))
            .map(|s| s.worker.clone())
            .collect()
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(OrchestratorError::invalid_workflow("template name is empty"));
        }
        if self.steps.is_empty() {
            return Err(OrchestratorError::invalid_workflow(format!(
                "template '{}' has no steps",
                self.name
            )));
        }
        for (index, step) in self.steps.iter().enumerate() {
            if step.worker.trim().is_empty() || step.action.trim().is_empty() {
                return Err(OrchestratorError::invalid_workflow(format!(
                    "template '{}' step {} needs both a worker and an action",
                    self.name, index
                )));
            }
        }
        Ok(())
    }
}

/// Registry of workflow templates, in registration order
#[derive(Debug, Clone, Default)]
pub struct WorkflowCatalog {
    templates: IndexMap<String, WorkflowTemplate>,
}

impl WorkflowCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, template: WorkflowTemplate) -> Result<()> {
        template.validate()?;
        if self.templates.contains_key(&template.name) {
            return Err(OrchestratorError::DuplicateName(template.name));
        }
        info!(workflow = %template.name, steps = template.steps.len(), "Registering workflow");
        self.templates.insert(template.name.clone(), template);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&WorkflowTemplate> {
        self.templates.get(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.templates.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &WorkflowTemplate> {
        self.templates.values()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

/// The four standard templates
pub fn default_catalog() -> Result<WorkflowCatalog> {
    let mut catalog = WorkflowCatalog::new();

    catalog.register(
        WorkflowTemplate::new(
            "complete_assessment",
            "Comprehensive dyslexia and ADHD assessment with personalized recommendations",
        )
        .step("assessment", "dyslexia_test")
        .step("assessment", "adhd_questionnaire")
        .step("personalization", "optimize_settings")
        .step("monitoring", "track_progress"),
    )?;

    catalog.register(
        WorkflowTemplate::new(
            "adaptive_reading",
            "Real-time content adaptation based on complexity and user preferences",
        )
        .step("content", "analyze_complexity")
        .step("personalization", "predict_preferences")
        .step("content", "adapt_content")
        .step("monitoring", "track_engagement"),
    )?;

    catalog.register(
        WorkflowTemplate::new(
            "progress_review",
            "Analyze learning progress and recommend interventions",
        )
        .step("monitoring", "analyze_trends")
        .step("personalization", "learn_feedback")
        .step("monitoring", "recommend_interventions"),
    )?;

    catalog.register(
        WorkflowTemplate::new(
            "real_time_adaptation",
            "Dynamic adjustments during active reading sessions",
        )
        .step("monitoring", "detect_patterns")
        .step("personalization", "adaptive_tuning")
        .step("content", "dynamic_adjustment"),
    )?;

    Ok(catalog)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_catalog() {
        let catalog = default_catalog().unwrap();
        assert_eq!(
            catalog.names(),
            vec![
                "complete_assessment",
                "adaptive_reading",
                "progress_review",
                "real_time_adaptation"
            ]
        );
        let template = catalog.get("adaptive_reading").unwrap();
        assert_eq!(template.version, "1.0.0");
        assert_eq!(
            template.workers_involved(),
            vec!["content", "personalization", "monitoring"]
        );
    }

    #[test]
    fn test_duplicate_template_rejected() {
        let mut catalog = WorkflowCatalog::new();
        catalog
            .register(WorkflowTemplate::new("t", "first").step("content", "process"))
            .unwrap();
        let err = catalog
            .register(WorkflowTemplate::new("t", "second").step("content", "process"))
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::DuplicateName(n) if n == "t"));
        assert_eq!(catalog.get("t").unwrap().description, "first");
    }

    #[test]
    fn test_validation() {
        assert!(WorkflowTemplate::new("", "x").step("a", "b").validate().is_err());
        assert!(WorkflowTemplate::new("empty", "x").validate().is_err());
        assert!(WorkflowTemplate::new("blank", "x").step("a", " ").validate().is_err());
        assert!(WorkflowTemplate::new("ok", "x").step("a", "b").validate().is_ok());
    }

    #[test]
    fn test_step_deserializes_agent_alias() {
        let step: WorkflowStep =
            serde_json::from_str(r#"{"agent": "content", "action": "process"}"#).unwrap();
        assert_eq!(step.label(), "content_process");
        assert!(step.data.is_none());
    }
}
