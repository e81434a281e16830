//! Routing Layer - maps a request type onto an execution mode
//!
//! | request type      | route                                          |
//! |-------------------|------------------------------------------------|
//! | `assessment`      | template `complete_assessment`                 |
//! | `reading_session` | template `adaptive_reading`                    |
//! | `progress_check`  | template `progress_review`                     |
//! | `real_time_help`  | template `real_time_adaptation`                |
//! | `multi_agent`     | collaboration when `complexity == "high"`, else custom steps |
//! | `single_agent`    | direct dispatch to `target_agent`              |

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use aptflow_core::{Record, RecordExt};

use crate::catalog::WorkflowStep;
use crate::collaboration::CollaborationResult;
use crate::error::{OrchestratorError, Result};
use crate::step::{SingleWorkerResult, WorkflowResult};

pub const DEFAULT_REQUIRED_WORKERS: [&str; 2] = ["assessment", "personalization"];
pub const DEFAULT_COMPLEXITY: &str = "medium";
pub const DEFAULT_TARGET_WORKER: &str = "assessment";
pub const DEFAULT_ACTION: &str = "process";

/// Closed set of request types the router understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestType {
    Assessment,
    ReadingSession,
    ProgressCheck,
    RealTimeHelp,
    MultiAgent,
    SingleAgent,
}

impl RequestType {
    pub const ALL: [RequestType; 6] = [
        RequestType::Assessment,
        RequestType::ReadingSession,
        RequestType::ProgressCheck,
        RequestType::RealTimeHelp,
        RequestType::MultiAgent,
        RequestType::SingleAgent,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RequestType::Assessment => "assessment",
            RequestType::ReadingSession => "reading_session",
            RequestType::ProgressCheck => "progress_check",
            RequestType::RealTimeHelp => "real_time_help",
            RequestType::MultiAgent => "multi_agent",
            RequestType::SingleAgent => "single_agent",
        }
    }

    /// Template served by this request type, if it maps onto one
    pub fn template(&self) -> Option<&'static str> {
        match self {
            RequestType::Assessment => Some("complete_assessment"),
            RequestType::ReadingSession => Some("adaptive_reading"),
            RequestType::ProgressCheck => Some("progress_review"),
            RequestType::RealTimeHelp => Some("real_time_adaptation"),
            RequestType::MultiAgent | RequestType::SingleAgent => None,
        }
    }
}

impl fmt::Display for RequestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestType {
    type Err = OrchestratorError;

    fn from_str(s: &str) -> Result<Self> {
        RequestType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| OrchestratorError::UnknownRequestType(s.to_string()))
    }
}

/// Execution plan chosen for a request
#[derive(Debug, Clone, PartialEq)]
pub enum Route {
    Template(&'static str),
    Custom(Vec<WorkflowStep>),
    Collaboration(Vec<String>),
    Single { worker: String, action: String },
}

/// Outcome of a routed request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "route", content = "result", rename_all = "snake_case")]
pub enum RoutedResult {
    Workflow(WorkflowResult),
    Collaboration(CollaborationResult),
    Single(SingleWorkerResult),
}

impl RoutedResult {
    pub fn success(&self) -> bool {
        match self {
            RoutedResult::Workflow(result) => result.is_completed(),
            RoutedResult::Collaboration(result) => result.success,
            RoutedResult::Single(result) => result.success,
        }
    }
}

fn required_workers(context: &Record) -> Vec<String> {
    match context.get("required_agents") {
        Some(Value::Array(_)) => context.string_list("required_agents"),
        _ => DEFAULT_REQUIRED_WORKERS.iter().map(|s| s.to_string()).collect(),
    }
}

/// Choose a route for `request_type` given the request context
pub fn plan(request_type: &str, context: &Record) -> Result<Route> {
    let request_type: RequestType = request_type.parse()?;

    if let Some(template) = request_type.template() {
        return Ok(Route::Template(template));
    }

    match request_type {
        RequestType::MultiAgent => {
            let workers = required_workers(context);
            let complexity = context.str_field("complexity").unwrap_or(DEFAULT_COMPLEXITY);
            if complexity == "high" {
                Ok(Route::Collaboration(workers))
            } else {
                let steps = workers
                    .into_iter()
                    .map(|worker| {
                        WorkflowStep::new(worker, DEFAULT_ACTION).with_data(context.clone())
                    })
                    .collect();
                Ok(Route::Custom(steps))
            }
        }
        _ => Ok(Route::Single {
            worker: context
                .str_field("target_agent")
                .unwrap_or(DEFAULT_TARGET_WORKER)
                .to_string(),
            action: context.str_field("action").unwrap_or(DEFAULT_ACTION).to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx(value: Value) -> Record {
        aptflow_core::into_record(value)
    }

    #[test]
    fn test_template_routes() {
        let empty = Record::new();
        assert_eq!(plan("assessment", &empty).unwrap(), Route::Template("complete_assessment"));
        assert_eq!(plan("reading_session", &empty).unwrap(), Route::Template("adaptive_reading"));
        assert_eq!(plan("progress_check", &empty).unwrap(), Route::Template("progress_review"));
        assert_eq!(
            plan("real_time_help", &empty).unwrap(),
            Route::Template("real_time_adaptation")
        );
    }

    #[test]
    fn test_unknown_request_type() {
        let err = plan("teleport", &Record::new()).unwrap_err();
        assert!(matches!(err, OrchestratorError::UnknownRequestType(t) if t == "teleport"));
    }

    #[test]
    fn test_multi_agent_defaults_to_custom_steps() {
        let context = ctx(json!({"text": "hi"}));
        let Route::Custom(steps) = plan("multi_agent", &context).unwrap() else {
            panic!("expected custom route");
        };
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].label(), "assessment_process");
        assert_eq!(steps[1].worker, "personalization");
        assert_eq!(steps[1].data.as_ref(), Some(&context));
    }

    #[test]
    fn test_multi_agent_high_complexity_collaborates() {
        let context = ctx(json!({
            "complexity": "high",
            "required_agents": ["content", "monitoring"],
        }));
        assert_eq!(
            plan("multi_agent", &context).unwrap(),
            Route::Collaboration(vec!["content".into(), "monitoring".into()])
        );
    }

    #[test]
    fn test_single_agent_defaults() {
        assert_eq!(
            plan("single_agent", &Record::new()).unwrap(),
            Route::Single {
                worker: "assessment".into(),
                action: "process".into()
            }
        );
        let context = ctx(json!({"target_agent": "content", "action": "generate_summary"}));
        assert_eq!(
            plan("single_agent", &context).unwrap(),
            Route::Single {
                worker: "content".into(),
                action: "generate_summary".into()
            }
        );
    }
}
