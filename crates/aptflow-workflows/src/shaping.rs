//! Per-kind input shaping
//!
//! Each worker kind reads its action from a different input field. The
//! assessment worker takes the bare assessment name, so catalog actions such
//! as `dyslexia_test` and `adhd_questionnaire` are trimmed.

use serde_json::Value;

use aptflow_agents::WorkerKind;
use aptflow_core::Record;

/// Input field carrying the action for a worker kind
pub fn action_field(kind: WorkerKind) -> &'static str {
    match kind {
        WorkerKind::Assessment => "type",
        WorkerKind::Content => "content_type",
        WorkerKind::Personalization => "action_type",
        WorkerKind::Monitoring => "monitoring_type",
    }
}

/// Action value as the worker expects it
pub fn action_value(kind: WorkerKind, action: &str) -> String {
    match kind {
        WorkerKind::Assessment => action.replace("_test", "").replace("_questionnaire", ""),
        WorkerKind::Content | WorkerKind::Personalization | WorkerKind::Monitoring => {
            action.to_string()
        }
    }
}

/// Stamp the action into `input` under the kind's field
pub fn shape_input(kind: WorkerKind, action: &str, mut input: Record) -> Record {
    input.insert(
        action_field(kind).to_string(),
        Value::String(action_value(kind, action)),
    );
    input
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_assessment_action_is_trimmed() {
        assert_eq!(action_value(WorkerKind::Assessment, "dyslexia_test"), "dyslexia");
        assert_eq!(action_value(WorkerKind::Assessment, "adhd_questionnaire"), "adhd");
        assert_eq!(action_value(WorkerKind::Content, "analyze_test"), "analyze_test");
    }

    #[test]
    fn test_shape_input_overwrites_field() {
        let input = aptflow_core::into_record(json!({"monitoring_type": "stale", "x": 1}));
        let shaped = shape_input(WorkerKind::Monitoring, "track_progress", input);
        assert_eq!(shaped["monitoring_type"], "track_progress");
        assert_eq!(shaped["x"], 1);
    }

    #[test]
    fn test_every_kind_has_distinct_field() {
        let mut fields: Vec<_> = WorkerKind::ALL.iter().map(|k| action_field(*k)).collect();
        fields.sort();
        fields.dedup();
        assert_eq!(fields.len(), WorkerKind::ALL.len());
    }
}
