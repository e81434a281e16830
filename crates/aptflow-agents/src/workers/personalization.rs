//! Personalization worker: settings optimization and preference learning

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

use aptflow_core::{Record, RecordExt};

use super::{clamp01, object_input, round2, to_record, WorkerCore};
use crate::backend::ReasoningBackend;
use crate::worker::{Worker, WorkerError, WorkerKind, ACTION_HEALTH_CHECK};

const ACTION_FIELD: &str = "action_type";

const SYSTEM_PROMPT: &str = "Personalization agent for reading accessibility
Learn from user behaviour and feedback, optimize font, spacing, highlighting and
pacing settings, and explain each recommendation.";

pub struct PersonalizationWorker {
    core: WorkerCore,
}

impl PersonalizationWorker {
    pub fn new(backend: Arc<dyn ReasoningBackend>, history_capacity: usize) -> Self {
        Self {
            core: WorkerCore::new("personalization", SYSTEM_PROMPT, backend, history_capacity),
        }
    }

    /// Grows with the number of interactions this worker has seen
    fn learning_confidence(&self) -> f64 {
        round2((self.core.history().len() as f64 * 0.1).min(0.9))
    }

    async fn optimize_settings(&self, input: &Record) -> Record {
        let empty = Record::new();
        let performance = object_input(input, "reading_performance").unwrap_or(&empty);
        let user_history = object_input(input, "user_history").unwrap_or(&empty);
        let current_settings = object_input(input, "current_settings").cloned().unwrap_or_default();

        let reasoning = self
            .core
            .consult(json!({
                "reading_performance": performance,
                "current_settings": current_settings,
                "task": "Optimize accessibility settings for maximum reading efficiency and comfort",
            }))
            .await;

        let Some(reasoning) = reasoning else {
            return to_record(json!({
                "optimized_settings": current_settings,
                "confidence_level": 0.3,
                "reasoning": "Using current settings as baseline",
                "personalization_tips": ["Continue using current settings"],
                "adaptive_features": [],
            }));
        };

        let sessions = user_history
            .get("sessions")
            .and_then(Value::as_array)
            .map_or(0, Vec::len);
        let consistency = performance.f64_field("consistency_score").unwrap_or(0.5);

        to_record(json!({
            "optimized_settings": optimized_settings(performance),
            "confidence_level": round2(clamp01(sessions as f64 * 0.1 + consistency * 0.5)),
            "reasoning": reasoning,
            "personalization_tips": personalization_tips(user_history),
            "adaptive_features": adaptive_features(performance),
        }))
    }

    async fn learn_feedback(&self, input: &Record) -> Record {
        let feedback_type = input.str_field("feedback_type").unwrap_or("implicit");
        let empty = Record::new();
        let feedback = object_input(input, "feedback_data").unwrap_or(&empty);

        let suggestions = if feedback_type == "explicit" {
            if feedback.f64_field("rating").unwrap_or(0.0) >= 3.0 {
                "Continue current settings"
            } else {
                "Try adjusting font size or spacing"
            }
        } else if feedback.f64_field("completion_rate").unwrap_or(0.0) > 0.7 {
            "Settings appear effective"
        } else {
            "Consider enabling more assistance features"
        };

        let reasoning = self
            .core
            .consult(json!({
                "feedback_type": feedback_type,
                "feedback_data": feedback,
                "task": "Learn from user feedback to improve personalization",
            }))
            .await;

        to_record(json!({
            "feedback_type": feedback_type,
            "key_findings": [reasoning.unwrap_or_else(|| "Basic feedback analysis completed".to_string())],
            "personalization_tips": [suggestions],
            "confidence_level": self.learning_confidence(),
        }))
    }

    async fn predict_preferences(&self, input: &Record) -> Record {
        let empty = Record::new();
        let profile = object_input(input, "user_profile").unwrap_or(&empty);
        let preferences = profile.object_field("preferences").cloned().unwrap_or_default();

        let mut predicted = Record::new();
        predicted.insert(
            "font_size".into(),
            preferences.get("font_size").cloned().unwrap_or(json!("110%")),
        );
        predicted.insert(
            "line_spacing".into(),
            preferences.get("line_spacing").cloned().unwrap_or(json!(1.5)),
        );
        // complexity from an earlier content step in the same run, when present
        let complexity = input
            .object_field("content_result")
            .and_then(|r| r.object_field("data"))
            .and_then(|d| d.f64_field("complexity_score"));
        if complexity.is_some_and(|c| c >= 0.6) {
            predicted.insert("chunking".into(), json!("enabled"));
            predicted.insert("highlighting".into(), json!("high"));
        }

        let reasoning = self
            .core
            .consult(json!({
                "user_profile": profile,
                "task": "Predict reading preferences for the upcoming content",
            }))
            .await;

        let confidence = if preferences.is_empty() { 0.4 } else { 0.7 };
        to_record(json!({
            "predicted_settings": predicted,
            "prediction_confidence": confidence,
            "confidence_level": confidence,
            "reasoning": reasoning.unwrap_or_else(|| "Based on previous settings".to_string()),
            "personalization_tips": ["Adjust the predicted settings if reading feels uncomfortable"],
        }))
    }

    async fn adaptive_tuning(&self, input: &Record) -> Record {
        let empty = Record::new();
        let fatigue = object_input(input, "fatigue_indicators").unwrap_or(&empty);
        let performance = object_input(input, "current_performance").unwrap_or(&empty);

        let mut immediate_actions = Vec::new();
        let mut session_tips = Vec::new();
        let speed_decline = fatigue.f64_field("reading_speed_decline").unwrap_or(0.0);
        if speed_decline > 0.2 {
            immediate_actions.push("Increase font size by 10%");
            session_tips.push("Consider taking a 5-minute break");
        }
        let comprehension = performance.f64_field("comprehension").unwrap_or(1.0);
        if comprehension < 0.6 {
            immediate_actions.push("Enable sentence highlighting");
            session_tips.push("Reduce reading speed");
        }

        let urgency = if speed_decline > 0.4 || comprehension < 0.4 {
            "high"
        } else if !immediate_actions.is_empty() {
            "medium"
        } else {
            "low"
        };
        if immediate_actions.is_empty() {
            immediate_actions.push("Continue current session");
        }

        let reasoning = self
            .core
            .consult(json!({
                "fatigue_indicators": fatigue,
                "current_performance": performance,
                "task": "Tune settings in real time based on fatigue and performance",
            }))
            .await;

        to_record(json!({
            "tuning_recommendations": {
                "immediate_actions": immediate_actions,
                "session_tips": session_tips,
            },
            "urgency_level": urgency,
            "personalization_tips": session_tips,
            "confidence_level": if reasoning.is_some() { 0.6 } else { 0.3 },
        }))
    }
}

#[async_trait]
impl Worker for PersonalizationWorker {
    fn name(&self) -> &str {
        self.core.name()
    }

    fn kind(&self) -> WorkerKind {
        WorkerKind::Personalization
    }

    fn description(&self) -> &str {
        "Learning and optimization of user preferences"
    }

    fn actions(&self) -> Vec<&'static str> {
        vec![
            "optimize_settings",
            "learn_feedback",
            "predict_preferences",
            "adaptive_tuning",
            "process",
        ]
    }

    fn provenance(&self) -> &str {
        self.core.backend_name()
    }

    async fn process(&self, input: Record) -> Result<Record, WorkerError> {
        let output = match self.core.action(&input, ACTION_FIELD)? {
            ACTION_HEALTH_CHECK => return self.core.health().await,
            "optimize_settings" | "process" => self.optimize_settings(&input).await,
            "learn_feedback" => self.learn_feedback(&input).await,
            "predict_preferences" => self.predict_preferences(&input).await,
            "adaptive_tuning" => self.adaptive_tuning(&input).await,
            other => return Err(WorkerError::unsupported(self.name(), other)),
        };

        self.core.remember(&input, &output);
        Ok(output)
    }
}

fn optimized_settings(performance: &Record) -> Value {
    let reading_speed = performance.f64_field("reading_speed").unwrap_or(0.0);
    let comprehension = performance.f64_field("comprehension").unwrap_or(1.0);
    let struggling = comprehension < 0.6;

    json!({
        "font_size": if reading_speed > 0.7 { "100%" } else { "120%" },
        "highlighting": if struggling { "high" } else { "normal" },
        "chunking": if struggling { "enabled" } else { "disabled" },
        "break_reminders": true,
    })
}

fn personalization_tips(user_history: &Record) -> Vec<&'static str> {
    let flag = |key: &str| user_history.get(key).and_then(Value::as_bool).unwrap_or(false);
    let mut tips = Vec::new();
    if flag("frequent_breaks") {
        tips.push("Consider enabling automatic break reminders every 15 minutes");
    }
    if flag("prefers_audio") {
        tips.push("Try combining text-to-speech with visual highlighting for better comprehension");
    }
    if flag("struggles_with_long_text") {
        tips.push("Enable progressive disclosure to reveal content in smaller chunks");
    }
    if tips.is_empty() {
        tips = vec![
            "Experiment with different font sizes to find your optimal reading comfort",
            "Try adjusting line spacing if text feels cramped",
            "Use TTS for longer documents to reduce eye strain",
        ];
    }
    tips
}

fn adaptive_features(performance: &Record) -> Vec<&'static str> {
    let mut features = Vec::new();
    if performance.f64_field("reading_speed").unwrap_or(1.0) < 0.5 {
        features.push("Text-to-speech assistance");
    }
    if performance.f64_field("comprehension").unwrap_or(1.0) < 0.6 {
        features.push("Sentence-level highlighting");
    }
    features
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::HeuristicBackend;

    fn worker() -> PersonalizationWorker {
        PersonalizationWorker::new(Arc::new(HeuristicBackend), 10)
    }

    #[tokio::test]
    async fn test_optimize_settings_for_struggling_reader() {
        let input = to_record(json!({
            "action_type": "optimize_settings",
            "reading_performance": {"reading_speed": 0.4, "comprehension": 0.5},
            "user_history": {"prefers_audio": true},
        }));
        let output = worker().process(input).await.unwrap();

        assert_eq!(output["optimized_settings"]["font_size"], "120%");
        assert_eq!(output["optimized_settings"]["chunking"], "enabled");
        assert_eq!(output["personalization_tips"].as_array().unwrap().len(), 1);
        assert_eq!(output["confidence_level"], 0.25);
    }

    #[tokio::test]
    async fn test_learning_confidence_grows_with_history() {
        let worker = worker();
        for _ in 0..3 {
            let input = to_record(json!({
                "action_type": "learn_feedback",
                "feedback_type": "explicit",
                "feedback_data": {"rating": 2},
            }));
            worker.process(input).await.unwrap();
        }
        let input = to_record(json!({"action_type": "learn_feedback"}));
        let output = worker.process(input).await.unwrap();
        assert_eq!(output["confidence_level"], 0.3);
        assert_eq!(output["personalization_tips"][0], "Consider enabling more assistance features");
    }

    #[tokio::test]
    async fn test_predict_reads_earlier_content_result() {
        let input = to_record(json!({
            "action_type": "predict_preferences",
            "content_result": {"success": true, "data": {"complexity_score": 0.8}},
        }));
        let output = worker().process(input).await.unwrap();
        assert_eq!(output["predicted_settings"]["chunking"], "enabled");
        assert_eq!(output["confidence_level"], 0.4);
    }

    #[tokio::test]
    async fn test_adaptive_tuning_urgency() {
        let input = to_record(json!({
            "action_type": "adaptive_tuning",
            "context": {
                "fatigue_indicators": {"reading_speed_decline": 0.5},
                "current_performance": {"comprehension": 0.9},
            },
        }));
        let output = worker().process(input).await.unwrap();
        assert_eq!(output["urgency_level"], "high");
        assert_eq!(
            output["tuning_recommendations"]["immediate_actions"][0],
            "Increase font size by 10%"
        );
    }
}
