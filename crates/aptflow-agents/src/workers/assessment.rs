//! Assessment worker: adaptive dyslexia and ADHD scoring

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

use aptflow_core::{Record, RecordExt};

use super::{clamp01, round2, to_record, WorkerCore};
use crate::backend::{extract_json_object, ReasoningBackend};
use crate::worker::{Worker, WorkerError, WorkerKind, ACTION_HEALTH_CHECK};

const ACTION_FIELD: &str = "type";

const SYSTEM_PROMPT: &str = "Assessment agent for accessibility testing
Adapt dyslexia and ADHD assessments to the user's performance, detect response
patterns and respond in JSON with feedback, difficulty and tips.";

pub struct AssessmentWorker {
    core: WorkerCore,
}

impl AssessmentWorker {
    pub fn new(backend: Arc<dyn ReasoningBackend>, history_capacity: usize) -> Self {
        Self {
            core: WorkerCore::new("assessment", SYSTEM_PROMPT, backend, history_capacity),
        }
    }

    async fn dyslexia(&self, input: &Record) -> Record {
        let reading_time = input.f64_field("reading_time").unwrap_or(0.0);
        let comprehension = input.f64_field("comprehension_score").unwrap_or(0.0);
        let current = input.f64_field("current_question").unwrap_or(1.0);
        let total = input.f64_field("total_questions").unwrap_or(5.0);

        let reasoning = self
            .core
            .consult(json!({
                "reading_time": reading_time,
                "comprehension_score": comprehension,
                "progress": format!("{current}/{total}"),
                "task": "Analyze performance and provide next steps for dyslexia assessment",
            }))
            .await;

        let Some(reasoning) = reasoning else {
            return to_record(json!({
                "assessment_type": "dyslexia",
                "adaptive_feedback": "Continue at your own pace",
                "next_steps": ["Take your time with the next passage"],
                "difficulty_adjustment": "maintain",
                "estimated_completion": "In progress",
                "personalized_tips": ["Focus on understanding", "Don't rush"],
                "confidence_level": 0.5,
            }));
        };

        let advice = extract_json_object(&reasoning).unwrap_or_default();
        let tips = match advice.string_list("tips") {
            tips if tips.is_empty() => vec!["Take your time".to_string(), "Focus on accuracy".to_string()],
            tips => tips,
        };

        to_record(json!({
            "assessment_type": "dyslexia",
            "adaptive_feedback": advice.str_field("feedback").unwrap_or("Keep going!"),
            "next_steps": dyslexia_next_steps(reading_time, comprehension),
            "difficulty_adjustment": advice.str_field("difficulty").unwrap_or("maintain"),
            "estimated_completion": estimate_completion(current, total),
            "personalized_tips": tips,
            "confidence_level": dyslexia_confidence(reading_time, comprehension),
            "reasoning": reasoning,
        }))
    }

    async fn adhd(&self, input: &Record) -> Record {
        let responses = input.number_list("responses");
        let response_times = input.number_list("response_times");

        let reasoning = self
            .core
            .consult(json!({
                "responses": responses,
                "response_patterns": response_patterns(&responses),
                "attention_indicators": attention_patterns(&response_times),
                "task": "Analyze ADHD assessment patterns and provide adaptive recommendations",
            }))
            .await;

        let Some(reasoning) = reasoning else {
            return to_record(json!({
                "assessment_type": "adhd",
                "adaptive_feedback": "Continue with the questionnaire",
                "next_questions": [{"question": "Continue with standard questions", "focus_area": "general"}],
                "focus_cues": ["Take your time"],
                "estimated_type": "assessment_in_progress",
                "confidence_level": 0.3,
            }));
        };

        let advice = extract_json_object(&reasoning).unwrap_or_default();
        to_record(json!({
            "assessment_type": "adhd",
            "adaptive_feedback": advice.str_field("feedback").unwrap_or("Continue assessment"),
            "next_questions": adhd_next_questions(&responses),
            "focus_cues": advice.string_list("focus_cues"),
            "response_patterns": response_patterns(&responses),
            "attention_indicators": attention_patterns(&response_times),
            "estimated_type": predict_adhd_type(&responses),
            "confidence_level": clamp01(responses.len() as f64 * 0.1),
            "reasoning": reasoning,
        }))
    }
}

#[async_trait]
impl Worker for AssessmentWorker {
    fn name(&self) -> &str {
        self.core.name()
    }

    fn kind(&self) -> WorkerKind {
        WorkerKind::Assessment
    }

    fn description(&self) -> &str {
        "Adaptive assessment and testing"
    }

    fn actions(&self) -> Vec<&'static str> {
        vec!["dyslexia", "adhd", "process"]
    }

    fn provenance(&self) -> &str {
        self.core.backend_name()
    }

    async fn process(&self, input: Record) -> Result<Record, WorkerError> {
        let action = match self.core.action(&input, ACTION_FIELD)? {
            // generic dispatch picks the sub-assessment from the payload
            "process" => input.str_field("assessment_type").unwrap_or("dyslexia"),
            action => action,
        };

        let output = match action {
            ACTION_HEALTH_CHECK => return self.core.health().await,
            "dyslexia" => self.dyslexia(&input).await,
            "adhd" => self.adhd(&input).await,
            other => return Err(WorkerError::unsupported(self.name(), other)),
        };

        self.core.remember(&input, &output);
        Ok(output)
    }
}

fn dyslexia_confidence(reading_time: f64, comprehension: f64) -> f64 {
    let time_factor = (reading_time / 30.0).min(1.0);
    round2(clamp01((time_factor + comprehension) / 2.0))
}

fn dyslexia_next_steps(reading_time: f64, comprehension: f64) -> Vec<&'static str> {
    if reading_time > 60.0 && comprehension < 0.5 {
        vec![
            "Take a 30-second break to rest your eyes",
            "Next passage will be slightly easier",
            "Focus on key words rather than every detail",
        ]
    } else if reading_time < 20.0 && comprehension > 0.8 {
        vec![
            "Excellent pace! Next passage will be more challenging",
            "Try to maintain your current reading speed",
            "Focus on deeper comprehension",
        ]
    } else {
        vec![
            "You're doing well, continue at your own pace",
            "Take your time to understand the content",
            "Remember, accuracy is more important than speed",
        ]
    }
}

fn estimate_completion(current: f64, total: f64) -> &'static str {
    let progress = if total > 0.0 { current / total } else { 1.0 };
    if progress < 0.3 {
        "Just getting started"
    } else if progress < 0.7 {
        "Halfway there"
    } else {
        "Almost done"
    }
}

fn response_patterns(responses: &[f64]) -> Value {
    let (Some(first), Some(last)) = (responses.first(), responses.last()) else {
        return json!({});
    };
    let n = responses.len() as f64;
    let extremes = responses.iter().filter(|r| **r == 0.0 || **r == 3.0).count() as f64;
    json!({
        "average_score": round2(responses.iter().sum::<f64>() / n),
        "trend": if last > first { "increasing" } else { "decreasing" },
        "extreme_responses": round2(extremes / n),
    })
}

fn attention_patterns(response_times: &[f64]) -> Value {
    if response_times.is_empty() {
        return json!({});
    }
    let avg = response_times.iter().sum::<f64>() / response_times.len() as f64;
    let max = response_times.iter().cloned().fold(f64::MIN, f64::max);
    let min = response_times.iter().cloned().fold(f64::MAX, f64::min);
    json!({
        "average_response_time": round2(avg),
        "attention_drops": response_times.iter().filter(|t| **t > avg * 1.5).count(),
        "rushed_responses": response_times.iter().filter(|t| **t < 2.0).count(),
        "focus_stability": if max - min < 10.0 { "stable" } else { "variable" },
    })
}

fn adhd_next_questions(responses: &[f64]) -> Value {
    if responses.len() >= 6 {
        let window = (responses.len() / 2).min(9);
        let hyperactivity = responses[..window].iter().sum::<f64>() / window as f64;
        if hyperactivity > 2.5 {
            return json!([{
                "question": "How often do you feel like you're 'driven by a motor'?",
                "focus_area": "hyperactivity",
                "adaptive_reason": "High hyperactivity indicators detected",
            }]);
        }
        if hyperactivity < 1.0 {
            return json!([{
                "question": "How often do you have trouble organizing tasks?",
                "focus_area": "inattention",
                "adaptive_reason": "Low hyperactivity, checking inattention patterns",
            }]);
        }
    }
    json!([{
        "question": "How often are you easily distracted?",
        "focus_area": "general",
        "adaptive_reason": "Standard assessment flow",
    }])
}

fn predict_adhd_type(responses: &[f64]) -> &'static str {
    if responses.len() < 6 {
        return "insufficient_data";
    }
    let mid = responses.len() / 2;
    let hyperactivity = responses[..mid].iter().sum::<f64>() / mid as f64;
    let inattention = responses[mid..].iter().sum::<f64>() / (responses.len() - mid) as f64;

    if hyperactivity > 2.0 && inattention > 2.0 {
        "combined_type"
    } else if hyperactivity > inattention {
        "hyperactive_type"
    } else if inattention > hyperactivity {
        "inattentive_type"
    } else {
        "no_adhd_indicated"
    }
}
