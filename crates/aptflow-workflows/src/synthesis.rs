//! Synthesizer - merges collaboration outputs into one insight object
//!
//! Each worker kind contributes to exactly one section of the output.
//! Confidence is the mean of the self-reported confidence of every
//! successful contributor.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use aptflow_agents::{WorkerKind, WorkerResponse};
use aptflow_core::{Record, RecordExt};

/// Confidence assumed for a contributor that reports none, and for an empty synthesis
pub const NEUTRAL_CONFIDENCE: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    pub source: String,
    pub insight: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisOutput {
    pub combined_insights: Vec<Insight>,
    pub unified_recommendations: Vec<String>,
    /// Always within [0, 1]
    pub confidence_score: f64,
    pub action_priorities: Vec<String>,
}

impl Default for SynthesisOutput {
    fn default() -> Self {
        Self {
            combined_insights: Vec::new(),
            unified_recommendations: Vec::new(),
            confidence_score: NEUTRAL_CONFIDENCE,
            action_priorities: Vec::new(),
        }
    }
}

/// Confidence reported in a worker's output, per kind
fn reported_confidence(kind: WorkerKind, data: &Record) -> Option<f64> {
    match kind {
        WorkerKind::Monitoring => data
            .f64_field("confidence_score")
            .or_else(|| data.f64_field("confidence_level")),
        WorkerKind::Assessment | WorkerKind::Personalization | WorkerKind::Content => {
            data.f64_field("confidence_level")
        }
    }
}

fn extract(kind: WorkerKind, source: &str, data: &Record, out: &mut SynthesisOutput) {
    match kind {
        WorkerKind::Assessment => out.combined_insights.push(Insight {
            source: source.to_string(),
            insight: data
                .str_field("adaptive_feedback")
                .unwrap_or("Assessment completed")
                .to_string(),
        }),
        WorkerKind::Personalization => out
            .unified_recommendations
            .extend(data.string_list("personalization_tips")),
        WorkerKind::Content => {
            let score = match data.get("complexity_score") {
                Some(Value::String(s)) => s.clone(),
                Some(value) if !value.is_null() => value.to_string(),
                _ => "unknown".to_string(),
            };
            out.combined_insights.push(Insight {
                source: source.to_string(),
                insight: format!("Content complexity: {score}"),
            });
        }
        WorkerKind::Monitoring => out
            .action_priorities
            .extend(data.string_list("recommended_actions")),
    }
}

/// Merge `(name, kind, response)` entries in the order given
pub fn synthesize<'a, I>(entries: I) -> SynthesisOutput
where
    I: IntoIterator<Item = (&'a str, WorkerKind, &'a WorkerResponse)>,
{
    let mut out = SynthesisOutput::default();
    let mut confidences = Vec::new();

    for (name, kind, response) in entries {
        if !response.success {
            continue;
        }
        let Some(data) = response.data.as_ref() else {
            continue;
        };
        extract(kind, name, data, &mut out);
        confidences.push(reported_confidence(kind, data).unwrap_or(NEUTRAL_CONFIDENCE));
    }

    if !confidences.is_empty() {
        let mean = confidences.iter().sum::<f64>() / confidences.len() as f64;
        out.confidence_score = if mean.is_nan() {
            NEUTRAL_CONFIDENCE
        } else {
            mean.clamp(0.0, 1.0)
        };
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ok(worker: &str, data: Value) -> WorkerResponse {
        WorkerResponse::success(worker, aptflow_core::into_record(data), "test")
    }

    #[test]
    fn test_mean_confidence_with_missing_value() {
        let a = ok("assessment", json!({"confidence_level": 0.9}));
        let p = ok("personalization", json!({"confidence_level": 0.3}));
        let c = ok("content", json!({}));
        let out = synthesize([
            ("assessment", WorkerKind::Assessment, &a),
            ("personalization", WorkerKind::Personalization, &p),
            ("content", WorkerKind::Content, &c),
        ]);
        assert!((out.confidence_score - 0.566_666_7).abs() < 1e-6);
    }

    #[test]
    fn test_failed_entries_do_not_contribute() {
        let m = ok("monitoring", json!({"confidence_score": 0.8, "recommended_actions": ["Rest"]}));
        let failed = WorkerResponse::failure("content", "boom", "engine");
        let out = synthesize([
            ("monitoring", WorkerKind::Monitoring, &m),
            ("content", WorkerKind::Content, &failed),
        ]);
        assert_eq!(out.confidence_score, 0.8);
        assert_eq!(out.action_priorities, vec!["Rest"]);
        assert!(out.combined_insights.is_empty());
    }

    #[test]
    fn test_sections_per_kind() {
        let a = ok("assessment", json!({}));
        let p = ok("personalization", json!({"personalization_tips": ["Bigger font", 3]}));
        let c = ok("content", json!({"complexity_score": 0.42}));
        let out = synthesize([
            ("assessment", WorkerKind::Assessment, &a),
            ("personalization", WorkerKind::Personalization, &p),
            ("content", WorkerKind::Content, &c),
        ]);
        assert_eq!(out.combined_insights[0].insight, "Assessment completed");
        assert_eq!(out.combined_insights[1].insight, "Content complexity: 0.42");
        assert_eq!(out.unified_recommendations, vec!["Bigger font"]);
    }

    #[test]
    fn test_empty_and_clamped() {
        let empty: Vec<(&str, WorkerKind, &WorkerResponse)> = Vec::new();
        assert_eq!(synthesize(empty).confidence_score, NEUTRAL_CONFIDENCE);

        let wild = ok("assessment", json!({"confidence_level": 7.0}));
        let out = synthesize([("assessment", WorkerKind::Assessment, &wild)]);
        assert_eq!(out.confidence_score, 1.0);
    }
}
