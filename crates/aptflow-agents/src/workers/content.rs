//! Content worker: text complexity analysis and reading adaptation

use async_trait::async_trait;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

use aptflow_core::{Record, RecordExt};

use super::{round2, text_input, to_record, WorkerCore};
use crate::backend::ReasoningBackend;
use crate::worker::{Worker, WorkerError, WorkerKind, ACTION_HEALTH_CHECK};

const ACTION_FIELD: &str = "content_type";

const SYSTEM_PROMPT: &str = "Content agent for accessible reading
Analyze text complexity, simplify vocabulary, split text into digestible chunks
and summarize while preserving meaning.";

/// Words per minute used for reading-time estimates
const BASE_WPM: f64 = 200.0;

/// Surface metrics for a piece of text
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComplexityMetrics {
    pub overall_score: f64,
    pub reading_level: &'static str,
    pub avg_sentence_length: f64,
    pub avg_word_length: f64,
    pub difficult_words_ratio: f64,
    pub word_count: usize,
    pub sentence_count: usize,
}

/// Sentence/word heuristics producing a 0..1 complexity score
#[derive(Debug, Clone, Copy, Default)]
pub struct ComplexityAnalyzer;

impl ComplexityAnalyzer {
    pub fn analyze(&self, text: &str) -> ComplexityMetrics {
        let words: Vec<&str> = text.split_whitespace().collect();
        let sentences = split_sentences(text);

        let word_count = words.len();
        let sentence_count = sentences.len();
        let avg_sentence_length = if sentence_count > 0 {
            word_count as f64 / sentence_count as f64
        } else {
            0.0
        };
        let (avg_word_length, difficult_ratio) = if word_count > 0 {
            let letters: usize = words.iter().map(|w| w.chars().count()).sum();
            let difficult = words.iter().filter(|w| w.chars().count() > 6).count();
            (
                letters as f64 / word_count as f64,
                difficult as f64 / word_count as f64,
            )
        } else {
            (0.0, 0.0)
        };

        let score = ((avg_sentence_length / 20.0) * 0.4
            + (avg_word_length / 8.0) * 0.3
            + difficult_ratio * 0.3)
            .min(1.0);

        let reading_level = if score < 0.3 {
            "elementary"
        } else if score < 0.6 {
            "intermediate"
        } else {
            "advanced"
        };

        ComplexityMetrics {
            overall_score: round2(score),
            reading_level,
            avg_sentence_length: (avg_sentence_length * 10.0).round() / 10.0,
            avg_word_length: (avg_word_length * 10.0).round() / 10.0,
            difficult_words_ratio: round2(difficult_ratio),
            word_count,
            sentence_count,
        }
    }
}

fn split_sentences(text: &str) -> Vec<&str> {
    text.split(['.', '!', '?'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

fn chunk_sentences(sentences: &[&str], per_chunk: usize) -> Vec<String> {
    sentences
        .chunks(per_chunk.max(1))
        .map(|group| format!("{}.", group.join(". ")))
        .collect()
}

pub struct ContentWorker {
    core: WorkerCore,
    analyzer: ComplexityAnalyzer,
}

impl ContentWorker {
    pub fn new(backend: Arc<dyn ReasoningBackend>, history_capacity: usize) -> Self {
        Self {
            core: WorkerCore::new("content", SYSTEM_PROMPT, backend, history_capacity),
            analyzer: ComplexityAnalyzer,
        }
    }

    async fn analyze_complexity(&self, text: &str) -> Record {
        let metrics = self.analyzer.analyze(text);
        let excerpt: String = text.chars().take(500).collect();

        let reasoning = self
            .core
            .consult(json!({
                "text": excerpt,
                "complexity_metrics": metrics,
                "task": "Analyze text complexity and recommend accessibility adaptations",
            }))
            .await;

        let mut recommendations = Vec::new();
        if metrics.avg_sentence_length > 20.0 {
            recommendations.push("Break long sentences into shorter ones");
        }
        if metrics.difficult_words_ratio > 0.3 {
            recommendations.push("Simplify vocabulary or provide definitions");
        }
        if metrics.overall_score >= 0.6 {
            recommendations.push("Enable chunked reading mode");
        }
        if recommendations.is_empty() {
            recommendations.push("Text is suitable for direct reading");
        }

        let attention = if metrics.overall_score >= 0.6 {
            "high"
        } else if metrics.overall_score >= 0.3 {
            "medium"
        } else {
            "low"
        };
        let minutes = metrics.word_count as f64 / BASE_WPM * (1.0 + metrics.overall_score);

        to_record(json!({
            "complexity_score": metrics.overall_score,
            "reading_level": metrics.reading_level,
            "sentence_complexity": metrics.avg_sentence_length,
            "vocabulary_difficulty": metrics.difficult_words_ratio,
            "metrics": metrics,
            "adaptation_recommendations": recommendations,
            "estimated_reading_time": {"estimated_minutes": round2(minutes)},
            "attention_demands": attention,
            "ai_insights": reasoning,
        }))
    }

    /// Chunk size shrinks for harder text; a complexity score produced earlier in
    /// the run takes precedence over re-analysis.
    async fn adapt_content(&self, input: &Record, text: &str, mode: &str) -> Record {
        let prior_score = input
            .object_field("content_result")
            .and_then(|r| r.object_field("data"))
            .and_then(|d| d.f64_field("complexity_score"));
        let score = prior_score.unwrap_or_else(|| self.analyzer.analyze(text).overall_score);

        let attention_support = input
            .object_field("context")
            .map(|c| c.string_list("user_conditions"))
            .unwrap_or_default()
            .iter()
            .any(|c| c.eq_ignore_ascii_case("adhd"));
        let per_chunk = match (score >= 0.6, attention_support) {
            (true, _) | (_, true) => 1,
            (false, false) if score >= 0.3 => 2,
            _ => 3,
        };

        let sentences = split_sentences(text);
        let chunks = chunk_sentences(&sentences, per_chunk);

        let reasoning = self
            .core
            .consult(json!({
                "complexity_score": score,
                "mode": mode,
                "task": "Adapt content presentation for the reader",
            }))
            .await;

        to_record(json!({
            "adaptation_mode": mode,
            "complexity_score": score,
            "sentences_per_chunk": per_chunk,
            "chunks": chunks,
            "chunk_count": chunks.len(),
            "ai_insights": reasoning,
        }))
    }

    async fn summarize(&self, text: &str) -> Record {
        let sentences = split_sentences(text);
        let key_points: Vec<&str> = sentences.iter().take(2).copied().collect();
        let summary = if key_points.is_empty() {
            String::new()
        } else {
            format!("{}.", key_points.join(". "))
        };

        let reduction = if text.is_empty() {
            0.0
        } else {
            1.0 - summary.len() as f64 / text.len() as f64
        };

        let reasoning = self
            .core
            .consult(json!({"task": "Summarize content for accessible reading"}))
            .await;

        to_record(json!({
            "primary_summary": summary,
            "key_points": key_points,
            "complexity_reduction": round2(reduction.max(0.0)),
            "ai_insights": reasoning,
        }))
    }
}

#[async_trait]
impl Worker for ContentWorker {
    fn name(&self) -> &str {
        self.core.name()
    }

    fn kind(&self) -> WorkerKind {
        WorkerKind::Content
    }

    fn description(&self) -> &str {
        "Intelligent content processing and adaptation"
    }

    fn actions(&self) -> Vec<&'static str> {
        vec![
            "analyze_complexity",
            "adapt_content",
            "dynamic_adjustment",
            "generate_summary",
            "create_chunks",
            "process",
        ]
    }

    fn provenance(&self) -> &str {
        self.core.backend_name()
    }

    async fn process(&self, input: Record) -> Result<Record, WorkerError> {
        let action = self.core.action(&input, ACTION_FIELD)?;
        if action == ACTION_HEALTH_CHECK {
            return self.core.health().await;
        }
        if !self.actions().contains(&action) {
            return Err(WorkerError::unsupported(self.name(), action));
        }

        let text = text_input(&input).unwrap_or_default();
        let output = match action {
            "generate_summary" => self.summarize(text).await,
            "adapt_content" | "dynamic_adjustment" | "create_chunks" => {
                self.adapt_content(&input, text, action).await
            }
            _ => self.analyze_complexity(text).await,
        };

        self.core.remember(&input, &output);
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::HeuristicBackend;

    fn worker() -> ContentWorker {
        ContentWorker::new(Arc::new(HeuristicBackend), 10)
    }

    #[test]
    fn test_analyzer_simple_text() {
        let metrics = ComplexityAnalyzer.analyze("The cat sat. The dog ran.");
        assert_eq!(metrics.sentence_count, 2);
        assert_eq!(metrics.word_count, 6);
        assert_eq!(metrics.reading_level, "elementary");
        assert_eq!(metrics.difficult_words_ratio, 0.0);
    }

    #[test]
    fn test_analyzer_empty_text() {
        let metrics = ComplexityAnalyzer.analyze("");
        assert_eq!(metrics.overall_score, 0.0);
        assert_eq!(metrics.sentence_count, 0);
    }

    #[test]
    fn test_analyzer_dense_text_is_advanced() {
        let sentence = "Comprehensive institutional considerations notwithstanding, \
                        extraordinarily multidimensional interdisciplinary collaborations \
                        fundamentally necessitate sophisticated organizational infrastructures \
                        alongside meticulously orchestrated communication methodologies everywhere.";
        let metrics = ComplexityAnalyzer.analyze(sentence);
        assert_eq!(metrics.reading_level, "advanced");
    }

    #[tokio::test]
    async fn test_analyze_complexity_output() {
        let input = to_record(json!({
            "content_type": "analyze_complexity",
            "context": {"text": "Short words. Easy read."},
        }));
        let output = worker().process(input).await.unwrap();
        assert!(output["complexity_score"].as_f64().unwrap() < 0.3);
        assert_eq!(output["attention_demands"], "low");
        assert_eq!(output["adaptation_recommendations"][0], "Text is suitable for direct reading");
    }

    #[tokio::test]
    async fn test_adapt_content_uses_prior_score() {
        let input = to_record(json!({
            "content_type": "adapt_content",
            "text": "One. Two. Three. Four.",
            "content_result": {"success": true, "data": {"complexity_score": 0.9}},
        }));
        let output = worker().process(input).await.unwrap();
        assert_eq!(output["sentences_per_chunk"], 1);
        assert_eq!(output["chunk_count"], 4);
    }

    #[tokio::test]
    async fn test_summary_takes_two_sentences() {
        let input = to_record(json!({
            "content_type": "generate_summary",
            "text": "First point. Second point. Third point.",
        }));
        let output = worker().process(input).await.unwrap();
        assert_eq!(output["primary_summary"], "First point. Second point.");
    }

    #[tokio::test]
    async fn test_unknown_content_type() {
        let input = to_record(json!({"content_type": "translate"}));
        assert!(worker().process(input).await.is_err());
    }
}
