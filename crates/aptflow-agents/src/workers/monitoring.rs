//! Monitoring worker: progress tracking, trend analysis and interventions
//!
//! Keeps a bounded per-user session log so that trend and pattern actions can
//! look back over earlier `track_progress` calls.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use aptflow_core::{Record, RecordExt};

use super::{clamp01, object_input, round2, to_record, WorkerCore};
use crate::backend::ReasoningBackend;
use crate::worker::{Worker, WorkerError, WorkerKind, ACTION_HEALTH_CHECK};

const ACTION_FIELD: &str = "monitoring_type";

const SYSTEM_PROMPT: &str = "Monitoring agent for reading progress
Track reading speed, comprehension and engagement over time, detect patterns
and recommend interventions with clear next goals.";

/// Sessions retained per user
const MAX_SESSIONS: usize = 100;

const ANONYMOUS_USER: &str = "anonymous";

#[derive(Debug, Clone, Default, Serialize)]
struct SessionEntry {
    reading_speed: f64,
    comprehension: f64,
    engagement: f64,
}

impl SessionEntry {
    fn from_metrics(metrics: &Record) -> Self {
        Self {
            reading_speed: metrics.f64_field("reading_speed").unwrap_or(0.0),
            comprehension: metrics.f64_field("comprehension").unwrap_or(0.0),
            engagement: metrics.f64_field("engagement").unwrap_or(0.0),
        }
    }

    fn metric(&self, name: &str) -> f64 {
        match name {
            "reading_speed" => self.reading_speed,
            "comprehension" => self.comprehension,
            "engagement" => self.engagement,
            _ => 0.0,
        }
    }
}

pub struct MonitoringWorker {
    core: WorkerCore,
    sessions: Mutex<HashMap<String, VecDeque<SessionEntry>>>,
}

impl MonitoringWorker {
    pub fn new(backend: Arc<dyn ReasoningBackend>, history_capacity: usize) -> Self {
        Self {
            core: WorkerCore::new("monitoring", SYSTEM_PROMPT, backend, history_capacity),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    fn lock_sessions(&self) -> MutexGuard<'_, HashMap<String, VecDeque<SessionEntry>>> {
        self.sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn store_session(&self, user: &str, entry: SessionEntry) -> Vec<SessionEntry> {
        let mut sessions = self.lock_sessions();
        let log = sessions.entry(user.to_string()).or_default();
        log.push_back(entry);
        while log.len() > MAX_SESSIONS {
            log.pop_front();
        }
        log.iter().cloned().collect()
    }

    fn user_sessions(&self, user: &str) -> Vec<SessionEntry> {
        self.lock_sessions()
            .get(user)
            .map(|log| log.iter().cloned().collect())
            .unwrap_or_default()
    }

    async fn track_progress(&self, input: &Record, user: &str) -> Record {
        let empty = Record::new();
        let metrics = object_input(input, "performance_metrics").unwrap_or(&empty);
        let current = SessionEntry::from_metrics(metrics);
        let sessions = self.store_session(user, current.clone());

        let reasoning = self
            .core
            .consult(json!({
                "performance_metrics": metrics,
                "session_count": sessions.len(),
                "task": "Analyze current progress and provide tracking insights",
            }))
            .await;

        if reasoning.is_none() {
            return to_record(json!({
                "progress_summary": "Session completed successfully",
                "performance_trends": {"overall": "stable"},
                "milestone_progress": [],
                "areas_of_improvement": ["Continue practicing"],
                "areas_of_concern": [],
                "next_goals": ["Complete next session"],
                "recommended_actions": ["Complete next session"],
                "confidence_score": 0.5,
            }));
        }

        let recent = &sessions[sessions.len().saturating_sub(5)..];
        let goals = next_goals(&current);

        to_record(json!({
            "progress_summary": format!(
                "Session completed with {:.1}% comprehension",
                current.comprehension * 100.0
            ),
            "performance_trends": {
                "reading_speed": trend_label(recent, "reading_speed"),
                "comprehension": trend_label(recent, "comprehension"),
            },
            "milestone_progress": milestones(&current),
            "areas_of_improvement": improvements(recent, &current),
            "areas_of_concern": concerns(&current),
            "next_goals": goals,
            "recommended_actions": goals,
            "confidence_score": round2((recent.len() as f64 * 0.2).min(1.0)),
        }))
    }

    async fn track_engagement(&self, input: &Record) -> Record {
        let empty = Record::new();
        let metrics = object_input(input, "engagement_metrics")
            .or_else(|| object_input(input, "performance_metrics"))
            .unwrap_or(&empty);
        let engagement = metrics.f64_field("engagement").unwrap_or(0.5);
        let distractions = metrics.f64_field("distractions").unwrap_or(0.0);

        let level = if engagement >= 0.7 {
            "high"
        } else if engagement >= 0.4 {
            "moderate"
        } else {
            "low"
        };
        let mut actions = Vec::new();
        if engagement < 0.4 {
            actions.push("Shorten reading segments");
        }
        if distractions > 3.0 {
            actions.push("Enable focus mode");
        }
        if actions.is_empty() {
            actions.push("Maintain current session structure");
        }

        let reasoning = self
            .core
            .consult(json!({
                "engagement_metrics": metrics,
                "task": "Assess real-time engagement and attention",
            }))
            .await;

        to_record(json!({
            "engagement_level": level,
            "attention_score": round2(clamp01(engagement - distractions * 0.05)),
            "recommended_actions": actions,
            "confidence_score": if reasoning.is_some() { 0.6 } else { 0.4 },
        }))
    }

    async fn analyze_trends(&self, input: &Record, user: &str) -> Record {
        let period = input.str_field("time_period").unwrap_or("week");
        let focus = match input.string_list("metrics_focus") {
            focus if focus.is_empty() => vec![
                "reading_speed".to_string(),
                "comprehension".to_string(),
                "engagement".to_string(),
            ],
            focus => focus,
        };

        let sessions = self.user_sessions(user);
        let window = match period {
            "week" => 7,
            "month" => 30,
            _ => 1,
        };
        let relevant = &sessions[sessions.len().saturating_sub(window)..];

        let mut changes = Record::new();
        let mut actions = Vec::new();
        for metric in &focus {
            let values: Vec<f64> = relevant.iter().map(|s| s.metric(metric)).collect();
            let (direction, strength) = match (values.first(), values.last()) {
                (Some(first), Some(last)) if values.len() >= 2 => (
                    if last > first { "increasing" } else { "decreasing" },
                    (last - first).abs() / first.max(0.1),
                ),
                _ => ("stable", 0.0),
            };
            if direction == "decreasing" {
                actions.push(format!("Review support for declining {metric}"));
            }
            changes.insert(
                metric.clone(),
                json!({
                    "direction": direction,
                    "strength": round2(strength),
                    "current_value": values.last().copied().unwrap_or(0.0),
                }),
            );
        }
        if actions.is_empty() {
            actions.push("Continue current approach".to_string());
        }

        let reasoning = self
            .core
            .consult(json!({
                "time_period": period,
                "metrics_focus": focus,
                "task": format!("Analyze {period} performance trends for specified metrics"),
            }))
            .await;

        to_record(json!({
            "trend_summary": format!("Analysis of {} sessions over {}", relevant.len(), period),
            "performance_changes": changes,
            "statistical_significance": if relevant.len() >= 5 { "moderate" } else { "low" },
            "recommended_actions": actions,
            "confidence_score": if reasoning.is_some() && !relevant.is_empty() { 0.7 } else { 0.4 },
        }))
    }

    async fn detect_patterns(&self, user: &str) -> Record {
        let sessions = self.user_sessions(user);
        let mut patterns = Vec::new();
        if sessions.len() >= 3 {
            let avg = |f: fn(&SessionEntry) -> f64| {
                sessions.iter().map(f).sum::<f64>() / sessions.len() as f64
            };
            if avg(|s| s.engagement) < 0.4 {
                patterns.push("Engagement consistently low");
            }
            if avg(|s| s.comprehension) >= 0.8 {
                patterns.push("Comprehension consistently strong");
            }
        }

        let reasoning = self
            .core
            .consult(json!({
                "session_count": sessions.len(),
                "task": "Detect significant behavioral patterns and their implications",
            }))
            .await;

        to_record(json!({
            "detected_patterns": patterns,
            "pattern_significance": if sessions.len() >= 10 { "high" } else { "low" },
            "behavioral_insights": reasoning.into_iter().collect::<Vec<_>>(),
            "recommended_actions": ["Keep tracking sessions to refine pattern detection"],
            "confidence_score": round2((sessions.len() as f64 * 0.1).min(0.9)),
        }))
    }

    async fn recommend_interventions(&self, input: &Record) -> Record {
        let challenges = input.string_list("current_challenges");
        let interventions: Vec<Value> = challenges
            .iter()
            .map(|challenge| {
                let (intervention, priority) = match challenge.as_str() {
                    "low_comprehension" => ("Provide simplified content and summaries", "high"),
                    "slow_reading" => ("Enable text-to-speech alongside highlighting", "medium"),
                    "low_engagement" | "distraction" => ("Introduce shorter sessions with breaks", "medium"),
                    _ => ("Review accessibility settings", "low"),
                };
                json!({"challenge": challenge, "intervention": intervention, "priority": priority})
            })
            .collect();

        let reasoning = self
            .core
            .consult(json!({
                "current_challenges": challenges,
                "task": "Recommend optimal interventions based on current challenges and history",
            }))
            .await;

        let actions: Vec<&str> = interventions
            .iter()
            .filter_map(|i| i["intervention"].as_str())
            .collect();

        to_record(json!({
            "recommended_interventions": interventions,
            "recommended_actions": if actions.is_empty() { vec!["Continue monitoring"] } else { actions },
            "implementation_timeline": "Next 2-3 sessions",
            "confidence_score": if reasoning.is_some() { 0.6 } else { 0.4 },
        }))
    }

    async fn generate_insights(&self, input: &Record, user: &str) -> Record {
        let depth = input.str_field("insight_depth").unwrap_or("comprehensive");
        let sessions = self.user_sessions(user);
        let latest = sessions.last().cloned().unwrap_or_default();

        let reasoning = self
            .core
            .consult(json!({
                "session_count": sessions.len(),
                "insight_depth": depth,
                "task": format!("Generate {depth} progress insights with actionable recommendations"),
            }))
            .await;

        to_record(json!({
            "overall_progress": format!("{} sessions recorded", sessions.len()),
            "key_achievements": milestones(&latest),
            "improvement_areas": concerns(&latest),
            "future_goals": next_goals(&latest),
            "recommended_actions": next_goals(&latest),
            "motivational_insights": reasoning.unwrap_or_else(|| "Every session builds progress".to_string()),
            "confidence_score": round2((sessions.len() as f64 * 0.2).min(1.0)),
        }))
    }
}

#[async_trait]
impl Worker for MonitoringWorker {
    fn name(&self) -> &str {
        self.core.name()
    }

    fn kind(&self) -> WorkerKind {
        WorkerKind::Monitoring
    }

    fn description(&self) -> &str {
        "Progress tracking and analytics"
    }

    fn actions(&self) -> Vec<&'static str> {
        vec![
            "track_progress",
            "track_engagement",
            "analyze_trends",
            "detect_patterns",
            "recommend_interventions",
            "generate_insights",
            "process",
        ]
    }

    fn provenance(&self) -> &str {
        self.core.backend_name()
    }

    async fn process(&self, input: Record) -> Result<Record, WorkerError> {
        let action = self.core.action(&input, ACTION_FIELD)?;
        let user = input.str_field("user_id").unwrap_or(ANONYMOUS_USER);

        let output = match action {
            ACTION_HEALTH_CHECK => return self.core.health().await,
            "track_progress" | "process" => self.track_progress(&input, user).await,
            "track_engagement" => self.track_engagement(&input).await,
            "analyze_trends" => self.analyze_trends(&input, user).await,
            "detect_patterns" => self.detect_patterns(user).await,
            "recommend_interventions" => self.recommend_interventions(&input).await,
            "generate_insights" => self.generate_insights(&input, user).await,
            other => return Err(WorkerError::unsupported(self.name(), other)),
        };

        self.core.remember(&input, &output);
        Ok(output)
    }
}

fn trend_label(sessions: &[SessionEntry], metric: &str) -> &'static str {
    match (sessions.first(), sessions.last()) {
        (Some(first), Some(last)) if sessions.len() >= 2 => {
            if last.metric(metric) > first.metric(metric) {
                "improving"
            } else {
                "declining"
            }
        }
        _ => "insufficient_data",
    }
}

fn milestones(current: &SessionEntry) -> Vec<Value> {
    let mut reached = Vec::new();
    if current.comprehension >= 0.8 {
        reached.push(json!({
            "type": "comprehension",
            "achievement": "High comprehension achieved",
            "value": current.comprehension,
        }));
    }
    if current.reading_speed >= 0.7 {
        reached.push(json!({
            "type": "speed",
            "achievement": "Good reading speed achieved",
            "value": current.reading_speed,
        }));
    }
    reached
}

fn improvements(recent: &[SessionEntry], current: &SessionEntry) -> Vec<&'static str> {
    let mut found = Vec::new();
    // recent already ends with the current session
    if recent.len() >= 2 && current.comprehension > recent[recent.len() - 2].comprehension {
        found.push("Comprehension is improving");
    }
    if current.reading_speed > 0.6 {
        found.push("Reading speed is good");
    }
    if found.is_empty() {
        found.push("Continue current approach");
    }
    found
}

fn concerns(current: &SessionEntry) -> Vec<&'static str> {
    let mut found = Vec::new();
    if current.comprehension < 0.4 {
        found.push("Low comprehension - consider easier content");
    }
    if current.reading_speed < 0.3 {
        found.push("Slow reading speed - check adaptation settings");
    }
    found
}

fn next_goals(current: &SessionEntry) -> Vec<&'static str> {
    let mut goals = Vec::new();
    if current.comprehension < 0.7 {
        goals.push("Improve comprehension to 70%");
    } else if current.comprehension < 0.9 {
        goals.push("Achieve excellent comprehension (90%)");
    }
    if current.reading_speed < 0.6 {
        goals.push("Increase reading speed");
    }
    if goals.is_empty() {
        goals.push("Maintain current performance");
    }
    goals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::HeuristicBackend;

    fn worker() -> MonitoringWorker {
        MonitoringWorker::new(Arc::new(HeuristicBackend), 10)
    }

    fn track(user: &str, comprehension: f64, speed: f64) -> Record {
        to_record(json!({
            "monitoring_type": "track_progress",
            "user_id": user,
            "performance_metrics": {"comprehension": comprehension, "reading_speed": speed},
        }))
    }

    #[tokio::test]
    async fn test_track_progress_goals_and_confidence() {
        let worker = worker();
        worker.process(track("u1", 0.5, 0.4)).await.unwrap();
        let output = worker.process(track("u1", 0.85, 0.8)).await.unwrap();

        assert_eq!(output["next_goals"], json!(["Achieve excellent comprehension (90%)"]));
        assert_eq!(output["recommended_actions"], output["next_goals"]);
        assert_eq!(output["performance_trends"]["comprehension"], "improving");
        assert_eq!(output["areas_of_improvement"][0], "Comprehension is improving");
        assert_eq!(output["confidence_score"], 0.4);
        assert_eq!(output["milestone_progress"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_sessions_are_per_user() {
        let worker = worker();
        worker.process(track("u1", 0.5, 0.5)).await.unwrap();
        worker.process(track("u1", 0.6, 0.5)).await.unwrap();
        worker.process(track("u2", 0.9, 0.9)).await.unwrap();

        let input = to_record(json!({
            "monitoring_type": "analyze_trends",
            "user_id": "u1",
            "metrics_focus": ["comprehension"],
        }));
        let output = worker.process(input).await.unwrap();
        assert_eq!(output["trend_summary"], "Analysis of 2 sessions over week");
        assert_eq!(output["performance_changes"]["comprehension"]["direction"], "increasing");
    }

    #[tokio::test]
    async fn test_session_log_is_bounded() {
        let worker = worker();
        for _ in 0..MAX_SESSIONS + 5 {
            worker.process(track("u1", 0.5, 0.5)).await.unwrap();
        }
        assert_eq!(worker.user_sessions("u1").len(), MAX_SESSIONS);
    }

    #[tokio::test]
    async fn test_interventions_from_challenges() {
        let input = to_record(json!({
            "monitoring_type": "recommend_interventions",
            "current_challenges": ["low_comprehension", "unknown"],
        }));
        let output = worker().process(input).await.unwrap();
        assert_eq!(output["recommended_interventions"][0]["priority"], "high");
        assert_eq!(
            output["recommended_actions"][1],
            "Review accessibility settings"
        );
    }

    #[tokio::test]
    async fn test_engagement_level() {
        let input = to_record(json!({
            "monitoring_type": "track_engagement",
            "context": {"engagement_metrics": {"engagement": 0.2, "distractions": 5}},
        }));
        let output = worker().process(input).await.unwrap();
        assert_eq!(output["engagement_level"], "low");
        assert_eq!(
            output["recommended_actions"],
            json!(["Shorten reading segments", "Enable focus mode"])
        );
    }
}
