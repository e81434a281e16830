//! Worker-private rolling interaction history
//!
//! A worker instance may be shared by concurrent workflow runs, so appends go
//! through a mutex. The engine never reads this history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use aptflow_core::Record;

/// One recorded input/output pair
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interaction {
    pub timestamp: DateTime<Utc>,
    pub input: Record,
    pub output: Value,
}

/// Bounded FIFO of interactions; the oldest entry is evicted when full
#[derive(Debug)]
pub struct InteractionHistory {
    capacity: usize,
    entries: Mutex<VecDeque<Interaction>>,
}

impl InteractionHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    // A poisoned lock only means another recorder panicked mid-append; the deque is still valid.
    fn lock(&self) -> MutexGuard<'_, VecDeque<Interaction>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn record(&self, input: &Record, output: &Value) {
        let mut entries = self.lock();
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(Interaction {
            timestamp: Utc::now(),
            input: input.clone(),
            output: output.clone(),
        });
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Oldest-first copy of the current entries
    pub fn snapshot(&self) -> Vec<Interaction> {
        self.lock().iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    fn input(n: i64) -> Record {
        aptflow_core::into_record(json!({ "n": n }))
    }

    #[test]
    fn test_history_evicts_oldest() {
        let history = InteractionHistory::new(2);
        for n in 0..3 {
            history.record(&input(n), &json!(n));
        }

        let entries = history.snapshot();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].output, json!(1));
        assert_eq!(entries[1].output, json!(2));
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let history = InteractionHistory::new(0);
        assert_eq!(history.capacity(), 1);
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_appends_are_serialized() {
        let history = Arc::new(InteractionHistory::new(1000));
        let mut handles = Vec::new();
        for n in 0..20 {
            let history = Arc::clone(&history);
            handles.push(tokio::spawn(async move {
                for _ in 0..10 {
                    history.record(&input(n), &json!(n));
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(history.len(), 200);
    }
}
