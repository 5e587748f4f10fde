//! Bounded log of recent predictions.

use chrono::{DateTime, Utc};
use cropcast_ml::YieldQuery;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub query: YieldQuery,
    pub prediction: f64,
    pub at: DateTime<Utc>,
}

/// Keeps the last `capacity` predictions.
#[derive(Debug)]
pub struct PredictionHistory {
    entries: Mutex<VecDeque<PredictionRecord>>,
    capacity: usize,
}

impl PredictionHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    pub fn push(&self, query: YieldQuery, prediction: f64) {
        if self.capacity == 0 {
            return;
        }
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        while entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(PredictionRecord {
            query,
            prediction,
            at: Utc::now(),
        });
    }

    /// Most recent first.
    pub fn recent(&self) -> Vec<PredictionRecord> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .rev()
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(area: f64) -> YieldQuery {
        YieldQuery {
            state_name: "Bihar".into(),
            district_name: "Patna".into(),
            season: "Rabi".into(),
            crop: "Wheat".into(),
            crop_year: 2015,
            area,
            annual_rainfall: 1100.0,
            soil_ph: None,
            soil_type: None,
        }
    }

    #[test]
    fn test_bounded_and_newest_first() {
        let history = PredictionHistory::new(3);
        for i in 0..5 {
            history.push(query(i as f64), i as f64 * 2.0);
        }
        assert_eq!(history.len(), 3);
        let recent: Vec<f64> = history.recent().iter().map(|r| r.prediction).collect();
        assert_eq!(recent, vec![8.0, 6.0, 4.0]);
    }

    #[test]
    fn test_zero_capacity_keeps_nothing() {
        let history = PredictionHistory::new(0);
        history.push(query(1.0), 1.0);
        assert!(history.is_empty());
    }
}
