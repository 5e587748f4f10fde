//! Advisory report store.
//!
//! Jobs are keyed by UUID. The store is injected into the gateway state, so
//! tests and alternative deployments can swap the in-memory map for any
//! other concurrent key-value backend.

use chrono::{DateTime, Duration, Utc};
use cropcast_ml::YieldQuery;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use uuid::Uuid;

/// Progress of one advisory job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReportStatus {
    Pending,
    Ready { report: String },
    Failed { reason: String },
}

impl ReportStatus {
    pub fn is_finished(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// A stored advisory job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvisoryReport {
    pub id: Uuid,
    pub query: YieldQuery,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prediction: Option<f64>,
    #[serde(flatten)]
    pub status: ReportStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AdvisoryReport {
    pub fn pending(id: Uuid, query: YieldQuery) -> Self {
        let now = Utc::now();
        Self {
            id,
            query,
            prediction: None,
            status: ReportStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Concurrent key-value storage for advisory jobs.
pub trait ReportStore: Send + Sync {
    fn insert(&self, report: AdvisoryReport);

    fn get(&self, id: &Uuid) -> Option<AdvisoryReport>;

    /// Record the prediction of a job; returns false for unknown ids.
    fn set_prediction(&self, id: &Uuid, prediction: f64) -> bool;

    /// Move a job to `status`; returns false for unknown ids.
    fn set_status(&self, id: &Uuid, status: ReportStatus) -> bool;

    /// Drop finished jobs last updated before `now - ttl`. Returns how many
    /// were removed.
    fn evict_expired(&self, now: DateTime<Utc>) -> usize;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-process report store behind a `RwLock<HashMap>`.
#[derive(Debug)]
pub struct InMemoryReportStore {
    entries: RwLock<HashMap<Uuid, AdvisoryReport>>,
    ttl: Duration,
}

impl InMemoryReportStore {
    pub fn new(ttl_secs: u64) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl: Duration::seconds(ttl_secs.min(i64::MAX as u64 / 1000) as i64),
        }
    }

    fn update(&self, id: &Uuid, apply: impl FnOnce(&mut AdvisoryReport)) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        match entries.get_mut(id) {
            Some(report) => {
                apply(report);
                report.updated_at = Utc::now();
                true
            }
            None => false,
        }
    }
}

impl ReportStore for InMemoryReportStore {
    fn insert(&self, report: AdvisoryReport) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(report.id, report);
    }

    fn get(&self, id: &Uuid) -> Option<AdvisoryReport> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    fn set_prediction(&self, id: &Uuid, prediction: f64) -> bool {
        self.update(id, |report| report.prediction = Some(prediction))
    }

    fn set_status(&self, id: &Uuid, status: ReportStatus) -> bool {
        self.update(id, |report| report.status = status)
    }

    fn evict_expired(&self, now: DateTime<Utc>) -> usize {
        let Some(cutoff) = now.checked_sub_signed(self.ttl) else {
            return 0;
        };
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|_, report| !(report.status.is_finished() && report.updated_at < cutoff));
        before - entries.len()
    }

    fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn query() -> YieldQuery {
        YieldQuery {
            state_name: "Kerala".into(),
            district_name: "Kollam".into(),
            season: "Kharif".into(),
            crop: "Rice".into(),
            crop_year: 2012,
            area: 3.5,
            annual_rainfall: 2900.0,
            soil_ph: None,
            soil_type: None,
        }
    }

    #[test]
    fn test_insert_update_get() {
        let store = InMemoryReportStore::new(60);
        let id = Uuid::new_v4();
        store.insert(AdvisoryReport::pending(id, query()));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&id).unwrap().status, ReportStatus::Pending);

        assert!(store.set_prediction(&id, 2.5));
        assert!(store.set_status(
            &id,
            ReportStatus::Ready {
                report: "Irrigate early.".into()
            }
        ));
        let report = store.get(&id).unwrap();
        assert_eq!(report.prediction, Some(2.5));
        assert!(report.status.is_finished());

        assert!(!store.set_status(&Uuid::new_v4(), ReportStatus::Pending));
    }

    #[test]
    fn test_eviction_skips_pending_and_fresh() {
        let store = InMemoryReportStore::new(60);
        let pending = Uuid::new_v4();
        let done = Uuid::new_v4();
        store.insert(AdvisoryReport::pending(pending, query()));
        store.insert(AdvisoryReport::pending(done, query()));
        store.set_status(
            &done,
            ReportStatus::Failed {
                reason: "timeout".into(),
            },
        );

        assert_eq!(store.evict_expired(Utc::now()), 0);
        assert_eq!(store.evict_expired(Utc::now() + Duration::seconds(120)), 1);
        assert!(store.get(&done).is_none());
        assert!(store.get(&pending).is_some());
    }

    #[test]
    fn test_status_serializes_flat() {
        let mut report = AdvisoryReport::pending(Uuid::nil(), query());
        report.status = ReportStatus::Ready {
            report: "text".into(),
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "ready");
        assert_eq!(json["report"], "text");
        assert_eq!(json["query"]["Crop"], "Rice");
    }
}
