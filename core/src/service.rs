use std::path::Path;

use log::debug;
use serde::Serialize;

use crate::db::Database;
use crate::error::Result;
use crate::estimate::{Candidate, EstimateRequest, EstimateResult, Estimator};
use crate::models::LogEntry;

#[derive(Debug, Clone, Serialize)]
pub struct EstimatedLog {
    pub entry: LogEntry,
    pub estimate: EstimateResult,
}

pub struct KcalService {
    db: Database,
}

impl KcalService {
    pub fn new(db_path: &Path) -> Result<Self> {
        let db = Database::open(db_path)?;
        Ok(Self { db })
    }

    pub fn new_in_memory() -> Result<Self> {
        let db = Database::open_in_memory()?;
        Ok(Self { db })
    }

    #[must_use]
    pub fn db(&self) -> &Database {
        &self.db
    }

    // --- Estimator flow ---

    /// The `limit` library foods most relevant to `description`.
    pub fn candidates(&self, description: &str, limit: usize) -> Result<Vec<Candidate>> {
        Ok(self
            .db
            .search_foods(description, limit)?
            .iter()
            .filter_map(Candidate::from_food)
            .collect())
    }

    pub fn prepare_estimate(&self, description: &str, limit: usize) -> Result<EstimateRequest> {
        let candidates = self.candidates(description, limit)?;
        debug!(
            "prepared estimate request with {} candidates",
            candidates.len()
        );
        Ok(EstimateRequest {
            description: description.trim().to_string(),
            candidates,
        })
    }

    /// Persists an estimate as a log entry. An empty `date` means today.
    pub fn log_estimate(
        &self,
        request: &EstimateRequest,
        estimate: &EstimateResult,
        date: &str,
        calories_override: Option<i64>,
    ) -> Result<LogEntry> {
        let payload = estimate.to_log_payload(date, &request.candidates, calories_override);
        self.db.upsert_log(&payload)
    }

    pub fn estimate_and_log(
        &self,
        estimator: &dyn Estimator,
        description: &str,
        date: &str,
        calories_override: Option<i64>,
        limit: usize,
    ) -> Result<EstimatedLog> {
        let request = self.prepare_estimate(description, limit)?;
        let estimate = estimator.estimate(&request)?;
        let entry = self.log_estimate(&request, &estimate, date, calories_override)?;
        Ok(EstimatedLog { entry, estimate })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use serde_json::json;
    use std::sync::Mutex;

    struct MockEstimator {
        result: EstimateResult,
        seen: Mutex<Vec<EstimateRequest>>,
    }

    impl MockEstimator {
        fn new(result: EstimateResult) -> Self {
            Self {
                result,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    impl Estimator for MockEstimator {
        fn estimate(&self, request: &EstimateRequest) -> Result<EstimateResult> {
            self.seen.lock().unwrap().push(request.clone());
            Ok(self.result.clone())
        }
    }

    struct FailingEstimator;

    impl Estimator for FailingEstimator {
        fn estimate(&self, _request: &EstimateRequest) -> Result<EstimateResult> {
            Err(StoreError::Estimator("service unavailable".to_string()))
        }
    }

    fn seeded() -> KcalService {
        let svc = KcalService::new_in_memory().unwrap();
        svc.db()
            .upsert_food(&json!({"name": "Oat Milk Latte", "calories": 120, "tags": "coffee"}))
            .unwrap();
        svc.db()
            .upsert_food(&json!({"name": "Butter Croissant", "calories": 230}))
            .unwrap();
        svc.db()
            .upsert_food(&json!({"name": "Banana", "calories": 105}))
            .unwrap();
        svc
    }

    #[test]
    fn test_candidates_are_ranked_and_limited() {
        let svc = seeded();
        let candidates = svc.candidates("latte with a croissant", 1).unwrap();
        assert_eq!(candidates.len(), 1);
        let candidates = svc.candidates("latte with a croissant", 8).unwrap();
        let names: Vec<&str> = candidates.iter().map(|c| c.name.as_str()).collect();
        // "a" matches all three names; the two named foods score higher
        assert_eq!(names.len(), 3);
        assert!(names[..2].contains(&"Oat Milk Latte"));
        assert!(names[..2].contains(&"Butter Croissant"));
        assert_eq!(names[2], "Banana");
    }

    #[test]
    fn test_estimate_and_log() {
        let svc = seeded();
        let estimator = MockEstimator::new(EstimateResult {
            label: "Latte".to_string(),
            estimated_calories: 130.0,
            confidence: "high".to_string(),
            matched_candidate_index: Some(0),
            ..EstimateResult::default()
        });

        let logged = svc
            .estimate_and_log(&estimator, "  oat latte ", "2024-05-01", None, 8)
            .unwrap();
        assert_eq!(logged.entry.calories, 130);
        assert_eq!(logged.entry.date, "2024-05-01");

        let seen = estimator.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].description, "oat latte");
        let latte_id = seen[0].candidates[0].id;
        assert_eq!(logged.entry.matched_food_id, Some(latte_id));

        let day = svc.db().get_logs_by_date("2024-05-01").unwrap();
        assert_eq!(day.len(), 1);
        assert_eq!(day[0].label, "Latte");
    }

    #[test]
    fn test_estimate_with_override_and_default_date() {
        let svc = seeded();
        let estimator = MockEstimator::new(EstimateResult {
            estimated_calories: 500.0,
            ..EstimateResult::default()
        });
        let logged = svc
            .estimate_and_log(&estimator, "mystery stew", "", Some(420), 8)
            .unwrap();
        assert_eq!(logged.entry.calories, 420);
        assert_eq!(logged.entry.label, "Food");
        assert_eq!(logged.entry.date.len(), "YYYY-MM-DD".len());
        assert_eq!(logged.entry.matched_food_id, None);
    }

    #[test]
    fn test_estimator_failure_writes_nothing() {
        let svc = seeded();
        let err = svc
            .estimate_and_log(&FailingEstimator, "latte", "2024-05-01", None, 8)
            .unwrap_err();
        assert!(matches!(err, StoreError::Estimator(_)));
        assert!(svc.db().get_all_logs().unwrap().is_empty());
    }
}
