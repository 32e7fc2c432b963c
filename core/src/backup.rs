//! Full-store snapshots for backup and restore.
//!
//! A snapshot carries every food and log entry verbatim, ids included.
//! Restoring one with `wipe_first` reproduces the exported collections
//! exactly; without it, records are written with put semantics and an
//! incoming id overwrites whatever the local store holds under that id.

use std::io::Read;

use chrono::{SecondsFormat, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::db::Database;
use crate::error::{Result, StoreError};
use crate::models::{Food, LogEntry};
use crate::normalize::{TimestampPolicy, WriteTime, normalize_food, normalize_log};

pub const SNAPSHOT_VERSION: i64 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub version: i64,
    pub exported_at: String,
    #[serde(default)]
    pub foods: Vec<Food>,
    #[serde(default)]
    pub logs: Vec<LogEntry>,
}

impl Snapshot {
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reads raw snapshot JSON without imposing the typed shape, for [`Database::import_snapshot`].
    pub fn read_value<R: Read>(reader: R) -> Result<Value> {
        Ok(serde_json::from_reader(reader)?)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ImportOptions {
    /// Clear both collections before writing.
    pub wipe_first: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImportSummary {
    pub foods_imported: usize,
    pub logs_imported: usize,
    pub wiped: bool,
}

impl Database {
    pub fn export_snapshot(&self) -> Result<Snapshot> {
        let foods = self.get_all_foods()?;
        let logs = self.get_all_logs()?;
        info!(
            "exporting snapshot: {} foods, {} log entries",
            foods.len(),
            logs.len()
        );
        Ok(Snapshot {
            version: SNAPSHOT_VERSION,
            exported_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            foods,
            logs,
        })
    }

    /// Restores a snapshot.
    ///
    /// `foods` and `logs` that are not arrays count as empty. Every record is
    /// normalized before anything is written, so a malformed record fails the
    /// import with the store untouched. The wipe and the two collection writes
    /// are separate transactions: a storage failure after the wipe leaves the
    /// store empty or partially restored.
    pub fn import_snapshot(&self, snapshot: &Value, options: ImportOptions) -> Result<ImportSummary> {
        let obj = snapshot
            .as_object()
            .ok_or_else(|| StoreError::validation("snapshot must be a JSON object"))?;

        let at = WriteTime::current();
        let mut foods = records(obj.get("foods"))
            .iter()
            .map(|raw| normalize_food(raw, &at, TimestampPolicy::Preserve))
            .collect::<Result<Vec<_>>>()?;
        let mut logs = records(obj.get("logs"))
            .iter()
            .map(|raw| normalize_log(raw, &at, TimestampPolicy::Preserve))
            .collect::<Result<Vec<_>>>()?;

        if options.wipe_first {
            self.wipe_all()?;
        }
        self.put_foods(&mut foods)?;
        self.put_logs(&mut logs)?;

        info!(
            "imported snapshot: {} foods, {} log entries, wiped={}",
            foods.len(),
            logs.len(),
            options.wipe_first
        );
        Ok(ImportSummary {
            foods_imported: foods.len(),
            logs_imported: logs.len(),
            wiped: options.wipe_first,
        })
    }
}

fn records(v: Option<&Value>) -> &[Value] {
    match v {
        Some(Value::Array(items)) => items,
        _ => &[],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn seeded() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.upsert_food(&json!({"name": "Oat Milk Latte", "calories": 120, "tags": "coffee, dairy-free"}))
            .unwrap();
        db.upsert_food(&json!({"name": "Banana", "calories": 105, "portion": "1 medium"}))
            .unwrap();
        db.upsert_log(&json!({
            "date": "2024-05-01",
            "label": "Salad",
            "calories": 300,
            "rangeLow": 250,
            "rangeHigh": 380,
            "breakdown": [{"item": "greens", "calories": 40}],
            "confidence": "high"
        }))
        .unwrap();
        db.upsert_log(&json!({"date": "2024-05-02", "label": "Toast", "calories": 180}))
            .unwrap();
        db
    }

    #[test]
    fn test_export_contains_everything() {
        let db = seeded();
        let snapshot = db.export_snapshot().unwrap();
        assert_eq!(snapshot.version, SNAPSHOT_VERSION);
        assert_eq!(snapshot.foods.len(), 2);
        assert_eq!(snapshot.logs.len(), 2);
        assert!(chrono::DateTime::parse_from_rfc3339(&snapshot.exported_at).is_ok());
    }

    #[test]
    fn test_export_empty_store() {
        let db = Database::open_in_memory().unwrap();
        let snapshot = db.export_snapshot().unwrap();
        assert!(snapshot.foods.is_empty());
        assert!(snapshot.logs.is_empty());
    }

    #[test]
    fn test_round_trip_with_wipe() {
        let db = seeded();
        let before_foods = db.get_all_foods().unwrap();
        let before_logs = db.get_all_logs().unwrap();

        let value = serde_json::to_value(db.export_snapshot().unwrap()).unwrap();

        // mutate the store so the restore has something to undo
        db.upsert_food(&json!({"name": "Stray"})).unwrap();
        db.delete_log(before_logs[0].id.unwrap()).unwrap();

        let summary = db
            .import_snapshot(&value, ImportOptions { wipe_first: true })
            .unwrap();
        assert_eq!(
            summary,
            ImportSummary {
                foods_imported: 2,
                logs_imported: 2,
                wiped: true
            }
        );
        assert_eq!(db.get_all_foods().unwrap(), before_foods);
        assert_eq!(db.get_all_logs().unwrap(), before_logs);
    }

    #[test]
    fn test_round_trip_into_fresh_store() {
        let source = seeded();
        let text = source.export_snapshot().unwrap().to_json_pretty().unwrap();

        let target = Database::open_in_memory().unwrap();
        let value = Snapshot::read_value(text.as_bytes()).unwrap();
        target
            .import_snapshot(&value, ImportOptions { wipe_first: true })
            .unwrap();
        assert_eq!(target.get_all_foods().unwrap(), source.get_all_foods().unwrap());
        assert_eq!(target.get_all_logs().unwrap(), source.get_all_logs().unwrap());
    }

    #[test]
    fn test_repeated_import_with_wipe_is_idempotent() {
        let db = seeded();
        let value = serde_json::to_value(db.export_snapshot().unwrap()).unwrap();
        for _ in 0..3 {
            db.import_snapshot(&value, ImportOptions { wipe_first: true })
                .unwrap();
        }
        assert_eq!(db.get_all_foods().unwrap().len(), 2);
        assert_eq!(db.get_all_logs().unwrap().len(), 2);
    }

    #[test]
    fn test_import_without_ids_and_without_wipe_duplicates() {
        let db = Database::open_in_memory().unwrap();
        let snapshot = json!({"version": 1, "foods": [{"name": "Rice", "calories": 200}]});
        db.import_snapshot(&snapshot, ImportOptions::default()).unwrap();
        db.import_snapshot(&snapshot, ImportOptions::default()).unwrap();
        assert_eq!(db.get_all_foods().unwrap().len(), 2);
    }

    #[test]
    fn test_import_overwrites_existing_id() {
        let db = Database::open_in_memory().unwrap();
        let mut ids = Vec::new();
        for i in 0..7 {
            ids.push(db.upsert_food(&json!({"name": format!("Food {i}")})).unwrap().id.unwrap());
        }
        assert_eq!(ids.last(), Some(&7));

        let snapshot = json!({
            "version": 1,
            "foods": [{"id": 7, "name": "Imported", "calories": 333, "createdAt": 1, "updatedAt": 2}]
        });
        let summary = db.import_snapshot(&snapshot, ImportOptions::default()).unwrap();
        assert_eq!(summary.foods_imported, 1);
        assert!(!summary.wiped);

        let all = db.get_all_foods().unwrap();
        assert_eq!(all.len(), 7);
        let seven = db.get_food(7).unwrap().unwrap();
        assert_eq!(seven.name, "Imported");
        assert_eq!(seven.calories, 333);
        assert_eq!(seven.updated_at, 2);
    }

    #[test]
    fn test_imported_ids_advance_the_counter() {
        let db = Database::open_in_memory().unwrap();
        let snapshot = json!({"foods": [{"id": 50, "name": "High"}]});
        db.import_snapshot(&snapshot, ImportOptions::default()).unwrap();
        let next = db.upsert_food(&json!({"name": "Next"})).unwrap();
        assert!(next.id.unwrap() > 50);
    }

    #[test]
    fn test_out_of_range_import_id_gets_fresh_id() {
        let db = Database::open_in_memory().unwrap();
        let snapshot = json!({"foods": [{"id": 1e30, "name": "Huge"}, {"id": u64::MAX, "name": "Wide"}]});
        db.import_snapshot(&snapshot, ImportOptions::default()).unwrap();

        let ids: Vec<i64> = db.get_all_foods().unwrap().iter().filter_map(|f| f.id).collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.iter().all(|&id| id < 10));

        let next = db.upsert_food(&json!({"name": "Next"})).unwrap();
        assert!(next.id.unwrap() > *ids.iter().max().unwrap());
    }

    #[test]
    fn test_non_object_snapshot_rejected_before_wipe() {
        let db = seeded();
        for bad in [json!([]), json!("backup"), json!(null), json!(3)] {
            let err = db
                .import_snapshot(&bad, ImportOptions { wipe_first: true })
                .unwrap_err();
            assert!(matches!(err, StoreError::Validation(_)));
        }
        assert_eq!(db.get_all_foods().unwrap().len(), 2);
    }

    #[test]
    fn test_non_array_collections_treated_as_empty() {
        let db = seeded();
        let summary = db
            .import_snapshot(
                &json!({"foods": "nope", "logs": {"0": {}}}),
                ImportOptions { wipe_first: true },
            )
            .unwrap();
        assert_eq!(summary.foods_imported, 0);
        assert_eq!(summary.logs_imported, 0);
        assert!(db.get_all_foods().unwrap().is_empty());
        assert!(db.get_all_logs().unwrap().is_empty());
    }

    #[test]
    fn test_malformed_record_leaves_store_untouched() {
        let db = seeded();
        let snapshot = json!({"foods": [{"name": "Fine"}, 42], "logs": []});
        let err = db
            .import_snapshot(&snapshot, ImportOptions { wipe_first: true })
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
        assert_eq!(db.get_all_foods().unwrap().len(), 2);
        assert_eq!(db.get_all_logs().unwrap().len(), 2);
    }

    #[test]
    fn test_import_recomputes_derived_fields() {
        let db = Database::open_in_memory().unwrap();
        let snapshot = json!({"foods": [{"id": 1, "name": "Kimchi", "nameLower": "stale", "tags": ["Ferment"]}]});
        db.import_snapshot(&snapshot, ImportOptions::default()).unwrap();
        let food = db.get_food(1).unwrap().unwrap();
        assert_eq!(food.name_lower, "kimchi");
        assert_eq!(food.tags_lower, "ferment");
    }

    #[test]
    fn test_snapshot_json_shape() {
        let db = seeded();
        let value = serde_json::to_value(db.export_snapshot().unwrap()).unwrap();
        assert_eq!(value["version"], SNAPSHOT_VERSION);
        assert!(value["exportedAt"].is_string());
        assert!(value["foods"][0]["nameLower"].is_string());
        assert!(value["logs"][0]["rangeLow"].is_number() || value["logs"][0]["rangeLow"].is_null());
    }
}
