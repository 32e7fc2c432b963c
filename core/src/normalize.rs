//! Canonicalizes raw payloads into storage-ready [`Food`] and [`LogEntry`] values.
//!
//! Input arrives as loosely typed JSON (CLI flags, imported snapshots,
//! estimator output). Coercions never fail: bad strings become `""`, bad
//! numbers become `0`, bad sequences become empty. The only error is a
//! payload that is not a JSON object at all.

use chrono::Local;
use serde_json::{Map, Number, Value};

use crate::error::{Result, StoreError};
use crate::models::{BreakdownItem, Confidence, Food, LogEntry};

pub const DEFAULT_LOG_LABEL: &str = "Food";

/// How `createdAt` / `updatedAt` are treated during normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampPolicy {
    /// Regular write: keep `createdAt` if present, always refresh `updatedAt`.
    Touch,
    /// Backup restore: keep both when present.
    Preserve,
}

/// Wall-clock inputs for a write, passed in so normalization stays pure.
#[derive(Debug, Clone)]
pub struct WriteTime {
    pub millis: i64,
    /// Caller's local day as `YYYY-MM-DD`, used when a log entry has no date.
    pub today: String,
}

impl WriteTime {
    #[must_use]
    pub fn current() -> Self {
        let now = Local::now();
        Self {
            millis: now.timestamp_millis(),
            today: now.format("%Y-%m-%d").to_string(),
        }
    }

    #[must_use]
    pub fn fixed(millis: i64, today: &str) -> Self {
        Self {
            millis,
            today: today.to_string(),
        }
    }
}

pub fn normalize_food(raw: &Value, at: &WriteTime, policy: TimestampPolicy) -> Result<Food> {
    let obj = as_object(raw, "food")?;
    let name = coerce_string(obj.get("name"));
    let tags = parse_tags(obj.get("tags"));
    let (created_at, updated_at) = stamps(obj, at.millis, policy);
    Ok(Food {
        id: coerce_id(obj.get("id")),
        name_lower: name.to_lowercase(),
        name,
        calories: coerce_non_negative(obj.get("calories")),
        portion: coerce_string(obj.get("portion")),
        tags_lower: tags_lower(&tags),
        tags,
        notes: coerce_string(obj.get("notes")),
        created_at,
        updated_at,
    })
}

pub fn normalize_log(raw: &Value, at: &WriteTime, policy: TimestampPolicy) -> Result<LogEntry> {
    let obj = as_object(raw, "log entry")?;

    let mut date = coerce_string(obj.get("date"));
    if date.is_empty() {
        date.clone_from(&at.today);
    }
    let mut label = coerce_string(obj.get("label"));
    if label.is_empty() {
        label = DEFAULT_LOG_LABEL.to_string();
    }
    let confidence = match obj.get("confidence") {
        Some(Value::String(s)) => Confidence::parse_lenient(s),
        _ => Confidence::default(),
    };
    let (created_at, updated_at) = stamps(obj, at.millis, policy);

    Ok(LogEntry {
        id: coerce_id(obj.get("id")),
        date,
        label,
        calories: coerce_non_negative(obj.get("calories")),
        range_low: coerce_optional(obj.get("rangeLow")),
        range_high: coerce_optional(obj.get("rangeHigh")),
        note: coerce_string(obj.get("note")),
        breakdown: parse_breakdown(obj.get("breakdown")),
        confidence,
        matched_food_id: coerce_optional(obj.get("matchedFoodId")),
        created_at,
        updated_at,
    })
}

fn as_object<'a>(raw: &'a Value, what: &str) -> Result<&'a Map<String, Value>> {
    raw.as_object()
        .ok_or_else(|| StoreError::validation(format!("{what} payload must be a JSON object")))
}

fn stamps(obj: &Map<String, Value>, now: i64, policy: TimestampPolicy) -> (i64, i64) {
    let created_at = coerce_timestamp(obj.get("createdAt")).unwrap_or(now);
    let updated_at = match policy {
        TimestampPolicy::Touch => now,
        TimestampPolicy::Preserve => coerce_timestamp(obj.get("updatedAt")).unwrap_or(now),
    };
    (created_at, updated_at)
}

/// Trimmed string; numbers and bools are stringified, anything else is `""`.
#[must_use]
pub fn coerce_string(v: Option<&Value>) -> String {
    match v {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

/// Non-negative integer by truncation. Negative clamps to 0, non-numeric is 0.
#[must_use]
pub fn coerce_non_negative(v: Option<&Value>) -> i64 {
    coerce_optional(v).unwrap_or(0)
}

/// Like [`coerce_non_negative`], but absent, null, empty or unparsable input stays `None`.
#[must_use]
pub fn coerce_optional(v: Option<&Value>) -> Option<i64> {
    match v? {
        Value::Number(n) => Some(number_to_non_negative(n)),
        Value::String(s) => {
            let t = s.trim();
            if t.is_empty() {
                return None;
            }
            t.parse::<f64>().ok().map(float_to_non_negative)
        }
        Value::Bool(b) => Some(i64::from(*b)),
        _ => None,
    }
}

/// Largest accepted incoming id: the largest integer a JSON double holds exactly.
pub const MAX_ID: i64 = (1 << 53) - 1;

/// Positive id up to [`MAX_ID`]. Out-of-range input counts as absent.
fn coerce_id(v: Option<&Value>) -> Option<i64> {
    coerce_optional(v).filter(|id| (1..=MAX_ID).contains(id))
}

fn coerce_timestamp(v: Option<&Value>) -> Option<i64> {
    coerce_optional(v).filter(|&ts| ts > 0)
}

fn number_to_non_negative(n: &Number) -> i64 {
    match n.as_i64() {
        Some(i) => i.max(0),
        None => n.as_f64().map_or(0, float_to_non_negative),
    }
}

fn float_to_non_negative(x: f64) -> i64 {
    if x.is_finite() && x > 0.0 {
        // saturating cast
        x.trunc() as i64
    } else {
        0
    }
}

/// Tags from either a JSON array or a comma-separated string.
#[must_use]
pub fn parse_tags(v: Option<&Value>) -> Vec<String> {
    match v {
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| coerce_string(Some(item)))
            .filter(|t| !t.is_empty())
            .collect(),
        Some(other) => coerce_string(Some(other))
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(String::from)
            .collect(),
        None => Vec::new(),
    }
}

#[must_use]
pub fn tags_lower(tags: &[String]) -> String {
    tags.iter()
        .map(|t| t.to_lowercase())
        .collect::<Vec<_>>()
        .join(",")
}

fn parse_breakdown(v: Option<&Value>) -> Vec<BreakdownItem> {
    let Some(Value::Array(items)) = v else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(Value::as_object)
        .map(|obj| BreakdownItem {
            item: coerce_string(obj.get("item")),
            calories: coerce_non_negative(obj.get("calories")),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn at(millis: i64) -> WriteTime {
        WriteTime::fixed(millis, "2024-05-01")
    }

    #[test]
    fn test_food_trims_and_derives_lowercase() {
        let food = normalize_food(
            &json!({"name": "  Oat Milk Latte ", "calories": 120, "tags": "Coffee, dairy-free,, "}),
            &at(1000),
            TimestampPolicy::Touch,
        )
        .unwrap();
        assert_eq!(food.id, None);
        assert_eq!(food.name, "Oat Milk Latte");
        assert_eq!(food.name_lower, "oat milk latte");
        assert_eq!(food.tags, vec!["Coffee", "dairy-free"]);
        assert_eq!(food.tags_lower, "coffee,dairy-free");
        assert_eq!(food.portion, "");
        assert_eq!(food.notes, "");
        assert_eq!(food.created_at, 1000);
        assert_eq!(food.updated_at, 1000);
    }

    #[test]
    fn test_tags_from_array() {
        let tags = parse_tags(Some(&json!([" Breakfast ", "", "oats", 5])));
        assert_eq!(tags, vec!["Breakfast", "oats", "5"]);
    }

    #[test]
    fn test_tags_missing_or_unusable() {
        assert!(parse_tags(None).is_empty());
        assert!(parse_tags(Some(&json!(null))).is_empty());
        assert!(parse_tags(Some(&json!({"a": 1}))).is_empty());
        assert!(parse_tags(Some(&json!(" , ,"))).is_empty());
    }

    #[test]
    fn test_numeric_coercion() {
        assert_eq!(coerce_non_negative(Some(&json!(120.9))), 120);
        assert_eq!(coerce_non_negative(Some(&json!(-5))), 0);
        assert_eq!(coerce_non_negative(Some(&json!(-0.5))), 0);
        assert_eq!(coerce_non_negative(Some(&json!(" 95.7 "))), 95);
        assert_eq!(coerce_non_negative(Some(&json!("abc"))), 0);
        assert_eq!(coerce_non_negative(Some(&json!("NaN"))), 0);
        assert_eq!(coerce_non_negative(Some(&json!("inf"))), 0);
        assert_eq!(coerce_non_negative(Some(&json!(true))), 1);
        assert_eq!(coerce_non_negative(Some(&json!([1]))), 0);
        assert_eq!(coerce_non_negative(None), 0);
    }

    #[test]
    fn test_large_integers_keep_precision() {
        let ts = 1_717_171_717_171_i64;
        assert_eq!(coerce_non_negative(Some(&json!(ts))), ts);
    }

    #[test]
    fn test_optional_coercion() {
        assert_eq!(coerce_optional(None), None);
        assert_eq!(coerce_optional(Some(&json!(null))), None);
        assert_eq!(coerce_optional(Some(&json!(""))), None);
        assert_eq!(coerce_optional(Some(&json!("x"))), None);
        assert_eq!(coerce_optional(Some(&json!(250.4))), Some(250));
        assert_eq!(coerce_optional(Some(&json!(-1))), Some(0));
    }

    #[test]
    fn test_string_coercion() {
        assert_eq!(coerce_string(Some(&json!("  hi  "))), "hi");
        assert_eq!(coerce_string(Some(&json!(42))), "42");
        assert_eq!(coerce_string(Some(&json!(null))), "");
        assert_eq!(coerce_string(Some(&json!(["a"]))), "");
        assert_eq!(coerce_string(None), "");
    }

    #[test]
    fn test_non_object_is_validation_error() {
        let err = normalize_food(&json!("latte"), &at(1), TimestampPolicy::Touch).unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
        let err = normalize_log(&json!([1, 2]), &at(1), TimestampPolicy::Touch).unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[test]
    fn test_touch_preserves_created_refreshes_updated() {
        let food = normalize_food(
            &json!({"id": 4, "name": "Toast", "createdAt": 100, "updatedAt": 200}),
            &at(5000),
            TimestampPolicy::Touch,
        )
        .unwrap();
        assert_eq!(food.id, Some(4));
        assert_eq!(food.created_at, 100);
        assert_eq!(food.updated_at, 5000);
    }

    #[test]
    fn test_preserve_keeps_both_timestamps() {
        let food = normalize_food(
            &json!({"name": "Toast", "createdAt": 100, "updatedAt": 200}),
            &at(5000),
            TimestampPolicy::Preserve,
        )
        .unwrap();
        assert_eq!(food.created_at, 100);
        assert_eq!(food.updated_at, 200);

        let bare = normalize_food(&json!({"name": "Toast"}), &at(5000), TimestampPolicy::Preserve)
            .unwrap();
        assert_eq!(bare.created_at, 5000);
        assert_eq!(bare.updated_at, 5000);
    }

    #[test]
    fn test_derived_fields_ignore_incoming_values() {
        let food = normalize_food(
            &json!({"name": "Banana", "nameLower": "apple", "tags": ["Fruit"], "tagsLower": "veg"}),
            &at(1),
            TimestampPolicy::Touch,
        )
        .unwrap();
        assert_eq!(food.name_lower, "banana");
        assert_eq!(food.tags_lower, "fruit");
    }

    #[test]
    fn test_invalid_ids_are_dropped() {
        for id in [json!(0), json!(-3), json!("abc"), json!(null)] {
            let food = normalize_food(&json!({"id": id, "name": "x"}), &at(1), TimestampPolicy::Touch)
                .unwrap();
            assert_eq!(food.id, None);
        }
        let food = normalize_food(&json!({"id": "7", "name": "x"}), &at(1), TimestampPolicy::Touch)
            .unwrap();
        assert_eq!(food.id, Some(7));
    }

    #[test]
    fn test_out_of_range_ids_are_dropped() {
        for id in [json!(1e30), json!(u64::MAX), json!(i64::MAX), json!(MAX_ID + 1), json!("1e300")] {
            let food = normalize_food(&json!({"id": id, "name": "x"}), &at(1), TimestampPolicy::Touch)
                .unwrap();
            assert_eq!(food.id, None, "{id}");
        }
        let food = normalize_food(&json!({"id": MAX_ID, "name": "x"}), &at(1), TimestampPolicy::Touch)
            .unwrap();
        assert_eq!(food.id, Some(MAX_ID));
    }

    #[test]
    fn test_food_normalization_is_idempotent() {
        let first = normalize_food(
            &json!({"name": " Greek Yogurt ", "calories": "150.2", "portion": " 1 cup ",
                    "tags": "Dairy, protein", "notes": " plain "}),
            &at(1000),
            TimestampPolicy::Touch,
        )
        .unwrap();
        let again = normalize_food(
            &serde_json::to_value(&first).unwrap(),
            &at(9000),
            TimestampPolicy::Touch,
        )
        .unwrap();
        assert_eq!(again.updated_at, 9000);
        assert_eq!(Food { updated_at: first.updated_at, ..again }, first);
    }

    #[test]
    fn test_log_defaults() {
        let entry = normalize_log(&json!({}), &at(1000), TimestampPolicy::Touch).unwrap();
        assert_eq!(entry.date, "2024-05-01");
        assert_eq!(entry.label, DEFAULT_LOG_LABEL);
        assert_eq!(entry.calories, 0);
        assert_eq!(entry.range_low, None);
        assert_eq!(entry.range_high, None);
        assert_eq!(entry.confidence, Confidence::Medium);
        assert_eq!(entry.matched_food_id, None);
        assert!(entry.breakdown.is_empty());
    }

    #[test]
    fn test_log_full_payload() {
        let entry = normalize_log(
            &json!({
                "date": "2024-03-01",
                "label": " Burrito bowl ",
                "calories": 742.8,
                "rangeLow": 600,
                "rangeHigh": "900",
                "note": " extra salsa ",
                "breakdown": [
                    {"item": " rice ", "calories": 210.5},
                    "garbage",
                    {"item": "chicken", "calories": -4}
                ],
                "confidence": "HIGH",
                "matchedFoodId": 12
            }),
            &at(1000),
            TimestampPolicy::Touch,
        )
        .unwrap();
        assert_eq!(entry.date, "2024-03-01");
        assert_eq!(entry.label, "Burrito bowl");
        assert_eq!(entry.calories, 742);
        assert_eq!(entry.range_low, Some(600));
        assert_eq!(entry.range_high, Some(900));
        assert_eq!(entry.note, "extra salsa");
        assert_eq!(
            entry.breakdown,
            vec![
                BreakdownItem {
                    item: "rice".to_string(),
                    calories: 210
                },
                BreakdownItem {
                    item: "chicken".to_string(),
                    calories: 0
                },
            ]
        );
        assert_eq!(entry.confidence, Confidence::High);
        assert_eq!(entry.matched_food_id, Some(12));
    }

    #[test]
    fn test_log_normalization_is_idempotent() {
        let first = normalize_log(
            &json!({"date": "2024-03-01", "label": "Soup", "calories": 210, "rangeLow": 180,
                    "breakdown": [{"item": "broth", "calories": 40}], "confidence": "low"}),
            &at(1000),
            TimestampPolicy::Touch,
        )
        .unwrap();
        let again = normalize_log(
            &serde_json::to_value(&first).unwrap(),
            &at(2000),
            TimestampPolicy::Touch,
        )
        .unwrap();
        assert_eq!(LogEntry { updated_at: first.updated_at, ..again }, first);
    }
}
