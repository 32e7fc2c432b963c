use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::Result;
use crate::models::Food;

/// How many library foods are offered to the estimator by default.
pub const DEFAULT_CANDIDATES: usize = 8;

/// The slice of a [`Food`] sent to the estimator to anchor its guess.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: i64,
    pub name: String,
    pub calories: i64,
    pub portion: String,
    pub tags: Vec<String>,
    pub notes: String,
}

impl Candidate {
    /// `None` for foods that have not been stored yet.
    #[must_use]
    pub fn from_food(food: &Food) -> Option<Self> {
        Some(Self {
            id: food.id?,
            name: food.name.clone(),
            calories: food.calories,
            portion: food.portion.clone(),
            tags: food.tags.clone(),
            notes: food.notes.clone(),
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EstimateRequest {
    pub description: String,
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EstimateBreakdownItem {
    #[serde(default, deserialize_with = "lenient::string")]
    pub item: String,
    #[serde(default, deserialize_with = "lenient::number")]
    pub calories: f64,
}

/// Structured estimate as returned by the estimator service.
///
/// Deserialization never rejects a field's value: nulls and wrong types fall
/// back to the default, and numeric strings parse.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EstimateResult {
    #[serde(default, deserialize_with = "lenient::string")]
    pub label: String,
    #[serde(default, deserialize_with = "lenient::number")]
    pub estimated_calories: f64,
    #[serde(default, deserialize_with = "lenient::optional_number")]
    pub range_low: Option<f64>,
    #[serde(default, deserialize_with = "lenient::optional_number")]
    pub range_high: Option<f64>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub confidence: String,
    /// Index into the request's candidate list, if the estimator recognised one.
    #[serde(default, deserialize_with = "lenient::index")]
    pub matched_candidate_index: Option<i64>,
    #[serde(default, deserialize_with = "lenient::breakdown")]
    pub breakdown: Vec<EstimateBreakdownItem>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub notes: String,
}

mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    use super::EstimateBreakdownItem;
    use crate::normalize::coerce_string;

    fn as_f64(v: &Value) -> Option<f64> {
        let x = match v {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }?;
        x.is_finite().then_some(x)
    }

    pub fn string<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<String, D::Error> {
        Ok(coerce_string(Some(&Value::deserialize(d)?)))
    }

    pub fn number<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<f64, D::Error> {
        Ok(as_f64(&Value::deserialize(d)?).unwrap_or(0.0))
    }

    pub fn optional_number<'de, D: Deserializer<'de>>(
        d: D,
    ) -> std::result::Result<Option<f64>, D::Error> {
        Ok(as_f64(&Value::deserialize(d)?))
    }

    pub fn index<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Option<i64>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        })
    }

    /// Non-array input is empty; elements that are not objects are skipped.
    pub fn breakdown<'de, D: Deserializer<'de>>(
        d: D,
    ) -> std::result::Result<Vec<EstimateBreakdownItem>, D::Error> {
        let Value::Array(items) = Value::deserialize(d)? else {
            return Ok(Vec::new());
        };
        Ok(items
            .into_iter()
            .filter(Value::is_object)
            .filter_map(|item| EstimateBreakdownItem::deserialize(item).ok())
            .collect())
    }
}

impl EstimateResult {
    #[must_use]
    pub fn matched_food_id(&self, candidates: &[Candidate]) -> Option<i64> {
        let idx = usize::try_from(self.matched_candidate_index?).ok()?;
        candidates.get(idx).map(|c| c.id)
    }

    /// Builds a log entry payload; `calories_override` replaces the estimate
    /// when the user adjusted it before saving.
    #[must_use]
    pub fn to_log_payload(
        &self,
        date: &str,
        candidates: &[Candidate],
        calories_override: Option<i64>,
    ) -> Value {
        let calories = calories_override.map_or_else(|| json!(self.estimated_calories), |c| json!(c));
        json!({
            "date": date,
            "label": self.label,
            "calories": calories,
            "rangeLow": self.range_low,
            "rangeHigh": self.range_high,
            "note": self.notes,
            "breakdown": self.breakdown,
            "confidence": self.confidence,
            "matchedFoodId": self.matched_food_id(candidates),
        })
    }
}

/// The remote calorie estimator, kept behind a trait so the core never does I/O.
pub trait Estimator: Send + Sync {
    fn estimate(&self, request: &EstimateRequest) -> Result<EstimateResult>;
}
