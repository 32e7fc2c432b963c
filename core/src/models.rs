use serde::{Deserialize, Serialize};

/// A reusable library item: a nameable food and its calories per stated portion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Food {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    #[serde(default)]
    pub name_lower: String,
    pub calories: i64,
    #[serde(default)]
    pub portion: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub tags_lower: String,
    #[serde(default)]
    pub notes: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// One recorded meal on one calendar date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub date: String,
    pub label: String,
    pub calories: i64,
    #[serde(default)]
    pub range_low: Option<i64>,
    #[serde(default)]
    pub range_high: Option<i64>,
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub breakdown: Vec<BreakdownItem>,
    #[serde(default)]
    pub confidence: Confidence,
    #[serde(default)]
    pub matched_food_id: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakdownItem {
    pub item: String,
    pub calories: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    #[default]
    Medium,
    High,
}

impl Confidence {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Confidence::Low => "low",
            Confidence::Medium => "medium",
            Confidence::High => "high",
        }
    }

    /// Case-insensitive parse; anything unrecognised falls back to `Medium`.
    #[must_use]
    pub fn parse_lenient(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "low" => Confidence::Low,
            "high" => Confidence::High,
            _ => Confidence::Medium,
        }
    }
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DailySummary {
    pub date: String,
    pub entries: Vec<LogEntry>,
    pub total_calories: i64,
    pub entry_count: usize,
}

impl DailySummary {
    #[must_use]
    pub fn from_entries(date: &str, entries: Vec<LogEntry>) -> Self {
        let total_calories = entries
            .iter()
            .fold(0i64, |acc, e| acc.saturating_add(e.calories));
        Self {
            date: date.to_string(),
            entry_count: entries.len(),
            entries,
            total_calories,
        }
    }
}
