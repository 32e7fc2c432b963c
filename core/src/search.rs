//! Token-based relevance ranking over a snapshot of the food library.
//!
//! Each query token scores +2 when it appears anywhere in name, tags or
//! notes, and +3 more when it appears in the name. A recency boost of at most
//! [`RECENCY_BOOST_MAX`] is added on top; token scores are whole numbers, so
//! the boost can only reorder foods whose token scores are equal.

use serde::Serialize;

use crate::models::Food;

const HAYSTACK_POINTS: u32 = 2;
const NAME_POINTS: u32 = 3;
pub const RECENCY_BOOST_MAX: f64 = 0.5;

#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub food: Food,
    pub score: f64,
}

#[must_use]
pub fn tokenize(query: &str) -> Vec<String> {
    query
        .to_lowercase()
        .split_whitespace()
        .map(String::from)
        .collect()
}

/// Sum of per-token points, without the recency boost.
#[must_use]
pub fn token_score(food: &Food, tokens: &[String]) -> u32 {
    let haystack = format!(
        "{} {} {}",
        food.name_lower,
        food.tags_lower,
        food.notes.to_lowercase()
    );
    tokens
        .iter()
        .map(|token| {
            let mut points = 0;
            if haystack.contains(token.as_str()) {
                points += HAYSTACK_POINTS;
            }
            if food.name_lower.contains(token.as_str()) {
                points += NAME_POINTS;
            }
            points
        })
        .sum()
}

#[allow(clippy::cast_precision_loss)]
fn recency_boost(updated_at: i64, oldest: i64, newest: i64) -> f64 {
    if newest <= oldest {
        return 0.0;
    }
    let offset = (updated_at - oldest) as f64;
    let span = (newest - oldest) as f64;
    (offset / span).clamp(0.0, 1.0) * RECENCY_BOOST_MAX
}

/// Ranks `foods` against `query`, best first, at most `limit` hits.
///
/// `foods` is expected in the store's recency order; an empty query returns
/// its first `limit` entries unchanged, and equal scores keep that order.
#[must_use]
pub fn rank_foods(foods: &[Food], query: &str, limit: usize) -> Vec<SearchHit> {
    let query = query.trim();
    if query.is_empty() {
        return foods
            .iter()
            .take(limit)
            .map(|food| SearchHit {
                food: food.clone(),
                score: 0.0,
            })
            .collect();
    }

    let tokens = tokenize(query);
    let oldest = foods.iter().map(|f| f.updated_at).min().unwrap_or(0);
    let newest = foods.iter().map(|f| f.updated_at).max().unwrap_or(0);

    let mut hits: Vec<SearchHit> = foods
        .iter()
        .filter_map(|food| {
            let matched = token_score(food, &tokens);
            if matched == 0 {
                return None;
            }
            Some(SearchHit {
                food: food.clone(),
                score: f64::from(matched) + recency_boost(food.updated_at, oldest, newest),
            })
        })
        .collect();

    // sort_by is stable
    hits.sort_by(|a, b| b.score.total_cmp(&a.score));
    hits.truncate(limit);
    hits
}

#[must_use]
pub fn search_foods(foods: &[Food], query: &str, limit: usize) -> Vec<Food> {
    rank_foods(foods, query, limit)
        .into_iter()
        .map(|hit| hit.food)
        .collect()
}
