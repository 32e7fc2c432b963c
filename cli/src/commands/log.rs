use anyhow::{Result, bail};
use serde_json::{Value, json};

use kcal_core::db::Database;
use kcal_core::models::Food;

use super::helpers::{date_key, format_range, not_found, print_log_table};

pub(crate) struct LogArgs {
    pub label: Option<String>,
    pub calories: Option<i64>,
    pub low: Option<i64>,
    pub high: Option<i64>,
    pub note: Option<String>,
    pub confidence: Option<String>,
}

/// Fills label and calories from the library food when the flags leave them out.
fn log_payload(date: &str, args: LogArgs, food: Option<&Food>) -> Result<Value> {
    let calories = match (args.calories, food) {
        (Some(c), _) => c,
        (None, Some(f)) => f.calories,
        (None, None) => bail!("Provide --calories or --food-id"),
    };
    if let (Some(low), Some(high)) = (args.low, args.high) {
        if low > high {
            bail!("--low ({low}) must not exceed --high ({high})");
        }
    }
    let label = args
        .label
        .or_else(|| food.map(|f| f.name.clone()))
        .unwrap_or_default();

    Ok(json!({
        "date": date,
        "label": label,
        "calories": calories,
        "rangeLow": args.low,
        "rangeHigh": args.high,
        "note": args.note,
        "confidence": args.confidence,
        "matchedFoodId": food.and_then(|f| f.id),
    }))
}

pub(crate) fn cmd_log_add(
    db: &Database,
    args: LogArgs,
    date: Option<String>,
    food_id: Option<i64>,
    json: bool,
) -> Result<()> {
    let date = date_key(date)?;
    let food = match food_id {
        Some(id) => Some(
            db.get_food(id)?
                .unwrap_or_else(|| not_found("Food", id, json)),
        ),
        None => None,
    };

    let entry = db.upsert_log(&log_payload(&date, args, food.as_ref())?)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entry)?);
    } else {
        let label = &entry.label;
        let cal = entry.calories;
        let id = entry.id.unwrap_or_default();
        println!("Logged {label} on {date}: {cal} kcal (id: {id})");
    }

    Ok(())
}

pub(crate) fn cmd_log_show(db: &Database, date: Option<String>, json: bool) -> Result<()> {
    let date = date_key(date)?;
    let summary = db.daily_summary(&date)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    if summary.entries.is_empty() {
        println!("No entries for {date}");
        return Ok(());
    }
    print_log_table(&summary.entries);
    let total = summary.total_calories;
    let count = summary.entry_count;
    println!("Total for {date}: {total} kcal across {count} entries");
    for entry in summary.entries.iter().filter(|e| !e.breakdown.is_empty()) {
        println!("  {}:", entry.label);
        for item in &entry.breakdown {
            println!("    {} ({} kcal)", item.item, item.calories);
        }
    }

    Ok(())
}

pub(crate) fn cmd_log_edit(db: &Database, id: i64, calories: i64, json: bool) -> Result<()> {
    let Some(entry) = db.update_log_calories(id, calories)? else {
        not_found("Entry", id, json);
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&entry)?);
    } else {
        let label = &entry.label;
        let cal = entry.calories;
        let range = format_range(entry.range_low, entry.range_high);
        println!("Updated entry {id}: {label} is now {cal} kcal (estimate range {range})");
    }

    Ok(())
}

pub(crate) fn cmd_log_delete(db: &Database, id: i64, json: bool) -> Result<()> {
    if !db.delete_log(id)? {
        not_found("Entry", id, json);
    }
    if json {
        println!("{}", json!({ "deleted": id }));
    } else {
        println!("Deleted entry {id}");
    }
    Ok(())
}
