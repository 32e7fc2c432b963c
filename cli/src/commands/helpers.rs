use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use serde::Serialize;
use std::process;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use kcal_core::models::{Food, LogEntry};
use kcal_core::search::SearchHit;

pub(crate) fn parse_date(date_str: Option<String>) -> Result<NaiveDate> {
    match date_str {
        None => Ok(Local::now().date_naive()),
        Some(s) => match s.as_str() {
            "today" => Ok(Local::now().date_naive()),
            "yesterday" => Ok(Local::now().date_naive() - chrono::Duration::days(1)),
            "tomorrow" => Ok(Local::now().date_naive() + chrono::Duration::days(1)),
            _ => NaiveDate::parse_from_str(&s, "%Y-%m-%d").with_context(|| {
                format!("Invalid date '{s}'. Use YYYY-MM-DD or today/yesterday/tomorrow")
            }),
        },
    }
}

/// The store keys log entries by `YYYY-MM-DD` strings.
pub(crate) fn date_key(date_str: Option<String>) -> Result<String> {
    Ok(parse_date(date_str)?.format("%Y-%m-%d").to_string())
}

pub(crate) fn format_range(low: Option<i64>, high: Option<i64>) -> String {
    match (low, high) {
        (Some(l), Some(h)) => format!("{l}-{h}"),
        (Some(l), None) => format!("{l}+"),
        (None, Some(h)) => format!("<={h}"),
        (None, None) => "-".to_string(),
    }
}

fn food_id(food: &Food) -> String {
    food.id.map_or_else(|| "-".to_string(), |id| id.to_string())
}

pub(crate) fn print_food_table(foods: &[Food]) {
    #[derive(Tabled)]
    struct FoodRow {
        #[tabled(rename = "ID")]
        id: String,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Kcal")]
        calories: i64,
        #[tabled(rename = "Portion")]
        portion: String,
        #[tabled(rename = "Tags")]
        tags: String,
    }

    let rows: Vec<FoodRow> = foods
        .iter()
        .map(|f| FoodRow {
            id: food_id(f),
            name: truncate(&f.name, 35),
            calories: f.calories,
            portion: truncate(&f.portion, 20),
            tags: truncate(&f.tags.join(", "), 30),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::single(2)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}

pub(crate) fn print_search_table(hits: &[SearchHit]) {
    #[derive(Tabled)]
    struct HitRow {
        #[tabled(rename = "#")]
        idx: usize,
        #[tabled(rename = "ID")]
        id: String,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Kcal")]
        calories: i64,
        #[tabled(rename = "Tags")]
        tags: String,
        #[tabled(rename = "Score")]
        score: String,
    }

    let rows: Vec<HitRow> = hits
        .iter()
        .enumerate()
        .map(|(i, h)| HitRow {
            idx: i + 1,
            id: food_id(&h.food),
            name: truncate(&h.food.name, 35),
            calories: h.food.calories,
            tags: truncate(&h.food.tags.join(", "), 30),
            score: format!("{:.2}", h.score),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::single(3)).with(Alignment::right()))
        .with(Modify::new(Columns::single(5)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}

pub(crate) fn print_log_table(entries: &[LogEntry]) {
    #[derive(Tabled)]
    struct LogRow {
        #[tabled(rename = "ID")]
        id: String,
        #[tabled(rename = "Date")]
        date: String,
        #[tabled(rename = "Label")]
        label: String,
        #[tabled(rename = "Kcal")]
        calories: i64,
        #[tabled(rename = "Range")]
        range: String,
        #[tabled(rename = "Conf")]
        confidence: String,
        #[tabled(rename = "Note")]
        note: String,
    }

    let rows: Vec<LogRow> = entries
        .iter()
        .map(|e| LogRow {
            id: e.id.map_or_else(|| "-".to_string(), |id| id.to_string()),
            date: e.date.clone(),
            label: truncate(&e.label, 30),
            calories: e.calories,
            range: format_range(e.range_low, e.range_high),
            confidence: e.confidence.to_string(),
            note: truncate(&e.note, 30),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::single(3)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}

pub(crate) fn json_error(message: &str) -> String {
    #[derive(Serialize)]
    struct CliError<'a> {
        error: &'a str,
    }
    serde_json::to_string(&CliError { error: message })
        .unwrap_or_else(|_| format!("{{\"error\":\"{message}\"}}"))
}

pub(crate) fn not_found_message(what: &str, id: i64, json: bool) -> String {
    let message = format!("{what} {id} not found");
    if json { json_error(&message) } else { message }
}

/// Reports an unknown id (JSON on stdout, text on stderr) and exits 2.
pub(crate) fn not_found(what: &str, id: i64, json: bool) -> ! {
    let message = not_found_message(what, id, json);
    if json {
        println!("{message}");
    } else {
        eprintln!("{message}");
    }
    process::exit(2);
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let end = s.char_indices().nth(max - 3).map_or(s.len(), |(i, _)| i);
        format!("{}...", &s[..end])
    }
}
