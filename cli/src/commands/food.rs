use anyhow::{Result, bail};
use serde_json::{Value, json};
use std::process;

use kcal_core::db::Database;
use kcal_core::models::Food;
use kcal_core::normalize::parse_tags;

use super::helpers::{not_found, print_food_table};

/// Optional field changes for `food edit`. `None` leaves the field as stored.
#[derive(Default)]
pub(crate) struct FoodEdits {
    pub name: Option<String>,
    pub calories: Option<i64>,
    pub portion: Option<String>,
    pub tags: Option<String>,
    pub notes: Option<String>,
}

impl FoodEdits {
    fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.calories.is_none()
            && self.portion.is_none()
            && self.tags.is_none()
            && self.notes.is_none()
    }

    fn apply(self, food: &mut Food) {
        if let Some(name) = self.name {
            food.name = name;
        }
        if let Some(calories) = self.calories {
            food.calories = calories;
        }
        if let Some(portion) = self.portion {
            food.portion = portion;
        }
        if let Some(tags) = self.tags {
            food.tags = parse_tags(Some(&Value::String(tags)));
        }
        if let Some(notes) = self.notes {
            food.notes = notes;
        }
    }
}

pub(crate) fn cmd_food_add(
    db: &Database,
    name: &str,
    calories: i64,
    portion: Option<String>,
    tags: Option<String>,
    notes: Option<String>,
    json: bool,
) -> Result<()> {
    if name.trim().is_empty() {
        bail!("Food name must not be empty");
    }
    let food = db.upsert_food(&json!({
        "name": name,
        "calories": calories,
        "portion": portion,
        "tags": tags,
        "notes": notes,
    }))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&food)?);
    } else {
        let name = &food.name;
        let id = food.id.unwrap_or_default();
        let cal = food.calories;
        println!("Added food: {name} ({cal} kcal, id: {id})");
    }

    Ok(())
}

pub(crate) fn cmd_food_edit(db: &Database, id: i64, edits: FoodEdits, json: bool) -> Result<()> {
    if edits.is_empty() {
        bail!("Nothing to update. Provide at least one of --name, --calories, --portion, --tags, or --notes");
    }
    let Some(mut food) = db.get_food(id)? else {
        not_found("Food", id, json);
    };
    edits.apply(&mut food);
    let food = db.upsert_food(&food)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&food)?);
    } else {
        let name = &food.name;
        let cal = food.calories;
        println!("Updated food {id}: {name} ({cal} kcal)");
    }

    Ok(())
}

pub(crate) fn cmd_food_show(db: &Database, id: i64, json: bool) -> Result<()> {
    let Some(food) = db.get_food(id)? else {
        not_found("Food", id, json);
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&food)?);
    } else {
        print_food_table(std::slice::from_ref(&food));
        if !food.notes.is_empty() {
            println!("Notes: {}", food.notes);
        }
    }

    Ok(())
}

pub(crate) fn cmd_food_list(
    db: &Database,
    search: Option<&str>,
    limit: Option<usize>,
    json: bool,
) -> Result<()> {
    let foods = match search {
        Some(q) => db.search_foods(q, limit.unwrap_or(usize::MAX))?,
        None => {
            let mut all = db.get_all_foods()?;
            if let Some(n) = limit {
                all.truncate(n);
            }
            all
        }
    };

    if foods.is_empty() {
        if json {
            println!("[]");
        } else {
            eprintln!("No foods found");
        }
        process::exit(2);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&foods)?);
    } else {
        print_food_table(&foods);
    }

    Ok(())
}

pub(crate) fn cmd_food_delete(db: &Database, id: i64, json: bool) -> Result<()> {
    if !db.delete_food(id)? {
        not_found("Food", id, json);
    }
    if json {
        println!("{}", json!({ "deleted": id }));
    } else {
        println!("Deleted food {id}");
    }
    Ok(())
}
