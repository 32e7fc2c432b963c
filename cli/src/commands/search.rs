use anyhow::Result;
use std::process;

use kcal_core::db::Database;

use super::helpers::print_search_table;

pub(crate) fn cmd_search(db: &Database, query: &str, limit: usize, json: bool) -> Result<()> {
    let hits = db.rank_foods(query, limit)?;

    if hits.is_empty() {
        if json {
            println!("[]");
        } else {
            eprintln!("No foods match '{query}'");
        }
        process::exit(2);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&hits)?);
    } else {
        print_search_table(&hits);
    }

    Ok(())
}
