use anyhow::{Context, Result, bail};
use serde_json::json;
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::Path;

use kcal_core::backup::{ImportOptions, Snapshot};
use kcal_core::db::Database;

pub(crate) fn cmd_export(db: &Database, out: Option<&Path>, json: bool) -> Result<()> {
    let snapshot = db.export_snapshot()?;
    let text = snapshot.to_json_pretty()?;

    match out {
        None => println!("{text}"),
        Some(path) => {
            let mut file = File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            file.write_all(text.as_bytes())?;
            file.write_all(b"\n")?;
            let foods = snapshot.foods.len();
            let logs = snapshot.logs.len();
            if json {
                println!(
                    "{}",
                    json!({ "path": path.display().to_string(), "foods": foods, "logs": logs })
                );
            } else {
                println!(
                    "Exported {foods} foods and {logs} log entries to {}",
                    path.display()
                );
            }
        }
    }

    Ok(())
}

pub(crate) fn cmd_import(db: &Database, path: &Path, replace: bool, json: bool) -> Result<()> {
    let file =
        File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let value = Snapshot::read_value(BufReader::new(file))
        .with_context(|| format!("{} is not valid JSON", path.display()))?;

    let summary = db
        .import_snapshot(&value, ImportOptions { wipe_first: replace })
        .context("Import failed")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        let mode = if summary.wiped { "replaced store with" } else { "merged" };
        println!(
            "Import {mode} {} foods and {} log entries",
            summary.foods_imported, summary.logs_imported
        );
    }

    Ok(())
}

pub(crate) fn cmd_wipe(db: &Database, yes: bool, json: bool) -> Result<()> {
    if !yes {
        bail!("Refusing to delete every food and log entry without --yes");
    }
    db.wipe_all()?;
    if json {
        println!("{}", json!({ "wiped": true }));
    } else {
        println!("Deleted all foods and log entries");
    }
    Ok(())
}
