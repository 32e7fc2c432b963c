use anyhow::{Context, Result};
use serde_json::json;

use kcal_core::estimate::EstimateResult;
use kcal_core::service::KcalService;

use super::helpers::{date_key, format_range};
use crate::estimator::EstimatorClient;

fn print_estimate(estimate: &EstimateResult) {
    let label = if estimate.label.is_empty() {
        "(unlabelled)"
    } else {
        estimate.label.as_str()
    };
    println!("{label}: ~{:.0} kcal", estimate.estimated_calories);
    let range = format_range(
        estimate.range_low.map(|v| v as i64),
        estimate.range_high.map(|v| v as i64),
    );
    if range != "-" {
        println!("  range: {range} kcal");
    }
    if !estimate.confidence.is_empty() {
        println!("  confidence: {}", estimate.confidence);
    }
    for item in &estimate.breakdown {
        println!("  - {} ({:.0} kcal)", item.item, item.calories);
    }
    if !estimate.notes.is_empty() {
        println!("  notes: {}", estimate.notes);
    }
}

#[allow(clippy::too_many_arguments)]
pub(crate) async fn cmd_estimate(
    svc: &KcalService,
    estimator_url: &str,
    description: &str,
    date: Option<String>,
    calories: Option<i64>,
    candidates: usize,
    dry_run: bool,
    json: bool,
) -> Result<()> {
    if description.trim().is_empty() {
        anyhow::bail!("Describe the meal to estimate");
    }
    let client = EstimatorClient::new(estimator_url)?;

    if dry_run {
        let request = svc.prepare_estimate(description, candidates)?;
        let estimate = client.estimate_async(&request).await?;
        if json {
            let out = json!({ "request": request, "estimate": estimate });
            println!("{}", serde_json::to_string_pretty(&out)?);
        } else {
            print_estimate(&estimate);
            println!("(dry run, nothing logged)");
        }
        return Ok(());
    }

    let date = date_key(date)?;
    let logged = svc
        .estimate_and_log(&client, description, &date, calories, candidates)
        .context("Estimate failed, nothing was logged")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&logged)?);
    } else {
        print_estimate(&logged.estimate);
        let entry = &logged.entry;
        let id = entry.id.unwrap_or_default();
        println!(
            "Logged {} on {}: {} kcal (id: {id})",
            entry.label, entry.date, entry.calories
        );
    }

    Ok(())
}
