mod commands;
mod config;
mod estimator;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;

use crate::commands::{
    FoodEdits, LogArgs, cmd_estimate, cmd_export, cmd_food_add, cmd_food_delete, cmd_food_edit,
    cmd_food_list, cmd_food_show, cmd_import, cmd_log_add, cmd_log_delete, cmd_log_edit,
    cmd_log_show, cmd_search, cmd_wipe,
};
use crate::config::Config;
use kcal_core::estimate::DEFAULT_CANDIDATES;
use kcal_core::service::KcalService;

#[derive(Parser)]
#[command(
    name = "kcal",
    version,
    about = "A local-first food library and calorie log"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the food library
    Food {
        #[command(subcommand)]
        command: FoodCommands,
    },
    /// Rank library foods against a query
    Search {
        /// Search terms (matched against name, tags and notes)
        query: String,
        /// Maximum number of results
        #[arg(short, long, default_value = "10")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Record and review log entries
    Log {
        #[command(subcommand)]
        command: LogCommands,
    },
    /// Estimate a meal's calories via the estimator service and log it
    Estimate {
        /// Free-text meal description
        description: String,
        /// Date to log for (YYYY-MM-DD or today/yesterday/tomorrow, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Log this calorie value instead of the estimate
        #[arg(long)]
        calories: Option<i64>,
        /// Number of library foods sent along as candidates
        #[arg(long, default_value_t = DEFAULT_CANDIDATES)]
        candidates: usize,
        /// Show the estimate without logging it
        #[arg(long)]
        dry_run: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Write a full snapshot of the store
    Export {
        /// Output file (default: stdout)
        #[arg(short, long)]
        out: Option<PathBuf>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Restore a snapshot
    Import {
        /// Snapshot file produced by `kcal export`
        file: PathBuf,
        /// Delete everything first, so the store matches the snapshot exactly
        #[arg(long)]
        replace: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete every food and log entry
    Wipe {
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum FoodCommands {
    /// Add a food to the library
    Add {
        /// Food name
        name: String,
        /// Calories per portion
        #[arg(short, long, default_value = "0")]
        calories: i64,
        /// Portion description (e.g. "1 cup", "12 oz")
        #[arg(short, long)]
        portion: Option<String>,
        /// Comma-separated tags
        #[arg(short, long)]
        tags: Option<String>,
        /// Free-text notes
        #[arg(long)]
        notes: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Change fields of an existing food
    Edit {
        /// Food ID
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(short, long)]
        calories: Option<i64>,
        #[arg(short, long)]
        portion: Option<String>,
        /// Comma-separated tags (replaces existing tags)
        #[arg(short, long)]
        tags: Option<String>,
        #[arg(long)]
        notes: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one food
    Show {
        /// Food ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List foods, most recently updated first
    List {
        /// Only foods matching this query, in relevance order
        #[arg(short, long)]
        search: Option<String>,
        /// Maximum number of foods
        #[arg(short, long)]
        limit: Option<usize>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a food by ID
    Delete {
        /// Food ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum LogCommands {
    /// Log a meal
    Add {
        /// Display label (default: the library food's name, or "Food")
        label: Option<String>,
        /// Calories (default: the library food's calories)
        #[arg(short, long)]
        calories: Option<i64>,
        /// Date to log for (YYYY-MM-DD or today/yesterday/tomorrow, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Lower bound of the uncertainty range
        #[arg(long)]
        low: Option<i64>,
        /// Upper bound of the uncertainty range
        #[arg(long)]
        high: Option<i64>,
        #[arg(long)]
        note: Option<String>,
        /// Confidence: low, medium, high
        #[arg(long)]
        confidence: Option<String>,
        /// Log a library food by ID
        #[arg(long)]
        food_id: Option<i64>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a day's entries and total (defaults to today)
    Show {
        /// Date to show (YYYY-MM-DD or today/yesterday/tomorrow)
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Correct the calories of a logged entry
    Edit {
        /// Entry ID
        id: i64,
        /// New calorie value
        #[arg(short, long)]
        calories: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a log entry by ID
    Delete {
        /// Entry ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    let svc = KcalService::new(&config.db_path)?;
    let db = svc.db();

    match cli.command {
        Commands::Food { command } => match command {
            FoodCommands::Add {
                name,
                calories,
                portion,
                tags,
                notes,
                json,
            } => cmd_food_add(db, &name, calories, portion, tags, notes, json),
            FoodCommands::Edit {
                id,
                name,
                calories,
                portion,
                tags,
                notes,
                json,
            } => {
                let edits = FoodEdits {
                    name,
                    calories,
                    portion,
                    tags,
                    notes,
                };
                cmd_food_edit(db, id, edits, json)
            }
            FoodCommands::Show { id, json } => cmd_food_show(db, id, json),
            FoodCommands::List {
                search,
                limit,
                json,
            } => cmd_food_list(db, search.as_deref(), limit, json),
            FoodCommands::Delete { id, json } => cmd_food_delete(db, id, json),
        },
        Commands::Search { query, limit, json } => cmd_search(db, &query, limit, json),
        Commands::Log { command } => match command {
            LogCommands::Add {
                label,
                calories,
                date,
                low,
                high,
                note,
                confidence,
                food_id,
                json,
            } => {
                let args = LogArgs {
                    label,
                    calories,
                    low,
                    high,
                    note,
                    confidence,
                };
                cmd_log_add(db, args, date, food_id, json)
            }
            LogCommands::Show { date, json } => cmd_log_show(db, date, json),
            LogCommands::Edit { id, calories, json } => cmd_log_edit(db, id, calories, json),
            LogCommands::Delete { id, json } => cmd_log_delete(db, id, json),
        },
        Commands::Estimate {
            description,
            date,
            calories,
            candidates,
            dry_run,
            json,
        } => {
            let url = config.require_estimator_url()?;
            cmd_estimate(
                &svc,
                url,
                &description,
                date,
                calories,
                candidates,
                dry_run,
                json,
            )
            .await
        }
        Commands::Export { out, json } => cmd_export(db, out.as_deref(), json),
        Commands::Import {
            file,
            replace,
            json,
        } => cmd_import(db, &file, replace, json),
        Commands::Wipe { yes, json } => cmd_wipe(db, yes, json),
    }
}
