//! threadwalk main entry point
//!
//! This is the command-line interface for the threadwalk forum archiver.

use anyhow::{bail, Context};
use clap::Parser;
use std::path::{Path, PathBuf};
use threadwalk::config::{
    load_recipe_book, parse_limit, save_recipe_book, validate_recipe, DEFAULT_BATCH_SIZE,
    DEFAULT_SPLIT_LIMIT,
};
use threadwalk::crawler::{job_output_dir, run_job};
use threadwalk::output::{load_statistics, print_statistics};
use threadwalk::storage::{SqliteStorage, PROGRESS_DB_FILE};
use threadwalk::{ConfigError, JobOptions, Recipe, RecipeBook};
use tracing_subscriber::EnvFilter;

/// threadwalk: a resumable forum thread archiver
///
/// threadwalk discovers the threads linked from a forum index page and
/// archives them page by page into navigable HTML part files. Each round
/// advances every thread by at most one batch of pages, and progress is
/// saved after every page so an interrupted job picks up where it stopped.
#[derive(Parser, Debug)]
#[command(name = "threadwalk")]
#[command(version = "1.0.0")]
#[command(about = "A resumable forum thread archiver", long_about = None)]
struct Cli {
    /// Create (or replace) a recipe under this profile name and run it
    #[arg(long, value_name = "NAME", requires_all = ["url", "pattern"], conflicts_with_all = ["resume", "list", "status"])]
    profile: Option<String>,

    /// Root index page listing the threads
    #[arg(long, requires = "profile")]
    url: Option<String>,

    /// Substring identifying thread links on the root page
    #[arg(long, requires = "profile")]
    pattern: Option<String>,

    /// Pages per thread per round (0 = unlimited)
    #[arg(long, value_name = "N", requires = "profile")]
    batch_size: Option<String>,

    /// Pages per part file (0 = one file per round)
    #[arg(long, value_name = "N", requires = "profile")]
    split_limit: Option<String>,

    /// Resume the most recently used recipe, or the one named
    #[arg(long, value_name = "NAME", num_args = 0..=1, default_missing_value = "", conflicts_with_all = ["list", "status"])]
    resume: Option<String>,

    /// Keep running rounds until every thread is archived
    #[arg(long = "loop")]
    loop_mode: bool,

    /// Rounds in a row a page may return 404 before its thread is stalled
    /// (0 = never stall)
    #[arg(long, value_name = "N", default_value_t = 3)]
    max_missing_strikes: u32,

    /// Put stalled threads back into rotation before the first round
    #[arg(long)]
    retry_stalled: bool,

    /// List saved recipes and exit
    #[arg(long, conflicts_with = "status")]
    list: bool,

    /// Show progress of the most recently used job, or the one named, and exit
    #[arg(long, value_name = "NAME", num_args = 0..=1, default_missing_value = "")]
    status: Option<String>,

    /// Path to the TOML recipe book
    #[arg(long, value_name = "PATH", default_value = "threadwalk_recipes.toml")]
    recipes: PathBuf,

    /// Directory job output directories are created in
    #[arg(long, value_name = "DIR", default_value = ".")]
    output_root: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let mut book = load_recipe_book(&cli.recipes)
        .with_context(|| format!("Failed to load recipe book {}", cli.recipes.display()))?;

    if cli.list {
        handle_list(&book);
    } else if let Some(name) = cli.status.as_deref() {
        handle_status(&book, name, &cli.output_root)?;
    } else if let Some(profile) = cli.profile.clone() {
        let recipe = new_recipe(&cli, profile)?;
        handle_run(&mut book, recipe, &cli).await?;
    } else if let Some(name) = cli.resume.as_deref() {
        let recipe = select_recipe(&book, name)?.clone();
        handle_run(&mut book, recipe, &cli).await?;
    } else {
        bail!("Nothing to do: pass --profile, --resume, --list or --status (see --help)");
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("threadwalk=info,warn"),
            1 => EnvFilter::new("threadwalk=debug,info"),
            2 => EnvFilter::new("threadwalk=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Builds a recipe from the command line, falling back to the default
/// limits for malformed values
fn new_recipe(cli: &Cli, profile: String) -> anyhow::Result<Recipe> {
    let batch_size = cli
        .batch_size
        .as_deref()
        .map_or(DEFAULT_BATCH_SIZE, |raw| {
            parse_limit(raw, DEFAULT_BATCH_SIZE, "batch-size")
        });
    let split_limit = cli
        .split_limit
        .as_deref()
        .map_or(DEFAULT_SPLIT_LIMIT, |raw| {
            parse_limit(raw, DEFAULT_SPLIT_LIMIT, "split-limit")
        });

    let recipe = Recipe::new(
        profile,
        cli.url.clone().unwrap_or_default(),
        cli.pattern.clone().unwrap_or_default(),
        batch_size,
        split_limit,
    );
    validate_recipe(&recipe)?;

    Ok(recipe)
}

/// Picks the named recipe, or the most recently used one for an empty name
fn select_recipe<'a>(book: &'a RecipeBook, name: &str) -> Result<&'a Recipe, ConfigError> {
    if name.is_empty() {
        book.latest().ok_or(ConfigError::NoLatestRecipe)
    } else {
        book.get(name)
            .ok_or_else(|| ConfigError::UnknownRecipe(name.to_string()))
    }
}

/// Handles --list: prints the saved recipes
fn handle_list(book: &RecipeBook) {
    if book.recipes.is_empty() {
        println!("No saved recipes.");
        return;
    }

    println!("=== Saved Recipes ===\n");
    for recipe in &book.recipes {
        let marker = if book.latest.as_deref() == Some(recipe.name.as_str()) {
            "*"
        } else {
            " "
        };
        println!(
            "{} {}  {} (pattern '{}', batch {}, split {})",
            marker,
            recipe.name,
            recipe.root_url,
            recipe.pattern,
            recipe.batch_size,
            recipe.split_limit
        );
    }
}

/// Handles --status: shows progress statistics of a job
fn handle_status(book: &RecipeBook, name: &str, output_root: &Path) -> anyhow::Result<()> {
    let recipe = select_recipe(book, name)?;
    let output_dir = job_output_dir(output_root, &recipe.name);
    let db_path = output_dir.join(PROGRESS_DB_FILE);

    if !db_path.exists() {
        println!("Job '{}' has not been started yet.", recipe.name);
        return Ok(());
    }

    println!("Job: {}", recipe.name);
    println!("Directory: {}\n", output_dir.display());

    let storage = SqliteStorage::new(&db_path)
        .with_context(|| format!("Failed to open {}", db_path.display()))?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main archiving run
async fn handle_run(book: &mut RecipeBook, recipe: Recipe, cli: &Cli) -> anyhow::Result<()> {
    book.upsert(recipe.clone());
    save_recipe_book(book, &cli.recipes)
        .with_context(|| format!("Failed to save recipe book {}", cli.recipes.display()))?;

    let options = JobOptions {
        loop_mode: cli.loop_mode,
        max_missing_strikes: cli.max_missing_strikes,
        retry_stalled: cli.retry_stalled,
        ..JobOptions::default()
    };

    tracing::info!(
        "Job '{}': {} pages per thread per round, {} pages per part",
        recipe.name,
        recipe.batch_size,
        recipe.split_limit
    );

    let name = recipe.name.clone();
    let report = run_job(recipe, book.fetch.clone(), options, &cli.output_root)
        .await
        .with_context(|| format!("Job '{}' failed", name))?;

    if report.complete {
        tracing::info!(
            "Job complete after {} rounds: {} done, {} stalled",
            report.rounds,
            report.done,
            report.stalled
        );
    } else {
        tracing::info!(
            "Stopped after {} rounds: {} of {} threads pending; run with --resume to continue",
            report.rounds,
            report.pending,
            report.threads
        );
    }

    Ok(())
}
