//! Crawler module for walking forum threads
//!
//! This module contains the core archiving logic, including:
//! - HTTP fetching with politeness delays and layered retries
//! - Post extraction and archive link augmentation
//! - Next-page resolution and thread discovery
//! - Round-robin job coordination

mod backoff;
mod coordinator;
mod discovery;
mod document;
mod extractor;
mod fetcher;
mod pagination;

pub use backoff::{politeness_delay, RetrySchedule};
pub use coordinator::{Coordinator, JobReport, ThreadOutcome, META_RECIPE_HASH, META_RECIPE_NAME};
pub use discovery::discover_threads;
pub use document::{resolve_href, visible_text, Document};
pub use extractor::{
    extract_posts, find_post_blocks, infer_author, is_noise, render_block, BlockStrategy,
    ARCHIVE_HOST, UNKNOWN_AUTHOR,
};
pub use fetcher::{build_http_client, is_certificate_error, FetchError, FetchResult, Fetcher};
pub use pagination::{next_page, resolve_next_page, NavigationRule};

use crate::config::{FetchPolicy, JobOptions, Recipe};
use crate::output::{output_dir_name, HtmlWriter};
use crate::storage::open_storage;
use crate::WalkError;
use std::path::{Path, PathBuf};

/// Output directory of a job below `output_root`
pub fn job_output_dir(output_root: &Path, recipe_name: &str) -> PathBuf {
    output_root.join(output_dir_name(recipe_name))
}

/// Runs a complete archiving job
///
/// This is the main entry point for a job. It will:
/// 1. Create the job's output directory
/// 2. Open the job's progress database
/// 3. Build the HTTP fetcher
/// 4. Discover threads and run rounds until done (or once)
///
/// # Arguments
///
/// * `recipe` - What to archive
/// * `policy` - Fetch timing and retry settings
/// * `options` - Round scheduling
/// * `output_root` - Directory the job directory is created in
///
/// # Returns
///
/// * `Ok(JobReport)` - Rounds ran
/// * `Err(WalkError)` - The job could not start or progress could not be saved
pub async fn run_job(
    recipe: Recipe,
    policy: FetchPolicy,
    options: JobOptions,
    output_root: &Path,
) -> Result<JobReport, WalkError> {
    let output_dir = job_output_dir(output_root, &recipe.name);
    std::fs::create_dir_all(&output_dir)?;

    let storage = open_storage(&output_dir)?;
    let fetcher = Fetcher::new(policy)?;

    let mut coordinator = Coordinator::new(
        recipe,
        options,
        fetcher,
        Box::new(storage),
        Box::new(HtmlWriter::new()),
        output_dir,
    );

    coordinator.run().await
}
