//! Job coordinator - round-robin thread archiving
//!
//! This module contains the main job loop, including:
//! - Discovering threads on the root page
//! - Loading or creating the stored progress of every thread
//! - Advancing each thread by at most one batch of pages per round
//! - Splitting buffered posts into part files
//! - Persisting the cursor after every page and every flush

use crate::config::{compute_recipe_hash, JobOptions, Recipe};
use crate::crawler::discovery::discover_threads;
use crate::crawler::extractor::extract_posts;
use crate::crawler::fetcher::{FetchResult, Fetcher};
use crate::crawler::pagination::next_page;
use crate::output::{part_filename, DocumentWriter, PartDocument};
use crate::state::{PostRecord, ThreadSeed, ThreadState, ThreadStatus};
use crate::storage::Storage;
use crate::WalkError;
use std::path::PathBuf;
use url::Url;

/// Job metadata key holding the recipe name
pub const META_RECIPE_NAME: &str = "recipe_name";

/// Job metadata key holding the recipe fingerprint
pub const META_RECIPE_HASH: &str = "recipe_hash";

/// How one thread's turn in a round ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadOutcome {
    /// Already done or stalled; not visited
    Skipped,

    /// Batch limit reached with pages left
    Paused,

    /// Fetch failed or returned 404; retried next round
    Deferred,

    /// 404 on the cursor too many rounds in a row
    Stalled,

    /// No next page; the thread is archived
    Completed,
}

/// Summary of a finished job
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobReport {
    /// Rounds run in this invocation
    pub rounds: u32,

    /// Threads discovered on the root page
    pub threads: usize,

    pub done: usize,
    pub stalled: usize,
    pub pending: usize,

    /// True if no thread is left pending
    pub complete: bool,
}

/// Pages fetched and posts buffered for one thread during one round
struct PartBuffer {
    posts: Vec<PostRecord>,
    pages_since_split: u32,
    start_url: Url,
}

impl PartBuffer {
    fn new(start_url: Url) -> Self {
        Self {
            posts: Vec::new(),
            pages_since_split: 0,
            start_url,
        }
    }
}

/// Main job coordinator structure
pub struct Coordinator {
    recipe: Recipe,
    options: JobOptions,
    fetcher: Fetcher,
    storage: Box<dyn Storage>,
    writer: Box<dyn DocumentWriter>,
    output_dir: PathBuf,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// # Arguments
    ///
    /// * `recipe` - What to archive
    /// * `options` - Single pass or loop, cooldown, stall limit
    /// * `fetcher` - HTTP fetcher carrying the fetch policy
    /// * `storage` - Per-job progress store
    /// * `writer` - Part file writer
    /// * `output_dir` - Directory part files are written to
    pub fn new(
        recipe: Recipe,
        options: JobOptions,
        fetcher: Fetcher,
        storage: Box<dyn Storage>,
        writer: Box<dyn DocumentWriter>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            recipe,
            options,
            fetcher,
            storage,
            writer,
            output_dir: output_dir.into(),
        }
    }

    pub fn storage(&self) -> &dyn Storage {
        self.storage.as_ref()
    }

    /// Runs the whole job: discovery, then rounds until done or, in single
    /// pass mode, after the first round
    ///
    /// # Returns
    ///
    /// * `Ok(JobReport)` - Rounds ran; see `complete` for the outcome
    /// * `Err(WalkError::RootUnavailable)` - The root page could not be fetched
    /// * `Err(WalkError::NoThreads)` - Nothing on the root page matched
    /// * `Err(WalkError)` - Progress could not be persisted
    pub async fn run(&mut self) -> Result<JobReport, WalkError> {
        tracing::info!("Starting job '{}' in {}", self.recipe.name, self.output_dir.display());
        self.record_recipe()?;

        let seeds = self.discover().await?;
        tracing::info!("Found {} threads", seeds.len());

        self.run_rounds(&seeds).await
    }

    /// Fetches the root page and collects thread seeds
    pub async fn discover(&self) -> Result<Vec<ThreadSeed>, WalkError> {
        let root_url = Url::parse(&self.recipe.root_url)?;
        tracing::info!("Scanning root page {}", root_url);

        let document = match self.fetcher.fetch(&root_url).await {
            FetchResult::Page(document) => document,
            FetchResult::NotFound => {
                tracing::error!("Root page {} returned 404", root_url);
                return Err(WalkError::RootUnavailable {
                    url: root_url.to_string(),
                });
            }
            FetchResult::Failure(error) => {
                tracing::error!("Root page unavailable: {}", error);
                return Err(WalkError::RootUnavailable {
                    url: root_url.to_string(),
                });
            }
        };

        let seeds = discover_threads(&document, &self.recipe.pattern);
        if seeds.is_empty() {
            return Err(WalkError::NoThreads {
                url: root_url.to_string(),
                pattern: self.recipe.pattern.clone(),
            });
        }

        Ok(seeds)
    }

    /// Runs rounds over `seeds` until every thread is settled, or once in
    /// single pass mode
    pub async fn run_rounds(&mut self, seeds: &[ThreadSeed]) -> Result<JobReport, WalkError> {
        if self.options.retry_stalled {
            let revived = self.unstall_threads(seeds)?;
            tracing::info!("{} stalled threads back in rotation", revived);
        }

        let mut round = 0;

        loop {
            round += 1;
            tracing::info!("=== Round {} ===", round);

            let statuses = self.run_round(seeds).await?;
            let report = Self::report(round, &statuses);

            if report.complete {
                tracing::info!("All {} threads archived", report.threads);
                return Ok(report);
            }

            if !self.options.loop_mode {
                tracing::info!(
                    "Round {} finished with {} threads pending",
                    round,
                    report.pending
                );
                return Ok(report);
            }

            tracing::info!(
                "{} threads pending, next round in {:?}",
                report.pending,
                self.options.cooldown
            );
            tokio::time::sleep(self.options.cooldown).await;
        }
    }

    /// One pass over all seeds in discovery order
    ///
    /// # Returns
    ///
    /// The status of every thread after the pass, in seed order
    pub async fn run_round(&mut self, seeds: &[ThreadSeed]) -> Result<Vec<ThreadStatus>, WalkError> {
        let mut statuses = Vec::with_capacity(seeds.len());

        for (index, seed) in seeds.iter().enumerate() {
            let mut state = self.load_state(seed)?;

            if !state.is_settled() {
                tracing::info!("[{}/{}] {}", index + 1, seeds.len(), truncate(&seed.title, 40));
            }

            let outcome = self.advance_thread(seed, &mut state).await?;
            tracing::debug!("{} -> {:?}", seed.url, outcome);

            statuses.push(state.status());
        }

        Ok(statuses)
    }

    /// Gives one thread its turn in the current round
    ///
    /// The state is persisted after every page advance and every flush.
    pub async fn advance_thread(
        &mut self,
        seed: &ThreadSeed,
        state: &mut ThreadState,
    ) -> Result<ThreadOutcome, WalkError> {
        let Some(start_url) = state.current_url.clone() else {
            return Ok(ThreadOutcome::Skipped);
        };
        if state.stalled {
            return Ok(ThreadOutcome::Skipped);
        }

        let key = seed.url.as_str();
        let mut buffer = PartBuffer::new(start_url);
        let mut batch_count = 0;

        loop {
            if self.recipe.batch_size > 0 && batch_count >= self.recipe.batch_size {
                tracing::info!("Batch limit reached, pausing thread");
                self.flush(state, &mut buffer, true);
                self.storage.save_thread(key, state)?;
                return Ok(ThreadOutcome::Paused);
            }

            let Some(current_url) = state.current_url.clone() else {
                return Ok(ThreadOutcome::Completed);
            };

            let document = match self.fetcher.fetch(&current_url).await {
                FetchResult::Page(document) => document,
                FetchResult::NotFound => {
                    tracing::warn!("404 for {}, deferring thread", current_url);
                    self.flush(state, &mut buffer, true);
                    let stalled = state.record_missing(self.options.max_missing_strikes);
                    self.storage.save_thread(key, state)?;

                    if stalled {
                        tracing::warn!(
                            "Thread '{}' stalled after {} missing rounds",
                            state.title,
                            state.missing_strikes
                        );
                        return Ok(ThreadOutcome::Stalled);
                    }
                    return Ok(ThreadOutcome::Deferred);
                }
                FetchResult::Failure(error) => {
                    tracing::warn!("Giving up on {} this round: {}", current_url, error);
                    self.flush(state, &mut buffer, true);
                    self.storage.save_thread(key, state)?;
                    return Ok(ThreadOutcome::Deferred);
                }
            };

            let page_number = state.total_pages + 1;
            let posts = extract_posts(&document, page_number);
            tracing::debug!("Page {} ({} posts)", page_number, posts.len());
            buffer.posts.extend(posts);

            state.total_pages = page_number;
            state.clear_missing();
            buffer.pages_since_split += 1;
            batch_count += 1;

            let next = next_page(&document, &current_url, state.total_pages);

            if self.recipe.split_limit > 0 && buffer.pages_since_split >= self.recipe.split_limit {
                self.flush(state, &mut buffer, next.is_some());
                buffer.pages_since_split = 0;
                if let Some(next_url) = &next {
                    buffer.start_url = next_url.clone();
                }
            }

            match next {
                Some(next_url) => {
                    state.advance_to(next_url);
                    self.storage.save_thread(key, state)?;
                }
                None => {
                    self.flush(state, &mut buffer, false);
                    state.mark_done();
                    self.storage.save_thread(key, state)?;
                    tracing::info!("Thread complete: {} pages", state.total_pages);
                    return Ok(ThreadOutcome::Completed);
                }
            }
        }
    }

    /// Writes the buffered posts as the next part file
    ///
    /// An empty buffer writes nothing. `file_part` advances only when the
    /// write succeeded; a failed write is logged and the posts are dropped.
    fn flush(&self, state: &mut ThreadState, buffer: &mut PartBuffer, has_next: bool) {
        if buffer.posts.is_empty() {
            return;
        }

        let filename = part_filename(&state.base_filename, state.file_part);
        let start_url = buffer.start_url.to_string();
        let part = PartDocument {
            filename: &filename,
            posts: &buffer.posts,
            output_dir: &self.output_dir,
            start_url: &start_url,
            part: state.file_part,
            display_name: &state.title,
            base_filename: &state.base_filename,
            has_next,
        };

        match self.writer.write_part(&part) {
            Ok(path) => {
                tracing::info!(
                    "[SAVE] {} posts to {}",
                    buffer.posts.len(),
                    path.display()
                );
                state.file_part += 1;
            }
            Err(e) => {
                tracing::error!("Failed to write part {} of '{}': {}", state.file_part, state.title, e);
            }
        }

        buffer.posts.clear();
    }

    /// Stored state for a seed, or a fresh one if the thread is new
    fn load_state(&self, seed: &ThreadSeed) -> Result<ThreadState, WalkError> {
        Ok(self
            .storage
            .get_thread(seed.url.as_str())?
            .unwrap_or_else(|| ThreadState::new(seed)))
    }

    /// Returns stalled threads to rotation before the first round
    fn unstall_threads(&mut self, seeds: &[ThreadSeed]) -> Result<usize, WalkError> {
        let mut revived = 0;

        for seed in seeds {
            let mut state = self.load_state(seed)?;
            if state.unstall() {
                tracing::info!("Retrying stalled thread {}", seed.url);
                self.storage.save_thread(seed.url.as_str(), &state)?;
                revived += 1;
            }
        }

        Ok(revived)
    }

    /// Stores the recipe name and fingerprint, warning if the job was
    /// started with a different recipe
    fn record_recipe(&mut self) -> Result<(), WalkError> {
        let hash = compute_recipe_hash(&self.recipe);

        if let Some(previous) = self.storage.get_meta(META_RECIPE_HASH)? {
            if previous != hash {
                tracing::warn!(
                    "Recipe '{}' changed since this job started; stored progress is kept",
                    self.recipe.name
                );
            }
        }

        self.storage.set_meta(META_RECIPE_NAME, &self.recipe.name)?;
        self.storage.set_meta(META_RECIPE_HASH, &hash)?;
        Ok(())
    }

    fn report(round: u32, statuses: &[ThreadStatus]) -> JobReport {
        let count = |status: ThreadStatus| statuses.iter().filter(|s| **s == status).count();
        let pending = count(ThreadStatus::Pending);

        JobReport {
            rounds: round,
            threads: statuses.len(),
            done: count(ThreadStatus::Done),
            stalled: count(ThreadStatus::Stalled),
            pending,
            complete: pending == 0,
        }
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FetchPolicy;
    use crate::output::{OutputError, OutputResult};
    use crate::storage::SqliteStorage;

    struct FailingWriter;

    impl DocumentWriter for FailingWriter {
        fn write_part(&self, part: &PartDocument<'_>) -> OutputResult<PathBuf> {
            Err(OutputError::Write {
                path: part.output_dir.join(part.filename),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
            })
        }
    }

    fn coordinator(writer: Box<dyn DocumentWriter>) -> Coordinator {
        Coordinator::new(
            Recipe::new("Synths", "https://forum.example.com/", "thread-", 2, 5),
            JobOptions::default(),
            Fetcher::new(FetchPolicy::immediate()).unwrap(),
            Box::new(SqliteStorage::open_in_memory().unwrap()),
            writer,
            PathBuf::from("."),
        )
    }

    fn state_with_posts() -> (ThreadState, PartBuffer) {
        let url = Url::parse("https://forum.example.com/thread-1").unwrap();
        let state = ThreadState::new(&ThreadSeed::new("Moog repair log", url.clone()));
        let mut buffer = PartBuffer::new(url);
        buffer.posts.push(PostRecord {
            author: "alice".to_string(),
            content: "<div class=\"post\">Hello there everyone</div>".to_string(),
            page_number: 1,
        });
        (state, buffer)
    }

    #[test]
    fn test_failed_write_keeps_part_number() {
        let coordinator = coordinator(Box::new(FailingWriter));
        let (mut state, mut buffer) = state_with_posts();

        coordinator.flush(&mut state, &mut buffer, true);
        assert_eq!(state.file_part, 1);
        assert!(buffer.posts.is_empty());
    }

    #[test]
    fn test_empty_flush_writes_nothing() {
        let coordinator = coordinator(Box::new(FailingWriter));
        let (mut state, mut buffer) = state_with_posts();
        buffer.posts.clear();

        coordinator.flush(&mut state, &mut buffer, false);
        assert_eq!(state.file_part, 1);
    }

    #[test]
    fn test_report_counts() {
        let report = Coordinator::report(
            2,
            &[ThreadStatus::Done, ThreadStatus::Stalled, ThreadStatus::Done],
        );
        assert_eq!(report.rounds, 2);
        assert_eq!(report.done, 2);
        assert_eq!(report.stalled, 1);
        assert!(report.complete);

        let report = Coordinator::report(1, &[ThreadStatus::Pending]);
        assert!(!report.complete);
    }

    #[test]
    fn test_recipe_fingerprint_recorded() {
        let mut coordinator = coordinator(Box::new(FailingWriter));
        coordinator.record_recipe().unwrap();

        assert_eq!(
            coordinator.storage().get_meta(META_RECIPE_NAME).unwrap().as_deref(),
            Some("Synths")
        );
        assert_eq!(
            coordinator.storage().get_meta(META_RECIPE_HASH).unwrap(),
            Some(compute_recipe_hash(&coordinator.recipe))
        );
    }

    #[test]
    fn test_truncate_counts_chars() {
        assert_eq!(truncate("Ünïcode thread title", 3), "Ünï");
        assert_eq!(truncate("short", 40), "short");
    }
}
