//! Statistics generation from a job's progress database
//!
//! This module provides functionality for summarizing and displaying
//! per-thread progress stored by the orchestrator.

use crate::state::{ThreadState, ThreadStatus};
use crate::storage::{Storage, StorageResult};
use std::collections::HashMap;

/// Progress of one stored thread
#[derive(Debug, Clone)]
pub struct ThreadSummary {
    pub title: String,
    pub status: ThreadStatus,
    pub total_pages: u32,

    /// Part files written so far
    pub parts_written: u32,
}

impl From<&ThreadState> for ThreadSummary {
    fn from(state: &ThreadState) -> Self {
        Self {
            title: state.title.clone(),
            status: state.status(),
            total_pages: state.total_pages,
            parts_written: state.file_part.saturating_sub(1),
        }
    }
}

/// Job statistics summary
#[derive(Debug, Clone, Default)]
pub struct JobStatistics {
    /// Count of threads by status
    pub threads_by_status: HashMap<ThreadStatus, u64>,

    /// Pages fetched across all threads
    pub total_pages: u64,

    /// Part files written across all threads
    pub parts_written: u64,

    /// Per-thread rows, in the order threads were first stored
    pub threads: Vec<ThreadSummary>,
}

impl JobStatistics {
    pub fn count(&self, status: ThreadStatus) -> u64 {
        self.threads_by_status.get(&status).copied().unwrap_or(0)
    }

    pub fn thread_count(&self) -> u64 {
        self.threads.len() as u64
    }

    /// Returns true if every stored thread is done or stalled
    pub fn is_settled(&self) -> bool {
        self.count(ThreadStatus::Pending) == 0
    }
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
///
/// # Returns
///
/// * `Ok(JobStatistics)` - Successfully loaded statistics
/// * `Err(StorageError)` - Failed to query statistics
pub fn load_statistics(storage: &dyn Storage) -> StorageResult<JobStatistics> {
    let records = storage.load_threads()?;
    let mut stats = JobStatistics::default();

    for url in storage.thread_urls()? {
        let Some(state) = records.get(&url) else {
            continue;
        };

        let summary = ThreadSummary::from(state);
        *stats.threads_by_status.entry(summary.status).or_insert(0) += 1;
        stats.total_pages += u64::from(summary.total_pages);
        stats.parts_written += u64::from(summary.parts_written);
        stats.threads.push(summary);
    }

    Ok(stats)
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &JobStatistics) {
    println!("=== Job Progress ===\n");

    println!("Overview:");
    println!("  Threads tracked: {}", stats.thread_count());
    println!("  Pages fetched: {}", stats.total_pages);
    println!("  Part files written: {}", stats.parts_written);
    println!();

    println!("Threads by Status:");
    for status in [ThreadStatus::Done, ThreadStatus::Pending, ThreadStatus::Stalled] {
        let count = stats.count(status);
        let percentage = if stats.thread_count() > 0 {
            (count as f64 / stats.thread_count() as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", status, count, percentage);
    }
    println!();

    if !stats.threads.is_empty() {
        println!("Threads:");
        for thread in &stats.threads {
            println!(
                "  [{:<7}] {:>5} pages, {:>3} parts  {}",
                thread.status.as_str(),
                thread.total_pages,
                thread.parts_written,
                thread.title
            );
        }
        println!();
    }

    if stats.is_settled() {
        println!("Job complete: nothing left to fetch.");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ThreadSeed;
    use crate::storage::SqliteStorage;
    use url::Url;

    fn state(n: u32) -> (String, ThreadState) {
        let seed = ThreadSeed::new(
            format!("Thread {}", n),
            Url::parse(&format!("https://forum.example.com/thread-{}", n)).unwrap(),
        );
        (seed.url.to_string(), ThreadState::new(&seed))
    }

    #[test]
    fn test_empty_statistics() {
        let storage = SqliteStorage::open_in_memory().unwrap();
        let stats = load_statistics(&storage).unwrap();
        assert_eq!(stats.thread_count(), 0);
        assert!(stats.is_settled());
    }

    #[test]
    fn test_statistics_by_status() {
        let mut storage = SqliteStorage::open_in_memory().unwrap();

        let (url1, mut done) = state(1);
        done.total_pages = 12;
        done.file_part = 4;
        done.mark_done();

        let (url2, mut pending) = state(2);
        pending.total_pages = 3;
        pending.file_part = 2;

        let (url3, mut stalled) = state(3);
        stalled.record_missing(1);

        storage.save_thread(&url1, &done).unwrap();
        storage.save_thread(&url2, &pending).unwrap();
        storage.save_thread(&url3, &stalled).unwrap();

        let stats = load_statistics(&storage).unwrap();
        assert_eq!(stats.thread_count(), 3);
        assert_eq!(stats.count(ThreadStatus::Done), 1);
        assert_eq!(stats.count(ThreadStatus::Pending), 1);
        assert_eq!(stats.count(ThreadStatus::Stalled), 1);
        assert_eq!(stats.total_pages, 15);
        assert_eq!(stats.parts_written, 4);
        assert!(!stats.is_settled());
        assert_eq!(stats.threads[0].title, "Thread 1");
    }
}
