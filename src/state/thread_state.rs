/// Per-thread progress tracking
///
/// A `ThreadState` is the durable cursor of one thread: where to fetch
/// next, how many pages have been read, and which part file comes next.
use crate::output::clean_filename;
use std::fmt;
use url::Url;

/// A thread found on the index page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadSeed {
    /// Anchor text of the thread link
    pub title: String,

    /// Absolute thread URL without fragment; the thread's identity
    pub url: Url,
}

impl ThreadSeed {
    pub fn new(title: impl Into<String>, url: Url) -> Self {
        Self {
            title: title.into(),
            url,
        }
    }
}

/// Coarse lifecycle of a thread
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThreadStatus {
    /// More pages remain to be fetched
    Pending,

    /// The cursor kept returning 404; skipped until a run clears it with
    /// `JobOptions::retry_stalled`
    Stalled,

    /// No next page was found; all pages are on disk
    Done,
}

impl ThreadStatus {
    /// Returns true if rounds no longer need to visit the thread
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Stalled | Self::Done)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Stalled => "stalled",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for ThreadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Persisted progress of one thread
///
/// Invariant: `done` is true exactly when `current_url` is `None`. The
/// only way to reach that state is [`ThreadState::mark_done`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadState {
    /// Display name of the thread
    pub title: String,

    /// Base output filename, e.g. `Some_thread.html`
    pub base_filename: String,

    /// Next page to fetch; `None` once the thread is complete
    pub current_url: Option<Url>,

    /// Pages fetched so far, across all runs
    pub total_pages: u32,

    /// Number the next part file will get
    pub file_part: u32,

    /// Thread fully archived
    pub done: bool,

    /// Consecutive rounds in which the cursor returned 404
    pub missing_strikes: u32,

    /// Set once `missing_strikes` reached the configured cap
    pub stalled: bool,
}

impl ThreadState {
    /// Fresh state for a thread seen for the first time
    pub fn new(seed: &ThreadSeed) -> Self {
        Self {
            title: seed.title.clone(),
            base_filename: clean_filename(&seed.title),
            current_url: Some(seed.url.clone()),
            total_pages: 0,
            file_part: 1,
            done: false,
            missing_strikes: 0,
            stalled: false,
        }
    }

    pub fn status(&self) -> ThreadStatus {
        if self.done {
            ThreadStatus::Done
        } else if self.stalled {
            ThreadStatus::Stalled
        } else {
            ThreadStatus::Pending
        }
    }

    /// Returns true if rounds no longer need to visit the thread
    pub fn is_settled(&self) -> bool {
        self.status().is_settled()
    }

    /// Moves the cursor to the next page
    pub fn advance_to(&mut self, next: Url) {
        self.current_url = Some(next);
    }

    /// Completes the thread: clears the cursor and sets `done`
    pub fn mark_done(&mut self) {
        self.current_url = None;
        self.done = true;
        self.missing_strikes = 0;
        self.stalled = false;
    }

    /// Records a 404 on the current cursor
    ///
    /// Returns true if this strike stalled the thread. A `limit` of zero
    /// never stalls.
    pub fn record_missing(&mut self, limit: u32) -> bool {
        self.missing_strikes += 1;
        if limit > 0 && self.missing_strikes >= limit && !self.stalled {
            self.stalled = true;
            return true;
        }
        false
    }

    /// Clears the 404 counter after a successful fetch
    pub fn clear_missing(&mut self) {
        self.missing_strikes = 0;
    }

    /// Puts a stalled thread back into rotation with a fresh strike count
    ///
    /// Returns true if the thread was stalled.
    pub fn unstall(&mut self) -> bool {
        let was_stalled = self.stalled;
        self.stalled = false;
        self.missing_strikes = 0;
        was_stalled
    }
}

/// One extracted post, held in memory until its part file is written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostRecord {
    pub author: String,

    /// Cleaned and augmented markup of the post block
    pub content: String,

    /// 1-based page of the thread the post was found on
    pub page_number: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed() -> ThreadSeed {
        ThreadSeed::new(
            "Restoring a 1970s synth!",
            Url::parse("https://forum.example.com/thread-42").unwrap(),
        )
    }

    #[test]
    fn test_new_state() {
        let state = ThreadState::new(&seed());
        assert_eq!(state.base_filename, "Restoring_a_1970s_synth_.html");
        assert_eq!(state.current_url, Some(seed().url));
        assert_eq!(state.total_pages, 0);
        assert_eq!(state.file_part, 1);
        assert!(!state.done);
        assert_eq!(state.status(), ThreadStatus::Pending);
    }

    #[test]
    fn test_mark_done_clears_cursor() {
        let mut state = ThreadState::new(&seed());
        state.mark_done();
        assert!(state.done);
        assert!(state.current_url.is_none());
        assert_eq!(state.status(), ThreadStatus::Done);
        assert!(state.is_settled());
    }

    #[test]
    fn test_record_missing_stalls_at_limit() {
        let mut state = ThreadState::new(&seed());
        assert!(!state.record_missing(2));
        assert!(!state.stalled);
        assert!(state.record_missing(2));
        assert!(state.stalled);
        assert!(!state.done);
        assert!(state.current_url.is_some());
        assert_eq!(state.status(), ThreadStatus::Stalled);

        // Already stalled: no second transition
        assert!(!state.record_missing(2));
    }

    #[test]
    fn test_record_missing_zero_limit_never_stalls() {
        let mut state = ThreadState::new(&seed());
        for _ in 0..10 {
            assert!(!state.record_missing(0));
        }
        assert!(!state.stalled);
        assert_eq!(state.missing_strikes, 10);
    }

    #[test]
    fn test_clear_missing() {
        let mut state = ThreadState::new(&seed());
        state.record_missing(3);
        state.clear_missing();
        assert_eq!(state.missing_strikes, 0);
    }

    #[test]
    fn test_status_display() {
        assert_eq!(format!("{}", ThreadStatus::Pending), "pending");
        assert_eq!(format!("{}", ThreadStatus::Stalled), "stalled");
        assert_eq!(format!("{}", ThreadStatus::Done), "done");
    }

    #[test]
    fn test_unstall_resets_strikes() {
        let mut state = ThreadState::new(&seed());
        assert!(!state.record_missing(2));
        assert!(state.record_missing(2));
        assert_eq!(state.status(), ThreadStatus::Stalled);

        assert!(state.unstall());
        assert!(!state.stalled);
        assert_eq!(state.missing_strikes, 0);
        assert_eq!(state.status(), ThreadStatus::Pending);
        assert!(!state.unstall());
    }
}
