use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::time::Duration;

/// Default pages advanced per thread per round
pub const DEFAULT_BATCH_SIZE: u32 = 10;

/// Default pages accumulated before a part file is written
pub const DEFAULT_SPLIT_LIMIT: u32 = 50;

/// Recipe book stored on disk: every saved job profile plus the
/// most recently used one
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecipeBook {
    /// Name of the most recently used recipe
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest: Option<String>,

    /// Network behaviour shared by every job
    #[serde(default)]
    pub fetch: FetchPolicy,

    /// Saved recipes, in creation order
    #[serde(default, rename = "recipe")]
    pub recipes: Vec<Recipe>,
}

impl RecipeBook {
    /// Looks up a recipe by profile name
    pub fn get(&self, name: &str) -> Option<&Recipe> {
        self.recipes.iter().find(|r| r.name == name)
    }

    /// Returns the most recently used recipe, if the marker points at one
    pub fn latest(&self) -> Option<&Recipe> {
        self.latest.as_deref().and_then(|name| self.get(name))
    }

    /// Inserts or replaces a recipe and marks it as the most recently used
    pub fn upsert(&mut self, recipe: Recipe) {
        let name = recipe.name.clone();
        match self.recipes.iter_mut().find(|r| r.name == name) {
            Some(existing) => *existing = recipe,
            None => self.recipes.push(recipe),
        }
        self.latest = Some(name);
    }

}

/// Immutable description of one archiving job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", from = "RawRecipe")]
pub struct Recipe {
    /// Profile name, also used to derive the output directory
    pub name: String,

    /// Forum index page listing the threads
    pub root_url: String,

    /// Substring an anchor href must contain to count as a thread link
    pub pattern: String,

    /// Maximum pages advanced per thread per round (0 disables batching)
    pub batch_size: u32,

    /// Maximum pages per part file (0 disables splitting)
    pub split_limit: u32,
}

impl Recipe {
    pub fn new(
        name: impl Into<String>,
        root_url: impl Into<String>,
        pattern: impl Into<String>,
        batch_size: u32,
        split_limit: u32,
    ) -> Self {
        Self {
            name: name.into(),
            root_url: root_url.into(),
            pattern: pattern.into(),
            batch_size,
            split_limit,
        }
    }
}

/// On-disk shape of a recipe before the limits are checked
#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RawRecipe {
    name: String,
    root_url: String,
    pattern: String,
    #[serde(default)]
    batch_size: Option<RawLimit>,
    #[serde(default)]
    split_limit: Option<RawLimit>,
}

/// A limit as an operator might have typed it
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum RawLimit {
    Number(i64),
    Text(String),
    Other(IgnoredAny),
}

impl From<RawRecipe> for Recipe {
    fn from(raw: RawRecipe) -> Self {
        Self {
            batch_size: super::parser::resolve_limit(
                raw.batch_size,
                DEFAULT_BATCH_SIZE,
                "batch-size",
            ),
            split_limit: super::parser::resolve_limit(
                raw.split_limit,
                DEFAULT_SPLIT_LIMIT,
                "split-limit",
            ),
            name: raw.name,
            root_url: raw.root_url,
            pattern: raw.pattern,
        }
    }
}

/// Network behaviour of the fetcher
///
/// Passed to the fetcher as an explicit value instead of living in
/// shared mutable state, so tests can run with every delay set to zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct FetchPolicy {
    /// Lower bound of the random delay before each request (milliseconds)
    pub politeness_min_ms: u64,

    /// Upper bound of the random delay before each request (milliseconds)
    pub politeness_max_ms: u64,

    /// Whole-request timeout (seconds)
    pub timeout_secs: u64,

    /// Transport-level attempts for retryable statuses and network errors
    pub inner_attempts: u32,

    /// Base delay of the exponential transport backoff (milliseconds)
    pub backoff_base_ms: u64,

    /// Random extra added to each backoff pause, as a percentage of it
    pub backoff_jitter_percent: u8,

    /// Caller-level attempts, each preceded by a fresh politeness delay
    pub outer_attempts: u32,

    /// Pause after a failed caller-level attempt (milliseconds)
    pub retry_pause_ms: u64,

    /// Browser-like User-Agent header
    pub user_agent: String,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            politeness_min_ms: 1500,
            politeness_max_ms: 3500,
            timeout_secs: 45,
            inner_attempts: 5,
            backoff_base_ms: 1000,
            backoff_jitter_percent: 10,
            outer_attempts: 3,
            retry_pause_ms: 2000,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                .to_string(),
        }
    }
}

impl FetchPolicy {
    /// A policy with no waiting at all, for tests against local servers
    pub fn immediate() -> Self {
        Self {
            politeness_min_ms: 0,
            politeness_max_ms: 0,
            timeout_secs: 5,
            backoff_base_ms: 0,
            backoff_jitter_percent: 0,
            retry_pause_ms: 0,
            ..Self::default()
        }
    }

    pub fn politeness_range_ms(&self) -> RangeInclusive<u64> {
        self.politeness_min_ms..=self.politeness_max_ms
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }

    pub fn retry_pause(&self) -> Duration {
        Duration::from_millis(self.retry_pause_ms)
    }
}

/// How the orchestrator schedules rounds
#[derive(Debug, Clone, PartialEq)]
pub struct JobOptions {
    /// Keep running rounds until every thread is settled
    pub loop_mode: bool,

    /// Sleep between rounds in loop mode
    pub cooldown: Duration,

    /// Consecutive rounds a cursor may return 404 before the thread is
    /// marked stalled (0 never stalls)
    pub max_missing_strikes: u32,

    /// Give stalled threads another chance at the start of this run
    pub retry_stalled: bool,
}

impl Default for JobOptions {
    fn default() -> Self {
        Self {
            loop_mode: false,
            cooldown: Duration::from_secs(5),
            max_missing_strikes: 3,
            retry_stalled: false,
        }
    }
}
