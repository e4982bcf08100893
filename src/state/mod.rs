//! State module for tracking archive progress
//!
//! # Components
//!
//! - `ThreadSeed`: A thread discovered on the index page
//! - `ThreadState`: Durable per-thread cursor, page count and part number
//! - `PostRecord`: An extracted post waiting in the write buffer

mod thread_state;

// Re-export main types
pub use thread_state::{PostRecord, ThreadSeed, ThreadState, ThreadStatus};
