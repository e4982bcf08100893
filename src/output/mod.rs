//! Output module for writing archived threads
//!
//! This module handles:
//! - Rendering buffered posts into numbered HTML part files
//! - Deriving file and directory names
//! - Summarizing job progress for the status report

mod html;
mod naming;
pub mod stats;
mod traits;

pub use html::{escape_html, render_part, HtmlWriter};
pub use naming::{clean_filename, output_dir_name, part_filename, sanitize_stem};
pub use stats::{load_statistics, print_statistics, JobStatistics, ThreadSummary};
pub use traits::{DocumentWriter, OutputError, OutputResult, PartDocument};
