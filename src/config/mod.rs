//! Configuration module for threadwalk
//!
//! This module handles the TOML recipe book: loading, atomic saving,
//! validation, lenient parsing of the batch/split limits, and recipe
//! fingerprints.
//!
//! # Example
//!
//! ```no_run
//! use threadwalk::config::load_recipe_book;
//! use std::path::Path;
//!
//! let book = load_recipe_book(Path::new("threadwalk_recipes.toml")).unwrap();
//! if let Some(recipe) = book.latest() {
//!     println!("Last job: {} ({})", recipe.name, recipe.root_url);
//! }
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    FetchPolicy, JobOptions, Recipe, RecipeBook, DEFAULT_BATCH_SIZE, DEFAULT_SPLIT_LIMIT,
};

// Re-export parser functions
pub use parser::{compute_recipe_hash, load_recipe_book, parse_limit, save_recipe_book};
pub use validation::validate_recipe;
