use crate::config::types::{RawLimit, Recipe, RecipeBook};
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads the recipe book from the given path
///
/// A missing file is not an error: it yields an empty book, which is what
/// a first run starts from.
///
/// # Arguments
///
/// * `path` - Path to the TOML recipe book
///
/// # Returns
///
/// * `Ok(RecipeBook)` - Loaded and validated book
/// * `Err(ConfigError)` - Failed to read, parse, or validate the book
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use threadwalk::config::load_recipe_book;
///
/// let book = load_recipe_book(Path::new("threadwalk_recipes.toml")).unwrap();
/// println!("{} saved recipes", book.recipes.len());
/// ```
pub fn load_recipe_book(path: &Path) -> Result<RecipeBook, ConfigError> {
    if !path.exists() {
        return Ok(RecipeBook::default());
    }

    let content = std::fs::read_to_string(path)?;
    let book: RecipeBook = toml::from_str(&content)?;

    validate(&book)?;

    Ok(book)
}

/// Writes the whole recipe book in one step
///
/// The content goes to a sibling temporary file first and is then renamed
/// over the target, so a crash never leaves a half-written book behind.
pub fn save_recipe_book(book: &RecipeBook, path: &Path) -> Result<(), ConfigError> {
    validate(book)?;

    let content = toml::to_string_pretty(book)?;
    let tmp_path = path.with_extension("toml.tmp");

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    std::fs::write(&tmp_path, content)?;
    std::fs::rename(&tmp_path, path)?;

    Ok(())
}

/// Computes a SHA-256 fingerprint of a recipe
///
/// Stored alongside a job's progress so that resuming with an edited
/// recipe can be detected.
///
/// # Returns
///
/// Hex-encoded SHA-256 hash of the recipe fields
pub fn compute_recipe_hash(recipe: &Recipe) -> String {
    let mut hasher = Sha256::new();
    hasher.update(recipe.name.as_bytes());
    hasher.update(b"\n");
    hasher.update(recipe.root_url.as_bytes());
    hasher.update(b"\n");
    hasher.update(recipe.pattern.as_bytes());
    hasher.update(b"\n");
    hasher.update(recipe.batch_size.to_le_bytes());
    hasher.update(recipe.split_limit.to_le_bytes());
    hex::encode(hasher.finalize())
}

/// Parses a limit typed by the operator, falling back to `default`
///
/// Malformed values are not fatal: they are reported and replaced with the
/// documented default.
pub fn parse_limit(raw: &str, default: u32, field: &str) -> u32 {
    resolve_limit(Some(RawLimit::Text(raw.to_string())), default, field)
}

pub(crate) fn resolve_limit(raw: Option<RawLimit>, default: u32, field: &str) -> u32 {
    let parsed = match raw {
        None => return default,
        Some(RawLimit::Number(n)) => u32::try_from(n).ok(),
        Some(RawLimit::Text(text)) => text.trim().parse::<u32>().ok(),
        Some(RawLimit::Other(_)) => None,
    };

    parsed.unwrap_or_else(|| {
        tracing::warn!("Malformed {} value, using default {}", field, default);
        default
    })
}
