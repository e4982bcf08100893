use crate::config::types::{FetchPolicy, Recipe, RecipeBook};
use crate::ConfigError;
use std::collections::HashSet;
use url::Url;

/// Validates the entire recipe book
pub fn validate(book: &RecipeBook) -> Result<(), ConfigError> {
    validate_fetch_policy(&book.fetch)?;

    let mut names = HashSet::new();
    for recipe in &book.recipes {
        validate_recipe(recipe)?;
        if !names.insert(recipe.name.as_str()) {
            return Err(ConfigError::Validation(format!(
                "Recipe '{}' is defined more than once",
                recipe.name
            )));
        }
    }

    if let Some(latest) = &book.latest {
        if !names.contains(latest.as_str()) {
            return Err(ConfigError::Validation(format!(
                "latest points at unknown recipe '{}'",
                latest
            )));
        }
    }

    Ok(())
}

/// Validates a single recipe
pub fn validate_recipe(recipe: &Recipe) -> Result<(), ConfigError> {
    if recipe.name.trim().is_empty() {
        return Err(ConfigError::Validation(
            "Recipe name cannot be empty".to_string(),
        ));
    }

    let url = Url::parse(&recipe.root_url).map_err(|e| {
        ConfigError::InvalidUrl(format!("Invalid root URL '{}': {}", recipe.root_url, e))
    })?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "Root URL '{}' must use http or https",
            recipe.root_url
        )));
    }

    if recipe.pattern.is_empty() {
        return Err(ConfigError::Validation(format!(
            "Recipe '{}' needs a non-empty link pattern",
            recipe.name
        )));
    }

    Ok(())
}

/// Validates fetcher settings
fn validate_fetch_policy(policy: &FetchPolicy) -> Result<(), ConfigError> {
    if policy.politeness_min_ms > policy.politeness_max_ms {
        return Err(ConfigError::Validation(format!(
            "politeness-min-ms ({}) exceeds politeness-max-ms ({})",
            policy.politeness_min_ms, policy.politeness_max_ms
        )));
    }

    if policy.timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "timeout-secs must be >= 1".to_string(),
        ));
    }

    if policy.inner_attempts == 0 || policy.outer_attempts == 0 {
        return Err(ConfigError::Validation(format!(
            "attempt counts must be >= 1, got inner={} outer={}",
            policy.inner_attempts, policy.outer_attempts
        )));
    }

    if policy.backoff_jitter_percent > 100 {
        return Err(ConfigError::Validation(format!(
            "backoff-jitter-percent must be <= 100, got {}",
            policy.backoff_jitter_percent
        )));
    }

    if policy.user_agent.is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recipe() -> Recipe {
        Recipe::new("forum", "https://forum.example.com/", "thread-", 10, 50)
    }

    #[test]
    fn test_validate_recipe() {
        assert!(validate_recipe(&recipe()).is_ok());

        let mut blank_name = recipe();
        blank_name.name = "  ".to_string();
        assert!(validate_recipe(&blank_name).is_err());

        let mut bad_url = recipe();
        bad_url.root_url = "not a url".to_string();
        assert!(matches!(
            validate_recipe(&bad_url),
            Err(ConfigError::InvalidUrl(_))
        ));

        let mut ftp = recipe();
        ftp.root_url = "ftp://forum.example.com/".to_string();
        assert!(validate_recipe(&ftp).is_err());

        let mut no_pattern = recipe();
        no_pattern.pattern.clear();
        assert!(validate_recipe(&no_pattern).is_err());
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let book = RecipeBook {
            latest: None,
            fetch: FetchPolicy::default(),
            recipes: vec![recipe(), recipe()],
        };
        assert!(validate(&book).is_err());
    }

    #[test]
    fn test_dangling_latest_rejected() {
        let book = RecipeBook {
            latest: Some("gone".to_string()),
            fetch: FetchPolicy::default(),
            recipes: vec![recipe()],
        };
        assert!(validate(&book).is_err());
    }

    #[test]
    fn test_validate_fetch_policy() {
        assert!(validate_fetch_policy(&FetchPolicy::default()).is_ok());
        assert!(validate_fetch_policy(&FetchPolicy::immediate()).is_ok());

        let inverted = FetchPolicy {
            politeness_min_ms: 5000,
            politeness_max_ms: 1000,
            ..FetchPolicy::default()
        };
        assert!(validate_fetch_policy(&inverted).is_err());

        let no_attempts = FetchPolicy {
            outer_attempts: 0,
            ..FetchPolicy::default()
        };
        assert!(validate_fetch_policy(&no_attempts).is_err());

        let wild_jitter = FetchPolicy {
            backoff_jitter_percent: 150,
            ..FetchPolicy::default()
        };
        assert!(validate_fetch_policy(&wild_jitter).is_err());
    }
}
