//! CLI command implementations for `sortbox`.
//!
//! - [`classify`] -- Run the classification pipeline over a mailbox file.
//! - [`buckets`] -- Print the default bucket set.
//! - [`config_cmd`] -- Display the resolved configuration.
//!
//! Configuration loading is shared here.

pub mod buckets;
pub mod classify;
pub mod config_cmd;

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde_json::Value;
use tracing::debug;

use sortbox_types::config::Config;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "SORTBOX_CONFIG";

/// Load configuration from the given path override or via auto-discovery.
///
/// Discovery order:
/// 1. `config_override` (must exist)
/// 2. `SORTBOX_CONFIG` env var
/// 3. `~/.sortbox/config.json`
///
/// Returns a default `Config` if no config file is found.
pub fn load_config(config_override: Option<&str>) -> anyhow::Result<Config> {
    let path = match config_override {
        Some(path_str) => {
            let path = PathBuf::from(path_str);
            if !path.exists() {
                anyhow::bail!("config file not found: {path_str}");
            }
            Some(path)
        }
        None => discover_config_path(
            std::env::var(CONFIG_ENV_VAR).ok(),
            dirs::home_dir(),
        ),
    };

    let config = match path {
        Some(path) => {
            debug!(path = %path.display(), "loading config");
            parse_config_file(&path)?
        }
        None => {
            debug!("no config file found, using defaults");
            Config::default()
        }
    };
    config.validate()?;
    Ok(config)
}

/// Find the config file to load, if any.
///
/// An env var path is returned as-is so a typo surfaces as a read error
/// rather than silently falling back to defaults.
pub fn discover_config_path(env_path: Option<String>, home_dir: Option<PathBuf>) -> Option<PathBuf> {
    if let Some(env_path) = env_path.filter(|p| !p.is_empty()) {
        return Some(PathBuf::from(env_path));
    }
    let candidate = home_dir?.join(".sortbox").join("config.json");
    candidate.exists().then_some(candidate)
}

fn parse_config_file(path: &Path) -> anyhow::Result<Config> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let value: Value = serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse config {}", path.display()))?;
    let config = serde_json::from_value(normalize_keys(value))?;
    Ok(config)
}

/// Recursively convert object keys from camelCase to snake_case.
pub fn normalize_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, val)| (camel_to_snake(&key), normalize_keys(val)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(normalize_keys).collect()),
        other => other,
    }
}

/// Convert one camelCase identifier to snake_case, keeping acronyms
/// together (`baseURL` -> `base_url`, `HTTPTimeout` -> `http_timeout`).
pub fn camel_to_snake(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut result = String::with_capacity(name.len() + 4);

    for (i, &ch) in chars.iter().enumerate() {
        if ch.is_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next = chars.get(i + 1).copied();
            if prev.is_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_uppercase() && next.is_some_and(|c| c.is_lowercase()))
            {
                result.push('_');
            }
        }
        result.push(ch.to_ascii_lowercase());
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("sortbox_cli_{}_{name}", std::process::id()))
    }

    #[test]
    fn camel_to_snake_cases() {
        assert_eq!(camel_to_snake("maxAttempts"), "max_attempts");
        assert_eq!(camel_to_snake("retryBaseDelayMs"), "retry_base_delay_ms");
        assert_eq!(camel_to_snake("already_snake"), "already_snake");
        assert_eq!(camel_to_snake("baseURL"), "base_url");
        assert_eq!(camel_to_snake("HTTPTimeout"), "http_timeout");
    }

    #[test]
    fn normalize_keys_recurses() {
        let value = json!({
            "pipeline": {"maxAttempts": 3, "runTimeoutSecs": 60},
            "list": [{"inputPerMillion": 1.0}]
        });
        let normalized = normalize_keys(value);
        assert_eq!(normalized["pipeline"]["max_attempts"], 3);
        assert_eq!(normalized["pipeline"]["run_timeout_secs"], 60);
        assert_eq!(normalized["list"][0]["input_per_million"], 1.0);
    }

    #[test]
    fn env_path_wins_over_home() {
        let found = discover_config_path(Some("/tmp/explicit.json".into()), Some(PathBuf::from("/nowhere")));
        assert_eq!(found, Some(PathBuf::from("/tmp/explicit.json")));
    }

    #[test]
    fn missing_home_config_means_defaults() {
        let home = temp_path("empty_home");
        assert!(discover_config_path(None, Some(home)).is_none());
        assert!(discover_config_path(Some(String::new()), None).is_none());
    }

    #[test]
    fn home_config_is_discovered() {
        let home = temp_path("home");
        let dir = home.join(".sortbox");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("config.json"), "{}").unwrap();

        assert_eq!(
            discover_config_path(None, Some(home.clone())),
            Some(dir.join("config.json"))
        );
        let _ = std::fs::remove_dir_all(&home);
    }

    #[test]
    fn load_config_from_explicit_file() {
        let path = temp_path("explicit.json");
        std::fs::write(
            &path,
            r#"{"classifier": {"model": "gpt-4o", "maxTokens": 800},
                "pipeline": {"retryBaseDelayMs": 250}}"#,
        )
        .unwrap();

        let config = load_config(path.to_str()).unwrap();
        assert_eq!(config.classifier.model, "gpt-4o");
        assert_eq!(config.classifier.max_tokens, Some(800));
        assert_eq!(config.pipeline.retry_base_delay_ms, 250);
        assert_eq!(config.pipeline.max_attempts, 2);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn load_config_rejects_invalid_values() {
        let path = temp_path("invalid.json");
        std::fs::write(&path, r#"{"pipeline": {"maxAttempts": 0}}"#).unwrap();
        let err = load_config(path.to_str()).unwrap_err();
        assert!(err.to_string().contains("max_attempts"));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn load_config_missing_override_errors() {
        let err = load_config(Some("/definitely/not/here.json")).unwrap_err();
        assert!(err.to_string().contains("config file not found"));
    }
}
