use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::catalog::{DEFAULT_BASE_URL, DEFAULT_WORKERS};
use crate::comments::DEFAULT_AUTHOR;

const DEFAULT_ENV_PREFIX: &str = "TUBEDECK";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub comments: CommentsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CatalogConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub access_token: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
    #[serde(default = "default_workers")]
    pub workers: usize,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            access_token: String::new(),
            user_agent: default_user_agent(),
            timeout: default_timeout(),
            workers: default_workers(),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_user_agent() -> String {
    format!("tubedeck/{}", crate::VERSION)
}

fn default_timeout() -> Duration {
    Duration::from_secs(20)
}

fn default_workers() -> usize {
    DEFAULT_WORKERS
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct StorageConfig {
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommentsConfig {
    #[serde(default = "default_author")]
    pub author: String,
}

impl Default for CommentsConfig {
    fn default() -> Self {
        Self {
            author: default_author(),
        }
    }
}

fn default_author() -> String {
    DEFAULT_AUTHOR.to_string()
}

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub config_file: Option<PathBuf>,
    pub env_prefix: Option<String>,
}

pub fn load(options: LoadOptions) -> Result<Config> {
    let mut cfg = Config::default();

    if let Some(path) = options.config_file.as_ref() {
        if path.exists() {
            let from_file = read_config_file(path)?;
            cfg = merge_config(cfg, from_file);
        }
    } else if let Some(default_path) = default_config_path() {
        if default_path.exists() {
            let from_file = read_config_file(&default_path)?;
            cfg = merge_config(cfg, from_file);
        }
    }

    let prefix = options.env_prefix.as_deref().unwrap_or(DEFAULT_ENV_PREFIX);
    apply_env(&mut cfg, prefix);

    Ok(cfg)
}

fn read_config_file(path: &Path) -> Result<Config> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file at {}", path.display()))?;
    let config: Config = serde_yaml::from_str(&data)
        .with_context(|| format!("Failed to parse config file at {}", path.display()))?;
    Ok(config)
}

fn merge_config(mut base: Config, other: Config) -> Config {
    if !other.catalog.base_url.is_empty() {
        base.catalog.base_url = other.catalog.base_url;
    }
    if !other.catalog.access_token.is_empty() {
        base.catalog.access_token = other.catalog.access_token;
    }
    if !other.catalog.user_agent.is_empty() {
        base.catalog.user_agent = other.catalog.user_agent;
    }
    if !other.catalog.timeout.is_zero() {
        base.catalog.timeout = other.catalog.timeout;
    }
    if other.catalog.workers > 0 {
        base.catalog.workers = other.catalog.workers;
    }

    if other.storage.path.is_some() {
        base.storage.path = other.storage.path;
    }

    if !other.comments.author.trim().is_empty() {
        base.comments.author = other.comments.author;
    }

    base
}

// Applies only the variables that are set.
fn apply_env(cfg: &mut Config, prefix: &str) {
    let mut map: HashMap<String, String> = HashMap::new();
    let upper_prefix = format!("{}_", prefix.to_uppercase());

    for (key, value) in env::vars() {
        if let Some(stripped) = key.strip_prefix(&upper_prefix) {
            let normalized = stripped.to_ascii_lowercase().replace("__", ".");
            map.insert(normalized, value);
        }
    }

    for (key, value) in map {
        apply_env_value(cfg, &key, value);
    }
}

fn apply_env_value(cfg: &mut Config, key: &str, value: String) {
    match key {
        "catalog.base_url" => cfg.catalog.base_url = value,
        "catalog.access_token" => cfg.catalog.access_token = value,
        "catalog.user_agent" => cfg.catalog.user_agent = value,
        "catalog.timeout" => {
            if let Ok(duration) = humantime::parse_duration(&value) {
                cfg.catalog.timeout = duration;
            }
        }
        "catalog.workers" => {
            if let Some(workers) = value.parse().ok().filter(|n| *n > 0) {
                cfg.catalog.workers = workers;
            }
        }
        "storage.path" => cfg.storage.path = Some(PathBuf::from(value)),
        "comments.author" => {
            if !value.trim().is_empty() {
                cfg.comments.author = value;
            }
        }
        _ => {}
    }
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("tubedeck").join("config.yaml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn isolated() -> LoadOptions {
        LoadOptions {
            config_file: Some(PathBuf::from("/nonexistent/tubedeck/config.yaml")),
            env_prefix: Some("TUBEDECK_TEST_UNSET".into()),
        }
    }

    #[test]
    fn load_defaults_without_files() {
        let cfg = load(isolated()).unwrap();
        assert_eq!(cfg.catalog.base_url, DEFAULT_BASE_URL);
        assert_eq!(cfg.catalog.timeout, Duration::from_secs(20));
        assert_eq!(cfg.catalog.workers, DEFAULT_WORKERS);
        assert_eq!(cfg.comments.author, "You");
        assert!(cfg.storage.path.is_none());
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(
            &path,
            "catalog:\n  access_token: secret\n  timeout: 5s\n  workers: 8\ncomments:\n  author: Sam\n",
        )
        .unwrap();

        let cfg = load(LoadOptions {
            config_file: Some(path),
            env_prefix: Some("TUBEDECK_TEST_FILE".into()),
        })
        .unwrap();
        assert_eq!(cfg.catalog.access_token, "secret");
        assert_eq!(cfg.catalog.timeout, Duration::from_secs(5));
        assert_eq!(cfg.catalog.workers, 8);
        assert_eq!(cfg.catalog.base_url, DEFAULT_BASE_URL);
        assert_eq!(cfg.comments.author, "Sam");
    }

    #[test]
    fn env_overrides() {
        env::set_var("TUBEDECK_TEST_ENV_CATALOG__BASE_URL", "http://127.0.0.1:9/videos");
        env::set_var("TUBEDECK_TEST_ENV_CATALOG__TIMEOUT", "750ms");
        env::set_var("TUBEDECK_TEST_ENV_CATALOG__WORKERS", "0");
        let cfg = load(LoadOptions {
            config_file: Some(PathBuf::from("/nonexistent/config.yaml")),
            env_prefix: Some("TUBEDECK_TEST_ENV".into()),
        })
        .unwrap();
        assert_eq!(cfg.catalog.base_url, "http://127.0.0.1:9/videos");
        assert_eq!(cfg.catalog.timeout, Duration::from_millis(750));
        assert_eq!(cfg.catalog.workers, DEFAULT_WORKERS);
        env::remove_var("TUBEDECK_TEST_ENV_CATALOG__BASE_URL");
        env::remove_var("TUBEDECK_TEST_ENV_CATALOG__TIMEOUT");
        env::remove_var("TUBEDECK_TEST_ENV_CATALOG__WORKERS");
    }
}
