use config::{Config as ConfigBuilder, ConfigError, File};
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use crate::pattern::Context;

/// How multiple queries combine for a single port
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// A port matches only if every query matches
    #[default]
    And,
    /// A port matches if at least one query matches
    Or,
}

/// What the per-file buffer pool does with buffers it gets back
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BufferRetention {
    /// Keep every buffer until the search finishes
    #[default]
    Retain,
    /// Keep at most one idle buffer per job and free the rest
    Bounded,
}

/// Configuration for one search over a ports tree.
///
/// # Configuration Locations
///
/// Values are layered in this order, later files overriding earlier ones:
/// 1. Global `$CONFIG_DIR/portgrep/config.yaml`
/// 2. Local `.portgrep.yaml` in the current directory
/// 3. A file passed explicitly (the CLI's `--config`)
///
/// Example:
/// ```yaml
/// root_path: "/usr/ports"
/// categories: ["devel", "lang"]
/// thread_count: 8
/// mode: "or"
/// context_before: 0
/// context_after: 2
/// buffer_retention: "bounded"
/// log_level: "info"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrepConfig {
    /// Ports tree root
    #[serde(default = "default_root_path")]
    pub root_path: PathBuf,

    /// Categories to descend into; empty means all of them
    #[serde(default)]
    pub categories: Vec<String>,

    /// Maximum number of concurrent tasks in each pipeline stage
    #[serde(default = "default_thread_count")]
    pub thread_count: NonZeroUsize,

    /// How multiple queries combine
    #[serde(default)]
    pub mode: MatchMode,

    /// Treat query values as regular expressions
    #[serde(default)]
    pub is_regex: bool,

    /// Number of context lines to include before each match
    #[serde(default)]
    pub context_before: usize,

    /// Number of context lines to include after each match
    #[serde(default)]
    pub context_after: usize,

    /// Buffer pool policy
    #[serde(default)]
    pub buffer_retention: BufferRetention,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

pub const DEFAULT_ROOT: &str = "/usr/ports";

fn default_root_path() -> PathBuf {
    PathBuf::from(DEFAULT_ROOT)
}

fn default_thread_count() -> NonZeroUsize {
    NonZeroUsize::new(num_cpus::get()).unwrap_or(NonZeroUsize::MIN)
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for GrepConfig {
    fn default() -> Self {
        Self {
            root_path: default_root_path(),
            categories: Vec::new(),
            thread_count: default_thread_count(),
            mode: MatchMode::default(),
            is_regex: false,
            context_before: 0,
            context_after: 0,
            buffer_retention: BufferRetention::default(),
            log_level: default_log_level(),
        }
    }
}

impl GrepConfig {
    /// Creates a configuration for `root` with everything else defaulted
    pub fn new(root_path: impl Into<PathBuf>) -> Self {
        Self {
            root_path: root_path.into(),
            ..Self::default()
        }
    }

    /// Loads configuration from the default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Loads configuration from the default locations plus `config_path`
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::builder();

        let config_files = [
            dirs::config_dir().map(|p| p.join("portgrep/config.yaml")),
            Some(PathBuf::from(".portgrep.yaml")),
        ];
        for path in config_files.iter().flatten() {
            if path.exists() {
                builder = builder.add_source(File::from(path.as_path()));
            }
        }

        // An explicit file must exist
        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path).required(true));
        }

        builder.build()?.try_deserialize()
    }

    /// The context window requested for every query
    pub fn context(&self) -> Context {
        Context::new(self.context_before, self.context_after)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_load_config_file() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.yaml");
        fs::write(
            &config_path,
            r#"
            root_path: "/home/ports"
            categories: ["devel", "lang"]
            thread_count: 4
            mode: "or"
            is_regex: true
            context_after: 2
            buffer_retention: "bounded"
            log_level: "debug"
        "#,
        )
        .unwrap();

        let config = GrepConfig::load_from(Some(&config_path)).unwrap();
        assert_eq!(config.root_path, PathBuf::from("/home/ports"));
        assert_eq!(config.categories, vec!["devel", "lang"]);
        assert_eq!(config.thread_count, NonZeroUsize::new(4).unwrap());
        assert_eq!(config.mode, MatchMode::Or);
        assert!(config.is_regex);
        assert_eq!(config.context(), Context::new(0, 2));
        assert_eq!(config.buffer_retention, BufferRetention::Bounded);
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_default_values() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.yaml");
        fs::write(&config_path, "categories: []\n").unwrap();

        let config = GrepConfig::load_from(Some(&config_path)).unwrap();
        assert_eq!(config.root_path, PathBuf::from(DEFAULT_ROOT));
        assert!(config.categories.is_empty());
        assert_eq!(config.mode, MatchMode::And);
        assert_eq!(config.buffer_retention, BufferRetention::Retain);
        assert_eq!(
            config.thread_count,
            NonZeroUsize::new(num_cpus::get()).unwrap()
        );
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn test_invalid_config() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.yaml");
        fs::write(
            &config_path,
            r#"
            thread_count: 0
            mode: "xor"
        "#,
        )
        .unwrap();

        assert!(GrepConfig::load_from(Some(&config_path)).is_err());
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = GrepConfig::load_from(Some(Path::new("nonexistent.yaml")));
        assert!(result.is_err());
    }
}
