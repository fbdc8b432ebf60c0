/// Error types for portgrep.
///
/// Errors fall into two groups. Configuration errors (bad templates, unknown
/// selectors, an unreadable ports root) are raised before any traversal
/// starts and abort the whole run. Everything else is scoped to a single
/// category or port and is handed to the result callback, which decides
/// whether to stop or keep going.
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type for grep operations
pub type GrepResult<T> = Result<T, GrepError>;

/// Errors that can occur while compiling queries or searching a ports tree
#[derive(Error, Debug)]
pub enum GrepError {
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),
    #[error("Missing subexpression {name:?} in pattern: {pattern}")]
    MissingGroup { name: &'static str, pattern: String },
    #[error("Result subexpression precedes query subexpression in pattern: {0}")]
    MisorderedGroups(String),
    #[error("Unknown pattern: -{0}")]
    UnknownPattern(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Failed to read ports root {path}: {source}")]
    Root {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to scan category {path}: {source}")]
    Walk {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Unexpected number of subexpressions {groups} (result index {index}) in {pattern}")]
    Match {
        groups: usize,
        index: usize,
        pattern: String,
    },
    #[error("Failed to start worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl GrepError {
    pub fn invalid_pattern(msg: impl Into<String>) -> Self {
        Self::InvalidPattern(msg.into())
    }

    pub fn missing_group(name: &'static str, pattern: impl Into<String>) -> Self {
        Self::MissingGroup {
            name,
            pattern: pattern.into(),
        }
    }

    pub fn misordered_groups(pattern: impl Into<String>) -> Self {
        Self::MisorderedGroups(pattern.into())
    }

    pub fn unknown_pattern(selector: impl Into<String>) -> Self {
        Self::UnknownPattern(selector.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn root(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Root {
            path: path.into(),
            source,
        }
    }

    pub fn walk(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Walk {
            path: path.into(),
            source,
        }
    }

    pub fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }

    /// Returns true for errors that invalidate the whole invocation rather
    /// than a single category or port.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::InvalidPattern(_)
                | Self::MissingGroup { .. }
                | Self::MisorderedGroups(_)
                | Self::UnknownPattern(_)
                | Self::ConfigError(_)
                | Self::Root { .. }
                | Self::ThreadPool(_)
        )
    }

    /// The category or port directory an error is scoped to, if any.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Root { path, .. } | Self::Walk { path, .. } | Self::Read { path, .. } => {
                Some(path)
            }
            _ => None,
        }
    }
}
