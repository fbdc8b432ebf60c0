/// Category filtering for the ports tree walk.
///
/// The top level of a ports tree mixes categories with infrastructure
/// directories (framework makefiles, tools, templates, fetched distfiles,
/// built packages). Those are never descended into.
use std::collections::HashSet;

/// Top-level directories that are never categories
pub const IGNORED_DIRS: &[&str] = &[
    ".git",
    ".hooks",
    ".svn",
    "Keywords",
    "Mk",
    "Templates",
    "Tools",
    "distfiles",
    "packages",
];

/// Name of the metadata file read from each port directory
pub const METADATA_FILE: &str = "Makefile";

/// Checks if a top-level directory name is infrastructure rather than a category
pub fn is_ignored(name: &str) -> bool {
    IGNORED_DIRS.contains(&name)
}

/// Decides which top-level directories are descended into
#[derive(Debug, Clone, Default)]
pub struct CategoryFilter {
    allowed: HashSet<String>,
}

impl CategoryFilter {
    /// Creates a filter; an empty list allows every category
    pub fn new<I, S>(categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed: categories.into_iter().map(Into::into).collect(),
        }
    }

    /// Determines if the top-level directory `name` should be scanned
    pub fn should_descend(&self, name: &str) -> bool {
        !is_ignored(name) && (self.allowed.is_empty() || self.allowed.contains(name))
    }
}
