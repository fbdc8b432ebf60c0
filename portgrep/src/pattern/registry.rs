use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};
use tracing::debug;

use super::{Context, Pattern, PatternKind, Query, Regexp};
use crate::errors::{GrepError, GrepResult};

/// The built-in pattern catalog
pub static BUILTIN: Lazy<Registry> = Lazy::new(Registry::builtin);

const BROKEN: Pattern = Pattern::flag(
    "b",
    "search only ports marked BROKEN/IGNORE",
    r"\b(?P<q>(?:BROKEN|IGNORE)(?:_(?:FreeBSD|DragonFly|[a-z0-9]+)(?:_\w+)?)?)[ \t]*[?+:!]?=(?P<r>.*)(?:\n|\z)",
);

const DEPENDS: Pattern = Pattern::query(
    "d",
    "search by *_DEPENDS",
    r"\b(?P<q>(?:\w+_)?DEPENDS)[ \t]*[?+:!]?=(?:.*?[ \t/}\x00])?(?P<r>{query})(?:[ \t\x00@:>.].*)?(?:\n|\z)",
);

const BUILD_DEPENDS: Pattern = Pattern::query(
    "db",
    "search by BUILD_DEPENDS",
    r"\b(?P<q>(?:\w+_)?BUILD_DEPENDS)[ \t]*[?+:!]?=(?:.*?[ \t/}\x00])?(?P<r>{query})(?:[ \t\x00@:>.].*)?(?:\n|\z)",
);

const LIB_DEPENDS: Pattern = Pattern::query(
    "dl",
    "search by LIB_DEPENDS",
    r"\b(?P<q>(?:\w+_)?LIB_DEPENDS)[ \t]*[?+:!]?=(?:.*?[ \t/}\x00])?(?P<r>{query})(?:[ \t\x00@:.].*)?(?:\n|\z)",
);

const RUN_DEPENDS: Pattern = Pattern::query(
    "dr",
    "search by RUN_DEPENDS",
    r"\b(?P<q>(?:\w+_)?RUN_DEPENDS)[ \t]*[?+:!]?=(?:.*?[ \t/}\x00])?(?P<r>{query})(?:[ \t\x00@:>.].*)?(?:\n|\z)",
);

const ONLY_FOR_ARCHS: Pattern = Pattern::query(
    "oa",
    "search by ONLY_FOR_ARCHS",
    r"\b(?P<q>ONLY_FOR_ARCHS)[ \t]*[?+:!]?=(?:.*?[ \t\x00])?(?P<r>{query})(?:[ \t\x00].*)?(?:\n|\z)",
);

const MAINTAINER: Pattern = Pattern::query(
    "m",
    "search by MAINTAINER",
    r"(?i)\b(?P<q>MAINTAINER)[ \t]*[?+:!]?=[ \t]*(?P<r>{query}).*(?:\n|\z)",
);

const USES: Pattern = Pattern::query(
    "u",
    "search by USES",
    r"\b(?P<q>(?:\w+_)?USES)[ \t]*[?+:!]?=(?:.*?[ \t\x00])?(?P<r>{query})(?:[ \t:,\x00].*)?(?:\n|\z)",
);

/// An ordered catalog of patterns, looked up by selector
#[derive(Debug, Clone)]
pub struct Registry {
    patterns: Vec<Pattern>,
}

impl Registry {
    /// Creates a registry from patterns, rejecting duplicate selectors
    pub fn new(patterns: Vec<Pattern>) -> GrepResult<Self> {
        let mut seen = HashSet::new();
        for p in &patterns {
            if !seen.insert(p.flag) {
                return Err(GrepError::config_error(format!(
                    "duplicate pattern selector -{}",
                    p.flag
                )));
            }
        }
        Ok(Self { patterns })
    }

    fn builtin() -> Self {
        Self {
            patterns: vec![
                BROKEN,
                DEPENDS,
                BUILD_DEPENDS,
                LIB_DEPENDS,
                RUN_DEPENDS,
                ONLY_FOR_ARCHS,
                MAINTAINER,
                USES,
            ],
        }
    }

    pub fn get(&self, flag: &str) -> Option<&Pattern> {
        self.patterns.iter().find(|p| p.flag == flag)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Pattern> {
        self.patterns.iter()
    }

    /// Usage text for all patterns, one line each
    pub fn usage(&self) -> String {
        self.patterns
            .iter()
            .map(|p| format!("  {}\n", p.usage()))
            .collect()
    }

    /// Binds a value to the string pattern selected by `flag`
    pub fn bind(
        &self,
        bindings: &mut Bindings,
        flag: &str,
        value: impl Into<String>,
    ) -> GrepResult<()> {
        let pattern = self.lookup(flag, PatternKind::Query)?;
        let value = value.into();
        if value.is_empty() {
            return Err(GrepError::config_error(format!(
                "query for {} cannot be empty",
                pattern.option()
            )));
        }
        bindings.values.insert(pattern.flag, value);
        Ok(())
    }

    /// Switches on the boolean pattern selected by `flag`
    pub fn enable(&self, bindings: &mut Bindings, flag: &str) -> GrepResult<()> {
        let pattern = self.lookup(flag, PatternKind::Flag)?;
        bindings.flags.insert(pattern.flag);
        Ok(())
    }

    fn lookup(&self, flag: &str, kind: PatternKind) -> GrepResult<&Pattern> {
        match self.get(flag) {
            Some(p) if p.kind == kind => Ok(p),
            Some(p) => Err(GrepError::config_error(format!(
                "{} is a {} pattern",
                p.option(),
                match p.kind {
                    PatternKind::Query => "query",
                    PatternKind::Flag => "flag",
                }
            ))),
            None => Err(GrepError::unknown_pattern(flag)),
        }
    }

    /// The queries described by `bindings`: bound patterns in registry
    /// order, followed by free-text queries in the order they were added.
    pub fn queries(&self, bindings: &Bindings) -> Vec<Query> {
        let mut queries: Vec<Query> = self
            .patterns
            .iter()
            .filter_map(|p| match p.kind {
                PatternKind::Query => bindings.values.get(p.flag).map(|v| Query::Field {
                    pattern: *p,
                    value: v.clone(),
                }),
                PatternKind::Flag => bindings
                    .flags
                    .contains(p.flag)
                    .then_some(Query::Flag { pattern: *p }),
            })
            .collect();
        queries.extend(bindings.texts.iter().cloned().map(Query::Text));
        queries
    }

    /// Compiles every bound query. Any failure aborts the whole set.
    pub fn compile(
        &self,
        bindings: &Bindings,
        context: Context,
        is_regex: bool,
    ) -> GrepResult<Vec<Regexp>> {
        self.queries(bindings)
            .iter()
            .map(|q| {
                let re = q.compile(context, is_regex)?;
                debug!("Compiled query: {}", re);
                Ok(re)
            })
            .collect()
    }
}

/// Per-search values bound to registry patterns
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    values: HashMap<&'static str, String>,
    flags: HashSet<&'static str>,
    texts: Vec<String>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a free-text query matched anywhere in the Makefile
    pub fn add_text(&mut self, query: impl Into<String>) -> GrepResult<()> {
        let query = query.into();
        if query.is_empty() {
            return Err(GrepError::config_error("free-text query cannot be empty"));
        }
        self.texts.push(query);
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.flags.is_empty() && self.texts.is_empty()
    }
}
