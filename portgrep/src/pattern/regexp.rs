use regex::bytes::{Regex, RegexBuilder};
use std::fmt;

use crate::errors::{GrepError, GrepResult};
use crate::results::Match;

/// Name of the subexpression wrapping the matched field name
pub const QUERY_GROUP: &str = "q";
/// Name of the subexpression wrapping the matched value
pub const RESULT_GROUP: &str = "r";

/// A compiled query with resolved query/result subexpression indices.
///
/// Regexps are compiled with Unicode mode off so that `.`, `\w`, `\s` and
/// `\b` work byte-wise on Makefiles of any encoding. Templates re-enable
/// Unicode around the user's query.
#[derive(Debug, Clone)]
pub struct Regexp {
    re: Regex,
    qsi: Option<usize>,
    rsi: usize,
}

impl Regexp {
    /// Compiles a pattern that must define both the `q` and `r` groups
    pub fn new(pattern: &str) -> GrepResult<Self> {
        Self::build(pattern, true)
    }

    /// Compiles a pattern that must define `r` and may define `q`
    pub fn with_optional_query(pattern: &str) -> GrepResult<Self> {
        Self::build(pattern, false)
    }

    fn build(pattern: &str, require_query: bool) -> GrepResult<Self> {
        let re = RegexBuilder::new(pattern)
            .unicode(false)
            .build()
            .map_err(|e| GrepError::invalid_pattern(e.to_string()))?;

        let mut qsi = None;
        let mut rsi = None;
        for (i, name) in re.capture_names().enumerate() {
            match name {
                Some(QUERY_GROUP) => qsi = Some(i),
                Some(RESULT_GROUP) => rsi = Some(i),
                _ => {}
            }
        }

        let rsi = rsi.ok_or_else(|| GrepError::missing_group(RESULT_GROUP, pattern))?;
        match qsi {
            None if require_query => return Err(GrepError::missing_group(QUERY_GROUP, pattern)),
            Some(qsi) if rsi < qsi => return Err(GrepError::misordered_groups(pattern)),
            _ => {}
        }

        Ok(Self { re, qsi, rsi })
    }

    /// Finds the leftmost match in `text`.
    ///
    /// Returns `Ok(None)` when nothing matches. Spans in the returned
    /// [`Match`] are relative to the start of the matched block and are
    /// `None` when their group did not take part in the match.
    pub fn find(&self, text: &[u8]) -> GrepResult<Option<Match>> {
        let Some(caps) = self.re.captures(text) else {
            return Ok(None);
        };
        if caps.len() <= self.rsi {
            return Err(GrepError::Match {
                groups: caps.len(),
                index: self.rsi,
                pattern: self.re.as_str().to_string(),
            });
        }

        // group 0 always participates in a successful match
        let Some(whole) = caps.get(0) else {
            return Ok(None);
        };
        let offset = whole.start();
        let span = |i: usize| caps.get(i).map(|m| m.start() - offset..m.end() - offset);

        Ok(Some(Match {
            text: whole.as_bytes().to_vec(),
            query_span: self.qsi.and_then(span),
            result_span: span(self.rsi),
        }))
    }
}

impl fmt::Display for Regexp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.re.as_str())
    }
}
