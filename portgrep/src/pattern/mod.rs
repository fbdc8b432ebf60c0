//! Query patterns and their compilation into [`Regexp`]s.
//!
//! A [`Pattern`] is an immutable descriptor: a selector, a description and a
//! regex template for one Makefile field. Per-invocation state lives in
//! [`Query`] values built from a [`Bindings`] set, so the same registry can
//! serve any number of searches concurrently.
//!
//! Every compiled expression has the shape
//!
//! ```text
//! (?:.*\n){0,B}  (?:^[ \t]*)?  <field match with (?P<q>..) and (?P<r>..)>  (?:.*(?:\n|\z)){0,A}
//! ```
//!
//! where `B` and `A` are the requested context lines. The optional line start
//! takes up indentation, so before-context always ends right above the line
//! holding the field. Field templates never cross a newline on their own.
//! Line continuations are folded before matching (see
//! [`crate::search::processor`]), so `.` happily walks across a continued
//! declaration while `\n` still ends it.

pub mod registry;
pub mod regexp;

pub use registry::{Bindings, Registry, BUILTIN};
pub use regexp::{Regexp, QUERY_GROUP, RESULT_GROUP};

use crate::errors::{GrepError, GrepResult};

/// Placeholder replaced by the (escaped) query value in field templates
pub const QUERY_PLACEHOLDER: &str = "{query}";

const FREE_TEXT_TEMPLATE: &str = r".*?(?P<r>{query}).*(?:\n|\z)";

/// Leading blanks of the line a field starts on
const LINE_START: &str = r"(?:(?m:^)[ \t]*)?";

/// Whether a pattern tests a value or only the presence of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternKind {
    /// Matches a field whose value contains the bound query
    Query,
    /// Matches a field regardless of its value
    Flag,
}

/// A named, built-in field pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pattern {
    /// Option selector, e.g. `m` or `db`
    pub flag: &'static str,
    /// Human readable description
    pub description: &'static str,
    pub kind: PatternKind,
    template: &'static str,
}

impl Pattern {
    pub const fn query(
        flag: &'static str,
        description: &'static str,
        template: &'static str,
    ) -> Self {
        Self {
            flag,
            description,
            kind: PatternKind::Query,
            template,
        }
    }

    pub const fn flag(
        flag: &'static str,
        description: &'static str,
        template: &'static str,
    ) -> Self {
        Self {
            flag,
            description,
            kind: PatternKind::Flag,
            template,
        }
    }

    /// The command line option for this pattern: `-m` for single letter
    /// selectors, `--db` for longer ones
    pub fn option(&self) -> String {
        if self.flag.len() == 1 {
            format!("-{}", self.flag)
        } else {
            format!("--{}", self.flag)
        }
    }

    /// One usage line, e.g. `--db query  search by BUILD_DEPENDS`
    pub fn usage(&self) -> String {
        let arg = match self.kind {
            PatternKind::Query => "query",
            PatternKind::Flag => "",
        };
        format!("{:<4} {:<5}  {}", self.option(), arg, self.description)
    }
}

/// Number of extra lines to include around each match
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Context {
    pub before: usize,
    pub after: usize,
}

impl Context {
    pub fn new(before: usize, after: usize) -> Self {
        Self { before, after }
    }

    fn expand(&self, core: &str) -> String {
        let mut pattern = String::with_capacity(core.len() + 64);
        if self.before > 0 {
            pattern.push_str(&format!(r"(?:.*\n){{0,{}}}", self.before));
        }
        pattern.push_str(LINE_START);
        pattern.push_str(core);
        if self.after > 0 {
            pattern.push_str(&format!(r"(?:.*(?:\n|\z)){{0,{}}}", self.after));
        }
        pattern
    }
}

/// A single query of one search, ready to be compiled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    /// A string-valued pattern bound to a user value
    Field { pattern: Pattern, value: String },
    /// A boolean pattern that is switched on
    Flag { pattern: Pattern },
    /// A free-text query matched anywhere in the Makefile
    Text(String),
}

impl Query {
    /// Compiles the query.
    ///
    /// With `is_regex` unset the value is matched literally; otherwise it is
    /// spliced into the template as a regular expression.
    pub fn compile(&self, context: Context, is_regex: bool) -> GrepResult<Regexp> {
        match self {
            Query::Field { pattern, value } => {
                let core = substitute(pattern.template, value, is_regex)?;
                Regexp::new(&context.expand(&core))
            }
            Query::Flag { pattern } => Regexp::new(&context.expand(pattern.template)),
            Query::Text(value) => {
                let core = substitute(FREE_TEXT_TEMPLATE, value, is_regex)?;
                Regexp::with_optional_query(&context.expand(&core))
            }
        }
    }
}

fn substitute(template: &str, value: &str, is_regex: bool) -> GrepResult<String> {
    if value.is_empty() {
        return Err(GrepError::config_error("query cannot be empty"));
    }
    let value = if is_regex {
        value.to_string()
    } else {
        regex::escape(value)
    };
    // Unicode is off for templates; turn it back on for the user's value
    Ok(template.replace(QUERY_PLACEHOLDER, &format!("(?u:{})", value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const USES: Pattern = Pattern::query(
        "u",
        "search by USES",
        r"\b(?P<q>USES)=(?P<r>{query})(?:[ \t].*)?(?:\n|\z)",
    );

    #[test]
    fn test_usage_line() {
        assert_eq!(USES.usage(), "-u   query  search by USES");
        let broken = Pattern::flag("b", "search only broken ports", r"(?P<q>BROKEN)=(?P<r>.*)");
        assert_eq!(broken.usage(), "-b          search only broken ports");
        let lib = Pattern::query(
            "dl",
            "search by LIB_DEPENDS",
            r"(?P<q>LIB_DEPENDS)=(?P<r>{query})",
        );
        assert_eq!(lib.option(), "--dl");
        assert_eq!(lib.usage(), "--dl query  search by LIB_DEPENDS");
    }

    #[test]
    fn test_context_expansion() {
        assert_eq!(Context::default().expand("X"), r"(?:(?m:^)[ \t]*)?X");
        assert_eq!(
            Context::new(2, 0).expand("X"),
            r"(?:.*\n){0,2}(?:(?m:^)[ \t]*)?X"
        );
        assert_eq!(
            Context::new(0, 1).expand("X"),
            r"(?:(?m:^)[ \t]*)?X(?:.*(?:\n|\z)){0,1}"
        );
    }

    #[test]
    fn test_literal_query_is_escaped() {
        let query = Query::Field {
            pattern: USES,
            value: "c++".to_string(),
        };
        let re = query.compile(Context::default(), false).unwrap();
        assert!(re.find(b"USES=c++ gmake").unwrap().is_some());
        assert!(re.find(b"USES=cc gmake").unwrap().is_none());
    }

    #[test]
    fn test_regex_query_is_spliced() {
        let query = Query::Field {
            pattern: USES,
            value: "py(thon)?".to_string(),
        };
        let re = query.compile(Context::default(), true).unwrap();
        assert!(re.find(b"USES=python").unwrap().is_some());
        assert!(re.find(b"USES=py").unwrap().is_some());
    }

    #[test]
    fn test_empty_query_rejected() {
        let query = Query::Text(String::new());
        let err = query.compile(Context::default(), false).unwrap_err();
        assert!(matches!(err, GrepError::ConfigError(_)));
    }

    #[test]
    fn test_user_regex_cannot_shadow_groups() {
        let query = Query::Field {
            pattern: USES,
            value: "(?P<r>go)".to_string(),
        };
        assert!(query.compile(Context::default(), true).is_err());
    }

    #[test]
    fn test_free_text_extends_to_line() {
        let query = Query::Text("linux".to_string());
        let re = query.compile(Context::default(), false).unwrap();
        let m = re
            .find(b"PORTNAME=foo\nCOMMENT=Port of the linux tool\nUSES=go\n")
            .unwrap()
            .unwrap();
        assert_eq!(m.text, b"COMMENT=Port of the linux tool\n");
        assert_eq!(m.query_span, None);
        assert_eq!(m.result(), Some(&b"linux"[..]));
    }

    #[test]
    fn test_context_lines_included() {
        let query = Query::Text("USES".to_string());
        let content = b"one\ntwo\nthree\nUSES=go\nfour\nfive\n";

        let re = query.compile(Context::new(2, 1), false).unwrap();
        let m = re.find(content).unwrap().unwrap();
        assert_eq!(m.text, b"two\nthree\nUSES=go\nfour\n");
        assert_eq!(m.result(), Some(&b"USES"[..]));

        let re = query.compile(Context::new(10, 10), false).unwrap();
        let m = re.find(content).unwrap().unwrap();
        assert_eq!(m.text, &content[..]);
    }
}
