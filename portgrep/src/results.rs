/// Match types handed to the result callback.
///
/// A [`Match`] owns a copy of the matched block of a Makefile, so it can be
/// buffered, sorted or sent across threads after the file buffer it came from
/// has been recycled. Spans are byte offsets into [`Match::text`], never into
/// the file.
use std::fmt;
use std::ops::Range;

/// Represents a single match inside one port's Makefile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    /// The matched block, including any requested context lines
    pub text: Vec<u8>,
    /// Byte range of the matched field name within `text`
    pub query_span: Option<Range<usize>>,
    /// Byte range of the matched value within `text`
    pub result_span: Option<Range<usize>>,
}

/// All matches found for one port, in pattern order
pub type Matches = Vec<Match>;

impl Match {
    /// The matched field name, e.g. `BUILD_DEPENDS`
    pub fn query(&self) -> Option<&[u8]> {
        self.query_span.clone().map(|span| &self.text[span])
    }

    /// The matched value, e.g. `bash`
    pub fn result(&self) -> Option<&[u8]> {
        self.result_span.clone().map(|span| &self.text[span])
    }

    /// Splits `text` into (before, query, between, result, after) segments
    /// for highlighting. Missing spans collapse to empty segments. Overlapping
    /// or out-of-order spans fall back to highlighting the query only.
    pub fn segments(&self) -> Segments<'_> {
        let len = self.text.len();
        let (query, result) = match (self.query_span.clone(), self.result_span.clone()) {
            (Some(query), Some(result)) if query.end <= result.start => (query, result),
            (Some(query), _) => (query.clone(), query.end..query.end),
            (None, Some(result)) => (result.start..result.start, result),
            (None, None) => (len..len, len..len),
        };

        Segments {
            before: &self.text[..query.start],
            query: &self.text[query.clone()],
            between: &self.text[query.end..result.start],
            result: &self.text[result.clone()],
            after: &self.text[result.end..],
        }
    }
}

impl fmt::Display for Match {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Match {{text: {:?}, query: {:?}, result: {:?}}}",
            String::from_utf8_lossy(&self.text),
            self.query_span,
            self.result_span
        )
    }
}

/// Highlighting segments of a [`Match`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segments<'a> {
    pub before: &'a [u8],
    pub query: &'a [u8],
    pub between: &'a [u8],
    pub result: &'a [u8],
    pub after: &'a [u8],
}
