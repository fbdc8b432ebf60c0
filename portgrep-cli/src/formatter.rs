use colored::Color;
use portgrep::Match;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// How matches are rendered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FormatOptions {
    /// Highlight query and result spans
    pub color: bool,
    /// Print only port origins, one per line
    pub origins_only: bool,
    /// Print only port origins, space separated on a single line
    pub single_line: bool,
    /// Print origins relative to the ports root
    pub strip_root: bool,
}

/// Writes search results as plain text.
///
/// Every port is buffered and written with a single call, so output from a
/// port is never interleaved with anything else written to the same stream.
pub struct TextFormatter<W: Write> {
    out: W,
    root: PathBuf,
    options: FormatOptions,
    indent: String,
    need_sep: bool,
    buf: Vec<u8>,
}

impl<W: Write> TextFormatter<W> {
    pub fn new(out: W, root: impl Into<PathBuf>, options: FormatOptions) -> Self {
        Self {
            out,
            root: root.into(),
            options,
            indent: String::new(),
            need_sep: false,
            buf: Vec::with_capacity(4096),
        }
    }

    /// Prefixes every line of match text with `indent`
    pub fn with_indent(mut self, indent: impl Into<String>) -> Self {
        self.indent = indent.into();
        self
    }

    pub fn format(&mut self, path: &Path, matches: &[Match]) -> io::Result<()> {
        self.buf.clear();
        let origin = if self.options.strip_root {
            path.strip_prefix(&self.root).unwrap_or(path)
        } else {
            path
        };

        if self.options.single_line {
            if self.need_sep {
                self.buf.push(b' ');
            }
            write!(self.buf, "{}", origin.display())?;
            self.need_sep = true;
        } else if self.options.origins_only {
            writeln!(self.buf, "{}", origin.display())?;
        } else {
            writeln!(self.buf, "{}:", origin.display())?;
            for m in matches {
                let text = self.render(m);
                if self.indent.is_empty() {
                    self.buf.extend_from_slice(&text);
                    if !text.ends_with(b"\n") {
                        self.buf.push(b'\n');
                    }
                } else {
                    for line in text.split_inclusive(|&b| b == b'\n') {
                        self.buf.extend_from_slice(self.indent.as_bytes());
                        self.buf.extend_from_slice(line.strip_suffix(b"\n").unwrap_or(line));
                        self.buf.push(b'\n');
                    }
                }
            }
        }

        self.out.write_all(&self.buf)
    }

    /// Terminates single-line output and flushes
    pub fn finish(&mut self) -> io::Result<()> {
        if self.need_sep {
            self.out.write_all(b"\n")?;
            self.need_sep = false;
        }
        self.out.flush()
    }

    fn render(&self, m: &Match) -> Vec<u8> {
        if !self.options.color {
            return m.text.clone();
        }
        let seg = m.segments();
        let mut text = Vec::with_capacity(m.text.len() + 32);
        text.extend_from_slice(seg.before);
        paint(&mut text, seg.query, Color::BrightRed);
        text.extend_from_slice(seg.between);
        paint(&mut text, seg.result, Color::BrightGreen);
        text.extend_from_slice(seg.after);
        text
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out
    }
}

/// Appends `span` wrapped in the escape codes for `color`, keeping its bytes as they are
fn paint(text: &mut Vec<u8>, span: &[u8], color: Color) {
    if span.is_empty() {
        return;
    }
    text.extend_from_slice(format!("\x1b[{}m", color.to_fg_str()).as_bytes());
    text.extend_from_slice(span);
    text.extend_from_slice(b"\x1b[0m");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn maintainer() -> Match {
        Match {
            text: b"MAINTAINER=\tports@FreeBSD.org\n".to_vec(),
            query_span: Some(0..10),
            result_span: Some(12..18),
        }
    }

    fn output(f: TextFormatter<Vec<u8>>) -> String {
        String::from_utf8(f.into_inner()).unwrap()
    }

    fn options() -> FormatOptions {
        FormatOptions {
            strip_root: true,
            ..FormatOptions::default()
        }
    }

    #[test]
    fn test_matches_with_stripped_root() {
        let mut f = TextFormatter::new(Vec::new(), "/usr/ports", options());
        f.format(Path::new("/usr/ports/shells/bash"), &[maintainer()]).unwrap();
        assert_eq!(output(f), "shells/bash:\nMAINTAINER=\tports@FreeBSD.org\n");
    }

    #[test]
    fn test_root_kept_without_strip() {
        let mut f = TextFormatter::new(Vec::new(), "/usr/ports", FormatOptions::default());
        f.format(Path::new("/usr/ports/shells/bash"), &[]).unwrap();
        assert_eq!(output(f), "/usr/ports/shells/bash:\n");
    }

    #[test]
    fn test_origins_only() {
        let opts = FormatOptions {
            origins_only: true,
            ..options()
        };
        let mut f = TextFormatter::new(Vec::new(), "/usr/ports/", opts);
        f.format(Path::new("/usr/ports/shells/bash"), &[maintainer()]).unwrap();
        f.format(Path::new("/usr/ports/lang/go"), &[]).unwrap();
        f.finish().unwrap();
        assert_eq!(output(f), "shells/bash\nlang/go\n");
    }

    #[test]
    fn test_single_line() {
        let opts = FormatOptions {
            single_line: true,
            ..options()
        };
        let mut f = TextFormatter::new(Vec::new(), "/usr/ports", opts);
        f.format(Path::new("/usr/ports/shells/bash"), &[]).unwrap();
        f.format(Path::new("/usr/ports/lang/go"), &[]).unwrap();
        f.finish().unwrap();
        assert_eq!(output(f), "shells/bash lang/go\n");
    }

    #[test]
    fn test_indent_and_missing_newline() {
        let m = Match {
            text: b"USES=\\\n\tgo".to_vec(),
            query_span: Some(0..4),
            result_span: Some(8..10),
        };
        let mut f = TextFormatter::new(Vec::new(), "/usr/ports", options()).with_indent("  ");
        f.format(Path::new("/usr/ports/lang/go"), &[m.clone()]).unwrap();
        assert_eq!(output(f), "lang/go:\n  USES=\\\n  \tgo\n");

        let mut f = TextFormatter::new(Vec::new(), "/usr/ports", options());
        f.format(Path::new("/usr/ports/lang/go"), &[m]).unwrap();
        assert_eq!(output(f), "lang/go:\nUSES=\\\n\tgo\n");
    }

    #[test]
    fn test_color_spans() {
        let opts = FormatOptions {
            color: true,
            ..options()
        };
        let mut f = TextFormatter::new(Vec::new(), "/usr/ports", opts);
        f.format(Path::new("/usr/ports/shells/bash"), &[maintainer()]).unwrap();
        assert_eq!(
            output(f),
            "shells/bash:\n\x1b[91mMAINTAINER\x1b[0m=\t\x1b[92mports@\x1b[0mFreeBSD.org\n"
        );
    }

    #[test]
    fn test_color_keeps_raw_bytes() {
        let opts = FormatOptions {
            color: true,
            ..options()
        };
        let m = Match {
            text: b"MAINTAINER=\tjos\xe9@example.org\n".to_vec(),
            query_span: Some(0..10),
            result_span: Some(12..16),
        };
        let mut f = TextFormatter::new(Vec::new(), "/usr/ports", opts);
        f.format(Path::new("/usr/ports/shells/bash"), &[m]).unwrap();
        assert_eq!(
            f.into_inner(),
            b"shells/bash:\n\x1b[91mMAINTAINER\x1b[0m=\t\x1b[92mjos\xe9\x1b[0m@example.org\n"
        );
    }
}
