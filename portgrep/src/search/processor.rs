use std::fs::{self, File};
use std::io::{self, Read};
use std::path::Path;
use tracing::trace;

use super::buffers::BufferPool;
use crate::config::MatchMode;
use crate::errors::{GrepError, GrepResult};
use crate::filters::METADATA_FILE;
use crate::metrics::GrepMetrics;
use crate::pattern::Regexp;
use crate::results::Matches;

/// Bytes standing in for a folded `\` + newline. Neither occurs in a Makefile.
const FOLDED: [u8; 2] = [0, 0];
const CONTINUATION: [u8; 2] = [b'\\', b'\n'];

/// Replaces every backslash-newline continuation with the folding sentinel.
///
/// Folding keeps the length of `buf`, so offsets into folded content are
/// offsets into the original file.
pub fn fold_continuations(buf: &mut [u8]) {
    replace_pairs(buf, CONTINUATION, FOLDED);
}

/// Reverses [`fold_continuations`]
pub fn unfold_continuations(buf: &mut [u8]) {
    replace_pairs(buf, FOLDED, CONTINUATION);
}

fn replace_pairs(buf: &mut [u8], from: [u8; 2], to: [u8; 2]) {
    let mut i = 0;
    while i + 1 < buf.len() {
        if buf[i] == from[0] && buf[i + 1] == from[1] {
            buf[i] = to[0];
            buf[i + 1] = to[1];
            i += 2;
        } else {
            i += 1;
        }
    }
}

/// Applies `regexps` to folded Makefile content.
///
/// In [`MatchMode::And`] the first query that fails to match rejects the
/// port and the remaining queries are not evaluated. In [`MatchMode::Or`]
/// every query is evaluated. Either way the returned matches keep the order
/// of `regexps`, and `None` means the port did not match.
pub fn match_content(
    regexps: &[Regexp],
    mode: MatchMode,
    content: &[u8],
) -> GrepResult<Option<Matches>> {
    let mut matches = Vec::with_capacity(regexps.len());
    for re in regexps {
        match re.find(content)? {
            Some(m) => matches.push(m),
            None if mode == MatchMode::And => return Ok(None),
            None => {}
        }
    }
    Ok((!matches.is_empty()).then_some(matches))
}

/// Reads and matches one port's Makefile
#[derive(Debug)]
pub struct PortProcessor<'a> {
    regexps: &'a [Regexp],
    mode: MatchMode,
    pool: &'a BufferPool,
    metrics: &'a GrepMetrics,
}

impl<'a> PortProcessor<'a> {
    pub fn new(
        regexps: &'a [Regexp],
        mode: MatchMode,
        pool: &'a BufferPool,
        metrics: &'a GrepMetrics,
    ) -> Self {
        Self {
            regexps,
            mode,
            pool,
            metrics,
        }
    }

    /// Processes the port directory at `port`.
    ///
    /// Returns `Ok(None)` when the port has no Makefile or does not match.
    /// With no queries at all every port that has a Makefile matches with an
    /// empty match list.
    pub fn process(&self, port: &Path) -> GrepResult<Option<Matches>> {
        let path = port.join(METADATA_FILE);

        if self.regexps.is_empty() {
            return match fs::metadata(&path) {
                Ok(meta) if meta.is_file() => Ok(Some(Vec::new())),
                Ok(_) => Ok(None),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    self.metrics.record_missing();
                    Ok(None)
                }
                Err(e) => Err(GrepError::read(path, e)),
            };
        }

        let mut buf = self.pool.get();
        match read_into(&path, &mut buf) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                trace!("No Makefile in {}", port.display());
                self.metrics.record_missing();
                return Ok(None);
            }
            Err(e) => return Err(GrepError::read(path, e)),
        }
        self.metrics.record_read(buf.len() as u64);

        fold_continuations(&mut buf);
        let mut matches = match match_content(self.regexps, self.mode, &buf)? {
            Some(matches) => matches,
            None => return Ok(None),
        };
        for m in &mut matches {
            unfold_continuations(&mut m.text);
        }

        trace!("{} matches in {}", matches.len(), path.display());
        Ok(Some(matches))
    }
}

fn read_into(path: &Path, buf: &mut Vec<u8>) -> io::Result<()> {
    let mut file = File::open(path)?;
    let size = file.metadata().map(|m| m.len() as usize).unwrap_or(0);
    buf.reserve(size + 1);
    file.read_to_end(buf)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BufferRetention;
    use crate::pattern::{Bindings, Context, BUILTIN};
    use tempfile::tempdir;

    fn compile(bind: &[(&str, &str)]) -> Vec<Regexp> {
        let mut bindings = Bindings::new();
        for (flag, value) in bind {
            BUILTIN.bind(&mut bindings, flag, *value).unwrap();
        }
        BUILTIN.compile(&bindings, Context::default(), false).unwrap()
    }

    fn folded(content: &str) -> Vec<u8> {
        let mut buf = content.as_bytes().to_vec();
        fold_continuations(&mut buf);
        buf
    }

    const MAKEFILE: &str = "PORTNAME=\tfoo\n\
                            MAINTAINER=\tports@FreeBSD.org\n\
                            BUILD_DEPENDS=\tdash:shells/dash \\\n\
                            \t\tbash:shells/bash\n\
                            USES=\tgmake go\n";

    #[test]
    fn test_fold_round_trip() {
        let original = b"A=\\\n\tb \\\n\tc\nD=\\\\\n".to_vec();
        let mut buf = original.clone();
        fold_continuations(&mut buf);
        assert_eq!(buf, b"A=\0\0\tb \0\0\tc\nD=\\\0\0".to_vec());
        unfold_continuations(&mut buf);
        assert_eq!(buf, original);
    }

    #[test]
    fn test_and_mode_requires_all() {
        let content = folded(MAKEFILE);
        let res = match_content(&compile(&[("m", "ports@"), ("u", "go")]), MatchMode::And, &content)
            .unwrap()
            .unwrap();
        assert_eq!(res.len(), 2);
        assert_eq!(res[0].query(), Some(&b"MAINTAINER"[..]));
        assert_eq!(res[1].query(), Some(&b"USES"[..]));

        let regexps = compile(&[("m", "ports@"), ("u", "cargo")]);
        let res = match_content(&regexps, MatchMode::And, &content).unwrap();
        assert!(res.is_none());
    }

    #[test]
    fn test_or_mode_keeps_matching_subset() {
        let content = folded(MAKEFILE);
        let regexps = compile(&[("m", "nobody@"), ("u", "go")]);
        let res = match_content(&regexps, MatchMode::Or, &content).unwrap().unwrap();
        assert_eq!(res.len(), 1);
        assert_eq!(res[0].result(), Some(&b"go"[..]));

        let regexps = compile(&[("m", "nobody@"), ("u", "cargo")]);
        assert!(match_content(&regexps, MatchMode::Or, &content).unwrap().is_none());
    }

    #[test]
    fn test_continuation_is_restored() {
        let content = folded("BUILD_DEPENDS=\\\n\tbash:shells/bash\n");
        let mut res = match_content(&compile(&[("d", "bash")]), MatchMode::And, &content)
            .unwrap()
            .unwrap();
        unfold_continuations(&mut res[0].text);
        assert_eq!(res[0].text, b"BUILD_DEPENDS=\\\n\tbash:shells/bash\n");
        assert_eq!(res[0].result(), Some(&b"bash"[..]));
    }

    #[test]
    fn test_process_port() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("Makefile"), MAKEFILE).unwrap();

        let regexps = compile(&[("db", "bash")]);
        let pool = BufferPool::new(BufferRetention::Retain, 1);
        let metrics = GrepMetrics::new();
        let processor = PortProcessor::new(&regexps, MatchMode::And, &pool, &metrics);

        let res = processor.process(dir.path()).unwrap().unwrap();
        assert_eq!(res.len(), 1);
        let text = &res[0].text;
        assert!(text.starts_with(b"BUILD_DEPENDS="));
        assert!(text.windows(2).any(|w| w == b"\\\n"));
        assert!(!text.contains(&0));
        assert_eq!(res[0].result(), Some(&b"bash"[..]));
        assert_eq!(metrics.get_stats().makefiles_read, 1);
        assert_eq!(pool.idle(), 1);
    }

    #[test]
    fn test_missing_makefile_is_skipped() {
        let dir = tempdir().unwrap();
        let regexps = compile(&[("u", "go")]);
        let pool = BufferPool::new(BufferRetention::Retain, 1);
        let metrics = GrepMetrics::new();
        let processor = PortProcessor::new(&regexps, MatchMode::And, &pool, &metrics);

        assert!(processor.process(dir.path()).unwrap().is_none());
        assert_eq!(metrics.get_stats().makefiles_missing, 1);

        let processor = PortProcessor::new(&[], MatchMode::And, &pool, &metrics);
        assert!(processor.process(dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_unreadable_makefile_is_an_error() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("Makefile")).unwrap();
        let regexps = compile(&[("u", "go")]);
        let pool = BufferPool::new(BufferRetention::Retain, 1);
        let metrics = GrepMetrics::new();
        let processor = PortProcessor::new(&regexps, MatchMode::And, &pool, &metrics);

        let err = processor.process(dir.path()).unwrap_err();
        assert!(matches!(err, GrepError::Read { .. }));
    }

    #[test]
    fn test_no_queries_lists_port() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("Makefile"), MAKEFILE).unwrap();
        let pool = BufferPool::new(BufferRetention::Retain, 1);
        let metrics = GrepMetrics::new();
        let processor = PortProcessor::new(&[], MatchMode::And, &pool, &metrics);

        assert_eq!(processor.process(dir.path()).unwrap(), Some(Vec::new()));
    }
}
