/// Concurrent search over a ports tree.
///
/// A search runs as a two-stage pipeline joined by bounded channels:
///
/// 1. The **walk** lists the ports root, then scans every selected category
///    on its own thread pool, emitting one item per port directory.
/// 2. The **match** stage reads each port's Makefile into a pooled buffer,
///    folds line continuations and applies the compiled queries.
///
/// Each stage admits at most `thread_count` tasks at a time through a
/// [`Gate`](gate::Gate). The caller's callback consumes results on the
/// calling thread, and can stop the search at any point; stopping sets a
/// shared cancellation flag and disconnects the result channel so that no
/// worker is left blocked.
///
/// ```rust,no_run
/// use std::ops::ControlFlow;
/// use portgrep::{grep, GrepConfig};
/// use portgrep::pattern::{Bindings, Context, BUILTIN};
///
/// let mut bindings = Bindings::new();
/// BUILTIN.bind(&mut bindings, "u", "cargo")?;
/// let regexps = BUILTIN.compile(&bindings, Context::default(), false)?;
///
/// grep(&GrepConfig::new("/usr/ports"), &regexps, |port, res| {
///     println!("{} {}", port.display(), res?.len());
///     Ok(ControlFlow::Continue(()))
/// })?;
/// # Ok::<(), portgrep::GrepError>(())
/// ```
pub mod buffers;
pub mod engine;
pub mod gate;
pub mod processor;
pub mod walker;

pub use engine::{grep, grep_with_metrics};
pub use processor::{fold_continuations, unfold_continuations, PortProcessor};
pub use walker::{read_categories, read_entries};
