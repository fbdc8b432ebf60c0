use crossbeam_channel::{bounded, Receiver, Sender};
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::num::NonZeroUsize;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use tracing::{debug, info};

use super::buffers::BufferPool;
use super::gate::Gate;
use super::processor::PortProcessor;
use super::walker::{read_categories, walk, WalkItem};
use crate::config::GrepConfig;
use crate::errors::{GrepError, GrepResult};
use crate::filters::CategoryFilter;
use crate::metrics::GrepMetrics;
use crate::pattern::Regexp;
use crate::results::Matches;

/// A matching port or a per-port/per-category error, tagged with its path
type Outcome = (PathBuf, GrepResult<Matches>);

/// Searches the ports tree described by `config` for ports matching `regexps`.
///
/// `on_result` runs on the calling thread, once per matching port and once
/// per category or Makefile that could not be read. It can return
/// [`ControlFlow::Break`] to stop the search early, or an error which stops
/// the search and is returned from `grep`. Results arrive in no particular
/// order.
///
/// Only an unreadable ports root or a failure to start the worker threads
/// makes `grep` itself fail; those are reported before any result.
pub fn grep<F>(config: &GrepConfig, regexps: &[Regexp], on_result: F) -> GrepResult<()>
where
    F: FnMut(&Path, GrepResult<Matches>) -> GrepResult<ControlFlow<()>>,
{
    grep_with_metrics(config, regexps, &GrepMetrics::new(), on_result)
}

/// Same as [`grep`], recording counters into `metrics`
pub fn grep_with_metrics<F>(
    config: &GrepConfig,
    regexps: &[Regexp],
    metrics: &GrepMetrics,
    mut on_result: F,
) -> GrepResult<()>
where
    F: FnMut(&Path, GrepResult<Matches>) -> GrepResult<ControlFlow<()>>,
{
    info!(
        "Starting search in {} with {} queries",
        config.root_path.display(),
        regexps.len()
    );

    let filter = CategoryFilter::new(config.categories.iter().cloned());
    let categories = read_categories(&config.root_path, &filter)?;

    let jobs = config.thread_count;
    let walk_pool = build_pool("portgrep-walk", jobs)?;
    let match_pool = build_pool("portgrep-match", jobs)?;
    let walk_gate = Gate::new(jobs);
    let match_gate = Gate::new(jobs);
    let buffers = BufferPool::new(config.buffer_retention, jobs.get());
    let processor = PortProcessor::new(regexps, config.mode, &buffers, metrics);
    let cancel = AtomicBool::new(false);

    let (walk_tx, walk_rx) = bounded::<WalkItem>(jobs.get());
    let (out_tx, out_rx) = bounded::<Outcome>(jobs.get());

    let result = thread::scope(|s| -> GrepResult<()> {
        let cancel = &cancel;
        let (walk_pool, walk_gate) = (&walk_pool, &walk_gate);
        let (match_pool, match_gate, processor) = (&match_pool, &match_gate, &processor);
        let categories = &categories;

        let _walker = thread::Builder::new()
            .name("portgrep-walk".to_string())
            .spawn_scoped(s, move || {
                walk(categories, walk_pool, walk_gate, &walk_tx, cancel, metrics);
                debug!("Walk finished");
            })?;
        let _matcher = thread::Builder::new()
            .name("portgrep-match".to_string())
            .spawn_scoped(s, move || {
                dispatch(walk_rx, match_pool, match_gate, processor, &out_tx, cancel);
                debug!("Matching finished");
            })?;

        let mut result = Ok(());
        for (path, outcome) in &out_rx {
            match &outcome {
                Ok(_) => metrics.record_match(),
                Err(e) => {
                    debug!("Reporting error for {}: {}", path.display(), e);
                    metrics.record_error();
                }
            }
            match on_result(&path, outcome) {
                Ok(ControlFlow::Continue(())) => {}
                Ok(ControlFlow::Break(())) => {
                    debug!("Search stopped by caller");
                    break;
                }
                Err(e) => {
                    result = Err(e);
                    break;
                }
            }
        }

        // Blocked workers see a disconnected channel and wind down
        cancel.store(true, Ordering::Relaxed);
        drop(out_rx);
        result
    });

    metrics.log_stats();
    result
}

/// Hands every walked port to a matching task on `pool`, forwarding walk
/// errors unchanged
fn dispatch(
    walk_rx: Receiver<WalkItem>,
    pool: &ThreadPool,
    gate: &Gate,
    processor: &PortProcessor<'_>,
    out: &Sender<Outcome>,
    cancel: &AtomicBool,
) {
    pool.in_place_scope(move |scope| {
        for item in &walk_rx {
            if cancel.load(Ordering::Relaxed) {
                break;
            }
            let port = match item {
                Ok(port) => port,
                Err(e) => {
                    let path = e.path().map(Path::to_path_buf).unwrap_or_default();
                    if out.send((path, Err(e))).is_err() {
                        break;
                    }
                    continue;
                }
            };

            let permit = gate.acquire();
            scope.spawn(move |_| {
                let _permit = permit;
                if cancel.load(Ordering::Relaxed) {
                    return;
                }
                let outcome = match processor.process(&port) {
                    Ok(Some(matches)) => Ok(matches),
                    Ok(None) => return,
                    Err(e) => Err(e),
                };
                let _ = out.send((port, outcome));
            });
        }
        // Lets a walker blocked on a full channel finish
        drop(walk_rx);
    });
}

fn build_pool(name: &'static str, jobs: NonZeroUsize) -> GrepResult<ThreadPool> {
    ThreadPoolBuilder::new()
        .num_threads(jobs.get())
        .thread_name(move |i| format!("{}-{}", name, i))
        .build()
        .map_err(GrepError::from)
}
