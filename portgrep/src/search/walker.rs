use crossbeam_channel::Sender;
use rayon::ThreadPool;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

use super::gate::Gate;
use crate::errors::{GrepError, GrepResult};
use crate::filters::CategoryFilter;
use crate::metrics::GrepMetrics;

/// One item produced by the walk: a port directory, or a category that
/// could not be listed
pub type WalkItem = GrepResult<PathBuf>;

/// Lists the category directories under `root` that pass `filter`.
///
/// Only real directories count; symlinks are not followed. Categories are
/// returned in name order.
pub fn read_categories(root: &Path, filter: &CategoryFilter) -> GrepResult<Vec<PathBuf>> {
    let mut categories = Vec::new();
    for entry in fs::read_dir(root).map_err(|e| GrepError::root(root, e))? {
        let entry = entry.map_err(|e| GrepError::root(root, e))?;
        if !entry.file_type().map_err(|e| GrepError::root(root, e))?.is_dir() {
            continue;
        }
        let name = entry.file_name();
        match name.to_str() {
            Some(name) if filter.should_descend(name) => categories.push(entry.path()),
            _ => {}
        }
    }
    categories.sort();
    debug!("Found {} categories under {}", categories.len(), root.display());
    Ok(categories)
}

/// Lists the port directories of one category, in name order
pub fn read_entries(category: &Path) -> io::Result<Vec<PathBuf>> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(category)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            entries.push(entry.path());
        }
    }
    entries.sort();
    Ok(entries)
}

/// Scans `categories` on `pool`, sending every port directory to `out`.
///
/// At most as many categories are scanned at once as `gate` has permits.
/// Returns once every scan has finished, which happens early when `cancel`
/// is set or `out` is disconnected.
pub fn walk(
    categories: &[PathBuf],
    pool: &ThreadPool,
    gate: &Gate,
    out: &Sender<WalkItem>,
    cancel: &AtomicBool,
    metrics: &GrepMetrics,
) {
    pool.in_place_scope(|scope| {
        for category in categories {
            if cancel.load(Ordering::Relaxed) {
                debug!("Walk cancelled before {}", category.display());
                break;
            }
            let permit = gate.acquire();
            scope.spawn(move |_| {
                let _permit = permit;
                if !cancel.load(Ordering::Relaxed) {
                    scan_category(category, out, cancel, metrics);
                }
            });
        }
    });
}

fn scan_category(
    category: &Path,
    out: &Sender<WalkItem>,
    cancel: &AtomicBool,
    metrics: &GrepMetrics,
) {
    let entries = match read_entries(category) {
        Ok(entries) => entries,
        Err(e) => {
            debug!("Failed to scan category {}: {}", category.display(), e);
            let _ = out.send(Err(GrepError::walk(category, e)));
            return;
        }
    };
    metrics.record_category(entries.len() as u64);

    for entry in entries {
        if cancel.load(Ordering::Relaxed) || out.send(Ok(entry)).is_err() {
            break;
        }
    }
}
