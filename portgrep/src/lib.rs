pub mod config;
pub mod errors;
pub mod filters;
pub mod metrics;
pub mod pattern;
pub mod results;
pub mod search;

pub use config::{BufferRetention, GrepConfig, MatchMode};
pub use errors::{GrepError, GrepResult};
pub use metrics::{GrepMetrics, GrepStats};
pub use pattern::{Bindings, Regexp, Registry, BUILTIN};
pub use results::{Match, Matches, Segments};
pub use search::{grep, grep_with_metrics};
