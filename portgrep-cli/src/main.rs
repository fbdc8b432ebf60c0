mod formatter;

use anyhow::{bail, Context as _, Result};
use clap::{Arg, ArgAction, ArgMatches, CommandFactory, FromArgMatches, Parser, ValueEnum};
use portgrep::pattern::{Bindings, PatternKind, BUILTIN};
use portgrep::{grep, GrepConfig, GrepError, Matches, MatchMode};
use std::io::{self, IsTerminal};
use std::num::NonZeroUsize;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use formatter::{FormatOptions, TextFormatter};

const SEARCH_HEADING: &str = "Search options";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ColorMode {
    Auto,
    Never,
    Always,
}

/// Search FreeBSD ports Makefiles
#[derive(Parser, Debug)]
#[command(name = "portgrep", author, version, about, long_about = None)]
struct Cli {
    /// Ports tree root (default: $PORTSDIR or /usr/ports)
    #[arg(short = 'R', long)]
    root: Option<PathBuf>,

    /// Colorized output mode
    #[arg(short = 'C', long, value_enum, default_value = "auto")]
    color: ColorMode,

    /// Output origins only
    #[arg(short = 'o', long)]
    origins_only: bool,

    /// Output origins in a single line (implies -o)
    #[arg(short = '1', long)]
    single_line: bool,

    /// Sort results by origin
    #[arg(short = 's', long)]
    sort: bool,

    /// Indent match text with this string
    #[arg(long)]
    indent: Option<String>,

    /// Treat queries as regular expressions
    #[arg(short = 'x', long, help_heading = SEARCH_HEADING)]
    regex: bool,

    /// Report ports matching any query instead of all of them
    #[arg(short = 'O', long = "or", help_heading = SEARCH_HEADING)]
    any: bool,

    /// Search only this category (can be specified multiple times)
    #[arg(short = 'c', long = "category", help_heading = SEARCH_HEADING)]
    categories: Vec<String>,

    /// Search the whole Makefile for text (can be specified multiple times)
    #[arg(short = 't', long = "text", value_name = "QUERY", help_heading = SEARCH_HEADING)]
    texts: Vec<String>,

    /// Number of context lines after each match
    #[arg(short = 'A', long, help_heading = SEARCH_HEADING)]
    context_after: Option<usize>,

    /// Number of context lines before each match
    #[arg(short = 'B', long, help_heading = SEARCH_HEADING)]
    context_before: Option<usize>,

    /// Number of parallel jobs
    #[arg(short = 'j', long)]
    jobs: Option<NonZeroUsize>,

    /// Configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,
}

/// Adds one option per registry pattern: single letter selectors become
/// short options, longer ones long options
fn with_registry_args(mut cmd: clap::Command) -> clap::Command {
    for pattern in BUILTIN.iter() {
        let mut arg = Arg::new(pattern.flag)
            .help(pattern.description)
            .help_heading(SEARCH_HEADING);
        arg = match pattern.flag.chars().collect::<Vec<_>>()[..] {
            [c] => arg.short(c),
            _ => arg.long(pattern.flag),
        };
        arg = match pattern.kind {
            PatternKind::Query => arg.value_name("QUERY").action(ArgAction::Set),
            PatternKind::Flag => arg.action(ArgAction::SetTrue),
        };
        cmd = cmd.arg(arg);
    }
    cmd.after_long_help(format!("Field patterns:\n{}", BUILTIN.usage()))
}

fn bindings(matches: &ArgMatches, cli: &Cli) -> Result<Bindings> {
    let mut bindings = Bindings::new();
    for pattern in BUILTIN.iter() {
        match pattern.kind {
            PatternKind::Query => {
                if let Some(value) = matches.get_one::<String>(pattern.flag) {
                    BUILTIN.bind(&mut bindings, pattern.flag, value.as_str())?;
                }
            }
            PatternKind::Flag => {
                if matches.get_flag(pattern.flag) {
                    BUILTIN.enable(&mut bindings, pattern.flag)?;
                }
            }
        }
    }
    for text in &cli.texts {
        bindings.add_text(text.as_str())?;
    }
    Ok(bindings)
}

/// Applies command line options on top of the loaded configuration
fn merge_with_cli(config: &mut GrepConfig, cli: &Cli) -> Result<()> {
    if let Some(root) = &cli.root {
        config.root_path = root.clone();
    } else if let Some(root) = std::env::var_os("PORTSDIR").filter(|r| !r.is_empty()) {
        config.root_path = PathBuf::from(root);
    }
    if config.root_path.as_os_str().is_empty() {
        bail!("ports tree root cannot be blank");
    }
    if !cli.categories.is_empty() {
        config.categories = cli.categories.clone();
    }
    if let Some(jobs) = cli.jobs {
        config.thread_count = jobs;
    }
    if cli.any {
        config.mode = MatchMode::Or;
    }
    if cli.regex {
        config.is_regex = true;
    }
    if let Some(after) = cli.context_after {
        config.context_after = after;
    }
    if let Some(before) = cli.context_before {
        config.context_before = before;
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    Ok(())
}

fn init_logging(level: &str) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level)
            .with_context(|| format!("invalid log level {:?}", level))?,
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
    Ok(())
}

fn main() -> Result<ExitCode> {
    let matches = with_registry_args(Cli::command()).get_matches();
    let cli = Cli::from_arg_matches(&matches).unwrap_or_else(|e| e.exit());

    let mut config = GrepConfig::load_from(cli.config.as_deref())
        .context("failed to load configuration")?;
    merge_with_cli(&mut config, &cli)?;
    init_logging(&config.log_level)?;

    let bindings = bindings(&matches, &cli)?;
    let regexps = BUILTIN.compile(&bindings, config.context(), config.is_regex)?;
    debug!("Compiled {} queries", regexps.len());

    let color = match cli.color {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal(),
    };

    let options = FormatOptions {
        color,
        origins_only: cli.origins_only || cli.single_line || bindings.is_empty(),
        single_line: cli.single_line,
        strip_root: true,
    };
    let mut out = TextFormatter::new(io::stdout().lock(), &config.root_path, options);
    if let Some(indent) = &cli.indent {
        out = out.with_indent(indent.as_str());
    }

    let mut failed = false;
    let mut report = |path: &Path, err: GrepError| {
        debug!("Error reported for {}", path.display());
        eprintln!("portgrep: {}", err);
        failed = true;
    };

    if cli.sort {
        let mut found: Vec<(PathBuf, Matches)> = Vec::new();
        grep(&config, &regexps, |path, res| {
            match res {
                Ok(matches) => found.push((path.to_path_buf(), matches)),
                Err(e) => report(path, e),
            }
            Ok(ControlFlow::Continue(()))
        })?;
        found.sort_by(|a, b| a.0.cmp(&b.0));
        for (path, matches) in &found {
            out.format(path, matches)?;
        }
    } else {
        grep(&config, &regexps, |path, res| {
            match res {
                Ok(matches) => out.format(path, &matches)?,
                Err(e) => report(path, e),
            }
            Ok(ControlFlow::Continue(()))
        })?;
    }
    out.finish()?;

    Ok(if failed { ExitCode::FAILURE } else { ExitCode::SUCCESS })
}
