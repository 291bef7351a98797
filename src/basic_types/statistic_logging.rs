//! Contains the functionality for logging statistics of the solving process.
//!
//! Statistic logging is disabled by default; a consumer of the library opts in by calling
//! [`configure_statistic_logging`] once, after which every statistic is written to standard
//! output prefixed by the configured marker.

use std::fmt::Display;

use once_cell::sync::OnceCell;

static STATISTIC_OPTIONS: OnceCell<StatisticOptions> = OnceCell::new();

#[derive(Debug, Clone, Copy)]
struct StatisticOptions {
    prefix: &'static str,
}

/// Enable statistic logging with the given line prefix (e.g. `"%%"` for MiniZinc-style comment
/// lines). Calling this more than once has no effect beyond the first call.
pub fn configure_statistic_logging(prefix: &'static str) {
    let _ = STATISTIC_OPTIONS.set(StatisticOptions { prefix });
}

/// Log a single statistic in the form `<prefix> <name>=<value>`; a no-op when statistic logging
/// has not been configured.
pub fn log_statistic(name: &str, value: impl Display) {
    if let Some(options) = STATISTIC_OPTIONS.get() {
        println!("{} {name}={value}", options.prefix);
    }
}
