//! Logging infrastructure for the wasmbuild CLI.
//!
//! This module provides a structured logging setup using the `tracing` ecosystem.
//! Log lines go to stderr; stdout is reserved for command output (the build
//! directory, the server URL, dependency paths).
//!
//! # Features
//!
//! - **Verbosity control**: `--verbose` for debug, `--quiet` for errors only
//! - **Color support**: Automatic detection with `--no-color` override
//! - **Environment filters**: Override via `RUST_LOG` environment variable
//!
//! # Example
//!
//! ```rust,no_run
//! use wasmbuild_cli::logger::init_logger;
//! use tracing::{info, debug};
//!
//! init_logger(false, false, false);
//!
//! info!("Starting build");
//! debug!("Watching {} paths", 3);
//! ```

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Default directives when neither a flag nor `RUST_LOG` is given.
pub const DEFAULT_FILTER: &str = "wasmbuild_cli=warn";

/// Filter directives for the verbosity flags, or `None` to defer to
/// `RUST_LOG`.
///
/// `--verbose` wins over `--quiet`.
pub fn filter_directives(verbose: bool, quiet: bool) -> Option<&'static str> {
    if verbose {
        Some("wasmbuild_cli=debug,tower_http=debug")
    } else if quiet {
        Some("wasmbuild_cli=error")
    } else {
        None
    }
}

/// Initialize the tracing subscriber with the specified options.
///
/// This function sets up structured logging for the CLI. It should be called
/// once at the start of the program, before any logging occurs.
///
/// # Verbosity Levels
///
/// The logging level is determined in this order:
/// 1. `--verbose` flag: DEBUG for wasmbuild and request tracing
/// 2. `--quiet` flag: ERROR only
/// 3. `RUST_LOG` environment variable: Custom filter
/// 4. Default: INFO for wasmbuild
pub fn init_logger(verbose: bool, quiet: bool, no_color: bool) {
    let filter = match filter_directives(verbose, quiet) {
        Some(directives) => EnvFilter::new(directives),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
    };

    init_logger_with_filter(filter, no_color);
}

/// Initialize logger with custom environment filter.
///
/// This is useful for testing or advanced scenarios where you need precise
/// control over log filtering.
pub fn init_logger_with_filter(filter: EnvFilter, no_color: bool) {
    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .with_ansi(!no_color && crate::ui::should_use_color())
        .compact();

    // A second initialization (e.g. from tests) is harmless
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_directives() {
        assert_eq!(filter_directives(false, false), None);
        assert_eq!(filter_directives(false, true), Some("wasmbuild_cli=error"));
        assert_eq!(
            filter_directives(true, false),
            Some("wasmbuild_cli=debug,tower_http=debug")
        );
        assert_eq!(
            filter_directives(true, true),
            Some("wasmbuild_cli=debug,tower_http=debug")
        );
    }

    #[test]
    fn test_directives_parse() {
        for directives in [
            DEFAULT_FILTER,
            "wasmbuild_cli=error",
            "wasmbuild_cli=debug,tower_http=debug",
        ] {
            assert!(EnvFilter::try_new(directives).is_ok(), "{directives}");
        }
    }

    #[test]
    fn test_init_twice_does_not_panic() {
        init_logger(false, true, true);
        init_logger(true, false, true);
    }
}
