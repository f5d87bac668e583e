//! Miette diagnostic conversion for CLI errors.
//!
//! This module provides conversion from CLI errors to miette diagnostics
//! for readable error reporting at exit.

use crate::error::{BuildError, CliError, ConfigError};
use miette::Report;

/// Convert CliError to miette Report
pub fn cli_error_to_miette(err: CliError) -> Report {
    match err {
        CliError::Build(e) => build_error_to_miette(e),
        CliError::Config(e) => config_error_to_miette(e),
        _ => miette::miette!("{}", err),
    }
}

/// Convert BuildError to miette Report
pub fn build_error_to_miette(err: BuildError) -> Report {
    match err {
        BuildError::CompilationFailed { status, stderr } => {
            miette::miette!(
                help = "Fix the reported errors and run the command again",
                "Compilation failed ({})\n\n{}",
                status,
                stderr.trim_end()
            )
        }
        BuildError::ToolchainNotFound { program, source } => {
            miette::miette!(
                help = "Install Go or point --go at the executable",
                "Toolchain not found: {} ({})",
                program,
                source
            )
        }
        _ => miette::miette!("{}", err),
    }
}

/// Convert ConfigError to miette Report
pub fn config_error_to_miette(err: ConfigError) -> Report {
    miette::miette!("Configuration error: {}", err)
}
