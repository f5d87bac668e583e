//! Command-line interface definition for wasmbuild.
//!
//! This module defines the complete CLI structure using clap v4's derive macros.
//!
//! # Command Structure
//!
//! - `wasmbuild build` - Compile a source root to a WebAssembly bundle on disk
//! - `wasmbuild serve` - Serve the bundle, optionally rebuilding on change
//! - `wasmbuild dep` - List (or watch) the paths a build depends on

mod commands;
mod validation;

use clap::{Args, Parser};
use std::path::PathBuf;

use crate::config::{DEFAULT_MANIFEST, DEFAULT_TOOLCHAIN, DEFAULT_WASM_EXEC};

pub use commands::{BuildArgs, Command, DepArgs, ServeArgs};
pub use validation::{parse_base_path, parse_listen};

/// wasmbuild - Build, serve and live-reload Go WebAssembly applications
#[derive(Parser, Debug)]
#[command(
    name = "wasmbuild",
    version,
    about = "Build, serve and live-reload Go WebAssembly applications",
    long_about = "wasmbuild compiles a Go program for the js/wasm target, pairs it with the\n\
                  toolchain's wasm_exec.js and a bootstrap page, and can serve the result with\n\
                  live reload whenever a source file in the module changes."
)]
pub struct Cli {
    #[command(flatten)]
    pub toolchain: ToolchainOptions,

    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    ///
    /// Outputs plain text without ANSI color codes. Useful for logging to
    /// files or systems that don't support colored terminal output.
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Toolchain and manifest settings shared by every command.
#[derive(Args, Debug, Clone)]
pub struct ToolchainOptions {
    /// Go toolchain executable (name on PATH or a path)
    #[arg(long, global = true, value_name = "PATH", default_value = DEFAULT_TOOLCHAIN)]
    pub go: PathBuf,

    /// Toolchain install root (defaults to $GOROOT, then `go env GOROOT`)
    #[arg(long, global = true, value_name = "DIR")]
    pub goroot: Option<PathBuf>,

    /// Extra flags passed to `go build`, whitespace separated
    ///
    /// Example: --go-flags "-tags dev -trimpath"
    #[arg(long, global = true, value_name = "FLAGS", allow_hyphen_values = true)]
    pub go_flags: Option<String>,

    /// Colon-separated search list for wasm_exec.js, relative to the toolchain root
    #[arg(long, global = true, value_name = "PATHS", default_value = DEFAULT_WASM_EXEC)]
    pub wasm_exec: String,

    /// Manifest path, relative to the source root unless absolute
    #[arg(long, global = true, value_name = "FILE", default_value = DEFAULT_MANIFEST)]
    pub config: PathBuf,
}

impl Default for ToolchainOptions {
    fn default() -> Self {
        Self {
            go: PathBuf::from(DEFAULT_TOOLCHAIN),
            goroot: None,
            go_flags: None,
            wasm_exec: DEFAULT_WASM_EXEC.to_string(),
            config: PathBuf::from(DEFAULT_MANIFEST),
        }
    }
}
