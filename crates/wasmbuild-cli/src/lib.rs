//! wasmbuild - build, serve and live-reload Go WebAssembly programs.
//!
//! This crate provides the `wasmbuild` command-line tool. It compiles a Go
//! main package for `GOOS=js GOARCH=wasm`, bundles the result with the
//! toolchain's `wasm_exec.js` and a bootstrap page, and either writes
//! everything to a directory or serves it with live reload.
//!
//! # Architecture
//!
//! - [`config`] - Project manifest (`wasmbuild.yaml`) loading
//! - [`context`] - Everything a compile needs, resolved once at startup
//! - [`compiler`] - Runs the toolchain and captures its diagnostics
//! - [`deps`] - Discovers the in-module packages a build depends on
//! - [`dev`] - Change watcher, broadcaster and HTTP server
//! - [`commands`] - The `build`, `serve` and `dep` subcommands
//! - [`error`] - Error types with actionable messages
//! - [`logger`] - Structured logging with tracing
//! - [`ui`] - Terminal status lines and spinners
//!
//! # Example
//!
//! ```rust
//! use wasmbuild_cli::{error::Result, logger};
//!
//! fn main() -> Result<()> {
//!     logger::init_logger(false, false, false);
//!     // CLI command implementations...
//!     Ok(())
//! }
//! ```

// Public modules
pub mod cli;
pub mod commands;
pub mod compiler;
pub mod config;
pub mod context;
pub mod deps;
pub mod dev;
pub mod embed;
pub mod error;
pub mod file;
pub mod logger;
pub mod ui;

// Re-export commonly used types
pub use error::{BuildError, CliError, ConfigError, DependencyError, Result, ResultExt};
