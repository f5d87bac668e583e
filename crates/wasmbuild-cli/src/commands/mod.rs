//! Command implementations for the wasmbuild CLI.
//!
//! - [`build`] - Compile once into a directory of static files
//! - [`serve`] - Serve over HTTP, optionally rebuilding on change
//! - [`dep`] - Print (or watch) the paths a build depends on
//!
//! Each command provides an `execute` function that takes the parsed
//! command arguments plus the global toolchain options.

pub mod build;
pub mod dep;
pub mod serve;
pub mod utils;

// Re-export execute functions for convenience
pub use build::execute as build_execute;
pub use dep::execute as dep_execute;
pub use serve::execute as serve_execute;
