//! Error handling for the wasmbuild CLI.
//!
//! This module provides a hierarchical error type system using `thiserror` for
//! structured error handling with actionable messages. Startup failures
//! (missing manifest, missing toolchain, unbindable address) are fatal and
//! reach `main`; runtime failures while watching are described to connected
//! browsers instead.
//!
//! # Architecture
//!
//! - **Top-level errors** (`CliError`) represent broad categories of failures
//! - **Domain-specific errors** (`ConfigError`, `BuildError`, `DependencyError`)
//!   provide detailed context
//! - **Error conversion** is automatic via `#[from]` attributes
//! - **Context helpers** allow attaching additional information to errors
//!
//! # Example
//!
//! ```rust,no_run
//! use wasmbuild_cli::error::{Result, ResultExt};
//! use std::path::Path;
//!
//! fn read_source(path: &Path) -> Result<String> {
//!     std::fs::read_to_string(path).with_path(path)
//! }
//! ```

mod miette;

pub use self::miette::cli_error_to_miette;

use std::path::PathBuf;
use thiserror::Error;

/// Top-level CLI error type.
///
/// This is the primary error type returned by CLI commands. It automatically
/// converts from domain-specific errors via `From` implementations.
#[derive(Debug, Error)]
pub enum CliError {
    /// Manifest resolution and parsing errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Toolchain, compilation and output errors
    #[error("Build error: {0}")]
    Build(#[from] BuildError),

    /// Dependency discovery errors
    #[error("Dependency error: {0}")]
    Dependency(#[from] DependencyError),

    /// Invalid command-line arguments or options
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// File or directory not found
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// I/O errors from file system operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The HTTP listener could not be bound
    #[error("Failed to listen on {addr}: {source}\n\nHint: Choose another address with --listen <host:port>")]
    ListenFailed {
        /// Address that was requested
        addr: String,
        /// Underlying socket error
        #[source]
        source: std::io::Error,
    },

    /// Development server errors
    #[error("Server error: {0}")]
    Server(String),

    /// File watching errors
    #[error("File watcher error: {0}")]
    Watch(#[from] notify::Error),

    /// Generic errors with custom messages
    #[error("{0}")]
    Custom(String),
}

impl CliError {
    /// Text delivered to browsers in a `build-error` message.
    ///
    /// Compilation failures are described by the compiler's own stderr so the
    /// browser overlay shows exactly what the terminal would.
    pub fn describe(&self) -> String {
        match self {
            CliError::Build(BuildError::CompilationFailed { stderr, .. })
                if !stderr.trim().is_empty() =>
            {
                stderr.clone()
            }
            other => other.to_string(),
        }
    }

    /// Whether this error is a compilation failure (as opposed to a setup problem).
    pub fn is_compilation_failure(&self) -> bool {
        matches!(self, CliError::Build(BuildError::CompilationFailed { .. }))
    }
}

/// Manifest errors.
///
/// These errors occur while locating and decoding `wasmbuild.yaml`.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Manifest doesn't exist at the expected location
    #[error("Config file not found: {}\n\nHint: Create a wasmbuild.yaml beside the source or specify --config <path>", .0.display())]
    NotFound(PathBuf),

    /// Manifest could not be decoded
    #[error("Malformed config in {source_name}: {message}\n\nHint: The manifest accepts two optional keys, 'vars' (a map of strings) and 'assets' (a list of paths)")]
    Malformed {
        /// Where the document came from (a path or "<stream>")
        source_name: String,
        /// Decoder message
        message: String,
    },

    /// Invalid value for a configuration option
    #[error("Invalid value for '{field}': {value}\n\nHint: {hint}")]
    InvalidValue {
        /// Name of the field with invalid value
        field: String,
        /// The invalid value
        value: String,
        /// Helpful hint for correct values
        hint: String,
    },

    /// I/O error while reading config
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// Manifest could not be encoded
    #[error("Failed to render config: {0}")]
    Render(#[from] serde_json::Error),
}

/// Build process errors.
///
/// These errors occur from toolchain resolution through to writing the
/// build output.
#[derive(Debug, Error)]
pub enum BuildError {
    /// Toolchain executable could not be located
    #[error("Toolchain not found: {program}: {source}\n\nHint: Install Go or point --go at the executable")]
    ToolchainNotFound {
        /// Program name or path that was looked up
        program: String,
        /// Lookup failure
        #[source]
        source: which::Error,
    },

    /// A query against the toolchain (such as `go env GOROOT`) failed
    #[error("Toolchain query `{command}` failed: {stderr}")]
    ToolchainQueryFailed {
        /// Rendered command line
        command: String,
        /// Captured diagnostics
        stderr: String,
    },

    /// Runtime glue script missing from the toolchain distribution
    #[error("Runtime glue (wasm_exec.js) not found under {}; searched:\n{}\n\nHint: Pass --wasm-exec <rel-path[:rel-path...]> relative to GOROOT", .root.display(), format_searched(.searched))]
    RuntimeMissing {
        /// Toolchain install root
        root: PathBuf,
        /// Candidate locations that were checked
        searched: Vec<PathBuf>,
    },

    /// The compiler exited unsuccessfully
    #[error("Compilation failed ({status})\n{stderr}")]
    CompilationFailed {
        /// Exit status description
        status: String,
        /// Captured standard error
        stderr: String,
    },

    /// An asset could not be read while producing the build output
    #[error("Failed to read asset {}: {source}\n\nHint: Check the 'assets' list in your manifest", .path.display())]
    AssetReadFailed {
        /// Asset path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Failed to write an output file
    #[error("Output directory is not writable: {}: {source}\n\nHint: Check directory permissions or specify a different --output", .path.display())]
    OutputNotWritable {
        /// Path that could not be written
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Bootstrap HTML template could not be rendered
    #[error("Failed to render bootstrap HTML: {0}")]
    TemplateFailed(String),
}

fn format_searched(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Dependency discovery errors.
#[derive(Debug, Error)]
pub enum DependencyError {
    /// The source root does not belong to a Go module
    #[error("{} is not part of a Go module; only the source root and assets will be watched", .0.display())]
    NotInModule(PathBuf),

    /// `go list` failed
    #[error("Failed to list package {target}: {stderr}")]
    ListFailed {
        /// Package or directory queried
        target: String,
        /// Captured diagnostics
        stderr: String,
    },

    /// `go list` produced output that could not be decoded
    #[error("Failed to parse package metadata for {target}: {source}")]
    InvalidMetadata {
        /// Package or directory queried
        target: String,
        /// Decoder error
        #[source]
        source: serde_json::Error,
    },

    /// The toolchain could not be started
    #[error("Failed to run toolchain: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using `CliError` as the default error type.
pub type Result<T, E = CliError> = std::result::Result<T, E>;

/// Extension trait for adding context to `Result` types.
pub trait ResultExt<T> {
    /// Add a file path to the error context.
    ///
    /// I/O "not found" errors become [`CliError::FileNotFound`] carrying `path`.
    fn with_path(self, path: impl AsRef<std::path::Path>) -> Result<T>;

    /// Add a helpful hint to the error context.
    fn with_hint(self, hint: impl std::fmt::Display) -> Result<T>;

    /// Convert to a custom error message.
    fn context(self, msg: impl std::fmt::Display) -> Result<T>;
}

impl<T, E: Into<CliError>> ResultExt<T> for std::result::Result<T, E> {
    fn with_path(self, path: impl AsRef<std::path::Path>) -> Result<T> {
        self.map_err(|e| {
            let err: CliError = e.into();
            match err {
                CliError::Io(io_err) if io_err.kind() == std::io::ErrorKind::NotFound => {
                    CliError::FileNotFound(path.as_ref().to_path_buf())
                }
                other => other,
            }
        })
    }

    fn with_hint(self, hint: impl std::fmt::Display) -> Result<T> {
        self.map_err(|e| {
            let err: CliError = e.into();
            CliError::Custom(format!("{}\n\nHint: {}", err, hint))
        })
    }

    fn context(self, msg: impl std::fmt::Display) -> Result<T> {
        self.map_err(|e| {
            let err: CliError = e.into();
            CliError::Custom(format!("{}: {}", msg, err))
        })
    }
}
