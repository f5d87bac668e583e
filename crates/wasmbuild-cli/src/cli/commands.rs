use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::cli::validation::{parse_base_path, parse_listen};
use crate::config::DEFAULT_LISTEN;

/// Available wasmbuild subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compile to a directory of static files
    ///
    /// Writes the WebAssembly binary, wasm_exec.js, index.html, favicon.png
    /// and every manifest asset to the output directory, then prints the
    /// directory path.
    Build(BuildArgs),

    /// Serve the application over HTTP
    ///
    /// With --watch, every in-module package the program imports is
    /// watched; a change triggers a rebuild and connected browsers reload
    /// (or show the compiler's errors).
    Serve(ServeArgs),

    /// Print the paths a build depends on
    ///
    /// With --watch, prints "Modified" and recompiles whenever one of them
    /// changes.
    Dep(DepArgs),
}

/// Arguments for the build command
#[derive(Args, Debug, Clone)]
pub struct BuildArgs {
    /// Source root (a Go main package)
    #[arg(default_value = ".", value_name = "PATH")]
    pub path: PathBuf,

    /// Output directory (a temporary directory when omitted)
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,
}

/// Arguments for the serve command
#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    /// Source root (a Go main package)
    #[arg(default_value = ".", value_name = "PATH")]
    pub path: PathBuf,

    /// Address to listen on
    ///
    /// Examples:
    ///   --listen localhost:9090
    ///   --listen :8080        (all interfaces)
    #[arg(long, default_value = DEFAULT_LISTEN, value_parser = parse_listen, value_name = "ADDR")]
    pub listen: String,

    /// Rebuild and reload the browser when sources change
    #[arg(short, long)]
    pub watch: bool,

    /// URL prefix to serve under (e.g. /app)
    #[arg(long, default_value = "", value_parser = parse_base_path, value_name = "PREFIX")]
    pub base_path: String,
}

/// Arguments for the dep command
#[derive(Args, Debug, Clone)]
pub struct DepArgs {
    /// Source root (a Go main package)
    #[arg(default_value = ".", value_name = "PATH")]
    pub path: PathBuf,

    /// Keep watching and recompile on change
    #[arg(short, long)]
    pub watch: bool,
}
