//! wasmbuild - build, serve and live-reload Go WebAssembly programs.
//!
//! This is the main entry point for the CLI. It handles command-line argument
//! parsing, logging initialization, and command dispatch.

use clap::Parser;
use miette::Result;
use wasmbuild_cli::{cli, commands, error, logger, ui};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = cli::Cli::parse();

    // Initialize logging and colors based on global flags
    logger::init_logger(args.verbose, args.quiet, args.no_color);
    ui::init_colors(args.no_color);

    let toolchain = &args.toolchain;
    let result = match args.command {
        cli::Command::Build(build_args) => commands::build_execute(build_args, toolchain).await,
        cli::Command::Serve(serve_args) => commands::serve_execute(serve_args, toolchain).await,
        cli::Command::Dep(dep_args) => commands::dep_execute(dep_args, toolchain).await,
    };

    // Convert CLI errors to miette diagnostics for beautiful error reporting
    result.map_err(error::cli_error_to_miette)
}
