//! Dep command implementation.
//!
//! Prints the paths a build depends on, one per line. With `--watch` it
//! stays running, printing `Modified` and recompiling on every change.

use crate::cli::{DepArgs, ToolchainOptions};
use crate::commands::utils::{self, ContextOptions};
use crate::compiler;
use crate::context::BuildContext;
use crate::deps::{self, DependencySet};
use crate::dev::{ChangeWatcher, ShutdownToken, Signal, DEBOUNCE_WINDOW};
use crate::error::{CliError, Result, ResultExt};
use std::io::Write;

/// Execute the dep command.
pub async fn execute(args: DepArgs, toolchain: &ToolchainOptions) -> Result<()> {
    let ctx = utils::load_context(&args.path, toolchain, ContextOptions::default()).await?;

    let paths = deps::watch_set(&ctx).await;
    let result = if args.watch {
        let shutdown = ShutdownToken::new();
        shutdown.cancel_on_interrupt();
        watch(&ctx, paths, shutdown).await
    } else {
        print_paths(&paths)
    };

    ctx.discard_temporary_output();
    result
}

fn print_paths(paths: &DependencySet) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    for path in paths.iter() {
        writeln!(stdout, "{}", path.display())?;
    }
    Ok(())
}

/// Recompile on every change until `shutdown` is cancelled.
pub async fn watch(ctx: &BuildContext, paths: DependencySet, shutdown: ShutdownToken) -> Result<()> {
    let (mut watcher, mut signals) = ChangeWatcher::start(&paths, DEBOUNCE_WINDOW, shutdown.clone())
        .with_hint("Check that every watched directory exists and is readable")?;
    let mut paths = paths;

    loop {
        let signal = tokio::select! {
            _ = shutdown.cancelled() => break,
            signal = signals.recv() => signal,
        };

        match signal {
            None => break,
            Some(Signal::Error(e)) => tracing::warn!("{}", CliError::Watch(e)),
            Some(Signal::Changed) => {
                println!("Modified");

                let result = tokio::select! {
                    _ = shutdown.cancelled() => break,
                    result = compiler::compile(ctx) => result,
                };
                match result {
                    Ok(artefact) => {
                        tracing::info!(bytes = artefact.len(), "Compiled {}", ctx.wasm_name());
                        let next = deps::watch_set(ctx).await;
                        if next != paths {
                            watcher.replace(&next);
                            paths = next;
                        }
                    }
                    Err(e) => utils::report_failure(&e),
                }
            }
        }
    }

    Ok(())
}
