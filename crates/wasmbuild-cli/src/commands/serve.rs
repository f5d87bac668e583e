//! Serve command implementation.
//!
//! Compiles once, serves the result over HTTP and, with `--watch`, keeps
//! rebuilding as the sources change. Browsers connected to `/_notify`
//! reload after every successful rebuild and show the compiler's output
//! after a failed one.

use crate::cli::{ServeArgs, ToolchainOptions};
use crate::commands::utils::{self, ContextOptions};
use crate::context::BuildContext;
use crate::deps::{self, DependencySet};
use crate::dev::{
    server_url, ChangeWatcher, DevBuilder, DevServer, DevServerState, SharedState, ShutdownToken,
    Signal, DEBOUNCE_WINDOW,
};
use crate::error::{CliError, Result, ResultExt};
use crate::ui;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// How long teardown waits for the server and the reactive loop.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Runtime options for [`start`].
#[derive(Debug, Clone)]
pub struct ServeOptions {
    pub listen: String,
    pub watch: bool,
    pub window: Duration,
}

impl ServeOptions {
    pub fn new(listen: impl Into<String>, watch: bool) -> Self {
        Self {
            listen: listen.into(),
            watch,
            window: DEBOUNCE_WINDOW,
        }
    }
}

/// A running server and, when watching, its reactive loop.
pub struct ServeHandle {
    addr: SocketAddr,
    url: String,
    state: SharedState,
    shutdown: ShutdownToken,
    server: JoinHandle<Result<()>>,
    reactor: Option<JoinHandle<()>>,
}

impl ServeHandle {
    /// Address the listener is bound to.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// URL to open in a browser.
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn state(&self) -> &SharedState {
        &self.state
    }

    pub fn shutdown_token(&self) -> &ShutdownToken {
        &self.shutdown
    }

    /// Wait for cancellation (or the server stopping on its own), then tear
    /// everything down: watcher, client streams, server.
    pub async fn wait(mut self) -> Result<()> {
        let early = tokio::select! {
            _ = self.shutdown.cancelled() => None,
            joined = &mut self.server => Some(joined),
        };

        self.shutdown.cancel();
        if let Some(reactor) = self.reactor.take() {
            if tokio::time::timeout(SHUTDOWN_GRACE, reactor).await.is_err() {
                tracing::warn!("Reactive loop did not stop in time");
            }
        }
        let closed = self.state.broadcaster().shutdown();
        tracing::debug!(clients = closed, "Closed event streams");

        let joined = match early {
            Some(joined) => Some(joined),
            None => tokio::time::timeout(SHUTDOWN_GRACE, &mut self.server)
                .await
                .ok(),
        };
        let result = match joined {
            Some(Ok(result)) => result,
            Some(Err(e)) => Err(CliError::Server(format!("Server task failed: {}", e))),
            None => {
                tracing::warn!("Server did not stop in time");
                self.server.abort();
                Ok(())
            }
        };

        self.state.context().discard_temporary_output();
        result
    }
}

/// Execute the serve command.
///
/// Blocks until interrupted. A failed initial compile is fatal unless
/// `--watch` is given, in which case the error is reported to browsers and
/// the next change gets another try.
pub async fn execute(args: ServeArgs, toolchain: &ToolchainOptions) -> Result<()> {
    let ctx = utils::load_context(
        &args.path,
        toolchain,
        ContextOptions {
            output: None,
            notify: args.watch,
            base_path: args.base_path,
        },
    )
    .await?;

    let shutdown = ShutdownToken::new();
    shutdown.cancel_on_interrupt();

    let handle = start(ctx, ServeOptions::new(args.listen, args.watch), shutdown).await?;
    println!("{}", handle.url());
    ui::info(&format!("Serving on {}", handle.url()));

    handle.wait().await
}

/// Compile, start watching (optionally) and start serving.
///
/// Returns once the listener is bound; everything else runs on spawned
/// tasks owned by the returned handle. On failure a temporary output
/// directory is removed before the error is returned.
pub async fn start(
    ctx: BuildContext,
    options: ServeOptions,
    shutdown: ShutdownToken,
) -> Result<ServeHandle> {
    let state: SharedState = Arc::new(DevServerState::new(Arc::new(ctx), shutdown.clone()));
    launch(state.clone(), options, shutdown)
        .await
        .inspect_err(|_| state.context().discard_temporary_output())
}

async fn launch(
    state: SharedState,
    options: ServeOptions,
    shutdown: ShutdownToken,
) -> Result<ServeHandle> {
    let builder = DevBuilder::new(state.clone());

    match builder.rebuild().await {
        Ok(duration) => report_success(&state, duration),
        Err(e) if options.watch => {
            utils::report_failure(&e);
            state.broadcaster().error(&e);
        }
        Err(e) => return Err(e),
    }

    let watching = if options.watch {
        let paths = deps::watch_set(state.context()).await;
        tracing::debug!(paths = paths.len(), "Watching dependencies");
        let (watcher, signals) = ChangeWatcher::start(&paths, options.window, shutdown.clone())
            .with_hint("Check that every watched directory exists and is readable")?;
        Some((watcher, signals, paths))
    } else {
        None
    };

    let listener = DevServer::bind(&options.listen).await?;
    let addr = listener
        .local_addr()
        .context("Failed to read the bound address")?;
    let url = server_url(addr, state.context().base_path());

    let server = tokio::spawn(DevServer::new(state.clone()).serve(listener));
    let reactor = watching.map(|(watcher, signals, paths)| {
        tokio::spawn(reactive_loop(builder, watcher, signals, paths, shutdown.clone()))
    });

    Ok(ServeHandle {
        addr,
        url,
        state,
        shutdown,
        server,
        reactor,
    })
}

/// Rebuild on every change until cancelled.
async fn reactive_loop(
    builder: DevBuilder,
    mut watcher: ChangeWatcher,
    mut signals: mpsc::Receiver<Signal>,
    mut paths: DependencySet,
    shutdown: ShutdownToken,
) {
    let state = builder.state().clone();

    loop {
        let signal = tokio::select! {
            _ = shutdown.cancelled() => break,
            signal = signals.recv() => signal,
        };

        match signal {
            None => break,
            Some(Signal::Error(e)) => {
                let error = CliError::Watch(e);
                tracing::error!("{}", error);
                state.broadcaster().error(&error);
            }
            Some(Signal::Changed) => {
                let result = tokio::select! {
                    _ = shutdown.cancelled() => break,
                    result = builder.rebuild() => result,
                };

                match result {
                    Err(e) => {
                        utils::report_failure(&e);
                        state.broadcaster().error(&e);
                    }
                    Ok(duration) => {
                        report_success(&state, duration);

                        let next = deps::watch_set(state.context()).await;
                        if next != paths {
                            tracing::debug!(paths = next.len(), "Dependency set changed");
                            watcher.replace(&next);
                            paths = next;
                        }

                        let delivery = state.broadcaster().reload();
                        tracing::debug!(
                            delivered = delivery.delivered,
                            dropped = delivery.dropped,
                            "Published reload"
                        );
                    }
                }
            }
        }
    }

    tracing::debug!("Reactive loop stopped");
}

fn report_success(state: &DevServerState, duration: Duration) {
    let size = state.artefact().map(|a| a.len() as u64).unwrap_or_default();
    ui::success(&format!(
        "Compiled {} ({}) in {}",
        state.context().wasm_name(),
        ui::format_size(size),
        ui::format_duration(duration)
    ));
}
