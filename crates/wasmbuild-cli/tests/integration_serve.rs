//! End-to-end tests for the serve orchestrator: initial build, watch,
//! rebuild, reload, error reporting and shutdown.

#![cfg(unix)]

mod common;

use common::Project;
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};
use wasmbuild_cli::commands::serve::{self, ServeOptions};
use wasmbuild_cli::dev::{BuildStatus, ServeMessage, ShutdownToken};
use wasmbuild_cli::error::{BuildError, CliError};

const WINDOW: Duration = Duration::from_millis(250);

fn options(watch: bool) -> ServeOptions {
    ServeOptions {
        window: WINDOW,
        ..ServeOptions::new("127.0.0.1:0", watch)
    }
}

#[tokio::test]
async fn test_serve_without_watch_fails_on_broken_build() {
    let project = Project::new();
    project.write("BROKEN", "undefined: frobnicate");
    let out = TempDir::new().unwrap();
    let ctx = project.context(Some(out.path()), false).await;

    let result = serve::start(ctx, options(false), ShutdownToken::new()).await;
    assert!(matches!(
        result,
        Err(CliError::Build(BuildError::CompilationFailed { .. }))
    ));
    // A directory the user asked for is theirs to keep.
    assert!(out.path().is_dir());
}

#[tokio::test]
async fn test_serve_fails_when_address_taken() {
    let project = Project::new();
    let out = TempDir::new().unwrap();
    let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = taken.local_addr().unwrap().to_string();
    let ctx = project.context(Some(out.path()), false).await;

    let result = serve::start(ctx, ServeOptions::new(addr, false), ShutdownToken::new()).await;
    assert!(matches!(result, Err(CliError::ListenFailed { .. })));
}

#[tokio::test]
async fn test_failed_start_removes_temporary_output() {
    let project = Project::new();
    project.write("BROKEN", "undefined: frobnicate");
    let ctx = project.context(None, false).await;
    let output = ctx.output().to_path_buf();
    assert!(output.is_dir());

    let result = serve::start(ctx, options(false), ShutdownToken::new()).await;
    assert!(result.is_err());
    assert!(!output.exists(), "{} left behind", output.display());

    let project = Project::new();
    let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let ctx = project.context(None, false).await;
    let output = ctx.output().to_path_buf();

    let listen = taken.local_addr().unwrap().to_string();
    let result = serve::start(ctx, ServeOptions::new(listen, false), ShutdownToken::new()).await;
    assert!(matches!(result, Err(CliError::ListenFailed { .. })));
    assert!(!output.exists(), "{} left behind", output.display());
}

#[tokio::test]
async fn test_serve_mirrors_output_and_shuts_down() {
    let project = Project::new();
    let out = TempDir::new().unwrap();
    let ctx = project.context(Some(out.path()), false).await;
    let shutdown = ShutdownToken::new();

    let handle = serve::start(ctx, options(false), shutdown.clone()).await.unwrap();
    assert!(handle.url().starts_with("http://127.0.0.1:"));
    assert!(handle.state().artefact().is_some());
    assert!(handle.state().get_status().is_success());
    for name in ["app.wasm", "wasm_exec.js", "index.html", "favicon.png"] {
        assert!(out.path().join(name).is_file(), "{name} not mirrored");
    }

    shutdown.cancel();
    timeout(Duration::from_secs(3), handle.wait())
        .await
        .expect("shutdown timed out")
        .unwrap();
}

#[tokio::test]
async fn test_watch_rebuilds_and_reloads() {
    let project = Project::new();
    let out = TempDir::new().unwrap();
    let ctx = project.context(Some(out.path()), true).await;
    let shutdown = ShutdownToken::new();

    let handle = serve::start(ctx, options(true), shutdown.clone()).await.unwrap();
    let state = handle.state().clone();
    let first = state.artefact().unwrap();
    let mut client = state.broadcaster().register();

    sleep(WINDOW * 3).await;
    project.write("main.go", "package main\n\nfunc main() { println(\"v2\") }\n");

    let message = timeout(Duration::from_secs(5), client.receiver.recv())
        .await
        .expect("no reload after modification")
        .unwrap();
    assert_eq!(message, ServeMessage::Reload);

    let second = state.artefact().unwrap();
    assert_ne!(first.payload(), second.payload());
    assert!(String::from_utf8_lossy(second.payload()).contains("v2"));

    sleep(WINDOW * 3).await;
    project.write("BROKEN", "./main.go:3:15: undefined: println2");

    let message = timeout(Duration::from_secs(5), client.receiver.recv())
        .await
        .expect("no error after broken build")
        .unwrap();
    match message {
        ServeMessage::BuildError(payload) => assert!(payload.contains("undefined: println2")),
        other => panic!("expected build error, got {:?}", other),
    }

    // The last good artefact keeps being served.
    assert_eq!(state.artefact().unwrap().payload(), second.payload());
    assert!(matches!(state.get_status(), BuildStatus::Failed { .. }));

    shutdown.cancel();
    timeout(Duration::from_secs(3), handle.wait())
        .await
        .expect("shutdown timed out")
        .unwrap();
    assert!(client.receiver.recv().await.is_none());
}

#[tokio::test]
async fn test_watch_starts_despite_broken_initial_build() {
    let project = Project::new();
    project.write("BROKEN", "undefined: start");
    let out = TempDir::new().unwrap();
    let ctx = project.context(Some(out.path()), true).await;
    let shutdown = ShutdownToken::new();

    let handle = serve::start(ctx, options(true), shutdown.clone()).await.unwrap();
    let state = handle.state().clone();
    assert!(state.artefact().is_none());
    assert_eq!(state.broadcaster().last_error().as_deref(), Some("undefined: start"));

    let mut client = state.broadcaster().register();
    assert!(matches!(
        client.receiver.recv().await,
        Some(ServeMessage::BuildError(_))
    ));

    sleep(WINDOW * 3).await;
    std::fs::remove_file(project.src.join("BROKEN")).unwrap();

    let message = timeout(Duration::from_secs(5), client.receiver.recv())
        .await
        .expect("no reload after fix")
        .unwrap();
    assert_eq!(message, ServeMessage::Reload);
    assert!(state.artefact().is_some());
    assert!(state.broadcaster().last_error().is_none());

    shutdown.cancel();
    timeout(Duration::from_secs(3), handle.wait())
        .await
        .expect("shutdown timed out")
        .unwrap();
}

#[tokio::test]
async fn test_open_event_streams_close_on_shutdown() {
    let project = Project::new();
    let out = TempDir::new().unwrap();
    let ctx = project.context(Some(out.path()), true).await;
    let shutdown = ShutdownToken::new();

    let handle = serve::start(ctx, options(true), shutdown.clone()).await.unwrap();

    let mut socket = TcpStream::connect(handle.addr()).await.unwrap();
    socket
        .write_all(b"GET /_notify HTTP/1.1\r\nHost: localhost\r\nAccept: text/event-stream\r\n\r\n")
        .await
        .unwrap();

    let mut received = Vec::new();
    let mut buf = [0u8; 1024];
    while !String::from_utf8_lossy(&received).contains("data: connected") {
        let n = timeout(Duration::from_secs(2), socket.read(&mut buf))
            .await
            .expect("no connected frame")
            .unwrap();
        assert!(n > 0, "connection closed early");
        received.extend_from_slice(&buf[..n]);
    }
    let head = String::from_utf8_lossy(&received).to_string();
    assert!(head.starts_with("HTTP/1.1 200"));
    assert!(head.to_ascii_lowercase().contains("content-type: text/event-stream"));

    shutdown.cancel();
    let drained = timeout(Duration::from_secs(1), async {
        loop {
            match socket.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(_) => continue,
            }
        }
    })
    .await;
    assert!(drained.is_ok(), "event stream still open after shutdown");

    timeout(Duration::from_secs(3), handle.wait())
        .await
        .expect("shutdown timed out")
        .unwrap();
}
