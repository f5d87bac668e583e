//! Compiler driver.
//!
//! Runs `go build` for the `js/wasm` target in a private temporary workspace
//! and hands the artefact back as an in-memory [`File`]. Standard output of
//! the compiler is passed through to ours; standard error is captured so a
//! failure can be shown both in the terminal and in the browser overlay.

use std::path::Path;
use std::process::Stdio;

use tokio::io::AsyncReadExt;
use tokio::process::Command;

use crate::context::BuildContext;
use crate::error::{BuildError, Result};
use crate::file::File;

/// Environment that selects the WebAssembly target.
pub const TARGET_ENV: [(&str, &str); 2] = [("GOOS", "js"), ("GOARCH", "wasm")];

/// The `go build` invocation that writes the artefact to `artefact`.
pub fn build_command(ctx: &BuildContext, artefact: &Path) -> Command {
    let mut command = Command::new(ctx.compiler());
    command
        .arg("build")
        .args(ctx.compiler_flags())
        .arg("-o")
        .arg(artefact)
        .arg(ctx.path())
        .current_dir(ctx.path())
        .envs(TARGET_ENV)
        .stdin(Stdio::null())
        .stdout(Stdio::inherit())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    command
}

/// Compile the source root to WebAssembly.
///
/// The workspace directory is removed on every exit path. On a non-zero
/// exit the captured stderr is returned in [`BuildError::CompilationFailed`].
pub async fn compile(ctx: &BuildContext) -> Result<File> {
    let workspace = tempfile::Builder::new()
        .prefix("wasmbuild-compile-")
        .tempdir()?;
    let wasm_name = ctx.wasm_name();
    let artefact = workspace.path().join(&wasm_name);

    let mut command = build_command(ctx, &artefact);
    tracing::debug!(command = ?command.as_std(), "Running compiler");

    let mut child = command.spawn().map_err(|e| BuildError::ToolchainQueryFailed {
        command: format!("{} build", ctx.compiler().display()),
        stderr: e.to_string(),
    })?;

    let mut stderr = Vec::new();
    if let Some(mut pipe) = child.stderr.take() {
        pipe.read_to_end(&mut stderr).await?;
    }
    let status = child.wait().await?;
    let stderr = String::from_utf8_lossy(&stderr).into_owned();

    if !status.success() {
        return Err(BuildError::CompilationFailed {
            status: status.to_string(),
            stderr,
        }
        .into());
    }
    if !stderr.trim().is_empty() {
        tracing::warn!("{}", stderr.trim_end());
    }

    let payload = tokio::fs::read(&artefact)
        .await
        .map_err(|source| BuildError::OutputNotWritable {
            path: artefact.clone(),
            source,
        })?;

    Ok(File::new(payload, wasm_name))
}
