//! Shared utilities for command implementations.
//!
//! Every subcommand starts the same way: locate the manifest beside the
//! source root, load it and turn it into a [`BuildContext`].

use crate::cli::ToolchainOptions;
use crate::config::{resolve_manifest, Manifest};
use crate::context::BuildContext;
use crate::error::{CliError, Result};
use crate::ui;
use std::path::{Path, PathBuf};

/// Resolve a path relative to a working directory.
///
/// If the path is absolute, returns it unchanged. Otherwise, joins it with
/// the working directory.
pub fn resolve_path(path: &Path, cwd: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}

/// Get the current working directory.
///
/// # Errors
///
/// Returns I/O error if current directory cannot be determined.
pub fn get_cwd() -> Result<PathBuf> {
    std::env::current_dir().map_err(|e| {
        CliError::Io(std::io::Error::new(
            e.kind(),
            format!("Failed to get current directory: {}", e),
        ))
    })
}

/// How a command wants its context built.
#[derive(Debug, Clone, Default)]
pub struct ContextOptions {
    pub output: Option<PathBuf>,
    pub notify: bool,
    pub base_path: String,
}

/// Resolve the manifest for `source` and build the compile context.
///
/// # Errors
///
/// Fails when the manifest is missing or malformed, the toolchain or its
/// runtime glue cannot be found, or the source is not a directory.
pub async fn load_context(
    source: &Path,
    toolchain: &ToolchainOptions,
    options: ContextOptions,
) -> Result<BuildContext> {
    let source = resolve_path(source, &get_cwd()?);
    let manifest_path = resolve_manifest(&source, &toolchain.config)?;
    let manifest = Manifest::load(&manifest_path)?;
    tracing::debug!(
        manifest = %manifest_path.display(),
        vars = manifest.vars.len(),
        assets = manifest.assets.len(),
        "Resolved manifest"
    );

    BuildContext::builder(source)
        .output(options.output)
        .notify(options.notify)
        .base_path(options.base_path)
        .build(&manifest, toolchain)
        .await
}

/// Report a failed rebuild without stopping. The compiler's own output is
/// shown verbatim; anything else goes through the log.
pub fn report_failure(error: &CliError) {
    if error.is_compilation_failure() {
        ui::error(&error.describe());
    } else {
        tracing::error!("{}", error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_path_absolute() {
        let abs_path = PathBuf::from("/absolute/path");
        let cwd = PathBuf::from("/some/dir");

        let resolved = resolve_path(&abs_path, &cwd);
        assert_eq!(resolved, abs_path);
    }

    #[test]
    fn test_resolve_path_relative() {
        let rel_path = PathBuf::from("relative/path");
        let cwd = PathBuf::from("/some/dir");

        let resolved = resolve_path(&rel_path, &cwd);
        assert_eq!(resolved, PathBuf::from("/some/dir/relative/path"));
    }

    #[test]
    fn test_get_cwd() {
        let cwd = get_cwd().unwrap();
        assert!(cwd.is_absolute());
    }

    #[tokio::test]
    async fn test_load_context_requires_manifest() {
        let temp_dir = TempDir::new().unwrap();

        let result = load_context(
            temp_dir.path(),
            &ToolchainOptions::default(),
            ContextOptions::default(),
        )
        .await;

        match result {
            Err(CliError::Config(ConfigError::NotFound(path))) => {
                assert_eq!(path, temp_dir.path().join("wasmbuild.yaml"));
            }
            other => panic!("expected missing manifest, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_load_context_reports_malformed_manifest() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("wasmbuild.yaml"), "assets: [unclosed").unwrap();

        let result = load_context(
            temp_dir.path(),
            &ToolchainOptions::default(),
            ContextOptions::default(),
        )
        .await;

        assert!(matches!(
            result,
            Err(CliError::Config(ConfigError::Malformed { .. }))
        ));
    }
}
