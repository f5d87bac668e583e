//! Build command implementation.
//!
//! This module implements the `wasmbuild build` command: one compile, then
//! everything a static host needs is written to the output directory.

use crate::cli::{BuildArgs, ToolchainOptions};
use crate::commands::utils::{self, ContextOptions};
use crate::compiler;
use crate::context::BuildContext;
use crate::error::{BuildError, Result};
use crate::file::File;
use crate::ui;
use std::path::{Path, PathBuf};
use std::time::Instant;
use walkdir::WalkDir;

/// Execute the build command.
///
/// # Build Process
///
/// 1. Resolve the manifest and build the context
/// 2. Compile the source root to WebAssembly
/// 3. Write the artefact, runtime glue, bootstrap page and favicon
/// 4. Copy every manifest asset
/// 5. Print the output directory on stdout
///
/// # Errors
///
/// Returns errors for:
/// - Missing or malformed manifest
/// - Missing toolchain or runtime glue
/// - Compilation failures
/// - Unreadable assets or an unwritable output directory
pub async fn execute(args: BuildArgs, toolchain: &ToolchainOptions) -> Result<()> {
    let ctx = utils::load_context(
        &args.path,
        toolchain,
        ContextOptions {
            output: args.output,
            ..ContextOptions::default()
        },
    )
    .await?;

    // A failed build leaves nothing behind in a temporary output.
    publish(&ctx)
        .await
        .inspect_err(|_| ctx.discard_temporary_output())?;

    println!("{}", ctx.output().display());
    Ok(())
}

/// Compile, then lay the static site out in the output directory.
async fn publish(ctx: &BuildContext) -> Result<()> {
    let start_time = Instant::now();
    let spinner = ui::Spinner::new(&format!("Compiling {}", ctx.name()));
    let artefact = match compiler::compile(ctx).await {
        Ok(artefact) => artefact,
        Err(e) => {
            spinner.fail(&format!("Failed to compile {}", ctx.name()));
            return Err(e);
        }
    };
    spinner.finish(&format!(
        "Compiled {} ({}) in {}",
        ctx.wasm_name(),
        ui::format_size(artefact.len() as u64),
        ui::format_duration(start_time.elapsed())
    ));

    let mut written = write_output(ctx, &artefact)?;
    written.extend(copy_assets(ctx)?);
    for path in &written {
        tracing::debug!(path = %path.display(), "Wrote");
    }
    Ok(())
}

/// Write the artefact and the runtime files into the output directory.
///
/// Returns the paths written.
pub fn write_output(ctx: &BuildContext, artefact: &File) -> Result<Vec<PathBuf>, BuildError> {
    let output = ctx.output();
    [artefact, ctx.glue(), ctx.bootstrap(), ctx.favicon()]
        .into_iter()
        .map(|file| file.write_to(output))
        .collect()
}

/// Copy manifest assets into the output directory.
///
/// A file asset lands at its basename; a directory asset is copied
/// recursively under its basename, skipping hidden entries. Any unreadable
/// asset aborts the copy.
pub fn copy_assets(ctx: &BuildContext) -> Result<Vec<PathBuf>, BuildError> {
    let mut written = Vec::new();
    for asset in ctx.assets() {
        for file in collect_asset(asset)? {
            written.push(file.write_to(ctx.output())?);
        }
    }
    Ok(written)
}

/// Read one asset into [`File`]s relative to the output root.
fn collect_asset(asset: &Path) -> Result<Vec<File>, BuildError> {
    let read_failed = |path: &Path| {
        let path = path.to_path_buf();
        move |source| BuildError::AssetReadFailed { path, source }
    };

    let metadata = std::fs::metadata(asset).map_err(read_failed(asset))?;
    let Some(name) = asset.file_name().map(PathBuf::from) else {
        return Ok(Vec::new());
    };

    if !metadata.is_dir() {
        let payload = std::fs::read(asset).map_err(read_failed(asset))?;
        return Ok(vec![File::new(payload, name)]);
    }

    let mut files = Vec::new();
    let walker = WalkDir::new(asset)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry.file_name()));
    for entry in walker {
        let entry = entry.map_err(|e| BuildError::AssetReadFailed {
            path: e.path().unwrap_or(asset).to_path_buf(),
            source: e.into(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry.path().strip_prefix(asset).unwrap_or(entry.path());
        let payload = std::fs::read(entry.path()).map_err(read_failed(entry.path()))?;
        files.push(File::new(payload, name.join(relative)));
    }
    Ok(files)
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_string_lossy().starts_with('.')
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn names(files: &[File]) -> Vec<PathBuf> {
        files.iter().map(|f| f.destination().to_path_buf()).collect()
    }

    #[test]
    fn test_collect_file_asset_uses_basename() {
        let temp_dir = TempDir::new().unwrap();
        let style = temp_dir.path().join("nested/style.css");
        std::fs::create_dir_all(style.parent().unwrap()).unwrap();
        std::fs::write(&style, "body {}").unwrap();

        let files = collect_asset(&style).unwrap();
        assert_eq!(names(&files), vec![PathBuf::from("style.css")]);
        assert_eq!(files[0].payload(), b"body {}");
    }

    #[test]
    fn test_collect_directory_asset_keeps_layout() {
        let temp_dir = TempDir::new().unwrap();
        let static_dir = temp_dir.path().join("static");
        std::fs::create_dir_all(static_dir.join("css")).unwrap();
        std::fs::create_dir_all(static_dir.join(".git")).unwrap();
        std::fs::write(static_dir.join("a.css"), "a").unwrap();
        std::fs::write(static_dir.join("css/b.css"), "b").unwrap();
        std::fs::write(static_dir.join(".hidden"), "h").unwrap();
        std::fs::write(static_dir.join(".git/HEAD"), "ref").unwrap();

        let files = collect_asset(&static_dir).unwrap();
        assert_eq!(
            names(&files),
            vec![PathBuf::from("static/a.css"), PathBuf::from("static/css/b.css")]
        );
    }

    #[test]
    fn test_collect_missing_asset_fails() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("missing");

        match collect_asset(&missing) {
            Err(BuildError::AssetReadFailed { path, .. }) => assert_eq!(path, missing),
            other => panic!("expected AssetReadFailed, got {:?}", other),
        }
    }
}
