//! Resolved build context.
//!
//! A [`BuildContext`] is everything needed to compile and serve one source
//! root: absolute paths, the resolved toolchain, the runtime glue read from
//! the toolchain distribution and the rendered bootstrap page. It is built
//! once at startup and shared read-only afterwards.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use minijinja::Environment;
use tokio::process::Command;

use crate::cli::ToolchainOptions;
use crate::config::Manifest;
use crate::embed;
use crate::error::{BuildError, CliError, Result, ResultExt};
use crate::file::{self, File};

/// Immutable description of a build.
#[derive(Debug, Clone)]
pub struct BuildContext {
    path: PathBuf,
    name: String,
    output: PathBuf,
    output_is_temporary: bool,
    compiler: PathBuf,
    compiler_flags: Vec<String>,
    toolchain_root: PathBuf,
    glue: File,
    bootstrap: File,
    favicon: File,
    assets: Vec<PathBuf>,
    base_path: String,
    vars: BTreeMap<String, String>,
}

/// Builder for [`BuildContext`].
#[derive(Debug, Clone)]
pub struct BuildContextBuilder {
    source: PathBuf,
    output: Option<PathBuf>,
    notify: bool,
    base_path: String,
}

impl BuildContext {
    /// Start building a context for the source root at `source`.
    pub fn builder(source: impl Into<PathBuf>) -> BuildContextBuilder {
        BuildContextBuilder {
            source: source.into(),
            output: None,
            notify: false,
            base_path: String::new(),
        }
    }

    /// Absolute source root.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Base name of the source root, used to name the artefact.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// File name of the compiled artefact (`<name>.wasm`).
    pub fn wasm_name(&self) -> String {
        format!("{}.wasm", self.name)
    }

    /// Absolute output directory.
    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Whether the output directory was created because none was requested.
    pub fn output_is_temporary(&self) -> bool {
        self.output_is_temporary
    }

    pub fn compiler(&self) -> &Path {
        &self.compiler
    }

    pub fn compiler_flags(&self) -> &[String] {
        &self.compiler_flags
    }

    pub fn toolchain_root(&self) -> &Path {
        &self.toolchain_root
    }

    /// Runtime glue script (`wasm_exec.js`).
    pub fn glue(&self) -> &File {
        &self.glue
    }

    /// Rendered bootstrap page (`index.html`).
    pub fn bootstrap(&self) -> &File {
        &self.bootstrap
    }

    pub fn favicon(&self) -> &File {
        &self.favicon
    }

    /// Absolute asset paths, in manifest order. They may not exist.
    pub fn assets(&self) -> &[PathBuf] {
        &self.assets
    }

    /// URL prefix for served artefacts; empty or `/segment[/segment...]`.
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Manifest vars after environment expansion.
    pub fn vars(&self) -> &BTreeMap<String, String> {
        &self.vars
    }

    /// Remove a temporary output directory. Used by commands that never
    /// publish their output.
    pub fn discard_temporary_output(&self) {
        if self.output_is_temporary {
            if let Err(e) = std::fs::remove_dir_all(&self.output) {
                tracing::debug!(path = %self.output.display(), error = %e, "Failed to remove temporary output");
            }
        }
    }
}

impl BuildContextBuilder {
    /// Output directory; a temporary one is created when unset.
    pub fn output(mut self, output: Option<impl Into<PathBuf>>) -> Self {
        self.output = output.map(Into::into);
        self
    }

    /// Include the live reload client in the bootstrap page.
    pub fn notify(mut self, notify: bool) -> Self {
        self.notify = notify;
        self
    }

    /// URL prefix for served artefacts.
    pub fn base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = base_path.into();
        self
    }

    /// Resolve paths and the toolchain, then render the bootstrap page.
    pub async fn build(self, manifest: &Manifest, toolchain: &ToolchainOptions) -> Result<BuildContext> {
        let path = std::fs::canonicalize(&self.source).with_path(&self.source)?;
        if !path.is_dir() {
            return Err(CliError::InvalidArgument(format!(
                "source path is not a directory: {}",
                path.display()
            )));
        }
        let name = source_name(&path);

        let compiler = resolve_compiler(&toolchain.go)?;
        let toolchain_root = match &toolchain.goroot {
            Some(root) => root.clone(),
            None => toolchain_root(&compiler).await?,
        };
        tracing::debug!(compiler = %compiler.display(), root = %toolchain_root.display(), "Resolved toolchain");

        let glue_path = find_runtime_glue(&toolchain.wasm_exec, &toolchain_root)?;
        let glue = std::fs::read(&glue_path).with_path(&glue_path)?;
        tracing::debug!(path = %glue_path.display(), "Using runtime glue");

        let vars = manifest.expanded_vars();
        let base_path = normalize_base_path(&self.base_path);
        let wasm_name = format!("{name}.wasm");
        let page = render_bootstrap(&vars, &name, &wasm_name, &base_path, self.notify)?;

        let assets = manifest
            .assets
            .iter()
            .map(|asset| {
                let asset = Path::new(asset);
                if asset.is_absolute() {
                    asset.to_path_buf()
                } else {
                    path.join(asset)
                }
            })
            .collect();

        let favicon = File::new(embed::resource(embed::FAVICON)?, "favicon.png");

        // Allocated last: nothing after this point can fail.
        let (output, output_is_temporary) = match self.output {
            Some(dir) => {
                let dir = std::path::absolute(&dir)?;
                file::create_dir_all(&dir).map_err(|source| BuildError::OutputNotWritable {
                    path: dir.clone(),
                    source,
                })?;
                (dir, false)
            }
            None => {
                let dir = tempfile::Builder::new()
                    .prefix(&format!("wasmbuild-{name}-"))
                    .tempdir()?
                    .keep();
                (dir, true)
            }
        };

        Ok(BuildContext {
            path,
            name,
            output,
            output_is_temporary,
            compiler,
            compiler_flags: split_flags(toolchain.go_flags.as_deref().unwrap_or_default()),
            toolchain_root,
            glue: File::new(glue, "wasm_exec.js"),
            bootstrap: File::new(page, "index.html"),
            favicon,
            assets,
            base_path,
            vars,
        })
    }
}

fn source_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| "main".to_string())
}

/// Locate the toolchain executable. Bare names are searched on `PATH`.
pub fn resolve_compiler(program: &Path) -> Result<PathBuf, BuildError> {
    which::which(program).map_err(|source| BuildError::ToolchainNotFound {
        program: program.display().to_string(),
        source,
    })
}

/// Toolchain install root from `GOROOT`, falling back to `<go> env GOROOT`.
pub async fn toolchain_root(compiler: &Path) -> Result<PathBuf, BuildError> {
    if let Some(root) = std::env::var_os("GOROOT").filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(root));
    }

    let rendered = format!("{} env GOROOT", compiler.display());
    let output = Command::new(compiler)
        .args(["env", "GOROOT"])
        .output()
        .await
        .map_err(|e| BuildError::ToolchainQueryFailed {
            command: rendered.clone(),
            stderr: e.to_string(),
        })?;

    let root = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if !output.status.success() || root.is_empty() {
        return Err(BuildError::ToolchainQueryFailed {
            command: rendered,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(PathBuf::from(root))
}

/// First regular file in a colon-separated search list. Relative entries
/// are resolved against `root`.
pub fn find_runtime_glue(search: &str, root: &Path) -> Result<PathBuf, BuildError> {
    let mut searched = Vec::new();
    for entry in search.split(':').filter(|e| !e.trim().is_empty()) {
        let entry = Path::new(entry.trim());
        let candidate = if entry.is_absolute() {
            entry.to_path_buf()
        } else {
            root.join(entry)
        };
        let usable = std::fs::metadata(&candidate)
            .map(|m| m.is_file() && m.len() > 0)
            .unwrap_or(false);
        if usable {
            return Ok(candidate);
        }
        searched.push(candidate);
    }

    Err(BuildError::RuntimeMissing {
        root: root.to_path_buf(),
        searched,
    })
}

/// `""`, `"/"` and `"app/"` become `""`, `""` and `"/app"`.
pub fn normalize_base_path(base: &str) -> String {
    let trimmed = base.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}

fn split_flags(flags: &str) -> Vec<String> {
    flags.split_whitespace().map(str::to_string).collect()
}

/// Render the bootstrap page.
///
/// `TITLE` defaults to the source name and `HEADER`/`FOOTER` to nothing;
/// manifest vars override those. `WASM_FILE`, `BASE_PATH` and `NOTIFY` are
/// always set from the build.
pub fn render_bootstrap(
    vars: &BTreeMap<String, String>,
    name: &str,
    wasm_name: &str,
    base_path: &str,
    notify: bool,
) -> Result<String, BuildError> {
    let template = embed::resource(embed::BOOTSTRAP_TEMPLATE)?;
    let template = String::from_utf8(template).map_err(|e| BuildError::TemplateFailed(e.to_string()))?;

    let mut context: BTreeMap<String, minijinja::Value> = BTreeMap::new();
    context.insert("TITLE".into(), name.into());
    context.insert("HEADER".into(), "".into());
    context.insert("FOOTER".into(), "".into());
    for (key, value) in vars {
        context.insert(key.clone(), value.as_str().into());
    }
    context.insert("WASM_FILE".into(), wasm_name.into());
    context.insert("BASE_PATH".into(), base_path.into());
    context.insert("NOTIFY".into(), notify.into());

    Environment::new()
        .render_str(&template, context)
        .map_err(|e| BuildError::TemplateFailed(e.to_string()))
}
