//! Dependency discovery.
//!
//! Computes the set of directories and files whose modification should
//! trigger a rebuild: the source root, every in-module package it imports
//! and every declared asset. Packages outside the main module (the standard
//! library, third-party modules) are not watched.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use serde::Deserialize;
use tokio::process::Command;
use walkdir::WalkDir;

use crate::compiler::TARGET_ENV;
use crate::context::BuildContext;
use crate::error::DependencyError;

/// Package metadata as reported by `go list -json`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PackageInfo {
    #[serde(default)]
    pub import_path: String,
    #[serde(default)]
    pub dir: PathBuf,
    #[serde(default)]
    pub deps: Vec<String>,
    #[serde(default)]
    pub module: Option<ModuleInfo>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ModuleInfo {
    pub path: String,
}

impl PackageInfo {
    /// Transitive imports that live in the same module, excluding the
    /// package itself.
    pub fn local_imports(&self) -> Vec<&str> {
        let Some(module) = &self.module else {
            return Vec::new();
        };
        let prefix = format!("{}/", module.path);
        self.deps
            .iter()
            .map(String::as_str)
            .filter(|dep| *dep != self.import_path)
            .filter(|dep| *dep == module.path || dep.starts_with(&prefix))
            .collect()
    }
}

/// Absolute paths to watch, sorted and deduplicated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencySet(BTreeSet<PathBuf>);

impl DependencySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// The source root plus assets. Used when the module graph is unavailable.
    pub fn baseline(ctx: &BuildContext) -> Self {
        let mut set = Self::new();
        set.insert(ctx.path().to_path_buf());
        set.add_assets(ctx.assets());
        set
    }

    pub fn insert(&mut self, path: PathBuf) -> bool {
        self.0.insert(path)
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.0.contains(path)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.0.iter().map(PathBuf::as_path)
    }

    pub fn as_set(&self) -> &BTreeSet<PathBuf> {
        &self.0
    }

    /// Add asset files directly and asset directories recursively (every
    /// directory, hidden entries excluded). Missing assets are skipped.
    pub fn add_assets(&mut self, assets: &[PathBuf]) {
        for asset in assets {
            let Ok(metadata) = std::fs::metadata(asset) else {
                tracing::debug!(path = %asset.display(), "Skipping missing asset");
                continue;
            };
            if !metadata.is_dir() {
                self.insert(asset.clone());
                continue;
            }

            let walker = WalkDir::new(asset)
                .follow_links(true)
                .into_iter()
                .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry.file_name()));
            for entry in walker.flatten() {
                if entry.file_type().is_dir() {
                    self.insert(entry.into_path());
                }
            }
        }
    }
}

impl IntoIterator for DependencySet {
    type Item = PathBuf;
    type IntoIter = std::collections::btree_set::IntoIter<PathBuf>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl FromIterator<PathBuf> for DependencySet {
    fn from_iter<I: IntoIterator<Item = PathBuf>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_string_lossy().starts_with('.')
}

/// Query the toolchain for one package.
pub async fn list_package(ctx: &BuildContext, target: &str) -> Result<PackageInfo, DependencyError> {
    let output = Command::new(ctx.compiler())
        .args(["list", "-e", "-json", target])
        .current_dir(ctx.path())
        .envs(TARGET_ENV)
        .stdin(Stdio::null())
        .output()
        .await?;

    if !output.status.success() {
        return Err(DependencyError::ListFailed {
            target: target.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    serde_json::from_slice(&output.stdout).map_err(|source| DependencyError::InvalidMetadata {
        target: target.to_string(),
        source,
    })
}

/// Discover the watch set for a build.
///
/// Returns [`DependencyError::NotInModule`] when the source root is not in a
/// module; callers fall back to [`DependencySet::baseline`]. Failures
/// listing individual imports are logged and skipped.
pub async fn dependencies(ctx: &BuildContext) -> Result<DependencySet, DependencyError> {
    let root = ctx.path().to_string_lossy().into_owned();
    let info = list_package(ctx, &root).await?;
    if info.module.is_none() {
        return Err(DependencyError::NotInModule(ctx.path().to_path_buf()));
    }

    let mut set = DependencySet::new();
    for import in info.local_imports() {
        match list_package(ctx, import).await {
            Ok(dep) if !dep.dir.as_os_str().is_empty() => {
                set.insert(dep.dir);
            }
            Ok(_) => tracing::debug!(package = import, "Package has no directory"),
            Err(e) => tracing::warn!(package = import, error = %e, "Skipping dependency"),
        }
    }

    set.insert(ctx.path().to_path_buf());
    set.add_assets(ctx.assets());
    Ok(set)
}

/// [`dependencies`], degrading to the baseline set when the module graph
/// cannot be read. Never fails.
pub async fn watch_set(ctx: &BuildContext) -> DependencySet {
    match dependencies(ctx).await {
        Ok(set) => set,
        Err(e) => {
            tracing::warn!("{}", e);
            DependencySet::baseline(ctx)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn package(json: &str) -> PackageInfo {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_parse_package_info() {
        let info = package(
            r#"{
                "Dir": "/src/app",
                "ImportPath": "example.com/app",
                "Name": "main",
                "Deps": ["errors", "example.com/app/ui", "syscall/js"],
                "Module": {"Path": "example.com/app", "GoVersion": "1.22"}
            }"#,
        );
        assert_eq!(info.dir, PathBuf::from("/src/app"));
        assert_eq!(info.module.as_ref().map(|m| m.path.as_str()), Some("example.com/app"));
        assert_eq!(info.deps.len(), 3);
    }

    #[test]
    fn test_parse_package_without_module() {
        let info = package(r#"{"Dir": "/tmp/x", "ImportPath": "command-line-arguments"}"#);
        assert!(info.module.is_none());
        assert!(info.local_imports().is_empty());
    }

    #[test]
    fn test_local_imports_filters_by_module() {
        let info = package(
            r#"{
                "ImportPath": "example.com/app/cmd/web",
                "Deps": [
                    "fmt",
                    "example.com/app",
                    "example.com/app/cmd/web",
                    "example.com/app/ui",
                    "example.com/application/other",
                    "github.com/x/y"
                ],
                "Module": {"Path": "example.com/app"}
            }"#,
        );
        assert_eq!(info.local_imports(), vec!["example.com/app", "example.com/app/ui"]);
    }

    #[test]
    fn test_add_assets_walks_directories() {
        let dir = TempDir::new().unwrap();
        let static_dir = dir.path().join("static");
        std::fs::create_dir_all(static_dir.join("css/themes")).unwrap();
        std::fs::create_dir_all(static_dir.join(".cache/inner")).unwrap();
        std::fs::write(static_dir.join("css/site.css"), "").unwrap();
        let style = dir.path().join("style.css");
        std::fs::write(&style, "").unwrap();

        let mut set = DependencySet::new();
        set.add_assets(&[static_dir.clone(), style.clone(), dir.path().join("missing")]);

        let expected: DependencySet = [
            static_dir.clone(),
            static_dir.join("css"),
            static_dir.join("css/themes"),
            style,
        ]
        .into_iter()
        .collect();
        assert_eq!(set, expected);
        assert!(!set.contains(&static_dir.join(".cache")));
    }

    #[test]
    fn test_set_is_sorted_and_deduplicated() {
        let set: DependencySet = ["/b", "/a", "/b"].into_iter().map(PathBuf::from).collect();
        let paths: Vec<_> = set.iter().collect();
        assert_eq!(paths, vec![Path::new("/a"), Path::new("/b")]);
    }
}
