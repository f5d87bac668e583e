//! Shared fixtures for integration tests.
//!
//! Tests run against a stand-in `go` executable written as a shell script:
//!
//! - `go env GOROOT` prints the fake toolchain root
//! - `go build ... -o OUT SRC` writes `\0asm` followed by the `.go` sources,
//!   or fails with the contents of `SRC/BROKEN` on stderr if that file exists
//! - `go list ... TARGET` prints `TARGET/.golist.json` for a directory (or a
//!   package without a module), and `ROOT/pkgs/<path with / as _>.json` for
//!   an import path

#![allow(dead_code)]

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use wasmbuild_cli::cli::ToolchainOptions;
use wasmbuild_cli::context::BuildContext;
use wasmbuild_cli::config::Manifest;

pub const MODULE: &str = "example.com/app";

const FAKE_GO: &str = r#"#!/bin/sh
ROOT="@ROOT@"
cmd="$1"
shift
case "$cmd" in
  env)
    echo "$ROOT"
    ;;
  build)
    out=""
    src=""
    while [ $# -gt 0 ]; do
      case "$1" in
        -o) out="$2"; shift 2 ;;
        *) src="$1"; shift ;;
      esac
    done
    if [ -f "$src/BROKEN" ]; then
      cat "$src/BROKEN" >&2
      exit 2
    fi
    printf '\0asm' > "$out"
    cat "$src"/*.go >> "$out" 2>/dev/null
    exit 0
    ;;
  list)
    for target; do :; done
    if [ -d "$target" ]; then
      if [ -f "$target/.golist.json" ]; then
        cat "$target/.golist.json"
      else
        printf '{"Dir":"%s","ImportPath":"command-line-arguments"}' "$target"
      fi
    else
      f="$ROOT/pkgs/$(echo "$target" | tr '/' '_').json"
      if [ -f "$f" ]; then
        cat "$f"
      else
        echo "cannot find package $target" >&2
        exit 1
      fi
    fi
    ;;
  *)
    echo "unsupported command: $cmd" >&2
    exit 1
    ;;
esac
"#;

/// A source root named `app` plus a fake toolchain, in one temp directory.
pub struct Project {
    _temp: TempDir,
    pub src: PathBuf,
    pub goroot: PathBuf,
    pub go: PathBuf,
}

impl Project {
    /// Source root with `main.go` and an empty manifest.
    pub fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let base = fs::canonicalize(temp.path()).unwrap();

        let goroot = base.join("goroot");
        fs::create_dir_all(goroot.join("lib/wasm")).unwrap();
        fs::create_dir_all(goroot.join("pkgs")).unwrap();
        fs::write(goroot.join("lib/wasm/wasm_exec.js"), "// wasm_exec glue\n").unwrap();

        let go = goroot.join("go");
        fs::write(&go, FAKE_GO.replace("@ROOT@", &goroot.display().to_string())).unwrap();
        make_executable(&go);

        let src = base.join("app");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("main.go"), "package main\n").unwrap();
        fs::write(src.join("wasmbuild.yaml"), "").unwrap();

        Self {
            _temp: temp,
            src,
            goroot,
            go,
        }
    }

    /// Write a file under the source root, creating parent directories.
    pub fn write(&self, relative: &str, contents: &str) -> PathBuf {
        let path = self.src.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, contents).unwrap();
        path
    }

    pub fn manifest(&self, contents: &str) {
        self.write("wasmbuild.yaml", contents);
    }

    /// Declare the source root as module `example.com/app` importing the
    /// in-module package `ui` (and `fmt`, which is not watched).
    pub fn with_module(&self) -> PathBuf {
        let ui = self.src.join("ui");
        fs::create_dir_all(&ui).unwrap();
        fs::write(ui.join("ui.go"), "package ui\n").unwrap();

        let root = serde_json::json!({
            "Dir": self.src,
            "ImportPath": MODULE,
            "Deps": ["fmt", format!("{MODULE}/ui")],
            "Module": {"Path": MODULE},
        });
        self.write(".golist.json", &root.to_string());

        let package = serde_json::json!({
            "Dir": ui,
            "ImportPath": format!("{MODULE}/ui"),
            "Module": {"Path": MODULE},
        });
        fs::write(
            self.goroot.join("pkgs/example.com_app_ui.json"),
            package.to_string(),
        )
        .unwrap();

        ui
    }

    pub fn toolchain(&self) -> ToolchainOptions {
        ToolchainOptions {
            go: self.go.clone(),
            goroot: Some(self.goroot.clone()),
            ..ToolchainOptions::default()
        }
    }

    /// Global flags selecting the fake toolchain.
    pub fn toolchain_args(&self) -> Vec<OsString> {
        vec![
            "--go".into(),
            self.go.clone().into(),
            "--goroot".into(),
            self.goroot.clone().into(),
        ]
    }

    /// Context for the source root with the manifest on disk.
    pub async fn context(&self, output: Option<&Path>, notify: bool) -> BuildContext {
        let manifest = Manifest::load(&self.src.join("wasmbuild.yaml")).unwrap();
        BuildContext::builder(&self.src)
            .output(output)
            .notify(notify)
            .build(&manifest, &self.toolchain())
            .await
            .unwrap()
    }
}

#[cfg(unix)]
fn make_executable(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) {}
