/// Manifest file name looked up beside the source root.
pub const DEFAULT_MANIFEST: &str = "wasmbuild.yaml";

/// Toolchain executable resolved through `PATH`.
pub const DEFAULT_TOOLCHAIN: &str = "go";

/// Colon-separated runtime glue locations, relative to the toolchain root.
/// Go 1.24 moved the file from `misc/wasm` to `lib/wasm`.
pub const DEFAULT_WASM_EXEC: &str = "lib/wasm/wasm_exec.js:misc/wasm/wasm_exec.js";

/// Address the development server binds by default.
pub const DEFAULT_LISTEN: &str = "localhost:9090";
