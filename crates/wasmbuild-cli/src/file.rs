//! In-memory build products.
//!
//! A [`File`] is a payload plus the path it will occupy relative to an output
//! directory. The compiled artefact, the runtime glue, the bootstrap page and
//! copied assets all travel through the pipeline as `File` values, so the
//! server can answer requests from memory and `build` can write them out
//! uniformly.

use std::io::Write;
use std::path::{Component, Path, PathBuf};

use crate::error::BuildError;

/// A named byte payload destined for an output directory.
#[derive(Clone, PartialEq, Eq)]
pub struct File {
    payload: Vec<u8>,
    destination: PathBuf,
}

impl std::fmt::Debug for File {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("File")
            .field("destination", &self.destination)
            .field("len", &self.payload.len())
            .finish()
    }
}

impl File {
    /// Create a file with the given payload and relative destination.
    pub fn new(payload: impl Into<Vec<u8>>, destination: impl Into<PathBuf>) -> Self {
        Self {
            payload: payload.into(),
            destination: destination.into(),
        }
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Destination relative to the output directory.
    pub fn destination(&self) -> &Path {
        &self.destination
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Last path segment of the destination.
    pub fn name(&self) -> String {
        self.destination
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Write the payload to `dir/destination`, creating intermediate
    /// directories (0755) and the file itself (0644). Returns the full path.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf, BuildError> {
        if !is_relative_inside(&self.destination) {
            return Err(BuildError::OutputNotWritable {
                path: self.destination.clone(),
                source: std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "destination escapes the output directory",
                ),
            });
        }

        let target = dir.join(&self.destination);
        if let Some(parent) = target.parent() {
            create_dir_all(parent).map_err(|source| BuildError::OutputNotWritable {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        write_file(&target, &self.payload).map_err(|source| BuildError::OutputNotWritable {
            path: target.clone(),
            source,
        })?;

        Ok(target)
    }
}

/// True when `path` is relative and made only of normal segments.
pub fn is_relative_inside(path: &Path) -> bool {
    let mut components = path.components().peekable();
    if components.peek().is_none() {
        return false;
    }
    components.all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

/// Create a directory and its parents with mode 0755.
pub(crate) fn create_dir_all(path: &Path) -> std::io::Result<()> {
    let mut builder = std::fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o755);
    }
    builder.create(path)
}

fn write_file(path: &Path, payload: &[u8]) -> std::io::Result<()> {
    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o644);
    }
    let mut file = options.open(path)?;
    file.write_all(payload)?;
    file.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_creates_parents() {
        let dir = TempDir::new().unwrap();
        let file = File::new(b"body { margin: 0 }".to_vec(), "static/css/site.css");

        let written = file.write_to(dir.path()).unwrap();

        assert_eq!(written, dir.path().join("static/css/site.css"));
        assert_eq!(std::fs::read(&written).unwrap(), b"body { margin: 0 }");
    }

    #[test]
    fn test_write_overwrites_existing() {
        let dir = TempDir::new().unwrap();
        File::new(b"first".to_vec(), "index.html")
            .write_to(dir.path())
            .unwrap();
        File::new(b"second".to_vec(), "index.html")
            .write_to(dir.path())
            .unwrap();

        assert_eq!(
            std::fs::read_to_string(dir.path().join("index.html")).unwrap(),
            "second"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_write_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let written = File::new(b"x".to_vec(), "nested/app.wasm")
            .write_to(dir.path())
            .unwrap();

        let mode = std::fs::metadata(&written).unwrap().permissions().mode() & 0o777;
        // umask may only clear bits
        assert_eq!(mode & !0o644, 0);
        assert!(std::fs::metadata(dir.path().join("nested")).unwrap().is_dir());
    }

    #[test]
    fn test_write_rejects_escaping_destination() {
        let dir = TempDir::new().unwrap();
        let file = File::new(b"x".to_vec(), "../outside.txt");
        assert!(matches!(
            file.write_to(dir.path()),
            Err(BuildError::OutputNotWritable { .. })
        ));
    }

    #[test]
    fn test_relative_inside() {
        assert!(is_relative_inside(Path::new("app.wasm")));
        assert!(is_relative_inside(Path::new("./css/site.css")));
        assert!(!is_relative_inside(Path::new("")));
        assert!(!is_relative_inside(Path::new("/etc/passwd")));
        assert!(!is_relative_inside(Path::new("css/../../x")));
    }

    #[test]
    fn test_name() {
        assert_eq!(File::new(Vec::new(), "a/b/app.wasm").name(), "app.wasm");
        assert!(File::new(Vec::new(), "a").is_empty());
    }
}
