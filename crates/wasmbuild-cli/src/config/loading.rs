use crate::config::Manifest;
use crate::error::ConfigError;
use figment::{
    Figment,
    providers::{Format as _, Serialized, Yaml},
};
use std::io::Read;
use std::path::{Path, PathBuf};

impl Manifest {
    /// Decode a manifest document.
    ///
    /// A blank document yields the empty manifest. `source_name` only labels
    /// error messages. Decoding does not judge the values; [`Manifest::load`]
    /// validates what it reads from disk.
    pub fn parse(contents: &str, source_name: &str) -> Result<Self, ConfigError> {
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }

        Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Yaml::string(contents))
            .extract()
            .map_err(|e| ConfigError::Malformed {
                source_name: source_name.to_string(),
                message: e.to_string(),
            })
    }

    /// Reject asset entries that cannot name a file.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(asset) = self.assets.iter().find(|a| a.trim().is_empty()) {
            return Err(ConfigError::InvalidValue {
                field: "assets".to_string(),
                value: format!("{:?}", asset),
                hint: "Each asset must be a file or directory path".to_string(),
            });
        }
        Ok(())
    }

    /// Decode a manifest from a byte stream.
    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self, ConfigError> {
        let mut contents = String::new();
        reader
            .read_to_string(&mut contents)
            .map_err(|e| ConfigError::Malformed {
                source_name: "<stream>".to_string(),
                message: e.to_string(),
            })?;
        Self::parse(&contents, "<stream>")
    }

    /// Read, decode and validate the manifest at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ConfigError::NotFound(path.to_path_buf()),
            _ => ConfigError::Io(e),
        })?;
        tracing::debug!(path = %path.display(), "Loaded manifest");
        let manifest = Self::parse(&contents, &path.display().to_string())?;
        manifest.validate()?;
        Ok(manifest)
    }
}

/// Locate the manifest for a source root.
///
/// An absolute `manifest` is used as-is; a relative one is joined to
/// `base_dir`. The result must be an existing regular file.
pub fn resolve_manifest(base_dir: &Path, manifest: &Path) -> Result<PathBuf, ConfigError> {
    let candidate = if manifest.is_absolute() {
        manifest.to_path_buf()
    } else {
        base_dir.join(manifest)
    };

    if candidate.is_file() {
        Ok(candidate)
    } else {
        Err(ConfigError::NotFound(candidate))
    }
}
