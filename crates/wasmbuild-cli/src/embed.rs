//! Resources compiled into the binary.

use rust_embed::RustEmbed;

use crate::error::BuildError;

#[derive(RustEmbed)]
#[folder = "assets/"]
struct Resources;

/// Bootstrap page template (minijinja syntax).
pub const BOOTSTRAP_TEMPLATE: &str = "index.html";

/// Default favicon.
pub const FAVICON: &str = "favicon.png";

/// Browser-side live reload client.
pub const NOTIFY_SCRIPT: &str = "notify.js";

/// Bytes of an embedded resource.
pub fn resource(name: &str) -> Result<Vec<u8>, BuildError> {
    Resources::get(name)
        .map(|file| file.data.into_owned())
        .ok_or_else(|| BuildError::TemplateFailed(format!("embedded resource missing: {name}")))
}
