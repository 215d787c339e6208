use super::{has_extension, Loader};
use crate::error::{Error, Result};
use crate::store::PropertyStore;
use url::Url;

/// Loader for `.toml` documents
///
/// Tables become nested mappings; datetimes keep their TOML spelling.
#[derive(Debug, Clone, Copy, Default)]
pub struct TomlLoader;

impl Loader for TomlLoader {
    fn accept(&self, url: &Url) -> bool {
        has_extension(url, &["toml"])
    }

    fn load(&self, content: &str) -> Result<PropertyStore> {
        ::toml::from_str(content).map_err(|e| Error::Parse(e.to_string()))
    }

    fn default_spec(&self, prefix: &str) -> Option<String> {
        Some(format!("{prefix}.toml"))
    }
}
