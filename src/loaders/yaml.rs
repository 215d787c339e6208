use super::{has_extension, Loader};
use crate::error::{Error, Result};
use crate::store::{PropertyStore, PropertyValue};
use url::Url;

/// Loader for `.yaml` and `.yml` documents
///
/// Mappings nest, sequences of scalars become comma-joined text and an empty
/// document yields an empty store.
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlLoader;

impl Loader for YamlLoader {
    fn accept(&self, url: &Url) -> bool {
        has_extension(url, &["yaml", "yml"])
    }

    fn load(&self, content: &str) -> Result<PropertyStore> {
        if content.trim().is_empty() {
            return Ok(PropertyStore::new());
        }
        let root: Option<PropertyValue> =
            serde_yaml::from_str(content).map_err(|e| Error::Parse(e.to_string()))?;
        Ok(match root {
            Some(PropertyValue::Map(store)) => store,
            _ => PropertyStore::new(),
        })
    }

    fn default_spec(&self, prefix: &str) -> Option<String> {
        Some(format!("{prefix}.yaml"))
    }
}
