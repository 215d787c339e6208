use super::{has_extension, Loader};
use crate::error::Result;
use crate::store::{PropertyStore, PropertyValue};
use url::Url;

/// Loader for `.json` documents
///
/// Objects become nested mappings; scalars and arrays become text. A document
/// whose root is not an object yields an empty store.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonLoader;

impl Loader for JsonLoader {
    fn accept(&self, url: &Url) -> bool {
        has_extension(url, &["json"])
    }

    fn load(&self, content: &str) -> Result<PropertyStore> {
        let root: Option<PropertyValue> = serde_json::from_str(content)?;
        Ok(match root {
            Some(PropertyValue::Map(store)) => store,
            _ => PropertyStore::new(),
        })
    }

    fn default_spec(&self, prefix: &str) -> Option<String> {
        Some(format!("{prefix}.json"))
    }
}
