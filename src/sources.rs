//! Source specs and their resolution to readable locations
//!
//! A source spec is a URL-like string. Besides the schemes the `url` crate
//! understands, two virtual schemes are supported:
//!
//! - `classpath:<path>` looks the path up under the configured classpath roots
//! - `resources:<path>` asks a [`ResourcesPathResolver`] for the real URL
//!
//! `~` and `${...}` are expanded before anything else.

use crate::error::{Error, Result};
use crate::expand::{VariableExpander, expand_user_home};
use crate::store::PropertyStore;
use log::debug;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use url::Url;

pub const CLASSPATH_SCHEME: &str = "classpath:";
pub const RESOURCES_SCHEME: &str = "resources:";

/// Maps `resources:` paths to real URLs
pub trait ResourcesPathResolver: Send + Sync {
    /// The URL for `path`, or `None` when it cannot be found
    fn resolve_path(&self, path: &str) -> Option<String>;
}

impl<F> ResourcesPathResolver for F
where
    F: Fn(&str) -> Option<String> + Send + Sync,
{
    fn resolve_path(&self, path: &str) -> Option<String> {
        self(path)
    }
}

// =============================================================================
// Source
// =============================================================================

/// A resolved source location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    url: Url,
}

impl Source {
    #[must_use]
    pub fn new(url: Url) -> Self {
        Self { url }
    }

    /// Source for a local file
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedSource`] if the path cannot be made absolute.
    pub fn from_path(path: &Path) -> Result<Self> {
        let absolute = std::path::absolute(path).map_err(|e| Error::MalformedSource {
            spec: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Url::from_file_path(&absolute)
            .map(Self::new)
            .map_err(|()| Error::MalformedSource {
                spec: absolute.display().to_string(),
                reason: "not an absolute file path".into(),
            })
    }

    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// The local file behind a `file:` URL
    #[must_use]
    pub fn local_path(&self) -> Option<PathBuf> {
        if self.url.scheme() == "file" {
            self.url.to_file_path().ok()
        } else {
            None
        }
    }

    pub(crate) fn read(&self) -> Result<String> {
        let Some(path) = self.local_path() else {
            return Err(Error::SourceUnreadable {
                url: self.url.to_string(),
                reason: format!("unsupported scheme '{}'", self.url.scheme()),
            });
        };
        std::fs::read_to_string(&path).map_err(|e| Error::FileRead { path, source: e })
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.url.fmt(f)
    }
}

// =============================================================================
// Resolver
// =============================================================================

/// Turns source specs into [`Source`]s
#[derive(Clone, Default)]
pub struct SourceResolver {
    expander: VariableExpander,
    props: PropertyStore,
    classpath_roots: Vec<PathBuf>,
    resources: Option<Arc<dyn ResourcesPathResolver>>,
}

impl SourceResolver {
    #[must_use]
    pub fn new(expander: VariableExpander) -> Self {
        Self {
            expander,
            ..Self::default()
        }
    }

    /// Values available to `${...}` in specs, on top of the environment
    #[must_use]
    pub fn with_properties(mut self, props: PropertyStore) -> Self {
        self.props = props;
        self
    }

    #[must_use]
    pub fn with_classpath_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.classpath_roots.push(root.into());
        self
    }

    #[must_use]
    pub fn with_resources_resolver(mut self, resolver: Arc<dyn ResourcesPathResolver>) -> Self {
        self.resources = Some(resolver);
        self
    }

    /// Resolve one spec
    ///
    /// Returns `Ok(None)` when a virtual scheme finds nothing, which means the
    /// source is skipped.
    ///
    /// # Errors
    ///
    /// - [`Error::MalformedSource`] if the expanded spec is not a valid URL
    /// - [`Error::ResolverNotSet`] for `resources:` without a resolver
    pub fn resolve(&self, spec: &str) -> Result<Option<Source>> {
        let expanded = self.expander.expand(&expand_spec_home(spec), &self.props);

        let url_text = if let Some(path) = expanded.strip_prefix(CLASSPATH_SCHEME) {
            match self.find_on_classpath(path) {
                Some(file) => return Source::from_path(&file).map(Some),
                None => {
                    debug!("'{spec}' not found on the classpath");
                    return Ok(None);
                }
            }
        } else if let Some(path) = expanded.strip_prefix(RESOURCES_SCHEME) {
            let resolver = self.resources.as_ref().ok_or(Error::ResolverNotSet)?;
            match resolver.resolve_path(path) {
                Some(resolved) => resolved,
                None => {
                    debug!("Resources resolver found nothing for '{spec}'");
                    return Ok(None);
                }
            }
        } else {
            expanded
        };

        Url::parse(&url_text)
            .map(|url| Some(Source::new(url)))
            .map_err(|e| Error::MalformedSource {
                spec: spec.to_string(),
                reason: e.to_string(),
            })
    }

    fn find_on_classpath(&self, path: &str) -> Option<PathBuf> {
        let relative = path.trim_start_matches('/');
        let cwd = [PathBuf::from(".")];
        let roots = if self.classpath_roots.is_empty() {
            &cwd[..]
        } else {
            &self.classpath_roots[..]
        };
        roots
            .iter()
            .map(|root| root.join(relative))
            .find(|candidate| candidate.is_file())
    }
}

impl fmt::Debug for SourceResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceResolver")
            .field("classpath_roots", &self.classpath_roots)
            .field("has_resources_resolver", &self.resources.is_some())
            .finish_non_exhaustive()
    }
}

/// Expand `~` at the start of a plain path or right after `file:`
fn expand_spec_home(spec: &str) -> String {
    if spec == "~" || spec.starts_with("~/") {
        return format!("file:{}", expand_user_home(spec));
    }
    for prefix in ["file:", "jar:file:"] {
        if let Some(rest) = spec.strip_prefix(prefix) {
            if rest == "~" || rest.starts_with("~/") {
                return format!("{prefix}{}", expand_user_home(rest));
            }
        }
    }
    spec.to_string()
}

/// Spec prefix for the default sources of a type, e.g. `my_app::Server`
/// becomes `classpath:my_app/Server`
#[must_use]
pub fn classpath_prefix(qualified_name: &str) -> String {
    format!("{CLASSPATH_SCHEME}{}", qualified_name.replace("::", "/"))
}
