//! Variable expansion for `${name}` placeholders
//!
//! Names are resolved, lowest priority first, from the process environment,
//! the system properties and finally the configuration's own values. The
//! environment is captured once into an [`Environment`] snapshot so tests
//! can substitute their own.

use crate::store::PropertyStore;
use log::warn;
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::sync::LazyLock;

/// Placeholders nested deeper than this are left unexpanded
pub const MAX_EXPANSION_DEPTH: usize = 32;

/// Names currently being expanded, outermost first
#[derive(Default)]
struct Trail {
    names: Vec<String>,
    cycle_reported: bool,
}

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{(.+?)\}").expect("placeholder pattern is valid"));

// =============================================================================
// Environment Snapshot
// =============================================================================

/// Source of environment variables
///
/// Implement this to feed a fake environment into an [`Environment`].
pub trait EnvSource: Send + Sync {
    /// All variables visible to the configuration
    fn vars(&self) -> Vec<(String, String)>;
}

/// Reads the real process environment
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn vars(&self) -> Vec<(String, String)> {
        std::env::vars().collect()
    }
}

/// Environment variables and system properties captured at construction time
#[derive(Debug, Clone, Default)]
pub struct Environment {
    vars: HashMap<String, String>,
    system: HashMap<String, String>,
}

impl Environment {
    /// An environment with no variables and no system properties
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Capture the current process environment and the well-known system
    /// properties (`user.home`, `user.dir`, `file.separator`, `os.name`, ...)
    #[must_use]
    pub fn capture() -> Self {
        Self::from_source(&ProcessEnv).with_default_system_properties()
    }

    /// Build a snapshot from any [`EnvSource`]
    #[must_use]
    pub fn from_source(source: &dyn EnvSource) -> Self {
        Self {
            vars: source.vars().into_iter().collect(),
            system: HashMap::new(),
        }
    }

    fn with_default_system_properties(mut self) -> Self {
        if let Some(home) = dirs::home_dir() {
            self.system
                .insert("user.home".into(), home.display().to_string());
        }
        if let Ok(cwd) = std::env::current_dir() {
            self.system
                .insert("user.dir".into(), cwd.display().to_string());
        }
        self.system.insert(
            "file.separator".into(),
            std::path::MAIN_SEPARATOR.to_string(),
        );
        self.system
            .insert("os.name".into(), std::env::consts::OS.to_string());
        self.system
            .insert("os.arch".into(), std::env::consts::ARCH.to_string());
        self
    }

    /// Add or replace an environment variable
    #[must_use]
    pub fn with_var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }

    /// Add or replace a system property
    #[must_use]
    pub fn with_system_property(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.system.insert(name.into(), value.into());
        self
    }

    pub(crate) fn set_system_property(&mut self, name: String, value: String) {
        self.system.insert(name, value);
    }

    /// Look up an environment variable
    #[must_use]
    pub fn var(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// Look up a system property
    #[must_use]
    pub fn system_property(&self, name: &str) -> Option<&str> {
        self.system.get(name).map(String::as_str)
    }
}

// =============================================================================
// Expander
// =============================================================================

/// Recursive `${name}` substitution
///
/// Backslashes carry no special meaning: they are copied to the output as
/// they are, both from the template and from substituted values. Unknown
/// names expand to the empty string.
#[derive(Debug, Clone, Default)]
pub struct VariableExpander {
    environment: Environment,
}

impl VariableExpander {
    #[must_use]
    pub fn new(environment: Environment) -> Self {
        Self { environment }
    }

    #[must_use]
    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    /// Expand every placeholder in `template`, resolving names against
    /// `props` first and the environment snapshot second
    ///
    /// A placeholder whose name is already being expanded further up the
    /// chain is a cycle and stays in the output as literal text.
    #[must_use]
    pub fn expand(&self, template: &str, props: &PropertyStore) -> String {
        self.expand_with(template, props, &mut Trail::default())
    }

    /// Expand the value stored under `name`; references back to `name` count
    /// as a cycle
    #[must_use]
    pub fn expand_value(&self, name: &str, template: &str, props: &PropertyStore) -> String {
        let mut trail = Trail {
            names: vec![name.to_string()],
            cycle_reported: false,
        };
        self.expand_with(template, props, &mut trail)
    }

    /// Like [`expand`](Self::expand) but passes `None` through untouched
    #[must_use]
    pub fn expand_opt(&self, template: Option<&str>, props: &PropertyStore) -> Option<String> {
        template.map(|t| self.expand(t, props))
    }

    fn expand_with(&self, template: &str, props: &PropertyStore, trail: &mut Trail) -> String {
        if trail.names.len() > MAX_EXPANSION_DEPTH {
            warn!("Variable expansion exceeded depth {MAX_EXPANSION_DEPTH}, leaving '{template}' as is");
            return template.to_string();
        }
        PLACEHOLDER
            .replace_all(template, |caps: &Captures<'_>| {
                let name = &caps[1];
                if trail.names.iter().any(|seen| seen == name) {
                    if !trail.cycle_reported {
                        warn!("Cyclic reference to '${{{name}}}', leaving it unexpanded");
                        trail.cycle_reported = true;
                    }
                    return caps[0].to_string();
                }
                let Some(value) = self.lookup(name, props) else {
                    return String::new();
                };
                trail.names.push(name.to_string());
                let expanded = self.expand_with(value, props, trail);
                trail.names.pop();
                expanded
            })
            .into_owned()
    }

    fn lookup<'a>(&'a self, name: &str, props: &'a PropertyStore) -> Option<&'a str> {
        props
            .get_text(name)
            .or_else(|| self.environment.system_property(name))
            .or_else(|| self.environment.var(name))
    }
}

/// Expand a leading `~` to the user's home directory
#[must_use]
pub fn expand_user_home(text: &str) -> String {
    let Some(rest) = text.strip_prefix('~') else {
        return text.to_string();
    };
    if !(rest.is_empty() || rest.starts_with('/') || rest.starts_with('\\')) {
        return text.to_string();
    }
    match dirs::home_dir() {
        Some(home) => format!("{}{rest}", home.display()),
        None => text.to_string(),
    }
}

// =============================================================================
// Tests
// =============================================================================
