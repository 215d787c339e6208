//! Splitting delimited text into tokens

use crate::error::{Error, Result};
use std::fmt;
use std::sync::Arc;

/// Default separator when nothing is declared
pub const DEFAULT_SEPARATOR: &str = ",";

/// Splits a raw string into the tokens of an array or collection value
pub trait Tokenizer: Send + Sync {
    fn tokens(&self, text: &str) -> Vec<String>;
}

/// Splits on a literal separator and trims every token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitAndTrimTokenizer {
    separator: String,
}

impl SplitAndTrimTokenizer {
    pub fn new(separator: impl Into<String>) -> Self {
        Self {
            separator: separator.into(),
        }
    }
}

impl Default for SplitAndTrimTokenizer {
    fn default() -> Self {
        Self::new(DEFAULT_SEPARATOR)
    }
}

impl Tokenizer for SplitAndTrimTokenizer {
    fn tokens(&self, text: &str) -> Vec<String> {
        if self.separator.is_empty() {
            return vec![text.trim().to_string()];
        }
        text.split(self.separator.as_str())
            .map(|token| token.trim().to_string())
            .collect()
    }
}

type TokenizerFactory = dyn Fn() -> std::result::Result<Box<dyn Tokenizer>, String> + Send + Sync;

/// A named recipe for a custom tokenizer, instantiated on every conversion
#[derive(Clone)]
pub struct TokenizerRef {
    name: String,
    factory: Arc<TokenizerFactory>,
}

impl TokenizerRef {
    /// A tokenizer whose construction may fail
    pub fn new<F>(name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> std::result::Result<Box<dyn Tokenizer>, String> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            factory: Arc::new(factory),
        }
    }

    /// A tokenizer built through `Default`
    #[must_use]
    pub fn of<T: Tokenizer + Default + 'static>() -> Self {
        Self::new(std::any::type_name::<T>(), || {
            Ok(Box::new(T::default()) as Box<dyn Tokenizer>)
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    fn instantiate(&self) -> Result<Box<dyn Tokenizer>> {
        (self.factory)().map_err(|reason| Error::Instantiation {
            name: format!("Tokenizer '{}'", self.name),
            reason,
        })
    }
}

impl fmt::Debug for TokenizerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TokenizerRef").field(&self.name).finish()
    }
}

/// Tokenizer declaration at one level (method or declaring type)
///
/// Declaring both a separator and a tokenizer is accepted here and rejected
/// when a value is first split.
#[derive(Debug, Clone, Default)]
pub struct TokenizerSpec {
    pub separator: Option<String>,
    pub tokenizer: Option<TokenizerRef>,
}

impl TokenizerSpec {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.separator.is_none() && self.tokenizer.is_none()
    }

    fn resolve(&self, scope: &str) -> Result<Option<Box<dyn Tokenizer>>> {
        match (&self.separator, &self.tokenizer) {
            (Some(_), Some(_)) => Err(Error::AmbiguousTokenizer {
                scope: scope.to_string(),
            }),
            (Some(separator), None) => Ok(Some(Box::new(SplitAndTrimTokenizer::new(
                separator.clone(),
            )))),
            (None, Some(tokenizer)) => tokenizer.instantiate().map(Some),
            (None, None) => Ok(None),
        }
    }
}

/// Pick the tokenizer for a value: method level, then type level, then `","`
///
/// # Errors
///
/// Returns [`Error::AmbiguousTokenizer`] when a level declares both a
/// separator and a tokenizer, or [`Error::Instantiation`] when a custom
/// tokenizer cannot be built.
pub fn resolve_tokenizer(
    method: &TokenizerSpec,
    declaring_type: &TokenizerSpec,
) -> Result<Box<dyn Tokenizer>> {
    if let Some(tokenizer) = method.resolve("method")? {
        return Ok(tokenizer);
    }
    if let Some(tokenizer) = declaring_type.resolve("type")? {
        return Ok(tokenizer);
    }
    Ok(Box::new(SplitAndTrimTokenizer::default()))
}
