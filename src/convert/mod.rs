//! Conversion of raw property values into typed [`Value`]s
//!
//! A raw value is offered to a fixed, ordered chain of strategies. The first
//! strategy that applies decides the outcome; later ones are never consulted.
//!
//! 1. array targets split text with the resolved [`Tokenizer`]
//! 2. a converter declared on the descriptor
//! 3. collection targets (list, set, sorted set, registered collections)
//! 4. registered text editors
//! 5. paths, with `~` expanded
//! 6. type references resolved against the [`TypeRegistry`]
//! 7. single-string constructors (`FromStr`)
//! 8. named static factories
//! 9. constructors taking the raw value
//! 10. anything else fails with [`Error::Conversion`]

mod registry;
mod target;
mod tokenizer;
mod value;

pub use registry::TypeRegistry;
pub use target::{CollectionKind, TargetType};
pub use tokenizer::{
    DEFAULT_SEPARATOR, SplitAndTrimTokenizer, Tokenizer, TokenizerRef, TokenizerSpec,
    resolve_tokenizer,
};
pub use value::{FromValue, Value};

use crate::config::MethodDescriptor;
use crate::error::{Error, Result};
use crate::expand::expand_user_home;
use crate::store::PropertyValue;
use log::trace;
use std::cmp::Ordering;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

// =============================================================================
// Custom Converters
// =============================================================================

/// User conversion attached to a descriptor
///
/// A fresh instance is created for every conversion. Converters run with
/// no lock on the property store held, so they may read the configuration.
pub trait Converter: Send + Sync {
    /// Convert the raw value; `Ok(None)` means the property has no value
    ///
    /// # Errors
    ///
    /// Any error is reported to the reader unchanged.
    fn convert(&self, method: &MethodDescriptor, raw: &PropertyValue) -> Result<Option<Value>>;
}

type ConverterFactory = dyn Fn() -> std::result::Result<Box<dyn Converter>, String> + Send + Sync;

/// A named recipe for a [`Converter`]
#[derive(Clone)]
pub struct ConverterRef {
    name: String,
    factory: Arc<ConverterFactory>,
}

impl ConverterRef {
    /// A converter whose construction may fail
    pub fn new<F>(name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> std::result::Result<Box<dyn Converter>, String> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            factory: Arc::new(factory),
        }
    }

    /// A converter built through `Default`
    #[must_use]
    pub fn of<C: Converter + Default + 'static>() -> Self {
        Self::new(std::any::type_name::<C>(), || {
            Ok(Box::new(C::default()) as Box<dyn Converter>)
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    fn instantiate(&self) -> Result<Box<dyn Converter>> {
        (self.factory)().map_err(|reason| Error::Instantiation {
            name: format!("Converter '{}'", self.name),
            reason,
        })
    }
}

impl fmt::Debug for ConverterRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ConverterRef").field(&self.name).finish()
    }
}

// =============================================================================
// Strategies
// =============================================================================

/// Result of offering a value to one strategy
enum Step {
    /// The strategy does not apply; try the next one
    Skip,
    /// Conversion finished; `None` is the "no value" outcome
    Done(Option<Value>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Strategy {
    Array,
    Converter,
    Collection,
    Editor,
    Path,
    TypeRef,
    StringConstructor,
    Factory,
    ObjectConstructor,
    Unsupported,
}

impl Strategy {
    const ORDER: [Strategy; 10] = [
        Strategy::Array,
        Strategy::Converter,
        Strategy::Collection,
        Strategy::Editor,
        Strategy::Path,
        Strategy::TypeRef,
        Strategy::StringConstructor,
        Strategy::Factory,
        Strategy::ObjectConstructor,
        Strategy::Unsupported,
    ];

    fn try_convert(
        self,
        pipeline: &ConversionPipeline,
        method: &MethodDescriptor,
        target: &TargetType,
        raw: &PropertyValue,
    ) -> Result<Step> {
        let registry = pipeline.registry();
        let text = raw.as_text();
        let name = target.name();

        match self {
            Strategy::Array => {
                let (TargetType::Array(element), Some(text)) = (target, text) else {
                    return Ok(Step::Skip);
                };
                let items = pipeline.convert_tokens(method, element, text)?;
                Ok(Step::Done(Some(Value::Array(items))))
            }
            Strategy::Converter => {
                let Some(converter) = &method.converter else {
                    return Ok(Step::Skip);
                };
                let instance = converter.instantiate()?;
                Ok(Step::Done(instance.convert(method, raw)?))
            }
            Strategy::Collection => {
                let (TargetType::Collection { kind, element }, Some(text)) = (target, text) else {
                    return Ok(Step::Skip);
                };
                let string = TargetType::string();
                let element = element.as_deref().unwrap_or(&string);
                let items = pipeline.convert_tokens(method, element, text)?;
                pipeline.build_collection(kind, target, items).map(|v| Step::Done(Some(v)))
            }
            Strategy::Editor => match (name, text) {
                (Some(name), Some(text)) => match registry.edit(name, text) {
                    Some(edited) => Ok(Step::Done(Some(edited?))),
                    None => Ok(Step::Skip),
                },
                _ => Ok(Step::Skip),
            },
            Strategy::Path => {
                let is_path = match target {
                    TargetType::Path => true,
                    TargetType::Named(name) => name == std::any::type_name::<PathBuf>(),
                    _ => false,
                };
                match text {
                    Some(text) if is_path => Ok(Step::Done(Some(Value::Path(PathBuf::from(
                        expand_user_home(text),
                    ))))),
                    _ => Ok(Step::Skip),
                }
            }
            Strategy::TypeRef => match (target, text) {
                (TargetType::TypeRef, Some(text)) => {
                    if registry.knows_type(text) {
                        Ok(Step::Done(Some(Value::TypeName(text.to_string()))))
                    } else {
                        Err(Error::conversion(text, target))
                    }
                }
                _ => Ok(Step::Skip),
            },
            Strategy::StringConstructor => Ok(match (name, text) {
                (Some(name), Some(text)) => registry
                    .parse(name, text)
                    .map_or(Step::Skip, |v| Step::Done(Some(v))),
                _ => Step::Skip,
            }),
            Strategy::Factory => Ok(match (name, text) {
                (Some(name), Some(text)) => registry
                    .value_of(name, text)
                    .map_or(Step::Skip, |v| Step::Done(Some(v))),
                _ => Step::Skip,
            }),
            Strategy::ObjectConstructor => Ok(match name {
                Some(name) => registry
                    .construct(name, raw)
                    .map_or(Step::Skip, |v| Step::Done(Some(v))),
                None => Step::Skip,
            }),
            Strategy::Unsupported => Err(Error::conversion(raw, target)),
        }
    }
}

// =============================================================================
// Pipeline
// =============================================================================

/// Ordered chain of conversion strategies over a shared [`TypeRegistry`]
#[derive(Debug, Clone, Default)]
pub struct ConversionPipeline {
    registry: Arc<TypeRegistry>,
}

impl ConversionPipeline {
    #[must_use]
    pub fn new(registry: Arc<TypeRegistry>) -> Self {
        Self { registry }
    }

    #[must_use]
    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Convert `raw` into the descriptor's target type
    ///
    /// # Errors
    ///
    /// Returns [`Error::Conversion`] when no strategy can produce the target
    /// type, [`Error::AmbiguousTokenizer`] for a conflicting tokenizer
    /// declaration and [`Error::Instantiation`] when a declared converter or
    /// tokenizer cannot be built. Errors from converters and editors are
    /// passed through.
    pub fn convert(&self, method: &MethodDescriptor, raw: &PropertyValue) -> Result<Option<Value>> {
        self.convert_as(method, &method.target, raw)
    }

    fn convert_as(
        &self,
        method: &MethodDescriptor,
        target: &TargetType,
        raw: &PropertyValue,
    ) -> Result<Option<Value>> {
        for strategy in Strategy::ORDER {
            if let Step::Done(value) = strategy.try_convert(self, method, target, raw)? {
                trace!("Converted '{}' to {target} via {strategy:?}", method.full_key());
                return Ok(value);
            }
        }
        Err(Error::conversion(raw, target))
    }

    /// Split `text` and convert every token to `element`, keeping positions
    fn convert_tokens(
        &self,
        method: &MethodDescriptor,
        element: &TargetType,
        text: &str,
    ) -> Result<Vec<Value>> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        let tokenizer = resolve_tokenizer(&method.tokenizer, &method.type_tokenizer)?;
        tokenizer
            .tokens(text)
            .into_iter()
            .map(|token| {
                let raw = PropertyValue::Text(token);
                self.convert_as(method, element, &raw)?
                    .ok_or_else(|| Error::conversion(&raw, element))
            })
            .collect()
    }

    fn build_collection(
        &self,
        kind: &CollectionKind,
        target: &TargetType,
        items: Vec<Value>,
    ) -> Result<Value> {
        match kind {
            CollectionKind::List => Ok(Value::List(items)),
            CollectionKind::Set => {
                let mut unique: Vec<Value> = Vec::with_capacity(items.len());
                for item in items {
                    if !unique.contains(&item) {
                        unique.push(item);
                    }
                }
                Ok(Value::Set(unique))
            }
            CollectionKind::SortedSet => {
                let mut items = items;
                let mut comparable = true;
                items.sort_by(|a, b| {
                    a.natural_cmp(b).unwrap_or_else(|| {
                        comparable = false;
                        Ordering::Equal
                    })
                });
                if !comparable {
                    return Err(Error::Conversion {
                        value: "elements without a natural ordering".into(),
                        target: target.to_string(),
                    });
                }
                items.dedup_by(|a, b| a.natural_cmp(b) == Some(Ordering::Equal));
                Ok(Value::SortedSet(items))
            }
            CollectionKind::Named(name) => self
                .registry
                .build_collection(name, items)
                .ok_or_else(|| Error::Instantiation {
                    name: format!("Collection '{name}'"),
                    reason: "no such collection type is registered".into(),
                }),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
