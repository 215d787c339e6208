//! Target type descriptors for the conversion pipeline

use std::fmt;

/// Concrete shape of a collection target
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CollectionKind {
    /// Ordered, indexable sequence
    List,
    /// Insertion-ordered unique set
    Set,
    /// Naturally ordered unique set
    SortedSet,
    /// Any other collection type, built through
    /// [`TypeRegistry::register_collection`](super::TypeRegistry::register_collection)
    Named(String),
}

/// The declared type a raw value must be converted into
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TargetType {
    /// A single value of the named type (see [`TargetType::of`])
    Named(String),
    /// A filesystem path; a leading `~` is expanded
    Path,
    /// A type reference, resolved by name against the registry
    TypeRef,
    /// Fixed array of the element type
    Array(Box<TargetType>),
    /// Collection of the element type; `None` means text elements
    Collection {
        kind: CollectionKind,
        element: Option<Box<TargetType>>,
    },
}

impl TargetType {
    /// Target for the Rust type `T`, named by [`std::any::type_name`]
    #[must_use]
    pub fn of<T: ?Sized + 'static>() -> Self {
        TargetType::Named(std::any::type_name::<T>().to_string())
    }

    /// Plain text target
    #[must_use]
    pub fn string() -> Self {
        Self::of::<String>()
    }

    #[must_use]
    pub fn array(element: TargetType) -> Self {
        TargetType::Array(Box::new(element))
    }

    #[must_use]
    pub fn list(element: TargetType) -> Self {
        Self::collection(CollectionKind::List, Some(element))
    }

    #[must_use]
    pub fn set(element: TargetType) -> Self {
        Self::collection(CollectionKind::Set, Some(element))
    }

    #[must_use]
    pub fn sorted_set(element: TargetType) -> Self {
        Self::collection(CollectionKind::SortedSet, Some(element))
    }

    #[must_use]
    pub fn collection(kind: CollectionKind, element: Option<TargetType>) -> Self {
        TargetType::Collection {
            kind,
            element: element.map(Box::new),
        }
    }

    /// Registry name for single-value targets
    pub(crate) fn name(&self) -> Option<&str> {
        match self {
            TargetType::Named(name) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetType::Named(name) => f.write_str(name),
            TargetType::Path => f.write_str("std::path::PathBuf"),
            TargetType::TypeRef => f.write_str("type name"),
            TargetType::Array(element) => write!(f, "[{element}]"),
            TargetType::Collection { kind, element } => {
                let kind = match kind {
                    CollectionKind::List => "List",
                    CollectionKind::Set => "Set",
                    CollectionKind::SortedSet => "SortedSet",
                    CollectionKind::Named(name) => name,
                };
                match element {
                    Some(element) => write!(f, "{kind}<{element}>"),
                    None => f.write_str(kind),
                }
            }
        }
    }
}
