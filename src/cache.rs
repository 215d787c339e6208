//! Cache sizing for converted values

/// How many converted values a [`Config`](crate::Config) keeps around
///
/// The cache is keyed by descriptor key and target type and is dropped on
/// every commit (reload, set, remove, clear).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheStrategy {
    /// Keep every converted value (default)
    #[default]
    Full,
    /// LRU cache with maximum entries
    Lru(usize),
    /// Convert on every read
    None,
}

impl CacheStrategy {
    /// Validate cache strategy configuration
    ///
    /// # Errors
    ///
    /// Returns error if LRU size is 0
    pub fn validate(&self) -> crate::Result<()> {
        match self {
            CacheStrategy::Lru(0) => Err(crate::Error::Config(
                "LRU cache size must be greater than 0".into(),
            )),
            _ => Ok(()),
        }
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        !matches!(self, CacheStrategy::None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_sized_lru_is_rejected() {
        assert!(CacheStrategy::Lru(0).validate().is_err());
        assert!(CacheStrategy::Lru(1).validate().is_ok());
        assert!(CacheStrategy::Full.validate().is_ok());
        assert!(!CacheStrategy::None.is_enabled());
    }
}
