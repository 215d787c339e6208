//! Converted-value cache for `Config`
//!
//! Entries are keyed by the expanded key plus every descriptor setting that
//! shapes the conversion. The whole cache is dropped inside the commit
//! critical section and a generation counter is bumped with it; a value
//! converted from a superseded store carries the old generation and is
//! never inserted.

use crate::cache::CacheStrategy;
use crate::config::MethodDescriptor;
use crate::convert::{TokenizerSpec, Value};
use crate::sync::MutexExt;
use log::debug;
use lru::LruCache;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Mutex;

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
struct TokenizerId {
    separator: Option<String>,
    tokenizer: Option<String>,
}

impl From<&TokenizerSpec> for TokenizerId {
    fn from(spec: &TokenizerSpec) -> Self {
        Self {
            separator: spec.separator.clone(),
            tokenizer: spec.tokenizer.as_ref().map(|t| t.name().to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct CacheKey {
    key: String,
    target: String,
    converter: Option<String>,
    tokenizer: TokenizerId,
    type_tokenizer: TokenizerId,
    variable_expansion: bool,
}

impl CacheKey {
    /// Key for reading `method` under the already expanded `key`
    pub(crate) fn new(key: &str, method: &MethodDescriptor) -> Self {
        Self {
            key: key.to_string(),
            target: method.target.to_string(),
            converter: method.converter.as_ref().map(|c| c.name().to_string()),
            tokenizer: TokenizerId::from(&method.tokenizer),
            type_tokenizer: TokenizerId::from(&method.type_tokenizer),
            variable_expansion: method.variable_expansion,
        }
    }
}

enum Slots {
    Full(HashMap<CacheKey, Value>),
    Lru(LruCache<CacheKey, Value>),
    Disabled,
}

struct Inner {
    slots: Slots,
    /// Bumped by every invalidation
    generation: u64,
}

/// Generation of the store a value was converted from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Generation(u64);

pub(crate) struct ResultCache {
    inner: Mutex<Inner>,
}

impl ResultCache {
    /// Expects a validated strategy; a zero-sized LRU falls back to no cache
    pub(crate) fn new(strategy: CacheStrategy) -> Self {
        let slots = match strategy {
            CacheStrategy::Full => Slots::Full(HashMap::new()),
            CacheStrategy::Lru(size) => match NonZeroUsize::new(size) {
                Some(size) => Slots::Lru(LruCache::new(size)),
                None => Slots::Disabled,
            },
            CacheStrategy::None => Slots::Disabled,
        };
        Self {
            inner: Mutex::new(Inner {
                slots,
                generation: 0,
            }),
        }
    }

    /// Read while holding the store lock to tie it to that store
    pub(crate) fn generation(&self) -> Generation {
        Generation(self.inner.lock_recovered().generation)
    }

    pub(crate) fn get(&self, key: &CacheKey) -> Option<Value> {
        match &mut self.inner.lock_recovered().slots {
            Slots::Full(map) => map.get(key).cloned(),
            Slots::Lru(lru) => lru.get(key).cloned(),
            Slots::Disabled => None,
        }
    }

    /// Insert unless the cache was invalidated since `generation`
    ///
    /// Returns `false` for a stale generation.
    pub(crate) fn insert(&self, generation: Generation, key: CacheKey, value: Value) -> bool {
        let mut inner = self.inner.lock_recovered();
        if inner.generation != generation.0 {
            return false;
        }
        match &mut inner.slots {
            Slots::Full(map) => {
                map.insert(key, value);
            }
            Slots::Lru(lru) => {
                lru.put(key, value);
            }
            Slots::Disabled => {}
        }
        true
    }

    pub(crate) fn invalidate(&self) {
        let mut inner = self.inner.lock_recovered();
        inner.generation = inner.generation.wrapping_add(1);
        let dropped = match &mut inner.slots {
            Slots::Full(map) => {
                let len = map.len();
                map.clear();
                len
            }
            Slots::Lru(lru) => {
                let len = lru.len();
                lru.clear();
                len
            }
            Slots::Disabled => 0,
        };
        if dropped > 0 {
            debug!("Invalidated {dropped} cached values");
        }
    }

    pub(crate) fn len(&self) -> usize {
        match &self.inner.lock_recovered().slots {
            Slots::Full(map) => map.len(),
            Slots::Lru(lru) => lru.len(),
            Slots::Disabled => 0,
        }
    }
}
