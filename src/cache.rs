//! Time-bounded cache for the type index and resolved type nodes.
//!
//! Entries are keyed by string and never mutated after insertion. Type nodes are
//! cached per reference under a role-specific prefix, so the same node loaded as a
//! resource and as a generic type occupies two independent entries.

use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::debug;

use crate::index::TypeIndex;
use crate::types::{CrossFileTypeReference, TypeKind, TypeNode};

/// Default lifetime of a cache entry (24 hours).
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

const TYPE_INDEX_CACHE_KEY: &str = "bicep_az_type_index";

/// Source of the current time for expiry checks.
pub trait Clock: Send + Sync + fmt::Debug {
    fn now(&self) -> Instant;
}

/// Wall clock backed by [`Instant::now`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to. Useful for exercising expiry in tests.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Instant>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Instant::now()),
        }
    }

    /// Move the clock forward by `duration`.
    pub fn advance(&self, duration: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *now += duration;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Namespace a type node is cached under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheRole {
    Resource,
    ResourceFunction,
    Generic,
}

impl CacheRole {
    fn key_prefix(&self) -> &'static str {
        match self {
            CacheRole::Resource => "bicep_az_resource_type_",
            CacheRole::ResourceFunction => "bicep_az_function_type_",
            CacheRole::Generic => "bicep_az_type_",
        }
    }

    /// Kind a node must have to be served under this role, if restricted.
    pub fn expected_kind(&self) -> Option<TypeKind> {
        match self {
            CacheRole::Resource => Some(TypeKind::Resource),
            CacheRole::ResourceFunction => Some(TypeKind::ResourceFunction),
            CacheRole::Generic => None,
        }
    }

    fn cache_key(&self, reference: &CrossFileTypeReference) -> String {
        format!("{}{}", self.key_prefix(), reference)
    }
}

#[derive(Debug, Clone)]
enum CachedValue {
    Index(Arc<TypeIndex>),
    Type(Arc<TypeNode>),
}

#[derive(Debug)]
struct CacheEntry {
    value: CachedValue,
    expires_at: Instant,
}

/// Process-wide store shared by every loader that holds an `Arc` to it.
///
/// Safe for concurrent use. Concurrent misses on the same key may both fetch and
/// both insert; the values are identical so the last write wins.
#[derive(Debug)]
pub struct TypeCache {
    entries: DashMap<String, CacheEntry>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl TypeCache {
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            clock,
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The cached type index, unless missing or expired.
    pub fn index(&self) -> Option<Arc<TypeIndex>> {
        match self.get(TYPE_INDEX_CACHE_KEY)? {
            CachedValue::Index(index) => Some(index),
            CachedValue::Type(_) => None,
        }
    }

    /// Replace the cached type index.
    pub fn store_index(&self, index: Arc<TypeIndex>) {
        self.insert(TYPE_INDEX_CACHE_KEY.to_string(), CachedValue::Index(index));
    }

    pub fn get_type(
        &self,
        role: CacheRole,
        reference: &CrossFileTypeReference,
    ) -> Option<Arc<TypeNode>> {
        match self.get(&role.cache_key(reference))? {
            CachedValue::Type(node) => Some(node),
            CachedValue::Index(_) => None,
        }
    }

    pub fn store_type(
        &self,
        role: CacheRole,
        reference: &CrossFileTypeReference,
        node: Arc<TypeNode>,
    ) {
        self.insert(role.cache_key(reference), CachedValue::Type(node));
    }

    pub fn contains_type(&self, role: CacheRole, reference: &CrossFileTypeReference) -> bool {
        self.get_type(role, reference).is_some()
    }

    /// Number of stored entries, including ones that expired but were not yet evicted.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry whose lifetime has elapsed.
    pub fn purge_expired(&self) {
        let now = self.clock.now();
        self.entries.retain(|_, entry| entry.expires_at > now);
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    fn get(&self, key: &str) -> Option<CachedValue> {
        let now = self.clock.now();
        let hit = self
            .entries
            .get(key)
            .map(|entry| (entry.expires_at > now, entry.value.clone()));

        match hit {
            Some((true, value)) => {
                debug!(key, "cache hit");
                Some(value)
            }
            Some((false, _)) => {
                debug!(key, "cache entry expired");
                self.entries.remove_if(key, |_, entry| entry.expires_at <= now);
                None
            }
            None => None,
        }
    }

    fn insert(&self, key: String, value: CachedValue) {
        let expires_at = self.clock.now() + self.ttl;
        self.entries.insert(key, CacheEntry { value, expires_at });
    }
}

impl Default for TypeCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL)
    }
}
