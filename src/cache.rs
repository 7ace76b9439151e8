//! In-memory query cache with per-prefix TTLs
//!
//! Entries expire lazily: a stale entry is removed the next time it is read.
//! [`CacheManager::prune`] sweeps everything at once for callers that want
//! periodic cleanup.

use std::any::Any;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Fallback TTL when no rule matches
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Cached value with its freshness window
pub struct CacheEntry {
    data: Box<dyn Any + Send + Sync>,
    timestamp: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn new<T: Send + Sync + 'static>(data: T, ttl: Duration) -> Self {
        Self {
            data: Box::new(data),
            timestamp: Instant::now(),
            ttl,
        }
    }

    /// When the entry was stored
    pub fn timestamp(&self) -> Instant {
        self.timestamp
    }

    /// Freshness window of the entry
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Readable while `now - timestamp <= ttl`
    pub fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.timestamp) > self.ttl
    }
}

impl std::fmt::Debug for CacheEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheEntry")
            .field("timestamp", &self.timestamp)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

/// Key-prefix to TTL table
#[derive(Debug, Clone)]
pub struct TtlRules {
    rules: Vec<(String, Duration)>,
    default: Duration,
}

impl TtlRules {
    /// Empty table with a fallback TTL
    pub fn new(default: Duration) -> Self {
        Self {
            rules: Vec::new(),
            default,
        }
    }

    /// Replace the fallback TTL
    pub fn with_default(mut self, ttl: Duration) -> Self {
        self.default = ttl;
        self
    }

    /// Add or replace a rule
    pub fn with_rule(mut self, pattern: impl Into<String>, ttl: Duration) -> Self {
        self.set_rule(pattern, ttl);
        self
    }

    /// Add or replace a rule in place
    pub fn set_rule(&mut self, pattern: impl Into<String>, ttl: Duration) {
        let pattern = pattern.into();
        match self.rules.iter_mut().find(|(p, _)| *p == pattern) {
            Some(rule) => rule.1 = ttl,
            None => self.rules.push((pattern, ttl)),
        }
    }

    /// Fallback TTL
    pub fn default_ttl(&self) -> Duration {
        self.default
    }

    /// Resolve the TTL for a key.
    ///
    /// Exact match wins; otherwise the longest matching prefix, ties going
    /// to the rule registered first; otherwise the fallback.
    pub fn resolve(&self, key: &str) -> Duration {
        if let Some((_, ttl)) = self.rules.iter().find(|(p, _)| p == key) {
            return *ttl;
        }

        let mut best: Option<&(String, Duration)> = None;
        for rule in self.rules.iter().filter(|(p, _)| key.starts_with(p.as_str())) {
            if best.is_none_or(|b| rule.0.len() > b.0.len()) {
                best = Some(rule);
            }
        }
        best.map(|(_, ttl)| *ttl).unwrap_or(self.default)
    }
}

impl Default for TtlRules {
    /// Staleness tolerance per query type: volatile installed-state
    /// listings are short-lived, static catalog listings long-lived.
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
            .with_rule("search:", Duration::from_secs(300))
            .with_rule("details:", Duration::from_secs(600))
            .with_rule("dependencies:", Duration::from_secs(600))
            .with_rule("reverse-dependencies:", Duration::from_secs(600))
            .with_rule("files:", Duration::from_secs(600))
            .with_rule("sections", Duration::from_secs(3600))
            .with_rule("section:", Duration::from_secs(600))
            .with_rule("repositories", Duration::from_secs(3600))
            .with_rule("stores", Duration::from_secs(3600))
            .with_rule("categories:", Duration::from_secs(3600))
            .with_rule("category:", Duration::from_secs(600))
            .with_rule("installed", Duration::from_secs(30))
            .with_rule("upgradable", Duration::from_secs(30))
            .with_rule("filter:", Duration::from_secs(60))
    }
}

/// Keyed store of time-stamped entries
#[derive(Debug, Default)]
pub struct CacheManager {
    entries: HashMap<String, CacheEntry>,
    rules: TtlRules,
}

impl CacheManager {
    /// Create a cache with the given TTL rules
    pub fn new(rules: TtlRules) -> Self {
        Self {
            entries: HashMap::new(),
            rules,
        }
    }

    /// TTL rules in effect
    pub fn rules(&self) -> &TtlRules {
        &self.rules
    }

    /// Get a fresh value, removing it if it has expired.
    ///
    /// A stored value of a different type reads as absent.
    pub fn get<T: Clone + 'static>(&mut self, key: &str) -> Option<T> {
        let now = Instant::now();
        let expired = self.entries.get(key)?.is_expired(now);
        if expired {
            debug!("Cache entry {} expired", key);
            self.entries.remove(key);
            return None;
        }

        let value = self
            .entries
            .get(key)
            .and_then(|entry| entry.data.downcast_ref::<T>())
            .cloned();
        if value.is_none() {
            debug!("Cache entry {} holds a different type", key);
        }
        value
    }

    /// Store a value; `ttl` of `None` resolves one from the rules
    pub fn set<T: Send + Sync + 'static>(&mut self, key: &str, value: T, ttl: Option<Duration>) {
        let ttl = ttl.unwrap_or_else(|| self.rules.resolve(key));
        debug!("Caching {} for {:?}", key, ttl);
        self.entries
            .insert(key.to_string(), CacheEntry::new(value, ttl));
    }

    /// Remove one key
    pub fn delete(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Remove everything
    pub fn clear(&mut self) {
        debug!("Clearing {} cache entries", self.entries.len());
        self.entries.clear();
    }

    /// Key presence, ignoring expiry
    pub fn has(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of stored entries, stale ones included
    pub fn size(&self) -> usize {
        self.entries.len()
    }

    /// Inspect an entry without touching it
    pub fn entry(&self, key: &str) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    /// Remove every key starting with `prefix`
    pub fn invalidate_pattern(&mut self, prefix: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, _| !key.starts_with(prefix));
        let removed = before - self.entries.len();
        if removed > 0 {
            debug!("Invalidated {} cache entries matching {}", removed, prefix);
        }
        removed
    }

    /// Remove all expired entries
    pub fn prune(&mut self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        before - self.entries.len()
    }
}
