//! Counting caches for reusable pipeline objects.
//!
//! Shader modules, layouts, and compute pipelines are cheap to look up
//! and expensive to rebuild, so the engine keeps each category in a
//! [`CountingCache`] that tallies every lookup. A category can be
//! switched off for diagnostics: a disabled cache answers every lookup
//! as a counted miss while keeping its entries for re-enablement, and it
//! drops inserts. Nothing is ever evicted.
//!
//! The cache is an injected collaborator with an owner-visible
//! lifecycle; the engine constructs one (or accepts one) rather than
//! reaching for process-global state.

use std::collections::HashMap;
use std::fmt;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::Mutex;
use tracing::debug;

/// Hit/miss counters for one cache category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

impl CacheStats {
    pub fn lookups(&self) -> u64 {
        self.hits + self.misses
    }
}

/// Initial state for every category of a [`PipelineObjectCache`].
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub enabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

struct CacheInner<K, V> {
    entries: HashMap<K, V>,
    enabled: bool,
    stats: CacheStats,
}

/// A keyed object cache that counts every lookup.
pub struct CountingCache<K, V> {
    label: &'static str,
    inner: Mutex<CacheInner<K, V>>,
}

impl<K: Eq + Hash, V: Clone> CountingCache<K, V> {
    pub fn new(label: &'static str) -> Self {
        Self::with_enabled(label, true)
    }

    pub fn with_enabled(label: &'static str, enabled: bool) -> Self {
        Self {
            label,
            inner: Mutex::new(CacheInner {
                entries: HashMap::new(),
                enabled,
                stats: CacheStats::default(),
            }),
        }
    }

    /// Look up `key`, counting the outcome.
    ///
    /// A disabled cache serves every lookup as a counted miss without
    /// touching its stored entries.
    pub fn get(&self, key: &K) -> Option<V> {
        let mut inner = self.lock();
        if inner.enabled {
            if let Some(value) = inner.entries.get(key).cloned() {
                inner.stats.hits += 1;
                debug!(cache = self.label, "cache hit");
                return Some(value);
            }
        }
        inner.stats.misses += 1;
        debug!(cache = self.label, enabled = inner.enabled, "cache miss");
        None
    }

    /// Store `value` under `key`. Dropped while the cache is disabled.
    pub fn insert(&self, key: K, value: V) {
        let mut inner = self.lock();
        if !inner.enabled {
            return;
        }
        inner.entries.insert(key, value);
    }

    /// Look up `key`, building and storing the value on a miss.
    ///
    /// The builder runs outside the lock so it may consult other caches.
    /// While disabled this always builds and never stores.
    pub fn get_or_insert_with(&self, key: K, build: impl FnOnce() -> V) -> V {
        if let Some(hit) = self.get(&key) {
            return hit;
        }
        let value = build();
        self.insert(key, value.clone());
        value
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.lock().enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.lock().enabled
    }

    /// Number of stored entries, including those shadowed by disablement.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.lock().stats
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CacheInner<K, V>> {
        self.inner.lock().expect("pipeline cache lock poisoned")
    }
}

/// Key for a compiled compute pipeline: source identity plus entry point.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PipelineKey {
    pub source: u64,
    pub entry: String,
}

/// Stable-within-a-process key for shader source text.
pub fn hash_source(source: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    source.hash(&mut hasher);
    hasher.finish()
}

/// The four categories of reusable pipeline objects.
pub struct PipelineObjectCache {
    pub pipeline_layouts: CountingCache<String, wgpu::PipelineLayout>,
    pub bind_group_layouts: CountingCache<String, wgpu::BindGroupLayout>,
    pub shader_modules: CountingCache<u64, wgpu::ShaderModule>,
    pub pipelines: CountingCache<PipelineKey, wgpu::ComputePipeline>,
}

impl PipelineObjectCache {
    pub fn new() -> Self {
        Self::with_config(&CacheConfig::default())
    }

    pub fn with_config(config: &CacheConfig) -> Self {
        Self {
            pipeline_layouts: CountingCache::with_enabled("pipeline-layouts", config.enabled),
            bind_group_layouts: CountingCache::with_enabled("bind-group-layouts", config.enabled),
            shader_modules: CountingCache::with_enabled("shader-modules", config.enabled),
            pipelines: CountingCache::with_enabled("compute-pipelines", config.enabled),
        }
    }

    /// Enable or disable all four categories at once.
    pub fn set_enabled(&self, enabled: bool) {
        self.pipeline_layouts.set_enabled(enabled);
        self.bind_group_layouts.set_enabled(enabled);
        self.shader_modules.set_enabled(enabled);
        self.pipelines.set_enabled(enabled);
    }

    /// Snapshot of all four categories' counters.
    pub fn stats(&self) -> PipelineCacheStats {
        PipelineCacheStats {
            pipeline_layouts: self.pipeline_layouts.stats(),
            bind_group_layouts: self.bind_group_layouts.stats(),
            shader_modules: self.shader_modules.stats(),
            pipelines: self.pipelines.stats(),
        }
    }
}

impl Default for PipelineObjectCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-category counters, one line each in the `Display` report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineCacheStats {
    pub pipeline_layouts: CacheStats,
    pub bind_group_layouts: CacheStats,
    pub shader_modules: CacheStats,
    pub pipelines: CacheStats,
}

impl fmt::Display for PipelineCacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "cache hits/misses:")?;
        writeln!(
            f,
            "  pipeline layouts: {}/{}",
            self.pipeline_layouts.hits, self.pipeline_layouts.misses
        )?;
        writeln!(
            f,
            "  bind group layouts: {}/{}",
            self.bind_group_layouts.hits, self.bind_group_layouts.misses
        )?;
        writeln!(
            f,
            "  shader modules: {}/{}",
            self.shader_modules.hits, self.shader_modules.misses
        )?;
        write!(
            f,
            "  compute pipelines: {}/{}",
            self.pipelines.hits, self.pipelines.misses
        )
    }
}
