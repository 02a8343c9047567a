//! Counting-cache behavior through the public API. No GPU required.

use binfold_wgpu::cache::{PipelineKey, hash_source};
use binfold_wgpu::{CacheConfig, CountingCache, PipelineObjectCache};

#[test]
fn disable_counts_misses_but_preserves_entries() {
    let cache: CountingCache<String, u64> = CountingCache::new("test");
    cache.insert("k1".to_string(), 10);

    assert_eq!(cache.get(&"k1".to_string()), Some(10));
    assert_eq!(cache.get(&"k2".to_string()), None);

    cache.set_enabled(false);
    assert_eq!(cache.get(&"k1".to_string()), None);

    let stats = cache.stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 2);
    assert_eq!(cache.len(), 1);

    cache.set_enabled(true);
    assert_eq!(cache.get(&"k1".to_string()), Some(10));
    assert_eq!(cache.stats().hits, 2);
    assert_eq!(cache.stats().lookups(), 4);
}

#[test]
fn insert_while_disabled_leaves_no_entry_behind() {
    let cache: CountingCache<String, u64> = CountingCache::with_enabled("test", false);
    cache.insert("k1".to_string(), 1);
    assert!(cache.is_empty());

    cache.set_enabled(true);
    assert_eq!(cache.get(&"k1".to_string()), None);
    assert_eq!(cache.stats().misses, 1);
}

#[test]
fn get_or_insert_reuses_the_first_build() {
    let cache: CountingCache<u64, String> = CountingCache::new("test");
    let mut builds = 0;
    for _ in 0..3 {
        let value = cache.get_or_insert_with(7, || {
            builds += 1;
            "built".to_string()
        });
        assert_eq!(value, "built");
    }
    assert_eq!(builds, 1);

    let stats = cache.stats();
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hits, 2);
}

#[test]
fn pipeline_keys_track_source_and_entry() {
    let source = "@compute fn main() {}";
    let a = PipelineKey {
        source: hash_source(source),
        entry: "main".to_string(),
    };
    let b = PipelineKey {
        source: hash_source(source),
        entry: "main".to_string(),
    };
    let c = PipelineKey {
        source: hash_source(source),
        entry: "other".to_string(),
    };
    assert_eq!(a, b);
    assert_ne!(a, c);
}

#[test]
fn object_cache_aggregates_per_category_stats() {
    let cache = PipelineObjectCache::new();
    cache.shader_modules.get(&1);
    cache.shader_modules.get(&2);
    cache.pipeline_layouts.get(&"reduce".to_string());

    let stats = cache.stats();
    assert_eq!(stats.shader_modules.misses, 2);
    assert_eq!(stats.pipeline_layouts.misses, 1);
    assert_eq!(stats.bind_group_layouts.lookups(), 0);
    assert_eq!(stats.pipelines.lookups(), 0);

    let rendered = format!("{stats}");
    assert!(rendered.contains("shader modules"));
    assert!(rendered.contains("pipelines"));
}

#[test]
fn object_cache_honors_injected_config() {
    let cache = PipelineObjectCache::with_config(&CacheConfig { enabled: false });
    assert!(!cache.shader_modules.is_enabled());
    assert!(!cache.pipelines.is_enabled());

    cache.set_enabled(true);
    assert!(cache.bind_group_layouts.is_enabled());
}
