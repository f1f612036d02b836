//! End-to-end interning scenarios against the in-process heap host.

use pincache::{HeapHost, HostEnv, StringCache, StringEnv, hash_utf16};

fn utf16(s: &str) -> Vec<u16> {
    s.encode_utf16().collect()
}

/// A value that maps to `bucket` in a 256-slot table but shares a full hash
/// with no single-unit value: `31 * 16 + (bucket + 16) mod 256` is congruent
/// to `bucket` mod 256 and always at least 496.
fn bucket_collider(bucket: u16) -> [u16; 2] {
    [16, (bucket + 16) % 256]
}

#[test]
fn test_single_threaded_lifecycle() {
    let host = HeapHost::new();
    let cache = StringCache::new();
    assert_eq!(cache.table_size(), 256);
    assert_eq!(cache.max_cached_len(), 1024);

    let mut held = Vec::new();
    let alpha = utf16("alpha");

    held.push(cache.intern_utf16(&host, &alpha).unwrap());
    assert_eq!(cache.hits(), 0);
    assert_eq!(cache.misses(), 1);

    held.push(cache.intern_utf16(&host, &alpha).unwrap());
    assert_eq!(cache.hits(), 1);
    assert_eq!(cache.misses(), 1);

    // Over the length threshold: created directly, never cached.
    let long = vec![0x41u16; 2000];
    held.push(cache.intern_utf16(&host, &long).unwrap());
    assert_eq!(cache.skips(), 1);

    // First sweep: one single-unit value per bucket. Every one is a fresh
    // miss; the only possible eviction is "alpha" losing its bucket.
    for unit in 0..256u16 {
        held.push(cache.intern_utf16(&host, &[unit]).unwrap());
    }
    assert_eq!(cache.hits(), 1);
    assert_eq!(cache.misses(), 1 + 256);

    // Second sweep: same buckets, different full hashes. Each intern
    // displaces the first sweep's occupant, and nothing else.
    let before = cache.counters();
    for bucket in 0..256u16 {
        let value = bucket_collider(bucket);
        assert_eq!(hash_utf16(&value) % 256, u32::from(bucket));
        assert_ne!(hash_utf16(&value), hash_utf16(&[bucket]));
        held.push(cache.intern_utf16(&host, &value).unwrap());
    }
    let delta = cache.counters().diff(&before);
    assert_eq!(delta.evictions, 256);
    assert_eq!(delta.misses, 256);
    assert_eq!(delta.hits, 0);

    for handle in held.drain(..) {
        host.release(handle);
    }
    cache.teardown(&host);
    assert_eq!(host.live_refs(), 0);
    assert_eq!(host.live_strings(), 0);
}

#[test]
fn test_repeated_interning_converges_to_hits() {
    let host = HeapHost::new();
    let cache = StringCache::new();
    let value = utf16("converge");

    let first = cache.intern_utf16(&host, &value).unwrap();
    for _ in 0..100 {
        let handle = cache.intern_utf16(&host, &value).unwrap();
        assert_eq!(handle, first);
        assert!(host.value_equals(handle, value.as_slice()));
        host.release(handle);
    }
    assert_eq!(cache.hits(), 100);
    assert_eq!(cache.misses(), 1);

    host.release(first);
    cache.teardown(&host);
    assert_eq!(host.live_refs(), 0);
}

#[test]
fn test_clear_is_a_reset_for_unpinned_entries() {
    let host = HeapHost::new();
    let cache = StringCache::new();

    let mut held = Vec::new();
    for word in ["one", "two", "three"] {
        held.push(cache.intern_utf16(&host, &utf16(word)).unwrap());
    }
    held.push(cache.intern_bytes(&host, b"four").unwrap());
    assert_eq!(cache.misses(), 4);

    cache.clear(&host);

    // Everything cached was released; only the caller's handles survive.
    assert_eq!(host.live_refs(), held.len());

    let again = cache.intern_utf16(&host, &utf16("one")).unwrap();
    assert_eq!(cache.misses(), 5);
    assert_eq!(cache.hits(), 0);
    assert_eq!(cache.evictions(), 0);

    host.release(again);
    for handle in held.drain(..) {
        host.release(handle);
    }
    cache.teardown(&host);
    assert_eq!(host.live_refs(), 0);
    assert_eq!(host.live_strings(), 0);
}

#[test]
fn test_skips_never_touch_the_table() {
    let host = HeapHost::new();
    let cache = StringCache::builder()
        .table_size(256)
        .max_cached_len(16)
        .build()
        .unwrap();
    let long = utf16("exactly sixteen!");
    assert_eq!(long.len(), 16);

    let first = cache.intern_utf16(&host, &long).unwrap();
    let second = cache.intern_utf16(&host, &long).unwrap();
    assert_eq!(cache.skips(), 2);
    assert_eq!(cache.hits(), 0);
    assert_eq!(cache.misses(), 0);
    assert_ne!(first, second);

    // Each skip allocated its own string; neither holds a cache reference.
    assert_eq!(host.live_strings(), 2);
    assert_eq!(host.live_refs(), 2);

    host.release(first);
    host.release(second);
    cache.teardown(&host);
    assert_eq!(host.live_strings(), 0);
}

#[test]
fn test_creation_failure_surfaces_mid_sequence() {
    let host = HeapHost::new();
    let cache = StringCache::new();

    let ok = cache.intern_bytes(&host, b"steady").unwrap();
    host.fail_next_create();
    assert!(cache.intern_bytes(&host, b"flaky").is_err());

    // The failure affected neither the cached entry nor later calls.
    let hit = cache.intern_bytes(&host, b"steady").unwrap();
    assert_eq!(cache.hits(), 1);
    let retried = cache.intern_bytes(&host, b"flaky").unwrap();
    assert!(host.value_equals(retried, b"flaky".as_slice()));

    for handle in [ok, hit, retried] {
        host.release(handle);
    }
    cache.teardown(&host);
    assert_eq!(host.live_refs(), 0);
}
