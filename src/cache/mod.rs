use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

/// Deterministic digest over `(model, system_prompt, user_prompt)`
///
/// Identical inputs always produce the same key, which is what makes the
/// cache safe to share across runs and concurrent callers: two writers for
/// the same key are writing identical values.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn derive(model: &str, system_prompt: &str, user_prompt: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(model.as_bytes());
        hasher.update([0u8]);
        hasher.update(system_prompt.as_bytes());
        hasher.update([0u8]);
        hasher.update(user_prompt.as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Content-addressed store for completions
///
/// `get` runs before every completion call; a hit suppresses the network call
/// entirely. Implementations must treat unreadable entries as misses, never
/// as errors: pipeline correctness cannot depend on cache integrity.
pub trait CompletionCache: Send + Sync {
    fn get(&self, key: &CacheKey) -> Option<String>;
    fn put(&self, key: &CacheKey, completion: &str);
}

/// On-disk entry format
#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry {
    response: String,
}

/// Disk-backed cache, one JSON file per key
///
/// Survives process restarts. This is the primary cost-control mechanism:
/// re-running a benchmark re-issues only the calls whose prompts changed.
pub struct DiskCache {
    dir: PathBuf,
}

impl DiskCache {
    /// Open (creating if needed) a cache directory
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create cache directory: {:?}", dir))?;
        Ok(Self { dir })
    }

    fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(format!("{}.json", key.as_str()))
    }
}

impl CompletionCache for DiskCache {
    fn get(&self, key: &CacheKey) -> Option<String> {
        let path = self.entry_path(key);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(_) => return None,
        };
        match serde_json::from_str::<CacheEntry>(&content) {
            Ok(entry) => Some(entry.response),
            Err(e) => {
                // Corrupt entry counts as a miss; the rewrite will repair it
                debug!("Unreadable cache entry {:?}: {}", path, e);
                None
            }
        }
    }

    fn put(&self, key: &CacheKey, completion: &str) {
        let entry = CacheEntry {
            response: completion.to_string(),
        };
        let path = self.entry_path(key);
        match serde_json::to_string_pretty(&entry) {
            Ok(json) => {
                if let Err(e) = std::fs::write(&path, json) {
                    warn!("Failed to write cache entry {:?}: {}", path, e);
                }
            }
            Err(e) => warn!("Failed to serialize cache entry: {}", e),
        }
    }
}

/// In-memory cache for tests and cache-off runs
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<CacheKey, String>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("cache lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CompletionCache for MemoryCache {
    fn get(&self, key: &CacheKey) -> Option<String> {
        self.entries
            .lock()
            .expect("cache lock poisoned")
            .get(key)
            .cloned()
    }

    fn put(&self, key: &CacheKey, completion: &str) {
        self.entries
            .lock()
            .expect("cache lock poisoned")
            .insert(key.clone(), completion.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_deterministic() {
        let a = CacheKey::derive("gpt-4o-mini", "system", "prompt");
        let b = CacheKey::derive("gpt-4o-mini", "system", "prompt");
        assert_eq!(a, b);

        let c = CacheKey::derive("gpt-4o-mini", "system", "other prompt");
        assert_ne!(a, c);
    }

    #[test]
    fn test_cache_key_fields_do_not_collide() {
        // "ab" + "c" must not hash like "a" + "bc"
        let a = CacheKey::derive("ab", "c", "p");
        let b = CacheKey::derive("a", "bc", "p");
        assert_ne!(a, b);
    }

    #[test]
    fn test_memory_cache_idempotence() {
        let cache = MemoryCache::new();
        let key = CacheKey::derive("m", "s", "u");

        assert!(cache.get(&key).is_none());
        cache.put(&key, "completion");
        assert_eq!(cache.get(&key).as_deref(), Some("completion"));

        // Same key, same value: observably unchanged
        cache.put(&key, "completion");
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&key).as_deref(), Some("completion"));
    }

    #[test]
    fn test_disk_cache_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::open(dir.path()).unwrap();
        let key = CacheKey::derive("m", "s", "u");

        assert!(cache.get(&key).is_none());
        cache.put(&key, "the completion");
        assert_eq!(cache.get(&key).as_deref(), Some("the completion"));

        // A second handle over the same directory sees the entry
        let reopened = DiskCache::open(dir.path()).unwrap();
        assert_eq!(reopened.get(&key).as_deref(), Some("the completion"));
    }

    #[test]
    fn test_disk_cache_corrupt_entry_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::open(dir.path()).unwrap();
        let key = CacheKey::derive("m", "s", "u");

        std::fs::write(dir.path().join(format!("{}.json", key.as_str())), "{not json").unwrap();
        assert!(cache.get(&key).is_none());
    }
}
