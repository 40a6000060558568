//! Content-addressed result cache with TTL expiry and LRU eviction.
//!
//! Keys combine a hash of the audio content with a hash of the pipeline
//! configuration fingerprint, so a config change never serves stale results.
//! Entries can optionally be persisted to a directory, one JSON file per
//! key, written atomically (temp file + rename). Misses are never cached.

use crate::core::pipeline::PipelineResult;
use crate::services::audio::AudioBuffer;
use crate::{Result, error::HanToneError};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::RwLock;

/// Cache key: hex of the XOR of the audio digest and the config digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey(String);

impl CacheKey {
    /// Compute the key for an audio buffer under a config fingerprint.
    pub fn compute(audio: &AudioBuffer, config_fingerprint: &str) -> Self {
        let audio_digest = md5::compute(audio.content_bytes());
        let config_digest = md5::compute(config_fingerprint.as_bytes());
        let mut combined = [0u8; 16];
        for i in 0..16 {
            combined[i] = audio_digest.0[i] ^ config_digest.0[i];
        }
        let mut hex = String::with_capacity(32);
        for byte in combined {
            hex.push_str(&format!("{byte:02x}"));
        }
        CacheKey(hex)
    }

    /// Hex form, used as the persistence file name.
    pub fn as_hex(&self) -> &str {
        &self.0
    }
}

/// One cached pipeline result with its creation timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub result: PipelineResult,
    /// Seconds since the Unix epoch at insertion time
    pub created_at_epoch: u64,
}

struct Slot {
    entry: CacheEntry,
    last_access: SystemTime,
}

/// TTL + LRU result cache, optionally backed by a directory.
pub struct ResultCache {
    slots: RwLock<HashMap<String, Slot>>,
    ttl: Duration,
    max_entries: usize,
    directory: Option<PathBuf>,
}

impl ResultCache {
    /// Create a cache with the given TTL and entry cap.
    pub fn new(ttl: Duration, max_entries: usize, directory: Option<PathBuf>) -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
            ttl,
            max_entries: max_entries.max(1),
            directory,
        }
    }

    /// Look up a key. Expired entries are treated as misses and dropped;
    /// on an in-memory miss the persistence directory is consulted.
    pub async fn get(&self, key: &CacheKey) -> Option<PipelineResult> {
        {
            let mut slots = self.slots.write().await;
            if let Some(slot) = slots.get_mut(key.as_hex()) {
                if self.is_fresh(&slot.entry) {
                    slot.last_access = SystemTime::now();
                    debug!("Cache hit (memory): {}", key.as_hex());
                    return Some(slot.entry.result.clone());
                }
                slots.remove(key.as_hex());
            }
        }

        let entry = self.load_from_disk(key)?;
        if !self.is_fresh(&entry) {
            return None;
        }
        debug!("Cache hit (disk): {}", key.as_hex());
        let result = entry.result.clone();
        let mut slots = self.slots.write().await;
        slots.insert(
            key.as_hex().to_string(),
            Slot {
                entry,
                last_access: SystemTime::now(),
            },
        );
        Some(result)
    }

    /// Insert a result, evicting the least recently used entry past the
    /// cap, and persist it when a directory is configured.
    pub async fn insert(&self, key: CacheKey, result: PipelineResult) -> Result<()> {
        let entry = CacheEntry {
            result,
            created_at_epoch: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
        };

        if let Some(dir) = &self.directory {
            if let Err(e) = persist_atomically(dir, &key, &entry) {
                // Persistence is best-effort; the in-memory entry still counts.
                warn!("Cache persistence failed for {}: {e}", key.as_hex());
            }
        }

        let mut slots = self.slots.write().await;
        slots.insert(
            key.as_hex().to_string(),
            Slot {
                entry,
                last_access: SystemTime::now(),
            },
        );
        while slots.len() > self.max_entries {
            let oldest = slots
                .iter()
                .min_by_key(|(_, slot)| slot.last_access)
                .map(|(k, _)| k.clone());
            match oldest {
                Some(k) => {
                    debug!("Cache eviction: {k}");
                    slots.remove(&k);
                }
                None => break,
            }
        }
        Ok(())
    }

    /// Number of live in-memory entries.
    pub async fn len(&self) -> usize {
        self.slots.read().await.len()
    }

    /// Whether the in-memory cache is empty.
    pub async fn is_empty(&self) -> bool {
        self.slots.read().await.is_empty()
    }

    /// Drop all in-memory entries and delete persisted files.
    pub async fn clear(&self) -> Result<usize> {
        let mut removed = {
            let mut slots = self.slots.write().await;
            let n = slots.len();
            slots.clear();
            n
        };
        if let Some(dir) = &self.directory {
            if dir.is_dir() {
                for entry in std::fs::read_dir(dir)? {
                    let path = entry?.path();
                    if path.extension().is_some_and(|ext| ext == "json") {
                        std::fs::remove_file(&path)?;
                        removed += 1;
                    }
                }
            }
        }
        Ok(removed)
    }

    fn is_fresh(&self, entry: &CacheEntry) -> bool {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        now.saturating_sub(entry.created_at_epoch) <= self.ttl.as_secs()
    }

    fn load_from_disk(&self, key: &CacheKey) -> Option<CacheEntry> {
        let dir = self.directory.as_ref()?;
        let path = dir.join(format!("{}.json", key.as_hex()));
        let bytes = std::fs::read(path).ok()?;
        match serde_json::from_slice(&bytes) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Discarding corrupt cache file {}: {e}", key.as_hex());
                None
            }
        }
    }
}

/// Write the entry to `<dir>/<key>.json` via a temp file and rename, so
/// readers never observe a partial write.
fn persist_atomically(dir: &PathBuf, key: &CacheKey, entry: &CacheEntry) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    let final_path = dir.join(format!("{}.json", key.as_hex()));
    let temp_path = dir.join(format!(".{}.tmp", key.as_hex()));
    let bytes = serde_json::to_vec(entry)?;
    std::fs::write(&temp_path, bytes)?;
    std::fs::rename(&temp_path, &final_path)
        .map_err(|e| HanToneError::cache(format!("atomic rename: {e}")))?;
    Ok(())
}
