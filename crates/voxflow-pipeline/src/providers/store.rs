//! Bounded in-memory store for synthesized audio.
//!
//! Doubles as the synthesis cache: entries are keyed by a hash of the text
//! and voice, so repeating a phrase never calls a provider twice.

use std::sync::{Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use sha2::{Digest, Sha256};
use voxflow_core::{AudioRef, DEFAULT_AUDIO_CACHE_ENTRIES};

/// Route under which stored audio is served.
pub const AUDIO_ROUTE_PREFIX: &str = "/api/audio";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredAudio {
    pub data: Bytes,
    pub content_type: String,
    /// Provider that produced the audio.
    pub provider: String,
    pub created_at: DateTime<Utc>,
}

/// Cache key for a text/voice pair.
pub fn cache_key(text: &str, voice: Option<&str>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hasher.update(b"|");
    hasher.update(voice.unwrap_or_default().as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Insertion-ordered audio map; the oldest entries are evicted first.
#[derive(Debug)]
pub struct AudioStore {
    entries: Mutex<IndexMap<String, StoredAudio>>,
    capacity: usize,
}

impl Default for AudioStore {
    fn default() -> Self {
        Self::new(DEFAULT_AUDIO_CACHE_ENTRIES)
    }
}

impl AudioStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(IndexMap::new()),
            capacity: capacity.max(1),
        }
    }

    fn entries(&self) -> MutexGuard<'_, IndexMap<String, StoredAudio>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Server-relative URI for a key.
    pub fn audio_ref_for(key: &str) -> AudioRef {
        AudioRef::new(format!("{AUDIO_ROUTE_PREFIX}/{key}"))
    }

    pub fn get(&self, key: &str) -> Option<StoredAudio> {
        self.entries().get(key).cloned()
    }

    /// Store audio under `key`, evicting the oldest entries beyond capacity.
    pub fn insert(&self, key: String, audio: StoredAudio) -> AudioRef {
        let audio_ref = Self::audio_ref_for(&key);
        let mut entries = self.entries();
        entries.shift_remove(&key);
        entries.insert(key, audio);

        while entries.len() > self.capacity {
            if let Some((evicted, _)) = entries.shift_remove_index(0) {
                tracing::debug!(target: "voxflow.store", key = %evicted, "Evicted cached audio");
            }
        }
        audio_ref
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}
