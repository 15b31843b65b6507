//! Synthesized audio served to telephony
//!
//! `<Play>` needs a URL, so every clip a turn produces is parked here under
//! a random id until its call is evicted.

use std::time::Instant;

use agrow_core::AudioClip;
use dashmap::DashMap;

struct StoredAudio {
    call_id: String,
    clip: AudioClip,
    stored_at: Instant,
}

#[derive(Default)]
pub struct AudioStore {
    artifacts: DashMap<String, StoredAudio>,
}

impl AudioStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep `clip` for `call_id` and return its artifact id
    pub fn put(&self, call_id: &str, clip: AudioClip) -> String {
        let id = format!("{}.{}", uuid::Uuid::new_v4().simple(), clip.format.extension());
        self.artifacts.insert(
            id.clone(),
            StoredAudio {
                call_id: call_id.to_string(),
                clip,
                stored_at: Instant::now(),
            },
        );
        id
    }

    pub fn get(&self, id: &str) -> Option<AudioClip> {
        self.artifacts.get(id).map(|a| a.clip.clone())
    }

    /// Drop every artifact of the given calls
    pub fn evict_calls(&self, call_ids: &[String]) -> usize {
        let before = self.artifacts.len();
        self.artifacts.retain(|_, a| !call_ids.contains(&a.call_id));
        let removed = before.saturating_sub(self.artifacts.len());
        if removed > 0 {
            tracing::debug!(removed, calls = call_ids.len(), "Evicted audio artifacts");
        }
        removed
    }

    /// Age of the oldest artifact, for health reporting
    pub fn oldest_secs(&self) -> Option<u64> {
        self.artifacts
            .iter()
            .map(|a| a.stored_at.elapsed().as_secs())
            .max()
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }
}
