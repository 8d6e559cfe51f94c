//! Pipeline tuning knobs.
//!
//! Populated once at startup (CLI flags with environment fallbacks) and
//! validated before the pipeline is built.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::text::{DEFAULT_MAX_FRAGMENT_CHARS, DetectorConfig};

/// Default minimum speakable length before a fragment is sent on its own.
pub const DEFAULT_MIN_FRAGMENT_CHARS: usize = 10;

/// Default bound on cached synthesized audio entries.
pub const DEFAULT_AUDIO_CACHE_ENTRIES: usize = 1000;

pub const DEFAULT_PROVIDER_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_DRAIN_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_SESSION_IDLE_TIMEOUT_MS: u64 = 60_000;
pub const DEFAULT_TRANSPORT_BUFFER: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PipelineSettings {
    /// Fragments above this many chars are split further.
    pub max_fragment_chars: usize,
    /// Fragments below this many chars are merged into the next one.
    pub min_fragment_chars: usize,
    /// Per provider call.
    pub provider_timeout_ms: u64,
    /// How long a finished session waits for outstanding fragments.
    pub drain_timeout_ms: u64,
    /// Longest gap between generator tokens before the session gives up.
    pub session_idle_timeout_ms: u64,
    pub audio_cache_entries: usize,
    /// Capacity of each client's outbound event channel.
    pub transport_buffer: usize,
    /// Voice used when a request carries no hint.
    pub default_voice: Option<String>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            max_fragment_chars: DEFAULT_MAX_FRAGMENT_CHARS,
            min_fragment_chars: DEFAULT_MIN_FRAGMENT_CHARS,
            provider_timeout_ms: DEFAULT_PROVIDER_TIMEOUT_MS,
            drain_timeout_ms: DEFAULT_DRAIN_TIMEOUT_MS,
            session_idle_timeout_ms: DEFAULT_SESSION_IDLE_TIMEOUT_MS,
            audio_cache_entries: DEFAULT_AUDIO_CACHE_ENTRIES,
            transport_buffer: DEFAULT_TRANSPORT_BUFFER,
            default_voice: None,
        }
    }
}

impl PipelineSettings {
    pub const fn provider_timeout(&self) -> Duration {
        Duration::from_millis(self.provider_timeout_ms)
    }

    pub const fn drain_timeout(&self) -> Duration {
        Duration::from_millis(self.drain_timeout_ms)
    }

    pub const fn session_idle_timeout(&self) -> Duration {
        Duration::from_millis(self.session_idle_timeout_ms)
    }

    pub const fn detector(&self) -> DetectorConfig {
        DetectorConfig {
            max_chars: self.max_fragment_chars,
        }
    }

    /// Reject combinations the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.max_fragment_chars < 20 {
            return Err(SettingsError::MaxFragmentTooSmall(self.max_fragment_chars));
        }
        if self.min_fragment_chars >= self.max_fragment_chars {
            return Err(SettingsError::MinAboveMax {
                min: self.min_fragment_chars,
                max: self.max_fragment_chars,
            });
        }
        for (name, ms) in [
            ("provider timeout", self.provider_timeout_ms),
            ("drain timeout", self.drain_timeout_ms),
            ("session idle timeout", self.session_idle_timeout_ms),
        ] {
            if ms == 0 {
                return Err(SettingsError::ZeroTimeout(name));
            }
        }
        if self.audio_cache_entries == 0 {
            return Err(SettingsError::EmptyCache);
        }
        if self.transport_buffer == 0 {
            return Err(SettingsError::EmptyTransportBuffer);
        }
        Ok(())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SettingsError {
    #[error("Max fragment length must be at least 20 chars, got {0}")]
    MaxFragmentTooSmall(usize),

    #[error("Min fragment length ({min}) must be below max fragment length ({max})")]
    MinAboveMax { min: usize, max: usize },

    #[error("The {0} must be greater than zero")]
    ZeroTimeout(&'static str),

    #[error("Audio cache must hold at least one entry")]
    EmptyCache,

    #[error("Transport buffer must hold at least one event")]
    EmptyTransportBuffer,
}
