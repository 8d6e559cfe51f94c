//! Offline fallback provider producing silent WAV audio.
//!
//! Sized to the text so clients can pace playback. Useful as the last
//! link of a chain in development and as a deterministic test provider.

use std::time::Duration;

use async_trait::async_trait;
use bytes::{BufMut, Bytes, BytesMut};
use voxflow_core::{ProviderError, SynthesisProvider, SynthesisRequest, SynthesizedAudio};

const SAMPLE_RATE: u32 = 16_000;
const BITS_PER_SAMPLE: u16 = 16;
const MS_PER_CHAR: u32 = 60;
const MIN_MS: u32 = 200;
const MAX_MS: u32 = 30_000;

#[derive(Debug, Clone)]
pub struct SilenceProvider {
    name: String,
}

impl Default for SilenceProvider {
    fn default() -> Self {
        Self::new("silence")
    }
}

impl SilenceProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Playback length for a piece of text.
    pub fn duration_for(text: &str) -> Duration {
        let chars = u32::try_from(text.chars().count()).unwrap_or(u32::MAX);
        let ms = chars.saturating_mul(MS_PER_CHAR).clamp(MIN_MS, MAX_MS);
        Duration::from_millis(u64::from(ms))
    }
}

/// Mono 16-bit PCM WAV of `duration` silence, capped at `MAX_MS`.
pub fn silent_wav(duration: Duration) -> Bytes {
    let ms = u32::try_from(duration.as_millis()).map_or(MAX_MS, |ms| ms.min(MAX_MS));
    let samples = SAMPLE_RATE / 1000 * ms;
    let block_align = BITS_PER_SAMPLE / 8;
    let data_len = samples * u32::from(block_align);

    let mut buf = BytesMut::with_capacity(44 + data_len as usize);
    buf.put_slice(b"RIFF");
    buf.put_u32_le(36 + data_len);
    buf.put_slice(b"WAVE");
    buf.put_slice(b"fmt ");
    buf.put_u32_le(16);
    buf.put_u16_le(1); // PCM
    buf.put_u16_le(1); // mono
    buf.put_u32_le(SAMPLE_RATE);
    buf.put_u32_le(SAMPLE_RATE * u32::from(block_align));
    buf.put_u16_le(block_align);
    buf.put_u16_le(BITS_PER_SAMPLE);
    buf.put_slice(b"data");
    buf.put_u32_le(data_len);
    buf.put_bytes(0, data_len as usize);
    buf.freeze()
}

#[async_trait]
impl SynthesisProvider for SilenceProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn synthesize(
        &self,
        request: &SynthesisRequest,
    ) -> Result<SynthesizedAudio, ProviderError> {
        if request.text.trim().is_empty() {
            return Err(ProviderError::Rejected("empty text".to_string()));
        }
        Ok(SynthesizedAudio {
            data: silent_wav(Self::duration_for(&request.text)),
            content_type: "audio/wav".to_string(),
        })
    }
}
