use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Bit depths a sink may encode to
pub const SUPPORTED_BIT_DEPTHS: [u16; 4] = [8, 16, 24, 32];

/// Immutable parameters of a capture session
///
/// Built through [`CaptureConfig::new`] or deserialized; both paths run the
/// same validation, so a `CaptureConfig` value is always usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawCaptureConfig")]
pub struct CaptureConfig {
    channels: u16,
    sample_rate: u32,
    frames_per_buffer: u32,
    bit_depth: u16,
}

#[derive(Deserialize)]
struct RawCaptureConfig {
    channels: u16,
    sample_rate: u32,
    frames_per_buffer: u32,
    bit_depth: u16,
}

impl TryFrom<RawCaptureConfig> for CaptureConfig {
    type Error = ConfigError;

    fn try_from(raw: RawCaptureConfig) -> Result<Self, Self::Error> {
        Self::new(
            raw.channels,
            raw.sample_rate,
            raw.frames_per_buffer,
            raw.bit_depth,
        )
    }
}

impl CaptureConfig {
    pub fn new(
        channels: u16,
        sample_rate: u32,
        frames_per_buffer: u32,
        bit_depth: u16,
    ) -> Result<Self, ConfigError> {
        if channels == 0 {
            return Err(ConfigError::NoChannels);
        }
        if sample_rate == 0 {
            return Err(ConfigError::ZeroSampleRate);
        }
        if frames_per_buffer == 0 {
            return Err(ConfigError::ZeroFramesPerBuffer);
        }
        if !SUPPORTED_BIT_DEPTHS.contains(&bit_depth) {
            return Err(ConfigError::UnsupportedBitDepth(bit_depth));
        }

        Ok(Self {
            channels,
            sample_rate,
            frames_per_buffer,
            bit_depth,
        })
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn frames_per_buffer(&self) -> u32 {
        self.frames_per_buffer
    }

    /// Bit depth the sink encodes to; the capture loop ignores it
    pub fn bit_depth(&self) -> u16 {
        self.bit_depth
    }

    /// Length of one sample buffer (frames x channels)
    pub fn samples_per_buffer(&self) -> usize {
        self.frames_per_buffer as usize * self.channels as usize
    }

    /// Wall-clock time covered by one buffer
    pub fn buffer_duration(&self) -> Duration {
        Duration::from_secs_f64(f64::from(self.frames_per_buffer) / f64::from(self.sample_rate))
    }

    /// Number of buffers needed to cover `duration`, rounded up
    pub fn buffers_for(&self, duration: Duration) -> u64 {
        let frames = (duration.as_secs_f64() * f64::from(self.sample_rate)).ceil() as u64;
        frames.div_ceil(u64::from(self.frames_per_buffer))
    }
}
