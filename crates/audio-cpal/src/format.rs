//! Stream format negotiation
//!
//! Devices advertise ranges of channel counts, sample rates, buffer sizes
//! and native sample formats. The capture config fixes the first three; the
//! sample format falls back to any integer or float format that cpal can
//! convert into the requested container.

use cpal::{FromSample, SampleFormat, SizedSample, SupportedBufferSize, SupportedStreamConfigRange};
use taperec_audio_core::{BackendError, CaptureConfig, Sample};

/// Native formats a stream can be converted from, best first
const CONVERTIBLE: [SampleFormat; 4] = [
    SampleFormat::F32,
    SampleFormat::I32,
    SampleFormat::I16,
    SampleFormat::I8,
];

/// Sample containers the cpal backend can deliver
///
/// Any of the [`CONVERTIBLE`] native formats converts into it.
pub trait CaptureSample:
    SizedSample + Sample + FromSample<f32> + FromSample<i32> + FromSample<i16> + FromSample<i8>
{
}

impl<T> CaptureSample for T where
    T: SizedSample + Sample + FromSample<f32> + FromSample<i32> + FromSample<i16> + FromSample<i8>
{
}

/// One advertised input configuration range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Candidate {
    pub channels: u16,
    pub min_rate: u32,
    pub max_rate: u32,
    /// `None` when the host does not report a buffer size range
    pub buffer: Option<(u32, u32)>,
    pub format: SampleFormat,
}

impl From<&SupportedStreamConfigRange> for Candidate {
    fn from(range: &SupportedStreamConfigRange) -> Self {
        let buffer = match *range.buffer_size() {
            SupportedBufferSize::Range { min, max } => Some((min, max)),
            SupportedBufferSize::Unknown => None,
        };

        Self {
            channels: range.channels(),
            min_rate: range.min_sample_rate().0,
            max_rate: range.max_sample_rate().0,
            buffer,
            format: range.sample_format(),
        }
    }
}

impl Candidate {
    fn fits_rate(&self, rate: u32) -> bool {
        (self.min_rate..=self.max_rate).contains(&rate)
    }

    fn fits_buffer(&self, frames: u32) -> bool {
        self.buffer
            .map_or(true, |(min, max)| (min..=max).contains(&frames))
    }
}

/// Pick the native sample format to open a stream with
///
/// `preferred` wins when a candidate matching the config offers it, otherwise
/// the first [`CONVERTIBLE`] format on offer is used.
pub(crate) fn select_format(
    candidates: &[Candidate],
    config: &CaptureConfig,
    preferred: SampleFormat,
) -> Result<SampleFormat, BackendError> {
    let channels = config.channels();
    let rate = config.sample_rate();
    let frames = config.frames_per_buffer();

    let with_channels: Vec<&Candidate> = candidates
        .iter()
        .filter(|c| c.channels == channels)
        .collect();
    if with_channels.is_empty() {
        return Err(BackendError::UnsupportedFormat(format!(
            "no input configuration with {} channels",
            channels
        )));
    }

    let with_rate: Vec<&Candidate> = with_channels
        .into_iter()
        .filter(|c| c.fits_rate(rate))
        .collect();
    if with_rate.is_empty() {
        return Err(BackendError::UnsupportedFormat(format!(
            "{} Hz is not supported with {} channels",
            rate, channels
        )));
    }

    let matching: Vec<&Candidate> = with_rate
        .into_iter()
        .filter(|c| c.fits_buffer(frames))
        .collect();
    if matching.is_empty() {
        return Err(BackendError::UnsupportedFormat(format!(
            "buffers of {} frames are not supported at {} Hz",
            frames, rate
        )));
    }

    if matching.iter().any(|c| c.format == preferred) {
        return Ok(preferred);
    }

    CONVERTIBLE
        .into_iter()
        .find(|format| matching.iter().any(|c| c.format == *format))
        .ok_or_else(|| {
            let offered: Vec<SampleFormat> = matching.iter().map(|c| c.format).collect();
            BackendError::UnsupportedFormat(format!(
                "no convertible sample format among {:?}",
                offered
            ))
        })
}
