use std::fs::{self, File};
use std::io::BufWriter;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::time::Duration;

use hound::{SampleFormat, WavSpec, WavWriter};

use super::control::{Continuation, StopHandle};
use crate::config::CaptureConfig;
use crate::error::SinkError;
use crate::sample::{widen_into, Sample};
use crate::traits::StreamSink;

/// Sink that encodes captured buffers into a PCM WAV file
///
/// Samples of type `T` are widened into an `i32` adapter buffer and written
/// at the configured bit depth, so 8-bit capture can be stored as 16-bit PCM.
/// 24-bit files take `i32` samples and keep their top 24 bits.
/// The file is created on `open` and its header is finalized on `close`.
pub struct WavSink<T> {
    path: PathBuf,
    spec: WavSpec,
    writer: Option<WavWriter<BufWriter<File>>>,
    adapter: Vec<i32>,
    shift: u32,
    continuation: Continuation,
    samples_written: u64,
    _sample: PhantomData<fn(&[T])>,
}

impl<T: Sample> WavSink<T> {
    pub fn new(path: impl Into<PathBuf>, config: &CaptureConfig) -> Self {
        let spec = WavSpec {
            channels: config.channels(),
            sample_rate: config.sample_rate(),
            bits_per_sample: config.bit_depth(),
            sample_format: SampleFormat::Int,
        };

        Self {
            path: path.into(),
            spec,
            writer: None,
            adapter: Vec::with_capacity(config.samples_per_buffer()),
            shift: 0,
            continuation: Continuation::default(),
            samples_written: 0,
            _sample: PhantomData,
        }
    }

    /// Ask the capture loop to stop once `buffers` buffers have been written
    pub fn with_buffer_limit(mut self, buffers: u64) -> Self {
        self.continuation.set_limit(buffers);
        self
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.continuation.stop_handle()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_open(&self) -> bool {
        self.writer.is_some()
    }

    pub fn buffers_written(&self) -> u64 {
        self.continuation.delivered()
    }

    /// Total samples written across all channels
    pub fn samples_written(&self) -> u64 {
        self.samples_written
    }

    /// Audio duration written so far
    pub fn duration(&self) -> Duration {
        let frames = self.samples_written / u64::from(self.spec.channels);
        Duration::from_secs_f64(frames as f64 / f64::from(self.spec.sample_rate))
    }
}

impl<T: Sample> StreamSink<T> for WavSink<T> {
    fn open(&mut self) -> Result<(), SinkError> {
        self.shift = narrowing_shift(T::BITS, self.spec.bits_per_sample).ok_or(
            SinkError::UnsupportedBitDepth {
                sample_bits: T::BITS,
                bit_depth: self.spec.bits_per_sample,
            },
        )?;

        if self.writer.is_some() {
            tracing::warn!(path = %self.path.display(), "WAV sink is already open");
            return Ok(());
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let writer = WavWriter::create(&self.path, self.spec)?;
        self.writer = Some(writer);

        tracing::info!(
            path = %self.path.display(),
            channels = self.spec.channels,
            sample_rate = self.spec.sample_rate,
            bit_depth = self.spec.bits_per_sample,
            "WAV sink opened"
        );
        Ok(())
    }

    fn write(&mut self, buffer: &[T]) -> bool {
        let Some(writer) = self.writer.as_mut() else {
            tracing::warn!("Write to a WAV sink that is not open");
            return false;
        };

        widen_into(buffer, &mut self.adapter);
        for &sample in &self.adapter {
            if let Err(e) = writer.write_sample(sample >> self.shift) {
                tracing::warn!(path = %self.path.display(), "Failed to write sample: {}", e);
                return false;
            }
        }
        self.samples_written += self.adapter.len() as u64;

        self.continuation.record()
    }

    fn close(&mut self) -> Result<(), SinkError> {
        let Some(writer) = self.writer.take() else {
            return Ok(());
        };

        writer.finalize()?;

        tracing::info!(
            path = %self.path.display(),
            buffers = self.continuation.delivered(),
            samples = self.samples_written,
            duration_secs = self.duration().as_secs_f32(),
            "WAV file saved"
        );
        Ok(())
    }
}

/// Right shift that fits `sample_bits` into a `bit_depth` container
///
/// Narrower samples are stored as-is. The only narrowing is 32-bit samples
/// into a 24-bit file, which drops the low byte.
fn narrowing_shift(sample_bits: u16, bit_depth: u16) -> Option<u32> {
    match (sample_bits, bit_depth) {
        (bits, depth) if bits <= depth => Some(0),
        (32, 24) => Some(8),
        _ => None,
    }
}
