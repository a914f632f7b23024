use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};

use cpal::traits::DeviceTrait;
use cpal::{BufferSize, FromSample, SampleFormat, SampleRate, SizedSample, Stream, StreamConfig};
use tokio::sync::mpsc as tokio_mpsc;

use crate::device::{default_input_device, default_input_device_name};
use crate::format::{select_format, CaptureSample, Candidate};
use crate::stream::{send_packet, CpalInputStream, Packet};
use taperec_audio_core::{AudioBackend, BackendError, CaptureConfig};

/// Default-host cpal backend producing samples of type `T`
///
/// cpal has no process-wide init call; `initialize` resolves the default
/// input device up front so a missing device fails at the init stage, and
/// streams can only be opened between `initialize` and `terminate`.
///
/// Streams open in `T`'s native format when the device offers it for the
/// requested layout, and otherwise convert from another native format.
pub struct CpalBackend<T> {
    initialized: AtomicBool,
    _sample: PhantomData<fn() -> T>,
}

impl<T> Default for CpalBackend<T> {
    fn default() -> Self {
        Self {
            initialized: AtomicBool::new(false),
            _sample: PhantomData,
        }
    }
}

impl<T> CpalBackend<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }
}

impl<T: CaptureSample> AudioBackend for CpalBackend<T> {
    type Sample = T;
    type Stream = CpalInputStream<T>;

    fn initialize(&self) -> Result<(), BackendError> {
        let name = default_input_device_name()?;

        self.initialized.store(true, Ordering::SeqCst);
        tracing::info!(device = %name, "cpal backend initialized");
        Ok(())
    }

    fn terminate(&self) {
        if self.initialized.swap(false, Ordering::SeqCst) {
            tracing::debug!("cpal backend terminated");
        }
    }

    fn open_default_input_stream(
        &self,
        config: &CaptureConfig,
    ) -> Result<CpalInputStream<T>, BackendError> {
        if !self.is_initialized() {
            return Err(BackendError::NotInitialized);
        }

        let device = default_input_device()?;
        let candidates: Vec<Candidate> = device
            .supported_input_configs()
            .map_err(|e| BackendError::Device(e.to_string()))?
            .map(|range| Candidate::from(&range))
            .collect();
        let format = select_format(&candidates, config, T::FORMAT)?;
        if format != T::FORMAT {
            tracing::info!(
                native = ?format,
                requested = ?T::FORMAT,
                "Device has no native input in the requested format, converting"
            );
        }

        let stream_config = StreamConfig {
            channels: config.channels(),
            sample_rate: SampleRate(config.sample_rate()),
            buffer_size: BufferSize::Fixed(config.frames_per_buffer()),
        };

        let (tx, rx) = tokio_mpsc::unbounded_channel::<Packet<T>>();

        let stream = match format {
            SampleFormat::F32 => build_converting::<f32, T>(&device, &stream_config, tx),
            SampleFormat::I32 => build_converting::<i32, T>(&device, &stream_config, tx),
            SampleFormat::I16 => build_converting::<i16, T>(&device, &stream_config, tx),
            SampleFormat::I8 => build_converting::<i8, T>(&device, &stream_config, tx),
            other => Err(BackendError::UnsupportedFormat(format!(
                "cannot convert {:?} input",
                other
            ))),
        }?;

        tracing::debug!(
            channels = stream_config.channels,
            sample_rate = config.sample_rate(),
            frames_per_buffer = config.frames_per_buffer(),
            native = ?format,
            "cpal input stream built"
        );

        Ok(CpalInputStream::new(stream, rx))
    }
}

/// Build a stream delivering native `S` samples, converted to `T`
fn build_converting<S, T>(
    device: &cpal::Device,
    config: &StreamConfig,
    tx: tokio_mpsc::UnboundedSender<Packet<T>>,
) -> Result<Stream, BackendError>
where
    S: SizedSample,
    T: Send + FromSample<S> + 'static,
{
    let err_tx = tx.clone();
    let err_fn = move |err: cpal::StreamError| {
        tracing::error!("Audio stream error: {}", err);
        send_packet(&err_tx, Packet::Failed(err.to_string()));
    };

    device
        .build_input_stream(
            config,
            move |data: &[S], _: &cpal::InputCallbackInfo| {
                let samples = data.iter().map(|&s| T::from_sample_(s)).collect();
                send_packet(&tx, Packet::Samples(samples));
            },
            err_fn,
            None,
        )
        .map_err(|e| match e {
            cpal::BuildStreamError::StreamConfigNotSupported => BackendError::UnsupportedFormat(
                format!("device rejected {:?}", config),
            ),
            cpal::BuildStreamError::DeviceNotAvailable => BackendError::NoDeviceFound,
            other => BackendError::StreamBuild(other.to_string()),
        })
}
