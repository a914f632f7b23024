//! Recording service
//!
//! Wires the cpal backend, a [`WavSink`] and a [`CaptureDevice`] together.
//!
//! # Design
//!
//! `cpal::Stream` is not `Send`, so the stream always lives on the thread
//! running the capture loop. In the default mode that is the session's
//! background thread and the main thread only waits for Ctrl-C or for the
//! sink to end the session. With `--blocking` the loop runs on the main
//! thread and only the `--seconds` limit ends it.

use std::time::Duration;

use anyhow::{Context, Result};
use taperec_audio_core::{
    AudioBackend, CaptureConfig, CaptureDevice, CaptureSession, SessionReport, StreamSink, WavSink,
};
use taperec_audio_cpal::{CaptureSample, CpalBackend};

use crate::cli::Cli;

/// Poll interval for checking whether the capture session has finished
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Record according to `cli`, choosing the sample container from the bit depth
pub fn record(cli: &Cli) -> Result<()> {
    let config = cli.capture_config()?;

    match config.bit_depth() {
        8 => record_with::<i8>(cli, config),
        16 => record_with::<i16>(cli, config),
        _ => record_with::<i32>(cli, config),
    }
}

fn record_with<T: CaptureSample>(cli: &Cli, config: CaptureConfig) -> Result<()> {
    let path = cli.output_path();
    tracing::debug!(
        buffer_ms = config.buffer_duration().as_secs_f64() * 1000.0,
        samples_per_buffer = config.samples_per_buffer(),
        "Capture buffer layout"
    );

    let mut sink = WavSink::<T>::new(&path, &config);
    if let Some(duration) = cli.duration() {
        let buffers = config.buffers_for(duration);
        tracing::debug!(buffers, "Recording limited to {:?}", duration);
        sink = sink.with_buffer_limit(buffers);
    }

    let device = CaptureDevice::new(config, CpalBackend::<T>::new());

    let (report, sink) = if cli.blocking {
        let report = device.start(&mut sink).context("Recording failed")?;
        (report, sink)
    } else {
        run_until_interrupted(&device, sink)?
    };

    println!(
        "Saved {} ({:.2}s, {} buffers)",
        sink.path().display(),
        sink.duration().as_secs_f64(),
        report.buffers
    );
    Ok(())
}

/// Run a background session until Ctrl-C or until the sink ends it
fn run_until_interrupted<B, S>(device: &CaptureDevice<B>, sink: S) -> Result<(SessionReport, S)>
where
    B: AudioBackend + Send + Sync + 'static,
    S: StreamSink<B::Sample> + Send + 'static,
{
    let mut session = device
        .start_async(sink)
        .context("Failed to start recording")?;
    tracing::info!("Recording, press Ctrl-C to stop");

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to create tokio runtime")?;
    runtime.block_on(wait_for_shutdown(&session))?;

    let report = session
        .stop()
        .context("Recording failed")?
        .context("Recording session was already joined")?;
    let sink = session
        .into_sink()
        .context("Recording session did not return its sink")?;

    Ok((report, sink))
}

/// Resolve on Ctrl-C or once the session has exited on its own
async fn wait_for_shutdown<S>(session: &CaptureSession<S>) -> Result<()> {
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            biased;

            signal = &mut ctrl_c => {
                signal.context("Failed to listen for Ctrl-C")?;
                tracing::info!("Interrupt received, stopping capture");
                return Ok(());
            }

            _ = tokio::time::sleep(POLL_INTERVAL) => {
                if session.is_finished() {
                    return Ok(());
                }
            }
        }
    }
}
