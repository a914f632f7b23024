use cpal::traits::StreamTrait;
use cpal::Stream;
use tokio::sync::mpsc as tokio_mpsc;

use taperec_audio_core::{BackendError, InputStream, Sample};

/// Message from the cpal callbacks to the reading thread
#[derive(Debug)]
pub(crate) enum Packet<T> {
    Samples(Vec<T>),
    Failed(String),
}

/// Send a packet from a cpal callback
///
/// Callbacks cannot block or propagate errors; a dropped receiver only means
/// the stream is being torn down.
pub(crate) fn send_packet<T>(tx: &tokio_mpsc::UnboundedSender<Packet<T>>, packet: Packet<T>) {
    if tx.send(packet).is_err() {
        tracing::debug!("Dropped audio packet (receiver closed)");
    }
}

/// Blocking reader over a callback-driven cpal input stream
///
/// Callback chunks rarely line up with the capture buffer, so the tail of a
/// chunk is carried over into the next `read`.
pub struct CpalInputStream<T> {
    stream: Stream,
    receiver: tokio_mpsc::UnboundedReceiver<Packet<T>>,
    pending: PendingSamples<T>,
}

impl<T> CpalInputStream<T> {
    pub(crate) fn new(stream: Stream, receiver: tokio_mpsc::UnboundedReceiver<Packet<T>>) -> Self {
        Self {
            stream,
            receiver,
            pending: PendingSamples::default(),
        }
    }
}

impl<T: Sample> InputStream for CpalInputStream<T> {
    type Sample = T;

    fn start(&mut self) -> Result<(), BackendError> {
        self.stream
            .play()
            .map_err(|e| BackendError::Stream(e.to_string()))
    }

    fn read(&mut self, buffer: &mut [T]) -> Result<(), BackendError> {
        fill_from(&mut self.pending, buffer, || self.receiver.blocking_recv())
    }

    fn stop(&mut self) -> Result<(), BackendError> {
        self.stream
            .pause()
            .map_err(|e| BackendError::Stream(e.to_string()))
    }

    fn close(self) -> Result<(), BackendError> {
        drop(self.stream);
        Ok(())
    }
}

/// Leftover samples of the last received chunk
#[derive(Debug)]
struct PendingSamples<T> {
    samples: Vec<T>,
    cursor: usize,
}

impl<T> Default for PendingSamples<T> {
    fn default() -> Self {
        Self {
            samples: Vec::new(),
            cursor: 0,
        }
    }
}

impl<T: Copy> PendingSamples<T> {
    fn remaining(&self) -> &[T] {
        &self.samples[self.cursor..]
    }

    fn replace(&mut self, samples: Vec<T>) {
        self.samples = samples;
        self.cursor = 0;
    }

    /// Copy as much as fits into `out`, returning the count copied
    fn drain_into(&mut self, out: &mut [T]) -> usize {
        let n = out.len().min(self.remaining().len());
        out[..n].copy_from_slice(&self.remaining()[..n]);
        self.cursor += n;
        n
    }
}

/// Fill `buffer` completely, pulling chunks from `next` as needed
fn fill_from<T, F>(
    pending: &mut PendingSamples<T>,
    buffer: &mut [T],
    mut next: F,
) -> Result<(), BackendError>
where
    T: Copy,
    F: FnMut() -> Option<Packet<T>>,
{
    let mut filled = 0;
    while filled < buffer.len() {
        if pending.remaining().is_empty() {
            match next() {
                Some(Packet::Samples(samples)) => pending.replace(samples),
                Some(Packet::Failed(message)) => return Err(BackendError::Stream(message)),
                None => return Err(BackendError::Disconnected),
            }
            continue;
        }
        filled += pending.drain_into(&mut buffer[filled..]);
    }
    Ok(())
}
