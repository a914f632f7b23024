use thiserror::Error;

/// Errors reported by a native audio backend
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("No audio input device found")]
    NoDeviceFound,

    #[error("Audio backend is not initialized")]
    NotInitialized,

    #[error("Unsupported stream format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to build audio stream: {0}")]
    StreamBuild(String),

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("Device error: {0}")]
    Device(String),

    #[error("Audio stream disconnected")]
    Disconnected,
}

/// Errors reported by a [`StreamSink`](crate::StreamSink)
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WAV encoder error: {0}")]
    Wav(#[from] hound::Error),

    #[error("{sample_bits}-bit samples do not fit a {bit_depth}-bit container")]
    UnsupportedBitDepth { sample_bits: u16, bit_depth: u16 },
}

/// Rejected [`CaptureConfig`](crate::CaptureConfig) values
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Channel count must be positive")]
    NoChannels,

    #[error("Sample rate must be positive")]
    ZeroSampleRate,

    #[error("Frames per buffer must be positive")]
    ZeroFramesPerBuffer,

    #[error("Unsupported bit depth: {0} (expected 8, 16, 24 or 32)")]
    UnsupportedBitDepth(u16),
}

/// Failure of a capture session, tagged with the stage that failed
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Failed to initialize the audio backend")]
    BackendInit(#[source] BackendError),

    #[error("Failed to open the sink")]
    SinkOpen(#[source] SinkError),

    #[error("Failed to open the default input stream")]
    StreamOpen(#[source] BackendError),

    #[error("Failed to start the input stream")]
    StreamStart(#[source] BackendError),

    #[error("Failed to read from the input stream")]
    StreamRead(#[source] BackendError),

    #[error("Failed to close the sink")]
    SinkClose(#[source] SinkError),

    #[error("A capture session is already in flight")]
    SessionActive,

    #[error("Failed to spawn the capture thread")]
    Spawn(#[source] std::io::Error),

    #[error("Capture thread panicked")]
    WorkerPanicked,
}

/// Fieldless discriminant of [`CaptureError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureErrorKind {
    BackendInitFailure,
    SinkOpenFailure,
    StreamOpenFailure,
    StreamStartFailure,
    StreamReadFailure,
    SinkCloseFailure,
    SessionActive,
    Spawn,
    WorkerPanicked,
}

impl CaptureError {
    pub fn kind(&self) -> CaptureErrorKind {
        match self {
            Self::BackendInit(_) => CaptureErrorKind::BackendInitFailure,
            Self::SinkOpen(_) => CaptureErrorKind::SinkOpenFailure,
            Self::StreamOpen(_) => CaptureErrorKind::StreamOpenFailure,
            Self::StreamStart(_) => CaptureErrorKind::StreamStartFailure,
            Self::StreamRead(_) => CaptureErrorKind::StreamReadFailure,
            Self::SinkClose(_) => CaptureErrorKind::SinkCloseFailure,
            Self::SessionActive => CaptureErrorKind::SessionActive,
            Self::Spawn(_) => CaptureErrorKind::Spawn,
            Self::WorkerPanicked => CaptureErrorKind::WorkerPanicked,
        }
    }
}
