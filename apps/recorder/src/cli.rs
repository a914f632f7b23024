//! Command-line parsing and validation

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::Parser;
use directories::UserDirs;
use taperec_audio_core::CaptureConfig;

pub const DEFAULT_CHANNELS: u16 = 2;
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;
pub const DEFAULT_FRAMES_PER_BUFFER: u32 = 256;
pub const DEFAULT_BIT_DEPTH: u16 = 16;

/// Longest recording accepted by `--seconds` (24 hours)
const MAX_RECORD_SECONDS: f64 = 86_400.0;

/// Record the default input device to a WAV file
#[derive(Debug, Parser, Clone)]
#[command(about, author, version)]
pub struct Cli {
    /// Output WAV file (default: timestamped file in the user's audio directory)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// JSON capture configuration; the flags below override its fields
    #[arg(long, env = "TAPEREC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Number of input channels
    #[arg(long)]
    pub channels: Option<u16>,

    /// Sample rate in Hz
    #[arg(long)]
    pub sample_rate: Option<u32>,

    /// Frames delivered per blocking read
    #[arg(long)]
    pub frames_per_buffer: Option<u32>,

    /// Bit depth of the WAV file (8, 16, 24 or 32)
    #[arg(long)]
    pub bit_depth: Option<u16>,

    /// Stop after this many seconds
    #[arg(short, long)]
    pub seconds: Option<f64>,

    /// Record on the calling thread instead of a background session
    #[arg(long, default_value_t = false)]
    pub blocking: bool,

    /// Debug logging with file, line and thread ids
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl Cli {
    /// Parse CLI arguments and validate them right away.
    pub fn parse_args() -> Result<Self> {
        let cli = Self::parse();
        cli.validate()?;
        Ok(cli)
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(seconds) = self.seconds {
            if !(seconds > 0.0 && seconds <= MAX_RECORD_SECONDS) {
                bail!("--seconds must be between 0 and {MAX_RECORD_SECONDS}, got {seconds}");
            }
        }
        if self.blocking && self.seconds.is_none() {
            bail!("--blocking needs --seconds; a blocking session only ends when the sink stops it");
        }
        Ok(())
    }

    /// Merge the optional config file with explicit flags and validate
    pub fn capture_config(&self) -> Result<CaptureConfig> {
        let base = match &self.config {
            Some(path) => load_config(path)?,
            None => CaptureConfig::new(
                DEFAULT_CHANNELS,
                DEFAULT_SAMPLE_RATE,
                DEFAULT_FRAMES_PER_BUFFER,
                DEFAULT_BIT_DEPTH,
            )?,
        };

        CaptureConfig::new(
            self.channels.unwrap_or(base.channels()),
            self.sample_rate.unwrap_or(base.sample_rate()),
            self.frames_per_buffer.unwrap_or(base.frames_per_buffer()),
            self.bit_depth.unwrap_or(base.bit_depth()),
        )
        .context("Invalid capture configuration")
    }

    pub fn duration(&self) -> Option<Duration> {
        self.seconds.map(Duration::from_secs_f64)
    }

    pub fn output_path(&self) -> PathBuf {
        self.output.clone().unwrap_or_else(default_output_path)
    }
}

/// Load a [`CaptureConfig`] from a JSON file
pub fn load_config(path: &Path) -> Result<CaptureConfig> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse config file {}", path.display()))
}

/// The user's audio directory, or the working directory when there is none
pub fn default_output_dir() -> PathBuf {
    UserDirs::new()
        .and_then(|dirs| dirs.audio_dir().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

fn default_output_path() -> PathBuf {
    let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
    default_output_dir().join(format!("capture_{}.wav", timestamp))
}
