//! Normalization encoder
//!
//! [`Encoder`] is the seam to the external encoding tool; [`Normalizer`] adds
//! the retry policy on top of it.

pub mod ffmpeg;

pub use ffmpeg::{build_ffmpeg_command, FfmpegEncoder};

use crate::naming::split_artist_title;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};

/// Attempts per file used by the batch converter.
pub const DEFAULT_ENCODE_RETRIES: u32 = 3;

/// Backoff unit between encode attempts, multiplied by the attempt number.
pub const ENCODE_RETRY_BACKOFF: Duration = Duration::from_secs(1);

/// Error type for encoding operations
#[derive(Debug, Error)]
pub enum EncodeError {
    /// The encoder binary could not be found or executed
    #[error("encoder not available ({binary}): {source}")]
    ToolMissing {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    /// Encoder process exited with non-zero status
    #[error("encoder failed with exit code {code}: {message}")]
    Failed { code: i32, message: String },

    /// Encoder process was terminated by signal
    #[error("encoder process was terminated by signal")]
    Terminated,

    /// IO error during encoding
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EncodeError {
    /// Retrying cannot help with this error.
    pub fn is_permanent(&self) -> bool {
        matches!(self, EncodeError::ToolMissing { .. })
    }
}

/// One encoder invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeRequest {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    /// `artist` tag, omitted when `None`
    pub artist: Option<String>,
    /// `title` tag, omitted when `None`
    pub title: Option<String>,
}

impl EncodeRequest {
    /// Request whose tags come from the output file name (`Artist - Title.mp3`).
    pub fn for_output(input_path: PathBuf, output_path: PathBuf) -> Self {
        let stem = output_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let (artist, title) = split_artist_title(&stem);
        Self {
            input_path,
            output_path,
            artist,
            title,
        }
    }
}

/// Capability to run the encoding tool once.
///
/// Implementations block until the tool exits.
pub trait Encoder: Send + Sync {
    fn encode(&self, request: &EncodeRequest) -> Result<(), EncodeError>;
}

/// Runs encodes with retries and linear backoff.
#[derive(Clone)]
pub struct Normalizer {
    encoder: Arc<dyn Encoder>,
    backoff: Duration,
}

impl Normalizer {
    pub fn new(encoder: Arc<dyn Encoder>) -> Self {
        Self {
            encoder,
            backoff: ENCODE_RETRY_BACKOFF,
        }
    }

    /// Override the backoff unit.
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Convert one file into a normalized, tagged MP3
    ///
    /// Tags are derived from the output file name. Makes up to `max_retries`
    /// attempts, sleeping `backoff * attempt` after each failed one. A missing
    /// encoder binary ends the loop immediately.
    ///
    /// Returns true only if an attempt succeeded.
    pub fn convert_one(&self, input: &Path, output: &Path, max_retries: u32) -> bool {
        let request = EncodeRequest::for_output(input.to_path_buf(), output.to_path_buf());
        let max_retries = max_retries.max(1);

        for attempt in 1..=max_retries {
            info!(
                attempt,
                max_retries,
                input = %input.display(),
                output = %output.display(),
                "normalizing"
            );

            match self.encoder.encode(&request) {
                Ok(()) => return true,
                Err(e) if e.is_permanent() => {
                    error!(error = %e, "encoder missing, giving up");
                    return false;
                }
                Err(e) => {
                    error!(attempt, error = %e, input = %input.display(), "encode failed");
                    if attempt < max_retries {
                        std::thread::sleep(self.backoff * attempt);
                    }
                }
            }
        }

        false
    }
}
