//! ffmpeg encoder module
//!
//! Provides functionality to build and execute ffmpeg commands that turn any
//! audio/video input into a loudness-normalized, tagged MP3.

use super::{EncodeError, EncodeRequest, Encoder};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Command;

/// MP3 encoder
pub const AUDIO_CODEC: &str = "libmp3lame";

/// Constant output bitrate
pub const AUDIO_BITRATE: &str = "192k";

/// EBU R128 loudness normalization: -14 LUFS integrated, -1.5 dBTP true peak, 11 LU range
pub const LOUDNORM_FILTER: &str = "loudnorm=I=-14:TP=-1.5:LRA=11";

/// Encoder that shells out to ffmpeg.
#[derive(Debug, Clone)]
pub struct FfmpegEncoder {
    binary: PathBuf,
}

impl FfmpegEncoder {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for FfmpegEncoder {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

/// Build an ffmpeg command for one normalization job
///
/// Creates a Command configured with:
/// - Overwrite without prompting, banner hidden, only errors logged
/// - Video streams dropped
/// - MP3 at a fixed 192 kbps
/// - Loudness normalization filter
/// - artist/title metadata tags when known
///
/// # Arguments
/// * `binary` - ffmpeg executable
/// * `request` - Input/output paths and tags
pub fn build_ffmpeg_command(binary: &Path, request: &EncodeRequest) -> Command {
    let mut cmd = Command::new(binary);

    cmd.arg("-y");
    cmd.arg("-hide_banner");
    cmd.arg("-loglevel").arg("error");

    cmd.arg("-i").arg(&request.input_path);

    // Audio only
    cmd.arg("-vn");
    cmd.arg("-acodec").arg(AUDIO_CODEC);
    cmd.arg("-b:a").arg(AUDIO_BITRATE);
    cmd.arg("-af").arg(LOUDNORM_FILTER);

    if let Some(artist) = &request.artist {
        cmd.arg("-metadata").arg(format!("artist={}", artist));
    }
    if let Some(title) = &request.title {
        cmd.arg("-metadata").arg(format!("title={}", title));
    }

    cmd.arg(&request.output_path);

    cmd
}

impl Encoder for FfmpegEncoder {
    /// Run ffmpeg once
    ///
    /// # Errors
    /// Returns an error if:
    /// - The binary cannot be found or executed (`ToolMissing`)
    /// - ffmpeg exits with non-zero status (`Failed`)
    /// - ffmpeg is terminated by a signal (`Terminated`)
    fn encode(&self, request: &EncodeRequest) -> Result<(), EncodeError> {
        let mut cmd = build_ffmpeg_command(&self.binary, request);

        let output = cmd.output().map_err(|e| match e.kind() {
            ErrorKind::NotFound | ErrorKind::PermissionDenied => EncodeError::ToolMissing {
                binary: self.binary.display().to_string(),
                source: e,
            },
            _ => EncodeError::Io(e),
        })?;

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        match output.status.code() {
            Some(code) => Err(EncodeError::Failed {
                code,
                message: stderr.trim().lines().last().unwrap_or_default().to_string(),
            }),
            None => Err(EncodeError::Terminated),
        }
    }
}
