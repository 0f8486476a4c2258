//! Startup checks module
//!
//! Preflight checks run before a batch starts:
//! - Extractor availability (`yt-dlp --version`)
//! - Encoder availability (`ffmpeg -version`), with its version logged
//!
//! Only the tool a stage actually needs is checked.

use crate::config::Config;
use std::path::Path;
use std::process::Command;
use thiserror::Error;
use tracing::info;

/// Error types for startup checks
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("extractor not available: {0}")]
    ExtractorUnavailable(String),

    #[error("encoder not available: {0}")]
    EncoderUnavailable(String),
}

/// Which batch is about to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Acquire,
    Convert,
}

/// Run `<binary> <version_arg>` and return its stdout.
///
/// `None` in the error slot means the tool ran but exited non-zero.
fn run_version_command(binary: &Path, version_arg: &str) -> Result<String, Option<std::io::Error>> {
    let output = Command::new(binary)
        .arg(version_arg)
        .output()
        .map_err(Some)?;

    if !output.status.success() {
        return Err(None);
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Parse ffmpeg's `-version` output and extract the version token
///
/// Handles release (`ffmpeg version 7.1 ...`), tagged git builds
/// (`ffmpeg version n7.1-12-g...`, `n` stripped) and snapshot builds
/// (`ffmpeg version N-113059-g...`, kept as is).
pub fn parse_ffmpeg_version(version_output: &str) -> Option<String> {
    const MARKER: &str = "ffmpeg version";

    let version_line = version_output
        .lines()
        .find(|line| line.to_ascii_lowercase().contains(MARKER))?;

    // ASCII lowercasing keeps byte offsets valid in the original line.
    let start = version_line.to_ascii_lowercase().find(MARKER)? + MARKER.len();
    let token = version_line.get(start..)?.split_whitespace().next()?;

    let mut chars = token.chars();
    let version = match (chars.next(), chars.next()) {
        (Some('n' | 'N'), Some(c)) if c.is_ascii_digit() => &token[1..],
        _ => token,
    };
    Some(version.to_string())
}

/// Parse yt-dlp's `--version` output (a single line such as `2024.08.06`).
pub fn parse_ytdlp_version(version_output: &str) -> Option<String> {
    version_output
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .map(String::from)
}

/// Check that the encoder runs, returning its version
///
/// An unparseable version is not an error; it is reported as `unknown`.
pub fn check_encoder_available(binary: &Path) -> Result<String, StartupError> {
    let stdout = run_version_command(binary, "-version").map_err(|e| {
        StartupError::EncoderUnavailable(match e {
            Some(e) => format!("{} -version failed; is ffmpeg installed and in PATH? Error: {}", binary.display(), e),
            None => format!("{} -version exited with an error", binary.display()),
        })
    })?;

    let version = parse_ffmpeg_version(&stdout).unwrap_or_else(|| "unknown".to_string());
    info!(binary = %binary.display(), version = %version, "encoder available");
    Ok(version)
}

/// Check that the extractor runs, returning its version.
pub fn check_extractor_available(binary: &Path) -> Result<String, StartupError> {
    let stdout = run_version_command(binary, "--version").map_err(|e| {
        StartupError::ExtractorUnavailable(match e {
            Some(e) => format!("{} --version failed; is yt-dlp installed and in PATH? Error: {}", binary.display(), e),
            None => format!("{} --version exited with an error", binary.display()),
        })
    })?;

    let version = parse_ytdlp_version(&stdout).unwrap_or_else(|| "unknown".to_string());
    info!(binary = %binary.display(), version = %version, "extractor available");
    Ok(version)
}

/// Run the checks a stage needs
pub fn run_startup_checks(cfg: &Config, stage: Stage) -> Result<(), StartupError> {
    match stage {
        Stage::Acquire => check_extractor_available(&cfg.paths.extractor_binary)?,
        Stage::Convert => check_encoder_available(&cfg.paths.encoder_binary)?,
    };
    Ok(())
}
