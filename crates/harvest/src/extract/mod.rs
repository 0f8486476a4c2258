//! Extraction adapter: one call to the media extraction service per identifier.
//!
//! The [`Extractor`] trait is the seam to the external service. [`fetch_one`]
//! wraps a single call, derives the display name and renames the download.
//! Retrying is left to the scheduler.

pub mod ytdlp;

pub use ytdlp::{build_ytdlp_command, parse_info_json, YtDlpExtractor};

use crate::folders::ensure_folder;
use crate::naming::display_name;
use crate::results::AcquisitionResult;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Error type for extraction operations
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The service returned no info for the identifier
    #[error("no media info returned (media may be unavailable)")]
    Unavailable,

    /// The extraction binary could not be found or executed
    #[error("extractor not available ({binary}): {source}")]
    ToolMissing {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    /// The extraction process ran and reported a failure
    #[error("extractor exited with status {code:?}: {message}")]
    Failed { code: Option<i32>, message: String },

    /// The service output could not be understood
    #[error("could not parse extractor output: {0}")]
    Parse(String),

    /// IO error while talking to the service
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Metadata reported by the extraction service.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaInfo {
    pub title: Option<String>,
    pub track: Option<String>,
    pub artist: Option<String>,
    pub uploader: Option<String>,
    pub channel: Option<String>,
}

impl MediaInfo {
    /// Track name if known, else the generic title, else empty.
    pub fn resolved_title(&self) -> String {
        first_non_empty(&[&self.track, &self.title])
    }

    /// Artist if known, else uploader, else channel, else empty.
    pub fn resolved_artist(&self) -> String {
        first_non_empty(&[&self.artist, &self.uploader, &self.channel])
    }
}

fn first_non_empty(candidates: &[&Option<String>]) -> String {
    candidates
        .iter()
        .filter_map(|c| c.as_deref())
        .find(|s| !s.is_empty())
        .unwrap_or_default()
        .to_string()
}

/// A finished download as reported by the service.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedMedia {
    /// Path the service wrote the file to.
    pub path: PathBuf,
    pub info: MediaInfo,
}

/// Capability to download one identifier into a folder.
///
/// Implementations block until the download finishes.
pub trait Extractor: Send + Sync {
    fn extract(&self, identifier: &str, destination: &Path) -> Result<ExtractedMedia, ExtractError>;
}

/// Download one identifier and report the outcome.
///
/// Never fails: extraction errors become a failed result. Renaming the file to
/// its display name is best-effort and only logged when it does not work.
pub fn fetch_one(extractor: &dyn Extractor, identifier: &str, destination: &Path) -> AcquisitionResult {
    ensure_folder(destination);

    let media = match extractor.extract(identifier, destination) {
        Ok(media) => media,
        Err(e) => {
            warn!(identifier, error = %e, "extraction failed");
            return AcquisitionResult::failed(identifier, e.to_string());
        }
    };

    let title = media.info.resolved_title();
    let artist = media.info.resolved_artist();
    let final_path = rename_to_display_name(&media.path, &artist, &title);
    let file_name = final_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    info!(identifier, file = %file_name, "downloaded");

    let artist = (!artist.is_empty()).then_some(artist);
    AcquisitionResult::acquired(identifier, file_name, title, artist)
}

/// Target path for a download: display name plus the original extension.
pub fn display_path(original: &Path, artist: &str, title: &str) -> PathBuf {
    let mut name = display_name(artist, title);
    if let Some(ext) = original.extension() {
        name.push('.');
        name.push_str(&ext.to_string_lossy());
    }
    original.with_file_name(name)
}

// Existing files at the target are overwritten.
fn rename_to_display_name(original: &Path, artist: &str, title: &str) -> PathBuf {
    let target = display_path(original, artist, title);
    if target == original {
        return target;
    }

    match fs::rename(original, &target) {
        Ok(()) => {
            debug!(from = %original.display(), to = %target.display(), "renamed download");
            target
        }
        Err(e) => {
            warn!(
                from = %original.display(),
                to = %target.display(),
                error = %e,
                "could not rename download, keeping original name"
            );
            original.to_path_buf()
        }
    }
}
