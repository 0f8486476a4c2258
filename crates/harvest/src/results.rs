//! Result and summary records returned to callers.
//!
//! All records are created fresh per batch and serialize to JSON for display.

use serde::{Deserialize, Serialize};

/// Outcome of acquiring a single identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AcquisitionOutcome {
    /// The media was downloaded.
    Acquired {
        /// File name in the download folder (renamed when possible).
        file_name: String,
        /// Extracted title, possibly empty.
        title: String,
        /// Extracted artist, uploader or channel.
        artist: Option<String>,
    },
    /// Every attempt failed.
    Failed {
        /// Message from the last failed attempt.
        error: String,
    },
}

/// Result for one submitted identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcquisitionResult {
    pub identifier: String,
    #[serde(flatten)]
    pub outcome: AcquisitionOutcome,
}

impl AcquisitionResult {
    pub fn acquired(
        identifier: impl Into<String>,
        file_name: impl Into<String>,
        title: impl Into<String>,
        artist: Option<String>,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            outcome: AcquisitionOutcome::Acquired {
                file_name: file_name.into(),
                title: title.into(),
                artist,
            },
        }
    }

    pub fn failed(identifier: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            outcome: AcquisitionOutcome::Failed {
                error: error.into(),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, AcquisitionOutcome::Acquired { .. })
    }

    pub fn file_name(&self) -> Option<&str> {
        match &self.outcome {
            AcquisitionOutcome::Acquired { file_name, .. } => Some(file_name),
            AcquisitionOutcome::Failed { .. } => None,
        }
    }

    pub fn title(&self) -> Option<&str> {
        match &self.outcome {
            AcquisitionOutcome::Acquired { title, .. } => Some(title),
            AcquisitionOutcome::Failed { .. } => None,
        }
    }

    pub fn artist(&self) -> Option<&str> {
        match &self.outcome {
            AcquisitionOutcome::Acquired { artist, .. } => artist.as_deref(),
            AcquisitionOutcome::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            AcquisitionOutcome::Acquired { .. } => None,
            AcquisitionOutcome::Failed { error } => Some(error),
        }
    }
}

/// Counts over a set of acquisition results.
///
/// Always satisfies `succeeded + failed == total`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcquisitionSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl AcquisitionSummary {
    pub fn from_results(results: &[AcquisitionResult]) -> Self {
        let succeeded = results.iter().filter(|r| r.is_success()).count();
        Self {
            total: results.len(),
            succeeded,
            failed: results.len() - succeeded,
        }
    }
}

/// Everything a download batch produced.
///
/// `results` is in completion order, not submission order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AcquisitionBatch {
    pub results: Vec<AcquisitionResult>,
    pub summary: AcquisitionSummary,
}

impl AcquisitionBatch {
    pub fn new(results: Vec<AcquisitionResult>) -> Self {
        let summary = AcquisitionSummary::from_results(&results);
        Self { results, summary }
    }

    /// Find the result for an identifier.
    pub fn result_for(&self, identifier: &str) -> Option<&AcquisitionResult> {
        self.results.iter().find(|r| r.identifier == identifier)
    }
}

/// Status of a single file conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConversionStatus {
    Ok,
    Failed,
}

impl std::fmt::Display for ConversionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConversionStatus::Ok => write!(f, "OK"),
            ConversionStatus::Failed => write!(f, "FAILED"),
        }
    }
}

/// One discovered input file and what became of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionJob {
    /// Input file name (no directory).
    pub input: String,
    /// Output file name (no directory).
    pub output: String,
    pub status: ConversionStatus,
}

/// Everything a folder conversion produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionSummary {
    pub input_folder: String,
    pub output_folder: String,
    pub files_found: usize,
    pub converted_count: usize,
    /// Batch-level and per-file error messages, in processing order.
    pub errors: Vec<String>,
    /// Per-file jobs, in processing order.
    pub jobs: Vec<ConversionJob>,
}

impl ConversionSummary {
    pub fn new(input_folder: impl Into<String>, output_folder: impl Into<String>) -> Self {
        Self {
            input_folder: input_folder.into(),
            output_folder: output_folder.into(),
            files_found: 0,
            converted_count: 0,
            errors: Vec::new(),
            jobs: Vec::new(),
        }
    }
}
