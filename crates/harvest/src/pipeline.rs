//! Pipeline facade
//!
//! Wires a [`Config`] to the extraction and encoding tools and exposes the two
//! batch entry points used by the CLI.

use crate::config::{expand_home, Config, ConfigError};
use crate::convert::convert_folder;
use crate::encode::{Encoder, FfmpegEncoder, Normalizer};
use crate::extract::{Extractor, YtDlpExtractor};
use crate::results::{AcquisitionBatch, ConversionSummary};
use crate::scheduler::{AcquisitionPlan, AcquisitionScheduler};
use crate::startup::{run_startup_checks, Stage, StartupError};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Error type for pipeline operations
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Startup check failed
    #[error("Startup check failed: {0}")]
    Startup(#[from] StartupError),

    /// A blocking batch task did not complete
    #[error("Batch task failed: {0}")]
    Task(String),
}

/// Both pipelines, ready to run
pub struct Pipeline {
    /// Configuration loaded from file and environment
    pub config: Config,
    scheduler: AcquisitionScheduler,
    normalizer: Normalizer,
}

impl Pipeline {
    /// Load configuration and build the production pipeline
    ///
    /// A missing config file means defaults (plus environment overrides).
    /// No tools are checked here; see [`Pipeline::check`].
    pub fn load<P: AsRef<Path>>(config_path: P) -> Result<Self, PipelineError> {
        let path = config_path.as_ref();
        let (config, from_file) = Config::load_or_default(path)?;
        if from_file {
            info!(path = %path.display(), "loaded configuration");
        } else {
            info!(path = %path.display(), "no configuration file, using defaults");
        }
        Ok(Self::from_config(config))
    }

    /// Build the production pipeline from an existing configuration.
    pub fn from_config(config: Config) -> Self {
        let extractor = Arc::new(YtDlpExtractor::new(config.paths.extractor_binary.clone()));
        let encoder = Arc::new(FfmpegEncoder::new(config.paths.encoder_binary.clone()));
        Self::with_components(config, extractor, encoder)
    }

    /// Build a pipeline around custom tool implementations.
    pub fn with_components(config: Config, extractor: Arc<dyn Extractor>, encoder: Arc<dyn Encoder>) -> Self {
        let plan = AcquisitionPlan::from_config(&config);
        Self {
            scheduler: AcquisitionScheduler::new(extractor, plan),
            normalizer: Normalizer::new(encoder),
            config,
        }
    }

    /// Verify the tool needed by `stage` is runnable.
    pub fn check(&self, stage: Stage) -> Result<(), PipelineError> {
        run_startup_checks(&self.config, stage)?;
        Ok(())
    }

    pub fn acquisition_plan(&self) -> &AcquisitionPlan {
        self.scheduler.plan()
    }

    /// Download every identifier into the configured download folder.
    pub async fn acquire(&self, identifiers: Vec<String>) -> AcquisitionBatch {
        self.scheduler.run_batch(identifiers).await
    }

    /// Convert a folder, defaulting to the configured input/output folders
    ///
    /// A leading `~` in an override is expanded like the configured folders.
    /// Runs on the blocking pool since every file is a synchronous encoder run.
    pub async fn convert(
        &self,
        input_folder: Option<PathBuf>,
        output_folder: Option<PathBuf>,
    ) -> Result<ConversionSummary, PipelineError> {
        let input = input_folder
            .map(|p| expand_home(&p))
            .unwrap_or_else(|| self.config.paths.input_folder.clone());
        let output = output_folder
            .map(|p| expand_home(&p))
            .unwrap_or_else(|| self.config.paths.output_folder.clone());
        let normalizer = self.normalizer.clone();

        tokio::task::spawn_blocking(move || convert_folder(&normalizer, &input, &output))
            .await
            .map_err(|e| PipelineError::Task(e.to_string()))
    }
}
