//! Acquisition scheduler
//!
//! Runs a batch of identifiers through the extraction adapter on a fixed-size
//! pool of workers. Each worker owns an identifier until it is done, retrying
//! it in place with linear backoff. Completed results flow to a single
//! aggregator over a channel.

use crate::config::Config;
use crate::extract::{fetch_one, Extractor};
use crate::results::{AcquisitionBatch, AcquisitionOutcome, AcquisitionResult};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, warn};

/// Limits for one download batch, taken from the configuration
#[derive(Debug, Clone, PartialEq)]
pub struct AcquisitionPlan {
    /// Folder every worker downloads into
    pub download_folder: PathBuf,
    /// Number of concurrent workers
    pub max_workers: usize,
    /// Attempts per identifier
    pub max_retries: u32,
    /// Backoff unit, multiplied by the attempt number
    pub retry_backoff: Duration,
}

impl AcquisitionPlan {
    /// Derive a plan from configuration
    ///
    /// Worker and retry counts are raised to at least 1.
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            download_folder: cfg.paths.download_folder.clone(),
            max_workers: cfg.acquisition.max_workers.max(1) as usize,
            max_retries: cfg.acquisition.max_retries.max(1),
            retry_backoff: cfg.acquisition.retry_backoff(),
        }
    }
}

/// Delay after failed attempt `attempt` (1-based): `base * attempt`.
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base * attempt
}

/// Split pasted text into identifiers, one per non-blank line.
pub fn parse_identifiers(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect()
}

/// Runs download batches on a bounded worker pool.
pub struct AcquisitionScheduler {
    extractor: Arc<dyn Extractor>,
    plan: AcquisitionPlan,
}

impl AcquisitionScheduler {
    pub fn new(extractor: Arc<dyn Extractor>, plan: AcquisitionPlan) -> Self {
        Self { extractor, plan }
    }

    pub fn plan(&self) -> &AcquisitionPlan {
        &self.plan
    }

    /// Acquire every identifier and aggregate the outcomes
    ///
    /// Results come back in completion order; match them by identifier.
    /// Never fails: every identifier gets exactly one result.
    pub async fn run_batch(&self, identifiers: Vec<String>) -> AcquisitionBatch {
        let total = identifiers.len();
        if total == 0 {
            return AcquisitionBatch::default();
        }

        let mut pending: HashMap<String, usize> = HashMap::new();
        for id in &identifiers {
            *pending.entry(id.clone()).or_default() += 1;
        }

        // Queue everything up front; workers stop when it runs dry.
        let (job_tx, job_rx) = mpsc::channel::<String>(total);
        for id in identifiers {
            if job_tx.send(id).await.is_err() {
                break;
            }
        }
        drop(job_tx);
        let job_rx = Arc::new(Mutex::new(job_rx));

        let (done_tx, mut done_rx) = mpsc::unbounded_channel::<AcquisitionResult>();
        let workers = self.plan.max_workers.max(1).min(total);
        info!(total, workers, "starting download batch");

        let mut handles = Vec::with_capacity(workers);
        for worker in 0..workers {
            let job_rx = job_rx.clone();
            let done_tx = done_tx.clone();
            let extractor = self.extractor.clone();
            let plan = self.plan.clone();

            handles.push(tokio::spawn(async move {
                loop {
                    let next = job_rx.lock().await.recv().await;
                    let Some(identifier) = next else {
                        break;
                    };
                    debug!(worker, identifier = %identifier, "picked up");
                    let result = acquire_with_retries(extractor.clone(), &plan, identifier).await;
                    if done_tx.send(result).is_err() {
                        break;
                    }
                }
            }));
        }
        drop(done_tx);

        let mut results = Vec::with_capacity(total);
        while let Some(result) = done_rx.recv().await {
            if let Some(count) = pending.get_mut(&result.identifier) {
                *count = count.saturating_sub(1);
            }
            results.push(result);
            info!(completed = results.len(), total, "download progress");
        }

        for handle in handles {
            if let Err(e) = handle.await {
                error!(error = %e, "download worker stopped abnormally");
            }
        }

        // Anything a dead worker dropped is still reported.
        for (identifier, count) in pending {
            for _ in 0..count {
                warn!(identifier = %identifier, "no result from worker");
                results.push(AcquisitionResult::failed(
                    identifier.clone(),
                    "download worker stopped before finishing",
                ));
            }
        }

        let batch = AcquisitionBatch::new(results);
        info!(
            total = batch.summary.total,
            succeeded = batch.summary.succeeded,
            failed = batch.summary.failed,
            "download batch finished"
        );
        batch
    }
}

/// Try one identifier up to `max_retries` times within the calling worker.
async fn acquire_with_retries(
    extractor: Arc<dyn Extractor>,
    plan: &AcquisitionPlan,
    identifier: String,
) -> AcquisitionResult {
    let mut last_error: Option<String> = None;

    for attempt in 1..=plan.max_retries {
        info!(identifier = %identifier, attempt, max_retries = plan.max_retries, "download attempt");

        let extractor = extractor.clone();
        let id = identifier.clone();
        let folder = plan.download_folder.clone();
        let result = match tokio::task::spawn_blocking(move || fetch_one(extractor.as_ref(), &id, &folder)).await {
            Ok(result) => result,
            Err(e) => AcquisitionResult::failed(identifier.clone(), format!("download task panicked: {}", e)),
        };

        match &result.outcome {
            AcquisitionOutcome::Acquired { .. } => return result,
            AcquisitionOutcome::Failed { error } => last_error = Some(error.clone()),
        }

        if attempt < plan.max_retries {
            tokio::time::sleep(backoff_delay(plan.retry_backoff, attempt)).await;
        }
    }

    let error = last_error
        .filter(|e| !e.is_empty())
        .unwrap_or_else(|| format!("download failed after {} attempts", plan.max_retries));
    AcquisitionResult::failed(identifier, error)
}
