//! Job publisher: turns validated recordings into work orders.
//!
//! Per recording: ledger check, fetch a local sample, derive settings,
//! publish, then finalize. Finalizing always removes the sample and commits
//! the ledger entry for published and operator-aborted jobs. Failed jobs are
//! left uncommitted so a redelivered notification retries them.

use crate::bus::MessageBus;
use crate::config::Config;
use crate::derive::{derive_settings, CropInspector, DeriveRules, Derivation, DerivedSettings};
use crate::fetch::{remove_staged, Fetcher};
use dvrflow_av::Prober;
use dvrflow_common::{FetchLocation, NotificationBatch, Recording, ValidationRules, WorkOrder};
use dvrflow_db::Ledger;
use std::path::PathBuf;
use std::sync::Arc;

/// Terminal state of one recording.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// A work order went out and the ledger was committed.
    Published(WorkOrder),
    /// The ledger already had this recording.
    SkippedDuplicate,
    /// The operator skipped the recording; committed so it is not offered again.
    Aborted,
    /// Something transient went wrong; not committed.
    Failed(String),
}

impl JobOutcome {
    /// Whether the ledger entry is written for this outcome.
    pub fn commits(&self) -> bool {
        matches!(self, JobOutcome::Published(_) | JobOutcome::Aborted)
    }
}

/// Decode a notification batch and keep the entries that pass validation.
///
/// A payload that is not a batch is dropped whole. Rejected entries are
/// logged and left out; they never fail the rest of the batch.
pub fn accept_batch(payload: &[u8], rules: &ValidationRules) -> Vec<Recording> {
    let batch = match NotificationBatch::from_json(payload) {
        Ok(batch) => batch,
        Err(e) => {
            tracing::warn!("Dropping malformed notification batch: {}", e);
            return Vec::new();
        }
    };

    tracing::info!("Notification batch with {} entries", batch.entries.len());

    batch
        .entries
        .iter()
        .enumerate()
        .filter_map(|(idx, entry)| match Recording::from_entry(entry, rules) {
            Ok(recording) => Some(recording),
            Err(e) => {
                tracing::warn!(entry = idx, "Rejecting recording: {}", e);
                None
            }
        })
        .collect()
}

/// Publishes one work order per new recording.
pub struct JobPublisher {
    ledger: Ledger,
    bus: Arc<dyn MessageBus>,
    fetcher: Arc<dyn Fetcher>,
    prober: Option<Arc<dyn Prober>>,
    inspector: Arc<dyn CropInspector>,
    rules: DeriveRules,
    source: FetchLocation,
    staging_file: PathBuf,
    topic: String,
    bitrate: u32,
}

impl JobPublisher {
    pub fn new(
        config: &Config,
        ledger: Ledger,
        bus: Arc<dyn MessageBus>,
        fetcher: Arc<dyn Fetcher>,
        inspector: Arc<dyn CropInspector>,
    ) -> Self {
        Self {
            ledger,
            bus,
            fetcher,
            prober: None,
            inspector,
            rules: DeriveRules::from(&config.publisher),
            source: config.source.fetch_location(),
            staging_file: config.publisher.staging_file.clone(),
            topic: config.topics.transcode.clone(),
            bitrate: config.publisher.bitrate,
        }
    }

    /// Probe the sample for its field order instead of relying only on the
    /// channel list.
    pub fn with_prober(mut self, prober: Arc<dyn Prober>) -> Self {
        self.prober = Some(prober);
        self
    }

    /// Run one recording through to a terminal outcome.
    pub async fn process(&self, recording: Recording) -> JobOutcome {
        tracing::info!(uuid = %recording.uuid, title = %recording.title, "Processing recording");

        let outcome = match self.already_scheduled(&recording.uuid).await {
            Ok(true) => {
                tracing::info!(
                    uuid = %recording.uuid,
                    "Skipping recording, already scheduled"
                );
                return JobOutcome::SkippedDuplicate;
            }
            Ok(false) => self.schedule(&recording).await,
            Err(e) => JobOutcome::Failed(format!("ledger lookup failed: {e}")),
        };

        self.finalize(&recording, outcome).await
    }

    async fn already_scheduled(&self, uuid: &str) -> anyhow::Result<bool> {
        let ledger = self.ledger.clone();
        let uuid = uuid.to_string();
        Ok(tokio::task::spawn_blocking(move || ledger.already_scheduled(&uuid)).await??)
    }

    async fn schedule(&self, recording: &Recording) -> JobOutcome {
        if let Err(e) = self.fetch_sample(recording).await {
            tracing::warn!(uuid = %recording.uuid, "Fetch failed: {:#}", e);
            return JobOutcome::Failed(format!("fetch failed: {e:#}"));
        }

        let derived = match self.derive(recording).await {
            Ok(Derivation::Continue(derived)) => derived,
            Ok(Derivation::Abort) => return JobOutcome::Aborted,
            Err(e) => return JobOutcome::Failed(format!("derivation failed: {e}")),
        };

        let order = self.work_order(recording, derived);
        let payload = match order.to_json() {
            Ok(payload) => payload,
            Err(e) => return JobOutcome::Failed(format!("encoding work order: {e}")),
        };

        tracing::info!(
            uuid = %recording.uuid,
            topic = %self.topic,
            "Publishing {}",
            String::from_utf8_lossy(&payload)
        );
        match self.bus.publish(&self.topic, payload).await {
            Ok(()) => JobOutcome::Published(order),
            Err(e) => JobOutcome::Failed(format!("publish failed: {e}")),
        }
    }

    async fn fetch_sample(&self, recording: &Recording) -> anyhow::Result<()> {
        let fetcher = self.fetcher.clone();
        let source = self.source.clone();
        let file = recording.filename.clone();
        let dest = self.staging_file.clone();
        tokio::task::spawn_blocking(move || fetcher.fetch(&source, &file, &dest)).await??;
        Ok(())
    }

    async fn derive(&self, recording: &Recording) -> anyhow::Result<Derivation<DerivedSettings>> {
        let recording = recording.clone();
        let rules = self.rules.clone();
        let inspector = self.inspector.clone();
        let prober = self.prober.clone();
        let sample = self.staging_file.clone();

        let derived = tokio::task::spawn_blocking(move || {
            derive_settings(
                &recording,
                Some(sample.as_path()),
                &rules,
                &*inspector,
                prober.as_deref(),
            )
        })
        .await?;
        Ok(derived)
    }

    fn work_order(&self, recording: &Recording, derived: DerivedSettings) -> WorkOrder {
        WorkOrder::builder(recording.filename.clone(), derived.output_filename)
            .crop(derived.crop)
            .deinterlace(derived.deinterlace)
            .output_res(derived.output_res)
            .fetch(self.source.clone())
            .bitrate(self.bitrate)
            .build()
    }

    async fn finalize(&self, recording: &Recording, outcome: JobOutcome) -> JobOutcome {
        remove_staged(&self.staging_file);

        if outcome.commits() {
            let ledger = self.ledger.clone();
            let uuid = recording.uuid.clone();
            match tokio::task::spawn_blocking(move || ledger.mark_scheduled(&uuid)).await {
                Ok(Ok(mark)) => {
                    tracing::debug!(uuid = %recording.uuid, "Ledger commit: {:?}", mark);
                }
                Ok(Err(e)) => {
                    tracing::error!(uuid = %recording.uuid, "Ledger commit failed: {}", e);
                }
                Err(e) => {
                    tracing::error!(uuid = %recording.uuid, "Ledger commit panicked: {}", e);
                }
            }
        }

        match &outcome {
            JobOutcome::Published(_) => {
                tracing::info!(uuid = %recording.uuid, "Finished {}", recording.title)
            }
            JobOutcome::Aborted => {
                tracing::info!(uuid = %recording.uuid, "Skipped {} at operator request", recording.title)
            }
            JobOutcome::Failed(reason) => {
                tracing::warn!(uuid = %recording.uuid, "Failed {}: {}", recording.title, reason)
            }
            JobOutcome::SkippedDuplicate => {}
        }

        outcome
    }
}
