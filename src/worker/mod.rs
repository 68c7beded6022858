//! Transcode worker: fetch, encode, clean up.

mod encode;

pub use encode::{build_encoder_args, EncodeSettings, Encoder, ProcessEncoder};

use crate::config::Config;
use crate::fetch::{remove_staged, Fetcher};
use dvrflow_av::Prober;
use dvrflow_common::{FetchLocation, Resolution, WorkOrder};
use std::path::PathBuf;
use std::sync::Arc;

/// Terminal state of one work order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkOutcome {
    Encoded,
    /// The encoder ran and failed.
    EncoderFailed(String),
    /// The source could not be copied; the encoder never ran.
    FetchFailed(String),
}

/// Decode a work order payload. Undecodable payloads are logged and dropped.
pub fn accept_order(payload: &[u8]) -> Option<WorkOrder> {
    match WorkOrder::from_json(payload) {
        Ok(order) => Some(order),
        Err(e) => {
            tracing::warn!("Dropping malformed work order: {}", e);
            None
        }
    }
}

pub struct TranscodeWorker {
    fetcher: Arc<dyn Fetcher>,
    encoder: Arc<dyn Encoder>,
    prober: Option<Arc<dyn Prober>>,
    settings: EncodeSettings,
    fallback_source: FetchLocation,
    staging_file: PathBuf,
}

impl TranscodeWorker {
    pub fn new(config: &Config, fetcher: Arc<dyn Fetcher>, encoder: Arc<dyn Encoder>) -> Self {
        Self {
            fetcher,
            encoder,
            prober: None,
            settings: EncodeSettings::from(&config.worker),
            fallback_source: config.source.fetch_location(),
            staging_file: config.worker.staging_file.clone(),
        }
    }

    /// Probe fetched recordings so the upscale table can apply.
    pub fn with_prober(mut self, prober: Arc<dyn Prober>) -> Self {
        self.prober = Some(prober);
        self
    }

    /// Where to fetch from: the order's own location, else the configured
    /// source for orders that carry none.
    fn source_for(&self, order: &WorkOrder) -> FetchLocation {
        if order.fetch.host.is_empty() {
            self.fallback_source.clone()
        } else {
            order.fetch.clone()
        }
    }

    pub async fn process(&self, order: WorkOrder) -> WorkOutcome {
        tracing::info!(
            file = %order.recording_file,
            output = %order.preferred_output_filename,
            "Transcoding recording"
        );

        let fetcher = self.fetcher.clone();
        let source = self.source_for(&order);
        let file = order.recording_file.clone();
        let staged = self.staging_file.clone();
        let fetched =
            tokio::task::spawn_blocking(move || fetcher.fetch(&source, &file, &staged)).await;

        let outcome = match fetched {
            Ok(Ok(())) => self.encode(&order).await,
            Ok(Err(e)) => WorkOutcome::FetchFailed(e.to_string()),
            Err(e) => WorkOutcome::FetchFailed(e.to_string()),
        };

        remove_staged(&self.staging_file);

        match &outcome {
            WorkOutcome::Encoded => tracing::info!(file = %order.recording_file, "Transcode finished"),
            WorkOutcome::EncoderFailed(reason) => {
                tracing::error!(file = %order.recording_file, "Transcode failed: {}", reason)
            }
            WorkOutcome::FetchFailed(reason) => tracing::warn!(
                file = %order.recording_file,
                "Unable to fetch recording, continuing with others: {}",
                reason
            ),
        }
        outcome
    }

    async fn encode(&self, order: &WorkOrder) -> WorkOutcome {
        let order = order.clone();
        let staged = self.staging_file.clone();
        let settings = self.settings.clone();
        let encoder = self.encoder.clone();
        let prober = self.prober.clone();

        let result = tokio::task::spawn_blocking(move || {
            let source = if order.output_res.is_none() {
                prober.and_then(|p| source_resolution(&*p, &staged))
            } else {
                None
            };
            let args = build_encoder_args(&order, &staged, source, &settings);
            encoder.encode(&args)
        })
        .await;

        match result {
            Ok(Ok(())) => WorkOutcome::Encoded,
            Ok(Err(e)) => WorkOutcome::EncoderFailed(e.to_string()),
            Err(e) => WorkOutcome::EncoderFailed(e.to_string()),
        }
    }
}

fn source_resolution(prober: &dyn Prober, staged: &std::path::Path) -> Option<Resolution> {
    match prober.probe(staged) {
        Ok(info) => info
            .primary_video()
            .map(|v| Resolution::new(v.width, v.height)),
        Err(e) => {
            tracing::warn!("Could not probe {:?}, no upscale: {}", staged, e);
            None
        }
    }
}
