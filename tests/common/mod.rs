//! Shared test harness for integration tests.
//!
//! Provides recording fakes for the bus, fetcher, prober and encoder, plus
//! [`PublisherHarness`] and [`WorkerHarness`] which wire them to an
//! in-memory ledger and a temporary staging directory.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tempfile::TempDir;

use dvrflow::bus::{BusError, MessageBus};
use dvrflow::config::Config;
use dvrflow::derive::{CropAnswer, ScriptedInspector};
use dvrflow::fetch::Fetcher;
use dvrflow::publisher::JobPublisher;
use dvrflow::worker::{Encoder, TranscodeWorker};
use dvrflow_av::{MediaInfo, Prober, ScanType, VideoTrack};
use dvrflow_common::{FetchLocation, WorkOrder};
use dvrflow_db::Ledger;

/// Bus that records publishes and can be told to fail them.
#[derive(Default)]
pub struct FakeBus {
    published: Mutex<Vec<(String, Vec<u8>)>>,
    fail: Mutex<bool>,
}

impl FakeBus {
    pub fn set_failing(&self, fail: bool) {
        *self.fail.lock() = fail;
    }

    pub fn published(&self) -> Vec<(String, Vec<u8>)> {
        self.published.lock().clone()
    }

    pub fn orders(&self) -> Vec<WorkOrder> {
        self.published()
            .iter()
            .map(|(_, payload)| WorkOrder::from_json(payload).expect("work order JSON"))
            .collect()
    }
}

#[async_trait]
impl MessageBus for FakeBus {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), BusError> {
        if *self.fail.lock() {
            return Err(BusError::Disconnected);
        }
        self.published.lock().push((topic.to_string(), payload));
        Ok(())
    }
}

/// Fetcher that writes a placeholder file, or fails on request.
#[derive(Default)]
pub struct FakeFetcher {
    calls: Mutex<Vec<String>>,
    fail: Mutex<bool>,
    /// Recording files that fail even when `fail` is unset.
    missing: Mutex<Vec<String>>,
}

impl FakeFetcher {
    pub fn failing() -> Self {
        let fetcher = Self::default();
        *fetcher.fail.lock() = true;
        fetcher
    }

    /// Fail only for `recording_file`.
    pub fn missing(recording_file: &str) -> Self {
        let fetcher = Self::default();
        fetcher.missing.lock().push(recording_file.to_string());
        fetcher
    }

    /// Remote specs requested so far.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

impl Fetcher for FakeFetcher {
    fn fetch(
        &self,
        location: &FetchLocation,
        recording_file: &str,
        dest: &Path,
    ) -> dvrflow_av::Result<()> {
        self.calls.lock().push(location.remote_spec(recording_file));
        if *self.fail.lock() || self.missing.lock().iter().any(|f| f == recording_file) {
            return Err(dvrflow_av::Error::tool_failed("scp", "exited with status 1"));
        }
        std::fs::write(dest, b"mpegts")?;
        Ok(())
    }
}

/// Prober answering with a fixed video track.
pub struct FakeProber {
    pub width: u32,
    pub height: u32,
    pub scan: ScanType,
}

impl FakeProber {
    pub fn sd(scan: ScanType) -> Self {
        Self {
            width: 720,
            height: 576,
            scan,
        }
    }
}

impl Prober for FakeProber {
    fn name(&self) -> &'static str {
        "fake"
    }

    fn probe(&self, path: &Path) -> dvrflow_av::Result<MediaInfo> {
        if !path.exists() {
            return Err(dvrflow_av::Error::file_not_found(path));
        }
        Ok(MediaInfo {
            file_path: path.to_path_buf(),
            container: "mpegts".to_string(),
            duration: None,
            video_tracks: vec![VideoTrack {
                index: 0,
                codec: "mpeg2video".to_string(),
                width: self.width,
                height: self.height,
                frame_rate: Some(25.0),
                field_order: self.scan,
            }],
        })
    }
}

/// Encoder that records its argument lists.
#[derive(Default)]
pub struct FakeEncoder {
    runs: Mutex<Vec<Vec<String>>>,
    fail: Mutex<bool>,
    /// Whether the staged input existed when the encoder ran.
    saw_input: Mutex<Vec<bool>>,
}

impl FakeEncoder {
    pub fn failing() -> Self {
        let encoder = Self::default();
        *encoder.fail.lock() = true;
        encoder
    }

    pub fn runs(&self) -> Vec<Vec<String>> {
        self.runs.lock().clone()
    }

    pub fn saw_input(&self) -> Vec<bool> {
        self.saw_input.lock().clone()
    }
}

impl Encoder for FakeEncoder {
    fn encode(&self, args: &[String]) -> dvrflow_av::Result<()> {
        let input = args
            .iter()
            .position(|a| a == "-i")
            .and_then(|i| args.get(i + 1))
            .map(|p| Path::new(p).exists())
            .unwrap_or(false);
        self.saw_input.lock().push(input);
        self.runs.lock().push(args.to_vec());
        if *self.fail.lock() {
            return Err(dvrflow_av::Error::tool_failed("rkmppenc", "exited with status 1"));
        }
        Ok(())
    }
}

/// A valid notification entry as JSON.
pub fn entry(uuid: &str, title: &str, channel: &str, episode: Option<&str>) -> serde_json::Value {
    let mut entry = serde_json::json!({
        "uuid": uuid,
        "status": "Completed OK",
        "filename": format!("/data/recordings/{title}.ts"),
        "title": { "eng": title, "ger": "Notaufnahme" },
        "channelname": channel,
        "copyright_year": 0
    });
    if let Some(episode) = episode {
        entry["episode_disp"] = serde_json::json!(episode);
    }
    entry
}

/// Wrap entries in a notification batch payload.
pub fn batch(entries: Vec<serde_json::Value>) -> Vec<u8> {
    serde_json::to_vec(&serde_json::json!({ "entries": entries })).expect("batch JSON")
}

pub fn test_config(staging: &Path) -> Config {
    let mut config = Config::default();
    config.bus.tls.enabled = false;
    config.source.user = "hts".to_string();
    config.source.host = "pvr.lan".to_string();
    config.publisher.staging_file = staging.join("publisher.ts");
    config.worker.staging_file = staging.join("worker.ts");
    config.worker.output_dir = PathBuf::from("/nfs");
    config
}

pub struct PublisherHarness {
    pub publisher: JobPublisher,
    pub bus: Arc<FakeBus>,
    pub fetcher: Arc<FakeFetcher>,
    pub inspector: Arc<ScriptedInspector>,
    pub ledger: Ledger,
    pub config: Config,
    pub dir: TempDir,
}

impl PublisherHarness {
    pub fn new(answers: Vec<CropAnswer>) -> Self {
        Self::build(answers, FakeFetcher::default(), Ledger::in_memory().expect("ledger"))
    }

    pub fn with_ledger(answers: Vec<CropAnswer>, ledger: Ledger) -> Self {
        Self::build(answers, FakeFetcher::default(), ledger)
    }

    pub fn with_failing_fetch() -> Self {
        Self::build(
            Vec::new(),
            FakeFetcher::failing(),
            Ledger::in_memory().expect("ledger"),
        )
    }

    fn build(answers: Vec<CropAnswer>, fetcher: FakeFetcher, ledger: Ledger) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = test_config(dir.path());
        let bus = Arc::new(FakeBus::default());
        let fetcher = Arc::new(fetcher);
        let inspector = Arc::new(ScriptedInspector::new(answers));
        let publisher = JobPublisher::new(
            &config,
            ledger.clone(),
            bus.clone(),
            fetcher.clone(),
            inspector.clone(),
        )
        .with_prober(Arc::new(FakeProber::sd(ScanType::Unknown)));

        Self {
            publisher,
            bus,
            fetcher,
            inspector,
            ledger,
            config,
            dir,
        }
    }

    pub fn staged(&self) -> PathBuf {
        self.config.publisher.staging_file.clone()
    }
}

pub struct WorkerHarness {
    pub worker: TranscodeWorker,
    pub fetcher: Arc<FakeFetcher>,
    pub encoder: Arc<FakeEncoder>,
    pub config: Config,
    pub dir: TempDir,
}

impl WorkerHarness {
    pub fn new(fetcher: FakeFetcher, encoder: FakeEncoder, prober: Option<FakeProber>) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = test_config(dir.path());
        let fetcher = Arc::new(fetcher);
        let encoder = Arc::new(encoder);
        let mut worker = TranscodeWorker::new(&config, fetcher.clone(), encoder.clone());
        if let Some(prober) = prober {
            worker = worker.with_prober(Arc::new(prober));
        }
        Self {
            worker,
            fetcher,
            encoder,
            config,
            dir,
        }
    }

    pub fn staged(&self) -> PathBuf {
        self.config.worker.staging_file.clone()
    }
}
