use dvrflow_common::{FetchLocation, Resolution, ValidationRules};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub bus: BusConfig,

    #[serde(default)]
    pub topics: TopicsConfig,

    #[serde(default)]
    pub ledger: LedgerConfig,

    #[serde(default)]
    pub source: SourceConfig,

    #[serde(default)]
    pub publisher: PublisherConfig,

    #[serde(default)]
    pub worker: WorkerConfig,

    #[serde(default)]
    pub tools: ToolsConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BusConfig {
    #[serde(default = "default_bus_host")]
    pub host: String,

    #[serde(default = "default_bus_port")]
    pub port: u16,

    /// MQTT client id; a random one is generated when unset.
    #[serde(default)]
    pub client_id: Option<String>,

    #[serde(default = "default_keep_alive")]
    pub keep_alive_secs: u64,

    /// Keep broker-side session state across reconnects.
    #[serde(default)]
    pub persistent_session: bool,

    #[serde(default)]
    pub tls: TlsConfig,
}

fn default_bus_host() -> String {
    "localhost".to_string()
}
fn default_bus_port() -> u16 {
    8883
}
fn default_keep_alive() -> u64 {
    30
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            host: default_bus_host(),
            port: default_bus_port(),
            client_id: None,
            keep_alive_secs: default_keep_alive(),
            persistent_session: false,
            tls: TlsConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_ca_file")]
    pub ca_file: PathBuf,

    /// Client certificate presented to the broker
    #[serde(default)]
    pub cert_file: Option<PathBuf>,

    /// Private key matching `cert_file`
    #[serde(default)]
    pub key_file: Option<PathBuf>,
}

fn default_true() -> bool {
    true
}
fn default_ca_file() -> PathBuf {
    PathBuf::from("ca.crt")
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ca_file: default_ca_file(),
            cert_file: None,
            key_file: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TopicsConfig {
    /// Finished-recording notifications from the PVR
    #[serde(default = "default_finished_topic")]
    pub finished: String,

    /// Work orders for transcode workers
    #[serde(default = "default_transcode_topic")]
    pub transcode: String,
}

fn default_finished_topic() -> String {
    "tvheadend/finished".to_string()
}
fn default_transcode_topic() -> String {
    "rkmppenc".to_string()
}

impl Default for TopicsConfig {
    fn default() -> Self {
        Self {
            finished: default_finished_topic(),
            transcode: default_transcode_topic(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LedgerConfig {
    #[serde(default = "default_ledger_path")]
    pub path: PathBuf,

    /// Import identifiers from an old `uuid_recordings` table on startup
    #[serde(default = "default_true")]
    pub import_legacy: bool,
}

fn default_ledger_path() -> PathBuf {
    PathBuf::from("tvheadend-recordings.db")
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            path: default_ledger_path(),
            import_legacy: true,
        }
    }
}

/// The capture host recordings are copied from.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SourceConfig {
    #[serde(default)]
    pub user: String,

    #[serde(default = "default_source_host")]
    pub host: String,

    #[serde(default)]
    pub path_prefix: String,

    /// Reject notifications whose path does not start with this
    #[serde(default)]
    pub required_path_prefix: Option<String>,
}

fn default_source_host() -> String {
    "localhost".to_string()
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            user: String::new(),
            host: default_source_host(),
            path_prefix: String::new(),
            required_path_prefix: None,
        }
    }
}

impl SourceConfig {
    pub fn fetch_location(&self) -> FetchLocation {
        FetchLocation {
            user: self.user.clone(),
            host: self.host.clone(),
            path_prefix: self.path_prefix.clone(),
        }
    }

    pub fn validation_rules(&self) -> ValidationRules {
        ValidationRules {
            required_path_prefix: self.required_path_prefix.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PublisherConfig {
    /// Bitrate (kbps) requested in every work order
    #[serde(default = "default_bitrate")]
    pub bitrate: u32,

    /// Local copy of the recording used for inspection and probing
    #[serde(default = "default_publisher_staging")]
    pub staging_file: PathBuf,

    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    #[serde(default = "default_ack_timeout")]
    pub publish_ack_timeout_secs: u64,

    /// Titles starting with these never need cropping
    #[serde(default = "default_letterbox_free")]
    pub letterbox_free_prefixes: Vec<String>,

    /// Channels known to broadcast interlaced (top field first)
    #[serde(default = "default_interlaced_channels")]
    pub interlaced_channels: Vec<String>,

    #[serde(default = "default_resolution_overrides")]
    pub resolution_overrides: Vec<ResolutionOverride>,

    #[serde(default)]
    pub inspector: InspectorConfig,
}

fn default_bitrate() -> u32 {
    700
}
fn default_publisher_staging() -> PathBuf {
    PathBuf::from("/tmp/recording.ts")
}
fn default_poll_interval() -> u64 {
    10
}
fn default_ack_timeout() -> u64 {
    30
}
fn default_letterbox_free() -> Vec<String> {
    vec!["ER".to_string()]
}
fn default_interlaced_channels() -> Vec<String> {
    vec!["9gem".to_string(), "9go".to_string()]
}
fn default_resolution_overrides() -> Vec<ResolutionOverride> {
    vec![ResolutionOverride {
        title_prefix: "ER".to_string(),
        resolution: Resolution::new(1280, 720),
    }]
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            bitrate: default_bitrate(),
            staging_file: default_publisher_staging(),
            poll_interval_secs: default_poll_interval(),
            publish_ack_timeout_secs: default_ack_timeout(),
            letterbox_free_prefixes: default_letterbox_free(),
            interlaced_channels: default_interlaced_channels(),
            resolution_overrides: default_resolution_overrides(),
            inspector: InspectorConfig::default(),
        }
    }
}

/// Forces an output resolution for a family of titles.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ResolutionOverride {
    pub title_prefix: String,
    pub resolution: Resolution,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InspectorConfig {
    /// Viewer launched before the crop prompt; `{input}` and `{dirname}`
    /// are replaced with the staged recording. Empty disables the viewer.
    #[serde(default = "default_inspector_command")]
    pub command: Vec<String>,
}

fn default_inspector_command() -> Vec<String> {
    [
        "flatpak",
        "run",
        "--filesystem={dirname}",
        "fr.handbrake.ghb",
        "--device={input}",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Default for InspectorConfig {
    fn default() -> Self {
        Self {
            command: default_inspector_command(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkerConfig {
    /// Join this shared-subscription group instead of subscribing alone
    #[serde(default)]
    pub share_group: Option<String>,

    #[serde(default = "default_worker_staging")]
    pub staging_file: PathBuf,

    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Used when a work order carries no bitrate
    #[serde(default = "default_bitrate")]
    pub default_bitrate: u32,

    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    #[serde(default)]
    pub encoder: EncoderConfig,

    #[serde(default = "default_upscale")]
    pub upscale: Vec<UpscaleRule>,
}

fn default_worker_staging() -> PathBuf {
    PathBuf::from("recording.ts")
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("/nfs")
}
fn default_upscale() -> Vec<UpscaleRule> {
    vec![
        UpscaleRule {
            from: Resolution::new(720, 576),
            to: Resolution::new(1024, 576),
        },
        UpscaleRule {
            from: Resolution::new(720, 480),
            to: Resolution::new(854, 480),
        },
        UpscaleRule {
            from: Resolution::new(1440, 1080),
            to: Resolution::new(1920, 1080),
        },
    ]
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            share_group: None,
            staging_file: default_worker_staging(),
            output_dir: default_output_dir(),
            default_bitrate: default_bitrate(),
            poll_interval_secs: default_poll_interval(),
            encoder: EncoderConfig::default(),
            upscale: default_upscale(),
        }
    }
}

/// Exact source resolution to forced output resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct UpscaleRule {
    pub from: Resolution,
    pub to: Resolution,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EncoderConfig {
    #[serde(default = "default_encoder_program")]
    pub program: String,

    /// Codec, preset and audio flags placed before everything else
    #[serde(default = "default_encoder_args")]
    pub base_args: Vec<String>,
}

fn default_encoder_program() -> String {
    "rkmppenc".to_string()
}
fn default_encoder_args() -> Vec<String> {
    ["-c", "hevc", "--preset", "best", "--audio-codec", "aac"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            program: default_encoder_program(),
            base_args: default_encoder_args(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ToolsConfig {
    #[serde(default = "default_ffprobe")]
    pub ffprobe: String,

    #[serde(default = "default_scp")]
    pub scp: String,
}

fn default_ffprobe() -> String {
    "ffprobe".to_string()
}
fn default_scp() -> String {
    "scp".to_string()
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ffprobe: default_ffprobe(),
            scp: default_scp(),
        }
    }
}
