mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config = parse_config(&content)
        .with_context(|| format!("Failed to load config file: {:?}", path))?;

    Ok(config)
}

/// Parse and validate configuration from TOML text
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).context("Invalid TOML")?;
    validate_config(&config)?;
    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    let default_paths = [
        "./dvrflow.toml",
        "./config.toml",
        "~/.config/dvrflow/config.toml",
        "/etc/dvrflow/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            tracing::debug!("Using config file {:?}", path);
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.bus.port == 0 {
        anyhow::bail!("Bus port cannot be 0");
    }
    if config.bus.host.trim().is_empty() {
        anyhow::bail!("Bus host cannot be empty");
    }

    if config.bus.tls.enabled {
        let tls = &config.bus.tls;
        if tls.cert_file.is_some() != tls.key_file.is_some() {
            anyhow::bail!("TLS cert_file and key_file must be set together");
        }
        let files = std::iter::once(&tls.ca_file)
            .chain(tls.cert_file.iter())
            .chain(tls.key_file.iter());
        for file in files {
            if !file.exists() {
                anyhow::bail!("TLS file does not exist: {:?}", file);
            }
        }
    }

    if config.topics.finished.trim().is_empty() {
        anyhow::bail!("Notification topic cannot be empty");
    }
    if config.topics.transcode.trim().is_empty() {
        anyhow::bail!("Work order topic cannot be empty");
    }
    for topic in [&config.topics.finished, &config.topics.transcode] {
        if topic.contains(['+', '#']) {
            anyhow::bail!("Topic '{}' must not contain wildcards", topic);
        }
    }

    if config.publisher.bitrate == 0 {
        anyhow::bail!("Publisher bitrate must be greater than 0");
    }
    if config.worker.default_bitrate == 0 {
        anyhow::bail!("Worker default_bitrate must be greater than 0");
    }

    if let Some(group) = &config.worker.share_group {
        validate_share_group(group)?;
    }

    for rule in &config.worker.upscale {
        if rule.to.width == 0 || rule.to.height == 0 {
            anyhow::bail!("Upscale target for {} has a zero dimension", rule.from);
        }
    }
    for over in &config.publisher.resolution_overrides {
        if over.title_prefix.is_empty() {
            anyhow::bail!("Resolution override has an empty title_prefix");
        }
    }

    if config.worker.encoder.program.trim().is_empty() {
        anyhow::bail!("Encoder program cannot be empty");
    }

    if let Some(parent) = config.ledger.path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            tracing::warn!("Ledger directory does not exist: {:?}", parent);
        }
    }

    Ok(())
}

/// A shared-subscription group name is a single topic level.
pub fn validate_share_group(group: &str) -> Result<()> {
    if group.is_empty() {
        anyhow::bail!("Share group cannot be empty");
    }
    if group.contains(['/', '+', '#']) {
        anyhow::bail!("Share group '{}' must not contain '/', '+' or '#'", group);
    }
    Ok(())
}
