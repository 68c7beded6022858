mod cli;
mod processor;

use dvrflow::config;
use dvrflow::derive::{derive_settings, DeriveRules, Derivation, TerminalInspector};
use dvrflow_av::{check_tools, FfprobeProber, Prober};
use dvrflow_common::{NotificationBatch, Recording, WorkOrder};
use dvrflow_db::{Ledger, MarkOutcome};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands, LedgerCommands};
use std::path::Path;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "dvrflow=trace,dvrflow_av=debug,dvrflow_db=debug,rumqttc=info".to_string()
        } else {
            "dvrflow=debug,dvrflow_av=debug,dvrflow_db=info,rumqttc=warn".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Publish => {
            let config = config::load_config_or_default(cli.config.as_deref())?;
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(processor::run_publisher(config))
        }
        Commands::Work { share_group } => {
            let mut config = config::load_config_or_default(cli.config.as_deref())?;
            if let Some(group) = share_group {
                config::validate_share_group(&group)?;
                config.worker.share_group = Some(group);
            }
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(processor::run_worker(config))
        }
        Commands::Listen => {
            let config = config::load_config_or_default(cli.config.as_deref())?;
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(processor::run_listener(config))
        }
        Commands::Ledger { action } => ledger_command(action, cli.config.as_deref()),
        Commands::Derive {
            notification,
            sample,
        } => derive_offline(&notification, sample.as_deref(), cli.config.as_deref()),
        Commands::Probe { file, json } => probe_file(&file, json, cli.config.as_deref()),
        Commands::CheckTools => check_tools_command(cli.config.as_deref()),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("dvrflow {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn ledger_command(action: LedgerCommands, config_path: Option<&Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let ledger = Ledger::open(&config.ledger.path)
        .with_context(|| format!("Failed to open ledger {:?}", config.ledger.path))?;

    match action {
        LedgerCommands::Check { uuid } => {
            if ledger.already_scheduled(&uuid)? {
                let entry = ledger.get(&uuid)?;
                match entry.scheduled_at {
                    Some(at) => println!("{uuid}: scheduled at {}", at.to_rfc3339()),
                    None => println!("{uuid}: scheduled"),
                }
            } else {
                println!("{uuid}: not scheduled");
            }
        }
        LedgerCommands::Mark { uuid } => match ledger.mark_scheduled(&uuid)? {
            MarkOutcome::Inserted => println!("{uuid}: marked as scheduled"),
            MarkOutcome::AlreadyPresent => println!("{uuid}: already scheduled"),
        },
        LedgerCommands::List { limit } => {
            let entries = ledger.list(limit)?;
            println!("{} of {} recordings:", entries.len(), ledger.count()?);
            for entry in entries {
                let at = entry
                    .scheduled_at
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_else(|| "-".to_string());
                println!("  {}  {}", at, entry.uuid);
            }
        }
    }

    Ok(())
}

/// Read a notification file holding either a batch or a single entry.
fn read_notifications(path: &Path) -> Result<Vec<serde_json::Value>> {
    let content =
        std::fs::read(path).with_context(|| format!("Failed to read {:?}", path))?;
    if let Ok(batch) = NotificationBatch::from_json(&content) {
        return Ok(batch.entries);
    }
    let entry: serde_json::Value = serde_json::from_slice(&content)
        .with_context(|| format!("{:?} is not JSON", path))?;
    Ok(vec![entry])
}

fn derive_offline(
    notification: &Path,
    sample: Option<&Path>,
    config_path: Option<&Path>,
) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let rules = DeriveRules::from(&config.publisher);
    let validation = config.source.validation_rules();
    let inspector = TerminalInspector::new(config.publisher.inspector.command.clone());
    let prober = FfprobeProber::new(&config.tools.ffprobe);

    if let Some(sample) = sample {
        if !sample.exists() {
            anyhow::bail!("Sample does not exist: {:?}", sample);
        }
    }

    for entry in read_notifications(notification)? {
        let recording = match Recording::from_entry(&entry, &validation) {
            Ok(recording) => recording,
            Err(e) => {
                eprintln!("Rejected: {e}");
                continue;
            }
        };

        let prober: Option<&dyn Prober> = sample.map(|_| &prober as &dyn Prober);
        match derive_settings(&recording, sample, &rules, &inspector, prober) {
            Derivation::Continue(derived) => {
                let order = WorkOrder::builder(recording.filename.clone(), derived.output_filename)
                    .crop(derived.crop)
                    .deinterlace(derived.deinterlace)
                    .output_res(derived.output_res)
                    .fetch(config.source.fetch_location())
                    .bitrate(config.publisher.bitrate)
                    .build();
                println!("{}", serde_json::to_string_pretty(&order)?);
            }
            Derivation::Abort => eprintln!("Skipped {} ({})", recording.title, recording.uuid),
        }
    }

    Ok(())
}

fn probe_file(file: &Path, json: bool, config_path: Option<&Path>) -> Result<()> {
    if !file.exists() {
        anyhow::bail!("File does not exist: {:?}", file);
    }

    let config = config::load_config_or_default(config_path)?;
    let media_info = FfprobeProber::new(&config.tools.ffprobe).probe(file)?;

    if json {
        let json_str = serde_json::to_string_pretty(&media_info)?;
        println!("{}", json_str);
    } else {
        println!("File: {}", media_info.file_path.display());
        println!("Container: {}", media_info.container);
        if let Some(ref duration) = media_info.duration {
            let secs = duration.as_secs();
            let mins = secs / 60;
            let hours = mins / 60;
            println!("Duration: {:02}:{:02}:{:02}", hours, mins % 60, secs % 60);
        }

        println!("\nVideo Tracks: {}", media_info.video_tracks.len());
        for (i, track) in media_info.video_tracks.iter().enumerate() {
            println!("  [{}] {} {}x{}", i, track.codec, track.width, track.height);
            if let Some(fps) = track.frame_rate {
                println!("      {:.3} fps", fps);
            }
            println!("      Field order: {:?}", track.field_order);
        }
    }

    Ok(())
}

fn check_tools_command(config_path: Option<&Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;

    println!("Checking external tools...\n");

    let tools = check_tools(
        &config.tools.ffprobe,
        &config.tools.scp,
        &config.worker.encoder.program,
    );
    let mut all_ok = true;

    for tool in &tools {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);

        if let Some(ref version) = tool.version {
            print!(" ({})", version.lines().next().unwrap_or(""));
        }

        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }

        println!();
    }

    println!();
    if all_ok {
        println!("All required tools are available!");
    } else {
        println!("Some tools are missing. Publishers need ffprobe and scp, workers scp and the encoder.");
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            config
        }
        None => {
            println!("No config file specified, using defaults");
            config::Config::default()
        }
    };

    println!("  Broker: {}:{}", config.bus.host, config.bus.port);
    println!("  TLS: {}", config.bus.tls.enabled);
    println!(
        "  Topics: {} -> {}",
        config.topics.finished, config.topics.transcode
    );
    println!("  Ledger: {:?}", config.ledger.path);
    println!(
        "  Source: {}",
        config.source.fetch_location().remote_spec("<file>")
    );
    println!("  Bitrate: {} kbps", config.publisher.bitrate);
    match &config.worker.share_group {
        Some(group) => println!("  Share group: {}", group),
        None => println!("  Share group: (none)"),
    }
    println!("  Upscale rules: {}", config.worker.upscale.len());

    Ok(())
}
