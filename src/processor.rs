//! Role runners: wire the broker session, the work queue and a job handler
//! together and run until the connection ends and the queue is drained.

use anyhow::{Context, Result};
use dvrflow::bus::mqtt::MqttSession;
use dvrflow::bus::subscription_filter;
use dvrflow::config::Config;
use dvrflow::derive::TerminalInspector;
use dvrflow::fetch::ScpFetcher;
use dvrflow::publisher::{accept_batch, JobOutcome, JobPublisher};
use dvrflow::queue::work_queue;
use dvrflow::worker::{accept_order, ProcessEncoder, TranscodeWorker, WorkOutcome};
use dvrflow_av::{require_tool, FfprobeProber};
use dvrflow_common::{NotificationBatch, Recording, WorkOrder};
use dvrflow_db::Ledger;
use std::cell::Cell;
use std::sync::Arc;
use std::time::Duration;

/// Disconnect on Ctrl-C so queued work finishes and the process exits.
fn disconnect_on_interrupt(bus: Arc<dvrflow::bus::mqtt::MqttBus>) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, finishing queued work");
            bus.disconnect().await;
        }
    });
}

pub async fn run_publisher(config: Config) -> Result<()> {
    require_tool(&config.tools.scp)?;
    let ledger = Ledger::open(&config.ledger.path)
        .with_context(|| format!("Failed to open ledger {:?}", config.ledger.path))?;
    if config.ledger.import_legacy {
        let imported = ledger.import_legacy()?;
        if imported > 0 {
            tracing::info!("Imported {} identifiers from the legacy table", imported);
        }
    }
    tracing::info!(
        "Ledger at {:?} holds {} recordings",
        config.ledger.path,
        ledger.count()?
    );

    let poll = Duration::from_secs(config.publisher.poll_interval_secs.max(1));
    let (handle, queue) = work_queue::<Recording>(poll);

    let session = MqttSession::connect(&config.bus, "publish")
        .await?
        .with_ack_timeout(publish_ack_timeout(&config));
    session.subscribe(&config.topics.finished).await?;

    let rules = config.source.validation_rules();
    let (bus, transport) = session.spawn(queue.shutdown_signal(), move |_topic, payload| {
        let accepted = accept_batch(payload, &rules);
        let count = accepted.len();
        for recording in accepted {
            handle.push(recording);
        }
        tracing::info!("Queued {} recordings", count);
    });
    disconnect_on_interrupt(bus.clone());

    let publisher = JobPublisher::new(
        &config,
        ledger,
        bus,
        Arc::new(ScpFetcher::new(&config.tools.scp)),
        Arc::new(TerminalInspector::new(
            config.publisher.inspector.command.clone(),
        )),
    )
    .with_prober(Arc::new(FfprobeProber::new(&config.tools.ffprobe)));

    tracing::info!(
        "Waiting for finished recordings on {}",
        config.topics.finished
    );

    let publisher = &publisher;
    let handled = queue
        .run(|recording| async move {
            match publisher.process(recording).await {
                JobOutcome::Published(order) => {
                    tracing::debug!("Published {}", order.preferred_output_filename)
                }
                JobOutcome::SkippedDuplicate | JobOutcome::Aborted | JobOutcome::Failed(_) => {}
            }
        })
        .await;

    let _ = transport.await;
    tracing::info!("Publisher stopped after {} recordings", handled);
    Ok(())
}

fn publish_ack_timeout(config: &Config) -> Duration {
    Duration::from_secs(config.publisher.publish_ack_timeout_secs.max(1))
}

pub async fn run_worker(config: Config) -> Result<()> {
    require_tool(&config.tools.scp)?;
    require_tool(&config.worker.encoder.program)?;
    let poll = Duration::from_secs(config.worker.poll_interval_secs.max(1));
    let (handle, queue) = work_queue::<WorkOrder>(poll);

    let session = MqttSession::connect(&config.bus, "work").await?;
    let filter = subscription_filter(
        &config.topics.transcode,
        config.worker.share_group.as_deref(),
    );
    session.subscribe(&filter).await?;

    let (bus, transport) = session.spawn(queue.shutdown_signal(), move |_topic, payload| {
        if let Some(order) = accept_order(payload) {
            handle.push(order);
        }
    });
    disconnect_on_interrupt(bus);

    let worker = TranscodeWorker::new(
        &config,
        Arc::new(ScpFetcher::new(&config.tools.scp)),
        Arc::new(ProcessEncoder::new(&config.worker.encoder.program)),
    )
    .with_prober(Arc::new(FfprobeProber::new(&config.tools.ffprobe)));

    tracing::info!("Waiting for work orders on {}", filter);

    let worker = &worker;
    let failures = &Cell::new(0usize);
    let handled = queue
        .run(|order| async move {
            if worker.process(order).await != WorkOutcome::Encoded {
                failures.set(failures.get() + 1);
            }
        })
        .await;

    let _ = transport.await;
    tracing::info!(
        "Worker stopped after {} work orders ({} failed)",
        handled,
        failures.get()
    );
    Ok(())
}

/// One line per notification entry with its validation verdict.
pub fn describe_entries(payload: &[u8], config: &Config) -> Vec<String> {
    let rules = config.source.validation_rules();
    let batch = match NotificationBatch::from_json(payload) {
        Ok(batch) => batch,
        Err(e) => return vec![format!("malformed batch: {e}")],
    };

    batch
        .entries
        .iter()
        .map(|entry| {
            let field = |name: &str| entry.get(name).and_then(|v| v.as_str()).unwrap_or("?");
            let title = entry
                .get("title")
                .and_then(|t| t.get("eng"))
                .and_then(|v| v.as_str())
                .unwrap_or("?");
            let verdict = match Recording::from_entry(entry, &rules) {
                Ok(_) => "ok".to_string(),
                Err(e) => format!("rejected: {e}"),
            };
            format!(
                "{} {} {} [{}]",
                field("uuid"),
                title,
                field("filename"),
                verdict
            )
        })
        .collect()
}

pub async fn run_listener(config: Config) -> Result<()> {
    let session = MqttSession::connect(&config.bus, "listen").await?;
    session.subscribe(&config.topics.finished).await?;

    let shutdown = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let listen_config = config.clone();
    let (bus, transport) = session.spawn(shutdown, move |topic, payload| {
        println!("# {topic}");
        for line in describe_entries(payload, &listen_config) {
            println!("{line}");
        }
    });
    disconnect_on_interrupt(bus);

    tracing::info!("Listening on {}", config.topics.finished);
    transport.await.context("Transport task failed")?;
    Ok(())
}
