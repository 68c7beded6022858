//! MQTT transport built on `rumqttc`.
//!
//! A session is connected up front so that authentication problems fail
//! startup. Afterwards a single transport task owns the event loop: it
//! forwards incoming publishes to a callback, reports the packet id of every
//! outgoing publish and every PUBACK back to [`MqttBus`], and raises the
//! shutdown signal when the connection goes away. There is no reconnect.

use super::{BusError, MessageBus};
use crate::config::BusConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use rumqttc::{
    AsyncClient, ConnectReturnCode, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS,
    TlsConfiguration, Transport,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

/// Requests buffered between the client handle and the event loop.
const REQUEST_CAPACITY: usize = 16;

/// Upper bound on waiting for the broker's CONNACK.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Ack timeout for sessions that never publish.
const DEFAULT_ACK_TIMEOUT: Duration = Duration::from_secs(5);

/// Build client options from configuration.
///
/// TLS material is read here; a missing file is a startup error.
pub fn mqtt_options(config: &BusConfig, role: &str) -> Result<MqttOptions> {
    let client_id = config
        .client_id
        .clone()
        .unwrap_or_else(|| format!("dvrflow-{role}-{}", uuid::Uuid::new_v4().simple()));

    let mut options = MqttOptions::new(client_id, config.host.clone(), config.port);
    options.set_keep_alive(Duration::from_secs(config.keep_alive_secs.max(5)));
    options.set_clean_session(!config.persistent_session);

    if config.tls.enabled {
        let tls = &config.tls;
        let ca = std::fs::read(&tls.ca_file)
            .with_context(|| format!("Failed to read CA certificate {:?}", tls.ca_file))?;
        let client_auth = match (&tls.cert_file, &tls.key_file) {
            (Some(cert), Some(key)) => {
                let cert = std::fs::read(cert)
                    .with_context(|| format!("Failed to read client certificate {:?}", cert))?;
                let key = std::fs::read(key)
                    .with_context(|| format!("Failed to read client key {:?}", key))?;
                Some((cert, key))
            }
            _ => None,
        };
        options.set_transport(Transport::Tls(TlsConfiguration::Simple {
            ca,
            alpn: None,
            client_auth,
        }));
    }

    Ok(options)
}

/// Packet-id events reported by the transport task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AckEvent {
    /// A publish left the client with this packet id.
    Sent(u16),
    /// The broker acknowledged this packet id.
    Acked(u16),
}

/// Pairs each publish with the PUBACK carrying its own packet id.
///
/// Publishes leave the event loop in the order they were requested, so the
/// n-th `Sent` after a request belongs to it once the `Sent` events of
/// earlier, timed-out requests are accounted for.
#[derive(Debug)]
struct AckTracker {
    events: mpsc::UnboundedReceiver<AckEvent>,
    /// Requests handed to the client whose `Sent` has not been seen yet.
    unsent: usize,
}

impl AckTracker {
    fn new(events: mpsc::UnboundedReceiver<AckEvent>) -> Self {
        Self { events, unsent: 0 }
    }

    /// Consume everything left over from publishes that already gave up.
    fn drain(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            match event {
                AckEvent::Sent(_) => self.unsent = self.unsent.saturating_sub(1),
                AckEvent::Acked(pkid) => {
                    tracing::debug!(pkid, "Discarding late acknowledgement");
                }
            }
        }
    }

    /// Wait for the acknowledgement of the most recent request.
    ///
    /// Cancel safe: a timeout keeps `unsent` accurate for the next caller.
    async fn await_ack(&mut self) -> Result<u16, BusError> {
        let mut pending = None;
        loop {
            match self.events.recv().await {
                None => return Err(BusError::Disconnected),
                Some(AckEvent::Sent(pkid)) => {
                    self.unsent = self.unsent.saturating_sub(1);
                    if self.unsent == 0 {
                        pending = Some(pkid);
                    }
                }
                Some(AckEvent::Acked(pkid)) if pending == Some(pkid) => return Ok(pkid),
                Some(AckEvent::Acked(pkid)) => {
                    tracing::debug!(pkid, "Discarding acknowledgement of an earlier publish");
                }
            }
        }
    }
}

/// Publishing handle. Publishes are serialized; each one waits for the
/// PUBACK matching its packet id.
pub struct MqttBus {
    client: AsyncClient,
    acks: Mutex<AckTracker>,
    ack_timeout: Duration,
}

#[async_trait]
impl MessageBus for MqttBus {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), BusError> {
        let mut acks = self.acks.lock().await;
        acks.drain();

        self.client
            .publish(topic, QoS::AtLeastOnce, false, payload)
            .await
            .map_err(|e| BusError::Client(e.to_string()))?;
        acks.unsent += 1;

        match tokio::time::timeout(self.ack_timeout, acks.await_ack()).await {
            Ok(Ok(pkid)) => {
                tracing::debug!(pkid, topic, "Publish acknowledged");
                Ok(())
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(BusError::AckTimeout(self.ack_timeout)),
        }
    }
}

impl MqttBus {
    /// Politely leave the broker.
    pub async fn disconnect(&self) {
        if let Err(e) = self.client.disconnect().await {
            tracing::debug!("Disconnect request failed: {}", e);
        }
    }
}

/// A connected session whose event loop has not been handed off yet.
pub struct MqttSession {
    client: AsyncClient,
    event_loop: EventLoop,
    ack_timeout: Duration,
}

impl MqttSession {
    /// Connect and wait for the broker to accept the session.
    pub async fn connect(config: &BusConfig, role: &str) -> Result<Self> {
        let options = mqtt_options(config, role)?;
        tracing::info!(
            host = %config.host,
            port = config.port,
            client_id = %options.client_id(),
            "Connecting to broker"
        );
        let (client, mut event_loop) = AsyncClient::new(options, REQUEST_CAPACITY);

        let wait_connack = async {
            loop {
                match event_loop.poll().await {
                    Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                        if ack.code == ConnectReturnCode::Success {
                            return Ok(());
                        }
                        anyhow::bail!("Broker refused connection: {:?}", ack.code);
                    }
                    Ok(_) => {}
                    Err(e) => return Err(anyhow::Error::new(e).context("Failed to connect to broker")),
                }
            }
        };
        tokio::time::timeout(CONNECT_TIMEOUT, wait_connack)
            .await
            .context("Timed out waiting for the broker")??;

        tracing::info!("Connected to {}:{}", config.host, config.port);

        Ok(Self {
            client,
            event_loop,
            ack_timeout: DEFAULT_ACK_TIMEOUT,
        })
    }

    /// How long a publish waits for its PUBACK.
    pub fn with_ack_timeout(mut self, ack_timeout: Duration) -> Self {
        self.ack_timeout = ack_timeout;
        self
    }

    /// Queue a QoS 1 subscription. It is sent once the transport task runs.
    pub async fn subscribe(&self, filter: &str) -> Result<()> {
        self.client
            .subscribe(filter, QoS::AtLeastOnce)
            .await
            .with_context(|| format!("Failed to subscribe to {filter}"))?;
        tracing::info!(filter, "Subscribed");
        Ok(())
    }

    /// Hand the event loop to a transport task.
    ///
    /// `on_message` runs on the transport task for every incoming publish
    /// and must not block. When the connection ends `shutdown` is set and
    /// the callback (with everything it owns) is dropped.
    pub fn spawn<F>(self, shutdown: Arc<AtomicBool>, on_message: F) -> (Arc<MqttBus>, JoinHandle<()>)
    where
        F: FnMut(&str, &[u8]) + Send + 'static,
    {
        let (ack_tx, ack_rx) = mpsc::unbounded_channel();
        let bus = Arc::new(MqttBus {
            client: self.client,
            acks: Mutex::new(AckTracker::new(ack_rx)),
            ack_timeout: self.ack_timeout,
        });
        let handle = tokio::spawn(run_transport(self.event_loop, ack_tx, shutdown, on_message));
        (bus, handle)
    }
}

async fn run_transport<F>(
    mut event_loop: EventLoop,
    acks: mpsc::UnboundedSender<AckEvent>,
    shutdown: Arc<AtomicBool>,
    mut on_message: F,
) where
    F: FnMut(&str, &[u8]) + Send + 'static,
{
    tracing::debug!("Transport task started");

    loop {
        match event_loop.poll().await {
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                tracing::debug!(
                    topic = %publish.topic,
                    bytes = publish.payload.len(),
                    "Message received"
                );
                on_message(&publish.topic, &publish.payload);
            }
            Ok(Event::Outgoing(Outgoing::Publish(pkid))) => {
                let _ = acks.send(AckEvent::Sent(pkid));
            }
            Ok(Event::Incoming(Packet::PubAck(ack))) => {
                let _ = acks.send(AckEvent::Acked(ack.pkid));
            }
            Ok(Event::Incoming(Packet::SubAck(ack))) => {
                tracing::debug!(pkid = ack.pkid, "Subscription acknowledged: {:?}", ack.return_codes);
            }
            Ok(Event::Incoming(Packet::Disconnect)) => {
                tracing::warn!("Broker closed the session");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                tracing::error!("Connection lost: {}", e);
                break;
            }
        }
    }

    shutdown.store(true, Ordering::SeqCst);
    tracing::info!("Transport task stopped; finishing queued work");
}
