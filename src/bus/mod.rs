//! Publish/subscribe transport.
//!
//! The pipeline only ever publishes through [`MessageBus`]; subscribing and
//! the network event loop live in [`mqtt`], which is wired up by the binary.

pub mod mqtt;

use async_trait::async_trait;
use std::time::Duration;

/// Errors surfaced when handing a message to the broker.
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    #[error("broker client rejected the request: {0}")]
    Client(String),

    #[error("no acknowledgement from the broker within {0:?}")]
    AckTimeout(Duration),

    #[error("connection to the broker is gone")]
    Disconnected,
}

/// Outbound side of the transport.
#[async_trait]
pub trait MessageBus: Send + Sync {
    /// Publish at least once and wait until the broker has acknowledged it.
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), BusError>;
}

/// Subscription filter for `topic`, optionally through a shared group.
///
/// With a group every message reaches exactly one member of the group.
pub fn subscription_filter(topic: &str, share_group: Option<&str>) -> String {
    match share_group {
        Some(group) if !group.is_empty() => format!("$share/{group}/{topic}"),
        _ => topic.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscription_filter() {
        assert_eq!(subscription_filter("rkmppenc", None), "rkmppenc");
        assert_eq!(
            subscription_filter("rkmppenc", Some("encoders")),
            "$share/encoders/rkmppenc"
        );
        assert_eq!(subscription_filter("rkmppenc", Some("")), "rkmppenc");
    }
}
