// Concrete outbox publishers.
//
// - TracingPublisher: log sink transport, emits each payload as a structured event.
// - ChannelPublisher: forwards (type, payload) to an in-process consumer over mpsc.
//
// Both claim an explicit set of message types.

use crate::modules::outbox::core::publisher::OutboxPublisher;
use anyhow::{Context, anyhow};
use async_trait::async_trait;
use std::collections::HashSet;
use tokio::sync::mpsc;
use tracing::info;

pub struct TracingPublisher {
    message_types: HashSet<String>,
}

impl TracingPublisher {
    pub fn new<I, S>(message_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            message_types: message_types.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl OutboxPublisher for TracingPublisher {
    fn can_publish(&self, message_type: &str) -> bool {
        self.message_types.contains(message_type)
    }

    async fn publish(&self, payload: &str) -> anyhow::Result<()> {
        info!(target: "outbox_relay::published", payload, "Outbox payload published");
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivered {
    pub message_type: String,
    pub payload: String,
}

/// Forwards every payload to a channel. One instance serves exactly one message type so the
/// receiver always knows what it got.
pub struct ChannelPublisher {
    message_type: String,
    sender: mpsc::Sender<Delivered>,
}

impl ChannelPublisher {
    pub fn new(message_type: impl Into<String>, sender: mpsc::Sender<Delivered>) -> Self {
        Self {
            message_type: message_type.into(),
            sender,
        }
    }

    /// Bounded channel of `capacity` payloads. A capacity of 0 is raised to 1.
    pub fn channel(
        message_type: impl Into<String>,
        capacity: usize,
    ) -> (Self, mpsc::Receiver<Delivered>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self::new(message_type, sender), receiver)
    }
}

#[async_trait]
impl OutboxPublisher for ChannelPublisher {
    fn can_publish(&self, message_type: &str) -> bool {
        self.message_type == message_type
    }

    async fn publish(&self, payload: &str) -> anyhow::Result<()> {
        if self.sender.is_closed() {
            return Err(anyhow!("receiver for {} is gone", self.message_type));
        }
        self.sender
            .send(Delivered {
                message_type: self.message_type.clone(),
                payload: payload.to_string(),
            })
            .await
            .with_context(|| format!("failed to forward {} payload", self.message_type))
    }
}
