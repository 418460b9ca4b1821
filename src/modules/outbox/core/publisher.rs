// Publisher capability: the pluggable transport that actually delivers a payload.
//
// Responsibilities
// - OutboxPublisher: claim message types and transmit payloads.
// - PublisherRegistry: an ordered, read-only set of publishers. The first
//   publisher claiming a type wins.

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

#[async_trait]
pub trait OutboxPublisher: Send + Sync {
    /// Pure predicate, no side effects.
    fn can_publish(&self, message_type: &str) -> bool;

    async fn publish(&self, payload: &str) -> anyhow::Result<()>;
}

#[derive(Clone, Default)]
pub struct PublisherRegistry {
    publishers: Vec<Arc<dyn OutboxPublisher>>,
}

impl PublisherRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, publisher: Arc<dyn OutboxPublisher>) -> Self {
        self.publishers.push(publisher);
        self
    }

    pub fn find(&self, message_type: &str) -> Option<&Arc<dyn OutboxPublisher>> {
        self.publishers.iter().find(|p| p.can_publish(message_type))
    }

    pub fn len(&self) -> usize {
        self.publishers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.publishers.is_empty()
    }
}

impl fmt::Debug for PublisherRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublisherRegistry")
            .field("publishers", &self.publishers.len())
            .finish()
    }
}
