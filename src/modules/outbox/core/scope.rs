// Unit-of-work boundary for outbox processing.
//
// Purpose
// - Bundle one repository, its persistence context and the publisher set.
// - A scope is created fresh per logical step and dropped afterwards; anything
//   staged but not saved is discarded with it.

use crate::modules::outbox::core::publisher::PublisherRegistry;
use crate::shared::infrastructure::outbox_store::{
    OutboxContext, OutboxRepository, OutboxStoreError,
};
use async_trait::async_trait;
use std::sync::Arc;

pub struct ScopedOutboxDependencies {
    pub repository: Arc<dyn OutboxRepository>,
    pub context: Arc<dyn OutboxContext>,
    pub publishers: Arc<PublisherRegistry>,
}

#[async_trait]
pub trait OutboxScopeFactory: Send + Sync {
    /// Fails only when the backing store cannot be reached.
    async fn create_scope(&self) -> Result<ScopedOutboxDependencies, OutboxStoreError>;
}
