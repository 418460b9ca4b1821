// Persistence ports for outbox messages.
//
// Purpose
// - OutboxRepository: query and stage changes to outbox rows inside one unit of work.
// - OutboxContext: commit the staged work of that unit of work.
//
// Boundaries
// - Staged work is only durable after OutboxContext::save_changes succeeds.
// - A repository and its context always come from the same scope.

use crate::modules::outbox::core::message::{OutboxMessage, OutboxMessageId};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OutboxStoreError {
    #[error("outbox message {id} not found")]
    NotFound { id: OutboxMessageId },

    #[error("outbox message {id} was changed by another unit of work")]
    Conflict { id: OutboxMessageId },

    #[error("outbox message {id} already exists")]
    Duplicate { id: OutboxMessageId },

    #[error("backend error: {0}")]
    Backend(String),
}

#[async_trait]
pub trait OutboxRepository: Send + Sync {
    /// Stage a new message. Committed together with the rest of the unit of work.
    async fn add(&self, message: OutboxMessage) -> Result<(), OutboxStoreError>;

    /// Ids of up to `limit` messages eligible for a delivery attempt right now,
    /// oldest first. Read only.
    async fn get_unprocessed_ids(
        &self,
        limit: usize,
    ) -> Result<Vec<OutboxMessageId>, OutboxStoreError>;

    async fn get(&self, id: OutboxMessageId) -> Result<OutboxMessage, OutboxStoreError>;

    /// Stage the new state of a message previously loaded through `get`.
    async fn update(&self, message: &OutboxMessage) -> Result<(), OutboxStoreError>;
}

#[async_trait]
pub trait OutboxContext: Send + Sync {
    /// Commit every staged change atomically. Returns the number of rows written.
    async fn save_changes(&self) -> Result<usize, OutboxStoreError>;
}

pub mod in_memory;
