// Outbox processor: runs one pass over the eligible outbox messages.
//
// Flow of a pass
// - An outer scope lists the eligible ids (bounded by `limit`).
// - Every id is handled in its own scope: load, mark processing and commit,
//   pick the publisher, publish, mark published and commit.
// - A failure is recorded on the message in a fresh scope and logged. It never
//   aborts the pass; only failing to list the ids does.
//
// Delivery is at least once: a crash between publishing and committing the
// published mark leads to a second publish after the reclaim timeout.

use crate::modules::outbox::core::message::OutboxMessageId;
use crate::modules::outbox::core::retry_policy::RetryPolicy;
use crate::modules::outbox::core::scope::OutboxScopeFactory;
use crate::shared::core::primitives::Clock;
use crate::shared::infrastructure::outbox_store::OutboxStoreError;
use futures::StreamExt;
use futures::stream;
use serde::Serialize;
use std::num::NonZeroUsize;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

pub const DEFAULT_BATCH_LIMIT: usize = 1000;

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("failed to list outbox messages: {0}")]
    Store(#[from] OutboxStoreError),
}

/// Why a single message attempt failed. Always recorded on the message, never
/// propagated out of a pass.
#[derive(Debug, Error)]
pub enum MessageError {
    #[error("no publisher found for outbox message type {message_type} and id {id}")]
    NoPublisher {
        id: OutboxMessageId,
        message_type: String,
    },

    #[error("failed to publish outbox message {id} of type {message_type}: {cause:#}")]
    Publish {
        id: OutboxMessageId,
        message_type: String,
        cause: anyhow::Error,
    },

    #[error("outbox store failed for message {id}: {source}")]
    Store {
        id: OutboxMessageId,
        message_type: Option<String>,
        source: OutboxStoreError,
    },
}

impl MessageError {
    pub fn message_type(&self) -> Option<&str> {
        match self {
            MessageError::NoPublisher { message_type, .. }
            | MessageError::Publish { message_type, .. } => Some(message_type),
            MessageError::Store { message_type, .. } => message_type.as_deref(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageOutcome {
    Published,
    /// Nothing was attempted: the message vanished, was no longer eligible,
    /// or another processor got to it first.
    Skipped,
    /// Cancelled before or during publishing. Left for the reclaim timeout.
    Interrupted,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PassSummary {
    pub listed: usize,
    pub published: usize,
    pub failed: usize,
    pub skipped: usize,
    pub interrupted: usize,
}

fn store_failure(
    id: OutboxMessageId,
    message_type: Option<&str>,
) -> impl FnOnce(OutboxStoreError) -> MessageError + use<> {
    let message_type = message_type.map(str::to_owned);
    move |source| MessageError::Store {
        id,
        message_type,
        source,
    }
}

enum Attempt {
    Done(MessageOutcome),
    Failed,
}

pub struct OutboxProcessor<TScopeFactory>
where
    TScopeFactory: OutboxScopeFactory,
{
    scope_factory: Arc<TScopeFactory>,
    clock: Arc<dyn Clock>,
    policy: RetryPolicy,
    concurrency: NonZeroUsize,
}

impl<TScopeFactory> OutboxProcessor<TScopeFactory>
where
    TScopeFactory: OutboxScopeFactory,
{
    pub fn new(scope_factory: Arc<TScopeFactory>, clock: Arc<dyn Clock>, policy: RetryPolicy) -> Self {
        Self {
            scope_factory,
            clock,
            policy,
            concurrency: NonZeroUsize::MIN,
        }
    }

    /// Attempt up to `concurrency` messages at once. Each keeps its own scope.
    pub fn with_concurrency(mut self, concurrency: NonZeroUsize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub async fn process_outbox(
        &self,
        limit: usize,
        cancellation: &CancellationToken,
    ) -> Result<PassSummary, ProcessError> {
        let ids = {
            let outer = self.scope_factory.create_scope().await?;
            outer.repository.get_unprocessed_ids(limit).await?
        };

        let mut summary = PassSummary {
            listed: ids.len(),
            ..PassSummary::default()
        };
        if ids.is_empty() {
            return Ok(summary);
        }
        info!(outbox_message_count = ids.len(), "Processing outbox messages");

        let attempts: Vec<Attempt> = stream::iter(ids)
            .map(|id| self.attempt(id, cancellation))
            .buffer_unordered(self.concurrency.get())
            .collect()
            .await;

        for attempt in attempts {
            match attempt {
                Attempt::Done(MessageOutcome::Published) => summary.published += 1,
                Attempt::Done(MessageOutcome::Skipped) => summary.skipped += 1,
                Attempt::Done(MessageOutcome::Interrupted) => summary.interrupted += 1,
                Attempt::Failed => summary.failed += 1,
            }
        }
        debug!(?summary, "Outbox pass finished");
        Ok(summary)
    }

    /// Process one message in its own scope. The caller decides what to do with a failure;
    /// `process_outbox` records it on the message.
    pub async fn process_message(
        &self,
        id: OutboxMessageId,
        cancellation: &CancellationToken,
    ) -> Result<MessageOutcome, MessageError> {
        let scope = self
            .scope_factory
            .create_scope()
            .await
            .map_err(store_failure(id, None))?;

        let mut message = match scope.repository.get(id).await {
            Ok(message) => message,
            Err(OutboxStoreError::NotFound { .. }) => {
                warn!(message_id = %id, "Outbox message no longer exists, skipping");
                return Ok(MessageOutcome::Skipped);
            }
            Err(err) => return Err(store_failure(id, None)(err)),
        };
        let message_type = message.message_type().to_owned();

        if !message.is_eligible(self.clock.now(), &self.policy) {
            debug!(message_id = %id, "Outbox message is not eligible anymore, skipping");
            return Ok(MessageOutcome::Skipped);
        }

        message.mark_processing(self.clock.now());
        scope
            .repository
            .update(&message)
            .await
            .map_err(store_failure(id, Some(&message_type)))?;
        match scope.context.save_changes().await {
            Ok(_) => {}
            Err(OutboxStoreError::Conflict { .. }) => {
                warn!(
                    message_id = %id,
                    message_type = %message_type,
                    "Outbox message processing was already started"
                );
                return Ok(MessageOutcome::Skipped);
            }
            Err(err) => return Err(store_failure(id, Some(&message_type))(err)),
        }

        let publisher = scope
            .publishers
            .find(&message_type)
            .ok_or_else(|| MessageError::NoPublisher {
                id,
                message_type: message_type.clone(),
            })?;

        let published = tokio::select! {
            biased;
            _ = cancellation.cancelled() => None,
            result = publisher.publish(message.payload()) => Some(result),
        };
        match published {
            None => {
                warn!(
                    message_id = %id,
                    message_type = %message_type,
                    "Publishing cancelled, outbox message left for reclaim"
                );
                return Ok(MessageOutcome::Interrupted);
            }
            Some(Err(cause)) => {
                return Err(MessageError::Publish {
                    id,
                    message_type,
                    cause,
                });
            }
            Some(Ok(())) => {}
        }

        // Saved regardless of cancellation: the payload is already out.
        message.mark_published(self.clock.now());
        scope
            .repository
            .update(&message)
            .await
            .map_err(store_failure(id, Some(&message_type)))?;
        scope
            .context
            .save_changes()
            .await
            .map_err(store_failure(id, Some(&message_type)))?;

        debug!(message_id = %id, message_type = %message_type, "Outbox message published");
        Ok(MessageOutcome::Published)
    }

    async fn attempt(&self, id: OutboxMessageId, cancellation: &CancellationToken) -> Attempt {
        if cancellation.is_cancelled() {
            return Attempt::Done(MessageOutcome::Interrupted);
        }
        match self.process_message(id, cancellation).await {
            Ok(outcome) => Attempt::Done(outcome),
            Err(err) => {
                error!(
                    message_id = %id,
                    message_type = err.message_type(),
                    error = %err,
                    "Failed to process outbox message"
                );
                self.record_failure(id, &err).await;
                Attempt::Failed
            }
        }
    }

    /// Uses a fresh scope: the scope that failed may hold changes that can no longer commit.
    async fn record_failure(&self, id: OutboxMessageId, failure: &MessageError) {
        let recorded = async {
            let scope = self.scope_factory.create_scope().await?;
            let mut message = scope.repository.get(id).await?;
            if message.is_published() {
                return Ok::<_, OutboxStoreError>(None);
            }
            message.mark_failed(self.clock.now(), failure.to_string());
            scope.repository.update(&message).await?;
            scope.context.save_changes().await?;
            Ok(Some(message))
        }
        .await;

        match recorded {
            Ok(None) => {
                warn!(message_id = %id, "Outbox message was published elsewhere, failure not recorded");
            }
            Ok(Some(message)) if self.policy.is_exhausted(message.error_count()) => {
                warn!(
                    message_id = %id,
                    message_type = %message.message_type(),
                    error_count = message.error_count(),
                    "Outbox message reached the retry ceiling and is dead-lettered"
                );
            }
            Ok(Some(_)) => {}
            Err(OutboxStoreError::NotFound { .. }) => {
                warn!(message_id = %id, "Outbox message vanished before its failure was recorded");
            }
            Err(err) => {
                error!(message_id = %id, error = %err, "Failed to record outbox message failure");
            }
        }
    }
}
