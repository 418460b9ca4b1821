// Outbox client: records outgoing messages inside the caller's unit of work.
//
// Responsibilities
// - Turn an OutgoingMessage into a pending OutboxMessage stamped with the clock.
// - Stage it on the caller's repository. The caller's save_changes commits it
//   together with the business changes of the same transaction.

use crate::modules::outbox::core::message::{OutboxMessage, OutboxMessageId};
use crate::modules::outbox::use_cases::enqueue_message::outgoing_message::{
    OutgoingMessage, OutgoingMessageError,
};
use crate::shared::core::primitives::Clock;
use crate::shared::infrastructure::outbox_store::{OutboxRepository, OutboxStoreError};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum OutboxClientError {
    #[error(transparent)]
    Payload(#[from] OutgoingMessageError),

    #[error(transparent)]
    Store(#[from] OutboxStoreError),
}

pub struct OutboxClient {
    clock: Arc<dyn Clock>,
}

impl OutboxClient {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    pub async fn add_to_outbox(
        &self,
        repository: &dyn OutboxRepository,
        message: &impl OutgoingMessage,
    ) -> Result<OutboxMessageId, OutboxClientError> {
        let payload = message.serialize_payload()?;
        let outbox_message = OutboxMessage::new(self.clock.now(), message.message_type(), payload);
        let id = outbox_message.id();
        repository.add(outbox_message).await?;
        debug!(message_id = %id, message_type = message.message_type(), "Outbox message staged");
        Ok(id)
    }
}
