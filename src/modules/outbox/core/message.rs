// The persisted unit of work of the outbox: one pending event plus its delivery state.
//
// Responsibilities
// - Own the state transitions (processing, published, failed).
// - Own the eligibility rule so the repository query and the processor agree on it.
//
// Invariants
// - published_at is set at most once; a published message is terminal.
// - error_count only ever increases, a successful retry leaves it untouched.

use crate::modules::outbox::core::retry_policy::RetryPolicy;
use crate::modules::outbox::core::state::DeliveryState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OutboxMessageId(Uuid);

impl OutboxMessageId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for OutboxMessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OutboxMessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboxMessage {
    id: OutboxMessageId,
    created_at: DateTime<Utc>,
    message_type: String,
    payload: String,
    processing_at: Option<DateTime<Utc>>,
    published_at: Option<DateTime<Utc>>,
    failed_at: Option<DateTime<Utc>>,
    error_count: u32,
    error_message: Option<String>,
}

impl OutboxMessage {
    pub fn new(
        created_at: DateTime<Utc>,
        message_type: impl Into<String>,
        payload: impl Into<String>,
    ) -> Self {
        Self {
            id: OutboxMessageId::new(),
            created_at,
            message_type: message_type.into(),
            payload: payload.into(),
            processing_at: None,
            published_at: None,
            failed_at: None,
            error_count: 0,
            error_message: None,
        }
    }

    pub fn id(&self) -> OutboxMessageId {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn message_type(&self) -> &str {
        &self.message_type
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }

    pub fn processing_at(&self) -> Option<DateTime<Utc>> {
        self.processing_at
    }

    pub fn published_at(&self) -> Option<DateTime<Utc>> {
        self.published_at
    }

    pub fn failed_at(&self) -> Option<DateTime<Utc>> {
        self.failed_at
    }

    pub fn error_count(&self) -> u32 {
        self.error_count
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn is_published(&self) -> bool {
        self.published_at.is_some()
    }

    pub fn mark_processing(&mut self, now: DateTime<Utc>) {
        self.processing_at = Some(now);
    }

    pub fn mark_published(&mut self, now: DateTime<Utc>) {
        if self.published_at.is_none() {
            self.published_at = Some(now);
        }
    }

    /// No-op once published: a terminal message keeps its last recorded failure.
    pub fn mark_failed(&mut self, now: DateTime<Utc>, reason: impl Into<String>) {
        if self.published_at.is_some() {
            return;
        }
        self.failed_at = Some(now);
        self.error_count = self.error_count.saturating_add(1);
        self.error_message = Some(reason.into());
    }

    /// Whether a fresh delivery attempt may start at `now`.
    pub fn is_eligible(&self, now: DateTime<Utc>, policy: &RetryPolicy) -> bool {
        if self.published_at.is_some() || policy.is_exhausted(self.error_count) {
            return false;
        }
        let reclaimable = self
            .processing_at
            .is_none_or(|at| now - at >= policy.processing_reclaim_timeout);
        let backed_off = self
            .failed_at
            .is_none_or(|at| now - at >= policy.failure_backoff_timeout);
        reclaimable && backed_off
    }

    pub fn state(&self, policy: &RetryPolicy) -> DeliveryState {
        DeliveryState::of(self, policy)
    }
}
