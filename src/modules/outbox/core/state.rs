use crate::modules::outbox::core::message::OutboxMessage;
use crate::modules::outbox::core::retry_policy::RetryPolicy;
use serde::Serialize;

/// Delivery state derived from a message's timestamps. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryState {
    Pending,
    Processing,
    Failed,
    Published,
    DeadLettered,
}

impl DeliveryState {
    pub fn of(message: &OutboxMessage, policy: &RetryPolicy) -> Self {
        if message.published_at().is_some() {
            return DeliveryState::Published;
        }
        if policy.is_exhausted(message.error_count()) {
            return DeliveryState::DeadLettered;
        }
        // The most recent of the two timestamps tells which attempt outcome is current.
        match (message.processing_at(), message.failed_at()) {
            (None, None) => DeliveryState::Pending,
            (Some(_), None) => DeliveryState::Processing,
            (None, Some(_)) => DeliveryState::Failed,
            (Some(processing), Some(failed)) if processing > failed => DeliveryState::Processing,
            (Some(_), Some(_)) => DeliveryState::Failed,
        }
    }
}

#[cfg(test)]
mod delivery_state_tests {
    use super::*;
    use chrono::{DateTime, TimeDelta, TimeZone, Utc};
    use rstest::{fixture, rstest};

    #[fixture]
    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 9, 11, 13, 37, 0).unwrap()
    }

    #[rstest]
    fn it_should_walk_the_lifecycle(now: DateTime<Utc>) {
        let policy = RetryPolicy::default();
        let mut message = OutboxMessage::new(now, "t", "p");
        assert_eq!(message.state(&policy), DeliveryState::Pending);

        message.mark_processing(now);
        assert_eq!(message.state(&policy), DeliveryState::Processing);

        message.mark_failed(now + TimeDelta::seconds(1), "boom");
        assert_eq!(message.state(&policy), DeliveryState::Failed);

        message.mark_processing(now + TimeDelta::minutes(2));
        assert_eq!(message.state(&policy), DeliveryState::Processing);

        message.mark_published(now + TimeDelta::minutes(2));
        assert_eq!(message.state(&policy), DeliveryState::Published);
    }

    #[rstest]
    fn it_should_report_dead_lettered_messages(now: DateTime<Utc>) {
        let policy = RetryPolicy::default().with_max_attempts(Some(1));
        let mut message = OutboxMessage::new(now, "t", "p");
        message.mark_processing(now);
        message.mark_failed(now, "boom");
        assert_eq!(message.state(&policy), DeliveryState::DeadLettered);
    }
}
