// Shared message fixtures for processor and handler tests.

use crate::modules::outbox::core::message::OutboxMessage;
use chrono::{DateTime, TimeZone, Utc};

pub const MOCK_TYPE: &str = "mock-type";
pub const MOCK_PAYLOAD: &str = "mock-payload";

/// The instant every outbox scenario starts from.
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 9, 11, 13, 37, 0).unwrap()
}

pub fn make_mock_message(created_at: DateTime<Utc>) -> OutboxMessage {
    OutboxMessage::new(created_at, MOCK_TYPE, MOCK_PAYLOAD)
}
