// Test publisher that records every call and can be told to fail or hang.

use crate::modules::outbox::core::publisher::OutboxPublisher;
use anyhow::bail;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Default)]
pub struct RecordingPublisher {
    claims: HashSet<String>,
    failing_payloads: Mutex<HashSet<String>>,
    fail_all: AtomicBool,
    hang: AtomicBool,
    can_publish_calls: Mutex<Vec<String>>,
    publish_calls: Mutex<Vec<String>>,
}

impl RecordingPublisher {
    pub fn claiming(message_type: &str) -> Self {
        Self {
            claims: HashSet::from([message_type.to_string()]),
            ..Self::default()
        }
    }

    pub fn fail_on_payload(&self, payload: &str) {
        self.failing_payloads
            .lock()
            .unwrap()
            .insert(payload.to_string());
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail_all.store(failing, Ordering::SeqCst);
    }

    pub fn set_hanging(&self, hang: bool) {
        self.hang.store(hang, Ordering::SeqCst);
    }

    pub fn can_publish_calls(&self) -> Vec<String> {
        self.can_publish_calls.lock().unwrap().clone()
    }

    pub fn publish_calls(&self) -> Vec<String> {
        self.publish_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl OutboxPublisher for RecordingPublisher {
    fn can_publish(&self, message_type: &str) -> bool {
        self.can_publish_calls
            .lock()
            .unwrap()
            .push(message_type.to_string());
        self.claims.contains(message_type)
    }

    async fn publish(&self, payload: &str) -> anyhow::Result<()> {
        self.publish_calls.lock().unwrap().push(payload.to_string());
        if self.hang.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.fail_all.load(Ordering::SeqCst)
            || self.failing_payloads.lock().unwrap().contains(payload)
        {
            bail!("Publishing failed");
        }
        Ok(())
    }
}
