// Background worker that drives the outbox processor.
//
// Responsibilities
// - Run one pass immediately and then every poll interval until cancelled.
// - Record every successful pass in PassHealth.
// - Log a failed pass and keep going; the next tick retries.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::modules::outbox::core::scope::OutboxScopeFactory;
use crate::modules::outbox::use_cases::process_outbox::processor::{
    OutboxProcessor, PassSummary, ProcessError,
};
use crate::shared::core::primitives::Clock;
use crate::shell::health::PassHealth;

pub struct OutboxScheduler<TScopeFactory>
where
    TScopeFactory: OutboxScopeFactory,
{
    processor: Arc<OutboxProcessor<TScopeFactory>>,
    health: Arc<PassHealth>,
    clock: Arc<dyn Clock>,
    batch_limit: usize,
    poll_interval: Duration,
}

impl<TScopeFactory> OutboxScheduler<TScopeFactory>
where
    TScopeFactory: OutboxScopeFactory + 'static,
{
    pub fn new(
        processor: Arc<OutboxProcessor<TScopeFactory>>,
        health: Arc<PassHealth>,
        clock: Arc<dyn Clock>,
        batch_limit: usize,
        poll_interval: Duration,
    ) -> Self {
        Self {
            processor,
            health,
            clock,
            batch_limit,
            poll_interval,
        }
    }

    pub fn health(&self) -> &Arc<PassHealth> {
        &self.health
    }

    /// One pass over the outbox. Shared by the poll loop and the manual trigger.
    pub async fn run_pass(
        &self,
        cancellation: &CancellationToken,
    ) -> Result<PassSummary, ProcessError> {
        match self
            .processor
            .process_outbox(self.batch_limit, cancellation)
            .await
        {
            Ok(summary) => {
                self.health.record_success(self.clock.now()).await;
                Ok(summary)
            }
            Err(err) => {
                error!(error = %err, "Outbox pass failed");
                Err(err)
            }
        }
    }

    pub async fn run(self: Arc<Self>, cancellation: CancellationToken) {
        info!(poll_interval = ?self.poll_interval, batch_limit = self.batch_limit, "Outbox scheduler started");
        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                biased;
                _ = cancellation.cancelled() => break,
                _ = interval.tick() => {
                    let _ = self.run_pass(&cancellation).await;
                }
            }
        }
        info!("Outbox scheduler stopped");
    }

    pub fn spawn(self: Arc<Self>, cancellation: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(cancellation))
    }
}

#[cfg(test)]
mod outbox_scheduler_tests {
    use super::*;
    use crate::modules::outbox::adapters::outbound::in_memory_scope::InMemoryScopeFactory;
    use crate::modules::outbox::core::publisher::PublisherRegistry;
    use crate::modules::outbox::core::retry_policy::RetryPolicy;
    use crate::shared::core::primitives::ManualClock;
    use crate::shared::infrastructure::outbox_store::in_memory::InMemoryOutboxStore;
    use crate::tests::fixtures::logs::capture_logs;
    use crate::tests::fixtures::messages::{MOCK_TYPE, fixed_now, make_mock_message};
    use crate::tests::fixtures::publishers::RecordingPublisher;
    use rstest::{fixture, rstest};

    type BeforeEachReturn = (
        Arc<InMemoryOutboxStore>,
        Arc<RecordingPublisher>,
        Arc<OutboxScheduler<InMemoryScopeFactory>>,
    );

    #[fixture]
    fn before_each() -> BeforeEachReturn {
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(fixed_now()));
        let store = Arc::new(InMemoryOutboxStore::new(clock.clone(), RetryPolicy::default()));
        let publisher = Arc::new(RecordingPublisher::claiming(MOCK_TYPE));
        let factory = Arc::new(InMemoryScopeFactory::new(
            store.clone(),
            PublisherRegistry::new().with(publisher.clone()),
        ));
        let processor = Arc::new(OutboxProcessor::new(
            factory,
            clock.clone(),
            RetryPolicy::default(),
        ));
        let scheduler = Arc::new(OutboxScheduler::new(
            processor,
            Arc::new(PassHealth::new()),
            clock,
            100,
            Duration::from_millis(10),
        ));
        (store, publisher, scheduler)
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_record_health_after_a_successful_pass(before_each: BeforeEachReturn) {
        let (store, publisher, scheduler) = before_each;
        let message = make_mock_message(fixed_now());
        store.insert(message.clone()).await;

        let summary = scheduler.run_pass(&CancellationToken::new()).await.unwrap();

        assert_eq!(summary.published, 1);
        assert_eq!(publisher.publish_calls(), vec![message.payload().to_string()]);
        assert_eq!(scheduler.health().last_success().await, Some(fixed_now()));
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_leave_health_untouched_when_the_pass_fails(before_each: BeforeEachReturn) {
        let (store, _, scheduler) = before_each;
        let (logs, _guard) = capture_logs();
        store.toggle_offline();

        let result = scheduler.run_pass(&CancellationToken::new()).await;

        assert!(result.is_err());
        assert_eq!(scheduler.health().last_success().await, None);
        assert!(
            logs.lines_at("ERROR")
                .iter()
                .any(|line| line.contains("Outbox pass failed"))
        );
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_poll_until_cancelled(before_each: BeforeEachReturn) {
        let (store, publisher, scheduler) = before_each;
        store.insert(make_mock_message(fixed_now())).await;
        let cancellation = CancellationToken::new();

        let handle = scheduler.clone().spawn(cancellation.clone());
        tokio::time::timeout(Duration::from_secs(5), async {
            while publisher.publish_calls().is_empty() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
        cancellation.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(publisher.publish_calls().len(), 1);
        assert!(scheduler.health().last_success().await.is_some());
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_stop_immediately_when_already_cancelled(before_each: BeforeEachReturn) {
        let (store, publisher, scheduler) = before_each;
        store.insert(make_mock_message(fixed_now())).await;
        let cancellation = CancellationToken::new();
        cancellation.cancel();

        scheduler.clone().run(cancellation).await;

        assert!(publisher.publish_calls().is_empty());
        assert_eq!(scheduler.health().last_success().await, None);
    }
}
