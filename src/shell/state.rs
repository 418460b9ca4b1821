use crate::modules::outbox::adapters::outbound::in_memory_scope::InMemoryScopeFactory;
use crate::modules::outbox::core::publisher::PublisherRegistry;
use crate::modules::outbox::use_cases::enqueue_message::handler::OutboxClient;
use crate::modules::outbox::use_cases::process_outbox::processor::OutboxProcessor;
use crate::shared::core::primitives::Clock;
use crate::shared::infrastructure::outbox_store::in_memory::InMemoryOutboxStore;
use crate::shell::config::OutboxConfig;
use crate::shell::health::PassHealth;
use crate::shell::workers::OutboxScheduler;
use chrono::TimeDelta;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub scope_factory: Arc<InMemoryScopeFactory>,
    pub client: Arc<OutboxClient>,
    pub scheduler: Arc<OutboxScheduler<InMemoryScopeFactory>>,
    pub health: Arc<PassHealth>,
    pub clock: Arc<dyn Clock>,
    pub health_max_staleness: TimeDelta,
}

impl AppState {
    /// Wires the relay on top of the in memory outbox store.
    pub fn in_memory(
        config: &OutboxConfig,
        clock: Arc<dyn Clock>,
        publishers: PublisherRegistry,
    ) -> Self {
        let store = Arc::new(InMemoryOutboxStore::new(
            clock.clone(),
            config.retry_policy,
        ));
        let scope_factory = Arc::new(InMemoryScopeFactory::new(store, publishers));
        let processor = Arc::new(
            OutboxProcessor::new(scope_factory.clone(), clock.clone(), config.retry_policy)
                .with_concurrency(config.concurrency),
        );
        let health = Arc::new(PassHealth::new());
        let scheduler = Arc::new(OutboxScheduler::new(
            processor,
            health.clone(),
            clock.clone(),
            config.batch_limit,
            config.poll_interval,
        ));
        Self {
            scope_factory,
            client: Arc::new(OutboxClient::new(clock.clone())),
            scheduler,
            health,
            clock,
            health_max_staleness: config.health_max_staleness,
        }
    }
}
