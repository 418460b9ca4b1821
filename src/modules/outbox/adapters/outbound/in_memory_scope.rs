// Scope factory backed by the in memory outbox store.
//
// Every scope gets its own InMemoryOutboxSession, which serves as both the
// repository and the persistence context of that scope.

use crate::modules::outbox::core::publisher::PublisherRegistry;
use crate::modules::outbox::core::scope::{OutboxScopeFactory, ScopedOutboxDependencies};
use crate::shared::infrastructure::outbox_store::OutboxStoreError;
use crate::shared::infrastructure::outbox_store::in_memory::InMemoryOutboxStore;
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

pub struct InMemoryScopeFactory {
    store: Arc<InMemoryOutboxStore>,
    publishers: Arc<PublisherRegistry>,
    scopes_created: AtomicUsize,
}

impl InMemoryScopeFactory {
    pub fn new(store: Arc<InMemoryOutboxStore>, publishers: PublisherRegistry) -> Self {
        Self {
            store,
            publishers: Arc::new(publishers),
            scopes_created: AtomicUsize::new(0),
        }
    }

    pub fn store(&self) -> &Arc<InMemoryOutboxStore> {
        &self.store
    }

    pub fn scopes_created(&self) -> usize {
        self.scopes_created.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OutboxScopeFactory for InMemoryScopeFactory {
    async fn create_scope(&self) -> Result<ScopedOutboxDependencies, OutboxStoreError> {
        if self.store.is_offline() {
            return Err(OutboxStoreError::Backend("Outbox store offline".into()));
        }
        self.scopes_created.fetch_add(1, Ordering::SeqCst);
        let session = Arc::new(self.store.session());
        Ok(ScopedOutboxDependencies {
            repository: session.clone(),
            context: session,
            publishers: self.publishers.clone(),
        })
    }
}

#[cfg(test)]
mod in_memory_scope_factory_tests {
    use super::*;
    use crate::modules::outbox::core::message::OutboxMessage;
    use crate::modules::outbox::core::retry_policy::RetryPolicy;
    use crate::shared::core::primitives::SystemClock;
    use chrono::Utc;
    use rstest::{fixture, rstest};

    #[fixture]
    fn factory() -> InMemoryScopeFactory {
        let store = Arc::new(InMemoryOutboxStore::new(
            Arc::new(SystemClock),
            RetryPolicy::default(),
        ));
        InMemoryScopeFactory::new(store, PublisherRegistry::new())
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_isolate_staged_work_between_scopes(factory: InMemoryScopeFactory) {
        let message = OutboxMessage::new(Utc::now(), "type", "data");
        let id = message.id();

        let first = factory.create_scope().await.unwrap();
        let second = factory.create_scope().await.unwrap();
        first.repository.add(message).await.unwrap();

        assert_eq!(second.context.save_changes().await.unwrap(), 0);
        assert!(factory.store().snapshot(id).await.is_none());
        assert_eq!(first.context.save_changes().await.unwrap(), 1);
        assert!(factory.store().snapshot(id).await.is_some());
        assert_eq!(factory.scopes_created(), 2);
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_fail_to_open_a_scope_when_the_store_is_offline(
        factory: InMemoryScopeFactory,
    ) {
        factory.store().toggle_offline();
        let result = factory.create_scope().await;
        assert!(matches!(result, Err(OutboxStoreError::Backend(_))));
        assert_eq!(factory.scopes_created(), 0);
    }
}
