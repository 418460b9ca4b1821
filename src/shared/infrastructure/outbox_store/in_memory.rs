// In memory implementation of the outbox persistence ports.
//
// Purpose
// - Support processor tests and local development without a database.
//
// Responsibilities
// - Store rows with a version number and enforce optimistic concurrency on commit.
// - Give every session its own staged changes, so one session never sees or
//   commits another session's uncommitted work.
// - Allow fault injection (offline store, failing commits) for tests.

use crate::modules::outbox::core::message::{OutboxMessage, OutboxMessageId};
use crate::modules::outbox::core::retry_policy::RetryPolicy;
use crate::shared::core::primitives::Clock;
use crate::shared::infrastructure::outbox_store::{
    OutboxContext, OutboxRepository, OutboxStoreError,
};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, RwLock};

#[derive(Debug, Clone)]
struct StoredRow {
    message: OutboxMessage,
    version: u64,
}

pub struct InMemoryOutboxStore {
    rows: RwLock<HashMap<OutboxMessageId, StoredRow>>,
    clock: Arc<dyn Clock>,
    policy: RetryPolicy,
    offline: AtomicBool,
    failing_commits: Mutex<HashSet<OutboxMessageId>>,
}

impl InMemoryOutboxStore {
    pub fn new(clock: Arc<dyn Clock>, policy: RetryPolicy) -> Self {
        Self {
            rows: RwLock::new(HashMap::new()),
            clock,
            policy,
            offline: AtomicBool::new(false),
            failing_commits: Mutex::new(HashSet::new()),
        }
    }

    /// Open a fresh unit of work against this store.
    pub fn session(self: &Arc<Self>) -> InMemoryOutboxSession {
        InMemoryOutboxSession {
            store: Arc::clone(self),
            tracked: Mutex::new(HashMap::new()),
            added: Mutex::new(Vec::new()),
        }
    }

    pub fn toggle_offline(&self) {
        self.offline.fetch_xor(true, Ordering::SeqCst);
    }

    pub fn is_offline(&self) -> bool {
        self.offline.load(Ordering::SeqCst)
    }

    /// Make every commit that touches `id` fail with a backend error.
    pub async fn fail_commits_for(&self, id: OutboxMessageId) {
        self.failing_commits.lock().await.insert(id);
    }

    /// Seed a row directly, bypassing any unit of work.
    pub async fn insert(&self, message: OutboxMessage) {
        self.rows
            .write()
            .await
            .insert(message.id(), StoredRow { message, version: 0 });
    }

    pub async fn snapshot(&self, id: OutboxMessageId) -> Option<OutboxMessage> {
        self.rows.read().await.get(&id).map(|row| row.message.clone())
    }

    pub async fn messages(&self) -> Vec<OutboxMessage> {
        let mut messages: Vec<OutboxMessage> = self
            .rows
            .read()
            .await
            .values()
            .map(|row| row.message.clone())
            .collect();
        messages.sort_by_key(|m| (m.created_at(), m.id()));
        messages
    }

    fn ensure_online(&self) -> Result<(), OutboxStoreError> {
        if self.is_offline() {
            return Err(OutboxStoreError::Backend("Outbox store offline".into()));
        }
        Ok(())
    }
}

#[derive(Debug)]
struct Tracked {
    loaded_version: u64,
    staged: Option<OutboxMessage>,
}

/// One unit of work. Acts as both the repository and the persistence context of a scope.
pub struct InMemoryOutboxSession {
    store: Arc<InMemoryOutboxStore>,
    tracked: Mutex<HashMap<OutboxMessageId, Tracked>>,
    added: Mutex<Vec<OutboxMessage>>,
}

#[async_trait]
impl OutboxRepository for InMemoryOutboxSession {
    async fn add(&self, message: OutboxMessage) -> Result<(), OutboxStoreError> {
        self.added.lock().await.push(message);
        Ok(())
    }

    async fn get_unprocessed_ids(
        &self,
        limit: usize,
    ) -> Result<Vec<OutboxMessageId>, OutboxStoreError> {
        self.store.ensure_online()?;
        let now = self.store.clock.now();
        let rows = self.store.rows.read().await;
        let mut eligible: Vec<&OutboxMessage> = rows
            .values()
            .map(|row| &row.message)
            .filter(|m| m.is_eligible(now, &self.store.policy))
            .collect();
        eligible.sort_by_key(|m| (m.created_at(), m.id()));
        Ok(eligible.into_iter().take(limit).map(|m| m.id()).collect())
    }

    async fn get(&self, id: OutboxMessageId) -> Result<OutboxMessage, OutboxStoreError> {
        self.store.ensure_online()?;
        let row = self
            .store
            .rows
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(OutboxStoreError::NotFound { id })?;
        self.tracked.lock().await.insert(
            id,
            Tracked {
                loaded_version: row.version,
                staged: None,
            },
        );
        Ok(row.message)
    }

    async fn update(&self, message: &OutboxMessage) -> Result<(), OutboxStoreError> {
        let id = message.id();
        let mut tracked = self.tracked.lock().await;
        let entry = tracked.get_mut(&id).ok_or_else(|| {
            OutboxStoreError::Backend(format!(
                "outbox message {id} is not tracked by this unit of work"
            ))
        })?;
        entry.staged = Some(message.clone());
        Ok(())
    }
}

#[async_trait]
impl OutboxContext for InMemoryOutboxSession {
    async fn save_changes(&self) -> Result<usize, OutboxStoreError> {
        self.store.ensure_online()?;
        let mut tracked = self.tracked.lock().await;
        let mut added = self.added.lock().await;
        let failing = self.store.failing_commits.lock().await;
        let mut rows = self.store.rows.write().await;

        for (id, entry) in tracked.iter().filter(|(_, t)| t.staged.is_some()) {
            if failing.contains(id) {
                return Err(OutboxStoreError::Backend(format!(
                    "commit rejected for outbox message {id}"
                )));
            }
            match rows.get(id) {
                None => return Err(OutboxStoreError::NotFound { id: *id }),
                Some(row) if row.version != entry.loaded_version => {
                    return Err(OutboxStoreError::Conflict { id: *id });
                }
                Some(_) => {}
            }
        }
        let mut new_ids = HashSet::new();
        for message in added.iter() {
            let id = message.id();
            if failing.contains(&id) {
                return Err(OutboxStoreError::Backend(format!(
                    "commit rejected for outbox message {id}"
                )));
            }
            if rows.contains_key(&id) || !new_ids.insert(id) {
                return Err(OutboxStoreError::Duplicate { id });
            }
        }

        let mut written = 0;
        for (id, entry) in tracked.iter_mut() {
            let Some(message) = entry.staged.take() else {
                continue;
            };
            if let Some(row) = rows.get_mut(id) {
                row.message = message;
                row.version += 1;
                entry.loaded_version = row.version;
                written += 1;
            }
        }
        for message in added.drain(..) {
            rows.insert(message.id(), StoredRow { message, version: 0 });
            written += 1;
        }
        Ok(written)
    }
}
