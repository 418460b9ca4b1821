use chrono::TimeDelta;

pub const DEFAULT_PROCESSING_RECLAIM_TIMEOUT_SECS: i64 = 60;
pub const DEFAULT_FAILURE_BACKOFF_SECS: i64 = 60;

/// Pacing rules for delivery attempts.
///
/// - `processing_reclaim_timeout`: how long a message may sit "processing"
///   before it is treated as abandoned and becomes eligible again.
/// - `failure_backoff_timeout`: minimum time between a failed attempt and the next one.
/// - `max_attempts`: once `error_count` reaches this value the message is
///   dead-lettered and never attempted again. `None` retries forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub processing_reclaim_timeout: TimeDelta,
    pub failure_backoff_timeout: TimeDelta,
    pub max_attempts: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            processing_reclaim_timeout: TimeDelta::seconds(DEFAULT_PROCESSING_RECLAIM_TIMEOUT_SECS),
            failure_backoff_timeout: TimeDelta::seconds(DEFAULT_FAILURE_BACKOFF_SECS),
            max_attempts: None,
        }
    }
}

impl RetryPolicy {
    pub fn with_processing_reclaim_timeout(mut self, timeout: TimeDelta) -> Self {
        self.processing_reclaim_timeout = timeout;
        self
    }

    pub fn with_failure_backoff_timeout(mut self, timeout: TimeDelta) -> Self {
        self.failure_backoff_timeout = timeout;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: Option<u32>) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn is_exhausted(&self, error_count: u32) -> bool {
        self.max_attempts.is_some_and(|max| error_count >= max)
    }
}
