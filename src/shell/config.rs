// Runtime configuration read from the environment.
//
// Every setting has a default so the relay starts with an empty environment.
// A `.env` file is honoured by the binary before this runs.

use crate::modules::outbox::core::retry_policy::{
    DEFAULT_FAILURE_BACKOFF_SECS, DEFAULT_PROCESSING_RECLAIM_TIMEOUT_SECS, RetryPolicy,
};
use crate::modules::outbox::use_cases::process_outbox::processor::DEFAULT_BATCH_LIMIT;
use chrono::TimeDelta;
use std::fmt::Display;
use std::net::SocketAddr;
use std::num::NonZeroUsize;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub const HTTP_ADDR: &str = "OUTBOX_HTTP_ADDR";
pub const BATCH_LIMIT: &str = "OUTBOX_BATCH_LIMIT";
pub const POLL_INTERVAL_SECS: &str = "OUTBOX_POLL_INTERVAL_SECS";
pub const PROCESSING_RECLAIM_TIMEOUT_SECS: &str = "OUTBOX_PROCESSING_RECLAIM_TIMEOUT_SECS";
pub const FAILURE_BACKOFF_SECS: &str = "OUTBOX_FAILURE_BACKOFF_SECS";
pub const MAX_ATTEMPTS: &str = "OUTBOX_MAX_ATTEMPTS";
pub const CONCURRENCY: &str = "OUTBOX_CONCURRENCY";
pub const HEALTH_MAX_STALENESS_SECS: &str = "OUTBOX_HEALTH_MAX_STALENESS_SECS";
pub const LOG_PUBLISHER_TYPES: &str = "OUTBOX_LOG_PUBLISHER_TYPES";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct OutboxConfig {
    pub http_addr: SocketAddr,
    pub batch_limit: usize,
    pub poll_interval: Duration,
    pub retry_policy: RetryPolicy,
    pub concurrency: NonZeroUsize,
    pub health_max_staleness: TimeDelta,
    pub log_publisher_types: Vec<String>,
}

impl OutboxConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let batch_limit: usize = parse(&lookup, BATCH_LIMIT, DEFAULT_BATCH_LIMIT)?;
        if batch_limit == 0 {
            return Err(invalid(BATCH_LIMIT, "0", "must be at least 1"));
        }
        let max_attempts = match lookup(MAX_ATTEMPTS).filter(|v| !v.trim().is_empty()) {
            None => None,
            Some(raw) => Some(parse_value::<u32>(MAX_ATTEMPTS, &raw)?),
        };
        let retry_policy = RetryPolicy::default()
            .with_processing_reclaim_timeout(parse_seconds(
                &lookup,
                PROCESSING_RECLAIM_TIMEOUT_SECS,
                DEFAULT_PROCESSING_RECLAIM_TIMEOUT_SECS,
            )?)
            .with_failure_backoff_timeout(parse_seconds(
                &lookup,
                FAILURE_BACKOFF_SECS,
                DEFAULT_FAILURE_BACKOFF_SECS,
            )?)
            .with_max_attempts(max_attempts);
        let poll_interval_secs: u64 = parse(&lookup, POLL_INTERVAL_SECS, 60)?;
        if poll_interval_secs == 0 {
            return Err(invalid(POLL_INTERVAL_SECS, "0", "must be at least 1"));
        }

        Ok(Self {
            http_addr: parse(&lookup, HTTP_ADDR, SocketAddr::from(([0, 0, 0, 0], 8080)))?,
            batch_limit,
            poll_interval: Duration::from_secs(poll_interval_secs),
            retry_policy,
            concurrency: parse(&lookup, CONCURRENCY, NonZeroUsize::MIN)?,
            health_max_staleness: parse_seconds(&lookup, HEALTH_MAX_STALENESS_SECS, 300)?,
            log_publisher_types: lookup(LOG_PUBLISHER_TYPES)
                .map(|raw| {
                    raw.split(',')
                        .map(str::trim)
                        .filter(|t| !t.is_empty())
                        .map(str::to_owned)
                        .collect()
                })
                .unwrap_or_default(),
        })
    }
}

fn parse<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    match lookup(key) {
        Some(raw) => parse_value(key, &raw),
        None => Ok(default),
    }
}

/// Non-negative whole seconds that fit a TimeDelta.
fn parse_seconds(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: i64,
) -> Result<TimeDelta, ConfigError> {
    let secs: i64 = parse(lookup, key, default)?;
    if secs < 0 {
        return Err(invalid(key, &secs.to_string(), "must not be negative"));
    }
    TimeDelta::try_seconds(secs).ok_or_else(|| invalid(key, &secs.to_string(), "out of range"))
}

fn parse_value<T>(key: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    raw.trim()
        .parse()
        .map_err(|err: T::Err| invalid(key, raw, err))
}

fn invalid(key: &'static str, value: &str, reason: impl Display) -> ConfigError {
    ConfigError::Invalid {
        key,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
