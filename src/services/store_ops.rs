//! Bounded retry-with-backoff wrapper for individual store operations.

use std::time::Duration;

use futures::future::BoxFuture;
use tokio::time::{sleep, timeout};
use tracing::warn;

use crate::{
    config::AppConfig,
    dao::storage::{StorageError, StorageResult},
    error::ServiceError,
};

/// Upper bound for one store operation attempt; a hung backend surfaces as a
/// timeout instead of blocking the caller forever.
const OPERATION_TIMEOUT: Duration = Duration::from_secs(2);

/// Run a store operation, retrying transient failures with backoff.
///
/// Only [`StorageError::Unavailable`] is retried; corrupted records are
/// reported straight away. Once the configured attempts are exhausted the
/// last failure is surfaced to the caller, never silently dropped.
pub async fn with_retry<T, F>(config: &AppConfig, operation: &str, mut op: F) -> Result<T, ServiceError>
where
    F: FnMut() -> BoxFuture<'static, StorageResult<T>>,
{
    let attempts = config.store_retry_attempts.max(1);
    let mut last_unavailable: Option<StorageError> = None;

    for attempt in 0..attempts {
        if attempt > 0 {
            sleep(config.store_retry_backoff).await;
        }

        match timeout(OPERATION_TIMEOUT, op()).await {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(err @ StorageError::Unavailable { .. })) => {
                warn!(operation, attempt, error = %err, "store operation failed; retrying");
                last_unavailable = Some(err);
            }
            Ok(Err(err @ StorageError::Corrupted { .. })) => {
                return Err(ServiceError::Unavailable(err));
            }
            Err(_) => {
                warn!(operation, attempt, "store operation timed out");
                return Err(ServiceError::Timeout);
            }
        }
    }

    match last_unavailable {
        Some(err) => Err(ServiceError::Unavailable(err)),
        None => Err(ServiceError::Timeout),
    }
}
