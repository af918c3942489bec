use std::{future::Future, time::Duration};

use log::*;
use rand::Rng;

use crate::traits::EngineError;

const BASE_BACKOFF_MS: u64 = 10;

/// Runs `op` until it succeeds, fails with anything other than [`EngineError::ConcurrencyConflict`], or has been
/// retried `max_retries` times. Each retry waits for an exponentially growing, jittered delay.
///
/// `op` must start a fresh unit of work on every call; nothing from a failed attempt is reused.
pub async fn with_conflict_retry<T, F, Fut>(max_retries: u32, mut op: F) -> Result<T, EngineError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, EngineError>>,
{
    let mut attempt = 0u32;
    loop {
        match op().await {
            Err(EngineError::ConcurrencyConflict(reason)) if attempt < max_retries => {
                attempt += 1;
                let delay = backoff(attempt);
                warn!(
                    "🔁️ Concurrency conflict ({reason}). Retry {attempt}/{max_retries} in {}ms",
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            },
            result => return result,
        }
    }
}

fn backoff(attempt: u32) -> Duration {
    let base = BASE_BACKOFF_MS << attempt.min(6);
    let jitter = rand::thread_rng().gen_range(0..=base);
    Duration::from_millis(base + jitter)
}
