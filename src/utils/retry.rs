//! Retry helper for upstream provider calls: per-attempt timeout plus
//! exponential backoff with full jitter.

use anyhow::Result;
use rand::Rng;
use std::time::Duration;
use tokio::time::{sleep, timeout};

/// Default timeout per attempt (ms)
pub const API_TIMEOUT_MS: u64 = 8_000;
/// Max attempts including the first
pub const API_MAX_RETRIES: usize = 3;
/// Base backoff (ms)
const BACKOFF_BASE_MS: u64 = 100;
/// Maximum backoff cap (ms)
const BACKOFF_MAX_MS: u64 = 5_000;

/// Call async closure `op` with standardized retry/backoff logic.
///
/// Every provider HTTP call in the scanner goes through this wrapper so a
/// transient upstream failure costs at most a few seconds instead of a
/// failed evaluation.
pub async fn call_api_with_retry<F, Fut, T>(op: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let mut attempt = 0;

    loop {
        attempt += 1;

        let result = match timeout(Duration::from_millis(API_TIMEOUT_MS), op()).await {
            Ok(res) => res,
            Err(_) => {
                if attempt >= API_MAX_RETRIES {
                    return Err(anyhow::anyhow!(
                        "Provider call timed out after {} attempts",
                        API_MAX_RETRIES
                    ));
                }
                let backoff_ms = calculate_backoff_with_jitter(attempt);
                tracing::debug!(
                    attempt,
                    max = API_MAX_RETRIES,
                    backoff_ms,
                    "Provider call timed out, retrying"
                );
                sleep(Duration::from_millis(backoff_ms)).await;
                continue;
            }
        };

        match result {
            Ok(value) => return Ok(value),
            Err(e) => {
                if attempt >= API_MAX_RETRIES {
                    return Err(e);
                }
                let backoff_ms = calculate_backoff_with_jitter(attempt);
                tracing::debug!(
                    attempt,
                    max = API_MAX_RETRIES,
                    error = %e,
                    backoff_ms,
                    "Provider call failed, retrying"
                );
                sleep(Duration::from_millis(backoff_ms)).await;
            }
        }
    }
}

/// random(0, min(BACKOFF_MAX_MS, BACKOFF_BASE_MS * 2^(attempt-1)))
fn calculate_backoff_with_jitter(attempt: usize) -> u64 {
    let mut rng = rand::thread_rng();

    let exp_backoff =
        BACKOFF_BASE_MS.saturating_mul(2_u64.saturating_pow(attempt.saturating_sub(1) as u32));
    let capped_backoff = exp_backoff.min(BACKOFF_MAX_MS);

    rng.gen_range(0..=capped_backoff)
}
