use crate::utils::error::compact_error_message;
use alloy::providers::RootProvider;
use alloy::transports::http::Http;
use reqwest::Client;
use std::time::Duration;
use tokio::time::{sleep, timeout};

pub type HttpProvider = RootProvider<Http<Client>>;

const RPC_CALL_TIMEOUT: Duration = Duration::from_secs(15);
const RPC_ERR_MAX_LEN: usize = 260;
pub const DEFAULT_RPC_RETRIES: usize = 3;

pub fn bounded_exponential_backoff_ms(base_ms: u64, streak: u32, cap_ms: u64) -> u64 {
    if base_ms == 0 {
        return 0;
    }
    let clamped = streak.min(8);
    base_ms
        .saturating_mul(1u64 << clamped)
        .min(cap_ms.max(base_ms))
}

fn retry_backoff_ms(attempt: usize) -> u64 {
    bounded_exponential_backoff_ms(100, attempt as u32, 1_800)
}

pub fn is_rate_limited_rpc_error(message: &str) -> bool {
    let msg = message.to_ascii_lowercase();
    msg.contains("429")
        || msg.contains("rate limit")
        || msg.contains("too many requests")
        || msg.contains("compute units per second")
}

/// Errors where asking again cannot change the answer.
pub fn is_retryable_rpc_error(message: &str) -> bool {
    let msg = message.to_ascii_lowercase();
    let non_retryable = [
        "method not found",
        "-32601",
        "invalid params",
        "-32602",
        "execution reverted",
        "insufficient funds",
        "nonce too low",
        "already known",
        "parse error",
        "-32700",
    ];
    !non_retryable.iter().any(|needle| msg.contains(needle))
}

pub fn compact_rpc_error_message(message: &str) -> String {
    compact_error_message(message, RPC_ERR_MAX_LEN)
}

/// Runs `op` with a per-call timeout, retrying transient failures with
/// bounded exponential backoff.
pub async fn run_with_retry<T, Op, Fut>(retries: usize, context: &str, mut op: Op) -> anyhow::Result<T>
where
    Op: FnMut() -> Fut,
    Fut: std::future::Future<Output = anyhow::Result<T>>,
{
    let max_attempts = retries.max(1);
    let mut last_message = String::new();

    for attempt in 1..=max_attempts {
        match timeout(RPC_CALL_TIMEOUT, op()).await {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(err)) => {
                let message = compact_rpc_error_message(&err.to_string());
                if !is_retryable_rpc_error(&message) {
                    return Err(anyhow::anyhow!(
                        "{} failed on attempt {}/{}: {}",
                        context,
                        attempt,
                        max_attempts,
                        message
                    ));
                }
                if is_rate_limited_rpc_error(&message) {
                    tracing::warn!("[RPC] {} rate limited: {}", context, message);
                }
                last_message = message;
            }
            Err(_) => {
                last_message = format!("timed out after {}ms", RPC_CALL_TIMEOUT.as_millis());
            }
        }
        if attempt < max_attempts {
            sleep(Duration::from_millis(retry_backoff_ms(attempt))).await;
        }
    }

    Err(anyhow::anyhow!(
        "{} failed after {} attempt(s): {}",
        context,
        max_attempts,
        last_message
    ))
}
