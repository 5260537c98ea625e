//! Retry with exponential backoff, adapted from
//! `orchestrator::executor::retry` — same builder shape and backoff
//! math, plus per-attempt timeout escalation (×1.5 on timeout) that
//! the teacher's version doesn't need.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::GatewayConfig;
use crate::error::GatewayError;

/// Whether an attempt's failure should trigger the ×1.5 timeout
/// escalation `original_source/core/llm.py` applies specifically to
/// timeouts (not to other transient errors).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    TimedOut,
    OtherError,
}

/// Retries `f`, escalating the timeout passed to it by ×1.5 after each
/// timeout and sleeping `retry_delay * retry_backoff^attempt` between
/// attempts, per §4.7.
pub async fn retry_with_escalating_timeout<F, Fut, T>(
    config: &GatewayConfig,
    operation_name: &str,
    mut f: F,
) -> Result<T, GatewayError>
where
    F: FnMut(Duration) -> Fut,
    Fut: Future<Output = Result<T, AttemptOutcome>>,
{
    let mut timeout = config.timeout;

    for attempt in 0..config.retry_count {
        if attempt > 0 {
            info!(operation = operation_name, attempt, "retrying LLM call");
        }

        match f(timeout).await {
            Ok(value) => return Ok(value),
            Err(outcome) => {
                let is_last = attempt + 1 == config.retry_count;
                debug!(operation = operation_name, attempt, ?outcome, "LLM call attempt failed");

                if is_last {
                    break;
                }

                if outcome == AttemptOutcome::TimedOut {
                    timeout = Duration::from_secs_f64(timeout.as_secs_f64() * 1.5);
                }

                let delay = Duration::from_secs_f64(
                    config.retry_delay.as_secs_f64() * config.retry_backoff.powi(attempt as i32),
                );
                warn!(operation = operation_name, attempt, delay_ms = delay.as_millis(), "backing off before retry");
                tokio::time::sleep(delay).await;
            }
        }
    }

    Err(GatewayError::Exhausted(config.retry_count))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn succeeds_on_first_attempt() {
        let config = GatewayConfig::default();
        let result: Result<i32, GatewayError> =
            retry_with_escalating_timeout(&config, "test", |_timeout| async { Ok(42) }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn escalates_timeout_after_a_timeout_failure() {
        let mut config = GatewayConfig::default();
        config.retry_delay = Duration::from_millis(1);
        config.timeout = Duration::from_secs(10);

        let seen_timeouts = Arc::new(std::sync::Mutex::new(Vec::new()));
        let seen_clone = seen_timeouts.clone();
        let attempt = Arc::new(AtomicU32::new(0));

        let result: Result<i32, GatewayError> = retry_with_escalating_timeout(&config, "test", move |timeout| {
            let seen = seen_clone.clone();
            let attempt = attempt.clone();
            async move {
                seen.lock().unwrap().push(timeout);
                if attempt.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(AttemptOutcome::TimedOut)
                } else {
                    Ok(7)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 7);
        let seen = seen_timeouts.lock().unwrap();
        assert_eq!(seen[0], Duration::from_secs(10));
        assert_eq!(seen[1], Duration::from_secs(15));
    }

    #[tokio::test]
    async fn exhausts_after_configured_retry_count() {
        let mut config = GatewayConfig::default();
        config.retry_count = 2;
        config.retry_delay = Duration::from_millis(1);

        let attempts = Arc::new(AtomicU32::new(0));
        let attempts_clone = attempts.clone();

        let result: Result<i32, GatewayError> = retry_with_escalating_timeout(&config, "test", move |_| {
            let attempts = attempts_clone.clone();
            async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err(AttemptOutcome::OtherError)
            }
        })
        .await;

        assert!(matches!(result, Err(GatewayError::Exhausted(2))));
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }
}
