//! Call guard: every outbound service call goes through one.
//!
//! A guard owns three limits shared by all calls made through it:
//! - a semaphore bounding calls in flight across concurrent requests,
//! - a per-attempt deadline, reported as [`ServiceError::Timeout`],
//! - a [`RetryPolicy`] applied to transient failures only.
//!
//! The permit is released before a backoff sleep, so waiting retries do not
//! hold capacity.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tracing::{debug, warn};

use pantry_core::ServiceError;

use crate::retry::RetryPolicy;

#[derive(Debug, Clone)]
pub struct CallGuard {
    permits: Arc<Semaphore>,
    timeout: Duration,
    retry: RetryPolicy,
}

impl CallGuard {
    pub fn new(max_in_flight: usize, timeout: Duration, retry: RetryPolicy) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(max_in_flight.max(1))),
            timeout,
            retry,
        }
    }

    /// Permits not currently held by a running call.
    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }

    /// Run `call` under the guard's limits, retrying transient failures.
    ///
    /// `call` is invoked once per attempt, so it must build a fresh future
    /// each time.
    pub async fn run<T, F, Fut>(&self, label: &str, mut call: F) -> Result<T, ServiceError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ServiceError>>,
    {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let result = {
                let _permit = self
                    .permits
                    .acquire()
                    .await
                    .map_err(|_| ServiceError::Unavailable("call guard is closed".into()))?;
                match tokio::time::timeout(self.timeout, call()).await {
                    Ok(result) => result,
                    Err(_) => Err(ServiceError::Timeout(self.timeout)),
                }
            };

            match result {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(call = label, attempt, "Call succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) if err.is_transient() && self.retry.should_retry(attempt) => {
                    let delay = self.retry.delay_for(attempt);
                    warn!(
                        call = label,
                        attempt,
                        max = self.retry.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Transient failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => {
                    if err.is_transient() {
                        warn!(call = label, attempt, error = %err, "Retries exhausted");
                    }
                    return Err(err);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn quick_retry(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay_ms: 1,
            backoff_factor: 1.0,
            max_delay_ms: 1,
            jitter: false,
        }
    }

    #[tokio::test]
    async fn retries_transient_until_success() {
        let guard = CallGuard::new(2, Duration::from_secs(1), quick_retry(3));
        let counter = AtomicUsize::new(0);
        let calls = &counter;
        let result = guard
            .run("flaky", move || async move {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(ServiceError::Http { status: 503, body: "busy".into() })
                } else {
                    Ok("done")
                }
            })
            .await;
        assert_eq!(result.unwrap(), "done");
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let guard = CallGuard::new(2, Duration::from_secs(1), quick_retry(3));
        let counter = AtomicUsize::new(0);
        let calls = &counter;
        let result: Result<(), _> = guard
            .run("down", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(ServiceError::Transport("connection reset".into()))
            })
            .await;
        assert!(matches!(result, Err(ServiceError::Transport(_))));
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn persistent_failures_are_not_retried() {
        let guard = CallGuard::new(2, Duration::from_secs(1), quick_retry(5));
        let counter = AtomicUsize::new(0);
        let calls = &counter;
        let result: Result<(), _> = guard
            .run("rejected", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(ServiceError::Http { status: 403, body: "forbidden".into() })
            })
            .await;
        assert!(result.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn slow_calls_time_out() {
        let guard = CallGuard::new(1, Duration::from_millis(20), RetryPolicy::none());
        let result: Result<(), _> = guard
            .run("slow", || async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await;
        let err = result.unwrap_err();
        assert!(matches!(err, ServiceError::Timeout(_)));
        assert!(err.is_transient());
        assert_eq!(guard.available_permits(), 1);
    }

    #[tokio::test]
    async fn in_flight_calls_never_exceed_bound() {
        let guard = Arc::new(CallGuard::new(3, Duration::from_secs(5), RetryPolicy::none()));
        let current = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..24 {
            let guard = guard.clone();
            let current = current.clone();
            let peak = peak.clone();
            handles.push(tokio::spawn(async move {
                guard
                    .run("load", || {
                        let current = current.clone();
                        let peak = peak.clone();
                        async move {
                            let now = current.fetch_add(1, Ordering::SeqCst) + 1;
                            peak.fetch_max(now, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(5)).await;
                            current.fetch_sub(1, Ordering::SeqCst);
                            Ok::<_, ServiceError>(())
                        }
                    })
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let peak = peak.load(Ordering::SeqCst);
        assert!(peak <= 3, "peak in-flight was {peak}");
        assert!(peak >= 1);
        assert_eq!(guard.available_permits(), 3);
    }
}
