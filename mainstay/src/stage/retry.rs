//! Retry with exponential backoff and a connectivity gate.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use mainstay_core::{ConnectivityProbe, Request, Response, TransportError, Upstream};

use crate::backoff::backoff_delay;
use crate::policy::RetryPolicy;

/// Outcome classification for a single attempt.
///
/// Keeps the retry state machine explicit:
/// `Attempting -> {Success, NonRetryable, Retryable -> Backoff -> Attempting}`,
/// with exhaustion forwarding the last failure unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verdict {
    /// Terminal - hand the result to the caller as-is.
    Terminal,
    /// Transient - eligible for backoff and another attempt.
    Retryable,
}

/// Wraps the transport with bounded retries on transient failures.
///
/// Retryable conditions are transport-level timeouts and unreachable-server
/// failures, plus response statuses in the policy's retryable set. Any
/// other 4xx is a request defect, not a transient condition, and returns
/// immediately.
///
/// Before each retry the connectivity probe is consulted; when it reports
/// offline the stage waits one fixed interval and re-checks once. A second
/// offline reading aborts the retry loop with [`TransportError::Offline`]
/// rather than burning attempts that are guaranteed to fail.
///
/// The attempt count lives in the request's metadata bag, independent of
/// the auth stage's refresh guard - an auth-refresh re-send never eats
/// into the retry budget.
pub struct RetryStage<U> {
    inner: U,
    probe: Arc<dyn ConnectivityProbe>,
    policy: RetryPolicy,
}

impl<U> RetryStage<U> {
    /// Creates the stage around an inner upstream.
    pub fn new(inner: U, probe: Arc<dyn ConnectivityProbe>, policy: RetryPolicy) -> Self {
        RetryStage {
            inner,
            probe,
            policy,
        }
    }

    fn classify(&self, result: &Result<Response, TransportError>) -> Verdict {
        match result {
            Ok(response) if self.policy.is_retryable_status(response.status) => Verdict::Retryable,
            Ok(_) => Verdict::Terminal,
            Err(error) if error.is_retryable() => Verdict::Retryable,
            Err(_) => Verdict::Terminal,
        }
    }
}

impl<U> RetryStage<U>
where
    U: Upstream,
{
    /// Gate before each retry: offline gets one fixed-interval re-check.
    ///
    /// Returns false if the network is still unreachable after the
    /// re-check.
    async fn await_connectivity(&self) -> bool {
        if self.probe.is_connected().await {
            return true;
        }
        debug!("connectivity probe reports offline; re-checking once");
        tokio::time::sleep(self.policy.connectivity_recheck_delay).await;
        self.probe.is_connected().await
    }
}

#[async_trait]
impl<U> Upstream for RetryStage<U>
where
    U: Upstream,
{
    async fn call(&self, mut req: Request) -> Result<Response, TransportError> {
        loop {
            let result = self.inner.call(req.clone()).await;

            if self.classify(&result) == Verdict::Terminal {
                return result;
            }

            // Exhausted budget forwards the last failure unchanged.
            if req.meta.retry_attempts >= self.policy.max_retries {
                debug!(
                    attempts = req.meta.retry_attempts,
                    "retry budget exhausted"
                );
                return result;
            }

            let attempt = req.meta.retry_attempts;
            req.meta.retry_attempts += 1;

            let delay = backoff_delay(attempt, self.policy.base_delay);
            debug!(attempt, delay_ms = delay.as_millis() as u64, "backing off");
            tokio::time::sleep(delay).await;

            if !self.await_connectivity().await {
                return Err(TransportError::Offline);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::{HeaderMap, StatusCode};
    use mainstay_core::AlwaysConnected;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct ScriptedUpstream {
        script: Mutex<Vec<Result<u16, TransportError>>>,
        calls: AtomicUsize,
    }

    impl ScriptedUpstream {
        fn new(script: Vec<Result<u16, TransportError>>) -> Arc<Self> {
            Arc::new(ScriptedUpstream {
                script: Mutex::new(script),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Upstream for ScriptedUpstream {
        async fn call(&self, _req: Request) -> Result<Response, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.script.lock().unwrap().remove(0) {
                Ok(status) => Ok(Response::new(
                    StatusCode::from_u16(status).unwrap(),
                    HeaderMap::new(),
                    Bytes::new(),
                )),
                Err(error) => Err(error),
            }
        }
    }

    fn request() -> Request {
        Request::get("https://api.test/data".parse().unwrap())
    }

    fn stage(upstream: Arc<ScriptedUpstream>) -> RetryStage<Arc<ScriptedUpstream>> {
        RetryStage::new(upstream, Arc::new(AlwaysConnected), RetryPolicy::default())
    }

    #[tokio::test(start_paused = true)]
    async fn retries_503_until_success() {
        let upstream = ScriptedUpstream::new(vec![Err(TransportError::ConnectTimeout), Ok(200)]);
        let result = stage(upstream.clone()).call(request()).await.unwrap();
        assert_eq!(result.status, StatusCode::OK);
        assert_eq!(upstream.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn persistent_503_stops_after_budget() {
        let upstream = ScriptedUpstream::new(vec![Ok(503), Ok(503), Ok(503)]);
        let result = stage(upstream.clone()).call(request()).await.unwrap();
        // max_retries=2: three attempts total, last failure forwarded.
        assert_eq!(result.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(upstream.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn non_retryable_404_returns_immediately() {
        let upstream = ScriptedUpstream::new(vec![Ok(404)]);
        let result = stage(upstream.clone()).call(request()).await.unwrap();
        assert_eq!(result.status, StatusCode::NOT_FOUND);
        assert_eq!(upstream.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_transport_error_is_terminal() {
        let upstream = ScriptedUpstream::new(vec![Err(TransportError::Cancelled)]);
        let result = stage(upstream.clone()).call(request()).await;
        assert_eq!(result.unwrap_err(), TransportError::Cancelled);
        assert_eq!(upstream.calls(), 1);
    }

    struct FlappingProbe {
        connected: AtomicBool,
        queries: AtomicUsize,
    }

    #[async_trait]
    impl ConnectivityProbe for FlappingProbe {
        async fn is_connected(&self) -> bool {
            self.queries.fetch_add(1, Ordering::SeqCst);
            self.connected.load(Ordering::SeqCst)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn offline_after_recheck_aborts_with_offline_error() {
        let upstream = ScriptedUpstream::new(vec![Ok(503), Ok(200)]);
        let probe = Arc::new(FlappingProbe {
            connected: AtomicBool::new(false),
            queries: AtomicUsize::new(0),
        });
        let stage = RetryStage::new(upstream.clone(), probe.clone(), RetryPolicy::default());

        let result = stage.call(request()).await;

        assert_eq!(result.unwrap_err(), TransportError::Offline);
        // Initial attempt happened; the retry never dispatched.
        assert_eq!(upstream.calls(), 1);
        // Probe was consulted twice: initial check plus one re-check.
        assert_eq!(probe.queries.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn reconnect_during_recheck_allows_retry() {
        let upstream = ScriptedUpstream::new(vec![Ok(503), Ok(200)]);
        let probe = Arc::new(FlappingProbe {
            connected: AtomicBool::new(false),
            queries: AtomicUsize::new(0),
        });
        let stage = RetryStage::new(upstream.clone(), probe.clone(), RetryPolicy::default());

        let probe_flip = probe.clone();
        let call = stage.call(request());
        let flip = async move {
            // Come back online while the stage waits out the re-check.
            tokio::time::sleep(std::time::Duration::from_millis(700)).await;
            probe_flip.connected.store(true, Ordering::SeqCst);
        };

        let (result, ()) = tokio::join!(call, flip);
        assert_eq!(result.unwrap().status, StatusCode::OK);
        assert_eq!(upstream.calls(), 2);
    }
}
