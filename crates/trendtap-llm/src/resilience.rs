//! Bounded retry with exponential backoff and a circuit breaker around an analyzer.
//!
//! Only `ProviderUnavailable` is retried and counted as a breaker failure. A
//! malformed response means the provider answered, so it fails immediately
//! and resolves a half-open trial as a success.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{info, warn};
use trendtap_core::{LlmCallConfig, TopicAnalysis};

use crate::analysis::TopicAnalyzer;
use crate::error::AnalysisError;

/// How many attempts a single resolution may make.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
}

impl RetryPolicy {
    /// Delay before attempt `attempt + 1`, doubling from `initial_backoff`.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.initial_backoff
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BreakerState {
    Closed,
    Open { since: Instant },
    HalfOpen,
}

struct BreakerInner {
    state: BreakerState,
    failures: VecDeque<Instant>,
    /// Set while the single half-open trial call is outstanding.
    trial_in_flight: bool,
}

/// Opens after `threshold` failures within `window`; after `cooldown` one
/// trial call is let through, and its outcome closes or reopens the circuit.
pub struct CircuitBreaker {
    threshold: u32,
    window: Duration,
    cooldown: Duration,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    pub fn new(threshold: u32, window: Duration, cooldown: Duration) -> Self {
        Self {
            threshold: threshold.max(1),
            window,
            cooldown,
            inner: Mutex::new(BreakerInner {
                state: BreakerState::Closed,
                failures: VecDeque::new(),
                trial_in_flight: false,
            }),
        }
    }

    /// Whether a call may proceed now. While half-open only the trial call
    /// is admitted until its outcome is recorded.
    pub fn allow(&self) -> bool {
        let mut inner = self.inner.lock();
        let state = inner.state;
        match state {
            BreakerState::Closed => true,
            BreakerState::HalfOpen if inner.trial_in_flight => false,
            BreakerState::Open { since } if since.elapsed() < self.cooldown => false,
            BreakerState::HalfOpen | BreakerState::Open { .. } => {
                inner.state = BreakerState::HalfOpen;
                inner.trial_in_flight = true;
                true
            }
        }
    }

    pub fn record_success(&self) {
        let mut inner = self.inner.lock();
        if inner.state != BreakerState::Closed {
            info!("LLM circuit breaker closed");
        }
        inner.state = BreakerState::Closed;
        inner.trial_in_flight = false;
        inner.failures.clear();
    }

    pub fn record_failure(&self) {
        let mut inner = self.inner.lock();
        let now = Instant::now();

        if inner.state == BreakerState::HalfOpen {
            inner.state = BreakerState::Open { since: now };
            inner.trial_in_flight = false;
            warn!("LLM circuit breaker reopened after failed trial call");
            return;
        }

        inner.failures.push_back(now);
        while let Some(&oldest) = inner.failures.front() {
            if now.duration_since(oldest) > self.window {
                inner.failures.pop_front();
            } else {
                break;
            }
        }

        if inner.failures.len() as u32 >= self.threshold {
            inner.state = BreakerState::Open { since: now };
            inner.failures.clear();
            warn!(
                "LLM circuit breaker opened after {} failures within {:?}",
                self.threshold, self.window
            );
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self.inner.lock().state, BreakerState::Open { .. })
    }
}

/// Wraps an analyzer with [`RetryPolicy`] and a [`CircuitBreaker`].
pub struct ResilientAnalyzer {
    inner: Arc<dyn TopicAnalyzer>,
    policy: RetryPolicy,
    breaker: CircuitBreaker,
}

impl ResilientAnalyzer {
    pub fn new(inner: Arc<dyn TopicAnalyzer>, policy: RetryPolicy, breaker: CircuitBreaker) -> Self {
        Self {
            inner,
            policy,
            breaker,
        }
    }

    pub fn from_config(inner: Arc<dyn TopicAnalyzer>, config: &LlmCallConfig) -> Self {
        Self::new(
            inner,
            RetryPolicy {
                max_attempts: config.max_attempts.max(1),
                initial_backoff: config.initial_backoff,
            },
            CircuitBreaker::new(
                config.breaker_threshold,
                config.breaker_window,
                config.breaker_cooldown,
            ),
        )
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }
}

#[async_trait]
impl TopicAnalyzer for ResilientAnalyzer {
    fn is_configured(&self) -> bool {
        self.inner.is_configured()
    }

    async fn analyze(&self, topic: &str) -> Result<TopicAnalysis, AnalysisError> {
        let mut attempt = 1;
        loop {
            if !self.breaker.allow() {
                return Err(AnalysisError::CircuitOpen);
            }

            match self.inner.analyze(topic).await {
                Ok(analysis) => {
                    self.breaker.record_success();
                    return Ok(analysis);
                }
                Err(e) if e.is_transient() => {
                    self.breaker.record_failure();
                    if attempt >= self.policy.max_attempts {
                        return Err(e);
                    }
                    let delay = self.policy.backoff_for(attempt);
                    warn!(
                        "LLM attempt {}/{} for '{}' failed: {}; retrying in {:?}",
                        attempt, self.policy.max_attempts, topic, e, delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    // The provider answered, so it counts as reachable.
                    self.breaker.record_success();
                    return Err(e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use trendtap_core::ResolutionSource;

    /// Fails with the scripted errors in order, then succeeds.
    struct ScriptedAnalyzer {
        script: Mutex<VecDeque<AnalysisError>>,
        calls: AtomicU32,
    }

    impl ScriptedAnalyzer {
        fn new(errors: Vec<AnalysisError>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(errors.into()),
                calls: AtomicU32::new(0),
            })
        }
    }

    #[async_trait]
    impl TopicAnalyzer for ScriptedAnalyzer {
        fn is_configured(&self) -> bool {
            true
        }

        async fn analyze(&self, topic: &str) -> Result<TopicAnalysis, AnalysisError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.script.lock().pop_front() {
                Some(e) => Err(e),
                None => Ok(TopicAnalysis::new(topic, ResolutionSource::Llm, vec!["x".into()], Vec::new())),
            }
        }
    }

    fn unavailable() -> AnalysisError {
        AnalysisError::ProviderUnavailable("503".into())
    }

    fn policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_backoff: Duration::from_millis(1),
        }
    }

    fn lenient_breaker() -> CircuitBreaker {
        CircuitBreaker::new(100, Duration::from_secs(60), Duration::from_secs(60))
    }

    #[test]
    fn test_backoff_doubles() {
        let p = RetryPolicy {
            max_attempts: 4,
            initial_backoff: Duration::from_millis(100),
        };
        assert_eq!(p.backoff_for(1), Duration::from_millis(100));
        assert_eq!(p.backoff_for(2), Duration::from_millis(200));
        assert_eq!(p.backoff_for(3), Duration::from_millis(400));
    }

    #[tokio::test]
    async fn test_retries_transient_failures() {
        let inner = ScriptedAnalyzer::new(vec![unavailable(), unavailable()]);
        let analyzer = ResilientAnalyzer::new(inner.clone(), policy(3), lenient_breaker());

        let analysis = analyzer.analyze("coffee").await.unwrap();
        assert_eq!(analysis.source, ResolutionSource::Llm);
        assert_eq!(inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let inner = ScriptedAnalyzer::new(vec![unavailable(), unavailable(), unavailable()]);
        let analyzer = ResilientAnalyzer::new(inner.clone(), policy(2), lenient_breaker());

        let err = analyzer.analyze("coffee").await.unwrap_err();
        assert!(matches!(err, AnalysisError::ProviderUnavailable(_)));
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_malformed_is_not_retried() {
        let inner = ScriptedAnalyzer::new(vec![AnalysisError::MalformedResponse("nope".into())]);
        let analyzer = ResilientAnalyzer::new(inner.clone(), policy(3), lenient_breaker());

        let err = analyzer.analyze("coffee").await.unwrap_err();
        assert!(matches!(err, AnalysisError::MalformedResponse(_)));
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_breaker_opens_and_short_circuits() {
        let inner = ScriptedAnalyzer::new(vec![unavailable(), unavailable(), unavailable()]);
        let breaker = CircuitBreaker::new(2, Duration::from_secs(60), Duration::from_secs(60));
        let analyzer = ResilientAnalyzer::new(inner.clone(), policy(5), breaker);

        let err = analyzer.analyze("coffee").await.unwrap_err();
        assert_eq!(err, AnalysisError::CircuitOpen);
        assert!(analyzer.breaker().is_open());
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);

        let err = analyzer.analyze("tea").await.unwrap_err();
        assert_eq!(err, AnalysisError::CircuitOpen);
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_breaker_half_open_after_cooldown() {
        let breaker = CircuitBreaker::new(1, Duration::from_secs(60), Duration::from_millis(1));
        breaker.record_failure();
        assert!(breaker.is_open());

        std::thread::sleep(Duration::from_millis(5));
        assert!(breaker.allow());
        assert!(!breaker.is_open());

        breaker.record_failure();
        assert!(breaker.is_open());

        std::thread::sleep(Duration::from_millis(5));
        assert!(breaker.allow());
        breaker.record_success();
        assert!(breaker.allow());
        assert!(!breaker.is_open());
    }

    #[test]
    fn test_half_open_admits_single_trial() {
        let breaker = CircuitBreaker::new(1, Duration::from_secs(60), Duration::from_millis(1));
        breaker.record_failure();
        std::thread::sleep(Duration::from_millis(5));

        let admitted = (0..5).filter(|_| breaker.allow()).count();
        assert_eq!(admitted, 1);

        breaker.record_success();
        assert_eq!((0..5).filter(|_| breaker.allow()).count(), 5);
    }

    #[tokio::test]
    async fn test_malformed_trial_closes_breaker() {
        let inner = ScriptedAnalyzer::new(vec![
            unavailable(),
            AnalysisError::MalformedResponse("nope".into()),
        ]);
        let breaker = CircuitBreaker::new(1, Duration::from_secs(60), Duration::from_millis(1));
        let analyzer = ResilientAnalyzer::new(inner.clone(), policy(1), breaker);

        let err = analyzer.analyze("coffee").await.unwrap_err();
        assert!(matches!(err, AnalysisError::ProviderUnavailable(_)));
        assert!(analyzer.breaker().is_open());

        tokio::time::sleep(Duration::from_millis(5)).await;
        let err = analyzer.analyze("coffee").await.unwrap_err();
        assert!(matches!(err, AnalysisError::MalformedResponse(_)));

        assert!(!analyzer.breaker().is_open());
        assert_eq!((0..3).filter(|_| analyzer.breaker().allow()).count(), 3);
    }

    #[test]
    fn test_breaker_ignores_failures_outside_window() {
        let breaker = CircuitBreaker::new(2, Duration::from_millis(1), Duration::from_secs(60));
        breaker.record_failure();
        std::thread::sleep(Duration::from_millis(5));
        breaker.record_failure();
        assert!(!breaker.is_open());
    }
}
