//! Source Health
//!
//! Per-source circuit breaker. A source that fails `failure_threshold`
//! times in a row is skipped for `cooldown`; after the cooldown it gets one
//! probe, and a single further failure trips it again. Any success resets
//! the failure streak.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

use crate::domain::DataSource;

/// Default consecutive failures before a source is benched
pub const DEFAULT_FAILURE_THRESHOLD: u32 = 3;

/// Default bench time
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HealthPolicy {
    pub failure_threshold: u32,
    pub cooldown: Duration,
}

impl Default for HealthPolicy {
    fn default() -> Self {
        Self {
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            cooldown: DEFAULT_COOLDOWN,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct SourceState {
    consecutive_failures: u32,
    total_failures: u64,
    total_successes: u64,
    benched_until: Option<Instant>,
    last_error: Option<String>,
}

/// Point-in-time view of one source for reporting
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceStatus {
    pub source: DataSource,
    pub available: bool,
    pub consecutive_failures: u32,
    pub total_successes: u64,
    pub total_failures: u64,
    pub cooldown_remaining_secs: Option<u64>,
    pub last_error: Option<String>,
}

#[derive(Debug, Default)]
pub struct SourceHealth {
    policy: HealthPolicy,
    states: Mutex<HashMap<DataSource, SourceState>>,
}

impl SourceHealth {
    pub fn new(policy: HealthPolicy) -> Self {
        Self {
            policy,
            states: Mutex::new(HashMap::new()),
        }
    }

    pub fn policy(&self) -> HealthPolicy {
        self.policy
    }

    fn with_states<T>(&self, f: impl FnOnce(&mut HashMap<DataSource, SourceState>) -> T) -> T {
        let mut states = self.states.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut states)
    }

    pub fn is_available(&self, source: DataSource) -> bool {
        self.is_available_at(source, Instant::now())
    }

    pub fn is_available_at(&self, source: DataSource, now: Instant) -> bool {
        self.with_states(|states| {
            states
                .get(&source)
                .and_then(|s| s.benched_until)
                .map_or(true, |until| now >= until)
        })
    }

    pub fn record_success(&self, source: DataSource) {
        self.with_states(|states| {
            let state = states.entry(source).or_default();
            state.consecutive_failures = 0;
            state.total_successes += 1;
            state.benched_until = None;
        });
    }

    pub fn record_failure(&self, source: DataSource, error: &str) {
        self.record_failure_at(source, error, Instant::now());
    }

    pub fn record_failure_at(&self, source: DataSource, error: &str, now: Instant) {
        let threshold = self.policy.failure_threshold.max(1);
        let cooldown = self.policy.cooldown;
        self.with_states(|states| {
            let state = states.entry(source).or_default();
            state.consecutive_failures += 1;
            state.total_failures += 1;
            state.last_error = Some(error.to_string());

            if state.consecutive_failures >= threshold {
                state.benched_until = Some(now + cooldown);
                tracing::warn!(
                    "{} benched for {:?} after {} consecutive failures (last: {})",
                    source,
                    cooldown,
                    state.consecutive_failures,
                    error
                );
            }
        });
    }

    /// Forget all failure history
    pub fn reset(&self) {
        self.with_states(|states| states.clear());
    }

    /// Status of the given sources, in the order given
    pub fn snapshot_at(&self, sources: &[DataSource], now: Instant) -> Vec<SourceStatus> {
        self.with_states(|states| {
            sources
                .iter()
                .map(|source| {
                    let state = states.get(source).cloned().unwrap_or_default();
                    let remaining = state
                        .benched_until
                        .and_then(|until| until.checked_duration_since(now))
                        .filter(|d| !d.is_zero());
                    SourceStatus {
                        source: *source,
                        available: remaining.is_none(),
                        consecutive_failures: state.consecutive_failures,
                        total_successes: state.total_successes,
                        total_failures: state.total_failures,
                        cooldown_remaining_secs: remaining.map(|d| d.as_secs()),
                        last_error: state.last_error,
                    }
                })
                .collect()
        })
    }

    pub fn snapshot(&self, sources: &[DataSource]) -> Vec<SourceStatus> {
        self.snapshot_at(sources, Instant::now())
    }
}
