//! Process-wide classification metrics.
//!
//! Counts LLM successes and failures, fallback reasons and reported confidence.
//! The tracker is constructed once and shared as `Arc<MetricsTracker>`; all
//! counters sit behind one mutex so increments never interleave.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::info;

use triage_core::defaults::METRICS_LOG_INTERVAL_SECS;
use triage_core::{CallCounters, ConfidenceScores, FallbackCounters, MetricsSnapshot};

#[derive(Debug)]
struct State {
    calls: CallCounters,
    fallbacks: FallbackCounters,
    confidence: ConfidenceScores,
    last_reset: DateTime<Utc>,
    last_summary: Instant,
}

impl State {
    fn fresh() -> Self {
        Self {
            calls: CallCounters::default(),
            fallbacks: FallbackCounters {
                total: 0,
                reasons: BTreeMap::new(),
            },
            confidence: ConfidenceScores::default(),
            last_reset: Utc::now(),
            last_summary: Instant::now(),
        }
    }

    fn success_rate(&self) -> f64 {
        percent(self.calls.successful, self.calls.total)
    }

    fn fallback_rate(&self) -> f64 {
        percent(self.fallbacks.total, self.calls.total)
    }

    fn average_confidence(&self) -> f64 {
        if self.confidence.count == 0 {
            0.0
        } else {
            self.confidence.sum / self.confidence.count as f64
        }
    }
}

fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

/// Counter state for the classification chain.
#[derive(Debug)]
pub struct MetricsTracker {
    state: Mutex<State>,
    log_interval: Duration,
}

impl Default for MetricsTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsTracker {
    pub fn new() -> Self {
        Self::with_log_interval(Duration::from_secs(METRICS_LOG_INTERVAL_SECS))
    }

    /// Tracker that emits its summary at most once per `interval`.
    pub fn with_log_interval(interval: Duration) -> Self {
        Self {
            state: Mutex::new(State::fresh()),
            log_interval: interval,
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // Counters stay consistent even if a holder panicked mid-update.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Record a successful LLM classification.
    ///
    /// Confidence is summed only when it is a finite number in `0..=100`;
    /// anything else is ignored without error.
    pub fn track_success(&self, confidence: Option<f64>) {
        let mut state = self.lock();
        state.calls.total += 1;
        state.calls.successful += 1;
        if let Some(c) = confidence.filter(|c| c.is_finite() && (0.0..=100.0).contains(c)) {
            state.confidence.sum += c;
            state.confidence.count += 1;
        }
        self.summarize_if_due(&mut state);
    }

    /// Record a failed LLM attempt.
    pub fn track_failure(&self) {
        let mut state = self.lock();
        state.calls.total += 1;
        state.calls.failed += 1;
        self.summarize_if_due(&mut state);
    }

    /// Record a transition out of the LLM step.
    pub fn track_fallback(&self, reason: &str) {
        let mut state = self.lock();
        state.fallbacks.total += 1;
        *state.fallbacks.reasons.entry(reason.to_string()).or_insert(0) += 1;
        self.summarize_if_due(&mut state);
    }

    /// Percentage of LLM calls that succeeded, 0 when nothing was tracked.
    pub fn success_rate(&self) -> f64 {
        self.lock().success_rate()
    }

    /// Fallbacks per LLM call as a percentage, 0 when nothing was tracked.
    pub fn fallback_rate(&self) -> f64 {
        self.lock().fallback_rate()
    }

    pub fn average_confidence(&self) -> f64 {
        self.lock().average_confidence()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let state = self.lock();
        MetricsSnapshot {
            rovo_calls: state.calls,
            fallback_usage: state.fallbacks.clone(),
            confidence_scores: state.confidence,
            last_reset: state.last_reset,
            success_rate: state.success_rate(),
            fallback_rate: state.fallback_rate(),
            average_confidence: state.average_confidence(),
        }
    }

    /// Zero every counter and stamp `last_reset`.
    pub fn reset(&self) {
        let mut state = self.lock();
        *state = State::fresh();
        info!(
            subsystem = "inference",
            component = "metrics",
            op = "reset",
            "Classification metrics reset"
        );
    }

    /// Emit the periodic summary if the interval has elapsed. Returns whether it did.
    fn summarize_if_due(&self, state: &mut State) -> bool {
        if state.last_summary.elapsed() < self.log_interval {
            return false;
        }
        state.last_summary = Instant::now();
        info!(
            subsystem = "inference",
            component = "metrics",
            op = "summary",
            total = state.calls.total,
            successful = state.calls.successful,
            failed = state.calls.failed,
            fallbacks = state.fallbacks.total,
            success_rate = state.success_rate(),
            fallback_rate = state.fallback_rate(),
            average_confidence = state.average_confidence(),
            "Classification metrics summary"
        );
        true
    }
}
