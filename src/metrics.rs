//! Prometheus metrics for submission cycles

use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::time::Instant;

/// Process-wide metric set
pub struct Metrics {
    registry: Registry,

    // Submission phase
    pub submit_attempts: IntCounter,
    pub submit_failures: IntCounterVec,
    pub submit_exhausted: IntCounter,

    // Confirmation phase
    pub confirm_polls: IntCounter,
    pub confirm_poll_errors: IntCounterVec,
    pub confirm_timeouts: IntCounter,

    // Cycles
    pub outcomes: IntCounterVec,
    pub cycles_in_flight: IntGauge,

    // Histograms
    pub submit_latency: Histogram,
    pub confirm_latency: Histogram,
    pub cycle_latency: Histogram,
}

impl Metrics {
    /// Create a metric set bound to a fresh registry
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let submit_attempts = IntCounter::with_opts(Opts::new(
            "ledger_submit_attempts_total",
            "Transaction delivery attempts",
        ))?;

        let submit_failures = IntCounterVec::new(
            Opts::new(
                "ledger_submit_failures_total",
                "Failed delivery attempts by transport error kind",
            ),
            &["kind"],
        )?;

        let submit_exhausted = IntCounter::with_opts(Opts::new(
            "ledger_submit_exhausted_total",
            "Submissions that spent their whole retry budget",
        ))?;

        let confirm_polls = IntCounter::with_opts(Opts::new(
            "ledger_confirm_polls_total",
            "Status queries issued while awaiting confirmation",
        ))?;

        let confirm_poll_errors = IntCounterVec::new(
            Opts::new(
                "ledger_confirm_poll_errors_total",
                "Failed status queries by transport error kind",
            ),
            &["kind"],
        )?;

        let confirm_timeouts = IntCounter::with_opts(Opts::new(
            "ledger_confirm_timeouts_total",
            "Confirmations that ran out of polls",
        ))?;

        let outcomes = IntCounterVec::new(
            Opts::new("ledger_cycle_outcomes_total", "Terminal cycle outcomes"),
            &["outcome"],
        )?;

        let cycles_in_flight = IntGauge::with_opts(Opts::new(
            "ledger_cycles_in_flight",
            "Submission cycles currently running",
        ))?;

        let submit_latency = Histogram::with_opts(
            HistogramOpts::new(
                "ledger_submit_latency_seconds",
                "Time from first delivery attempt to accepted id",
            )
            .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.0, 5.0]),
        )?;

        let confirm_latency = Histogram::with_opts(
            HistogramOpts::new(
                "ledger_confirm_latency_seconds",
                "Time from accepted id to observed commitment",
            )
            .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 20.0, 60.0]),
        )?;

        let cycle_latency = Histogram::with_opts(
            HistogramOpts::new(
                "ledger_cycle_latency_seconds",
                "Duration of a full submit and confirm cycle",
            )
            .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 20.0, 60.0]),
        )?;

        registry.register(Box::new(submit_attempts.clone()))?;
        registry.register(Box::new(submit_failures.clone()))?;
        registry.register(Box::new(submit_exhausted.clone()))?;
        registry.register(Box::new(confirm_polls.clone()))?;
        registry.register(Box::new(confirm_poll_errors.clone()))?;
        registry.register(Box::new(confirm_timeouts.clone()))?;
        registry.register(Box::new(outcomes.clone()))?;
        registry.register(Box::new(cycles_in_flight.clone()))?;
        registry.register(Box::new(submit_latency.clone()))?;
        registry.register(Box::new(confirm_latency.clone()))?;
        registry.register(Box::new(cycle_latency.clone()))?;

        Ok(Self {
            registry,
            submit_attempts,
            submit_failures,
            submit_exhausted,
            confirm_polls,
            confirm_poll_errors,
            confirm_timeouts,
            outcomes,
            cycles_in_flight,
            submit_latency,
            confirm_latency,
            cycle_latency,
        })
    }

    /// Get the registry for exporting
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Render every registered metric in the Prometheus text format
    pub fn encode_text(&self) -> anyhow::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new().expect("Failed to create metrics")
    }
}

/// Global metrics instance
pub fn metrics() -> &'static Metrics {
    static METRICS: once_cell::sync::Lazy<Metrics> =
        once_cell::sync::Lazy::new(|| Metrics::new().expect("Failed to initialize metrics"));
    &METRICS
}

/// Timer helper for measuring operation duration
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn observe_duration(&self, histogram: &Histogram) {
        histogram.observe(self.elapsed_secs());
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

/// Keeps `cycles_in_flight` accurate even if a cycle future is dropped
pub(crate) struct InFlightGuard;

impl InFlightGuard {
    pub(crate) fn enter() -> Self {
        metrics().cycles_in_flight.inc();
        Self
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        metrics().cycles_in_flight.dec();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_register_and_encode() {
        let m = Metrics::new().unwrap();
        m.submit_attempts.inc();
        m.submit_failures.with_label_values(&["timeout"]).inc();
        m.outcomes.with_label_values(&["confirmed"]).inc();
        m.cycle_latency.observe(0.2);

        let text = m.encode_text().unwrap();
        assert!(text.contains("ledger_submit_attempts_total 1"));
        assert!(text.contains("ledger_submit_failures_total{kind=\"timeout\"} 1"));
        assert!(text.contains("ledger_cycle_outcomes_total{outcome=\"confirmed\"} 1"));
        assert!(text.contains("ledger_cycle_latency_seconds_count 1"));
    }

    #[test]
    fn test_timer_observes() {
        let m = Metrics::new().unwrap();
        let timer = Timer::new();
        timer.observe_duration(&m.submit_latency);
        assert_eq!(m.submit_latency.get_sample_count(), 1);
        assert!(timer.elapsed_secs() >= 0.0);
    }
}
