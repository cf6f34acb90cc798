//! Prometheus metrics for the protocol.
//!
//! # Panics
//!
//! Metric registration uses `unwrap()`. A registration failure means duplicate
//! metric names, a startup bug that should crash rather than go unnoticed.
//! These panics can only happen during static initialization.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_gauge, register_int_gauge, CounterVec, Gauge, IntGauge,
};

/// Operations by outcome.
/// Labels: op (mint/borrow/...), outcome (ok/refused)
pub static OPERATIONS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "moneta_operations_total",
        "Total protocol operations by outcome",
        &["op", "outcome"]
    )
    .unwrap()
});

/// Refused operations by reason.
pub static REFUSALS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "moneta_refusals_total",
        "Total refused operations by reason",
        &["op", "reason"]
    )
    .unwrap()
});

/// Committed events by name.
pub static EVENTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "moneta_events_total",
        "Total events recorded by committed transactions",
        &["event"]
    )
    .unwrap()
});

/// Protocol-wide pause (1 = paused).
pub static PROTOCOL_PAUSED: Lazy<Gauge> = Lazy::new(|| {
    register_gauge!(
        "moneta_protocol_paused",
        "Protocol-wide pause switch (1=paused)"
    )
    .unwrap()
});

/// Listed markets.
pub static MARKETS_LISTED: Lazy<IntGauge> =
    Lazy::new(|| register_int_gauge!("moneta_markets_listed", "Number of listed markets").unwrap());

/// Current block of the protocol clock.
pub static CURRENT_BLOCK: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!("moneta_current_block", "Current block number of the protocol clock")
        .unwrap()
});

/// Metrics facade.
pub struct Metrics;

impl Metrics {
    pub fn operation_ok(op: &str) {
        OPERATIONS_TOTAL.with_label_values(&[op, "ok"]).inc();
    }

    /// Record a refusal under both the outcome and the reason counters.
    pub fn operation_refused(op: &str, reason: &str) {
        OPERATIONS_TOTAL.with_label_values(&[op, "refused"]).inc();
        REFUSALS_TOTAL.with_label_values(&[op, reason]).inc();
    }

    pub fn event_recorded(event: &str) {
        EVENTS_TOTAL.with_label_values(&[event]).inc();
    }

    pub fn protocol_paused(paused: bool) {
        PROTOCOL_PAUSED.set(if paused { 1.0 } else { 0.0 });
    }

    pub fn markets_listed(count: usize) {
        MARKETS_LISTED.set(i64::try_from(count).unwrap_or(i64::MAX));
    }

    pub fn current_block(block: u64) {
        CURRENT_BLOCK.set(i64::try_from(block).unwrap_or(i64::MAX));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refusal_counts_both_series() {
        let ok_before = OPERATIONS_TOTAL
            .with_label_values(&["test_op", "ok"])
            .get();
        let refused_before = OPERATIONS_TOTAL
            .with_label_values(&["test_op", "refused"])
            .get();

        Metrics::operation_ok("test_op");
        Metrics::operation_refused("test_op", "paused");

        assert_eq!(
            OPERATIONS_TOTAL.with_label_values(&["test_op", "ok"]).get(),
            ok_before + 1.0
        );
        assert_eq!(
            OPERATIONS_TOTAL
                .with_label_values(&["test_op", "refused"])
                .get(),
            refused_before + 1.0
        );
        assert!(
            REFUSALS_TOTAL
                .with_label_values(&["test_op", "paused"])
                .get()
                >= 1.0
        );
    }

    #[test]
    fn test_pause_gauge() {
        Metrics::protocol_paused(true);
        assert_eq!(PROTOCOL_PAUSED.get(), 1.0);
        Metrics::protocol_paused(false);
        assert_eq!(PROTOCOL_PAUSED.get(), 0.0);
    }
}
