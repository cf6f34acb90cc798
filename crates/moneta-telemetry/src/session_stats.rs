//! End-of-session statistics.
//!
//! Reads the operation counters back and summarizes them per operation:
//! committed count, refused count and refusal rate.

use crate::error::TelemetryResult;
use crate::metrics::OPERATIONS_TOTAL;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

/// Statistics for one operation kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationStats {
    pub op: String,
    pub ok: u64,
    pub refused: u64,
    pub refusal_rate: f64,
}

pub struct SessionStatsReporter {
    ops: Vec<String>,
    start_time: DateTime<Utc>,
}

impl SessionStatsReporter {
    pub fn new(ops: Vec<String>) -> Self {
        Self {
            ops,
            start_time: Utc::now(),
        }
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    pub fn get_stats(&self) -> Vec<OperationStats> {
        self.ops.iter().map(|op| Self::op_stats(op)).collect()
    }

    fn op_stats(op: &str) -> OperationStats {
        let ok = OPERATIONS_TOTAL.with_label_values(&[op, "ok"]).get() as u64;
        let refused = OPERATIONS_TOTAL.with_label_values(&[op, "refused"]).get() as u64;
        let total = ok + refused;
        let refusal_rate = if total > 0 {
            refused as f64 / total as f64
        } else {
            0.0
        };
        OperationStats {
            op: op.to_string(),
            ok,
            refused,
            refusal_rate,
        }
    }

    /// Log the summary. Operations never attempted are skipped.
    pub fn output_summary(&self) {
        let elapsed = Utc::now() - self.start_time;
        info!("========== Session Summary ==========");
        info!(
            "Started: {} ({} ms)",
            self.start_time.format("%Y-%m-%d %H:%M:%S UTC"),
            elapsed.num_milliseconds()
        );
        for s in self.get_stats().iter().filter(|s| s.ok + s.refused > 0) {
            info!(
                "  {:<24} ok={:<6} refused={:<6} ({:.1}%)",
                s.op,
                s.ok,
                s.refused,
                s.refusal_rate * 100.0
            );
        }
        info!("=====================================");
    }

    pub fn to_json(&self) -> TelemetryResult<String> {
        Ok(serde_json::to_string_pretty(&self.get_stats())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::Metrics;

    #[test]
    fn test_stats_read_counters() {
        Metrics::operation_ok("stats_mint");
        Metrics::operation_ok("stats_mint");
        Metrics::operation_ok("stats_mint");
        Metrics::operation_refused("stats_mint", "paused");

        let reporter = SessionStatsReporter::new(vec!["stats_mint".into(), "stats_idle".into()]);
        let stats = reporter.get_stats();

        assert_eq!(stats[0].ok, 3);
        assert_eq!(stats[0].refused, 1);
        assert!((stats[0].refusal_rate - 0.25).abs() < 1e-9);
        assert_eq!(stats[1].ok + stats[1].refused, 0);
        assert_eq!(stats[1].refusal_rate, 0.0);

        let json = reporter.to_json().unwrap();
        assert!(json.contains("\"op\": \"stats_mint\""));
    }
}
