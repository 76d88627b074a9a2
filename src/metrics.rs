//! Accounting for one checker invocation.
//!
//! Tracks token usage and latency for the model call alongside the
//! stabilization loop's round count and elapsed time. Instances merge so
//! callers batching several invocations can aggregate.

use serde::{Deserialize, Serialize};

/// Aggregated metrics for a checker run.
#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CheckerMetrics {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub inference_time_ms: u64,

    pub stabilize_rounds: u64,
    pub stabilize_time_ms: u64,
}

impl CheckerMetrics {
    /// Record usage from one completion call.
    pub fn record_completion(
        &mut self,
        prompt_tokens: u64,
        completion_tokens: u64,
        inference_time_ms: u64,
    ) {
        self.prompt_tokens += prompt_tokens;
        self.completion_tokens += completion_tokens;
        self.inference_time_ms += inference_time_ms;
    }

    /// Record one stabilization pass.
    pub fn record_stabilization(&mut self, rounds: u64, elapsed_ms: u64) {
        self.stabilize_rounds += rounds;
        self.stabilize_time_ms += elapsed_ms;
    }

    /// Merge the values from another metrics instance into this one.
    pub fn merge(&mut self, other: &CheckerMetrics) {
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
        self.inference_time_ms += other.inference_time_ms;
        self.stabilize_rounds += other.stabilize_rounds;
        self.stabilize_time_ms += other.stabilize_time_ms;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_accumulates_across_calls() {
        let mut metrics = CheckerMetrics::default();
        metrics.record_completion(120, 40, 900);
        metrics.record_completion(10, 5, 100);
        metrics.record_stabilization(3, 6_200);

        assert_eq!(metrics.prompt_tokens, 130);
        assert_eq!(metrics.completion_tokens, 45);
        assert_eq!(metrics.inference_time_ms, 1_000);
        assert_eq!(metrics.stabilize_rounds, 3);
        assert_eq!(metrics.stabilize_time_ms, 6_200);
    }

    #[test]
    fn merge_combines_two_instances() {
        let mut a = CheckerMetrics::default();
        a.record_completion(100, 20, 500);
        a.record_stabilization(2, 4_000);

        let mut b = CheckerMetrics::default();
        b.record_completion(50, 10, 250);
        b.record_stabilization(1, 2_000);

        a.merge(&b);
        assert_eq!(a.prompt_tokens, 150);
        assert_eq!(a.completion_tokens, 30);
        assert_eq!(a.inference_time_ms, 750);
        assert_eq!(a.stabilize_rounds, 3);
        assert_eq!(a.stabilize_time_ms, 6_000);
    }
}
