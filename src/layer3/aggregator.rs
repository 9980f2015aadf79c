// Tick Aggregator - Folds per-entity values into one tick summary
// No cross-tick state

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::types::{round1, AqiLevel};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickSummary {
    pub average: f64,
    pub maximum: i32,
    pub critical_count: usize,
    pub total: usize,
    pub level: AqiLevel,
}

impl fmt::Display for TickSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TickSummary(avg={}, max={}, critical={}/{})",
            self.average, self.maximum, self.critical_count, self.total
        )
    }
}

/// Mean (one decimal), max, and count at or above `critical_threshold` over the
/// values read this tick. `total` echoes the configured entity count.
pub fn aggregate(values: &[i32], entity_count: usize, critical_threshold: i32) -> TickSummary {
    if values.is_empty() {
        return TickSummary {
            average: 0.0,
            maximum: 0,
            critical_count: 0,
            total: entity_count,
            level: AqiLevel::Good,
        };
    }

    let total: i64 = values.iter().map(|&v| v as i64).sum();
    let average = round1(total as f64 / values.len() as f64);

    TickSummary {
        average,
        maximum: values.iter().copied().max().unwrap_or(0),
        critical_count: values.iter().filter(|&&v| v >= critical_threshold).count(),
        total: entity_count,
        level: AqiLevel::from_value(average as i32),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregate_counts_critical_inclusive() {
        let summary = aggregate(&[50, 150, 250, 350], 4, 150);
        assert_eq!(summary.average, 200.0);
        assert_eq!(summary.maximum, 350);
        assert_eq!(summary.critical_count, 3);
        assert_eq!(summary.total, 4);
        assert_eq!(summary.level, AqiLevel::Moderate);
    }

    #[test]
    fn test_aggregate_rounds_average() {
        let summary = aggregate(&[100, 101, 101], 3, 150);
        assert_eq!(summary.average, 100.7);
        assert_eq!(summary.critical_count, 0);
    }

    #[test]
    fn test_aggregate_empty() {
        let summary = aggregate(&[], 0, 150);
        assert_eq!(summary.total, 0);
        assert_eq!(summary.average, 0.0);
        assert_eq!(summary.maximum, 0);
    }

    #[test]
    fn test_total_echoes_entity_count() {
        // two of three entities read this tick
        let summary = aggregate(&[100, 200], 3, 150);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.average, 150.0);
        assert_eq!(summary.critical_count, 1);
    }
}
