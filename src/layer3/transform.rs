// Transform Engine - Rolling statistics and edge checks over a window
// Pure functions: everything they need is passed in

use serde::{Deserialize, Serialize};

use crate::core::config::{AlertThreshold, PipelineConfig};
use crate::core::types::round1;

/// Spike detected on the current reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpikeEvent {
    pub current_value: i32,
    /// Mean of the trailing prior entries, one decimal
    pub rolling_avg: f64,
    pub increase_pct: f64,
}

/// Upward crossing of an alert threshold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEvent {
    pub severity: String,
    pub label: String,
    pub threshold: i32,
    pub value: i32,
    pub previous_value: i32,
    pub action: String,
}

/// Spike detector tuning
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpikeParams {
    pub ratio: f64,
    pub lookback: usize,
    pub min_history: usize,
}

impl Default for SpikeParams {
    fn default() -> Self {
        Self {
            ratio: 1.30,
            lookback: 5,
            min_history: 3,
        }
    }
}

impl From<&PipelineConfig> for SpikeParams {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            ratio: config.spike_ratio,
            lookback: config.spike_lookback,
            min_history: config.spike_min_history,
        }
    }
}

/// Arithmetic mean of the window; 0.0 for an empty window
pub fn rolling_average(values: &[i32]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let total: i64 = values.iter().map(|&v| v as i64).sum();
    total as f64 / values.len() as f64
}

/// Compare `current` against the trailing mean of `prior` (which must not contain `current`).
///
/// Fewer than `min_history` prior entries never spike. The comparison is strict:
/// exactly `ratio × mean` is not a spike.
pub fn detect_spike(prior: &[i32], current: i32, params: &SpikeParams) -> Option<SpikeEvent> {
    if prior.len() < params.min_history || prior.is_empty() {
        return None;
    }

    let take = params.lookback.max(1).min(prior.len());
    let mean = rolling_average(&prior[prior.len() - take..]);
    if mean <= 0.0 {
        return None;
    }

    let current_f = current as f64;
    if current_f > mean * params.ratio {
        Some(SpikeEvent {
            current_value: current,
            rolling_avg: round1(mean),
            increase_pct: round1((current_f - mean) / mean * 100.0),
        })
    } else {
        None
    }
}

/// First threshold, most severe first, crossed upward between `previous` and `current`.
///
/// `thresholds` is ascending. Use `previous = 0` when the entity has no prior reading.
pub fn check_alert_edge(
    previous: i32,
    current: i32,
    thresholds: &[AlertThreshold],
) -> Option<AlertEvent> {
    thresholds
        .iter()
        .rev()
        .find(|t| current >= t.threshold && previous < t.threshold)
        .map(|t| AlertEvent {
            severity: t.severity.clone(),
            label: t.label.clone(),
            threshold: t.threshold,
            value: current,
            previous_value: previous,
            action: t.action.clone(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::default_alert_thresholds;

    fn single_threshold() -> Vec<AlertThreshold> {
        vec![AlertThreshold::new(150, "WARNING", "W", "limit outdoor activity")]
    }

    #[test]
    fn test_rolling_average() {
        assert_eq!(rolling_average(&[100, 200, 300]), 200.0);
        assert_eq!(rolling_average(&[]), 0.0);
        assert_eq!(rolling_average(&[7]), 7.0);
    }

    #[test]
    fn test_spike_needs_three_prior_entries() {
        let params = SpikeParams::default();
        assert!(detect_spike(&[], 500, &params).is_none());
        assert!(detect_spike(&[100, 100], 500, &params).is_none());
        assert!(detect_spike(&[100, 100, 100], 500, &params).is_some());
    }

    #[test]
    fn test_spike_threshold_is_strict() {
        let params = SpikeParams::default();
        let prior = [100, 100, 100, 100, 100];

        assert!(detect_spike(&prior, 130, &params).is_none());

        let spike = detect_spike(&prior, 131, &params).unwrap();
        assert_eq!(spike.current_value, 131);
        assert_eq!(spike.rolling_avg, 100.0);
        assert_eq!(spike.increase_pct, 31.0);
    }

    #[test]
    fn test_spike_uses_last_five_prior_only() {
        let params = SpikeParams::default();
        // Old high values fall outside the lookback
        let prior = [400, 400, 400, 100, 100, 100, 100, 100];
        let spike = detect_spike(&prior, 200, &params).unwrap();
        assert_eq!(spike.rolling_avg, 100.0);
        assert_eq!(spike.increase_pct, 100.0);
    }

    #[test]
    fn test_spike_mean_and_pct_rounding() {
        let params = SpikeParams::default();
        let prior = [100, 101, 102];
        let spike = detect_spike(&prior, 150, &params).unwrap();
        assert_eq!(spike.rolling_avg, 101.0);
        assert_eq!(spike.increase_pct, 48.5);
    }

    #[test]
    fn test_alert_edge_single_threshold() {
        let thresholds = single_threshold();
        assert!(check_alert_edge(0, 90, &thresholds).is_none());
        let alert = check_alert_edge(90, 160, &thresholds).unwrap();
        assert_eq!(alert.threshold, 150);
        assert_eq!(alert.previous_value, 90);
        assert!(check_alert_edge(160, 170, &thresholds).is_none());
        assert!(check_alert_edge(170, 140, &thresholds).is_none());
        assert!(check_alert_edge(140, 165, &thresholds).is_some());
    }

    #[test]
    fn test_alert_edge_most_severe_wins() {
        let thresholds = default_alert_thresholds();
        let alert = check_alert_edge(90, 320, &thresholds).unwrap();
        assert_eq!(alert.severity, "EMERGENCY");
        assert_eq!(alert.threshold, 300);

        let alert = check_alert_edge(160, 210, &thresholds).unwrap();
        assert_eq!(alert.severity, "CRITICAL");
    }

    #[test]
    fn test_first_reading_above_threshold_fires() {
        let thresholds = default_alert_thresholds();
        let alert = check_alert_edge(0, 155, &thresholds).unwrap();
        assert_eq!(alert.severity, "WARNING");
    }

    #[test]
    fn test_alert_exactly_at_threshold_fires() {
        let thresholds = single_threshold();
        assert!(check_alert_edge(149, 150, &thresholds).is_some());
    }
}
