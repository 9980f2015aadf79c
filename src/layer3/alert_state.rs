// Alert State Machine - Per-entity severity tier with upward-edge firing
// Recorded tier is overwritten every tick; only a climb to a higher tier fires

use serde::Serialize;
use std::collections::HashMap;

use crate::core::config::AlertThreshold;
use crate::core::types::Entity;
use crate::layer3::transform::{check_alert_edge, AlertEvent};

/// Severity tier. `Level(i)` indexes the ascending threshold ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum AlertTier {
    #[default]
    None,
    Level(usize),
}

/// Ordered ladder of alert thresholds, ascending
#[derive(Debug, Clone)]
pub struct AlertLadder {
    thresholds: Vec<AlertThreshold>,
}

impl AlertLadder {
    pub fn new(mut thresholds: Vec<AlertThreshold>) -> Self {
        thresholds.sort_by_key(|t| t.threshold);
        Self { thresholds }
    }

    /// Highest tier whose threshold is at or below `value`
    pub fn tier_for(&self, value: i32) -> AlertTier {
        self.thresholds
            .iter()
            .rposition(|t| value >= t.threshold)
            .map(AlertTier::Level)
            .unwrap_or(AlertTier::None)
    }

    pub fn threshold(&self, tier: AlertTier) -> Option<&AlertThreshold> {
        match tier {
            AlertTier::None => None,
            AlertTier::Level(i) => self.thresholds.get(i),
        }
    }

    pub fn thresholds(&self) -> &[AlertThreshold] {
        &self.thresholds
    }
}

/// Recorded state of one entity
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AlertState {
    #[serde(skip)]
    pub tier: AlertTier,
    /// Severity id of the recorded tier, `None` below every threshold
    pub severity: Option<String>,
    pub value: i32,
}

/// Entity currently sitting in a non-None tier
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActiveAlert {
    pub entity_id: String,
    pub entity_name: String,
    pub severity: String,
    pub label: String,
    pub threshold: i32,
    pub value: i32,
    pub action: String,
}

pub struct AlertStateMachine {
    ladder: AlertLadder,
    states: HashMap<String, AlertState>,
}

impl AlertStateMachine {
    pub fn new(thresholds: Vec<AlertThreshold>) -> Self {
        Self {
            ladder: AlertLadder::new(thresholds),
            states: HashMap::new(),
        }
    }

    /// Feed the current value. Returns the alert when the implied tier climbs above the recorded one.
    pub fn observe(&mut self, entity_id: &str, value: i32) -> Option<AlertEvent> {
        let implied = self.ladder.tier_for(value);
        let state = self.states.entry(entity_id.to_string()).or_default();

        let fired = if implied > state.tier {
            check_alert_edge(state.value, value, self.ladder.thresholds())
        } else {
            None
        };

        *state = AlertState {
            tier: implied,
            severity: self.ladder.threshold(implied).map(|t| t.severity.clone()),
            value,
        };
        fired
    }

    pub fn state(&self, entity_id: &str) -> Option<&AlertState> {
        self.states.get(entity_id)
    }

    /// Entities in a non-None tier, in the given entity order
    pub fn active(&self, entities: &[Entity]) -> Vec<ActiveAlert> {
        entities
            .iter()
            .filter_map(|entity| {
                let state = self.states.get(&entity.id)?;
                let threshold = self.ladder.threshold(state.tier)?;
                Some(ActiveAlert {
                    entity_id: entity.id.clone(),
                    entity_name: entity.name.clone(),
                    severity: threshold.severity.clone(),
                    label: threshold.label.clone(),
                    threshold: threshold.threshold,
                    value: state.value,
                    action: threshold.action.clone(),
                })
            })
            .collect()
    }

    pub fn ladder(&self) -> &AlertLadder {
        &self.ladder
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::default_alert_thresholds;
    use crate::core::types::EntityCategory;

    fn single() -> AlertStateMachine {
        AlertStateMachine::new(vec![AlertThreshold::new(150, "WARNING", "W", "limit")])
    }

    #[test]
    fn test_edge_sequence_fires_twice() {
        let mut machine = single();
        let fired: Vec<usize> = [90, 160, 170, 140, 165]
            .iter()
            .enumerate()
            .filter_map(|(i, &v)| machine.observe("ward_1", v).map(|_| i))
            .collect();
        assert_eq!(fired, vec![1, 4]);
    }

    #[test]
    fn test_tier_for() {
        let ladder = AlertLadder::new(default_alert_thresholds());
        assert_eq!(ladder.tier_for(149), AlertTier::None);
        assert_eq!(ladder.tier_for(150), AlertTier::Level(0));
        assert_eq!(ladder.tier_for(299), AlertTier::Level(1));
        assert_eq!(ladder.tier_for(500), AlertTier::Level(2));
        assert!(AlertTier::None < AlertTier::Level(0));
        assert!(AlertTier::Level(0) < AlertTier::Level(2));
    }

    #[test]
    fn test_ladder_sorts_unordered_input() {
        let mut thresholds = default_alert_thresholds();
        thresholds.reverse();
        let ladder = AlertLadder::new(thresholds);
        assert_eq!(ladder.thresholds()[0].threshold, 150);
        assert_eq!(ladder.tier_for(210), AlertTier::Level(1));
    }

    #[test]
    fn test_climb_through_tiers_fires_each_rung() {
        let mut machine = AlertStateMachine::new(default_alert_thresholds());
        assert_eq!(machine.observe("w", 160).unwrap().severity, "WARNING");
        assert_eq!(machine.observe("w", 220).unwrap().severity, "CRITICAL");
        assert_eq!(machine.observe("w", 350).unwrap().severity, "EMERGENCY");
        assert!(machine.observe("w", 320).is_none());
    }

    #[test]
    fn test_partial_drop_then_reclimb() {
        let mut machine = AlertStateMachine::new(default_alert_thresholds());
        assert!(machine.observe("w", 250).is_some());
        // CRITICAL -> WARNING, then back to CRITICAL
        assert!(machine.observe("w", 180).is_none());
        let alert = machine.observe("w", 230).unwrap();
        assert_eq!(alert.severity, "CRITICAL");
        assert_eq!(alert.previous_value, 180);
    }

    #[test]
    fn test_state_recorded_every_tick() {
        let mut machine = single();
        machine.observe("ward_1", 170);
        machine.observe("ward_1", 120);
        let state = machine.state("ward_1").unwrap();
        assert_eq!(state.tier, AlertTier::None);
        assert_eq!(state.severity, None);
        assert_eq!(state.value, 120);
        assert!(machine.state("ward_2").is_none());
    }

    #[test]
    fn test_active_alerts_follow_recorded_tier() {
        let entities = vec![
            Entity::new("ward_1", "Ward 1", EntityCategory::Residential, 85),
            Entity::new("ward_2", "Ward 2", EntityCategory::Park, 45),
        ];
        let mut machine = AlertStateMachine::new(default_alert_thresholds());
        machine.observe("ward_1", 260);
        machine.observe("ward_2", 60);

        let active = machine.active(&entities);
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].entity_id, "ward_1");
        assert_eq!(active[0].severity, "CRITICAL");
        assert_eq!(active[0].value, 260);

        machine.observe("ward_1", 100);
        assert!(machine.active(&entities).is_empty());
    }
}
