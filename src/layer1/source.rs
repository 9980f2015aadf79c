// Source Adapters - Produce one Reading per entity per tick
// SyntheticSource simulates sensors, ReplaySource replays recorded values

use chrono::{Local, Timelike, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use std::collections::{HashMap, VecDeque};
use thiserror::Error;
use tracing::debug;

use crate::core::types::{round1, Entity, Reading};

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("No data for entity '{0}'")]
    Exhausted(String),
    #[error("Source unavailable for entity '{entity_id}': {reason}")]
    Unavailable { entity_id: String, reason: String },
}

/// Anything able to produce a Reading for an entity on demand.
///
/// Values outside the configured valid range are accepted here and clamped by the pipeline.
pub trait ReadingSource: Send {
    fn read(&mut self, entity: &Entity, tick: u64) -> Result<Reading, SourceError>;
}

// ============================================================================
// Synthetic Source
// ============================================================================

/// Baseline × time-of-day factor, sinusoidal drift, gaussian noise and
/// occasional bursts for emitter categories.
pub struct SyntheticSource {
    rng: StdRng,
    valid_min: i32,
    valid_max: i32,
    burst_probability: f64,
    fixed_hour: Option<u32>,
}

impl SyntheticSource {
    pub fn new(valid_min: i32, valid_max: i32) -> Self {
        Self {
            rng: StdRng::from_entropy(),
            valid_min,
            valid_max,
            burst_probability: 0.05,
            fixed_hour: None,
        }
    }

    /// Deterministic source for tests and demos
    pub fn seeded(seed: u64, valid_min: i32, valid_max: i32) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            ..Self::new(valid_min, valid_max)
        }
    }

    /// Pin the hour used for the time-of-day factor
    pub fn with_fixed_hour(mut self, hour: u32) -> Self {
        self.fixed_hour = Some(hour);
        self
    }

    pub fn with_burst_probability(mut self, probability: f64) -> Self {
        self.burst_probability = probability.clamp(0.0, 1.0);
        self
    }

    fn time_factor(hour: u32) -> f64 {
        match hour {
            7..=9 => 1.25,
            17..=20 => 1.20,
            0..=5 => 0.75,
            _ => 1.0,
        }
    }

    /// Zero-mean normal noise with standard deviation `sigma`
    fn gaussian(&mut self, sigma: f64) -> f64 {
        let z: f64 = self.rng.sample(StandardNormal);
        sigma * z
    }
}

impl ReadingSource for SyntheticSource {
    fn read(&mut self, entity: &Entity, tick: u64) -> Result<Reading, SourceError> {
        let hour = self.fixed_hour.unwrap_or_else(|| Local::now().hour());
        let drift = (tick as f64 * 0.3).sin() * 12.0;
        let noise = self.gaussian(8.0);

        let raw = entity.baseline as f64 * Self::time_factor(hour) + drift + noise;
        let mut value = (raw as i32).clamp(self.valid_min, self.valid_max);

        let mut burst = false;
        if entity.category.is_emitter() && self.rng.gen_bool(self.burst_probability) {
            value = (value + self.rng.gen_range(40..=80)).min(self.valid_max);
            burst = true;
            debug!(entity = %entity.id, value = value, "Synthetic emission burst");
        }

        let v = value as f64;
        let pm25 = round1(v * 0.6 + self.gaussian(3.0));
        let pm10 = round1(v * 0.9 + self.gaussian(5.0));
        let no2 = round1(v * 0.3 + self.gaussian(2.0));
        let co = ((v * 0.02 + self.gaussian(0.5)) * 100.0).round() / 100.0;

        Ok(Reading::new(&entity.id, tick, value, pm25, pm10, no2, co, burst, Utc::now()))
    }
}

// ============================================================================
// Replay Source
// ============================================================================

/// Replays a fixed sequence of values per entity, one per read
#[derive(Default)]
pub struct ReplaySource {
    values: HashMap<String, VecDeque<i32>>,
}

impl ReplaySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_values(mut self, entity_id: &str, values: &[i32]) -> Self {
        self.push_values(entity_id, values);
        self
    }

    pub fn push_values(&mut self, entity_id: &str, values: &[i32]) {
        self.values
            .entry(entity_id.to_string())
            .or_default()
            .extend(values.iter().copied());
    }

    pub fn remaining(&self, entity_id: &str) -> usize {
        self.values.get(entity_id).map(|v| v.len()).unwrap_or(0)
    }
}

impl ReadingSource for ReplaySource {
    fn read(&mut self, entity: &Entity, tick: u64) -> Result<Reading, SourceError> {
        let value = self
            .values
            .get_mut(&entity.id)
            .and_then(|queue| queue.pop_front())
            .ok_or_else(|| SourceError::Exhausted(entity.id.clone()))?;

        let v = value as f64;
        Ok(Reading::new(
            &entity.id,
            tick,
            value,
            round1(v * 0.6),
            round1(v * 0.9),
            round1(v * 0.3),
            (v * 0.02 * 100.0).round() / 100.0,
            false,
            Utc::now(),
        ))
    }
}
