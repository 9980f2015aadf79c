// Core Type Definitions for Air Watch
// Entities, readings and the AQI level ladder

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Enums
// ============================================================================

/// Category tag of a monitored entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityCategory {
    Residential,
    Park,
    Traffic,
    Mixed,
    Commercial,
    Industrial,
}

impl EntityCategory {
    /// Categories whose sources emit occasional emission bursts
    pub fn is_emitter(&self) -> bool {
        matches!(self, EntityCategory::Industrial | EntityCategory::Traffic)
    }
}

impl fmt::Display for EntityCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::str::FromStr for EntityCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "residential" => Ok(EntityCategory::Residential),
            "park" => Ok(EntityCategory::Park),
            "traffic" => Ok(EntityCategory::Traffic),
            "mixed" => Ok(EntityCategory::Mixed),
            "commercial" => Ok(EntityCategory::Commercial),
            "industrial" => Ok(EntityCategory::Industrial),
            _ => Err(format!("Invalid EntityCategory: '{}'", s)),
        }
    }
}

/// Air quality level derived from a value
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AqiLevel {
    Good,
    Satisfactory,
    Moderate,
    Poor,
    #[serde(rename = "Very Poor")]
    VeryPoor,
    Severe,
}

impl AqiLevel {
    pub fn from_value(value: i32) -> Self {
        match value {
            v if v <= 50 => AqiLevel::Good,
            v if v <= 100 => AqiLevel::Satisfactory,
            v if v <= 200 => AqiLevel::Moderate,
            v if v <= 300 => AqiLevel::Poor,
            v if v <= 400 => AqiLevel::VeryPoor,
            _ => AqiLevel::Severe,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AqiLevel::Good => "Good",
            AqiLevel::Satisfactory => "Satisfactory",
            AqiLevel::Moderate => "Moderate",
            AqiLevel::Poor => "Poor",
            AqiLevel::VeryPoor => "Very Poor",
            AqiLevel::Severe => "Severe",
        }
    }

    /// Key used by the advisory document store
    pub fn key(&self) -> &'static str {
        match self {
            AqiLevel::Good => "good",
            AqiLevel::Satisfactory => "satisfactory",
            AqiLevel::Moderate => "moderate",
            AqiLevel::Poor => "poor",
            AqiLevel::VeryPoor => "very_poor",
            AqiLevel::Severe => "severe",
        }
    }

    pub const ALL: [AqiLevel; 6] = [
        AqiLevel::Good,
        AqiLevel::Satisfactory,
        AqiLevel::Moderate,
        AqiLevel::Poor,
        AqiLevel::VeryPoor,
        AqiLevel::Severe,
    ];
}

impl fmt::Display for AqiLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

// ============================================================================
// Entity
// ============================================================================

/// A monitored source. Static configuration, loaded once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    pub name: String,
    pub category: EntityCategory,
    /// Only meaningful to the synthetic generator
    pub baseline: i32,
}

impl Entity {
    pub fn new(id: &str, name: &str, category: EntityCategory, baseline: i32) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            category,
            baseline,
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity(id={}, name={}, category={})", self.id, self.name, self.category)
    }
}

/// The eight city wards monitored out of the box
pub fn default_entities() -> Vec<Entity> {
    use EntityCategory::*;
    vec![
        Entity::new("ward_1", "Ward 1 - Central", Residential, 85),
        Entity::new("ward_2", "Ward 2 - North", Park, 45),
        Entity::new("ward_3", "Ward 3 - Traffic Hub", Traffic, 156),
        Entity::new("ward_4", "Ward 4 - East", Mixed, 120),
        Entity::new("ward_5", "Ward 5 - West", Commercial, 98),
        Entity::new("ward_6", "Ward 6 - Industrial", Industrial, 210),
        Entity::new("ward_7", "Ward 7 - South", Residential, 112),
        Entity::new("ward_8", "Ward 8 - Market Area", Commercial, 145),
    ]
}

// ============================================================================
// Reading
// ============================================================================

/// One observation of one entity at one tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub entity_id: String,
    pub tick: u64,
    pub value: i32,
    pub pm25: f64,
    pub pm10: f64,
    pub no2: f64,
    pub co: f64,
    /// Anomaly flag reported by the source itself
    pub anomaly: bool,
    pub captured_at: DateTime<Utc>,
}

impl Reading {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        entity_id: &str,
        tick: u64,
        value: i32,
        pm25: f64,
        pm10: f64,
        no2: f64,
        co: f64,
        anomaly: bool,
        captured_at: DateTime<Utc>,
    ) -> Self {
        Self {
            entity_id: entity_id.to_string(),
            tick,
            value,
            pm25,
            pm10,
            no2,
            co,
            anomaly,
            captured_at,
        }
    }

    /// Reading with only a primary value, secondary measurements zeroed
    pub fn from_value(entity_id: &str, tick: u64, value: i32) -> Self {
        Self::new(entity_id, tick, value, 0.0, 0.0, 0.0, 0.0, false, Utc::now())
    }

    /// Copy of this reading with the value clamped into `[min, max]`
    pub fn clamped(&self, min: i32, max: i32) -> Reading {
        Reading {
            value: self.value.clamp(min, max),
            ..self.clone()
        }
    }

    pub fn level(&self) -> AqiLevel {
        AqiLevel::from_value(self.value)
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Reading(entity={}, tick={}, value={}, anomaly={})",
            self.entity_id, self.tick, self.value, self.anomaly
        )
    }
}

/// Round to one decimal place
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aqi_level_boundaries() {
        assert_eq!(AqiLevel::from_value(50), AqiLevel::Good);
        assert_eq!(AqiLevel::from_value(51), AqiLevel::Satisfactory);
        assert_eq!(AqiLevel::from_value(200), AqiLevel::Moderate);
        assert_eq!(AqiLevel::from_value(201), AqiLevel::Poor);
        assert_eq!(AqiLevel::from_value(400), AqiLevel::VeryPoor);
        assert_eq!(AqiLevel::from_value(401), AqiLevel::Severe);
        assert!(AqiLevel::Good < AqiLevel::Severe);
    }

    #[test]
    fn test_aqi_level_serializes_label() {
        let json = serde_json::to_string(&AqiLevel::VeryPoor).unwrap();
        assert_eq!(json, "\"Very Poor\"");
    }

    #[test]
    fn test_reading_clamp() {
        let reading = Reading::from_value("ward_1", 3, 720);
        let clamped = reading.clamped(10, 500);
        assert_eq!(clamped.value, 500);
        assert_eq!(clamped.tick, 3);
        assert_eq!(reading.value, 720);

        let low = Reading::from_value("ward_1", 4, -5).clamped(10, 500);
        assert_eq!(low.value, 10);
    }

    #[test]
    fn test_category_parse() {
        assert_eq!("Industrial".parse::<EntityCategory>(), Ok(EntityCategory::Industrial));
        assert!("volcano".parse::<EntityCategory>().is_err());
        assert!(EntityCategory::Traffic.is_emitter());
        assert!(!EntityCategory::Park.is_emitter());
    }

    #[test]
    fn test_default_entities() {
        let entities = default_entities();
        assert_eq!(entities.len(), 8);
        assert_eq!(entities[0].id, "ward_1");
        assert_eq!(entities[5].category, EntityCategory::Industrial);
    }

    #[test]
    fn test_round1() {
        assert_eq!(round1(123.456), 123.5);
        assert_eq!(round1(200.0), 200.0);
    }
}
