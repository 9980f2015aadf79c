// Advisory Document Store - Static guidelines keyed by AQI level
// Read-only lookup, no state

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::OnceLock;

use crate::core::types::AqiLevel;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Guideline {
    pub range: &'static str,
    pub desc: &'static str,
}

#[derive(Debug, Serialize)]
pub struct DocumentStore {
    pub who_guidelines: BTreeMap<&'static str, Guideline>,
    pub govt_rules: Vec<&'static str>,
    pub heatwave_advisory: &'static str,
    pub elderly_advice: BTreeMap<&'static str, &'static str>,
}

/// Advisory material applicable to one value
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdvisoryContext {
    pub level: AqiLevel,
    pub who_guideline: Guideline,
    pub govt_rules: Vec<&'static str>,
    pub elderly_advice: &'static str,
    pub heatwave: Option<&'static str>,
}

static DOCUMENT_STORE: OnceLock<DocumentStore> = OnceLock::new();

pub fn document_store() -> &'static DocumentStore {
    DOCUMENT_STORE.get_or_init(|| {
        let mut who_guidelines = BTreeMap::new();
        who_guidelines.insert("good", Guideline { range: "0-50", desc: "Air quality is satisfactory. No risk." });
        who_guidelines.insert("satisfactory", Guideline { range: "51-100", desc: "Minor discomfort for sensitive people." });
        who_guidelines.insert("moderate", Guideline {
            range: "101-200",
            desc: "Breathing discomfort for heart/lung disease patients, children and older adults.",
        });
        who_guidelines.insert("poor", Guideline { range: "201-300", desc: "Breathing discomfort for most people on prolonged exposure." });
        who_guidelines.insert("very_poor", Guideline {
            range: "301-400",
            desc: "Respiratory illness on prolonged exposure. Effect on healthy people.",
        });
        who_guidelines.insert("severe", Guideline {
            range: "401-500",
            desc: "Health impacts even on healthy people. SERIOUS impact on sensitive groups.",
        });

        let mut elderly_advice = BTreeMap::new();
        elderly_advice.insert("aqi_100", "Limit prolonged outdoor exertion.");
        elderly_advice.insert("aqi_150", "Avoid outdoor activity during peak hours.");
        elderly_advice.insert("aqi_200", "Stay indoors. Use air purifiers.");
        elderly_advice.insert("aqi_300", "Emergency level. Seek medical attention if respiratory symptoms occur.");

        DocumentStore {
            who_guidelines,
            govt_rules: vec![
                "Industries must halt operations when AQI > 300 (GRAP Stage III)",
                "Construction banned when AQI > 200 in Delhi NCR",
                "Odd-even vehicle scheme activated when AQI > 400",
                "Schools & colleges close when AQI > 350",
                "Emergency health advisory issued when AQI > 400",
            ],
            heatwave_advisory: "During heatwave + high AQI: Stay indoors 12PM-4PM, use N95 masks, avoid strenuous activity, keep hydrated.",
            elderly_advice,
        }
    })
}

/// Guideline, applicable rules and advice for a value
pub fn advisory_for(value: i32) -> AdvisoryContext {
    let store = document_store();
    let level = AqiLevel::from_value(value);

    let rule_count = match value {
        v if v > 300 => 3,
        v if v > 200 => 2,
        v if v > 150 => 1,
        _ => 0,
    };

    let elderly_key = match value {
        v if v >= 300 => "aqi_300",
        v if v >= 200 => "aqi_200",
        v if v >= 150 => "aqi_150",
        _ => "aqi_100",
    };

    AdvisoryContext {
        level,
        who_guideline: store.who_guidelines[level.key()],
        govt_rules: store.govt_rules.iter().take(rule_count).copied().collect(),
        elderly_advice: store.elderly_advice[elderly_key],
        heatwave: (value > 150).then_some(store.heatwave_advisory),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_level_has_guideline() {
        let store = document_store();
        for level in AqiLevel::ALL {
            assert!(store.who_guidelines.contains_key(level.key()));
        }
        assert_eq!(store.govt_rules.len(), 5);
    }

    #[test]
    fn test_clean_air_advisory() {
        let ctx = advisory_for(40);
        assert_eq!(ctx.level, AqiLevel::Good);
        assert_eq!(ctx.who_guideline.range, "0-50");
        assert!(ctx.govt_rules.is_empty());
        assert_eq!(ctx.elderly_advice, "Limit prolonged outdoor exertion.");
        assert!(ctx.heatwave.is_none());
    }

    #[test]
    fn test_rule_boundaries() {
        assert_eq!(advisory_for(150).govt_rules.len(), 0);
        assert_eq!(advisory_for(151).govt_rules.len(), 1);
        assert_eq!(advisory_for(201).govt_rules.len(), 2);
        assert_eq!(advisory_for(301).govt_rules.len(), 3);
    }

    #[test]
    fn test_elderly_and_heatwave() {
        let ctx = advisory_for(300);
        assert_eq!(ctx.elderly_advice, "Emergency level. Seek medical attention if respiratory symptoms occur.");
        assert!(ctx.heatwave.is_some());
        assert_eq!(ctx.level, AqiLevel::Poor);

        assert_eq!(advisory_for(150).elderly_advice, "Avoid outdoor activity during peak hours.");
        assert!(advisory_for(150).heatwave.is_none());
    }
}
