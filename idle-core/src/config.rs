use serde::{Deserialize, Serialize};

/// Tunable engine constants. `Default` is the shipped balance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Goal RNG seed; `None` seeds from the clock at construction
    pub seed: Option<u64>,
    /// Income multiplier while dev mode is on
    pub dev_multiplier: f64,
    /// Research points every completion awards before bonuses
    pub research_award_base: f64,
    /// Share of a higher tier's first-building income paid per completion
    pub patronage_rate: f64,
    /// Auto-builders skip purchases costing more than this share of currency
    pub autobuild_treasury_cap: f64,
    /// Floor on the combined cost-reduction factor
    pub min_cost_factor: f64,
    /// A purchase leaving less than this share of its cost counts as near-bankrupt
    pub near_bankruptcy_ratio: f64,
    /// ...but only for purchases at least this expensive
    pub near_bankruptcy_min_cost: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            seed: None,
            dev_multiplier: 1000.0,
            research_award_base: 10.0,
            patronage_rate: 0.05,
            autobuild_treasury_cap: 0.05,
            min_cost_factor: 0.1,
            near_bankruptcy_ratio: 0.01,
            near_bankruptcy_min_cost: 1_000.0,
        }
    }
}

impl EngineConfig {
    pub fn seeded(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let cfg: EngineConfig =
            serde_json::from_str(r#"{"seed": 42, "dev_multiplier": 10.0}"#).unwrap();
        assert_eq!(cfg.seed, Some(42));
        assert_eq!(cfg.dev_multiplier, 10.0);
        assert_eq!(cfg.research_award_base, 10.0);
    }
}
