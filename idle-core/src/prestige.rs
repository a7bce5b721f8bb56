use serde::{Deserialize, Serialize};

use crate::types::Tier;

// ============================================================================
// Prestige Effects
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PrestigeEffect {
    IncomeMultiplier { value: f64 },
    CostReduction { value: f64 },
    StartingCurrency { value: f64 },
    ResearchBonus { value: f64 },
    BuildingBoost { tier: Tier, value: f64 },
}

/// Run-wide prestige effects; `BuildingBoost` is per tier and aggregated
/// separately by `building_boost`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrestigeEffectKind {
    IncomeMultiplier,
    CostReduction,
    StartingCurrency,
    ResearchBonus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrestigeUpgrade {
    pub id: String,
    pub name: String,
    pub tier: Tier, // Paid with this tier's prestige currency
    pub cost: u64,
    pub effect: PrestigeEffect,
    pub purchased: bool,
    pub prerequisite: Option<String>,
}

/// Prestige currency a tier yields for `completions` settlements this run
pub fn prestige_currency_for(completions: u64) -> u64 {
    (completions as f64).sqrt().floor() as u64
}

fn upgrade(
    id: &str,
    name: &str,
    tier: Tier,
    cost: u64,
    effect: PrestigeEffect,
    prerequisite: Option<&str>,
) -> PrestigeUpgrade {
    PrestigeUpgrade {
        id: id.to_string(),
        name: name.to_string(),
        tier,
        cost,
        effect,
        purchased: false,
        prerequisite: prerequisite.map(str::to_string),
    }
}

pub fn seed_prestige_catalog() -> Vec<PrestigeUpgrade> {
    use PrestigeEffect::*;
    vec![
        upgrade(
            "prestige_income_1",
            "Ancestral Wealth",
            Tier::Hamlet,
            1,
            IncomeMultiplier { value: 0.25 },
            None,
        ),
        upgrade(
            "prestige_income_2",
            "Dynastic Wealth",
            Tier::Hamlet,
            3,
            IncomeMultiplier { value: 0.5 },
            Some("prestige_income_1"),
        ),
        upgrade(
            "prestige_start_1",
            "Inheritance",
            Tier::Hamlet,
            1,
            StartingCurrency { value: 50.0 },
            None,
        ),
        upgrade(
            "prestige_cost_1",
            "Guild Memory",
            Tier::Hamlet,
            2,
            CostReduction { value: 0.1 },
            None,
        ),
        upgrade(
            "prestige_hamlet_boost",
            "Hamlet Traditions",
            Tier::Hamlet,
            2,
            BuildingBoost { tier: Tier::Hamlet, value: 0.5 },
            None,
        ),
        upgrade(
            "prestige_research_1",
            "Old Libraries",
            Tier::Village,
            1,
            ResearchBonus { value: 0.25 },
            None,
        ),
        upgrade(
            "prestige_village_boost",
            "Village Traditions",
            Tier::Village,
            2,
            BuildingBoost { tier: Tier::Village, value: 0.5 },
            None,
        ),
        upgrade(
            "prestige_cost_2",
            "Master Builders",
            Tier::Village,
            3,
            CostReduction { value: 0.15 },
            Some("prestige_cost_1"),
        ),
        upgrade(
            "prestige_town_boost",
            "Town Traditions",
            Tier::Town,
            1,
            BuildingBoost { tier: Tier::Town, value: 0.5 },
            None,
        ),
        upgrade(
            "prestige_research_2",
            "Royal Archives",
            Tier::Town,
            2,
            ResearchBonus { value: 0.5 },
            Some("prestige_research_1"),
        ),
    ]
}

fn purchased(catalog: &[PrestigeUpgrade]) -> impl Iterator<Item = &PrestigeEffect> {
    catalog.iter().filter(|u| u.purchased).map(|u| &u.effect)
}

/// Aggregate purchased effects of one kind.
///
/// Multipliers come back as factors (income and research `1 + Σ`, cost
/// `Π (1 - v)`); starting currency is the flat sum.
pub fn aggregate(catalog: &[PrestigeUpgrade], kind: PrestigeEffectKind) -> f64 {
    match kind {
        PrestigeEffectKind::IncomeMultiplier => {
            1.0 + purchased(catalog)
                .map(|e| match e {
                    PrestigeEffect::IncomeMultiplier { value } => *value,
                    _ => 0.0,
                })
                .sum::<f64>()
        }
        PrestigeEffectKind::ResearchBonus => {
            1.0 + purchased(catalog)
                .map(|e| match e {
                    PrestigeEffect::ResearchBonus { value } => *value,
                    _ => 0.0,
                })
                .sum::<f64>()
        }
        PrestigeEffectKind::CostReduction => purchased(catalog)
            .map(|e| match e {
                PrestigeEffect::CostReduction { value } => 1.0 - value,
                _ => 1.0,
            })
            .product(),
        PrestigeEffectKind::StartingCurrency => purchased(catalog)
            .map(|e| match e {
                PrestigeEffect::StartingCurrency { value } => *value,
                _ => 0.0,
            })
            .sum(),
    }
}

/// Income factor for buildings of `tier`: 1 + Σ matching building boosts
pub fn building_boost(catalog: &[PrestigeUpgrade], tier: Tier) -> f64 {
    1.0 + purchased(catalog)
        .map(|e| match e {
            PrestigeEffect::BuildingBoost { tier: t, value } if *t == tier => *value,
            _ => 0.0,
        })
        .sum::<f64>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prestige_currency_is_floor_sqrt() {
        assert_eq!(prestige_currency_for(0), 0);
        assert_eq!(prestige_currency_for(1), 1);
        assert_eq!(prestige_currency_for(3), 1);
        assert_eq!(prestige_currency_for(4), 2);
        assert_eq!(prestige_currency_for(24), 4);
        assert_eq!(prestige_currency_for(25), 5);
    }

    #[test]
    fn test_aggregate_defaults_are_neutral() {
        let catalog = seed_prestige_catalog();
        assert_eq!(aggregate(&catalog, PrestigeEffectKind::IncomeMultiplier), 1.0);
        assert_eq!(aggregate(&catalog, PrestigeEffectKind::CostReduction), 1.0);
        assert_eq!(aggregate(&catalog, PrestigeEffectKind::StartingCurrency), 0.0);
        assert_eq!(building_boost(&catalog, Tier::Hamlet), 1.0);
    }

    #[test]
    fn test_aggregate_purchased() {
        let mut catalog = seed_prestige_catalog();
        for u in catalog.iter_mut() {
            if matches!(
                u.id.as_str(),
                "prestige_income_1" | "prestige_cost_1" | "prestige_hamlet_boost"
            ) {
                u.purchased = true;
            }
        }
        assert_eq!(aggregate(&catalog, PrestigeEffectKind::IncomeMultiplier), 1.25);
        assert!((aggregate(&catalog, PrestigeEffectKind::CostReduction) - 0.9).abs() < 1e-12);
        assert_eq!(building_boost(&catalog, Tier::Hamlet), 1.5);
        assert_eq!(building_boost(&catalog, Tier::Village), 1.0);
    }
}
