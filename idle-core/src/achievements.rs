use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::Tier;

// ============================================================================
// Conditions and Bonuses
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AchievementCondition {
    TierCompletions { tier: Tier, count: u64 },
    TotalCompletions { count: u64 },
    PrestigeCount { count: u32 },
    /// A settlement completed within `max_secs` of being founded
    SpeedCompletion { max_secs: f64 },
    MaxBuildingCount { count: u32 },
    MaxCurrencyHeld { amount: f64 },
    SettlementCount { count: usize },
    ResearchPurchases { count: u32 },
    NearBankruptcy,
    SpecificBuildingCount { building_id: String, count: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AchievementBonus {
    IncomeMultiplier { value: f64 },
    CostReduction { value: f64 },
    ResearchBonus { value: f64 },
    StartingCurrency { value: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AchievementBonusKind {
    IncomeMultiplier,
    CostReduction,
    ResearchBonus,
    StartingCurrency,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Achievement {
    pub id: String,
    pub name: String,
    pub description: String,
    pub condition: AchievementCondition,
    pub bonus: AchievementBonus,
    pub unlocked: bool, // Sticky
}

/// Everything achievement conditions look at, borrowed from the game state
#[derive(Debug, Clone, Copy)]
pub struct AchievementContext<'a> {
    pub completed_counts: &'a BTreeMap<Tier, u64>,
    pub lifetime_completions: u64,
    pub prestige_count: u32,
    pub fastest_completion_secs: Option<f64>,
    pub building_high_water: &'a BTreeMap<String, u32>,
    pub max_currency_held: f64,
    pub live_settlements: usize,
    pub research_purchases: u32,
    pub near_bankruptcy: bool,
}

impl AchievementCondition {
    pub fn is_met(&self, ctx: &AchievementContext<'_>) -> bool {
        match self {
            AchievementCondition::TierCompletions { tier, count } => {
                ctx.completed_counts.get(tier).copied().unwrap_or(0) >= *count
            }
            AchievementCondition::TotalCompletions { count } => ctx.lifetime_completions >= *count,
            AchievementCondition::PrestigeCount { count } => ctx.prestige_count >= *count,
            AchievementCondition::SpeedCompletion { max_secs } => ctx
                .fastest_completion_secs
                .is_some_and(|secs| secs <= *max_secs),
            AchievementCondition::MaxBuildingCount { count } => {
                ctx.building_high_water.values().copied().max().unwrap_or(0) >= *count
            }
            AchievementCondition::MaxCurrencyHeld { amount } => ctx.max_currency_held >= *amount,
            AchievementCondition::SettlementCount { count } => ctx.live_settlements >= *count,
            AchievementCondition::ResearchPurchases { count } => ctx.research_purchases >= *count,
            AchievementCondition::NearBankruptcy => ctx.near_bankruptcy,
            AchievementCondition::SpecificBuildingCount { building_id, count } => {
                ctx.building_high_water.get(building_id).copied().unwrap_or(0) >= *count
            }
        }
    }
}

/// Unlock every locked achievement whose condition holds; returns new ids
pub fn unlock_met(catalog: &mut [Achievement], ctx: &AchievementContext<'_>) -> Vec<String> {
    catalog
        .iter_mut()
        .filter(|a| !a.unlocked && a.condition.is_met(ctx))
        .map(|a| {
            a.unlocked = true;
            a.id.clone()
        })
        .collect()
}

/// Aggregate unlocked bonuses: income/research `1 + Σ`, cost `Π (1 - v)`,
/// starting currency flat `Σ`
pub fn aggregate(catalog: &[Achievement], kind: AchievementBonusKind) -> f64 {
    let unlocked = catalog.iter().filter(|a| a.unlocked).map(|a| a.bonus);
    match kind {
        AchievementBonusKind::IncomeMultiplier => {
            1.0 + unlocked
                .map(|b| match b {
                    AchievementBonus::IncomeMultiplier { value } => value,
                    _ => 0.0,
                })
                .sum::<f64>()
        }
        AchievementBonusKind::ResearchBonus => {
            1.0 + unlocked
                .map(|b| match b {
                    AchievementBonus::ResearchBonus { value } => value,
                    _ => 0.0,
                })
                .sum::<f64>()
        }
        AchievementBonusKind::CostReduction => unlocked
            .map(|b| match b {
                AchievementBonus::CostReduction { value } => 1.0 - value,
                _ => 1.0,
            })
            .product(),
        AchievementBonusKind::StartingCurrency => unlocked
            .map(|b| match b {
                AchievementBonus::StartingCurrency { value } => value,
                _ => 0.0,
            })
            .sum(),
    }
}

fn achievement(
    id: &str,
    name: &str,
    description: &str,
    condition: AchievementCondition,
    bonus: AchievementBonus,
) -> Achievement {
    Achievement {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        condition,
        bonus,
        unlocked: false,
    }
}

pub fn seed_achievements() -> Vec<Achievement> {
    use AchievementBonus as B;
    use AchievementCondition as C;
    vec![
        achievement(
            "first_steps",
            "First Steps",
            "Complete a settlement",
            C::TotalCompletions { count: 1 },
            B::IncomeMultiplier { value: 0.05 },
        ),
        achievement(
            "seasoned",
            "Seasoned Founder",
            "Complete 100 settlements",
            C::TotalCompletions { count: 100 },
            B::IncomeMultiplier { value: 0.1 },
        ),
        achievement(
            "hamlet_veteran",
            "Hamlet Veteran",
            "Complete 25 hamlets in one run",
            C::TierCompletions { tier: Tier::Hamlet, count: 25 },
            B::CostReduction { value: 0.05 },
        ),
        achievement(
            "village_founder",
            "Village Founder",
            "Complete a village",
            C::TierCompletions { tier: Tier::Village, count: 1 },
            B::ResearchBonus { value: 0.1 },
        ),
        achievement(
            "town_founder",
            "Town Founder",
            "Complete a town",
            C::TierCompletions { tier: Tier::Town, count: 1 },
            B::IncomeMultiplier { value: 0.1 },
        ),
        achievement(
            "reborn",
            "Reborn",
            "Prestige once",
            C::PrestigeCount { count: 1 },
            B::StartingCurrency { value: 25.0 },
        ),
        achievement(
            "speedrunner",
            "Speedrunner",
            "Complete a settlement within a minute of founding it",
            C::SpeedCompletion { max_secs: 60.0 },
            B::IncomeMultiplier { value: 0.05 },
        ),
        achievement(
            "builder",
            "Master Builder",
            "Own 50 of a single building",
            C::MaxBuildingCount { count: 50 },
            B::CostReduction { value: 0.03 },
        ),
        achievement(
            "hoarder",
            "Hoarder",
            "Hold a million currency in one settlement",
            C::MaxCurrencyHeld { amount: 1_000_000.0 },
            B::ResearchBonus { value: 0.1 },
        ),
        achievement(
            "sprawl",
            "Urban Sprawl",
            "Run 5 settlements at once",
            C::SettlementCount { count: 5 },
            B::IncomeMultiplier { value: 0.05 },
        ),
        achievement(
            "scholar",
            "Scholar",
            "Purchase 10 research upgrades",
            C::ResearchPurchases { count: 10 },
            B::ResearchBonus { value: 0.1 },
        ),
        achievement(
            "on_the_brink",
            "On the Brink",
            "Spend nearly everything on a single costly building",
            C::NearBankruptcy,
            B::StartingCurrency { value: 10.0 },
        ),
        achievement(
            "hut_enthusiast",
            "Hut Enthusiast",
            "Own 25 huts in one hamlet",
            C::SpecificBuildingCount { building_id: "hamlet_hut".to_string(), count: 25 },
            B::IncomeMultiplier { value: 0.02 },
        ),
    ]
}
