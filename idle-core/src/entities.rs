use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::goals::Goal;
use crate::tiers::{Building, BuildingEffect, tier_definition};
use crate::types::{Millis, Tier};

// ============================================================================
// Settlement - The mutable unit of play
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settlement {
    pub id: String,
    pub tier: Tier,
    pub currency: f64,
    pub total_income: f64, // Building-derived income, recomputed on every purchase
    pub buildings: BTreeMap<String, u32>, // Every tier building, even at zero
    pub lifetime_earned: f64,
    pub total_spent: f64,
    pub created_at: Millis,
    pub completed: bool,
    pub goals: Vec<Goal>,
}

impl Settlement {
    pub fn new(
        id: String,
        tier: Tier,
        currency: f64,
        created_at: Millis,
        goals: Vec<Goal>,
    ) -> Self {
        let buildings = tier_definition(tier)
            .buildings
            .iter()
            .map(|b| (b.id.to_string(), 0))
            .collect();
        Self {
            id,
            tier,
            currency,
            total_income: 0.0,
            buildings,
            lifetime_earned: 0.0,
            total_spent: 0.0,
            created_at,
            completed: false,
            goals,
        }
    }

    pub fn count(&self, building_id: &str) -> u32 {
        self.buildings.get(building_id).copied().unwrap_or(0)
    }

    pub fn all_goals_complete(&self) -> bool {
        self.goals.iter().all(|g| g.completed)
    }

    /// Seconds since founding
    pub fn age_secs(&self, now: Millis) -> f64 {
        ((now - self.created_at) / 1000.0).max(0.0)
    }

    fn owned_effects(&self) -> impl Iterator<Item = (&'static Building, BuildingEffect, u32)> + '_ {
        tier_definition(self.tier).buildings.iter().filter_map(|b| {
            let count = self.count(b.id);
            match b.effect {
                Some(effect) if count > 0 => Some((b, effect, count)),
                _ => None,
            }
        })
    }

    /// Income from buildings alone, from scratch:
    /// `(Σ baseIncome × count + synergy + flat) × (1 + Σ multiplier × count)`
    pub fn compute_income(&self, flat_income: f64) -> f64 {
        let def = tier_definition(self.tier);
        let base: f64 = def
            .buildings
            .iter()
            .map(|b| b.base_income * f64::from(self.count(b.id)))
            .sum();

        let mut synergy = 0.0;
        let mut multiplier = 1.0;
        for (_, effect, count) in self.owned_effects() {
            match effect {
                BuildingEffect::IncomeMultiplier { value } => {
                    multiplier += value * f64::from(count)
                }
                BuildingEffect::SynergyBoost { target, value } => {
                    if let Some(t) = def.building(target) {
                        let target_count = f64::from(self.count(target));
                        synergy += t.base_income * target_count * value * f64::from(count);
                    }
                }
                BuildingEffect::CostReduction { .. }
                | BuildingEffect::CompletionBonus { .. }
                | BuildingEffect::GoalReduction { .. } => {}
            }
        }

        (base + synergy + flat_income) * multiplier
    }

    /// Π (1 - value)^count over owned cost-reduction buildings
    pub fn cost_reduction_stack(&self) -> f64 {
        self.owned_effects()
            .map(|(_, effect, count)| match effect {
                BuildingEffect::CostReduction { value } => (1.0 - value).powi(count as i32),
                _ => 1.0,
            })
            .product()
    }

    /// Π (1 - value)^count over owned goal-reduction buildings
    pub fn goal_reduction_stack(&self) -> f64 {
        self.owned_effects()
            .map(|(_, effect, count)| match effect {
                BuildingEffect::GoalReduction { value } => (1.0 - value).powi(count as i32),
                _ => 1.0,
            })
            .product()
    }

    /// Σ value × count over owned completion-bonus buildings
    pub fn completion_bonus(&self) -> f64 {
        self.owned_effects()
            .map(|(_, effect, count)| match effect {
                BuildingEffect::CompletionBonus { value } => value * f64::from(count),
                _ => 0.0,
            })
            .sum()
    }
}
