use crate::achievements::AchievementBonusKind;
use crate::entities::Settlement;
use crate::error::ActionError;
use crate::prestige::PrestigeEffectKind;
use crate::research;
use crate::tiers::{Building, tier_definition};
use crate::types::Tier;

use super::GameEngine;

/// Upper bound on units a single bulk projection walks through
const MAX_BULK_UNITS: u32 = 100_000;

/// `floor(baseCost × multiplier^owned × factor)`, never below 1
fn unit_cost(building: &Building, owned: u32, factor: f64) -> f64 {
    let raw = building.base_cost * building.cost_multiplier.powi(owned as i32) * factor;
    raw.floor().max(1.0)
}

impl GameEngine {
    fn lookup(
        &self,
        settlement_id: &str,
        building_id: &str,
    ) -> Result<(&Settlement, &'static Building), ActionError> {
        let settlement = self
            .state
            .settlement(settlement_id)
            .ok_or_else(|| ActionError::UnknownSettlement(settlement_id.to_string()))?;
        let building = tier_definition(settlement.tier)
            .building(building_id)
            .ok_or_else(|| ActionError::UnknownBuilding(building_id.to_string()))?;
        Ok((settlement, building))
    }

    /// Combined cost factor for a settlement at its current building counts:
    /// research × owned cost-reduction buildings × prestige × achievements
    fn cost_factor(&self, settlement: &Settlement) -> f64 {
        let factor = research::cost_factor(&self.state.research, settlement.tier)
            * settlement.cost_reduction_stack()
            * self.prestige_effect(PrestigeEffectKind::CostReduction)
            * self.achievement_effect(AchievementBonusKind::CostReduction);
        factor.max(self.config.min_cost_factor)
    }

    // ========================================================================
    // Cost projections (pure)
    // ========================================================================

    pub fn building_cost(&self, settlement_id: &str, building_id: &str) -> Option<f64> {
        let (settlement, building) = self.lookup(settlement_id, building_id).ok()?;
        Some(unit_cost(
            building,
            settlement.count(building.id),
            self.cost_factor(settlement),
        ))
    }

    /// Exact sum of the next `n` sequential unit costs.
    ///
    /// `None` for an unknown settlement or building, or when `n` exceeds
    /// `MAX_BULK_UNITS` (100 000).
    pub fn bulk_buy_cost(&self, settlement_id: &str, building_id: &str, n: u32) -> Option<f64> {
        if n > MAX_BULK_UNITS {
            return None;
        }
        let (settlement, building) = self.lookup(settlement_id, building_id).ok()?;
        let owned = settlement.count(building.id);
        let factor = self.cost_factor(settlement);
        Some((0..n).map(|i| unit_cost(building, owned + i, factor)).sum())
    }

    /// Units purchasable in sequence with the settlement's current currency
    pub fn max_affordable(&self, settlement_id: &str, building_id: &str) -> u32 {
        let Ok((settlement, building)) = self.lookup(settlement_id, building_id) else {
            return 0;
        };
        let owned = settlement.count(building.id);
        let factor = self.cost_factor(settlement);
        let mut remaining = settlement.currency;
        let mut count = 0;
        while count < MAX_BULK_UNITS {
            let cost = unit_cost(building, owned + count, factor);
            if remaining < cost {
                break;
            }
            remaining -= cost;
            count += 1;
        }
        count
    }

    // ========================================================================
    // Purchases
    // ========================================================================

    /// Buy one unit. Returns the price paid; on error nothing changes.
    pub fn try_buy_building(
        &mut self,
        settlement_id: &str,
        building_id: &str,
    ) -> Result<f64, ActionError> {
        let (tier, building, cost) = {
            let (settlement, building) = self.lookup(settlement_id, building_id)?;
            let cost = unit_cost(
                building,
                settlement.count(building.id),
                self.cost_factor(settlement),
            );
            if settlement.currency < cost {
                return Err(ActionError::InsufficientFunds {
                    required: cost,
                    available: settlement.currency,
                });
            }
            (settlement.tier, building, cost)
        };

        let now = self.clock.now_ms();
        let flat_income = research::starting_income(&self.state.research, tier);
        let near_bankruptcy_ratio = self.config.near_bankruptcy_ratio;
        let near_bankruptcy_min_cost = self.config.near_bankruptcy_min_cost;

        let Some(settlement) = self.state.settlement_mut(settlement_id) else {
            return Err(ActionError::UnknownSettlement(settlement_id.to_string()));
        };
        settlement.currency -= cost;
        settlement.total_spent += cost;
        let owned = settlement.buildings.entry(building.id.to_string()).or_insert(0);
        *owned += 1;
        let owned = *owned;
        settlement.total_income = settlement.compute_income(flat_income);
        let remaining = settlement.currency;

        self.state.stats.observe_building(building.id, owned);
        if cost >= near_bankruptcy_min_cost && remaining < cost * near_bankruptcy_ratio {
            self.state.stats.near_bankruptcy = true;
        }

        #[cfg(feature = "instrument")]
        tracing::info!(
            target: "purchase",
            settlement_id = settlement_id,
            building_id = building.id,
            cost = cost,
            owned = owned as u64,
            remaining = remaining,
        );

        self.refresh_goals(settlement_id, now);
        self.check_settlement_completion(settlement_id);
        Ok(cost)
    }

    pub fn buy_building(&mut self, settlement_id: &str, building_id: &str) -> bool {
        self.try_buy_building(settlement_id, building_id).is_ok()
    }

    /// Buy up to `n` units, stopping when currency runs out. Returns units bought.
    pub fn buy_multiple_buildings(
        &mut self,
        settlement_id: &str,
        building_id: &str,
        n: u32,
    ) -> u32 {
        let mut bought = 0;
        while bought < n && self.buy_building(settlement_id, building_id) {
            bought += 1;
        }
        bought
    }

    /// Buy according to the buy-amount setting
    pub fn buy_selected_amount(&mut self, settlement_id: &str, building_id: &str) -> u32 {
        let n = match self.buy_amount().units() {
            Some(n) => n,
            None => self.max_affordable(settlement_id, building_id),
        };
        self.buy_multiple_buildings(settlement_id, building_id, n)
    }

    // ========================================================================
    // Income
    // ========================================================================

    /// Building income with research, prestige and achievement multipliers
    pub(super) fn effective_income(&self, settlement: &Settlement) -> f64 {
        settlement.total_income
            * research::income_multiplier(&self.state.research, settlement.tier)
            * self.prestige_effect(PrestigeEffectKind::IncomeMultiplier)
            * self.achievement_effect(AchievementBonusKind::IncomeMultiplier)
            * self.prestige_building_boost(settlement.tier)
    }

    /// Effective income per second of one settlement, 0 if unknown
    pub fn settlement_income(&self, settlement_id: &str) -> f64 {
        self.state
            .settlement(settlement_id)
            .map(|s| self.effective_income(s))
            .unwrap_or(0.0)
    }

    /// Income per second across all live settlements, patronage included
    pub fn total_income(&self) -> f64 {
        self.state
            .settlements
            .iter()
            .map(|s| self.effective_income(s) + self.patronage_for(s.tier))
            .sum()
    }

    /// Recompute cached income for every settlement of a tier
    pub(super) fn recompute_tier_income(&mut self, tier: Tier) {
        let flat_income = research::starting_income(&self.state.research, tier);
        for settlement in self.state.settlements.iter_mut().filter(|s| s.tier == tier) {
            settlement.total_income = settlement.compute_income(flat_income);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::engine_at;
    use super::*;

    fn first_id(engine: &GameEngine) -> String {
        engine.state().settlements[0].id.clone()
    }

    #[test]
    fn test_first_hut_purchase() {
        let (mut engine, _) = engine_at(3);
        let id = first_id(&engine);
        assert_eq!(engine.building_cost(&id, "hamlet_hut"), Some(10.0));
        assert!(engine.buy_building(&id, "hamlet_hut"));
        let s = engine.settlement(&id).unwrap();
        assert_eq!(s.currency, 0.0);
        assert_eq!(s.count("hamlet_hut"), 1);
        assert_eq!(s.total_income, 1.0);
        assert_eq!(s.total_spent, 10.0);
        assert_eq!(engine.building_cost(&id, "hamlet_hut"), Some(11.0));
    }

    #[test]
    fn test_failed_purchase_leaves_state_untouched() {
        let (mut engine, _) = engine_at(3);
        let id = first_id(&engine);
        let before = engine.settlement(&id).unwrap().clone();
        assert_eq!(
            engine.try_buy_building(&id, "hamlet_farm"),
            Err(ActionError::InsufficientFunds {
                required: 60.0,
                available: 10.0
            })
        );
        assert!(!engine.buy_building(&id, "village_cottage"));
        assert!(!engine.buy_building("nowhere", "hamlet_hut"));
        assert_eq!(engine.settlement(&id).unwrap(), &before);
    }

    #[test]
    fn test_bulk_cost_is_sum_of_unit_costs() {
        let (engine, _) = engine_at(3);
        let id = first_id(&engine);
        // 10 + 11 + 13 + 15
        assert_eq!(engine.bulk_buy_cost(&id, "hamlet_hut", 4), Some(49.0));
        assert_eq!(engine.bulk_buy_cost(&id, "hamlet_hut", 0), Some(0.0));
        assert_eq!(engine.bulk_buy_cost(&id, "castle", 2), None);
        assert!(engine.bulk_buy_cost(&id, "hamlet_hut", MAX_BULK_UNITS).is_some());
        assert_eq!(engine.bulk_buy_cost(&id, "hamlet_hut", MAX_BULK_UNITS + 1), None);
    }

    #[test]
    fn test_max_affordable_and_buy_multiple() {
        let (mut engine, _) = engine_at(3);
        let id = first_id(&engine);
        engine.state.settlement_mut(&id).unwrap().currency = 49.0;
        assert_eq!(engine.max_affordable(&id, "hamlet_hut"), 4);
        assert_eq!(engine.buy_multiple_buildings(&id, "hamlet_hut", 10), 4);
        let s = engine.settlement(&id).unwrap();
        assert_eq!(s.count("hamlet_hut"), 4);
        assert_eq!(s.currency, 0.0);
        assert_eq!(engine.max_affordable("nowhere", "hamlet_hut"), 0);
    }

    #[test]
    fn test_buy_selected_amount_follows_setting() {
        let (mut engine, _) = engine_at(3);
        let id = first_id(&engine);
        engine.state.settlement_mut(&id).unwrap().currency = 1_000.0;
        engine.set_buy_amount(crate::types::BuyAmount::Five);
        assert_eq!(engine.buy_selected_amount(&id, "hamlet_hut"), 5);
    }

    #[test]
    fn test_cost_reduction_buildings_lower_other_costs() {
        let (mut engine, _) = engine_at(3);
        let id = first_id(&engine);
        let s = engine.state.settlement_mut(&id).unwrap();
        s.tier = Tier::Village;
        s.buildings = tier_definition(Tier::Village)
            .buildings
            .iter()
            .map(|b| (b.id.to_string(), 0))
            .collect();
        s.buildings.insert("village_workshop".into(), 1);
        // floor(200 * 0.97)
        assert_eq!(engine.building_cost(&id, "village_cottage"), Some(194.0));
    }

    #[test]
    fn test_near_bankruptcy_is_recorded() {
        let (mut engine, _) = engine_at(3);
        let id = first_id(&engine);
        let s = engine.state.settlement_mut(&id).unwrap();
        s.currency = 1_000.0;
        assert!(engine.buy_building(&id, "hamlet_shrine"));
        assert!(engine.state().stats.near_bankruptcy);
    }
}
