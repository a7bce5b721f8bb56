// Time advancement: accrual, goal refresh, completion, patronage, auto-builders
//
// update() order:
// 1. Bump effect generation
// 2. Accrue (effective income + patronage) × delta on every settlement
// 3. Refresh goals, run completion checks
// 4. Fire due auto-builders
// 5. Check achievements

use crate::achievements::AchievementBonusKind;
use crate::prestige::PrestigeEffectKind;
use crate::research::{self, ResearchEffect};
use crate::state::GameState;
use crate::tiers::tier_definition;
use crate::types::{GoalKind, Millis, Tier, millis_to_secs};

use super::GameEngine;

impl GameEngine {
    /// Advance by the wall-clock time since the previous call.
    ///
    /// Large gaps are credited in full so offline time pays out.
    pub fn update(&mut self) {
        let now = self.clock.now_ms();
        // Clock going backwards pays nothing
        let delta_secs = millis_to_secs(now - self.last_update_ms).max(0.0);
        self.last_update_ms = now;
        self.advance(delta_secs, now);
    }

    fn advance(&mut self, delta_secs: f64, now: Millis) {
        self.invalidate_effects();

        let speed = if self.state.settings.dev_mode {
            self.config.dev_multiplier
        } else {
            1.0
        };
        let gains: Vec<f64> = self
            .state
            .settlements
            .iter()
            .map(|s| (self.effective_income(s) + self.patronage_for(s.tier)) * delta_secs * speed)
            .collect();

        let GameState {
            settlements, stats, ..
        } = &mut self.state;
        for (settlement, gain) in settlements.iter_mut().zip(&gains) {
            settlement.currency += gain;
            settlement.lifetime_earned += gain;
            stats.observe_currency(settlement.currency);
        }

        #[cfg(feature = "instrument")]
        tracing::info!(
            target: "tick",
            delta_secs = delta_secs,
            settlements = settlements.len() as u64,
            earned = gains.iter().sum::<f64>(),
        );

        let ids: Vec<String> = self.state.settlements.iter().map(|s| s.id.clone()).collect();
        for id in &ids {
            self.refresh_goals(id, now);
            self.check_settlement_completion(id);
        }

        if self.state.settings.autobuy_enabled {
            self.run_auto_builders(now);
        }
        self.check_achievements();
    }

    // ========================================================================
    // Goals and completion
    // ========================================================================

    /// Recompute every goal's current value from the settlement's state.
    /// Completion flags latch and never clear.
    pub(super) fn refresh_goals(&mut self, settlement_id: &str, now: Millis) {
        let Some(settlement) = self.state.settlement(settlement_id) else {
            return;
        };
        let income = self.effective_income(settlement);
        let factor = settlement.goal_reduction_stack()
            * research::goal_factor(&self.state.research, settlement.tier);

        let observed: Vec<(f64, f64)> = settlement
            .goals
            .iter()
            .map(|goal| {
                let current = match goal.kind {
                    GoalKind::ReachIncome => income,
                    GoalKind::AccumulateLifetime => settlement.lifetime_earned,
                    GoalKind::HoldCurrency => settlement.currency,
                    GoalKind::OwnBuilding => goal
                        .building_id
                        .as_deref()
                        .map(|b| f64::from(settlement.count(b)))
                        .unwrap_or(0.0),
                    GoalKind::Survive => settlement.age_secs(now),
                };
                let target = match goal.kind {
                    GoalKind::OwnBuilding => (goal.target * factor).ceil().max(1.0),
                    _ => goal.target * factor,
                };
                (current, target)
            })
            .collect();

        if let Some(settlement) = self.state.settlement_mut(settlement_id) {
            for (goal, (current, target)) in settlement.goals.iter_mut().zip(observed) {
                goal.observe(current, target);
            }
        }
    }

    /// Complete the settlement if every goal is done: award research points,
    /// remove it, bump counters, maybe unlock the next tier, then autospawn.
    pub fn check_settlement_completion(&mut self, settlement_id: &str) -> bool {
        let Some(index) = self
            .state
            .settlements
            .iter()
            .position(|s| s.id == settlement_id && s.all_goals_complete())
        else {
            return false;
        };

        let now = self.clock.now_ms();
        let tier = self.state.settlements[index].tier;
        let award = self.completion_award(index);

        let mut settlement = self.state.settlements.remove(index);
        settlement.completed = true;
        let age_secs = settlement.age_secs(now);

        *self.state.research_points.entry(tier).or_insert(0) += award;
        let count = {
            let c = self.state.completed_counts.entry(tier).or_insert(0);
            *c += 1;
            *c
        };
        self.state.lifetime_completions += 1;
        self.state.stats.observe_completion(age_secs);

        #[cfg(feature = "instrument")]
        tracing::info!(
            target: "completion",
            settlement_id = settlement_id,
            tier = tier.as_str(),
            research_awarded = award,
            tier_completions = count,
            age_secs = age_secs,
        );

        if count % tier_definition(tier).unlock_threshold == 0 {
            if let Some(next) = tier.next() {
                if self.state.unlocked_tiers.insert(next) {
                    #[cfg(feature = "instrument")]
                    tracing::info!(
                        target: "tier_unlock",
                        tier = next.as_str(),
                        after_completions = count,
                        time_ms = now,
                    );
                }
            }
        }

        if !tier.is_base() && research::parallel_slots(&self.state.research, tier) == 1 {
            self.state.dormant_tiers.insert(tier);
        }

        self.autospawn();
        true
    }

    /// `floor((base + building bonus + research bonus) × research multipliers)`
    fn completion_award(&self, index: usize) -> u64 {
        let settlement = &self.state.settlements[index];
        let points = self.config.research_award_base
            + settlement.completion_bonus()
            + research::completion_bonus(&self.state.research, settlement.tier);
        let multiplier = self.prestige_effect(PrestigeEffectKind::ResearchBonus)
            * self.achievement_effect(AchievementBonusKind::ResearchBonus);
        (points * multiplier).floor().max(0.0) as u64
    }

    // ========================================================================
    // Patronage
    // ========================================================================

    /// Passive income a settlement draws from completions in higher tiers;
    /// 0 for an unknown settlement
    pub fn cross_tier_bonus(&self, settlement_id: &str) -> f64 {
        self.state
            .settlement(settlement_id)
            .map(|s| self.patronage_for(s.tier))
            .unwrap_or(0.0)
    }

    /// Σ over higher tiers H of `completed[H] × firstBuildingIncome[H] × rate / 2^distance`
    pub(super) fn patronage_for(&self, tier: Tier) -> f64 {
        tier.higher()
            .map(|higher| {
                let completed = self.state.completed(higher) as f64;
                let distance = (higher.index() - tier.index()) as i32;
                let income = tier_definition(higher).first_building().base_income;
                completed * income * self.config.patronage_rate / 2f64.powi(distance)
            })
            .sum()
    }

    // ========================================================================
    // Auto-builders
    // ========================================================================

    /// Fire every purchased auto-builder whose interval has elapsed
    fn run_auto_builders(&mut self, now: Millis) {
        let due: Vec<(String, Tier, &'static str)> = self
            .state
            .research
            .iter()
            .filter(|u| u.purchased)
            .filter_map(|u| match &u.effect {
                ResearchEffect::AutoBuilding {
                    building_id,
                    interval_secs,
                } => {
                    let building = tier_definition(u.tier).building(building_id)?;
                    let interval_ms = interval_secs
                        * research::autobuy_interval_factor(&self.state.research, u.tier)
                        * 1000.0;
                    let last = self
                        .state
                        .auto_build_timers
                        .get(&u.id)
                        .copied()
                        .unwrap_or(f64::NEG_INFINITY); // No timer yet: due now
                    (now - last >= interval_ms).then(|| (u.id.clone(), u.tier, building.id))
                }
                _ => None,
            })
            .collect();

        for (research_id, tier, building_id) in due {
            let targets: Vec<String> = self.settlements_of(tier).map(|s| s.id.clone()).collect();
            for settlement_id in targets {
                let Some(settlement) = self.state.settlement(&settlement_id) else {
                    continue; // Completed by an earlier auto-purchase
                };
                let owned = settlement.count(building_id);
                let currency = settlement.currency;
                let Some(cost) = self.building_cost(&settlement_id, building_id) else {
                    continue;
                };
                if owned > 0 && cost > self.config.autobuild_treasury_cap * currency {
                    continue;
                }
                if self.try_buy_building(&settlement_id, building_id).is_ok() {
                    #[cfg(feature = "instrument")]
                    tracing::info!(
                        target: "autobuild",
                        research_id = research_id.as_str(),
                        settlement_id = settlement_id.as_str(),
                        building_id = building_id,
                        cost = cost,
                    );
                }
            }
            self.state.auto_build_timers.insert(research_id, now);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::engine_at;
    use super::*;

    fn complete_all_goals(engine: &mut GameEngine, id: &str) {
        let s = engine.state.settlement_mut(id).unwrap();
        for g in &mut s.goals {
            g.completed = true;
        }
    }

    #[test]
    fn test_update_accrues_income_over_wall_clock_delta() {
        let (mut engine, clock) = engine_at(5);
        let id = engine.state().settlements[0].id.clone();
        assert!(engine.buy_building(&id, "hamlet_hut"));
        clock.advance_secs(10.0);
        engine.update();
        let s = engine.settlement(&id).unwrap();
        assert!((s.currency - 10.0).abs() < 1e-9);
        assert!((s.lifetime_earned - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_dev_mode_multiplies_accrual() {
        let (mut engine, clock) = engine_at(5);
        let id = engine.state().settlements[0].id.clone();
        engine.buy_building(&id, "hamlet_hut");
        engine.toggle_dev_mode();
        clock.advance_secs(1.0);
        engine.update();
        let s = engine.settlement(&id).unwrap();
        assert!((s.currency - 1000.0).abs() < 1e-6);
    }

    #[test]
    fn test_completion_awards_and_respawns_base_tier() {
        let (mut engine, clock) = engine_at(5);
        let id = engine.state().settlements[0].id.clone();
        complete_all_goals(&mut engine, &id);
        clock.advance_secs(0.1);
        engine.update();

        assert!(engine.settlement(&id).is_none());
        assert_eq!(engine.state().completed(Tier::Hamlet), 1);
        assert!(engine.state().research_points(Tier::Hamlet) >= 10);
        assert_eq!(engine.state().live_count(Tier::Hamlet), 1);
        let fresh = &engine.state().settlements[0];
        assert_ne!(fresh.id, id);
        assert_eq!(fresh.lifetime_earned, 0.0);
    }

    #[test]
    fn test_incomplete_settlement_is_not_completed() {
        let (mut engine, _) = engine_at(5);
        let id = engine.state().settlements[0].id.clone();
        assert!(!engine.check_settlement_completion(&id));
        assert!(!engine.check_settlement_completion("hamlet_999"));
    }

    #[test]
    fn test_six_completions_unlock_village() {
        let (mut engine, _) = engine_at(5);
        for _ in 0..6 {
            let id = engine.state().settlements[0].id.clone();
            complete_all_goals(&mut engine, &id);
            assert!(engine.check_settlement_completion(&id));
        }
        assert!(engine.state().is_unlocked(Tier::Village));
        assert_eq!(engine.state().live_count(Tier::Village), 1);
        assert_eq!(engine.state().live_count(Tier::Hamlet), 1);
    }

    #[test]
    fn test_single_slot_higher_tier_goes_dormant() {
        let (mut engine, _) = engine_at(5);
        engine.state.unlocked_tiers.insert(Tier::Village);
        let village = engine.spawn_settlement(Tier::Village).unwrap();
        complete_all_goals(&mut engine, &village);
        assert!(engine.check_settlement_completion(&village));
        assert_eq!(engine.state().live_count(Tier::Village), 0);
        assert!(engine.state().dormant_tiers.contains(&Tier::Village));

        assert!(engine.spawn_settlement(Tier::Village).is_some());
        assert!(engine.state().dormant_tiers.is_empty());
    }

    #[test]
    fn test_cross_tier_bonus_decays_with_distance() {
        let (mut engine, _) = engine_at(5);
        let id = engine.state().settlements[0].id.clone();
        assert_eq!(engine.cross_tier_bonus(&id), 0.0);
        engine.state.completed_counts.insert(Tier::Village, 2);
        engine.state.completed_counts.insert(Tier::Town, 1);
        let village = tier_definition(Tier::Village).first_building().base_income;
        let town = tier_definition(Tier::Town).first_building().base_income;
        let expected = 2.0 * village * 0.05 / 2.0 + town * 0.05 / 4.0;
        assert!((engine.cross_tier_bonus(&id) - expected).abs() < 1e-9);
        assert_eq!(engine.cross_tier_bonus("nowhere"), 0.0);
    }

    #[test]
    fn test_auto_builder_bootstraps_empty_settlement() {
        let (mut engine, clock) = engine_at(5);
        let auto = engine
            .state()
            .research
            .iter()
            .find(|u| {
                matches!(u.effect, ResearchEffect::AutoBuilding { .. }) && u.tier == Tier::Hamlet
            })
            .map(|u| (u.id.clone(), u.cost))
            .unwrap();
        engine.state.research_points.insert(Tier::Hamlet, auto.1);
        assert!(engine.purchase_research(&auto.0));

        let id = engine.state().settlements[0].id.clone();
        clock.advance_secs(11.0);
        engine.update();
        // First hut bought despite costing all the settlement's currency
        assert_eq!(engine.settlement(&id).unwrap().count("hamlet_hut"), 1);

        clock.advance_secs(11.0);
        engine.update();
        // Second one costs 11, far above 5% of ~11 currency
        assert_eq!(engine.settlement(&id).unwrap().count("hamlet_hut"), 1);
    }

    #[test]
    fn test_auto_builder_buys_within_treasury_cap() {
        let (mut engine, clock) = engine_at(5);
        let id = engine.state().settlements[0].id.clone();
        {
            let s = engine.state.settlement_mut(&id).unwrap();
            *s.buildings.get_mut("hamlet_hut").unwrap() = 1;
            s.currency = 10_000.0;
            for goal in &mut s.goals {
                goal.kind = GoalKind::HoldCurrency;
                goal.target = 1e15;
            }
        }
        engine.state.research_points.insert(Tier::Hamlet, 10_000);
        assert!(engine.purchase_research("hamlet_auto_1"));

        clock.advance_secs(11.0);
        engine.update();
        // 11 is well under 5% of 10k
        assert_eq!(engine.settlement(&id).unwrap().count("hamlet_hut"), 2);
    }

    #[test]
    fn test_auto_builder_respects_autobuy_toggle() {
        let (mut engine, clock) = engine_at(5);
        let auto_id = engine
            .state()
            .research
            .iter()
            .find(|u| {
                matches!(u.effect, ResearchEffect::AutoBuilding { .. }) && u.tier == Tier::Hamlet
            })
            .map(|u| u.id.clone())
            .unwrap();
        engine.state.research_points.insert(Tier::Hamlet, 10_000);
        assert!(engine.purchase_research(&auto_id));
        engine.toggle_autobuy();

        let id = engine.state().settlements[0].id.clone();
        clock.advance_secs(60.0);
        engine.update();
        assert_eq!(engine.settlement(&id).unwrap().count("hamlet_hut"), 0);
    }
}
