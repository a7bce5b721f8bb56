// Research, prestige and achievements, plus the memoized effect getters

use crate::achievements::{self, AchievementBonusKind, AchievementContext};
use crate::error::ActionError;
use crate::prestige::{self, PrestigeEffectKind, PrestigeUpgrade, prestige_currency_for};
use crate::research::{self, ResearchEffect, ResearchUpgrade};
use crate::state::GameState;
use crate::types::Tier;

use super::GameEngine;

impl GameEngine {
    // ========================================================================
    // Research
    // ========================================================================

    pub fn research_points(&self, tier: Tier) -> u64 {
        self.state.research_points(tier)
    }

    /// Unpurchased upgrades of unlocked tiers whose prerequisite is met
    pub fn available_research(&self) -> Vec<&ResearchUpgrade> {
        self.state
            .research
            .iter()
            .filter(|u| !u.purchased && self.state.is_unlocked(u.tier))
            .filter(|u| self.research_prerequisite_met(u.prerequisite.as_deref()))
            .collect()
    }

    fn research_prerequisite_met(&self, prerequisite: Option<&str>) -> bool {
        prerequisite.is_none_or(|p| self.state.research.iter().any(|u| u.id == p && u.purchased))
    }

    /// Buy a research upgrade with its tier's points. Returns the id of the
    /// synthesized next level, if one was added.
    pub fn try_purchase_research(
        &mut self,
        research_id: &str,
    ) -> Result<Option<String>, ActionError> {
        let index = self
            .state
            .research
            .iter()
            .position(|u| u.id == research_id)
            .ok_or_else(|| ActionError::UnknownUpgrade(research_id.to_string()))?;
        let upgrade = &self.state.research[index];
        if upgrade.purchased {
            return Err(ActionError::AlreadyPurchased(research_id.to_string()));
        }
        if !self.state.is_unlocked(upgrade.tier) {
            return Err(ActionError::TierLocked(upgrade.tier));
        }
        if !self.research_prerequisite_met(upgrade.prerequisite.as_deref()) {
            return Err(ActionError::MissingPrerequisite(
                upgrade.prerequisite.clone().unwrap_or_default(),
            ));
        }
        let (tier, cost) = (upgrade.tier, upgrade.cost);
        let available = self.state.research_points(tier);
        if available < cost {
            return Err(ActionError::InsufficientPoints {
                required: cost,
                available,
            });
        }

        self.state.research_points.insert(tier, available - cost);
        self.state.research[index].purchased = true;
        if let ResearchEffect::AutoBuilding { .. } = self.state.research[index].effect {
            let now = self.clock.now_ms();
            self.state.auto_build_timers.insert(research_id.to_string(), now);
        }
        let next_level = research::expand_after_purchase(&mut self.state.research, research_id);
        self.state.stats.research_purchases += 1;

        #[cfg(feature = "instrument")]
        tracing::info!(
            target: "research",
            research_id = research_id,
            tier = tier.as_str(),
            cost = cost,
            next_level = next_level.as_deref().unwrap_or(""),
        );

        self.invalidate_effects();
        self.recompute_tier_income(tier);
        self.autospawn();
        Ok(next_level)
    }

    pub fn purchase_research(&mut self, research_id: &str) -> bool {
        self.try_purchase_research(research_id).is_ok()
    }

    // ========================================================================
    // Prestige
    // ========================================================================

    pub fn prestige_currency(&self, tier: Tier) -> u64 {
        self.state.prestige_currency(tier)
    }

    /// Prestige currency each tier would yield if the run ended now
    pub fn prestige_preview(&self) -> Vec<(Tier, u64)> {
        self.state
            .completed_counts
            .iter()
            .map(|(tier, &count)| (*tier, prestige_currency_for(count)))
            .filter(|(_, gain)| *gain > 0)
            .collect()
    }

    /// Unpurchased prestige upgrades whose prerequisite is met
    pub fn available_prestige_upgrades(&self) -> Vec<&PrestigeUpgrade> {
        self.state
            .prestige_upgrades
            .iter()
            .filter(|u| !u.purchased && self.prestige_prerequisite_met(u.prerequisite.as_deref()))
            .collect()
    }

    fn prestige_prerequisite_met(&self, prerequisite: Option<&str>) -> bool {
        prerequisite.is_none_or(|p| {
            self.state
                .prestige_upgrades
                .iter()
                .any(|u| u.id == p && u.purchased)
        })
    }

    pub fn try_purchase_prestige_upgrade(&mut self, upgrade_id: &str) -> Result<(), ActionError> {
        let index = self
            .state
            .prestige_upgrades
            .iter()
            .position(|u| u.id == upgrade_id)
            .ok_or_else(|| ActionError::UnknownUpgrade(upgrade_id.to_string()))?;
        let upgrade = &self.state.prestige_upgrades[index];
        if upgrade.purchased {
            return Err(ActionError::AlreadyPurchased(upgrade_id.to_string()));
        }
        if !self.prestige_prerequisite_met(upgrade.prerequisite.as_deref()) {
            return Err(ActionError::MissingPrerequisite(
                upgrade.prerequisite.clone().unwrap_or_default(),
            ));
        }
        let (tier, cost) = (upgrade.tier, upgrade.cost);
        let available = self.state.prestige_currency(tier);
        if available < cost {
            return Err(ActionError::InsufficientPoints {
                required: cost,
                available,
            });
        }

        self.state.prestige_currency.insert(tier, available - cost);
        self.state.prestige_upgrades[index].purchased = true;

        #[cfg(feature = "instrument")]
        tracing::info!(
            target: "prestige_upgrade",
            upgrade_id = upgrade_id,
            tier = tier.as_str(),
            cost = cost,
        );

        self.invalidate_effects();
        Ok(())
    }

    pub fn purchase_prestige_upgrade(&mut self, upgrade_id: &str) -> bool {
        self.try_purchase_prestige_upgrade(upgrade_id).is_ok()
    }

    /// End the run: credit `floor(sqrt(completions))` per tier, reset per-run
    /// state and start over at the base tier. Returns the credited amounts.
    pub fn try_perform_prestige(&mut self) -> Result<Vec<(Tier, u64)>, ActionError> {
        if self.state.completed_counts.values().all(|&c| c == 0) {
            return Err(ActionError::NothingToPrestige);
        }
        let credited: Vec<(Tier, u64)> = self
            .state
            .completed_counts
            .iter()
            .map(|(tier, &count)| (*tier, prestige_currency_for(count)))
            .collect();
        for (tier, gain) in &credited {
            *self.state.prestige_currency.entry(*tier).or_insert(0) += gain;
        }

        self.state.reset_run();
        self.state.prestige_count += 1;

        #[cfg(feature = "instrument")]
        tracing::info!(
            target: "prestige",
            prestige_count = u64::from(self.state.prestige_count),
            credited = credited.iter().map(|(_, g)| g).sum::<u64>(),
            lifetime_completions = self.state.lifetime_completions,
        );

        self.invalidate_effects();
        self.autospawn();
        Ok(credited)
    }

    pub fn perform_prestige(&mut self) -> bool {
        self.try_perform_prestige().is_ok()
    }

    // ========================================================================
    // Achievements
    // ========================================================================

    /// Unlock every achievement whose condition now holds; returns new ids
    pub fn check_achievements(&mut self) -> Vec<String> {
        let GameState {
            settlements,
            completed_counts,
            achievements,
            prestige_count,
            lifetime_completions,
            stats,
            ..
        } = &mut self.state;
        let ctx = AchievementContext {
            completed_counts,
            lifetime_completions: *lifetime_completions,
            prestige_count: *prestige_count,
            fastest_completion_secs: stats.fastest_completion_secs,
            building_high_water: &stats.building_high_water,
            max_currency_held: stats.max_currency_held,
            live_settlements: settlements.len(),
            research_purchases: stats.research_purchases,
            near_bankruptcy: stats.near_bankruptcy,
        };
        let unlocked = achievements::unlock_met(achievements, &ctx);
        if unlocked.is_empty() {
            return unlocked;
        }

        #[cfg(feature = "instrument")]
        for id in &unlocked {
            tracing::info!(target: "achievement", achievement_id = id.as_str());
        }

        self.invalidate_effects();
        unlocked
    }

    // ========================================================================
    // Memoized effects
    // ========================================================================

    /// Aggregate of purchased prestige upgrades of one kind, memoized per generation
    pub fn prestige_effect(&self, kind: PrestigeEffectKind) -> f64 {
        self.effects.borrow_mut().prestige(self.generation, kind, || {
            prestige::aggregate(&self.state.prestige_upgrades, kind)
        })
    }

    /// Aggregate of unlocked achievement bonuses of one kind, memoized per generation
    pub fn achievement_effect(&self, kind: AchievementBonusKind) -> f64 {
        self.effects.borrow_mut().achievement(self.generation, kind, || {
            achievements::aggregate(&self.state.achievements, kind)
        })
    }

    pub fn prestige_building_boost(&self, tier: Tier) -> f64 {
        self.effects.borrow_mut().building_boost(self.generation, tier, || {
            prestige::building_boost(&self.state.prestige_upgrades, tier)
        })
    }

    #[cfg(test)]
    pub(super) fn effect_recomputations(&self) -> u64 {
        self.effects.borrow().recomputations
    }
}
