// Economy engine: the single owner of all mutable game state
//
// Module structure:
// - economy      building costs, purchases, income
// - tick         update(), goals, completion, patronage, auto-builders
// - progression  research, prestige, achievements, memoized effects
// - persistence  save / load / export / import
// - effects      per-generation memo for derived effect aggregates

mod economy;
mod effects;
mod persistence;
mod progression;
mod tick;

use std::cell::RefCell;

use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::achievements::AchievementBonusKind;
use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::entities::Settlement;
use crate::goals::{GoalIds, generate_random_goals};
use crate::prestige::PrestigeEffectKind;
use crate::research;
use crate::state::{EngineSummary, GameState, SettlementSummary, Settings};
use crate::tiers::tier_definition;
use crate::types::{BuyAmount, Millis, Tier};

use effects::EffectCache;

#[derive(Debug)]
pub struct GameEngine {
    state: GameState,
    config: EngineConfig,
    clock: Box<dyn Clock>,
    rng: StdRng,
    last_update_ms: Millis,
    generation: u64, // Bumped on every tick and effect-changing purchase
    effects: RefCell<EffectCache>,
}

/// Hands out `goal_<n>` ids from the state's counter
struct GoalCounter<'a>(&'a mut u64);

impl GoalIds for GoalCounter<'_> {
    fn next_goal_id(&mut self) -> String {
        *self.0 += 1;
        format!("goal_{}", self.0)
    }
}

impl GameEngine {
    /// Fresh game: only the base tier is unlocked and its slots are filled
    pub fn new(config: EngineConfig, clock: Box<dyn Clock>) -> Self {
        let now = clock.now_ms();
        let seed = config.seed.unwrap_or(now as u64);
        let mut engine = Self {
            state: GameState::new(),
            config,
            clock,
            rng: StdRng::seed_from_u64(seed),
            last_update_ms: now,
            generation: 0,
            effects: RefCell::new(EffectCache::default()),
        };
        engine.autospawn();
        engine
    }

    pub fn with_system_clock(config: EngineConfig) -> Self {
        Self::new(config, Box::new(SystemClock))
    }

    /// Read-only view of the whole aggregate
    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn now_ms(&self) -> Millis {
        self.clock.now_ms()
    }

    pub fn settlement(&self, id: &str) -> Option<&Settlement> {
        self.state.settlement(id)
    }

    pub fn settlements_of(&self, tier: Tier) -> impl Iterator<Item = &Settlement> {
        self.state.settlements.iter().filter(move |s| s.tier == tier)
    }

    /// Compact per-frame view: live settlements and headline numbers
    pub fn summary(&self) -> EngineSummary {
        let settlements: Vec<SettlementSummary> = self
            .state
            .settlements
            .iter()
            .map(|s| SettlementSummary {
                id: s.id.clone(),
                tier: s.tier,
                currency: s.currency,
                income: self.effective_income(s),
                patronage: self.patronage_for(s.tier),
                goals_completed: s.goals.iter().filter(|g| g.completed).count(),
                goals_total: s.goals.len(),
            })
            .collect();
        EngineSummary {
            total_income: settlements.iter().map(|s| s.income + s.patronage).sum(),
            settlements,
            research_points: self.state.research_points.iter().map(|(t, p)| (*t, *p)).collect(),
            unlocked_tiers: self.state.unlocked_tiers.iter().copied().collect(),
            prestige_currency: self.state.prestige_currency.iter().map(|(t, c)| (*t, *c)).collect(),
            prestige_count: self.state.prestige_count,
            lifetime_completions: self.state.lifetime_completions,
            dev_mode: self.state.settings.dev_mode,
            buy_amount: self.state.settings.buy_amount,
        }
    }

    // ========================================================================
    // Spawning
    // ========================================================================

    /// Found a settlement of an unlocked tier. Returns its id.
    pub fn spawn_settlement(&mut self, tier: Tier) -> Option<String> {
        let id = self.create_settlement(tier)?;
        self.state.dormant_tiers.remove(&tier);
        Some(id)
    }

    fn create_settlement(&mut self, tier: Tier) -> Option<String> {
        if !self.state.is_unlocked(tier) {
            return None;
        }
        let def = tier_definition(tier);
        let now = self.clock.now_ms();

        let starting_currency = def.cheapest_building().base_cost
            + self.prestige_effect(PrestigeEffectKind::StartingCurrency)
            + self.achievement_effect(AchievementBonusKind::StartingCurrency);
        let flat_income = research::starting_income(&self.state.research, tier);

        self.state.next_settlement_id += 1;
        let id = format!("{}_{}", tier.as_str(), self.state.next_settlement_id);
        let goals = generate_random_goals(
            tier,
            def.goals_per_settlement,
            &mut self.rng,
            &mut GoalCounter(&mut self.state.next_goal_id),
        );

        let mut settlement = Settlement::new(id.clone(), tier, starting_currency, now, goals);
        settlement.total_income = settlement.compute_income(flat_income);
        self.state.stats.observe_currency(settlement.currency);

        #[cfg(feature = "instrument")]
        tracing::info!(
            target: "settlement_spawn",
            settlement_id = id.as_str(),
            tier = tier.as_str(),
            currency = settlement.currency,
            goals = settlement.goals.len() as u64,
        );

        self.state.settlements.push(settlement);
        Some(id)
    }

    /// Fill every unlocked tier up to its parallel-slot count.
    ///
    /// The base tier is always refilled. A higher tier with a single slot
    /// stays empty after its settlement completes (dormant) until it is
    /// spawned by hand; multi-slot tiers refill like the base tier.
    fn autospawn(&mut self) {
        let tiers: Vec<Tier> = self.state.unlocked_tiers.iter().copied().collect();
        for tier in tiers {
            let slots = research::parallel_slots(&self.state.research, tier) as usize;
            if slots > 1 {
                self.state.dormant_tiers.remove(&tier);
            } else if !tier.is_base() && self.state.dormant_tiers.contains(&tier) {
                continue;
            }
            while self.state.live_count(tier) < slots {
                if self.create_settlement(tier).is_none() {
                    break;
                }
            }
        }
    }

    // ========================================================================
    // Settings
    // ========================================================================

    pub fn settings(&self) -> &Settings {
        &self.state.settings
    }

    /// Flip dev mode; returns the new value
    pub fn toggle_dev_mode(&mut self) -> bool {
        self.state.settings.dev_mode = !self.state.settings.dev_mode;
        self.state.settings.dev_mode
    }

    pub fn buy_amount(&self) -> BuyAmount {
        self.state.settings.buy_amount
    }

    pub fn set_buy_amount(&mut self, amount: BuyAmount) {
        self.state.settings.buy_amount = amount;
    }

    pub fn toggle_autobuy(&mut self) -> bool {
        self.state.settings.autobuy_enabled = !self.state.settings.autobuy_enabled;
        self.state.settings.autobuy_enabled
    }

    pub fn toggle_compact_numbers(&mut self) -> bool {
        self.state.settings.compact_numbers = !self.state.settings.compact_numbers;
        self.state.settings.compact_numbers
    }

    pub fn toggle_show_locked_tiers(&mut self) -> bool {
        self.state.settings.show_locked_tiers = !self.state.settings.show_locked_tiers;
        self.state.settings.show_locked_tiers
    }

    fn invalidate_effects(&mut self) {
        self.generation += 1;
    }
}
