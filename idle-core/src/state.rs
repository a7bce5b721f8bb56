use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tsify_next::Tsify;

use crate::achievements::{Achievement, seed_achievements};
use crate::entities::Settlement;
use crate::prestige::{PrestigeUpgrade, seed_prestige_catalog};
use crate::research::{ResearchUpgrade, seed_research_catalog};
use crate::types::{BuyAmount, Millis, Tier};

// ============================================================================
// Settings - User-facing toggles
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub dev_mode: bool,
    pub buy_amount: BuyAmount,
    pub autobuy_enabled: bool,
    pub compact_numbers: bool,
    pub show_locked_tiers: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            dev_mode: false,
            buy_amount: BuyAmount::One,
            autobuy_enabled: true,
            compact_numbers: true,
            show_locked_tiers: false,
        }
    }
}

// ============================================================================
// Run Statistics - High-water marks that feed achievements
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    pub fastest_completion_secs: Option<f64>,
    pub max_currency_held: f64,
    /// Most of each building ever owned in one settlement
    pub building_high_water: BTreeMap<String, u32>,
    pub research_purchases: u32,
    pub near_bankruptcy: bool,
}

impl RunStats {
    pub fn observe_currency(&mut self, currency: f64) {
        if currency > self.max_currency_held {
            self.max_currency_held = currency;
        }
    }

    pub fn observe_building(&mut self, building_id: &str, count: u32) {
        let entry = self.building_high_water.entry(building_id.to_string()).or_insert(0);
        *entry = (*entry).max(count);
    }

    pub fn observe_completion(&mut self, secs: f64) {
        self.fastest_completion_secs = Some(match self.fastest_completion_secs {
            Some(best) => best.min(secs),
            None => secs,
        });
    }
}

// ============================================================================
// Game State - The complete engine state
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    pub settlements: Vec<Settlement>,
    pub research_points: BTreeMap<Tier, u64>,
    pub unlocked_tiers: BTreeSet<Tier>,
    pub completed_counts: BTreeMap<Tier, u64>,
    pub research: Vec<ResearchUpgrade>,
    pub prestige_upgrades: Vec<PrestigeUpgrade>,
    pub achievements: Vec<Achievement>,
    pub auto_build_timers: BTreeMap<String, Millis>, // Research id -> last fire time
    pub prestige_currency: BTreeMap<Tier, u64>,
    pub prestige_count: u32,
    pub lifetime_completions: u64, // Survives prestige
    pub dormant_tiers: BTreeSet<Tier>, // One-slot tiers waiting for a manual respawn
    pub stats: RunStats,
    pub settings: Settings,
    pub next_settlement_id: u64,
    pub next_goal_id: u64,
}

impl GameState {
    pub fn new() -> Self {
        Self {
            settlements: Vec::new(),
            research_points: BTreeMap::new(),
            unlocked_tiers: BTreeSet::from([Tier::base()]),
            completed_counts: BTreeMap::new(),
            research: seed_research_catalog(),
            prestige_upgrades: seed_prestige_catalog(),
            achievements: seed_achievements(),
            auto_build_timers: BTreeMap::new(),
            prestige_currency: BTreeMap::new(),
            prestige_count: 0,
            lifetime_completions: 0,
            dormant_tiers: BTreeSet::new(),
            stats: RunStats::default(),
            settings: Settings::default(),
            next_settlement_id: 0,
            next_goal_id: 0,
        }
    }

    /// Clear everything a prestige resets; keeps prestige progress,
    /// achievements, stats, settings and id counters
    pub fn reset_run(&mut self) {
        self.settlements.clear();
        self.research_points.clear();
        self.unlocked_tiers = BTreeSet::from([Tier::base()]);
        self.completed_counts.clear();
        self.research = seed_research_catalog();
        self.auto_build_timers.clear();
        self.dormant_tiers.clear();
    }

    pub fn settlement(&self, id: &str) -> Option<&Settlement> {
        self.settlements.iter().find(|s| s.id == id)
    }

    pub fn settlement_mut(&mut self, id: &str) -> Option<&mut Settlement> {
        self.settlements.iter_mut().find(|s| s.id == id)
    }

    pub fn live_count(&self, tier: Tier) -> usize {
        self.settlements.iter().filter(|s| s.tier == tier).count()
    }

    pub fn is_unlocked(&self, tier: Tier) -> bool {
        self.unlocked_tiers.contains(&tier)
    }

    pub fn completed(&self, tier: Tier) -> u64 {
        self.completed_counts.get(&tier).copied().unwrap_or(0)
    }

    pub fn research_points(&self, tier: Tier) -> u64 {
        self.research_points.get(&tier).copied().unwrap_or(0)
    }

    pub fn prestige_currency(&self, tier: Tier) -> u64 {
        self.prestige_currency.get(&tier).copied().unwrap_or(0)
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Serializable Summary for JS
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi)]
pub struct SettlementSummary {
    pub id: String,
    pub tier: Tier,
    pub currency: f64,
    pub income: f64, // Effective income per second, all multipliers applied
    pub patronage: f64,
    pub goals_completed: usize,
    pub goals_total: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi)]
pub struct EngineSummary {
    pub total_income: f64,
    pub settlements: Vec<SettlementSummary>,
    pub research_points: Vec<(Tier, u64)>,
    pub unlocked_tiers: Vec<Tier>,
    pub prestige_currency: Vec<(Tier, u64)>,
    pub prestige_count: u32,
    pub lifetime_completions: u64,
    pub dev_mode: bool,
    pub buy_amount: BuyAmount,
}
