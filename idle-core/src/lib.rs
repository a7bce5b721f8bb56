use wasm_bindgen::prelude::*;

mod achievements;
pub mod balance;
mod clock;
mod config;
mod engine;
mod entities;
mod error;
mod goals;
mod prestige;
mod research;
mod save;
mod state;
mod tiers;
mod types;

pub use achievements::*;
pub use clock::*;
pub use config::*;
pub use engine::GameEngine;
pub use entities::*;
pub use error::*;
pub use goals::*;
pub use prestige::{
    PrestigeEffect, PrestigeEffectKind, PrestigeUpgrade, prestige_currency_for,
    seed_prestige_catalog,
};
pub use research::{
    ESCALATION_RULES, EscalationRule, LEVEL_COST_MULTIPLIER, MAX_PARALLEL_SLOTS, ResearchEffect,
    ResearchEffectKind, ResearchUpgrade, ValueStep, escalation_rule, expand_after_purchase,
    next_level, seed_research_catalog,
};
pub use save::*;
pub use state::*;
pub use tiers::*;
pub use types::*;

// ============================================================================
// WASM API - Game
// ============================================================================

#[wasm_bindgen]
pub struct Game {
    engine: GameEngine,
}

#[wasm_bindgen]
impl Game {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        // Better panic messages in browser console
        console_error_panic_hook::set_once();

        Self {
            engine: GameEngine::with_system_clock(EngineConfig::default()),
        }
    }

    /// Start a game with a JSON `EngineConfig`; missing fields take defaults
    #[wasm_bindgen]
    pub fn with_config(config_json: &str) -> Result<Game, JsValue> {
        console_error_panic_hook::set_once();
        let config: EngineConfig =
            serde_json::from_str(config_json).map_err(|e| JsValue::from_str(&e.to_string()))?;
        Ok(Self {
            engine: GameEngine::with_system_clock(config),
        })
    }

    /// Advance by wall-clock time since the previous call
    #[wasm_bindgen]
    pub fn update(&mut self) {
        self.engine.update();
    }

    // ========================================================================
    // Settlements and buildings
    // ========================================================================

    #[wasm_bindgen]
    pub fn spawn_settlement(&mut self, tier: &str) -> Option<String> {
        let tier = tier.parse::<Tier>().ok()?;
        self.engine.spawn_settlement(tier)
    }

    #[wasm_bindgen]
    pub fn buy_building(&mut self, settlement_id: &str, building_id: &str) -> bool {
        self.engine.buy_building(settlement_id, building_id)
    }

    #[wasm_bindgen]
    pub fn buy_multiple_buildings(
        &mut self,
        settlement_id: &str,
        building_id: &str,
        n: u32,
    ) -> u32 {
        self.engine.buy_multiple_buildings(settlement_id, building_id, n)
    }

    #[wasm_bindgen]
    pub fn buy_selected_amount(&mut self, settlement_id: &str, building_id: &str) -> u32 {
        self.engine.buy_selected_amount(settlement_id, building_id)
    }

    #[wasm_bindgen]
    pub fn building_cost(&self, settlement_id: &str, building_id: &str) -> Option<f64> {
        self.engine.building_cost(settlement_id, building_id)
    }

    #[wasm_bindgen]
    pub fn bulk_buy_cost(&self, settlement_id: &str, building_id: &str, n: u32) -> Option<f64> {
        self.engine.bulk_buy_cost(settlement_id, building_id, n)
    }

    #[wasm_bindgen]
    pub fn max_affordable(&self, settlement_id: &str, building_id: &str) -> u32 {
        self.engine.max_affordable(settlement_id, building_id)
    }

    #[wasm_bindgen]
    pub fn cross_tier_bonus(&self, settlement_id: &str) -> f64 {
        self.engine.cross_tier_bonus(settlement_id)
    }

    #[wasm_bindgen]
    pub fn total_income(&self) -> f64 {
        self.engine.total_income()
    }

    // ========================================================================
    // Research, prestige, achievements
    // ========================================================================

    /// Research points of a tier; 0 for an unknown tier name
    #[wasm_bindgen]
    pub fn research_points(&self, tier: &str) -> u64 {
        tier.parse::<Tier>()
            .map(|t| self.engine.research_points(t))
            .unwrap_or(0)
    }

    #[wasm_bindgen]
    pub fn purchase_research(&mut self, research_id: &str) -> bool {
        self.engine.purchase_research(research_id)
    }

    #[wasm_bindgen]
    pub fn purchase_prestige_upgrade(&mut self, upgrade_id: &str) -> bool {
        self.engine.purchase_prestige_upgrade(upgrade_id)
    }

    #[wasm_bindgen]
    pub fn perform_prestige(&mut self) -> bool {
        self.engine.perform_prestige()
    }

    /// Ids of achievements unlocked by this call
    #[wasm_bindgen]
    pub fn check_achievements(&mut self) -> Vec<String> {
        self.engine.check_achievements()
    }

    // ========================================================================
    // Settings
    // ========================================================================

    #[wasm_bindgen]
    pub fn toggle_dev_mode(&mut self) -> bool {
        self.engine.toggle_dev_mode()
    }

    #[wasm_bindgen]
    pub fn buy_amount(&self) -> BuyAmount {
        self.engine.buy_amount()
    }

    /// Accepts "1", "5" or "max"; anything else is ignored
    #[wasm_bindgen]
    pub fn set_buy_amount(&mut self, amount: &str) -> bool {
        match amount.parse::<BuyAmount>() {
            Ok(amount) => {
                self.engine.set_buy_amount(amount);
                true
            }
            Err(_) => false,
        }
    }

    #[wasm_bindgen]
    pub fn toggle_autobuy(&mut self) -> bool {
        self.engine.toggle_autobuy()
    }

    #[wasm_bindgen]
    pub fn toggle_compact_numbers(&mut self) -> bool {
        self.engine.toggle_compact_numbers()
    }

    #[wasm_bindgen]
    pub fn toggle_show_locked_tiers(&mut self) -> bool {
        self.engine.toggle_show_locked_tiers()
    }

    // ========================================================================
    // State and persistence
    // ========================================================================

    /// Full state as a plain JS object
    #[wasm_bindgen]
    pub fn get_state(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(self.engine.state()).map_err(JsValue::from)
    }

    /// Compact per-frame view for rendering
    #[wasm_bindgen]
    pub fn summary(&self) -> EngineSummary {
        self.engine.summary()
    }

    #[wasm_bindgen]
    pub fn export_save(&self) -> Option<String> {
        self.engine.export_save().ok()
    }

    #[wasm_bindgen]
    pub fn import_save(&mut self, json: &str) -> bool {
        self.engine.import_save(json)
    }
}

/// localStorage persistence, browser only
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
impl Game {
    #[wasm_bindgen]
    pub fn save(&self) -> bool {
        self.engine.save(&mut LocalStorage)
    }

    #[wasm_bindgen]
    pub fn load(&mut self) -> bool {
        self.engine.load(&LocalStorage)
    }
}

impl Default for Game {
    fn default() -> Self {
        Self::new()
    }
}
