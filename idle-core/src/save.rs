// Versioned save projection and storage backends
//
// Sets and tier-keyed maps are flattened to ordered vectors. The research
// catalog is stored whole because purchases append levels to it; prestige
// upgrades and achievements only store which ids are purchased / unlocked.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::entities::Settlement;
use crate::error::SaveError;
use crate::research::{MAX_PARALLEL_SLOTS, ResearchEffect, ResearchUpgrade, seed_research_catalog};
use crate::state::{GameState, RunStats, Settings};
use crate::tiers::tier_definition;
use crate::types::{Millis, Tier};

pub const SAVE_VERSION: &str = "1.0.0";

/// Key saves are stored under
pub const SAVE_KEY: &str = "idle_settlements_save";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveData {
    pub version: String,
    pub timestamp: Millis,
    pub settlements: Vec<Settlement>,
    pub research_points: Vec<(Tier, u64)>,
    pub unlocked_tiers: Vec<Tier>,
    pub completed_counts: Vec<(Tier, u64)>,
    pub research: Vec<ResearchUpgrade>,
    pub purchased_prestige: Vec<String>,
    pub unlocked_achievements: Vec<String>,
    pub auto_build_timers: Vec<(String, Millis)>,
    pub prestige_currency: Vec<(Tier, u64)>,
    pub prestige_count: u32,
    pub lifetime_completions: u64,
    pub dormant_tiers: Vec<Tier>,
    pub stats: RunStats,
    pub settings: Settings,
    pub next_settlement_id: u64,
    pub next_goal_id: u64,
}

#[derive(Deserialize)]
struct VersionProbe {
    version: String,
}

impl SaveData {
    pub fn capture(state: &GameState, timestamp: Millis) -> Self {
        Self {
            version: SAVE_VERSION.to_string(),
            timestamp,
            settlements: state.settlements.clone(),
            research_points: state.research_points.iter().map(|(t, p)| (*t, *p)).collect(),
            unlocked_tiers: state.unlocked_tiers.iter().copied().collect(),
            completed_counts: state.completed_counts.iter().map(|(t, c)| (*t, *c)).collect(),
            research: state.research.clone(),
            purchased_prestige: state
                .prestige_upgrades
                .iter()
                .filter(|u| u.purchased)
                .map(|u| u.id.clone())
                .collect(),
            unlocked_achievements: state
                .achievements
                .iter()
                .filter(|a| a.unlocked)
                .map(|a| a.id.clone())
                .collect(),
            auto_build_timers: state
                .auto_build_timers
                .iter()
                .map(|(k, v)| (k.clone(), *v))
                .collect(),
            prestige_currency: state.prestige_currency.iter().map(|(t, c)| (*t, *c)).collect(),
            prestige_count: state.prestige_count,
            lifetime_completions: state.lifetime_completions,
            dormant_tiers: state.dormant_tiers.iter().copied().collect(),
            stats: state.stats.clone(),
            settings: state.settings.clone(),
            next_settlement_id: state.next_settlement_id,
            next_goal_id: state.next_goal_id,
        }
    }

    /// Parse JSON, rejecting other versions before looking at the structure
    pub fn parse(json: &str) -> Result<Self, SaveError> {
        let probe: VersionProbe = serde_json::from_str(json)?;
        if probe.version != SAVE_VERSION {
            return Err(SaveError::VersionMismatch {
                found: probe.version,
                expected: SAVE_VERSION.to_string(),
            });
        }
        let data: SaveData = serde_json::from_str(json)?;
        data.validate()?;
        Ok(data)
    }

    /// Reject saves the engine could not run from
    pub fn validate(&self) -> Result<(), SaveError> {
        let unlocked: BTreeSet<Tier> = self.unlocked_tiers.iter().copied().collect();
        if !unlocked.contains(&Tier::base()) {
            return Err(SaveError::Invalid("base tier is not unlocked".into()));
        }

        let mut seen = BTreeSet::new();
        for s in &self.settlements {
            if !seen.insert(s.id.as_str()) {
                return Err(SaveError::Invalid(format!("duplicate settlement {}", s.id)));
            }
            if !unlocked.contains(&s.tier) {
                return Err(SaveError::Invalid(format!(
                    "settlement {} is of locked tier {}",
                    s.id, s.tier
                )));
            }
            let def = tier_definition(s.tier);
            let complete = s.buildings.len() == def.buildings.len()
                && def.buildings.iter().all(|b| s.buildings.contains_key(b.id));
            if !complete {
                return Err(SaveError::Invalid(format!(
                    "settlement {} has a malformed building map",
                    s.id
                )));
            }
            for goal in &s.goals {
                if let Some(b) = &goal.building_id {
                    if def.building(b).is_none() {
                        return Err(SaveError::Invalid(format!(
                            "goal {} names unknown building {b}",
                            goal.id
                        )));
                    }
                }
            }
        }

        let seed = seed_research_catalog();
        for u in &self.research {
            let Some(root) = seed.iter().find(|s| s.base_id == u.base_id && s.tier == u.tier) else {
                return Err(SaveError::Invalid(format!("unknown research {}", u.id)));
            };
            if u.level == 0 || u.id != format!("{}_{}", u.base_id, u.level) {
                return Err(SaveError::Invalid(format!("research {} has a mismatched level", u.id)));
            }
            if u.effect.kind() != root.effect.kind() {
                return Err(SaveError::Invalid(format!(
                    "research {} changed effect kind",
                    u.id
                )));
            }
            match &u.effect {
                ResearchEffect::AutoBuilding { building_id, .. } => {
                    if tier_definition(u.tier).building(building_id).is_none() {
                        return Err(SaveError::Invalid(format!(
                            "research {} targets unknown building",
                            u.id
                        )));
                    }
                }
                ResearchEffect::ParallelSlots { slots } if *slots > MAX_PARALLEL_SLOTS => {
                    return Err(SaveError::Invalid(format!(
                        "research {} grants {slots} slots, more than {MAX_PARALLEL_SLOTS}",
                        u.id
                    )));
                }
                _ => {}
            }
        }
        if let Some(missing) = seed.iter().find(|s| !self.research.iter().any(|u| u.id == s.id)) {
            return Err(SaveError::Invalid(format!("research {} missing", missing.id)));
        }
        for (id, _) in &self.auto_build_timers {
            if !self.research.iter().any(|u| &u.id == id) {
                return Err(SaveError::Invalid(format!("timer for unknown research {id}")));
            }
        }

        let fresh = GameState::new();
        for id in &self.purchased_prestige {
            if !fresh.prestige_upgrades.iter().any(|u| &u.id == id) {
                return Err(SaveError::Invalid(format!("unknown prestige upgrade {id}")));
            }
        }
        for id in &self.unlocked_achievements {
            if !fresh.achievements.iter().any(|a| &a.id == id) {
                return Err(SaveError::Invalid(format!("unknown achievement {id}")));
            }
        }
        Ok(())
    }

    /// Rebuild the engine state. Call `validate` first.
    pub fn restore(self) -> GameState {
        let mut state = GameState::new();
        state.settlements = self.settlements;
        state.research_points = self.research_points.into_iter().collect();
        state.unlocked_tiers = self.unlocked_tiers.into_iter().collect();
        state.completed_counts = self.completed_counts.into_iter().collect();
        state.research = self.research;
        for upgrade in &mut state.prestige_upgrades {
            upgrade.purchased = self.purchased_prestige.contains(&upgrade.id);
        }
        for achievement in &mut state.achievements {
            achievement.unlocked = self.unlocked_achievements.contains(&achievement.id);
        }
        state.auto_build_timers = self.auto_build_timers.into_iter().collect();
        state.prestige_currency = self.prestige_currency.into_iter().collect();
        state.prestige_count = self.prestige_count;
        state.lifetime_completions = self.lifetime_completions;
        state.dormant_tiers = self.dormant_tiers.into_iter().collect();
        state.stats = self.stats;
        state.settings = self.settings;
        state.next_settlement_id = self.next_settlement_id;
        state.next_goal_id = self.next_goal_id;
        state
    }
}

// ============================================================================
// Storage backends
// ============================================================================

/// Key-value store saves are written to
pub trait SaveStorage {
    fn read(&self, key: &str) -> Result<Option<String>, SaveError>;
    fn write(&mut self, key: &str, value: &str) -> Result<(), SaveError>;
}

/// In-process storage for tests and native runs
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: HashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SaveStorage for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<String>, SaveError> {
        Ok(self.entries.get(key).cloned())
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), SaveError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Browser `localStorage`
#[cfg(target_arch = "wasm32")]
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalStorage;

#[cfg(target_arch = "wasm32")]
impl LocalStorage {
    fn store() -> Result<web_sys::Storage, SaveError> {
        web_sys::window()
            .and_then(|win| win.local_storage().ok().flatten())
            .ok_or(SaveError::StorageUnavailable)
    }
}

#[cfg(target_arch = "wasm32")]
impl SaveStorage for LocalStorage {
    fn read(&self, key: &str) -> Result<Option<String>, SaveError> {
        Self::store()?
            .get_item(key)
            .map_err(|_| SaveError::StorageUnavailable)
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), SaveError> {
        Self::store()?
            .set_item(key, value)
            .map_err(|_| SaveError::StorageUnavailable)
    }
}
