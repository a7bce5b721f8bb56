use std::collections::HashMap;
use std::hash::Hash;

use crate::achievements::AchievementBonusKind;
use crate::prestige::PrestigeEffectKind;
use crate::types::Tier;

/// Memo of derived effect aggregates, valid for one generation.
///
/// A lookup under a different generation than the stored one drops every
/// entry first, so stale values can never be served.
#[derive(Debug, Default)]
pub(super) struct EffectCache {
    generation: u64,
    prestige: HashMap<PrestigeEffectKind, f64>,
    achievement: HashMap<AchievementBonusKind, f64>,
    building_boost: HashMap<Tier, f64>,
    pub(super) recomputations: u64,
}

fn memo<K: Hash + Eq>(
    map: &mut HashMap<K, f64>,
    recomputations: &mut u64,
    key: K,
    compute: impl FnOnce() -> f64,
) -> f64 {
    if let Some(v) = map.get(&key) {
        return *v;
    }
    let v = compute();
    *recomputations += 1;
    map.insert(key, v);
    v
}

impl EffectCache {
    fn sync(&mut self, generation: u64) {
        if self.generation != generation {
            self.prestige.clear();
            self.achievement.clear();
            self.building_boost.clear();
            self.generation = generation;
        }
    }

    pub(super) fn prestige(
        &mut self,
        generation: u64,
        kind: PrestigeEffectKind,
        compute: impl FnOnce() -> f64,
    ) -> f64 {
        self.sync(generation);
        memo(&mut self.prestige, &mut self.recomputations, kind, compute)
    }

    pub(super) fn achievement(
        &mut self,
        generation: u64,
        kind: AchievementBonusKind,
        compute: impl FnOnce() -> f64,
    ) -> f64 {
        self.sync(generation);
        memo(&mut self.achievement, &mut self.recomputations, kind, compute)
    }

    pub(super) fn building_boost(
        &mut self,
        generation: u64,
        tier: Tier,
        compute: impl FnOnce() -> f64,
    ) -> f64 {
        self.sync(generation);
        memo(&mut self.building_boost, &mut self.recomputations, tier, compute)
    }
}
