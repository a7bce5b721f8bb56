use serde::Serialize;

use crate::types::Tier;

// ============================================================================
// Building Effects - What a building does besides producing income
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BuildingEffect {
    /// Settlement income × (1 + value × owned)
    IncomeMultiplier { value: f64 },
    /// Settlement building costs × (1 - value)^owned
    CostReduction { value: f64 },
    /// Extra research points per unit owned when the settlement completes
    CompletionBonus { value: f64 },
    /// Target building earns an extra `value` of its base income per unit owned
    SynergyBoost { target: &'static str, value: f64 },
    /// Goal targets × (1 - value)^owned
    GoalReduction { value: f64 },
}

/// Rarer buildings get lower own-N goal targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildingCategory {
    Common,
    Advanced,
    Rare,
}

impl BuildingCategory {
    pub fn goal_target(self) -> u32 {
        match self {
            BuildingCategory::Common => 10,
            BuildingCategory::Advanced => 5,
            BuildingCategory::Rare => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Building {
    pub id: &'static str,
    pub name: &'static str,
    pub base_cost: f64,
    pub base_income: f64, // Per second, per unit owned
    pub cost_multiplier: f64,
    pub category: BuildingCategory,
    pub effect: Option<BuildingEffect>,
}

// ============================================================================
// Tier Definitions
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize)]
pub struct TierDefinition {
    pub tier: Tier,
    pub name: &'static str,
    pub buildings: &'static [Building],
    pub goals_per_settlement: usize,
    pub unlock_threshold: u64, // Completions of this tier per unlock of the next
    pub goal_scale: f64,       // Multiplier on the economic goal templates
}

impl TierDefinition {
    pub fn building(&self, id: &str) -> Option<&'static Building> {
        self.buildings.iter().find(|b| b.id == id)
    }

    pub fn first_building(&self) -> &'static Building {
        &self.buildings[0]
    }

    /// The building a fresh settlement can always afford one of
    pub fn cheapest_building(&self) -> &'static Building {
        self.buildings
            .iter()
            .min_by(|a, b| a.base_cost.total_cmp(&b.base_cost))
            .unwrap_or(&self.buildings[0])
    }
}

const fn building(
    id: &'static str,
    name: &'static str,
    base_cost: f64,
    base_income: f64,
    cost_multiplier: f64,
    category: BuildingCategory,
    effect: Option<BuildingEffect>,
) -> Building {
    Building {
        id,
        name,
        base_cost,
        base_income,
        cost_multiplier,
        category,
        effect,
    }
}

use BuildingCategory::{Advanced, Common, Rare};
use BuildingEffect::{CompletionBonus, CostReduction, GoalReduction, IncomeMultiplier, SynergyBoost};

const HAMLET: &[Building] = &[
    building("hamlet_hut", "Hut", 10.0, 1.0, 1.15, Common, None),
    building("hamlet_farm", "Farm", 60.0, 5.0, 1.15, Common, None),
    building(
        "hamlet_well",
        "Well",
        250.0,
        0.0,
        1.2,
        Advanced,
        Some(IncomeMultiplier { value: 0.05 }),
    ),
    building(
        "hamlet_market",
        "Market",
        500.0,
        12.0,
        1.18,
        Advanced,
        Some(SynergyBoost {
            target: "hamlet_farm",
            value: 0.1,
        }),
    ),
    building(
        "hamlet_shrine",
        "Shrine",
        1_000.0,
        0.0,
        1.3,
        Rare,
        Some(CompletionBonus { value: 2.0 }),
    ),
];

const VILLAGE: &[Building] = &[
    building("village_cottage", "Cottage", 200.0, 8.0, 1.15, Common, None),
    building("village_mill", "Mill", 1_200.0, 40.0, 1.15, Common, None),
    building(
        "village_workshop",
        "Workshop",
        3_000.0,
        0.0,
        1.2,
        Advanced,
        Some(CostReduction { value: 0.03 }),
    ),
    building(
        "village_tavern",
        "Tavern",
        6_000.0,
        90.0,
        1.18,
        Advanced,
        Some(SynergyBoost {
            target: "village_cottage",
            value: 0.1,
        }),
    ),
    building(
        "village_chapel",
        "Chapel",
        10_000.0,
        0.0,
        1.3,
        Rare,
        Some(GoalReduction { value: 0.05 }),
    ),
];

const TOWN: &[Building] = &[
    building("town_house", "Townhouse", 4_000.0, 60.0, 1.15, Common, None),
    building("town_smithy", "Smithy", 25_000.0, 300.0, 1.15, Common, None),
    building(
        "town_guild",
        "Guild Hall",
        60_000.0,
        0.0,
        1.2,
        Advanced,
        Some(IncomeMultiplier { value: 0.08 }),
    ),
    building(
        "town_bank",
        "Bank",
        150_000.0,
        0.0,
        1.22,
        Advanced,
        Some(CostReduction { value: 0.04 }),
    ),
    building(
        "town_library",
        "Library",
        200_000.0,
        0.0,
        1.3,
        Rare,
        Some(CompletionBonus { value: 5.0 }),
    ),
];

const CITY: &[Building] = &[
    building("city_tenement", "Tenement", 80_000.0, 500.0, 1.15, Common, None),
    building("city_forge", "Forge", 500_000.0, 2_500.0, 1.15, Common, None),
    building(
        "city_harbor",
        "Harbor",
        1_500_000.0,
        6_000.0,
        1.18,
        Advanced,
        Some(SynergyBoost {
            target: "city_forge",
            value: 0.08,
        }),
    ),
    building(
        "city_university",
        "University",
        3_000_000.0,
        0.0,
        1.3,
        Rare,
        Some(CompletionBonus { value: 10.0 }),
    ),
];

const COUNTY: &[Building] = &[
    building("county_manor", "Manor", 1_600_000.0, 4_000.0, 1.15, Common, None),
    building("county_vineyard", "Vineyard", 10_000_000.0, 20_000.0, 1.15, Common, None),
    building(
        "county_courthouse",
        "Courthouse",
        30_000_000.0,
        0.0,
        1.25,
        Advanced,
        Some(GoalReduction { value: 0.05 }),
    ),
    building(
        "county_granary",
        "Granary",
        50_000_000.0,
        0.0,
        1.3,
        Rare,
        Some(IncomeMultiplier { value: 0.1 }),
    ),
];

const DUCHY: &[Building] = &[
    building("duchy_keep", "Keep", 32_000_000.0, 30_000.0, 1.15, Common, None),
    building("duchy_port", "Port", 200_000_000.0, 150_000.0, 1.15, Common, None),
    building(
        "duchy_treasury",
        "Treasury",
        600_000_000.0,
        0.0,
        1.25,
        Advanced,
        Some(CostReduction { value: 0.05 }),
    ),
    building(
        "duchy_academy",
        "Academy",
        1_000_000_000.0,
        0.0,
        1.3,
        Rare,
        Some(CompletionBonus { value: 20.0 }),
    ),
];

const REALM: &[Building] = &[
    building("realm_citadel", "Citadel", 640_000_000.0, 220_000.0, 1.15, Common, None),
    building("realm_mint", "Mint", 4_000_000_000.0, 1_100_000.0, 1.15, Common, None),
    building(
        "realm_cathedral",
        "Cathedral",
        12_000_000_000.0,
        0.0,
        1.25,
        Advanced,
        Some(IncomeMultiplier { value: 0.12 }),
    ),
    building(
        "realm_council",
        "Council",
        20_000_000_000.0,
        0.0,
        1.3,
        Rare,
        Some(GoalReduction { value: 0.08 }),
    ),
];

const KINGDOM: &[Building] = &[
    building("kingdom_palace", "Palace", 12_800_000_000.0, 1_600_000.0, 1.15, Common, None),
    building("kingdom_capital", "Capital", 80_000_000_000.0, 8_000_000.0, 1.15, Common, None),
    building(
        "kingdom_wonder",
        "Wonder",
        250_000_000_000.0,
        0.0,
        1.25,
        Advanced,
        Some(SynergyBoost {
            target: "kingdom_palace",
            value: 0.15,
        }),
    ),
    building(
        "kingdom_throne",
        "Throne",
        400_000_000_000.0,
        0.0,
        1.3,
        Rare,
        Some(CompletionBonus { value: 50.0 }),
    ),
];

const TIERS: [TierDefinition; 8] = [
    tier_def(Tier::Hamlet, "Hamlet", HAMLET, 1, 1.0),
    tier_def(Tier::Village, "Village", VILLAGE, 2, 20.0),
    tier_def(Tier::Town, "Town", TOWN, 3, 400.0),
    tier_def(Tier::City, "City", CITY, 3, 8_000.0),
    tier_def(Tier::County, "County", COUNTY, 3, 160_000.0),
    tier_def(Tier::Duchy, "Duchy", DUCHY, 3, 3_200_000.0),
    tier_def(Tier::Realm, "Realm", REALM, 3, 64_000_000.0),
    tier_def(Tier::Kingdom, "Kingdom", KINGDOM, 3, 1_280_000_000.0),
];

const fn tier_def(
    tier: Tier,
    name: &'static str,
    buildings: &'static [Building],
    goals_per_settlement: usize,
    goal_scale: f64,
) -> TierDefinition {
    TierDefinition {
        tier,
        name,
        buildings,
        goals_per_settlement,
        unlock_threshold: 6,
        goal_scale,
    }
}

/// Look up the static definition of a tier
pub fn tier_definition(tier: Tier) -> &'static TierDefinition {
    &TIERS[tier.index()]
}

/// Every tier definition in catalog order
pub fn tier_catalog() -> &'static [TierDefinition] {
    &TIERS
}

/// Find a building by id in any tier
pub fn find_building(id: &str) -> Option<(Tier, &'static Building)> {
    TIERS
        .iter()
        .find_map(|def| def.building(id).map(|b| (def.tier, b)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_matches_tier_order() {
        for (def, tier) in tier_catalog().iter().zip(Tier::ALL) {
            assert_eq!(def.tier, tier);
            assert!(!def.buildings.is_empty(), "{tier} has no buildings");
        }
    }

    #[test]
    fn test_hamlet_hut_is_cheapest_hamlet_building() {
        let hamlet = tier_definition(Tier::Hamlet);
        let hut = hamlet.cheapest_building();
        assert_eq!(hut.id, "hamlet_hut");
        assert_eq!(hut.base_cost, 10.0);
        assert_eq!(hut.base_income, 1.0);
        assert_eq!(hut.cost_multiplier, 1.15);
    }

    #[test]
    fn test_building_ids_are_tier_prefixed_and_unique() {
        let mut seen = std::collections::HashSet::new();
        for def in tier_catalog() {
            for b in def.buildings {
                assert!(b.id.starts_with(def.tier.as_str()), "{} not prefixed", b.id);
                assert!(b.cost_multiplier > 1.0, "{} multiplier must grow", b.id);
                assert!(seen.insert(b.id), "duplicate building id {}", b.id);
            }
        }
    }

    #[test]
    fn test_synergy_targets_exist_in_same_tier() {
        for def in tier_catalog() {
            for b in def.buildings {
                if let Some(BuildingEffect::SynergyBoost { target, .. }) = b.effect {
                    assert!(def.building(target).is_some(), "{} targets {}", b.id, target);
                }
            }
        }
    }

    #[test]
    fn test_find_building() {
        let (tier, b) = find_building("village_mill").unwrap();
        assert_eq!(tier, Tier::Village);
        assert_eq!(b.base_income, 40.0);
        assert!(find_building("castle").is_none());
    }
}
