// Research catalog: tier-scoped upgrades bought with research points
//
// Repeatable upgrades grow their chain one level at a time: buying the last
// known level appends the next one. Which effects escalate, and how, lives in
// `ESCALATION_RULES`.

use serde::{Deserialize, Serialize};

use crate::tiers::tier_definition;
use crate::types::Tier;

/// Cost multiplier between consecutive levels of a repeatable upgrade
pub const LEVEL_COST_MULTIPLIER: u64 = 3;

/// Highest parallel-slot count research can grant
pub const MAX_PARALLEL_SLOTS: u32 = 4;

// ============================================================================
// Research Effects
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResearchEffect {
    IncomeMultiplier { value: f64 },
    CostReduction { value: f64 },
    ParallelSlots { slots: u32 },
    AutoBuilding { building_id: String, interval_secs: f64 },
    AutobuySpeed { value: f64 },
    StartingIncome { value: f64 },
    CompletionBonus { value: f64 },
    GoalReduction { value: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResearchEffectKind {
    IncomeMultiplier,
    CostReduction,
    ParallelSlots,
    AutoBuilding,
    AutobuySpeed,
    StartingIncome,
    CompletionBonus,
    GoalReduction,
}

impl ResearchEffect {
    pub fn kind(&self) -> ResearchEffectKind {
        match self {
            ResearchEffect::IncomeMultiplier { .. } => ResearchEffectKind::IncomeMultiplier,
            ResearchEffect::CostReduction { .. } => ResearchEffectKind::CostReduction,
            ResearchEffect::ParallelSlots { .. } => ResearchEffectKind::ParallelSlots,
            ResearchEffect::AutoBuilding { .. } => ResearchEffectKind::AutoBuilding,
            ResearchEffect::AutobuySpeed { .. } => ResearchEffectKind::AutobuySpeed,
            ResearchEffect::StartingIncome { .. } => ResearchEffectKind::StartingIncome,
            ResearchEffect::CompletionBonus { .. } => ResearchEffectKind::CompletionBonus,
            ResearchEffect::GoalReduction { .. } => ResearchEffectKind::GoalReduction,
        }
    }
}

// ============================================================================
// Research Upgrade
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchUpgrade {
    pub id: String,
    pub base_id: String,
    pub level: u32,
    pub tier: Tier, // Pays with this tier's research points
    pub name: String,
    pub cost: u64,
    pub effect: ResearchEffect,
    pub purchased: bool,
    pub prerequisite: Option<String>,
    pub repeatable: bool,
}

impl ResearchUpgrade {
    fn new(
        tier: Tier,
        base: &str,
        level: u32,
        name: &str,
        cost: u64,
        effect: ResearchEffect,
    ) -> Self {
        let base_id = format!("{}_{}", tier.as_str(), base);
        Self {
            id: format!("{base_id}_{level}"),
            base_id,
            level,
            tier,
            name: name.to_string(),
            cost,
            effect,
            purchased: false,
            prerequisite: None,
            repeatable: false,
        }
    }

    fn after(mut self, prerequisite: String) -> Self {
        self.prerequisite = Some(prerequisite);
        self
    }

    fn repeatable(mut self) -> Self {
        self.repeatable = true;
        self
    }
}

// ============================================================================
// Escalation policy
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ValueStep {
    Same,
    Add(f64),
    Linear, // Each level adds the level-1 value again
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EscalationRule {
    pub kind: ResearchEffectKind,
    pub step: ValueStep,
    pub ceiling: Option<f64>, // No further levels once the next value would exceed this
}

/// Effect kinds that synthesize a next level on purchase.
/// Kinds without a row (auto-building, goal reduction) never escalate.
pub const ESCALATION_RULES: &[EscalationRule] = &[
    EscalationRule {
        kind: ResearchEffectKind::IncomeMultiplier,
        step: ValueStep::Same,
        ceiling: None,
    },
    EscalationRule {
        kind: ResearchEffectKind::CostReduction,
        step: ValueStep::Same,
        ceiling: None,
    },
    EscalationRule {
        kind: ResearchEffectKind::ParallelSlots,
        step: ValueStep::Add(1.0),
        ceiling: Some(MAX_PARALLEL_SLOTS as f64),
    },
    EscalationRule {
        kind: ResearchEffectKind::AutobuySpeed,
        step: ValueStep::Same,
        ceiling: None,
    },
    EscalationRule {
        kind: ResearchEffectKind::StartingIncome,
        step: ValueStep::Linear,
        ceiling: None,
    },
    EscalationRule {
        kind: ResearchEffectKind::CompletionBonus,
        step: ValueStep::Same,
        ceiling: None,
    },
];

pub fn escalation_rule(kind: ResearchEffectKind) -> Option<&'static EscalationRule> {
    ESCALATION_RULES.iter().find(|r| r.kind == kind)
}

/// `level` is the level of `effect`; level n of a linear chain is n × level 1
fn step_value(
    effect: &ResearchEffect,
    level: u32,
    rule: &EscalationRule,
) -> Option<ResearchEffect> {
    let step = |v: f64| match rule.step {
        ValueStep::Same => v,
        ValueStep::Add(d) => v + d,
        ValueStep::Linear => v + v / f64::from(level.max(1)),
    };
    use ResearchEffect as E;
    let next = match effect {
        E::IncomeMultiplier { value } => E::IncomeMultiplier { value: step(*value) },
        E::CostReduction { value } => E::CostReduction { value: step(*value) },
        E::ParallelSlots { slots } => E::ParallelSlots {
            slots: step(f64::from(*slots)) as u32,
        },
        E::AutobuySpeed { value } => E::AutobuySpeed { value: step(*value) },
        E::StartingIncome { value } => E::StartingIncome { value: step(*value) },
        E::CompletionBonus { value } => E::CompletionBonus { value: step(*value) },
        E::AutoBuilding { .. } | E::GoalReduction { .. } => return None,
    };
    let magnitude = match &next {
        ResearchEffect::ParallelSlots { slots } => f64::from(*slots),
        ResearchEffect::IncomeMultiplier { value }
        | ResearchEffect::CostReduction { value }
        | ResearchEffect::AutobuySpeed { value }
        | ResearchEffect::StartingIncome { value }
        | ResearchEffect::CompletionBonus { value }
        | ResearchEffect::GoalReduction { value } => *value,
        ResearchEffect::AutoBuilding { interval_secs, .. } => *interval_secs,
    };
    match rule.ceiling {
        Some(ceiling) if magnitude > ceiling => None,
        _ => Some(next),
    }
}

/// The level that follows `purchased`, if its chain escalates
pub fn next_level(purchased: &ResearchUpgrade) -> Option<ResearchUpgrade> {
    if !purchased.repeatable {
        return None;
    }
    let rule = escalation_rule(purchased.effect.kind())?;
    let effect = step_value(&purchased.effect, purchased.level, rule)?;
    let level = purchased.level + 1;
    Some(ResearchUpgrade {
        id: format!("{}_{}", purchased.base_id, level),
        base_id: purchased.base_id.clone(),
        level,
        tier: purchased.tier,
        name: purchased.name.clone(),
        cost: purchased.cost.saturating_mul(LEVEL_COST_MULTIPLIER),
        effect,
        purchased: false,
        prerequisite: Some(purchased.id.clone()),
        repeatable: true,
    })
}

/// Append the next level of a just-purchased upgrade when it ends its chain.
/// Returns the new id.
pub fn expand_after_purchase(
    catalog: &mut Vec<ResearchUpgrade>,
    purchased_id: &str,
) -> Option<String> {
    let purchased = catalog.iter().find(|u| u.id == purchased_id)?;
    let is_terminal = !catalog
        .iter()
        .any(|u| u.base_id == purchased.base_id && u.level > purchased.level);
    if !is_terminal {
        return None;
    }
    let next = next_level(purchased)?;
    let id = next.id.clone();
    catalog.push(next);
    Some(id)
}

// ============================================================================
// Seed catalog
// ============================================================================

/// The research list a fresh run starts with: one chain set per tier,
/// costs scaled by tier position
pub fn seed_research_catalog() -> Vec<ResearchUpgrade> {
    Tier::ALL.into_iter().flat_map(tier_research).collect()
}

fn tier_research(tier: Tier) -> Vec<ResearchUpgrade> {
    let scale = tier.index() as u64 + 1;
    let first = tier_definition(tier).first_building();
    let id = |base: &str, level: u32| format!("{}_{}_{}", tier.as_str(), base, level);

    // Every seed upgrade is level 1 of its chain
    let upgrade = |base: &str, name: &str, cost: u64, effect: ResearchEffect| {
        ResearchUpgrade::new(tier, base, 1, name, cost * scale, effect)
    };

    use ResearchEffect as E;
    vec![
        upgrade("income", "Better Tools", 20, E::IncomeMultiplier { value: 0.1 }).repeatable(),
        upgrade("cost", "Efficient Masonry", 30, E::CostReduction { value: 0.05 }).repeatable(),
        upgrade(
            "start",
            "Founding Charter",
            25,
            E::StartingIncome {
                value: first.base_income,
            },
        )
        .repeatable(),
        upgrade("slots", "Expansion", 50, E::ParallelSlots { slots: 2 })
            .after(id("income", 1))
            .repeatable(),
        upgrade(
            "auto",
            "Foremen",
            40,
            E::AutoBuilding {
                building_id: first.id.to_string(),
                interval_secs: 10.0,
            },
        ),
        upgrade("autospeed", "Work Songs", 60, E::AutobuySpeed { value: 0.2 })
            .after(id("auto", 1))
            .repeatable(),
        upgrade("scholars", "Scholars", 80, E::CompletionBonus { value: 5.0 })
            .after(id("cost", 1))
            .repeatable(),
        upgrade("planning", "Town Planning", 100, E::GoalReduction { value: 0.1 })
            .after(id("scholars", 1)),
    ]
}

// ============================================================================
// Aggregation over purchased upgrades
// ============================================================================

fn purchased_in(catalog: &[ResearchUpgrade], tier: Tier) -> impl Iterator<Item = &ResearchEffect> {
    catalog
        .iter()
        .filter(move |u| u.purchased && u.tier == tier)
        .map(|u| &u.effect)
}

/// Income × (1 + Σ value)
pub fn income_multiplier(catalog: &[ResearchUpgrade], tier: Tier) -> f64 {
    1.0 + purchased_in(catalog, tier)
        .map(|e| match e {
            ResearchEffect::IncomeMultiplier { value } => *value,
            _ => 0.0,
        })
        .sum::<f64>()
}

/// Cost × Π (1 - value)
pub fn cost_factor(catalog: &[ResearchUpgrade], tier: Tier) -> f64 {
    purchased_in(catalog, tier)
        .map(|e| match e {
            ResearchEffect::CostReduction { value } => 1.0 - value,
            _ => 1.0,
        })
        .product()
}

/// Parallel settlements allowed for the tier; 1 without research
pub fn parallel_slots(catalog: &[ResearchUpgrade], tier: Tier) -> u32 {
    purchased_in(catalog, tier)
        .filter_map(|e| match e {
            ResearchEffect::ParallelSlots { slots } => Some(*slots),
            _ => None,
        })
        .max()
        .unwrap_or(1)
        .max(1)
}

/// Auto-building interval × Π (1 - value)
pub fn autobuy_interval_factor(catalog: &[ResearchUpgrade], tier: Tier) -> f64 {
    purchased_in(catalog, tier)
        .map(|e| match e {
            ResearchEffect::AutobuySpeed { value } => 1.0 - value,
            _ => 1.0,
        })
        .product()
}

/// Flat income every settlement of the tier starts with
pub fn starting_income(catalog: &[ResearchUpgrade], tier: Tier) -> f64 {
    purchased_in(catalog, tier)
        .map(|e| match e {
            ResearchEffect::StartingIncome { value } => *value,
            _ => 0.0,
        })
        .sum()
}

/// Flat research points added to each completion of the tier
pub fn completion_bonus(catalog: &[ResearchUpgrade], tier: Tier) -> f64 {
    purchased_in(catalog, tier)
        .map(|e| match e {
            ResearchEffect::CompletionBonus { value } => *value,
            _ => 0.0,
        })
        .sum()
}

/// Goal targets × Π (1 - value)
pub fn goal_factor(catalog: &[ResearchUpgrade], tier: Tier) -> f64 {
    purchased_in(catalog, tier)
        .map(|e| match e {
            ResearchEffect::GoalReduction { value } => 1.0 - value,
            _ => 1.0,
        })
        .product()
}
