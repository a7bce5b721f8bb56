// Goal templates and randomized goal sets
//
// Template generation is deterministic (`goal_templates`); only
// `generate_random_goals` touches the RNG and the id counter.

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::tiers::tier_definition;
use crate::types::{GoalKind, Tier};

// ============================================================================
// Goal - A live objective on a settlement
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub id: String,
    pub kind: GoalKind,
    pub description: String,
    pub target: f64,
    pub current: f64,
    pub completed: bool, // Sticky: never reverts once set
    pub building_id: Option<String>,
}

impl Goal {
    /// Update the current value, latching completion once `current >= target`
    pub fn observe(&mut self, current: f64, effective_target: f64) {
        self.current = current;
        if !self.completed && current >= effective_target {
            self.completed = true;
        }
    }
}

// ============================================================================
// Goal Templates
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GoalTemplate {
    pub kind: GoalKind,
    pub template: String, // Contains `{value}` or `{minutes}`
    pub target: f64,
    pub building_id: Option<String>,
}

impl GoalTemplate {
    pub fn describe(&self) -> String {
        match self.kind {
            GoalKind::Survive => {
                let minutes = self.target as u64 / 60;
                self.template.replace("{minutes}", &minutes.to_string())
            }
            _ => self.template.replace("{value}", &format_number(self.target)),
        }
    }

    fn instantiate(&self, id: String) -> Goal {
        Goal {
            id,
            kind: self.kind,
            description: self.describe(),
            target: self.target,
            current: 0.0,
            completed: false,
            building_id: self.building_id.clone(),
        }
    }
}

// Hamlet-scale economic targets; multiplied by the tier's goal scale
const BASE_INCOME_TARGET: f64 = 5.0;
const BASE_LIFETIME_TARGET: f64 = 1_000.0;
const BASE_HOLD_TARGET: f64 = 300.0;
const BASE_SURVIVE_SECS: f64 = 180.0;
const SURVIVE_SECS_PER_TIER: f64 = 60.0;

/// Every goal a settlement of `tier` could be given
pub fn goal_templates(tier: Tier) -> Vec<GoalTemplate> {
    let def = tier_definition(tier);
    let scale = def.goal_scale;

    let mut templates = vec![
        GoalTemplate {
            kind: GoalKind::ReachIncome,
            template: "Reach {value}/s income".to_string(),
            target: BASE_INCOME_TARGET * scale,
            building_id: None,
        },
        GoalTemplate {
            kind: GoalKind::AccumulateLifetime,
            template: "Earn {value} currency in total".to_string(),
            target: BASE_LIFETIME_TARGET * scale,
            building_id: None,
        },
        GoalTemplate {
            kind: GoalKind::HoldCurrency,
            template: "Hold {value} currency at once".to_string(),
            target: BASE_HOLD_TARGET * scale,
            building_id: None,
        },
        GoalTemplate {
            kind: GoalKind::Survive,
            template: "Endure for {minutes} minutes".to_string(),
            target: BASE_SURVIVE_SECS + SURVIVE_SECS_PER_TIER * tier.index() as f64,
            building_id: None,
        },
    ];

    for building in def.buildings {
        templates.push(GoalTemplate {
            kind: GoalKind::OwnBuilding,
            template: format!("Own {{value}} {}", plural(building.name)),
            target: f64::from(building.category.goal_target()),
            building_id: Some(building.id.to_string()),
        });
    }

    templates
}

fn plural(name: &str) -> String {
    if name.ends_with('y') && !name.ends_with("ey") {
        format!("{}ies", &name[..name.len() - 1])
    } else if name.ends_with('s') || name.ends_with('h') {
        format!("{name}es")
    } else {
        format!("{name}s")
    }
}

/// Source of fresh, monotonically increasing goal ids
pub trait GoalIds {
    fn next_goal_id(&mut self) -> String;
}

/// Pick `count` distinct templates uniformly at random and instantiate them
pub fn generate_random_goals<R: Rng + ?Sized>(
    tier: Tier,
    count: usize,
    rng: &mut R,
    ids: &mut impl GoalIds,
) -> Vec<Goal> {
    let mut templates = goal_templates(tier);
    templates.shuffle(rng);
    templates
        .into_iter()
        .take(count)
        .map(|t| t.instantiate(ids.next_goal_id()))
        .collect()
}

// ============================================================================
// Number formatting
// ============================================================================

/// Abbreviate with K / M suffixes: 950 -> "950", 1500 -> "1.5K", 2e6 -> "2M"
pub fn format_number(value: f64) -> String {
    let abs = value.abs();
    let (scaled, suffix) = if abs >= 1_000_000.0 {
        (value / 1_000_000.0, "M")
    } else if abs >= 1_000.0 {
        (value / 1_000.0, "K")
    } else {
        return format!("{}", value.floor() as i64);
    };
    let rounded = (scaled * 10.0).round() / 10.0;
    if rounded.fract() == 0.0 {
        format!("{}{suffix}", rounded as i64)
    } else {
        format!("{rounded:.1}{suffix}")
    }
}
