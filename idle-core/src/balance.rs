// Deterministic scripted playthroughs for balance checks
//
// Drives a seeded engine through its public API on a manual clock with a
// goal-aware greedy player. Same config, same report.

use serde::Serialize;

use crate::clock::ManualClock;
use crate::config::EngineConfig;
use crate::engine::GameEngine;
use crate::tiers::{Building, tier_definition};
use crate::types::{GoalKind, Tier};

/// Income buildings are still bought while saving up if they cost at most
/// this share of the savings target
const SAVING_SPEND_SHARE: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Milestone {
    TierUnlocked(Tier),
    Completions(u64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlaythroughConfig {
    pub seed: u64,
    pub tick_secs: f64,
    pub max_iterations: u64, // Hard safety cap
    pub milestone: Milestone,
    pub buy_research: bool,
    pub engine: EngineConfig,
}

impl Default for PlaythroughConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            tick_secs: 1.0,
            max_iterations: 200_000,
            milestone: Milestone::TierUnlocked(Tier::Village),
            buy_research: true,
            engine: EngineConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaythroughReport {
    pub reached: bool,
    pub iterations: u64,
    pub simulated_secs: f64,
    pub completions: Vec<(Tier, u64)>,
    pub lifetime_completions: u64,
    pub unlock_secs: Vec<(Tier, f64)>, // Simulated time each tier unlocked
    pub research_bought: Vec<String>,
}

pub fn run_playthrough(config: &PlaythroughConfig) -> PlaythroughReport {
    let clock = ManualClock::new(0.0);
    let engine_config = EngineConfig {
        seed: Some(config.seed),
        ..config.engine.clone()
    };
    let mut engine = GameEngine::new(engine_config, Box::new(clock.clone()));

    let mut report = PlaythroughReport {
        reached: false,
        iterations: 0,
        simulated_secs: 0.0,
        completions: Vec::new(),
        lifetime_completions: 0,
        unlock_secs: vec![(Tier::base(), 0.0)],
        research_bought: Vec::new(),
    };

    while report.iterations < config.max_iterations {
        if milestone_reached(&engine, config.milestone) {
            report.reached = true;
            break;
        }
        report.iterations += 1;
        clock.advance_secs(config.tick_secs);
        report.simulated_secs += config.tick_secs;
        engine.update();

        for tier in Tier::ALL {
            let seen = report.unlock_secs.iter().any(|(t, _)| *t == tier);
            if engine.state().is_unlocked(tier) && !seen {
                report.unlock_secs.push((tier, report.simulated_secs));
            }
        }
        respawn_empty_tiers(&mut engine);
        if config.buy_research {
            buy_research(&mut engine, &mut report.research_bought);
        }
        play_settlements(&mut engine);
    }
    if !report.reached {
        report.reached = milestone_reached(&engine, config.milestone);
    }

    report.completions = engine
        .state()
        .completed_counts
        .iter()
        .map(|(t, c)| (*t, *c))
        .collect();
    report.lifetime_completions = engine.state().lifetime_completions;
    report
}

fn milestone_reached(engine: &GameEngine, milestone: Milestone) -> bool {
    match milestone {
        Milestone::TierUnlocked(tier) => engine.state().is_unlocked(tier),
        Milestone::Completions(n) => engine.state().lifetime_completions >= n,
    }
}

/// Manually refound dormant higher tiers
fn respawn_empty_tiers(engine: &mut GameEngine) {
    let empty: Vec<Tier> = engine
        .state()
        .unlocked_tiers
        .iter()
        .copied()
        .filter(|t| engine.state().live_count(*t) == 0)
        .collect();
    for tier in empty {
        engine.spawn_settlement(tier);
    }
}

/// Cheapest affordable research first until nothing else fits
fn buy_research(engine: &mut GameEngine, bought: &mut Vec<String>) {
    loop {
        let next = engine
            .available_research()
            .into_iter()
            .filter(|u| engine.research_points(u.tier) >= u.cost)
            .min_by_key(|u| u.cost)
            .map(|u| u.id.clone());
        let Some(id) = next else { break };
        if !engine.purchase_research(&id) {
            break;
        }
        bought.push(id);
    }
}

fn play_settlements(engine: &mut GameEngine) {
    let ids: Vec<String> = engine.state().settlements.iter().map(|s| s.id.clone()).collect();
    for id in ids {
        play_settlement(engine, &id);
    }
}

/// One settlement's purchases for this tick:
/// 1. Buy buildings named by open own-N goals
/// 2. Work out how much to save (hold goals, unaffordable goal buildings)
/// 3. Spend the rest on the best income per cost
fn play_settlement(engine: &mut GameEngine, id: &str) {
    let Some(settlement) = engine.settlement(id) else {
        return;
    };
    let tier = settlement.tier;
    let goal_buildings: Vec<String> = settlement
        .goals
        .iter()
        .filter(|g| !g.completed && g.kind == GoalKind::OwnBuilding)
        .filter_map(|g| g.building_id.clone())
        .collect();
    let hold_target = settlement
        .goals
        .iter()
        .filter(|g| !g.completed && g.kind == GoalKind::HoldCurrency)
        .map(|g| g.target)
        .fold(0.0, f64::max);

    let mut savings_target: f64 = hold_target;
    for building_id in &goal_buildings {
        while engine.buy_building(id, building_id) {}
        if let Some(cost) = engine.building_cost(id, building_id) {
            savings_target = savings_target.max(cost);
        }
    }

    loop {
        let Some(settlement) = engine.settlement(id) else {
            return;
        };
        let currency = settlement.currency;
        let best = tier_definition(tier)
            .buildings
            .iter()
            .filter(|b| b.base_income > 0.0)
            .filter_map(|b| engine.building_cost(id, b.id).map(|cost| (b, cost)))
            .filter(|(_, cost)| *cost <= currency)
            .filter(|(_, cost)| {
                savings_target <= 0.0 || *cost <= savings_target * SAVING_SPEND_SHARE
            })
            .max_by(|(a, ca), (b, cb)| {
                value_per_cost(a, *ca).total_cmp(&value_per_cost(b, *cb))
            });
        let Some((building, _)) = best else {
            return;
        };
        if !engine.buy_building(id, building.id) {
            return;
        }
    }
}

fn value_per_cost(building: &Building, cost: f64) -> f64 {
    building.base_income / cost
}
