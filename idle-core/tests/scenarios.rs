//! End-to-end scenarios driven through the public engine API
//!
//! State the API cannot reach directly (finished goals, counters) is set up
//! by editing an exported save and importing it back.

use idle_core::{
    BuyAmount, EngineConfig, GameEngine, GoalKind, ManualClock, SaveData, Tier, tier_definition,
};

// === FIXTURES ===

fn engine(seed: u64) -> (GameEngine, ManualClock) {
    let clock = ManualClock::new(1_000_000.0);
    let engine = GameEngine::new(EngineConfig::seeded(seed), Box::new(clock.clone()));
    (engine, clock)
}

fn edit_state(engine: &mut GameEngine, edit: impl FnOnce(&mut SaveData)) {
    let mut data = SaveData::parse(&engine.export_save().unwrap()).unwrap();
    edit(&mut data);
    assert!(engine.import_save(&serde_json::to_string(&data).unwrap()));
}

fn finish_goals(engine: &mut GameEngine, settlement_id: &str) {
    edit_state(engine, |data| {
        let s = data.settlements.iter_mut().find(|s| s.id == settlement_id).unwrap();
        for goal in &mut s.goals {
            goal.completed = true;
        }
    });
}

fn first_of(engine: &GameEngine, tier: Tier) -> String {
    engine.settlements_of(tier).next().unwrap().id.clone()
}

// === SCENARIOS ===

#[test]
fn fresh_engine_has_one_hamlet_ready_to_buy() {
    let (engine, _) = engine(1);
    let state = engine.state();
    assert_eq!(state.settlements.len(), 1);

    let hamlet = &state.settlements[0];
    assert_eq!(hamlet.tier, Tier::Hamlet);
    assert_eq!(hamlet.currency, 10.0);
    assert_eq!(hamlet.goals.len(), 1);
    assert_eq!(hamlet.lifetime_earned, 0.0);
    assert!(state.is_unlocked(Tier::Hamlet));
    assert!(!state.is_unlocked(Tier::Village));
}

#[test]
fn first_and_second_hut() {
    let (mut engine, _) = engine(2);
    let id = first_of(&engine, Tier::Hamlet);

    assert!(engine.buy_building(&id, "hamlet_hut"));
    let hamlet = engine.settlement(&id).unwrap();
    assert_eq!(hamlet.currency, 0.0);
    assert_eq!(hamlet.count("hamlet_hut"), 1);
    assert_eq!(hamlet.total_income, 1.0);

    assert_eq!(engine.building_cost(&id, "hamlet_hut"), Some(11.0));
}

#[test]
fn spawning_locked_tiers_is_refused() {
    let (mut engine, _) = engine(3);
    for tier in Tier::ALL.into_iter().filter(|t| !t.is_base()) {
        assert_eq!(engine.spawn_settlement(tier), None, "{tier} should be locked");
    }
    assert_eq!(engine.state().settlements.len(), 1);
}

#[test]
fn completed_hamlet_is_replaced() {
    let (mut engine, clock) = engine(4);
    let id = first_of(&engine, Tier::Hamlet);
    finish_goals(&mut engine, &id);

    clock.advance_secs(0.1);
    engine.update();

    let state = engine.state();
    assert!(engine.settlement(&id).is_none());
    assert_eq!(state.completed(Tier::Hamlet), 1);
    assert_eq!(state.lifetime_completions, 1);
    assert!(state.research_points(Tier::Hamlet) >= 10);

    let replacement = &state.settlements[0];
    assert_eq!(state.live_count(Tier::Hamlet), 1);
    assert_ne!(replacement.id, id);
    assert_eq!(replacement.currency, 10.0);
    assert_eq!(replacement.lifetime_earned, 0.0);
    assert!(replacement.buildings.values().all(|&c| c == 0));
}

#[test]
fn six_hamlets_unlock_one_village() {
    let (mut engine, clock) = engine(5);
    for n in 1..=6 {
        let id = first_of(&engine, Tier::Hamlet);
        finish_goals(&mut engine, &id);
        clock.advance_secs(0.1);
        engine.update();
        assert_eq!(engine.state().completed(Tier::Hamlet), n);
        assert_eq!(engine.state().is_unlocked(Tier::Village), n == 6);
    }
    assert_eq!(engine.state().live_count(Tier::Village), 1);
    assert_eq!(engine.state().live_count(Tier::Hamlet), 1);

    let village = engine.settlements_of(Tier::Village).next().unwrap();
    let cheapest = tier_definition(Tier::Village).cheapest_building().base_cost;
    assert!(village.currency >= cheapest);
}

#[test]
fn completed_village_waits_for_manual_respawn() {
    let (mut engine, clock) = engine(6);
    edit_state(&mut engine, |data| data.unlocked_tiers.push(Tier::Village));
    // Unlocking fills the new tier's slot
    assert_eq!(engine.state().live_count(Tier::Village), 1);
    let village = first_of(&engine, Tier::Village);
    finish_goals(&mut engine, &village);

    clock.advance_secs(0.1);
    engine.update();
    assert_eq!(engine.state().completed(Tier::Village), 1);
    assert_eq!(engine.state().live_count(Tier::Village), 0);

    clock.advance_secs(0.1);
    engine.update();
    assert_eq!(engine.state().live_count(Tier::Village), 0);

    assert!(engine.spawn_settlement(Tier::Village).is_some());
    assert_eq!(engine.state().live_count(Tier::Village), 1);
}

#[test]
fn multi_slot_village_is_replenished() {
    let (mut engine, clock) = engine(12);
    edit_state(&mut engine, |data| {
        data.unlocked_tiers.push(Tier::Village);
        data.research_points.push((Tier::Village, 500));
    });
    assert!(engine.purchase_research("village_income_1"));
    assert!(engine.purchase_research("village_slots_1"));
    assert_eq!(engine.state().live_count(Tier::Village), 2);

    let village = first_of(&engine, Tier::Village);
    finish_goals(&mut engine, &village);
    clock.advance_secs(0.1);
    engine.update();

    let state = engine.state();
    assert_eq!(state.completed(Tier::Village), 1);
    assert!(engine.settlement(&village).is_none());
    assert_eq!(state.live_count(Tier::Village), 2);
    assert!(state.dormant_tiers.is_empty());
}

#[test]
fn dev_mode_pays_a_thousandfold() {
    let (mut engine, clock) = engine(7);
    let id = first_of(&engine, Tier::Hamlet);
    engine.buy_building(&id, "hamlet_hut");
    assert!(engine.toggle_dev_mode());

    clock.advance_secs(1.0);
    engine.update();
    let gained = engine.settlement(&id).map(|s| s.currency);
    // Goals may have completed and removed the settlement; it held ~1000 if not
    if let Some(currency) = gained {
        assert!((currency - 1000.0).abs() < 1e-6, "gained {currency}");
    } else {
        assert_eq!(engine.state().completed(Tier::Hamlet), 1);
    }
}

#[test]
fn long_absence_is_credited_in_full() {
    let (mut engine, clock) = engine(8);
    let id = first_of(&engine, Tier::Hamlet);
    engine.buy_building(&id, "hamlet_hut");

    clock.advance_secs(3.0);
    engine.update();
    let lifetime = engine.settlement(&id).map(|s| s.lifetime_earned);
    if let Some(lifetime) = lifetime {
        assert!((lifetime - 3.0).abs() < 1e-9);
    }
}

#[test]
fn buy_amount_setting_drives_bulk_purchase() {
    let (mut engine, _) = engine(9);
    let id = first_of(&engine, Tier::Hamlet);
    edit_state(&mut engine, |data| {
        let hamlet = &mut data.settlements[0];
        hamlet.currency = 200.0;
        for goal in &mut hamlet.goals {
            goal.kind = GoalKind::HoldCurrency;
            goal.target = 1e15;
        }
    });

    engine.set_buy_amount(BuyAmount::Five);
    let expected = engine.bulk_buy_cost(&id, "hamlet_hut", 5).unwrap();
    assert_eq!(engine.buy_selected_amount(&id, "hamlet_hut"), 5);
    let hamlet = engine.settlement(&id).unwrap();
    assert!((hamlet.total_spent - expected).abs() < 1e-9);

    engine.set_buy_amount(BuyAmount::Max);
    let affordable = engine.max_affordable(&id, "hamlet_hut");
    assert_eq!(engine.buy_selected_amount(&id, "hamlet_hut"), affordable);
    assert_eq!(engine.max_affordable(&id, "hamlet_hut"), 0);
}

#[test]
fn prestige_resets_run_but_keeps_lifetime_progress() {
    let (mut engine, clock) = engine(10);
    assert!(!engine.perform_prestige());

    for _ in 0..4 {
        let id = first_of(&engine, Tier::Hamlet);
        finish_goals(&mut engine, &id);
        clock.advance_secs(0.1);
        engine.update();
    }
    assert_eq!(engine.prestige_preview(), vec![(Tier::Hamlet, 2)]);
    assert!(engine.perform_prestige());

    let state = engine.state();
    assert_eq!(state.prestige_currency(Tier::Hamlet), 2);
    assert_eq!(state.prestige_count, 1);
    assert_eq!(state.lifetime_completions, 4);
    assert_eq!(state.completed(Tier::Hamlet), 0);
    assert_eq!(state.research_points(Tier::Hamlet), 0);
    assert_eq!(state.settlements.len(), 1);

    // Permanent upgrade bought with the new currency carries into the run
    assert!(engine.purchase_prestige_upgrade("prestige_income_1"));
    let id = first_of(&engine, Tier::Hamlet);
    engine.buy_building(&id, "hamlet_hut");
    assert!(engine.settlement_income(&id) > 1.0);
}

#[test]
fn patronage_flows_down_from_completed_villages() {
    let (mut engine, clock) = engine(11);
    let id = first_of(&engine, Tier::Hamlet);
    assert_eq!(engine.cross_tier_bonus(&id), 0.0);

    edit_state(&mut engine, |data| {
        data.unlocked_tiers.push(Tier::Village);
        data.completed_counts.push((Tier::Village, 4));
    });
    let bonus = engine.cross_tier_bonus(&id);
    let village_income = tier_definition(Tier::Village).first_building().base_income;
    assert!((bonus - 4.0 * village_income * 0.05 / 2.0).abs() < 1e-9);

    // Patronage pays even with no buildings
    clock.advance_secs(2.0);
    engine.update();
    if let Some(hamlet) = engine.settlement(&id) {
        assert!((hamlet.lifetime_earned - 2.0 * bonus).abs() < 1e-9);
    }
    assert!(engine.total_income() >= bonus);
}
