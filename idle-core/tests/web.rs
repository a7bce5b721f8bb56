//! Browser-side smoke tests for the `Game` bindings
//!
//! Run with `wasm-pack test --headless --firefox idle-core`.
#![cfg(target_arch = "wasm32")]

use idle_core::{BuyAmount, Game};
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

fn first_settlement(game: &Game) -> String {
    game.summary().settlements[0].id.clone()
}

#[wasm_bindgen_test]
fn new_game_buys_first_hut() {
    let mut game = Game::with_config(r#"{"seed": 1}"#).unwrap();
    let id = first_settlement(&game);
    assert_eq!(game.building_cost(&id, "hamlet_hut"), Some(10.0));
    assert!(game.buy_building(&id, "hamlet_hut"));
    assert_eq!(game.total_income(), 1.0);
}

#[wasm_bindgen_test]
fn string_inputs_are_validated() {
    let mut game = Game::with_config("{}").unwrap();
    assert!(Game::with_config("not json").is_err());
    assert_eq!(game.spawn_settlement("empire"), None);
    assert_eq!(game.spawn_settlement("village"), None);
    assert!(!game.set_buy_amount("7"));
    assert!(game.set_buy_amount("max"));
    assert_eq!(game.buy_amount(), BuyAmount::Max);
    assert_eq!(game.research_points("nowhere"), 0);
}

#[wasm_bindgen_test]
fn local_storage_round_trip() {
    let mut game = Game::with_config(r#"{"seed": 3}"#).unwrap();
    let id = first_settlement(&game);
    game.buy_building(&id, "hamlet_hut");
    assert!(game.save());

    let mut restored = Game::with_config(r#"{"seed": 4}"#).unwrap();
    assert!(restored.load());
    assert!(restored.get_state().is_ok());
    assert_eq!(first_settlement(&restored), id);
}
