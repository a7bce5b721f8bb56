use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tsify_next::Tsify;

use crate::error::ParseError;

// ============================================================================
// Tier - A rung on the settlement ladder
// ============================================================================

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Tsify,
)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Hamlet,
    Village,
    Town,
    City,
    County,
    Duchy,
    Realm,
    Kingdom,
}

impl Tier {
    /// Every tier in catalog (progression) order
    pub const ALL: [Tier; 8] = [
        Tier::Hamlet,
        Tier::Village,
        Tier::Town,
        Tier::City,
        Tier::County,
        Tier::Duchy,
        Tier::Realm,
        Tier::Kingdom,
    ];

    /// The tier a fresh run starts with
    pub fn base() -> Tier {
        Tier::ALL[0]
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn is_base(self) -> bool {
        self == Tier::base()
    }

    /// The next tier in catalog order, if any
    pub fn next(self) -> Option<Tier> {
        Tier::ALL.get(self.index() + 1).copied()
    }

    /// Tiers strictly above this one, nearest first
    pub fn higher(self) -> impl Iterator<Item = Tier> {
        Tier::ALL.into_iter().skip(self.index() + 1)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Hamlet => "hamlet",
            Tier::Village => "village",
            Tier::Town => "town",
            Tier::City => "city",
            Tier::County => "county",
            Tier::Duchy => "duchy",
            Tier::Realm => "realm",
            Tier::Kingdom => "kingdom",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Tier::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ParseError::UnknownTier(s.to_string()))
    }
}

// ============================================================================
// Buy Amount - How many units a single buy click purchases
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub enum BuyAmount {
    #[default]
    #[serde(rename = "1")]
    One,
    #[serde(rename = "5")]
    Five,
    #[serde(rename = "max")]
    Max,
}

impl BuyAmount {
    /// Fixed unit count, `None` for "as many as affordable"
    pub fn units(self) -> Option<u32> {
        match self {
            BuyAmount::One => Some(1),
            BuyAmount::Five => Some(5),
            BuyAmount::Max => None,
        }
    }
}

impl FromStr for BuyAmount {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1" => Ok(BuyAmount::One),
            "5" => Ok(BuyAmount::Five),
            "max" => Ok(BuyAmount::Max),
            other => Err(ParseError::UnknownBuyAmount(other.to_string())),
        }
    }
}

// ============================================================================
// Goal Kind
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalKind {
    ReachIncome,
    AccumulateLifetime,
    HoldCurrency,
    OwnBuilding,
    Survive,
}

// ============================================================================
// Timestamps
// ============================================================================

/// Milliseconds since the Unix epoch (the unit `Date.now()` uses)
pub type Millis = f64;

pub fn millis_to_secs(ms: Millis) -> f64 {
    ms / 1000.0
}
