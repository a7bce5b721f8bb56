use thiserror::Error;

use crate::types::Tier;

/// Why a purchase, spawn or research action was refused.
///
/// Public engine operations collapse these into `false` / `None`; the
/// `try_*` variants hand them back so callers can show a reason.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ActionError {
    #[error("unknown settlement {0}")]
    UnknownSettlement(String),
    #[error("unknown building {0}")]
    UnknownBuilding(String),
    #[error("unknown upgrade {0}")]
    UnknownUpgrade(String),
    #[error("tier {0} is locked")]
    TierLocked(Tier),
    #[error("insufficient funds: required {required}, available {available}")]
    InsufficientFunds { required: f64, available: f64 },
    #[error("insufficient points: required {required}, available {available}")]
    InsufficientPoints { required: u64, available: u64 },
    #[error("{0} already purchased")]
    AlreadyPurchased(String),
    #[error("prerequisite {0} not purchased")]
    MissingPrerequisite(String),
    #[error("nothing to prestige: no completed settlements this run")]
    NothingToPrestige,
}

/// Why an imported save was rejected.
#[derive(Error, Debug)]
pub enum SaveError {
    #[error("malformed save data: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("save version {found} does not match expected {expected}")]
    VersionMismatch { found: String, expected: String },
    #[error("invalid save: {0}")]
    Invalid(String),
    #[error("storage unavailable")]
    StorageUnavailable,
    #[error("no save found under key {0}")]
    NotFound(String),
}

/// String inputs from the JS boundary that name nothing we know.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("unknown tier {0}")]
    UnknownTier(String),
    #[error("unknown buy amount {0} (expected 1, 5 or max)")]
    UnknownBuyAmount(String),
}
