//! # Types
//!
//! Shared data structures used across all modules of the token sale.
//!
//! ## Design decisions
//!
//! ### Lifecycle as a Finite-State Machine
//!
//! [`SaleState`] enforces a strict forward-only lifecycle:
//!
//! ```text
//! Pending ──► Open ──► Finalized
//!               └────► Refunding
//! ```
//!
//! `Finalized` and `Refunding` are terminal and mutually exclusive. Pricing
//! parameters are writable only while `Pending`.
//!
//! ### Prices
//!
//! Every price field is an 18-decimal fixed-point value (see
//! [`crate::pricing::fixed::Wad`]) expressing raise-token base units per
//! sale-token base unit. Quantities (value, units, supply) are plain base units.

use soroban_sdk::{contracttype, Vec};

/// Lifecycle state of the sale.
#[contracttype]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SaleState {
    /// Accepting configuration only.
    Pending,
    /// Accepting contributions.
    Open,
    /// Contributions closed; raised value withdrawable by the operator.
    Finalized,
    /// Contributions closed; every contributor may recover their value.
    Refunding,
}

impl SaleState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SaleState::Finalized | SaleState::Refunding)
    }
}

/// Pricing shape, fixed when the sale is initialised.
#[contracttype]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PricingMode {
    Tranche,
    Curve,
}

/// A fixed-supply, fixed-price slice of the allocation.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Tranche {
    pub supply: i128,
    pub price: i128,
}

/// Linear bonding curve: `price(s) = start_price + (end_price - start_price) * s / total_supply`.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Curve {
    pub start_price: i128,
    pub end_price: i128,
    pub total_supply: i128,
}

/// Limits, time window and emergency timeout.
///
/// A zero value disables the corresponding limit or window bound.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SaleConfig {
    /// Smallest value accepted by a single `contribute` call.
    pub min_contribution: i128,
    /// Largest value accepted by a single `contribute` call.
    pub max_contribution: i128,
    /// Cumulative value cap per contributor address.
    ///
    /// This is a usability guard only. Nothing binds an address to a person,
    /// so the cap is trivially bypassed by contributing from several addresses
    /// and provides no resistance to multi-identity abuse.
    pub max_per_contributor: i128,
    /// Whether an address may contribute more than once.
    pub allow_repeat: bool,
    /// Ledger timestamp before which contributions are rejected.
    pub start_time: u64,
    /// Ledger timestamp after which contributions are rejected.
    pub end_time: u64,
    /// Seconds after `open` at which anyone may force the sale into `Refunding`.
    pub emergency_timeout: u64,
}

/// Per-contributor ledger record. Never deleted.
#[contracttype]
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Contribution {
    pub value: i128,
    pub units: i128,
    pub refunded: bool,
}

/// Aggregate counters, rewritten on every contribution.
#[contracttype]
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Totals {
    pub raised: i128,
    pub sold: i128,
    pub withdrawn: i128,
    pub refunded: i128,
    pub contributors: u32,
}

/// Result of a read-only `preview`.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Preview {
    pub units: i128,
    pub cost: i128,
    pub refund: i128,
    /// Spot price movement caused by the contribution, in basis points.
    pub price_impact_bps: i128,
}

/// Snapshot for the progress widget of the sale page.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Progress {
    pub state: SaleState,
    pub raised: i128,
    pub sold: i128,
    pub supply: i128,
    pub price: i128,
    pub contributors: u32,
}

/// Pricing parameters of the active mode, as loaded from storage.
#[derive(Clone, Debug)]
pub enum Pricing {
    Tranche(Vec<Tranche>),
    Curve(Curve),
}
