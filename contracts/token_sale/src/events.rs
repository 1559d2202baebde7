//! # Events
//!
//! Every state-changing entry point publishes exactly one event describing
//! what it did (plus one `tranche` event per tranche boundary a contribution
//! crosses). The off-chain indexer keys on the leading topic symbol.
//!
//! | Topic        | Extra topic    | Data                    |
//! |--------------|----------------|-------------------------|
//! | `init`       | -              | [`SaleInitialized`]     |
//! | `config`     | -              | `SaleConfig`            |
//! | `tr_add`     | index          | `Tranche`               |
//! | `tr_clear`   | -              | `()`                    |
//! | `curve`      | -              | `Curve`                 |
//! | `opened`     | -              | `u64` (timestamp)       |
//! | `contrib`    | contributor    | [`Contributed`]         |
//! | `tranche`    | -              | [`TrancheAdvanced`]     |
//! | `deadline`   | -              | [`DeadlineExtended`]    |
//! | `finalized`  | -              | [`SaleClosed`]          |
//! | `refunds`    | -              | [`SaleClosed`]          |
//! | `emergency`  | caller         | [`SaleClosed`]          |
//! | `withdrawn`  | operator       | [`Withdrawn`]           |
//! | `refunded`   | contributor    | `i128` (value returned) |
//! | `paused`     | -              | `()`                    |
//! | `unpaused`   | -              | `()`                    |

use soroban_sdk::{contracttype, symbol_short, Address, Env};

use crate::types::{Curve, PricingMode, SaleConfig, Tranche};

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SaleInitialized {
    pub operator: Address,
    pub raise_token: Address,
    pub mode: PricingMode,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Contributed {
    /// Value offered by the call.
    pub value: i128,
    /// Value kept by the sale.
    pub cost: i128,
    /// Value returned in the same call.
    pub refund: i128,
    pub units: i128,
    /// Average price paid in this call (Wad).
    pub avg_price: i128,
    /// Spot price after the call (Wad).
    pub spot_price: i128,
    pub total_raised: i128,
    pub total_sold: i128,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TrancheAdvanced {
    pub from: u32,
    pub to: u32,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DeadlineExtended {
    pub old_end_time: u64,
    pub new_end_time: u64,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SaleClosed {
    pub total_raised: i128,
    pub total_sold: i128,
    pub timestamp: u64,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Withdrawn {
    pub amount: i128,
    pub remaining: i128,
}

pub fn emit_initialized(env: &Env, operator: Address, raise_token: Address, mode: PricingMode) {
    env.events().publish(
        (symbol_short!("init"),),
        SaleInitialized {
            operator,
            raise_token,
            mode,
        },
    );
}

pub fn emit_config_set(env: &Env, config: SaleConfig) {
    env.events().publish((symbol_short!("config"),), config);
}

pub fn emit_tranche_added(env: &Env, index: u32, tranche: Tranche) {
    env.events()
        .publish((symbol_short!("tr_add"), index), tranche);
}

pub fn emit_tranches_cleared(env: &Env) {
    env.events().publish((symbol_short!("tr_clear"),), ());
}

pub fn emit_curve_set(env: &Env, curve: Curve) {
    env.events().publish((symbol_short!("curve"),), curve);
}

pub fn emit_opened(env: &Env, timestamp: u64) {
    env.events().publish((symbol_short!("opened"),), timestamp);
}

pub fn emit_contributed(env: &Env, contributor: Address, data: Contributed) {
    env.events()
        .publish((symbol_short!("contrib"), contributor), data);
}

pub fn emit_tranche_advanced(env: &Env, from: u32, to: u32) {
    env.events()
        .publish((symbol_short!("tranche"),), TrancheAdvanced { from, to });
}

pub fn emit_deadline_extended(env: &Env, old_end_time: u64, new_end_time: u64) {
    env.events().publish(
        (symbol_short!("deadline"),),
        DeadlineExtended {
            old_end_time,
            new_end_time,
        },
    );
}

pub fn emit_finalized(env: &Env, data: SaleClosed) {
    env.events().publish((symbol_short!("finalized"),), data);
}

pub fn emit_refunds_enabled(env: &Env, data: SaleClosed) {
    env.events().publish((symbol_short!("refunds"),), data);
}

pub fn emit_emergency_refund(env: &Env, caller: Address, data: SaleClosed) {
    env.events()
        .publish((symbol_short!("emergency"), caller), data);
}

pub fn emit_withdrawn(env: &Env, operator: Address, amount: i128, remaining: i128) {
    env.events().publish(
        (symbol_short!("withdrawn"), operator),
        Withdrawn { amount, remaining },
    );
}

pub fn emit_refunded(env: &Env, contributor: Address, amount: i128) {
    env.events()
        .publish((symbol_short!("refunded"), contributor), amount);
}

pub fn emit_paused(env: &Env) {
    env.events().publish((symbol_short!("paused"),), ());
}

pub fn emit_unpaused(env: &Env) {
    env.events().publish((symbol_short!("unpaused"),), ());
}
