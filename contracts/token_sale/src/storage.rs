//! # Storage
//!
//! Typed helpers over the two Soroban storage tiers used by the sale.
//!
//! ## Instance storage (contract-lifetime TTL)
//!
//! | Key          | Type          | Description                            |
//! |--------------|---------------|----------------------------------------|
//! | `Operator`   | `Address`     | Sale operator                          |
//! | `RaiseToken` | `Address`     | Token contributions are paid in        |
//! | `Mode`       | `PricingMode` | Fixed at `init`                        |
//! | `State`      | `SaleState`   | Lifecycle state                        |
//! | `Config`     | `SaleConfig`  | Limits, window, emergency timeout      |
//! | `Tranches`   | `Vec<Tranche>`| Tranche list (tranche mode)            |
//! | `Curve`      | `Curve`       | Curve parameters (curve mode)          |
//! | `Totals`     | `Totals`      | Aggregate ledger counters              |
//! | `OpenedAt`   | `u64`         | Ledger timestamp of `open`             |
//! | `Paused`     | `bool`        | Maintenance pause flag                 |
//!
//! Instance TTL is bumped by **7 days** whenever it falls below 1 day remaining.
//!
//! ## Persistent storage (per-entry TTL)
//!
//! | Key                     | Type           | Description              |
//! |-------------------------|----------------|--------------------------|
//! | `Contribution(Address)` | `Contribution` | Per-contributor record   |
//!
//! Persistent TTL is bumped by **30 days** whenever it falls below 7 days
//! remaining. Contribution records must outlive the sale because the claim
//! distributor reads them after finalize.

use soroban_sdk::{contracttype, Address, Env, Vec};

use crate::types::{
    Contribution, Curve, Pricing, PricingMode, SaleConfig, SaleState, Totals, Tranche,
};
use crate::Error;

// ── TTL Constants ────────────────────────────────────────────────────

/// Approximate ledgers per day (~5 seconds per ledger).
const DAY_IN_LEDGERS: u32 = 17_280;

const INSTANCE_BUMP_AMOUNT: u32 = 7 * DAY_IN_LEDGERS;
const INSTANCE_LIFETIME_THRESHOLD: u32 = DAY_IN_LEDGERS;

const PERSISTENT_BUMP_AMOUNT: u32 = 30 * DAY_IN_LEDGERS;
const PERSISTENT_LIFETIME_THRESHOLD: u32 = 7 * DAY_IN_LEDGERS;

/// Default dead-man's-switch window: 30 days.
pub const DEFAULT_EMERGENCY_TIMEOUT: u64 = 30 * 24 * 60 * 60;

// ── Storage Keys ─────────────────────────────────────────────────────

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DataKey {
    Operator,
    RaiseToken,
    Mode,
    State,
    Config,
    Tranches,
    Curve,
    Totals,
    OpenedAt,
    Paused,
    Contribution(Address),
}

// ── Instance Storage Helpers ─────────────────────────────────────────

fn bump_instance(env: &Env) {
    env.storage()
        .instance()
        .extend_ttl(INSTANCE_LIFETIME_THRESHOLD, INSTANCE_BUMP_AMOUNT);
}

pub fn is_initialized(env: &Env) -> bool {
    env.storage().instance().has(&DataKey::Operator)
}

/// Write everything `init` establishes in one go.
pub fn initialize(env: &Env, operator: &Address, raise_token: &Address, mode: PricingMode) {
    let instance = env.storage().instance();
    instance.set(&DataKey::Operator, operator);
    instance.set(&DataKey::RaiseToken, raise_token);
    instance.set(&DataKey::Mode, &mode);
    instance.set(&DataKey::State, &SaleState::Pending);
    instance.set(&DataKey::Config, &default_config());
    instance.set(&DataKey::Tranches, &Vec::<Tranche>::new(env));
    instance.set(&DataKey::Totals, &Totals::default());
    instance.set(&DataKey::Paused, &false);
    bump_instance(env);
}

pub fn default_config() -> SaleConfig {
    SaleConfig {
        min_contribution: 0,
        max_contribution: 0,
        max_per_contributor: 0,
        allow_repeat: true,
        start_time: 0,
        end_time: 0,
        emergency_timeout: DEFAULT_EMERGENCY_TIMEOUT,
    }
}

fn get_instance<V>(env: &Env, key: &DataKey) -> Result<V, Error>
where
    V: soroban_sdk::TryFromVal<Env, soroban_sdk::Val>,
{
    bump_instance(env);
    env.storage()
        .instance()
        .get(key)
        .ok_or(Error::NotInitialized)
}

pub fn get_operator(env: &Env) -> Result<Address, Error> {
    get_instance(env, &DataKey::Operator)
}

pub fn get_raise_token(env: &Env) -> Result<Address, Error> {
    get_instance(env, &DataKey::RaiseToken)
}

pub fn get_mode(env: &Env) -> Result<PricingMode, Error> {
    get_instance(env, &DataKey::Mode)
}

pub fn get_state(env: &Env) -> Result<SaleState, Error> {
    get_instance(env, &DataKey::State)
}

pub fn set_state(env: &Env, state: SaleState) {
    env.storage().instance().set(&DataKey::State, &state);
    bump_instance(env);
}

pub fn get_config(env: &Env) -> Result<SaleConfig, Error> {
    get_instance(env, &DataKey::Config)
}

pub fn set_config(env: &Env, config: &SaleConfig) {
    env.storage().instance().set(&DataKey::Config, config);
    bump_instance(env);
}

pub fn get_tranches(env: &Env) -> Result<Vec<Tranche>, Error> {
    get_instance(env, &DataKey::Tranches)
}

pub fn set_tranches(env: &Env, tranches: &Vec<Tranche>) {
    env.storage().instance().set(&DataKey::Tranches, tranches);
    bump_instance(env);
}

pub fn get_curve(env: &Env) -> Option<Curve> {
    bump_instance(env);
    env.storage().instance().get(&DataKey::Curve)
}

pub fn set_curve(env: &Env, curve: &Curve) {
    env.storage().instance().set(&DataKey::Curve, curve);
    bump_instance(env);
}

/// Load the pricing parameters of the sale's mode.
///
/// Fails with `PricingNotConfigured` when the mode has nothing to price with.
pub fn load_pricing(env: &Env) -> Result<Pricing, Error> {
    match get_mode(env)? {
        PricingMode::Tranche => {
            let tranches = get_tranches(env)?;
            if tranches.is_empty() {
                return Err(Error::PricingNotConfigured);
            }
            Ok(Pricing::Tranche(tranches))
        }
        PricingMode::Curve => get_curve(env)
            .map(Pricing::Curve)
            .ok_or(Error::PricingNotConfigured),
    }
}

pub fn get_totals(env: &Env) -> Result<Totals, Error> {
    get_instance(env, &DataKey::Totals)
}

pub fn set_totals(env: &Env, totals: &Totals) {
    env.storage().instance().set(&DataKey::Totals, totals);
    bump_instance(env);
}

pub fn get_opened_at(env: &Env) -> u64 {
    bump_instance(env);
    env.storage()
        .instance()
        .get(&DataKey::OpenedAt)
        .unwrap_or(0)
}

pub fn set_opened_at(env: &Env, timestamp: u64) {
    env.storage().instance().set(&DataKey::OpenedAt, &timestamp);
    bump_instance(env);
}

pub fn is_paused(env: &Env) -> bool {
    bump_instance(env);
    env.storage()
        .instance()
        .get(&DataKey::Paused)
        .unwrap_or(false)
}

pub fn set_paused(env: &Env, paused: bool) {
    env.storage().instance().set(&DataKey::Paused, &paused);
    bump_instance(env);
}

// ── Persistent Storage Helpers ───────────────────────────────────────

fn bump_persistent(env: &Env, key: &DataKey) {
    env.storage()
        .persistent()
        .extend_ttl(key, PERSISTENT_LIFETIME_THRESHOLD, PERSISTENT_BUMP_AMOUNT);
}

/// Contribution record for `who`, or an empty record if none exists yet.
pub fn load_contribution(env: &Env, who: &Address) -> Contribution {
    let key = DataKey::Contribution(who.clone());
    match env.storage().persistent().get::<_, Contribution>(&key) {
        Some(record) => {
            bump_persistent(env, &key);
            record
        }
        None => Contribution::default(),
    }
}

pub fn save_contribution(env: &Env, who: &Address, record: &Contribution) {
    let key = DataKey::Contribution(who.clone());
    env.storage().persistent().set(&key, record);
    bump_persistent(env, &key);
}
