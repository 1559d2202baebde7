use soroban_sdk::{contracttype, symbol_short, Address, Env};

use crate::types::ClaimSource;

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DistributorInitialized {
    pub operator: Address,
    pub sale: Address,
    pub token: Address,
    pub claim_deadline: u64,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClaimingEnabled {
    pub total_allocated: i128,
    pub balance: i128,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Claimed {
    pub amount: i128,
    pub source: ClaimSource,
}

pub fn emit_initialized(env: &Env, data: DistributorInitialized) {
    env.events().publish((symbol_short!("init"),), data);
}

/// Number of identities whose allocation was copied.
pub fn emit_snapshot(env: &Env, count: u32) {
    env.events().publish((symbol_short!("snapshot"),), count);
}

pub fn emit_claiming_enabled(env: &Env, total_allocated: i128, balance: i128) {
    env.events().publish(
        (symbol_short!("claim_on"),),
        ClaimingEnabled {
            total_allocated,
            balance,
        },
    );
}

pub fn emit_claimed(env: &Env, claimant: Address, amount: i128, source: ClaimSource) {
    env.events().publish(
        (symbol_short!("claimed"), claimant),
        Claimed { amount, source },
    );
}

pub fn emit_recovered(env: &Env, destination: Address, amount: i128) {
    env.events()
        .publish((symbol_short!("recovered"), destination), amount);
}
