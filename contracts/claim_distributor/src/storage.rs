//! # Storage
//!
//! | Key              | Tier       | Type          |
//! |------------------|------------|---------------|
//! | `Operator`       | instance   | `Address`     |
//! | `Sale`           | instance   | `Address`     |
//! | `Token`          | instance   | `Address`     |
//! | `Status`         | instance   | `ClaimStatus` |
//! | `Claim(Address)` | persistent | `ClaimRecord` |

use soroban_sdk::{contracttype, Address, Env};

use crate::types::{ClaimRecord, ClaimStatus};
use crate::Error;

const DAY_IN_LEDGERS: u32 = 17_280;

const INSTANCE_BUMP_AMOUNT: u32 = 7 * DAY_IN_LEDGERS;
const INSTANCE_LIFETIME_THRESHOLD: u32 = DAY_IN_LEDGERS;

const PERSISTENT_BUMP_AMOUNT: u32 = 30 * DAY_IN_LEDGERS;
const PERSISTENT_LIFETIME_THRESHOLD: u32 = 7 * DAY_IN_LEDGERS;

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DataKey {
    Operator,
    Sale,
    Token,
    Status,
    Claim(Address),
}

fn bump_instance(env: &Env) {
    env.storage()
        .instance()
        .extend_ttl(INSTANCE_LIFETIME_THRESHOLD, INSTANCE_BUMP_AMOUNT);
}

pub fn is_initialized(env: &Env) -> bool {
    env.storage().instance().has(&DataKey::Operator)
}

pub fn initialize(env: &Env, operator: &Address, sale: &Address, token: &Address, deadline: u64) {
    let instance = env.storage().instance();
    instance.set(&DataKey::Operator, operator);
    instance.set(&DataKey::Sale, sale);
    instance.set(&DataKey::Token, token);
    instance.set(
        &DataKey::Status,
        &ClaimStatus {
            enabled: false,
            recovered: false,
            total_allocated: 0,
            total_claimed: 0,
            claim_deadline: deadline,
        },
    );
    bump_instance(env);
}

fn get_address(env: &Env, key: &DataKey) -> Result<Address, Error> {
    bump_instance(env);
    env.storage()
        .instance()
        .get(key)
        .ok_or(Error::NotInitialized)
}

pub fn get_operator(env: &Env) -> Result<Address, Error> {
    get_address(env, &DataKey::Operator)
}

pub fn get_sale(env: &Env) -> Result<Address, Error> {
    get_address(env, &DataKey::Sale)
}

pub fn get_token(env: &Env) -> Result<Address, Error> {
    get_address(env, &DataKey::Token)
}

pub fn get_status(env: &Env) -> Result<ClaimStatus, Error> {
    bump_instance(env);
    env.storage()
        .instance()
        .get(&DataKey::Status)
        .ok_or(Error::NotInitialized)
}

pub fn set_status(env: &Env, status: &ClaimStatus) {
    env.storage().instance().set(&DataKey::Status, status);
    bump_instance(env);
}

pub fn load_claim(env: &Env, who: &Address) -> ClaimRecord {
    let key = DataKey::Claim(who.clone());
    match env.storage().persistent().get::<_, ClaimRecord>(&key) {
        Some(record) => {
            env.storage().persistent().extend_ttl(
                &key,
                PERSISTENT_LIFETIME_THRESHOLD,
                PERSISTENT_BUMP_AMOUNT,
            );
            record
        }
        None => ClaimRecord::default(),
    }
}

pub fn save_claim(env: &Env, who: &Address, record: &ClaimRecord) {
    let key = DataKey::Claim(who.clone());
    env.storage().persistent().set(&key, record);
    env.storage()
        .persistent()
        .extend_ttl(&key, PERSISTENT_LIFETIME_THRESHOLD, PERSISTENT_BUMP_AMOUNT);
}
