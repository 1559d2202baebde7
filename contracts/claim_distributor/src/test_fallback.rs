extern crate std;

use soroban_sdk::{
    contract, contractimpl, contracttype, symbol_short,
    testutils::{Address as _, Events},
    token, vec, Address, Env, IntoVal, TryIntoVal,
};

use crate::events::Claimed;
use crate::{ClaimDistributor, ClaimDistributorClient, ClaimSource, Error};

#[contracttype]
enum MockKey {
    Units(Address),
    Sold,
    Broken,
}

/// Stand-in sale whose allocation view can be made to fail.
#[contract]
pub struct MockSale;

#[contractimpl]
impl MockSale {
    pub fn set_units(env: Env, who: Address, units: i128) {
        env.storage().instance().set(&MockKey::Units(who), &units);
    }

    pub fn set_sold(env: Env, sold: i128) {
        env.storage().instance().set(&MockKey::Sold, &sold);
    }

    pub fn set_broken(env: Env, broken: bool) {
        env.storage().instance().set(&MockKey::Broken, &broken);
    }

    pub fn allocation_of(env: Env, contributor: Address) -> i128 {
        if env
            .storage()
            .instance()
            .get(&MockKey::Broken)
            .unwrap_or(false)
        {
            panic!("sale ledger unavailable");
        }
        env.storage()
            .instance()
            .get(&MockKey::Units(contributor))
            .unwrap_or(0)
    }

    pub fn total_sold(env: Env) -> i128 {
        env.storage().instance().get(&MockKey::Sold).unwrap_or(0)
    }

    pub fn is_finalized(_env: Env) -> bool {
        true
    }
}

fn setup() -> (
    Env,
    MockSaleClient<'static>,
    ClaimDistributorClient<'static>,
    token::Client<'static>,
    Address,
) {
    let env = Env::default();
    env.mock_all_auths();

    let operator = Address::generate(&env);
    let token_admin = Address::generate(&env);
    let token_addr = env.register_stellar_asset_contract_v2(token_admin).address();

    let sale = MockSaleClient::new(&env, &env.register(MockSale, ()));
    let distributor = ClaimDistributorClient::new(&env, &env.register(ClaimDistributor, ()));
    distributor.init(&operator, &sale.address, &token_addr, &1_000);

    let alice = Address::generate(&env);
    sale.set_units(&alice, &5);
    sale.set_sold(&5);
    token::StellarAssetClient::new(&env, &token_addr).mint(&distributor.address, &5);

    let token = token::Client::new(&env, &token_addr);
    (env, sale, distributor, token, alice)
}

fn last_claim_source(env: &Env) -> ClaimSource {
    let last_event = env.events().all().last().expect("No events found");
    let data: Claimed = last_event.2.try_into_val(env).unwrap();
    data.source
}

#[test]
fn test_live_read_is_preferred() {
    let (env, _sale, distributor, token, alice) = setup();
    distributor.snapshot_allocations(&vec![&env, alice.clone()]);
    distributor.enable_claiming();

    assert_eq!(distributor.claim(&alice), 5);
    // events only cover the latest invocation, so read them before the balance
    assert_eq!(last_claim_source(&env), ClaimSource::Live);
    assert_eq!(token.balance(&alice), 5);
}

#[test]
fn test_failed_live_read_falls_back_to_snapshot() {
    let (env, sale, distributor, token, alice) = setup();
    distributor.snapshot_allocations(&vec![&env, alice.clone()]);
    distributor.enable_claiming();

    sale.set_broken(&true);
    assert_eq!(distributor.claimable(&alice), 5);
    assert_eq!(distributor.claim(&alice), 5);

    let last_event = env.events().all().last().expect("No events found");
    let expected_topics = vec![
        &env,
        symbol_short!("claimed").into_val(&env),
        alice.into_val(&env),
    ];
    assert_eq!(last_event.1, expected_topics);
    assert_eq!(last_claim_source(&env), ClaimSource::Snapshot);
    assert_eq!(token.balance(&alice), 5);
}

#[test]
fn test_zero_live_read_falls_back_to_snapshot() {
    let (env, sale, distributor, _token, alice) = setup();
    distributor.snapshot_allocations(&vec![&env, alice.clone()]);
    distributor.enable_claiming();

    sale.set_units(&alice, &0);
    assert_eq!(distributor.claim(&alice), 5);
    assert_eq!(last_claim_source(&env), ClaimSource::Snapshot);
}

#[test]
fn test_failed_read_without_snapshot_claims_nothing() {
    let (_env, sale, distributor, token, alice) = setup();
    distributor.enable_claiming();

    sale.set_broken(&true);
    assert_eq!(distributor.claimable(&alice), 0);
    assert_eq!(
        distributor.try_claim(&alice),
        Err(Ok(Error::NothingToClaim))
    );
    assert!(!distributor.has_claimed(&alice));
    assert_eq!(token.balance(&alice), 0);

    // once the sale is readable again the claim goes through
    sale.set_broken(&false);
    assert_eq!(distributor.claim(&alice), 5);
}
