extern crate std;

use soroban_sdk::{
    symbol_short,
    testutils::{Address as _, Events},
    vec, Address, Env, IntoVal, Symbol, TryFromVal, TryIntoVal, Val,
};

use crate::events::{Contributed, DeadlineExtended, SaleClosed, TrancheAdvanced, Withdrawn};
use crate::pricing::fixed::WAD;
use crate::test::{config, open_tranche_sale, setup, tranche_sale};
use crate::{PricingMode, Tranche};

/// Data payloads of every event published under `topic`.
fn events_named(env: &Env, topic: Symbol) -> std::vec::Vec<Val> {
    env.events()
        .all()
        .iter()
        .filter(|(_, topics, _)| {
            topics
                .get(0)
                .and_then(|t| Symbol::try_from_val(env, &t).ok())
                .map_or(false, |s| s == topic)
        })
        .map(|(_, _, data)| data)
        .collect()
}

#[test]
fn test_tranche_added_event() {
    let s = setup(PricingMode::Tranche);
    s.client.add_tranche(&5, &(2 * WAD));

    let all_events = s.env.events().all();
    let last_event = all_events.last().expect("No events found");

    assert_eq!(last_event.0, s.client.address);
    let expected_topics = vec![
        &s.env,
        symbol_short!("tr_add").into_val(&s.env),
        0u32.into_val(&s.env),
    ];
    assert_eq!(last_event.1, expected_topics);

    let event_data: Tranche = last_event.2.try_into_val(&s.env).unwrap();
    assert_eq!(
        event_data,
        Tranche {
            supply: 5,
            price: 2 * WAD
        }
    );
}

#[test]
fn test_contributed_event() {
    let s = open_tranche_sale();
    let alice = s.funded(7);
    s.client.contribute(&alice, &7, &0);

    let all_events = s.env.events().all();
    let last_event = all_events.last().expect("No events found");

    assert_eq!(last_event.0, s.client.address);
    let expected_topics = vec![
        &s.env,
        symbol_short!("contrib").into_val(&s.env),
        alice.into_val(&s.env),
    ];
    assert_eq!(last_event.1, expected_topics);

    let event_data: Contributed = last_event.2.try_into_val(&s.env).unwrap();
    assert_eq!(
        event_data,
        Contributed {
            value: 7,
            cost: 6,
            refund: 1,
            units: 3,
            avg_price: 2 * WAD,
            spot_price: 2 * WAD,
            total_raised: 6,
            total_sold: 3,
        }
    );
}

#[test]
fn test_tranche_advance_fires_once_per_boundary() {
    let s = open_tranche_sale();
    let alice = s.funded(6);
    let bob = s.funded(10);

    s.client.contribute(&alice, &6, &0);
    assert!(events_named(&s.env, symbol_short!("tranche")).is_empty());

    s.client.contribute(&bob, &10, &0);
    let advances = events_named(&s.env, symbol_short!("tranche"));
    assert_eq!(advances.len(), 1);
    let advanced: TrancheAdvanced = advances[0].try_into_val(&s.env).unwrap();
    assert_eq!(advanced, TrancheAdvanced { from: 0, to: 1 });
}

#[test]
fn test_no_advance_past_last_tranche() {
    let s = open_tranche_sale();
    let alice = s.funded(25);
    s.client.contribute(&alice, &25, &0);

    // crosses 0 -> 1, then sells out without a tranche 2
    let advances = events_named(&s.env, symbol_short!("tranche"));
    assert_eq!(advances.len(), 1);
}

#[test]
fn test_sell_out_inside_last_tranche_emits_no_advance() {
    let s = open_tranche_sale();
    let alice = s.funded(12);
    let bob = s.funded(30);
    s.client.contribute(&alice, &12, &0);
    assert_eq!(s.client.active_tranche(), 1);

    // 3 units left at 3 each; the rest comes back
    s.client.contribute(&bob, &30, &0);
    assert!(events_named(&s.env, symbol_short!("tranche")).is_empty());
    assert_eq!(s.client.active_tranche(), 2);
}

#[test]
fn test_deadline_extended_event() {
    let s = tranche_sale();
    let mut cfg = config(&s);
    cfg.end_time = 200;
    s.client.set_config(&cfg);
    s.client.open();
    s.client.extend_deadline(&500);

    let last_event = s.env.events().all().last().expect("No events found");
    let event_data: DeadlineExtended = last_event.2.try_into_val(&s.env).unwrap();
    assert_eq!(
        event_data,
        DeadlineExtended {
            old_end_time: 200,
            new_end_time: 500
        }
    );
}

#[test]
fn test_finalized_and_withdrawn_events() {
    let s = open_tranche_sale();
    let alice = s.funded(6);
    s.client.contribute(&alice, &6, &0);
    s.client.finalize();

    let closed = events_named(&s.env, symbol_short!("finalized"));
    assert_eq!(closed.len(), 1);
    let summary: SaleClosed = closed[0].try_into_val(&s.env).unwrap();
    assert_eq!((summary.total_raised, summary.total_sold), (6, 3));

    s.client.withdraw(&4);
    let last_event = s.env.events().all().last().expect("No events found");
    let expected_topics = vec![
        &s.env,
        symbol_short!("withdrawn").into_val(&s.env),
        s.operator.into_val(&s.env),
    ];
    assert_eq!(last_event.1, expected_topics);
    let event_data: Withdrawn = last_event.2.try_into_val(&s.env).unwrap();
    assert_eq!(
        event_data,
        Withdrawn {
            amount: 4,
            remaining: 2
        }
    );
}

#[test]
fn test_refunded_event() {
    let s = open_tranche_sale();
    let alice = s.funded(6);
    s.client.contribute(&alice, &6, &0);
    s.client.enable_refunds();
    assert_eq!(events_named(&s.env, symbol_short!("refunds")).len(), 1);

    s.client.refund(&alice);
    let last_event = s.env.events().all().last().expect("No events found");
    let expected_topics = vec![
        &s.env,
        symbol_short!("refunded").into_val(&s.env),
        alice.into_val(&s.env),
    ];
    assert_eq!(last_event.1, expected_topics);
    let amount: i128 = last_event.2.try_into_val(&s.env).unwrap();
    assert_eq!(amount, 6);
}

#[test]
fn test_emergency_event_names_caller() {
    let s = open_tranche_sale();
    let caller = Address::generate(&s.env);
    s.set_time(crate::DEFAULT_EMERGENCY_TIMEOUT + 1);
    s.client.emergency_refund(&caller);

    let last_event = s.env.events().all().last().expect("No events found");
    let expected_topics = vec![
        &s.env,
        symbol_short!("emergency").into_val(&s.env),
        caller.into_val(&s.env),
    ];
    assert_eq!(last_event.1, expected_topics);
}
