extern crate std;

use soroban_sdk::{testutils::Address as _, Address};

use crate::invariants;
use crate::test::{config, open_tranche_sale, tranche_sale};
use crate::{Error, SaleState, DEFAULT_EMERGENCY_TIMEOUT};

// ─── Contribution window ─────────────────────────────────

#[test]
fn test_contribution_window_is_inclusive_of_end() {
    let s = tranche_sale();
    let mut cfg = config(&s);
    cfg.start_time = 100;
    cfg.end_time = 200;
    s.client.set_config(&cfg);
    s.client.open();

    let alice = s.funded(20);

    s.set_time(99);
    assert_eq!(
        s.client.try_contribute(&alice, &2, &0),
        Err(Ok(Error::SaleNotStarted))
    );

    s.set_time(150);
    s.client.contribute(&alice, &2, &0);

    s.set_time(200);
    s.client.contribute(&alice, &2, &0);

    s.set_time(201);
    assert_eq!(
        s.client.try_contribute(&alice, &2, &0),
        Err(Ok(Error::SaleEnded))
    );
    assert_eq!(s.client.allocation_of(&alice), 2);
}

#[test]
fn test_extend_deadline() {
    let s = tranche_sale();
    let mut cfg = config(&s);
    cfg.end_time = 200;
    s.client.set_config(&cfg);
    s.client.open();

    assert_eq!(
        s.client.try_extend_deadline(&200),
        Err(Ok(Error::InvalidDeadline))
    );
    assert_eq!(
        s.client.try_extend_deadline(&150),
        Err(Ok(Error::InvalidDeadline))
    );

    s.client.extend_deadline(&300);
    assert_eq!(s.client.config().end_time, 300);

    let alice = s.funded(2);
    s.set_time(250);
    s.client.contribute(&alice, &2, &0);

    s.set_time(400);
    assert_eq!(
        s.client.try_extend_deadline(&350),
        Err(Ok(Error::InvalidDeadline))
    );
}

#[test]
fn test_extend_deadline_without_deadline_fails() {
    let s = open_tranche_sale();
    assert_eq!(
        s.client.try_extend_deadline(&1_000),
        Err(Ok(Error::InvalidDeadline))
    );
}

#[test]
fn test_extend_deadline_outside_open_fails() {
    let s = tranche_sale();
    assert_eq!(
        s.client.try_extend_deadline(&1_000),
        Err(Ok(Error::NotOpen))
    );
}

// ─── State machine ───────────────────────────────────────

#[test]
fn test_contribute_before_open_fails() {
    let s = tranche_sale();
    let alice = s.funded(6);
    assert_eq!(
        s.client.try_contribute(&alice, &6, &0),
        Err(Ok(Error::NotOpen))
    );
}

#[test]
fn test_state_and_price_only_move_forward() {
    let s = tranche_sale();
    let alice = s.funded(6);
    let bob = s.funded(10);
    s.check(&[]);

    s.client.open();
    s.check(&[]);
    s.client.contribute(&alice, &6, &0);
    s.check(&[alice.clone()]);

    // crosses into the 3-per-unit tranche
    s.client.contribute(&bob, &10, &0);
    assert_eq!(s.client.active_tranche(), 1);
    s.check(&[alice.clone(), bob.clone()]);

    s.client.finalize();
    s.check(&[alice.clone(), bob.clone()]);
    s.client.withdraw(&16);
    s.check(&[alice, bob]);
}

#[test]
#[should_panic(expected = "invalid transition")]
fn test_backward_transition_is_caught() {
    invariants::assert_valid_transition(&SaleState::Refunding, &SaleState::Open);
}

#[test]
#[should_panic(expected = "spot price decreased")]
fn test_falling_spot_price_is_caught() {
    let s = open_tranche_sale();
    let before = invariants::Checkpoint {
        spot_price: 3 * crate::pricing::fixed::WAD,
        ..invariants::Checkpoint::read(&s.client)
    };
    invariants::assert_progression(&before, &invariants::Checkpoint::read(&s.client));
}

#[test]
fn test_terminal_states_are_exclusive() {
    let s = open_tranche_sale();
    let before = s.client.state();
    s.client.finalize();
    invariants::assert_valid_transition(&before, &s.client.state());

    assert!(s.client.is_finalized());
    assert_eq!(s.client.try_finalize(), Err(Ok(Error::NotOpen)));
    assert_eq!(s.client.try_enable_refunds(), Err(Ok(Error::NotOpen)));

    let r = open_tranche_sale();
    r.client.enable_refunds();
    assert_eq!(r.client.state(), SaleState::Refunding);
    assert!(!r.client.is_finalized());
    assert_eq!(r.client.try_finalize(), Err(Ok(Error::NotOpen)));
    assert_eq!(r.client.try_enable_refunds(), Err(Ok(Error::NotOpen)));
}

#[test]
fn test_contribute_after_close_fails() {
    let s = open_tranche_sale();
    let alice = s.funded(6);
    s.client.finalize();
    assert_eq!(
        s.client.try_contribute(&alice, &6, &0),
        Err(Ok(Error::NotOpen))
    );
}

// ─── Emergency refund ────────────────────────────────────

#[test]
fn test_emergency_refund_timeout_boundary() {
    let s = open_tranche_sale();
    let anyone = Address::generate(&s.env);
    let opened_at = s.env.ledger().timestamp();
    let deadline = opened_at + DEFAULT_EMERGENCY_TIMEOUT;

    s.set_time(deadline - 1);
    assert_eq!(
        s.client.try_emergency_refund(&anyone),
        Err(Ok(Error::EmergencyTimeoutNotReached))
    );

    s.set_time(deadline);
    assert_eq!(
        s.client.try_emergency_refund(&anyone),
        Err(Ok(Error::EmergencyTimeoutNotReached))
    );

    s.set_time(deadline + 1);
    s.client.emergency_refund(&anyone);
    assert_eq!(s.client.state(), SaleState::Refunding);
}

#[test]
fn test_emergency_refund_uses_configured_timeout() {
    let s = tranche_sale();
    let mut cfg = config(&s);
    cfg.emergency_timeout = 60;
    s.client.set_config(&cfg);
    s.set_time(1_000);
    s.client.open();

    let anyone = Address::generate(&s.env);
    s.set_time(1_060);
    assert_eq!(
        s.client.try_emergency_refund(&anyone),
        Err(Ok(Error::EmergencyTimeoutNotReached))
    );
    s.set_time(1_061);
    s.client.emergency_refund(&anyone);
}

#[test]
fn test_emergency_refund_only_while_open() {
    let s = open_tranche_sale();
    let anyone = Address::generate(&s.env);
    s.client.finalize();
    s.set_time(DEFAULT_EMERGENCY_TIMEOUT * 2);
    assert_eq!(
        s.client.try_emergency_refund(&anyone),
        Err(Ok(Error::NotOpen))
    );
}

// ─── Settlement ──────────────────────────────────────────

#[test]
fn test_withdraw_after_finalize() {
    let s = open_tranche_sale();
    let alice = s.funded(6);
    let bob = s.funded(10);
    s.client.contribute(&alice, &6, &0);
    s.client.contribute(&bob, &10, &0);

    assert_eq!(s.client.try_withdraw(&5), Err(Ok(Error::NotFinalized)));
    s.client.finalize();

    assert_eq!(s.client.withdraw(&5), 11);
    assert_eq!(s.token.balance(&s.operator), 5);
    s.check(&[alice.clone(), bob.clone()]);

    assert_eq!(
        s.client.try_withdraw(&12),
        Err(Ok(Error::InsufficientBalance))
    );
    assert_eq!(s.client.try_withdraw(&0), Err(Ok(Error::InvalidAmount)));

    assert_eq!(s.client.withdraw(&11), 0);
    assert_eq!(s.token.balance(&s.operator), 16);
    assert_eq!(s.token.balance(&s.client.address), 0);
    s.check(&[alice.clone(), bob]);

    assert_eq!(
        s.client.try_refund(&alice),
        Err(Ok(Error::NotRefunding))
    );
}

#[test]
fn test_refund_once_per_contributor() {
    let s = open_tranche_sale();
    let alice = s.funded(7);
    let bob = s.funded(10);
    let stranger = Address::generate(&s.env);
    s.client.contribute(&alice, &7, &0);
    s.client.contribute(&bob, &10, &0);

    assert_eq!(s.client.try_refund(&alice), Err(Ok(Error::NotRefunding)));
    s.client.enable_refunds();

    // alice kept 6 of her 7 after the dust return
    assert_eq!(s.client.refund(&alice), 6);
    assert_eq!(s.token.balance(&alice), 7);
    assert!(s.client.contribution_of(&alice).refunded);
    assert_eq!(s.client.try_refund(&alice), Err(Ok(Error::AlreadyRefunded)));
    assert_eq!(
        s.client.try_refund(&stranger),
        Err(Ok(Error::NothingToRefund))
    );
    s.check(&[alice.clone(), bob.clone()]);

    assert_eq!(s.client.refund(&bob), 10);
    assert_eq!(s.token.balance(&s.client.address), 0);
    assert_eq!(s.client.try_withdraw(&1), Err(Ok(Error::NotFinalized)));
    s.check(&[alice, bob]);
}

#[test]
fn test_refund_after_emergency() {
    let s = open_tranche_sale();
    let alice = s.funded(6);
    s.client.contribute(&alice, &6, &0);

    s.set_time(DEFAULT_EMERGENCY_TIMEOUT + 1);
    s.client.emergency_refund(&alice);
    assert_eq!(s.client.refund(&alice), 6);
    assert_eq!(s.token.balance(&alice), 6);
}

// ─── Maintenance pause ───────────────────────────────────

#[test]
fn test_pause_blocks_contributions_and_withdrawals() {
    let s = tranche_sale();
    let mut cfg = config(&s);
    cfg.end_time = 500;
    s.client.set_config(&cfg);
    s.client.open();

    let alice = s.funded(12);
    s.client.contribute(&alice, &6, &0);

    s.client.pause();
    assert!(s.client.is_paused());
    assert_eq!(
        s.client.try_contribute(&alice, &6, &0),
        Err(Ok(Error::ProtocolPaused))
    );
    assert_eq!(
        s.client.try_extend_deadline(&600),
        Err(Ok(Error::ProtocolPaused))
    );

    s.client.finalize();
    assert_eq!(s.client.try_withdraw(&6), Err(Ok(Error::ProtocolPaused)));

    s.client.unpause();
    assert_eq!(s.client.withdraw(&6), 0);
}

#[test]
fn test_pause_never_blocks_refunds() {
    let s = open_tranche_sale();
    let alice = s.funded(6);
    s.client.contribute(&alice, &6, &0);

    s.client.pause();
    s.client.enable_refunds();
    assert_eq!(s.client.refund(&alice), 6);
    assert_eq!(s.token.balance(&alice), 6);
}

#[test]
fn test_pause_never_blocks_emergency_refund() {
    let s = open_tranche_sale();
    let anyone = Address::generate(&s.env);
    s.client.pause();
    s.set_time(DEFAULT_EMERGENCY_TIMEOUT + 1);
    s.client.emergency_refund(&anyone);
    assert_eq!(s.client.state(), SaleState::Refunding);
}
