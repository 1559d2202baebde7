extern crate std;

use soroban_sdk::{token, Address};

use crate::types::{SaleState, Totals};
use crate::TokenSaleClient;

/// Sold units never exceed the configured supply.
pub fn assert_sold_within_supply(sold: i128, supply: i128) {
    assert!(
        sold <= supply,
        "sold {} exceeds supply {}",
        sold,
        supply
    );
}

/// Aggregate counters are consistent with each other.
pub fn assert_totals_consistent(totals: &Totals) {
    assert!(totals.raised >= 0, "negative raised ({})", totals.raised);
    assert!(totals.sold >= 0, "negative sold ({})", totals.sold);
    assert!(
        totals.withdrawn + totals.refunded <= totals.raised,
        "paid out {} + {} exceeds raised {}",
        totals.withdrawn,
        totals.refunded,
        totals.raised
    );
    assert!(
        totals.withdrawn == 0 || totals.refunded == 0,
        "both withdrawals ({}) and refunds ({}) recorded",
        totals.withdrawn,
        totals.refunded
    );
}

/// The contract holds exactly what it raised minus what it paid out.
pub fn assert_balance_matches_ledger(totals: &Totals, balance: i128) {
    assert_eq!(
        balance,
        totals.raised - totals.withdrawn - totals.refunded,
        "held balance {} does not match ledger {:?}",
        balance,
        totals
    );
}

/// Per-contributor records add up to the aggregate counters.
pub fn assert_records_sum_to_totals(client: &TokenSaleClient, contributors: &[Address]) {
    let totals = client.totals();
    let mut value = 0i128;
    let mut units = 0i128;
    let mut nonzero = 0u32;
    for who in contributors {
        let record = client.contribution_of(who);
        value += record.value;
        units += record.units;
        if record.units > 0 {
            nonzero += 1;
        }
    }
    assert_eq!(value, totals.raised, "record values do not sum to raised");
    assert_eq!(units, totals.sold, "record units do not sum to sold");
    assert_eq!(
        nonzero, totals.contributors,
        "unique contributor count mismatch"
    );
}

/// Only forward transitions are allowed:
///   Pending -> Open
///   Open    -> Finalized | Refunding
pub fn assert_valid_transition(from: &SaleState, to: &SaleState) {
    let valid = from == to
        || (!from.is_terminal()
            && matches!(
                (from, to),
                (SaleState::Pending, SaleState::Open)
                    | (SaleState::Open, SaleState::Finalized)
                    | (SaleState::Open, SaleState::Refunding)
            ));
    assert!(valid, "invalid transition from {:?} to {:?}", from, to);
}

pub fn assert_monotonic(label: &str, before: i128, after: i128) {
    assert!(
        after >= before,
        "{} decreased from {} to {}",
        label,
        before,
        after
    );
}

/// What [`assert_progression`] compares between two checkpoints.
#[derive(Clone, Debug)]
pub struct Checkpoint {
    pub state: SaleState,
    pub spot_price: i128,
    pub sold: i128,
    pub raised: i128,
}

impl Checkpoint {
    pub fn read(client: &TokenSaleClient) -> Self {
        let totals = client.totals();
        Checkpoint {
            state: client.state(),
            spot_price: client.current_spot_price(),
            sold: totals.sold,
            raised: totals.raised,
        }
    }
}

/// State only moves forward; spot price and the sale counters never fall.
pub fn assert_progression(before: &Checkpoint, after: &Checkpoint) {
    assert_valid_transition(&before.state, &after.state);
    assert_monotonic("spot price", before.spot_price, after.spot_price);
    assert_monotonic("sold", before.sold, after.sold);
    assert_monotonic("raised", before.raised, after.raised);
}

/// Run every stateless check against the live contract.
pub fn assert_all(client: &TokenSaleClient, raise_token: &token::Client, contributors: &[Address]) {
    let totals = client.totals();
    let progress = client.progress();
    assert_sold_within_supply(totals.sold, progress.supply);
    assert_totals_consistent(&totals);
    assert_balance_matches_ledger(&totals, raise_token.balance(&client.address));
    assert_records_sum_to_totals(client, contributors);
}
