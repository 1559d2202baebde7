//! Tranche pricing.
//!
//! The active tranche is never stored. It is derived from `sold` and the
//! cumulative supply boundaries of the ordered tranche list, so a contribution
//! that spans several tranches cannot leave a stale index behind.

use soroban_sdk::{Env, Vec};

use super::fixed::Wad;
use super::Quote;
use crate::types::Tranche;
use crate::Error;

/// Sum of all tranche supplies.
pub fn supply(tranches: &Vec<Tranche>) -> i128 {
    tranches.iter().map(|t| t.supply).sum()
}

/// Index of the first tranche whose cumulative boundary exceeds `sold`.
///
/// Returns `tranches.len()` once everything is sold.
pub fn active_tranche(tranches: &Vec<Tranche>, sold: i128) -> u32 {
    let mut boundary = 0i128;
    for (i, t) in tranches.iter().enumerate() {
        boundary += t.supply;
        if boundary > sold {
            return i as u32;
        }
    }
    tranches.len()
}

/// Price of the next unit. After sell-out this is the last tranche's price,
/// which keeps the spot price non-decreasing.
pub fn spot_price(tranches: &Vec<Tranche>, sold: i128) -> i128 {
    let idx = active_tranche(tranches, sold);
    match tranches.get(idx) {
        Some(t) => t.price,
        None => tranches.last().map(|t| t.price).unwrap_or(0),
    }
}

/// Walk the tranches from `sold`, spending `value` in increasing-price order.
pub fn quote(env: &Env, tranches: &Vec<Tranche>, sold: i128, value: i128) -> Result<Quote, Error> {
    if sold >= supply(tranches) {
        return Err(Error::SoldOut);
    }

    let mut remaining = value;
    let mut units = 0i128;
    let mut cost = 0i128;
    let mut boundary = 0i128;

    for t in tranches.iter() {
        let upper = boundary + t.supply;
        boundary = upper;
        let position = sold + units;
        if position >= upper {
            continue;
        }

        let available = upper - position;
        let price = Wad::from_raw(t.price);

        // Buying out the tranche is checked first so a large value against a
        // cheap tranche never divides the whole value by its price.
        match price.cost_of(env, available) {
            Ok(spent) if spent <= remaining => {
                units += available;
                cost += spent;
                remaining -= spent;
            }
            Ok(_) | Err(Error::ArithmeticOverflow) => {
                // `remaining` cannot cover `available` here, so this fits.
                let affordable = price.units_for(env, remaining)?;
                if affordable > 0 {
                    units += affordable;
                    cost += price.cost_of(env, affordable)?;
                }
                break;
            }
            Err(e) => return Err(e),
        }

        if remaining == 0 {
            break;
        }
    }

    Ok(Quote {
        units,
        cost,
        refund: value - cost,
        tranche_before: active_tranche(tranches, sold),
        tranche_after: active_tranche(tranches, sold + units),
    })
}

/// Exact value needed to buy `units` starting at `sold`.
pub fn cost_for_units(
    env: &Env,
    tranches: &Vec<Tranche>,
    sold: i128,
    units: i128,
) -> Result<i128, Error> {
    let mut left = units;
    let mut cost = 0i128;
    let mut boundary = 0i128;
    let mut position = sold;

    for t in tranches.iter() {
        if left == 0 {
            break;
        }
        boundary += t.supply;
        if position >= boundary {
            continue;
        }
        let take = left.min(boundary - position);
        cost += Wad::from_raw(t.price).cost_of(env, take)?;
        position += take;
        left -= take;
    }

    if left > 0 {
        return Err(Error::SoldOut);
    }
    Ok(cost)
}
