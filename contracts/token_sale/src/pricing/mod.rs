//! # Pricing Engine
//!
//! Pure functions over the sale's pricing parameters. Nothing here touches
//! storage; callers load a [`Pricing`] and the current `sold` counter and
//! commit the returned [`Quote`] themselves.
//!
//! | Mode      | Module      | Shape                                   |
//! |-----------|-------------|-----------------------------------------|
//! | Tranche   | [`tranche`] | step function over an ordered list      |
//! | Curve     | [`curve`]   | linear in cumulative units sold         |

pub mod curve;
pub mod fixed;
pub mod tranche;

use soroban_sdk::Env;

use crate::types::Pricing;
use crate::Error;

/// Basis-point denominator for price impact.
pub const BPS: i128 = 10_000;

/// Outcome of spending `value` at the current position.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Quote {
    /// Sale-token base units allocated.
    pub units: i128,
    /// Value actually charged for `units` (re-priced, rounded up).
    pub cost: i128,
    /// Unspent value returned to the contributor.
    pub refund: i128,
    /// Active tranche before and after; both zero in curve mode.
    pub tranche_before: u32,
    pub tranche_after: u32,
}

/// Total units for sale in the active mode.
pub fn supply(pricing: &Pricing) -> i128 {
    match pricing {
        Pricing::Tranche(tranches) => tranche::supply(tranches),
        Pricing::Curve(curve) => curve.total_supply,
    }
}

pub fn quote(env: &Env, pricing: &Pricing, sold: i128, value: i128) -> Result<Quote, Error> {
    if value <= 0 {
        return Err(Error::InvalidAmount);
    }
    match pricing {
        Pricing::Tranche(tranches) => tranche::quote(env, tranches, sold, value),
        Pricing::Curve(curve) => curve::quote(env, curve, sold, value),
    }
}

pub fn spot_price(env: &Env, pricing: &Pricing, sold: i128) -> Result<i128, Error> {
    match pricing {
        Pricing::Tranche(tranches) => Ok(tranche::spot_price(tranches, sold)),
        Pricing::Curve(curve) => curve::spot_price(env, curve, sold),
    }
}

/// Average price paid in a single purchase, as a Wad.
pub fn average_price(env: &Env, cost: i128, units: i128) -> Result<i128, Error> {
    if units == 0 {
        return Ok(0);
    }
    fixed::Wad::from_ratio(env, cost, units).map(fixed::Wad::raw)
}

/// Spot price movement in basis points of the starting price.
pub fn price_impact_bps(env: &Env, before: i128, after: i128) -> Result<i128, Error> {
    if before <= 0 || after <= before {
        return Ok(0);
    }
    fixed::mul_div_floor(env, after - before, BPS, before)
}
