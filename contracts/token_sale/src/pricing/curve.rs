//! Linear bonding curve pricing.
//!
//! With `A = end_price - start_price` and supply `S`, the marginal price after
//! `y` units is `start_price + A * y / S` and the cost of the next `z` units is
//! the integral
//!
//! ```text
//! cost(y, z) = start_price * z + A * z * (2y + z) / (2S)
//! ```
//!
//! Solving `cost(y, z) = x` for `z` is a quadratic with a strictly positive
//! leading coefficient (`A > 0` is enforced when the curve is set). Multiplying
//! through by `S` keeps every term an integer:
//!
//! ```text
//! (A/2) z^2 + B z - C = 0,   B = start_price * S + A * y,   C = x * WAD * S
//! z = 2C / (B + sqrt(B^2 + 2AC))
//! ```
//!
//! The root is floored, clamped to the remaining supply, and then re-priced
//! with [`cost_for_units`]. The re-priced cost is what gets charged.

use soroban_sdk::{Env, U256};

use super::fixed::{self, div_ceil, div_floor, isqrt, narrow, u256, WAD};
use super::Quote;
use crate::types::Curve;
use crate::Error;

/// Largest supply a curve may be configured with.
pub const MAX_CURVE_SUPPLY: i128 = 1_000_000_000_000_000_000_000_000_000_000;

/// Rejects flat or inverted curves and parameter sets whose intermediate
/// products could leave 256-bit range.
pub fn validate(curve: &Curve) -> Result<(), Error> {
    if curve.start_price <= 0
        || curve.end_price <= curve.start_price
        || curve.total_supply <= 0
        || curve.total_supply > MAX_CURVE_SUPPLY
        || curve.end_price.checked_mul(curve.total_supply).is_none()
    {
        return Err(Error::InvalidCurve);
    }
    Ok(())
}

/// Marginal price after `sold` units, rounded down.
pub fn spot_price(env: &Env, curve: &Curve, sold: i128) -> Result<i128, Error> {
    let sold = sold.min(curve.total_supply);
    let slope = curve.end_price - curve.start_price;
    Ok(curve.start_price + fixed::mul_div_floor(env, slope, sold, curve.total_supply)?)
}

/// Exact integral of the price over `[sold, sold + units]`, rounded up.
pub fn cost_for_units(env: &Env, curve: &Curve, sold: i128, units: i128) -> Result<i128, Error> {
    if sold + units > curve.total_supply {
        return Err(Error::SoldOut);
    }
    let s = u256(env, curve.total_supply)?;
    let two_s = s.mul(&U256::from_u32(env, 2));
    let z = u256(env, units)?;

    let linear = two_s.mul(&u256(env, curve.start_price)?).mul(&z);
    let quadratic = u256(env, curve.end_price - curve.start_price)?
        .mul(&z)
        .mul(&u256(env, 2 * sold + units)?);
    let den = two_s.mul(&u256(env, WAD)?);

    narrow(&div_ceil(env, &linear.add(&quadratic), &den)?)
}

/// Largest `z` whose exact integral from `sold` does not exceed `value`.
pub fn units_for_value(env: &Env, curve: &Curve, sold: i128, value: i128) -> Result<i128, Error> {
    let zero = U256::from_u32(env, 0);
    let one = U256::from_u32(env, 1);
    let two = U256::from_u32(env, 2);

    let s = u256(env, curve.total_supply)?;
    let a = u256(env, curve.end_price - curve.start_price)?;
    let b = u256(env, curve.start_price)?.mul(&s).add(&a.mul(&u256(env, sold)?));
    let c = u256(env, value)?.mul(&u256(env, WAD)?).mul(&s);

    if c == zero {
        return Ok(0);
    }

    let ac = a.mul(&c);
    let disc = b.mul(&b).add(&ac.mul(&two));
    // sqrt(B^2 + 2AC) <= B + AC/B
    let upper = b.add(&div_floor(env, &ac, &b)?).add(&one);
    let root = isqrt(env, &disc, upper);

    let z = div_floor(env, &c.mul(&two), &b.add(&root))?;
    let mut z = narrow(&z)?.min(curve.total_supply - sold);

    // Flooring the square root can overshoot by a unit; the exact re-price decides.
    while z > 0 && cost_for_units(env, curve, sold, z)? > value {
        z -= 1;
    }
    Ok(z)
}

pub fn quote(env: &Env, curve: &Curve, sold: i128, value: i128) -> Result<Quote, Error> {
    let remaining = curve.total_supply - sold;
    if remaining <= 0 {
        return Err(Error::SoldOut);
    }

    let all_remaining = cost_for_units(env, curve, sold, remaining)?;
    let units = if value >= all_remaining {
        remaining
    } else {
        units_for_value(env, curve, sold, value)?
    };
    let cost = cost_for_units(env, curve, sold, units)?;

    Ok(Quote {
        units,
        cost,
        refund: value - cost,
        tranche_before: 0,
        tranche_after: 0,
    })
}
