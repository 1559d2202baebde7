//! # Fixed-point arithmetic
//!
//! Every price in the sale is a [`Wad`]: a signed 128-bit integer scaled by
//! 10^18. Quantities (value, units) stay plain base units.
//!
//! Intermediate products go through the host's 256-bit integers so that
//! `units * price` never overflows before the division brings the result back
//! into `i128` range. Narrowing a result that does not fit returns
//! [`Error::ArithmeticOverflow`].
//!
//! Rounding is fixed per direction and never left to the caller:
//!
//! | Quantity            | Rounding |
//! |---------------------|----------|
//! | units for a value   | down     |
//! | cost of some units  | up       |

use soroban_sdk::{Env, U256};

use crate::Error;

/// 10^18, the scale of a [`Wad`].
pub const WAD: i128 = 1_000_000_000_000_000_000;

/// 18-decimal fixed-point number.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub struct Wad(i128);

impl Wad {
    pub const fn from_raw(raw: i128) -> Self {
        Wad(raw)
    }

    pub const fn raw(self) -> i128 {
        self.0
    }

    /// `num / den` as a Wad, rounded down.
    pub fn from_ratio(env: &Env, num: i128, den: i128) -> Result<Self, Error> {
        mul_div_floor(env, num, WAD, den).map(Wad)
    }

    /// Value needed to buy `units` at this price, rounded up.
    pub fn cost_of(self, env: &Env, units: i128) -> Result<i128, Error> {
        mul_div_ceil(env, units, self.0, WAD)
    }

    /// Whole base units purchasable with `value` at this price, rounded down.
    pub fn units_for(self, env: &Env, value: i128) -> Result<i128, Error> {
        mul_div_floor(env, value, WAD, self.0)
    }
}

// ── 256-bit helpers ──────────────────────────────────────────────────

pub(crate) fn u256(env: &Env, x: i128) -> Result<U256, Error> {
    let x = u128::try_from(x).map_err(|_| Error::ArithmeticOverflow)?;
    Ok(U256::from_u128(env, x))
}

pub(crate) fn narrow(x: &U256) -> Result<i128, Error> {
    x.to_u128()
        .and_then(|v| i128::try_from(v).ok())
        .ok_or(Error::ArithmeticOverflow)
}

pub(crate) fn div_floor(env: &Env, num: &U256, den: &U256) -> Result<U256, Error> {
    if *den == U256::from_u32(env, 0) {
        return Err(Error::ArithmeticOverflow);
    }
    Ok(num.div(den))
}

pub(crate) fn div_ceil(env: &Env, num: &U256, den: &U256) -> Result<U256, Error> {
    let zero = U256::from_u32(env, 0);
    if *den == zero {
        return Err(Error::ArithmeticOverflow);
    }
    let q = num.div(den);
    if num.rem_euclid(den) == zero {
        Ok(q)
    } else {
        Ok(q.add(&U256::from_u32(env, 1)))
    }
}

/// `floor(a * b / d)` for non-negative operands.
pub fn mul_div_floor(env: &Env, a: i128, b: i128, d: i128) -> Result<i128, Error> {
    let product = u256(env, a)?.mul(&u256(env, b)?);
    narrow(&div_floor(env, &product, &u256(env, d)?)?)
}

/// `ceil(a * b / d)` for non-negative operands.
pub fn mul_div_ceil(env: &Env, a: i128, b: i128, d: i128) -> Result<i128, Error> {
    let product = u256(env, a)?.mul(&u256(env, b)?);
    narrow(&div_ceil(env, &product, &u256(env, d)?)?)
}

/// `floor(sqrt(n))` by Newton's method.
///
/// `upper` must be at least `floor(sqrt(n))`; the iteration then decreases
/// monotonically and stops at the first non-decreasing step.
pub(crate) fn isqrt(env: &Env, n: &U256, upper: U256) -> U256 {
    let zero = U256::from_u32(env, 0);
    if *n == zero || upper == zero {
        return zero;
    }
    let two = U256::from_u32(env, 2);
    let mut x = upper;
    loop {
        let y = x.add(&n.div(&x)).div(&two);
        if y >= x {
            return x;
        }
        x = y;
    }
}
