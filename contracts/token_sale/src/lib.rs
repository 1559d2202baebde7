//! # Token Sale Contract
//!
//! Converts contributions of a raise token into reserved allocations of a
//! token that does not exist yet, under one of two pricing shapes, and winds
//! the sale down either to a funded `Finalized` state or, irrevocably, to a
//! `Refunding` state.
//!
//! | Phase         | Entry Point(s)                                              |
//! |---------------|-------------------------------------------------------------|
//! | Bootstrap     | [`TokenSale::init`]                                         |
//! | Configuration | `set_config`, `add_tranche`, `clear_tranches`, `set_curve`  |
//! | Sale          | `open`, [`TokenSale::contribute`], `extend_deadline`        |
//! | Wind-down     | `finalize`, `enable_refunds`, [`TokenSale::emergency_refund`] |
//! | Settlement    | `withdraw`, [`TokenSale::refund`]                           |
//! | Maintenance   | `pause`, `unpause`                                          |
//! | Queries       | `preview`, `current_spot_price`, `progress`, `allocation_of`, … |
//!
//! ## Architecture
//!
//! Pricing is pure and lives in [`pricing`]. Storage access is fully delegated
//! to `storage`. Events are emitted through [`events`]. This file holds the
//! entry points, their gates, and the ledger commit.
//!
//! Every entry point validates before it writes, and returns `Err` on any
//! rejection, which discards the whole invocation. Token transfers trap on
//! failure, so a failed value return can never be swallowed.

#![no_std]

use soroban_sdk::{contract, contracterror, contractimpl, log, token, Address, Env, Vec};

pub mod events;
pub mod pricing;
mod storage;
mod types;

#[cfg(test)]
extern crate std;

#[cfg(test)]
mod invariants;
#[cfg(test)]
mod test_events;
#[cfg(test)]
mod test_lifecycle;

pub use storage::DEFAULT_EMERGENCY_TIMEOUT;
use types::Pricing;
pub use types::{
    Contribution, Curve, Preview, PricingMode, Progress, SaleConfig, SaleState, Totals, Tranche,
};

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum Error {
    AlreadyInitialized = 1,
    NotInitialized = 2,
    NotAuthorized = 3,

    // Configuration
    InvalidConfig = 10,
    InvalidTranche = 11,
    TrancheOrdering = 12,
    InvalidCurve = 13,
    WrongPricingMode = 14,
    PricingNotConfigured = 15,

    // Lifecycle
    NotPending = 20,
    NotOpen = 21,
    NotFinalized = 22,
    NotRefunding = 23,
    SaleNotStarted = 24,
    SaleEnded = 25,
    EmergencyTimeoutNotReached = 26,
    ProtocolPaused = 27,
    InvalidDeadline = 28,

    // Limits
    InvalidAmount = 30,
    BelowMinimum = 31,
    AboveMaximum = 32,
    WalletCapExceeded = 33,
    AlreadyContributed = 34,
    SoldOut = 35,
    ContributionTooSmall = 36,
    SlippageExceeded = 37,

    // Settlement
    InsufficientBalance = 40,
    NothingToRefund = 41,
    AlreadyRefunded = 42,

    ArithmeticOverflow = 50,
}

#[contract]
pub struct TokenSale;

#[contractimpl]
impl TokenSale {
    // ─────────────────────────────────────────────────────────
    // Bootstrap
    // ─────────────────────────────────────────────────────────

    /// Initialise the sale.
    ///
    /// Must be called exactly once. `mode` is fixed for the lifetime of the
    /// sale. The sale starts `Pending` with permissive limits and a 30 day
    /// emergency timeout until `set_config` says otherwise.
    pub fn init(
        env: Env,
        operator: Address,
        raise_token: Address,
        mode: PricingMode,
    ) -> Result<(), Error> {
        operator.require_auth();
        if storage::is_initialized(&env) {
            return Err(Error::AlreadyInitialized);
        }
        storage::initialize(&env, &operator, &raise_token, mode);
        events::emit_initialized(&env, operator, raise_token, mode);
        Ok(())
    }

    // ─────────────────────────────────────────────────────────
    // Configuration (operator, Pending only)
    // ─────────────────────────────────────────────────────────

    pub fn set_config(env: Env, config: SaleConfig) -> Result<(), Error> {
        Self::require_operator(&env)?;
        Self::require_state(&env, SaleState::Pending)?;
        validate_config(&config)?;

        storage::set_config(&env, &config);
        events::emit_config_set(&env, config);
        Ok(())
    }

    /// Append a tranche. Prices must strictly increase along the list.
    ///
    /// Returns the index of the new tranche.
    pub fn add_tranche(env: Env, supply: i128, price: i128) -> Result<u32, Error> {
        Self::require_operator(&env)?;
        Self::require_state(&env, SaleState::Pending)?;
        Self::require_mode(&env, PricingMode::Tranche)?;

        if supply <= 0 || price <= 0 {
            return Err(Error::InvalidTranche);
        }

        let mut tranches = storage::get_tranches(&env)?;
        if let Some(last) = tranches.last() {
            if price <= last.price {
                log!(&env, "tranche price must exceed previous", price, last.price);
                return Err(Error::TrancheOrdering);
            }
        }
        if pricing::tranche::supply(&tranches).checked_add(supply).is_none() {
            return Err(Error::InvalidTranche);
        }

        let tranche = Tranche { supply, price };
        let index = tranches.len();
        tranches.push_back(tranche.clone());
        storage::set_tranches(&env, &tranches);

        events::emit_tranche_added(&env, index, tranche);
        Ok(index)
    }

    pub fn clear_tranches(env: Env) -> Result<(), Error> {
        Self::require_operator(&env)?;
        Self::require_state(&env, SaleState::Pending)?;
        Self::require_mode(&env, PricingMode::Tranche)?;

        storage::set_tranches(&env, &Vec::new(&env));
        events::emit_tranches_cleared(&env);
        Ok(())
    }

    /// Set the linear curve. `end_price` must be strictly above `start_price`.
    pub fn set_curve(
        env: Env,
        start_price: i128,
        end_price: i128,
        total_supply: i128,
    ) -> Result<(), Error> {
        Self::require_operator(&env)?;
        Self::require_state(&env, SaleState::Pending)?;
        Self::require_mode(&env, PricingMode::Curve)?;

        let curve = Curve {
            start_price,
            end_price,
            total_supply,
        };
        pricing::curve::validate(&curve)?;

        storage::set_curve(&env, &curve);
        events::emit_curve_set(&env, curve);
        Ok(())
    }

    // ─────────────────────────────────────────────────────────
    // Sale
    // ─────────────────────────────────────────────────────────

    /// Move `Pending → Open`. Rejected unless pricing is fully configured.
    pub fn open(env: Env) -> Result<(), Error> {
        Self::require_operator(&env)?;
        Self::require_state(&env, SaleState::Pending)?;
        storage::load_pricing(&env)?;

        let now = env.ledger().timestamp();
        storage::set_opened_at(&env, now);
        storage::set_state(&env, SaleState::Open);

        log!(&env, "sale opened", now);
        events::emit_opened(&env, now);
        Ok(())
    }

    /// Spend up to `value` of the raise token on allocation units.
    ///
    /// The full `value` is pulled from `contributor`; whatever the pricing
    /// engine does not spend (a partial fill at sell-out, or dust below one
    /// unit's price) is returned in the same call. The call is rejected as a
    /// whole if fewer than `min_units` would be allocated.
    ///
    /// Returns the units allocated by this call.
    pub fn contribute(
        env: Env,
        contributor: Address,
        value: i128,
        min_units: i128,
    ) -> Result<i128, Error> {
        contributor.require_auth();
        Self::require_not_paused(&env)?;
        Self::require_state(&env, SaleState::Open)?;

        let config = storage::get_config(&env)?;
        let now = env.ledger().timestamp();
        if config.start_time != 0 && now < config.start_time {
            return Err(Error::SaleNotStarted);
        }
        if config.end_time != 0 && now > config.end_time {
            return Err(Error::SaleEnded);
        }

        if value <= 0 {
            return Err(Error::InvalidAmount);
        }
        if config.min_contribution > 0 && value < config.min_contribution {
            log!(&env, "below minimum", value, config.min_contribution);
            return Err(Error::BelowMinimum);
        }
        if config.max_contribution > 0 && value > config.max_contribution {
            log!(&env, "above maximum", value, config.max_contribution);
            return Err(Error::AboveMaximum);
        }

        let mut record = storage::load_contribution(&env, &contributor);
        if !config.allow_repeat && record.units > 0 {
            return Err(Error::AlreadyContributed);
        }
        if config.max_per_contributor > 0
            && record.value.saturating_add(value) > config.max_per_contributor
        {
            log!(
                &env,
                "wallet cap exceeded",
                record.value,
                value,
                config.max_per_contributor
            );
            return Err(Error::WalletCapExceeded);
        }

        let pricing = storage::load_pricing(&env)?;
        let mut totals = storage::get_totals(&env)?;
        let quote = pricing::quote(&env, &pricing, totals.sold, value)?;

        if quote.units == 0 {
            return Err(Error::ContributionTooSmall);
        }
        if quote.units < min_units {
            log!(&env, "slippage", quote.units, min_units);
            return Err(Error::SlippageExceeded);
        }

        // Pull the full offer first; the unspent part goes straight back below.
        let raise_token = token::Client::new(&env, &storage::get_raise_token(&env)?);
        let this = env.current_contract_address();
        raise_token.transfer(&contributor, &this, &value);

        if record.units == 0 {
            totals.contributors += 1;
        }
        record.value += quote.cost;
        record.units += quote.units;
        totals.raised += quote.cost;
        totals.sold += quote.units;
        storage::save_contribution(&env, &contributor, &record);
        storage::set_totals(&env, &totals);

        if quote.refund > 0 {
            raise_token.transfer(&this, &contributor, &quote.refund);
        }

        if let Pricing::Tranche(tranches) = &pricing {
            // Selling out past the last tranche is not a boundary crossing.
            let to = quote
                .tranche_after
                .min(tranches.len().saturating_sub(1));
            for from in quote.tranche_before..to {
                events::emit_tranche_advanced(&env, from, from + 1);
            }
        }

        let spot_price = pricing::spot_price(&env, &pricing, totals.sold)?;
        let avg_price = pricing::average_price(&env, quote.cost, quote.units)?;
        events::emit_contributed(
            &env,
            contributor,
            events::Contributed {
                value,
                cost: quote.cost,
                refund: quote.refund,
                units: quote.units,
                avg_price,
                spot_price,
                total_raised: totals.raised,
                total_sold: totals.sold,
            },
        );

        Ok(quote.units)
    }

    /// Push the contribution deadline further out. Only an existing deadline
    /// can be extended, and only forwards.
    pub fn extend_deadline(env: Env, new_end_time: u64) -> Result<(), Error> {
        Self::require_operator(&env)?;
        Self::require_not_paused(&env)?;
        Self::require_state(&env, SaleState::Open)?;

        let mut config = storage::get_config(&env)?;
        let old_end_time = config.end_time;
        if old_end_time == 0
            || new_end_time <= old_end_time
            || new_end_time <= env.ledger().timestamp()
        {
            log!(&env, "invalid deadline", old_end_time, new_end_time);
            return Err(Error::InvalidDeadline);
        }

        config.end_time = new_end_time;
        storage::set_config(&env, &config);
        events::emit_deadline_extended(&env, old_end_time, new_end_time);
        Ok(())
    }

    // ─────────────────────────────────────────────────────────
    // Wind-down
    // ─────────────────────────────────────────────────────────

    /// `Open → Finalized`. Stops contributions and unlocks `withdraw`.
    pub fn finalize(env: Env) -> Result<(), Error> {
        Self::require_operator(&env)?;
        Self::require_state(&env, SaleState::Open)?;

        storage::set_state(&env, SaleState::Finalized);
        events::emit_finalized(&env, Self::closing_summary(&env)?);
        Ok(())
    }

    /// `Open → Refunding`, at the operator's discretion.
    pub fn enable_refunds(env: Env) -> Result<(), Error> {
        Self::require_operator(&env)?;
        Self::require_state(&env, SaleState::Open)?;

        storage::set_state(&env, SaleState::Refunding);
        events::emit_refunds_enabled(&env, Self::closing_summary(&env)?);
        Ok(())
    }

    /// Dead-man's switch: anyone may force `Open → Refunding` once the
    /// emergency timeout has elapsed since the sale opened.
    ///
    /// Eligibility is evaluated fresh on every call (`now > opened_at +
    /// emergency_timeout`); nothing is scheduled.
    pub fn emergency_refund(env: Env, caller: Address) -> Result<(), Error> {
        caller.require_auth();
        Self::require_state(&env, SaleState::Open)?;

        let config = storage::get_config(&env)?;
        let deadline = storage::get_opened_at(&env).saturating_add(config.emergency_timeout);
        let now = env.ledger().timestamp();
        if now <= deadline {
            log!(&env, "emergency timeout not reached", now, deadline);
            return Err(Error::EmergencyTimeoutNotReached);
        }

        storage::set_state(&env, SaleState::Refunding);
        log!(&env, "emergency refund triggered", caller);
        events::emit_emergency_refund(&env, caller, Self::closing_summary(&env)?);
        Ok(())
    }

    // ─────────────────────────────────────────────────────────
    // Settlement
    // ─────────────────────────────────────────────────────────

    /// Send `amount` of the raised value to the operator. May be called any
    /// number of times after finalize until the raised balance is exhausted.
    ///
    /// Returns the value still withdrawable.
    pub fn withdraw(env: Env, amount: i128) -> Result<i128, Error> {
        let operator = Self::require_operator(&env)?;
        Self::require_not_paused(&env)?;
        Self::require_state(&env, SaleState::Finalized)?;

        if amount <= 0 {
            return Err(Error::InvalidAmount);
        }
        let mut totals = storage::get_totals(&env)?;
        let available = totals.raised - totals.withdrawn;
        if amount > available {
            log!(&env, "withdraw exceeds balance", amount, available);
            return Err(Error::InsufficientBalance);
        }

        totals.withdrawn += amount;
        storage::set_totals(&env, &totals);

        let raise_token = token::Client::new(&env, &storage::get_raise_token(&env)?);
        raise_token.transfer(&env.current_contract_address(), &operator, &amount);

        let remaining = available - amount;
        events::emit_withdrawn(&env, operator, amount, remaining);
        Ok(remaining)
    }

    /// Return a contributor's full contributed value. Once per contributor,
    /// only in `Refunding`, and never blocked by the maintenance pause.
    pub fn refund(env: Env, contributor: Address) -> Result<i128, Error> {
        contributor.require_auth();
        Self::require_state(&env, SaleState::Refunding)?;

        let mut record = storage::load_contribution(&env, &contributor);
        if record.refunded {
            return Err(Error::AlreadyRefunded);
        }
        if record.value == 0 {
            return Err(Error::NothingToRefund);
        }

        let amount = record.value;
        record.refunded = true;
        storage::save_contribution(&env, &contributor, &record);

        let mut totals = storage::get_totals(&env)?;
        totals.refunded += amount;
        storage::set_totals(&env, &totals);

        let raise_token = token::Client::new(&env, &storage::get_raise_token(&env)?);
        raise_token.transfer(&env.current_contract_address(), &contributor, &amount);

        events::emit_refunded(&env, contributor, amount);
        Ok(amount)
    }

    // ─────────────────────────────────────────────────────────
    // Maintenance
    // ─────────────────────────────────────────────────────────

    /// Block `contribute`, `extend_deadline` and `withdraw`.
    pub fn pause(env: Env) -> Result<(), Error> {
        Self::require_operator(&env)?;
        storage::set_paused(&env, true);
        events::emit_paused(&env);
        Ok(())
    }

    pub fn unpause(env: Env) -> Result<(), Error> {
        Self::require_operator(&env)?;
        storage::set_paused(&env, false);
        events::emit_unpaused(&env);
        Ok(())
    }

    // ─────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────

    /// Price what `value` would buy right now, without side effects.
    ///
    /// A sold-out sale previews as zero units with the whole value refunded.
    pub fn preview(env: Env, value: i128) -> Result<Preview, Error> {
        let pricing = storage::load_pricing(&env)?;
        let sold = storage::get_totals(&env)?.sold;

        let quote = match pricing::quote(&env, &pricing, sold, value) {
            Ok(q) => q,
            Err(Error::SoldOut) => {
                return Ok(Preview {
                    units: 0,
                    cost: 0,
                    refund: value,
                    price_impact_bps: 0,
                })
            }
            Err(e) => return Err(e),
        };

        let before = pricing::spot_price(&env, &pricing, sold)?;
        let after = pricing::spot_price(&env, &pricing, sold + quote.units)?;
        Ok(Preview {
            units: quote.units,
            cost: quote.cost,
            refund: quote.refund,
            price_impact_bps: pricing::price_impact_bps(&env, before, after)?,
        })
    }

    pub fn current_spot_price(env: Env) -> Result<i128, Error> {
        let pricing = storage::load_pricing(&env)?;
        let sold = storage::get_totals(&env)?.sold;
        pricing::spot_price(&env, &pricing, sold)
    }

    pub fn progress(env: Env) -> Result<Progress, Error> {
        let state = storage::get_state(&env)?;
        let totals = storage::get_totals(&env)?;
        let (supply, price) = match storage::load_pricing(&env) {
            Ok(pricing) => (
                pricing::supply(&pricing),
                pricing::spot_price(&env, &pricing, totals.sold)?,
            ),
            Err(Error::PricingNotConfigured) => (0, 0),
            Err(e) => return Err(e),
        };
        Ok(Progress {
            state,
            raised: totals.raised,
            sold: totals.sold,
            supply,
            price,
            contributors: totals.contributors,
        })
    }

    /// Units recorded for `contributor`. Read by the claim distributor.
    pub fn allocation_of(env: Env, contributor: Address) -> i128 {
        storage::load_contribution(&env, &contributor).units
    }

    pub fn contribution_of(env: Env, contributor: Address) -> Contribution {
        storage::load_contribution(&env, &contributor)
    }

    pub fn total_sold(env: Env) -> Result<i128, Error> {
        Ok(storage::get_totals(&env)?.sold)
    }

    pub fn totals(env: Env) -> Result<Totals, Error> {
        storage::get_totals(&env)
    }

    pub fn state(env: Env) -> Result<SaleState, Error> {
        storage::get_state(&env)
    }

    pub fn is_finalized(env: Env) -> bool {
        matches!(storage::get_state(&env), Ok(SaleState::Finalized))
    }

    pub fn config(env: Env) -> Result<SaleConfig, Error> {
        storage::get_config(&env)
    }

    pub fn tranches(env: Env) -> Result<Vec<Tranche>, Error> {
        storage::get_tranches(&env)
    }

    pub fn curve(env: Env) -> Option<Curve> {
        storage::get_curve(&env)
    }

    /// Index of the tranche the next unit comes from; equals the tranche
    /// count once everything is sold.
    pub fn active_tranche(env: Env) -> Result<u32, Error> {
        let tranches = storage::get_tranches(&env)?;
        let sold = storage::get_totals(&env)?.sold;
        Ok(pricing::tranche::active_tranche(&tranches, sold))
    }

    pub fn operator(env: Env) -> Result<Address, Error> {
        storage::get_operator(&env)
    }

    pub fn is_paused(env: Env) -> bool {
        storage::is_paused(&env)
    }

    // ─────────────────────────────────────────────────────────
    // Internal Helpers
    // ─────────────────────────────────────────────────────────

    fn require_operator(env: &Env) -> Result<Address, Error> {
        let operator = storage::get_operator(env)?;
        operator.require_auth();
        Ok(operator)
    }

    fn require_state(env: &Env, expected: SaleState) -> Result<(), Error> {
        let actual = storage::get_state(env)?;
        if actual == expected {
            return Ok(());
        }
        log!(env, "unexpected sale state", expected, actual);
        Err(match expected {
            SaleState::Pending => Error::NotPending,
            SaleState::Open => Error::NotOpen,
            SaleState::Finalized => Error::NotFinalized,
            SaleState::Refunding => Error::NotRefunding,
        })
    }

    fn require_mode(env: &Env, expected: PricingMode) -> Result<(), Error> {
        if storage::get_mode(env)? != expected {
            return Err(Error::WrongPricingMode);
        }
        Ok(())
    }

    fn require_not_paused(env: &Env) -> Result<(), Error> {
        if storage::is_paused(env) {
            return Err(Error::ProtocolPaused);
        }
        Ok(())
    }

    fn closing_summary(env: &Env) -> Result<events::SaleClosed, Error> {
        let totals = storage::get_totals(env)?;
        Ok(events::SaleClosed {
            total_raised: totals.raised,
            total_sold: totals.sold,
            timestamp: env.ledger().timestamp(),
        })
    }
}

fn validate_config(config: &SaleConfig) -> Result<(), Error> {
    if config.min_contribution < 0 || config.max_contribution < 0 || config.max_per_contributor < 0
    {
        return Err(Error::InvalidConfig);
    }
    if config.max_contribution > 0 && config.min_contribution > config.max_contribution {
        return Err(Error::InvalidConfig);
    }
    if config.start_time != 0 && config.end_time != 0 && config.end_time <= config.start_time {
        return Err(Error::InvalidConfig);
    }
    if config.emergency_timeout == 0 {
        return Err(Error::InvalidConfig);
    }
    Ok(())
}
