//! # Claim Distributor
//!
//! Deployed separately from the sale once the real token exists. Holds the
//! sale token and releases each contributor's recorded allocation exactly
//! once.
//!
//! | Step     | Entry Point                                   |
//! |----------|-----------------------------------------------|
//! | Setup    | [`ClaimDistributor::init`]                    |
//! | Backup   | [`ClaimDistributor::snapshot_allocations`]    |
//! | Open     | [`ClaimDistributor::enable_claiming`]         |
//! | Claim    | [`ClaimDistributor::claim`]                   |
//! | Sweep    | [`ClaimDistributor::recover_unclaimed`]       |
//!
//! ## Allocation lookup
//!
//! Allocations are read through from the sale's `allocation_of` view. If that
//! read fails or resolves to zero, the operator-seeded snapshot is used
//! instead. Nothing is ever written back to the sale.
//!
//! ## Token fees
//!
//! If the sale token charges a fee on transfer, this contract must be exempted
//! before `enable_claiming`, otherwise claimants receive less than their
//! allocation.

#![no_std]

use soroban_sdk::{contract, contracterror, contractimpl, log, token, Address, Env, Vec};

mod events;
mod storage;
mod types;

#[cfg(test)]
extern crate std;

#[cfg(test)]
mod test_fallback;

pub use types::{ClaimRecord, ClaimSource, ClaimStatus};

/// Read-only view of the token sale used by the distributor.
pub mod sale {
    use soroban_sdk::{contractclient, Address, Env};

    #[contractclient(name = "SaleClient")]
    pub trait SaleView {
        fn allocation_of(env: Env, contributor: Address) -> i128;
        fn total_sold(env: Env) -> i128;
        fn is_finalized(env: Env) -> bool;
    }
}

use sale::SaleClient;

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum Error {
    AlreadyInitialized = 1,
    NotInitialized = 2,
    InvalidDeadline = 3,

    ClaimingNotEnabled = 10,
    ClaimingAlreadyEnabled = 11,
    SaleNotFinalized = 12,
    InsufficientFunding = 13,

    AlreadyClaimed = 20,
    NothingToClaim = 21,
    ClaimsClosed = 22,

    DeadlineNotReached = 30,
    AlreadyRecovered = 31,
}

#[contract]
pub struct ClaimDistributor;

#[contractimpl]
impl ClaimDistributor {
    /// `claim_deadline` is fixed here and must lie in the future.
    pub fn init(
        env: Env,
        operator: Address,
        sale: Address,
        token: Address,
        claim_deadline: u64,
    ) -> Result<(), Error> {
        operator.require_auth();
        if storage::is_initialized(&env) {
            return Err(Error::AlreadyInitialized);
        }
        if claim_deadline <= env.ledger().timestamp() {
            return Err(Error::InvalidDeadline);
        }

        storage::initialize(&env, &operator, &sale, &token, claim_deadline);
        events::emit_initialized(
            &env,
            events::DistributorInitialized {
                operator,
                sale,
                token,
                claim_deadline,
            },
        );
        Ok(())
    }

    /// Copy the current allocation of each identity from the finalized sale.
    ///
    /// Only allowed before claims are enabled. Returns the number of
    /// identities copied.
    pub fn snapshot_allocations(env: Env, identities: Vec<Address>) -> Result<u32, Error> {
        Self::require_operator(&env)?;
        let status = storage::get_status(&env)?;
        if status.enabled {
            return Err(Error::ClaimingAlreadyEnabled);
        }
        if status.recovered {
            return Err(Error::ClaimsClosed);
        }

        let sale = SaleClient::new(&env, &storage::get_sale(&env)?);
        if !sale.is_finalized() {
            return Err(Error::SaleNotFinalized);
        }

        for who in identities.iter() {
            let mut record = storage::load_claim(&env, &who);
            record.snapshot = Some(sale.allocation_of(&who));
            storage::save_claim(&env, &who, &record);
        }

        events::emit_snapshot(&env, identities.len());
        Ok(identities.len())
    }

    /// Open claims. The distributor must already hold every unit the sale sold.
    pub fn enable_claiming(env: Env) -> Result<(), Error> {
        Self::require_operator(&env)?;
        let mut status = storage::get_status(&env)?;
        if status.enabled {
            return Err(Error::ClaimingAlreadyEnabled);
        }
        if status.recovered {
            return Err(Error::ClaimsClosed);
        }

        let sale = SaleClient::new(&env, &storage::get_sale(&env)?);
        if !sale.is_finalized() {
            return Err(Error::SaleNotFinalized);
        }

        let total_allocated = sale.total_sold();
        let balance = Self::balance(&env)?;
        if balance < total_allocated {
            log!(&env, "underfunded", balance, total_allocated);
            return Err(Error::InsufficientFunding);
        }

        status.enabled = true;
        status.total_allocated = total_allocated;
        storage::set_status(&env, &status);

        events::emit_claiming_enabled(&env, total_allocated, balance);
        Ok(())
    }

    /// Transfer the claimant's allocation. Succeeds at most once per identity.
    pub fn claim(env: Env, claimant: Address) -> Result<i128, Error> {
        claimant.require_auth();
        let mut status = storage::get_status(&env)?;
        if status.recovered {
            return Err(Error::ClaimsClosed);
        }
        if !status.enabled {
            return Err(Error::ClaimingNotEnabled);
        }

        let mut record = storage::load_claim(&env, &claimant);
        if record.claimed {
            return Err(Error::AlreadyClaimed);
        }

        let (amount, source) =
            Self::resolve(&env, &claimant, &record)?.ok_or(Error::NothingToClaim)?;

        record.claimed = true;
        record.amount = amount;
        storage::save_claim(&env, &claimant, &record);

        status.total_claimed += amount;
        storage::set_status(&env, &status);

        let token = token::Client::new(&env, &storage::get_token(&env)?);
        token.transfer(&env.current_contract_address(), &claimant, &amount);

        events::emit_claimed(&env, claimant, amount, source);
        Ok(amount)
    }

    /// Sweep what no outstanding claim can still use, once, after the deadline.
    ///
    /// Claims are closed for good afterwards, whether or not anything moved.
    pub fn recover_unclaimed(env: Env, destination: Address) -> Result<i128, Error> {
        Self::require_operator(&env)?;
        let mut status = storage::get_status(&env)?;
        if status.recovered {
            return Err(Error::AlreadyRecovered);
        }
        let now = env.ledger().timestamp();
        if now <= status.claim_deadline {
            log!(&env, "claim deadline not reached", now, status.claim_deadline);
            return Err(Error::DeadlineNotReached);
        }

        let outstanding = status.total_allocated - status.total_claimed;
        let amount = (Self::balance(&env)? - outstanding).max(0);

        status.recovered = true;
        status.enabled = false;
        storage::set_status(&env, &status);

        if amount > 0 {
            let token = token::Client::new(&env, &storage::get_token(&env)?);
            token.transfer(&env.current_contract_address(), &destination, &amount);
        }

        events::emit_recovered(&env, destination, amount);
        Ok(amount)
    }

    // ─────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────

    /// What `claim` would pay `who` right now, ignoring whether claims are open.
    pub fn claimable(env: Env, who: Address) -> Result<i128, Error> {
        if storage::get_status(&env)?.recovered {
            return Ok(0);
        }
        let record = storage::load_claim(&env, &who);
        if record.claimed {
            return Ok(0);
        }
        Ok(Self::resolve(&env, &who, &record)?.map_or(0, |(amount, _)| amount))
    }

    pub fn has_claimed(env: Env, who: Address) -> bool {
        storage::load_claim(&env, &who).claimed
    }

    pub fn snapshot_of(env: Env, who: Address) -> Option<i128> {
        storage::load_claim(&env, &who).snapshot
    }

    pub fn status(env: Env) -> Result<ClaimStatus, Error> {
        storage::get_status(&env)
    }

    // ─────────────────────────────────────────────────────────
    // Internal Helpers
    // ─────────────────────────────────────────────────────────

    fn require_operator(env: &Env) -> Result<Address, Error> {
        let operator = storage::get_operator(env)?;
        operator.require_auth();
        Ok(operator)
    }

    fn balance(env: &Env) -> Result<i128, Error> {
        let token = token::Client::new(env, &storage::get_token(env)?);
        Ok(token.balance(&env.current_contract_address()))
    }

    /// Two-tier lookup: the sale's live view first, the local snapshot second.
    fn resolve(
        env: &Env,
        who: &Address,
        record: &ClaimRecord,
    ) -> Result<Option<(i128, ClaimSource)>, Error> {
        let sale = SaleClient::new(env, &storage::get_sale(env)?);
        let live = match sale.try_allocation_of(who) {
            Ok(Ok(units)) => units,
            _ => {
                log!(env, "live allocation read failed", who.clone());
                0
            }
        };
        if live > 0 {
            return Ok(Some((live, ClaimSource::Live)));
        }
        Ok(match record.snapshot {
            Some(units) if units > 0 => Some((units, ClaimSource::Snapshot)),
            _ => None,
        })
    }
}
