//! Canonical event types emitted by the token sale and claim distributor
//! contracts.
//!
//! These mirror the Soroban contract events defined in
//! `contracts/token_sale/src/events.rs` and
//! `contracts/claim_distributor/src/events.rs`.

use serde::{Deserialize, Serialize};

/// All recognised event kinds from the two contracts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Either contract was initialised (`init` topic).
    Initialized,
    /// Sale limits or window changed (`config` topic).
    ConfigSet,
    /// A price tranche was appended (`tr_add` topic).
    TrancheAdded,
    /// The tranche list was reset (`tr_clear` topic).
    TranchesCleared,
    /// Curve parameters were set (`curve` topic).
    CurveSet,
    /// The sale started accepting contributions (`opened` topic).
    Opened,
    /// A contribution was accepted (`contrib` topic).
    Contributed,
    /// A contribution crossed a tranche boundary (`tranche` topic).
    TrancheAdvanced,
    /// The contribution deadline moved out (`deadline` topic).
    DeadlineExtended,
    /// The sale closed successfully (`finalized` topic).
    Finalized,
    /// The operator switched the sale to refunds (`refunds` topic).
    RefundsEnabled,
    /// Anyone forced refunds after the emergency timeout (`emergency` topic).
    EmergencyRefund,
    /// Raised value left the sale to the operator (`withdrawn` topic).
    Withdrawn,
    /// A contributor recovered their value (`refunded` topic).
    Refunded,
    Paused,
    Unpaused,
    /// Allocations were copied into the distributor (`snapshot` topic).
    Snapshot,
    /// Claims were opened (`claim_on` topic).
    ClaimingEnabled,
    /// An allocation was released (`claimed` topic).
    Claimed,
    /// Unclaimed tokens were swept after the deadline (`recovered` topic).
    Recovered,
    /// An event from these contracts that we don't recognise yet.
    Unknown,
}

impl EventKind {
    /// Parse the leading topic symbol string produced by Soroban into an [`EventKind`].
    pub fn from_topic(topic: &str) -> Self {
        match topic {
            "init" => Self::Initialized,
            "config" => Self::ConfigSet,
            "tr_add" => Self::TrancheAdded,
            "tr_clear" => Self::TranchesCleared,
            "curve" => Self::CurveSet,
            "opened" => Self::Opened,
            "contrib" => Self::Contributed,
            "tranche" => Self::TrancheAdvanced,
            "deadline" => Self::DeadlineExtended,
            "finalized" => Self::Finalized,
            "refunds" => Self::RefundsEnabled,
            "emergency" => Self::EmergencyRefund,
            "withdrawn" => Self::Withdrawn,
            "refunded" => Self::Refunded,
            "paused" => Self::Paused,
            "unpaused" => Self::Unpaused,
            "snapshot" => Self::Snapshot,
            "claim_on" => Self::ClaimingEnabled,
            "claimed" => Self::Claimed,
            "recovered" => Self::Recovered,
            _ => Self::Unknown,
        }
    }

    /// Return a short identifier string suitable for storage in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initialized => "initialized",
            Self::ConfigSet => "config_set",
            Self::TrancheAdded => "tranche_added",
            Self::TranchesCleared => "tranches_cleared",
            Self::CurveSet => "curve_set",
            Self::Opened => "opened",
            Self::Contributed => "contributed",
            Self::TrancheAdvanced => "tranche_advanced",
            Self::DeadlineExtended => "deadline_extended",
            Self::Finalized => "finalized",
            Self::RefundsEnabled => "refunds_enabled",
            Self::EmergencyRefund => "emergency_refund",
            Self::Withdrawn => "withdrawn",
            Self::Refunded => "refunded",
            Self::Paused => "paused",
            Self::Unpaused => "unpaused",
            Self::Snapshot => "snapshot",
            Self::ClaimingEnabled => "claiming_enabled",
            Self::Claimed => "claimed",
            Self::Recovered => "recovered",
            Self::Unknown => "unknown",
        }
    }

    /// Whether the event closes the sale for good.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Finalized | Self::RefundsEnabled | Self::EmergencyRefund
        )
    }
}

/// A fully decoded event, ready to be stored in the database.
///
/// Token quantities are kept as decimal strings; they are `i128` on chain.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SaleEvent {
    /// RPC event id, unique per emitted event.
    pub event_id: String,
    pub event_type: String,
    pub actor: Option<String>,
    pub amount: Option<String>,
    pub units: Option<String>,
    /// Spot price after the event, 18-decimal fixed point.
    pub price: Option<String>,
    pub total_raised: Option<String>,
    pub total_sold: Option<String>,
    pub ledger: i64,
    pub timestamp: i64,
    pub contract_id: String,
    pub tx_hash: Option<String>,
}

/// A raw event record as stored in / read from the database.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct EventRecord {
    pub id: i64,
    pub event_id: String,
    pub event_type: String,
    pub actor: Option<String>,
    pub amount: Option<String>,
    pub units: Option<String>,
    pub price: Option<String>,
    pub total_raised: Option<String>,
    pub total_sold: Option<String>,
    pub ledger: i64,
    pub timestamp: i64,
    pub contract_id: String,
    pub tx_hash: Option<String>,
    pub created_at: i64,
}

/// Sale progress reconstructed from indexed events.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Progress {
    pub status: String,
    pub total_raised: String,
    pub total_sold: String,
    pub spot_price: String,
    pub contributors: i64,
    pub last_ledger: i64,
}
