use soroban_sdk::contracttype;

/// Where a claim's amount was resolved from.
#[contracttype]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ClaimSource {
    /// The sale's live `allocation_of` view.
    Live,
    /// The operator-seeded local copy.
    Snapshot,
}

/// Per-claimant record. `claimed` flips false → true exactly once.
#[contracttype]
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ClaimRecord {
    pub claimed: bool,
    /// Amount transferred by the claim, zero until claimed.
    pub amount: i128,
    /// Backup allocation copied from the sale before claims opened.
    pub snapshot: Option<i128>,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClaimStatus {
    pub enabled: bool,
    pub recovered: bool,
    pub total_allocated: i128,
    pub total_claimed: i128,
    pub claim_deadline: u64,
}
