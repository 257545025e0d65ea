//! # Types
//!
//! Shared data structures used across all modules of the DAO ledger.
//!
//! ## Design decisions
//!
//! ### Stored vs. derived state
//!
//! Only what cannot be recomputed is stored. `isInvestor` is never stored:
//! an identity is an investor exactly when its share balance is non-zero, so
//! the investor map simply drops an entry when its balance reaches zero.
//! Likewise [`ProposalStatus`] is a view computed from a [`Proposal`], the
//! ledger totals and the current time.
//!
//! ### Proposal lifecycle
//!
//! ```text
//! Voting ──► Executable ──► Executed
//!    └─────► Rejected
//! ```
//!
//! `Executable` and `Rejected` can swap while shares are minted or burned,
//! because the quorum threshold is measured against the share supply at
//! execution time. `Executed` is terminal.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Native value units (and shares, which are minted 1:1 with value).
pub type Amount = u128;

/// Sequential proposal identifier, starting at 0.
pub type ProposalId = u64;

/// Host-supplied timestamp in seconds.
pub type Timestamp = u64;

// ── Address ──────────────────────────────────────────────────────────

/// A 20-byte account identity.
///
/// Rendered as `0x`-prefixed lowercase hex. The prefix is optional when
/// parsing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address([u8; 20]);

impl Address {
    pub const fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        let mut bytes = [0u8; 20];
        hex::decode_to_slice(digits, &mut bytes).map_err(|_| Error::InvalidAddress)?;
        Ok(Self(bytes))
    }
}

impl TryFrom<String> for Address {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.to_string()
    }
}

// ── Call context ─────────────────────────────────────────────────────

/// The implicit `(sender, timestamp, attached value)` triple every call
/// carries. The ledger trusts all three verbatim.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Context {
    pub sender: Address,
    pub now: Timestamp,
    /// Native value attached to the call. Only contributions may carry any.
    #[serde(default)]
    pub value: Amount,
}

impl Context {
    pub fn new(sender: Address, now: Timestamp) -> Self {
        Self {
            sender,
            now,
            value: 0,
        }
    }

    pub fn with_value(mut self, value: Amount) -> Self {
        self.value = value;
        self
    }
}

// ── Configuration ────────────────────────────────────────────────────

/// Parameters fixed at construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Seconds after construction during which contributions are accepted.
    pub contribution_duration: u64,
    /// Seconds a proposal stays open for voting.
    pub vote_duration: u64,
    /// Share of the outstanding supply (1..=100) a proposal needs to pass.
    pub quorum_percent: u8,
}

// ── Proposals ────────────────────────────────────────────────────────

/// A timed request to release reserved funds to a recipient.
///
/// Immutable after creation except for `votes` (only grows) and
/// `executed` (false to true, once).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub id: ProposalId,
    pub name: String,
    pub amount: Amount,
    pub recipient: Address,
    /// Sum of the share balances of everyone who voted for it.
    pub votes: Amount,
    /// Voting is open while `now < end`; execution is allowed from `end` on.
    pub end: Timestamp,
    pub executed: bool,
}

/// Lifecycle status of a proposal at a given moment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalStatus {
    /// Accepting votes.
    Voting,
    /// Vote closed with quorum met; waiting for the admin.
    Executable,
    /// Vote closed without quorum. Its reservation stays locked.
    Rejected,
    /// Funds released to the recipient.
    Executed,
}

// ── Summary ──────────────────────────────────────────────────────────

/// Point-in-time copy of every scalar accessor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSummary {
    pub admin: Address,
    pub total_shares: Amount,
    pub available_funds: Amount,
    pub reserved_funds: Amount,
    pub held_balance: Amount,
    pub next_proposal_id: ProposalId,
    pub quorum_percent: u8,
    pub vote_duration: u64,
    pub contribution_end: Timestamp,
    pub investor_count: usize,
}
