//! # DAO Ledger
//!
//! The governance and accounting engine of an investor DAO: members pool
//! native value, receive shares 1:1, and approve capital-allocation proposals
//! by share-weighted vote.
//!
//! | Phase        | Operation(s)                                       |
//! |--------------|----------------------------------------------------|
//! | Bootstrap    | [`Ledger::new`]                                    |
//! | Shares       | `contribute`, `redeem_share`, `transfer_share`     |
//! | Governance   | `create_proposal`, `vote`, `execute_proposal`      |
//! | Admin        | `withdraw_funds`                                   |
//! | Queries      | `shares`, `is_investor`, `proposal`, `voted`, ...  |
//!
//! ## Architecture
//!
//! The engine is a deterministic state transition function. It never reads
//! a clock, never authenticates anyone and never moves value: the host
//! supplies a [`Context`] (`sender`, `now`, attached `value`) with every call
//! and carries out the [`Payout`]s listed in each [`Receipt`] after the call
//! returns. Hosts must apply operations in one total order.
//!
//! [`invariants::check`] recomputes the conservation rules from scratch.

pub mod error;
pub mod events;
pub mod invariants;
pub mod ledger;
pub mod types;

#[cfg(test)]
mod test_proposals;
#[cfg(test)]
mod test_properties;

pub use error::{Error, Result};
pub use events::{LedgerEvent, Payout, Receipt};
pub use invariants::InvariantViolation;
pub use ledger::{Ledger, Operation};
pub use types::{
    Address, Amount, Context, LedgerConfig, LedgerSummary, Proposal, ProposalId, ProposalStatus,
    Timestamp,
};
