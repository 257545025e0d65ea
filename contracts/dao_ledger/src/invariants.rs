//! Whole-ledger consistency checks.
//!
//! The ledger maintains these on every transition; [`check`] recomputes them
//! from scratch. Tests run it after every step and the sequencer runs it
//! after replaying its journal.

use thiserror::Error;

use crate::ledger::Ledger;
use crate::types::{Amount, ProposalId};

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    /// INV-1: `total_shares` equals the sum of all share balances.
    #[error("total shares {recorded} != sum of balances {computed}")]
    ShareSupply { recorded: Amount, computed: Amount },

    /// INV-2: the investor map holds no zero balances.
    #[error("zero-share entry kept for {0}")]
    ZeroShareEntry(String),

    /// INV-3: held value equals available plus reserved funds.
    #[error("held balance {held} != available {available} + reserved {reserved}")]
    Custody {
        held: Amount,
        available: Amount,
        reserved: Amount,
    },

    /// INV-4: proposal ids are dense, sequential and below `next_proposal_id`.
    #[error("proposal at index {index} has id {id} (next id {next})")]
    ProposalSequence {
        index: usize,
        id: ProposalId,
        next: ProposalId,
    },

    /// INV-5: every vote record references an existing proposal.
    #[error("vote recorded for unknown proposal {0}")]
    DanglingVote(ProposalId),

    /// INV-6: proposals are only executed once their vote has ended.
    #[error("proposal {id} executed before its end {end} (clock {clock})")]
    EarlyExecution {
        id: ProposalId,
        end: u64,
        clock: u64,
    },
}

/// Recompute every invariant, returning the first violation found.
pub fn check(ledger: &Ledger) -> Result<(), InvariantViolation> {
    let mut computed: Amount = 0;
    for (who, amount) in ledger.investors() {
        if *amount == 0 {
            return Err(InvariantViolation::ZeroShareEntry(who.to_string()));
        }
        computed = computed.saturating_add(*amount);
    }
    if computed != ledger.total_shares() {
        return Err(InvariantViolation::ShareSupply {
            recorded: ledger.total_shares(),
            computed,
        });
    }

    let reserved = ledger.reserved_funds();
    if ledger.available_funds().checked_add(reserved) != Some(ledger.held_balance()) {
        return Err(InvariantViolation::Custody {
            held: ledger.held_balance(),
            available: ledger.available_funds(),
            reserved,
        });
    }

    let next = ledger.next_proposal_id();
    let proposals = ledger.proposals();
    if proposals.len() as u64 != next {
        return Err(InvariantViolation::ProposalSequence {
            index: proposals.len(),
            id: next,
            next,
        });
    }
    for (index, proposal) in proposals.iter().enumerate() {
        if proposal.id != index as u64 {
            return Err(InvariantViolation::ProposalSequence {
                index,
                id: proposal.id,
                next,
            });
        }
        if proposal.executed && proposal.end > ledger.clock() {
            return Err(InvariantViolation::EarlyExecution {
                id: proposal.id,
                end: proposal.end,
                clock: ledger.clock(),
            });
        }
    }

    if let Some((_, id)) = ledger.vote_records().find(|(_, id)| *id >= next) {
        return Err(InvariantViolation::DanglingVote(*id));
    }

    Ok(())
}
