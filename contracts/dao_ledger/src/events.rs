//! # Events
//!
//! Every successful operation yields exactly one [`LedgerEvent`] and zero or
//! one [`Payout`], bundled in a [`Receipt`].
//!
//! | Operation         | Topic      | Payout                   |
//! |-------------------|------------|--------------------------|
//! | `Contribute`      | `contrib`  | -                        |
//! | `RedeemShare`     | `redeem`   | redeemed amount → sender |
//! | `TransferShare`   | `transfer` | -                        |
//! | `CreateProposal`  | `created`  | -                        |
//! | `Vote`            | `voted`    | -                        |
//! | `ExecuteProposal` | `executed` | amount → recipient       |
//! | `WithdrawFunds`   | `withdraw` | amount → recipient       |
//!
//! Payouts are instructions for the custody layer. The ledger has already
//! committed its state by the time a caller sees them.

use serde::{Deserialize, Serialize};

use crate::types::{Address, Amount, ProposalId, Timestamp};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerEvent {
    Contributed {
        investor: Address,
        amount: Amount,
    },
    Redeemed {
        investor: Address,
        amount: Amount,
    },
    Transferred {
        from: Address,
        to: Address,
        amount: Amount,
    },
    ProposalCreated {
        proposal_id: ProposalId,
        proposer: Address,
        recipient: Address,
        amount: Amount,
        end: Timestamp,
    },
    Voted {
        proposal_id: ProposalId,
        voter: Address,
        weight: Amount,
    },
    ProposalExecuted {
        proposal_id: ProposalId,
        recipient: Address,
        amount: Amount,
    },
    FundsWithdrawn {
        recipient: Address,
        amount: Amount,
    },
}

impl LedgerEvent {
    /// Short topic identifier used by the journal and API.
    pub fn topic(&self) -> &'static str {
        match self {
            Self::Contributed { .. } => "contrib",
            Self::Redeemed { .. } => "redeem",
            Self::Transferred { .. } => "transfer",
            Self::ProposalCreated { .. } => "created",
            Self::Voted { .. } => "voted",
            Self::ProposalExecuted { .. } => "executed",
            Self::FundsWithdrawn { .. } => "withdraw",
        }
    }

    /// The proposal this event concerns, if any.
    pub fn proposal_id(&self) -> Option<ProposalId> {
        match self {
            Self::ProposalCreated { proposal_id, .. }
            | Self::Voted { proposal_id, .. }
            | Self::ProposalExecuted { proposal_id, .. } => Some(*proposal_id),
            _ => None,
        }
    }

    /// The identity that triggered or is credited by this event.
    pub fn actor(&self) -> Address {
        match self {
            Self::Contributed { investor, .. } | Self::Redeemed { investor, .. } => *investor,
            Self::Transferred { from, .. } => *from,
            Self::ProposalCreated { proposer, .. } => *proposer,
            Self::Voted { voter, .. } => *voter,
            Self::ProposalExecuted { recipient, .. } | Self::FundsWithdrawn { recipient, .. } => {
                *recipient
            }
        }
    }

    /// Value or share amount carried by this event.
    pub fn amount(&self) -> Amount {
        match self {
            Self::Contributed { amount, .. }
            | Self::Redeemed { amount, .. }
            | Self::Transferred { amount, .. }
            | Self::ProposalCreated { amount, .. }
            | Self::ProposalExecuted { amount, .. }
            | Self::FundsWithdrawn { amount, .. } => *amount,
            Self::Voted { weight, .. } => *weight,
        }
    }
}

/// An outward value transfer the custody layer must perform.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payout {
    pub recipient: Address,
    pub amount: Amount,
}

/// Result of a successfully applied operation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub events: Vec<LedgerEvent>,
    pub payouts: Vec<Payout>,
}

impl Receipt {
    pub(crate) fn event(event: LedgerEvent) -> Self {
        Self {
            events: vec![event],
            payouts: Vec::new(),
        }
    }

    /// Attach an outward transfer. Zero-value transfers are dropped.
    pub(crate) fn with_payout(mut self, recipient: Address, amount: Amount) -> Self {
        if amount > 0 {
            self.payouts.push(Payout { recipient, amount });
        }
        self
    }
}
