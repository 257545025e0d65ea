//! # Ledger
//!
//! The single state machine behind the DAO. Every mutator follows the same
//! three steps:
//!
//! 1. check every precondition and compute every new value with checked
//!    arithmetic, touching nothing;
//! 2. commit all writes;
//! 3. hand back a [`Receipt`] whose payouts the caller performs afterwards.
//!
//! A failure in step 1 returns an [`Error`] and leaves the ledger untouched,
//! so callers never observe partial state. Because outward transfers are only
//! described, never performed, anything triggered by a payout already sees
//! the committed state.
//!
//! ## Accounting
//!
//! ```text
//! held_balance   = available_funds + reserved_funds
//! reserved_funds = Σ amount of proposals not yet executed
//! total_shares   = Σ investor shares
//! ```
//!
//! Proposal amounts leave `available_funds` when the proposal is created and
//! leave `held_balance` when it is executed.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::events::{LedgerEvent, Receipt};
use crate::types::{
    Address, Amount, Context, LedgerConfig, LedgerSummary, Proposal, ProposalId, ProposalStatus,
    Timestamp,
};

/// A journaled ledger operation. The call context travels separately.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// Mint shares 1:1 for the value attached to the call.
    Contribute,
    RedeemShare {
        amount: Amount,
    },
    TransferShare {
        amount: Amount,
        to: Address,
    },
    CreateProposal {
        name: String,
        amount: Amount,
        recipient: Address,
    },
    Vote {
        proposal_id: ProposalId,
    },
    ExecuteProposal {
        proposal_id: ProposalId,
    },
    WithdrawFunds {
        amount: Amount,
        recipient: Address,
    },
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Contribute => "contribute",
            Self::RedeemShare { .. } => "redeem_share",
            Self::TransferShare { .. } => "transfer_share",
            Self::CreateProposal { .. } => "create_proposal",
            Self::Vote { .. } => "vote",
            Self::ExecuteProposal { .. } => "execute_proposal",
            Self::WithdrawFunds { .. } => "withdraw_funds",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ledger {
    admin: Address,
    quorum_percent: u8,
    vote_duration: u64,
    contribution_end: Timestamp,

    total_shares: Amount,
    available_funds: Amount,
    held_balance: Amount,
    next_proposal_id: ProposalId,

    /// Non-zero share balances only. Absence means "not an investor".
    shares: BTreeMap<Address, Amount>,
    /// Indexed by proposal id.
    proposals: Vec<Proposal>,
    votes: BTreeSet<(Address, ProposalId)>,

    /// `now` of the latest committed operation.
    clock: Timestamp,
}

fn add(a: Amount, b: Amount) -> Result<Amount> {
    a.checked_add(b).ok_or(Error::ArithmeticOverflow)
}

fn sub(a: Amount, b: Amount) -> Result<Amount> {
    a.checked_sub(b).ok_or(Error::ArithmeticOverflow)
}

impl Ledger {
    // ─────────────────────────────────────────────────────────
    // Construction
    // ─────────────────────────────────────────────────────────

    /// Create an empty ledger administered by `ctx.sender`.
    ///
    /// Fails with [`Error::InvalidQuorum`] unless `1 <= quorum_percent <= 100`.
    pub fn new(config: LedgerConfig, ctx: &Context) -> Result<Self> {
        if !(1..=100).contains(&config.quorum_percent) {
            return Err(Error::InvalidQuorum);
        }
        if ctx.value != 0 {
            return Err(Error::UnexpectedValue);
        }
        let contribution_end = ctx
            .now
            .checked_add(config.contribution_duration)
            .ok_or(Error::ArithmeticOverflow)?;

        info!(
            admin = %ctx.sender,
            quorum_percent = config.quorum_percent,
            vote_duration = config.vote_duration,
            contribution_end,
            "ledger created"
        );

        Ok(Self {
            admin: ctx.sender,
            quorum_percent: config.quorum_percent,
            vote_duration: config.vote_duration,
            contribution_end,
            total_shares: 0,
            available_funds: 0,
            held_balance: 0,
            next_proposal_id: 0,
            shares: BTreeMap::new(),
            proposals: Vec::new(),
            votes: BTreeSet::new(),
            clock: ctx.now,
        })
    }

    /// Apply a journaled operation.
    pub fn apply(&mut self, ctx: &Context, op: &Operation) -> Result<Receipt> {
        let result = match op {
            Operation::Contribute => self.contribute(ctx),
            Operation::RedeemShare { amount } => self.redeem_share(ctx, *amount),
            Operation::TransferShare { amount, to } => self.transfer_share(ctx, *amount, *to),
            Operation::CreateProposal {
                name,
                amount,
                recipient,
            } => self.create_proposal(ctx, name, *amount, *recipient),
            Operation::Vote { proposal_id } => self.vote(ctx, *proposal_id),
            Operation::ExecuteProposal { proposal_id } => {
                self.execute_proposal(ctx, *proposal_id)
            }
            Operation::WithdrawFunds { amount, recipient } => {
                self.withdraw_funds(ctx, *amount, *recipient)
            }
        };

        match &result {
            Ok(_) => debug!(op = op.name(), sender = %ctx.sender, now = ctx.now, "applied"),
            Err(e) => debug!(op = op.name(), sender = %ctx.sender, now = ctx.now, error = %e, "rejected"),
        }
        result
    }

    // ─────────────────────────────────────────────────────────
    // Shares
    // ─────────────────────────────────────────────────────────

    /// Mint `ctx.value` shares to the sender while the contribution window
    /// is open (`now <= contribution_end`).
    pub fn contribute(&mut self, ctx: &Context) -> Result<Receipt> {
        self.check_clock(ctx)?;
        if ctx.now > self.contribution_end {
            return Err(Error::ContributionWindowClosed);
        }

        let amount = ctx.value;
        let shares = add(self.shares(&ctx.sender), amount)?;
        let total_shares = add(self.total_shares, amount)?;
        let available_funds = add(self.available_funds, amount)?;
        let held_balance = add(self.held_balance, amount)?;

        self.clock = ctx.now;
        self.set_shares(ctx.sender, shares);
        self.total_shares = total_shares;
        self.available_funds = available_funds;
        self.held_balance = held_balance;

        Ok(Receipt::event(LedgerEvent::Contributed {
            investor: ctx.sender,
            amount,
        }))
    }

    /// Burn `amount` of the sender's shares and pay out the same value.
    ///
    /// Allowed at any time, but only from funds not reserved by proposals.
    pub fn redeem_share(&mut self, ctx: &Context, amount: Amount) -> Result<Receipt> {
        self.check_clock(ctx)?;
        self.reject_value(ctx)?;

        let held = self.shares(&ctx.sender);
        if amount > held {
            return Err(Error::InsufficientShares);
        }
        if amount > self.available_funds {
            return Err(Error::InsufficientFunds);
        }
        let total_shares = sub(self.total_shares, amount)?;
        let held_balance = sub(self.held_balance, amount)?;

        self.clock = ctx.now;
        self.set_shares(ctx.sender, held - amount);
        self.total_shares = total_shares;
        self.available_funds -= amount;
        self.held_balance = held_balance;

        Ok(Receipt::event(LedgerEvent::Redeemed {
            investor: ctx.sender,
            amount,
        })
        .with_payout(ctx.sender, amount))
    }

    /// Move `amount` shares from the sender to `to`. No value moves.
    pub fn transfer_share(&mut self, ctx: &Context, amount: Amount, to: Address) -> Result<Receipt> {
        self.check_clock(ctx)?;
        self.reject_value(ctx)?;

        let from = ctx.sender;
        let from_shares = self.shares(&from);
        if amount > from_shares {
            return Err(Error::InsufficientShares);
        }

        if from != to {
            let to_shares = add(self.shares(&to), amount)?;
            self.set_shares(from, from_shares - amount);
            self.set_shares(to, to_shares);
        }
        self.clock = ctx.now;

        Ok(Receipt::event(LedgerEvent::Transferred { from, to, amount }))
    }

    // ─────────────────────────────────────────────────────────
    // Proposals
    // ─────────────────────────────────────────────────────────

    /// Open a proposal and reserve `amount` out of the available funds.
    ///
    /// The reservation happens here, not at execution, so two open proposals
    /// can never be backed by the same funds. It is released only by
    /// executing the proposal.
    pub fn create_proposal(
        &mut self,
        ctx: &Context,
        name: &str,
        amount: Amount,
        recipient: Address,
    ) -> Result<Receipt> {
        self.check_clock(ctx)?;
        self.reject_value(ctx)?;

        if !self.is_investor(&ctx.sender) {
            return Err(Error::NotInvestor);
        }
        if amount > self.available_funds {
            return Err(Error::AmountTooLarge);
        }
        let end = ctx
            .now
            .checked_add(self.vote_duration)
            .ok_or(Error::ArithmeticOverflow)?;
        let id = self.next_proposal_id;
        let next_proposal_id = id.checked_add(1).ok_or(Error::ArithmeticOverflow)?;

        self.clock = ctx.now;
        self.proposals.push(Proposal {
            id,
            name: name.to_owned(),
            amount,
            recipient,
            votes: 0,
            end,
            executed: false,
        });
        self.next_proposal_id = next_proposal_id;
        self.available_funds -= amount;

        info!(proposal_id = id, %recipient, amount, end, "proposal created");
        Ok(Receipt::event(LedgerEvent::ProposalCreated {
            proposal_id: id,
            proposer: ctx.sender,
            recipient,
            amount,
            end,
        }))
    }

    /// Add the sender's current share balance to a proposal's votes.
    ///
    /// One vote per investor and proposal. Weight is read once, at the time
    /// of the vote; later share movements do not change it.
    pub fn vote(&mut self, ctx: &Context, proposal_id: ProposalId) -> Result<Receipt> {
        self.check_clock(ctx)?;
        self.reject_value(ctx)?;

        let proposal = self.proposal(proposal_id).ok_or(Error::ProposalNotFound)?;
        let weight = self.shares(&ctx.sender);
        if weight == 0 {
            return Err(Error::NotInvestor);
        }
        if self.voted(&ctx.sender, proposal_id) {
            return Err(Error::AlreadyVoted);
        }
        if ctx.now >= proposal.end {
            return Err(Error::VotingClosed);
        }
        let votes = add(proposal.votes, weight)?;

        self.clock = ctx.now;
        self.proposals[proposal_id as usize].votes = votes;
        self.votes.insert((ctx.sender, proposal_id));

        Ok(Receipt::event(LedgerEvent::Voted {
            proposal_id,
            voter: ctx.sender,
            weight,
        }))
    }

    /// Release a proposal's reserved amount to its recipient.
    ///
    /// Admin only, once the vote has ended, at most once, and only if
    /// `votes >= floor(total_shares * quorum_percent / 100)` measured now.
    pub fn execute_proposal(&mut self, ctx: &Context, proposal_id: ProposalId) -> Result<Receipt> {
        self.check_clock(ctx)?;
        self.reject_value(ctx)?;
        self.require_admin(ctx)?;

        let proposal = self.proposal(proposal_id).ok_or(Error::ProposalNotFound)?;
        if ctx.now < proposal.end {
            return Err(Error::TooEarly);
        }
        if proposal.executed {
            return Err(Error::AlreadyExecuted);
        }
        if proposal.votes < self.quorum_threshold()? {
            return Err(Error::QuorumNotReached);
        }
        let (recipient, amount) = (proposal.recipient, proposal.amount);
        let held_balance = sub(self.held_balance, amount)?;

        self.clock = ctx.now;
        self.proposals[proposal_id as usize].executed = true;
        self.held_balance = held_balance;

        info!(proposal_id, %recipient, amount, "proposal executed");
        Ok(Receipt::event(LedgerEvent::ProposalExecuted {
            proposal_id,
            recipient,
            amount,
        })
        .with_payout(recipient, amount))
    }

    // ─────────────────────────────────────────────────────────
    // Admin
    // ─────────────────────────────────────────────────────────

    /// Pay `amount` of the available funds to `recipient`. Admin only.
    pub fn withdraw_funds(
        &mut self,
        ctx: &Context,
        amount: Amount,
        recipient: Address,
    ) -> Result<Receipt> {
        self.check_clock(ctx)?;
        self.reject_value(ctx)?;
        self.require_admin(ctx)?;

        if amount > self.available_funds {
            return Err(Error::InsufficientFunds);
        }
        let held_balance = sub(self.held_balance, amount)?;

        self.clock = ctx.now;
        self.available_funds -= amount;
        self.held_balance = held_balance;

        info!(%recipient, amount, "funds withdrawn");
        Ok(Receipt::event(LedgerEvent::FundsWithdrawn { recipient, amount })
            .with_payout(recipient, amount))
    }

    // ─────────────────────────────────────────────────────────
    // Guards
    // ─────────────────────────────────────────────────────────

    fn check_clock(&self, ctx: &Context) -> Result<()> {
        if ctx.now < self.clock {
            return Err(Error::ClockRegression);
        }
        Ok(())
    }

    fn reject_value(&self, ctx: &Context) -> Result<()> {
        if ctx.value != 0 {
            return Err(Error::UnexpectedValue);
        }
        Ok(())
    }

    fn require_admin(&self, ctx: &Context) -> Result<()> {
        if ctx.sender != self.admin {
            return Err(Error::NotAdmin);
        }
        Ok(())
    }

    fn set_shares(&mut self, who: Address, amount: Amount) {
        if amount == 0 {
            self.shares.remove(&who);
        } else {
            self.shares.insert(who, amount);
        }
    }

    // ─────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────

    pub fn shares(&self, who: &Address) -> Amount {
        self.shares.get(who).copied().unwrap_or(0)
    }

    pub fn is_investor(&self, who: &Address) -> bool {
        self.shares.contains_key(who)
    }

    pub fn total_shares(&self) -> Amount {
        self.total_shares
    }

    pub fn available_funds(&self) -> Amount {
        self.available_funds
    }

    /// Value the custody layer must currently hold for this ledger.
    pub fn held_balance(&self) -> Amount {
        self.held_balance
    }

    /// Funds locked by proposals that have not been executed.
    pub fn reserved_funds(&self) -> Amount {
        self.proposals
            .iter()
            .filter(|p| !p.executed)
            .map(|p| p.amount)
            .sum()
    }

    pub fn next_proposal_id(&self) -> ProposalId {
        self.next_proposal_id
    }

    pub fn proposal(&self, id: ProposalId) -> Option<&Proposal> {
        usize::try_from(id).ok().and_then(|i| self.proposals.get(i))
    }

    pub fn proposals(&self) -> &[Proposal] {
        &self.proposals
    }

    pub fn voted(&self, who: &Address, id: ProposalId) -> bool {
        self.votes.contains(&(*who, id))
    }

    /// Every `(voter, proposal)` pair that has voted.
    pub fn vote_records(&self) -> impl Iterator<Item = &(Address, ProposalId)> {
        self.votes.iter()
    }

    /// Investors and their share balances, ordered by address.
    pub fn investors(&self) -> impl Iterator<Item = (&Address, &Amount)> {
        self.shares.iter()
    }

    pub fn admin(&self) -> Address {
        self.admin
    }

    pub fn quorum_percent(&self) -> u8 {
        self.quorum_percent
    }

    pub fn vote_duration(&self) -> u64 {
        self.vote_duration
    }

    pub fn contribution_end(&self) -> Timestamp {
        self.contribution_end
    }

    /// `now` of the latest committed operation.
    pub fn clock(&self) -> Timestamp {
        self.clock
    }

    /// Votes a proposal needs right now: `floor(total_shares * quorum / 100)`.
    pub fn quorum_threshold(&self) -> Result<Amount> {
        self.total_shares
            .checked_mul(Amount::from(self.quorum_percent))
            .map(|v| v / 100)
            .ok_or(Error::ArithmeticOverflow)
    }

    pub fn proposal_status(&self, id: ProposalId, now: Timestamp) -> Option<ProposalStatus> {
        let proposal = self.proposal(id)?;
        let status = if proposal.executed {
            ProposalStatus::Executed
        } else if now < proposal.end {
            ProposalStatus::Voting
        } else if self
            .quorum_threshold()
            .map(|threshold| proposal.votes >= threshold)
            .unwrap_or(false)
        {
            ProposalStatus::Executable
        } else {
            ProposalStatus::Rejected
        };
        Some(status)
    }

    pub fn summary(&self) -> LedgerSummary {
        LedgerSummary {
            admin: self.admin,
            total_shares: self.total_shares,
            available_funds: self.available_funds,
            reserved_funds: self.reserved_funds(),
            held_balance: self.held_balance,
            next_proposal_id: self.next_proposal_id,
            quorum_percent: self.quorum_percent,
            vote_duration: self.vote_duration,
            contribution_end: self.contribution_end,
            investor_count: self.shares.len(),
        }
    }
}
