//! Ledger error kinds.
//!
//! Every failure is a rejected precondition. A failed call leaves the
//! ledger exactly as it was. Discriminants are stable and are exposed to
//! clients as numeric codes.
//!
//! `InsufficientFunds` covers both redeeming and withdrawing, so the two
//! share one message.

#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord, Hash, thiserror::Error)]
#[repr(u32)]
pub enum Error {
    #[error("quorum must be between 0 and 100")]
    InvalidQuorum = 1,
    #[error("cannot contribute after contribution end")]
    ContributionWindowClosed = 2,
    #[error("not enough shares")]
    InsufficientShares = 3,
    #[error("not enough available funds")]
    InsufficientFunds = 4,
    #[error("only investors")]
    NotInvestor = 5,
    #[error("amount too big")]
    AmountTooLarge = 6,
    #[error("investor can only vote once for a proposal")]
    AlreadyVoted = 7,
    #[error("can only vote until proposal end")]
    VotingClosed = 8,
    #[error("only admin")]
    NotAdmin = 9,
    #[error("cannot execute a proposal before end date")]
    TooEarly = 10,
    #[error("cannot execute a proposal already executed")]
    AlreadyExecuted = 11,
    #[error("cannot execute a proposal with votes below quorum")]
    QuorumNotReached = 12,
    #[error("proposal does not exist")]
    ProposalNotFound = 13,
    #[error("arithmetic overflow")]
    ArithmeticOverflow = 14,
    #[error("operation does not accept attached value")]
    UnexpectedValue = 15,
    #[error("timestamp is older than the last applied operation")]
    ClockRegression = 16,
    #[error("invalid address")]
    InvalidAddress = 17,
}

impl Error {
    /// Stable numeric code for this error.
    pub fn code(self) -> u32 {
        self as u32
    }
}

pub type Result<T> = core::result::Result<T, Error>;
