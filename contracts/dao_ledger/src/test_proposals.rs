use crate::test_support::{account, admin, setup, setup_with_quorum, GENESIS, VOTE_DURATION};
use crate::{Error, LedgerEvent, Payout, ProposalStatus};

#[test]
fn test_create_proposal_reserves_funds() {
    let mut dao = setup();
    dao.contribute(account(1), 100).unwrap();
    assert_eq!(dao.ledger.next_proposal_id(), 0);

    dao.propose(account(1), 50, account(5)).unwrap();

    assert_eq!(dao.ledger.available_funds(), 50);
    assert_eq!(dao.ledger.reserved_funds(), 50);
    assert_eq!(dao.ledger.held_balance(), 100);
    assert_eq!(dao.ledger.next_proposal_id(), 1);

    let proposal = dao.ledger.proposal(0).unwrap();
    assert_eq!(proposal.id, 0);
    assert_eq!(proposal.name, "DAI");
    assert_eq!(proposal.amount, 50);
    assert_eq!(proposal.recipient, account(5));
    assert_eq!(proposal.votes, 0);
    assert_eq!(proposal.end, GENESIS + VOTE_DURATION);
    assert!(!proposal.executed);
}

#[test]
fn test_proposal_ids_are_sequential() {
    let mut dao = setup();
    dao.contribute(account(1), 100).unwrap();
    for expected in 0..3u64 {
        let receipt = dao.propose(account(1), 10, account(5)).unwrap();
        match &receipt.events[0] {
            LedgerEvent::ProposalCreated { proposal_id, .. } => assert_eq!(*proposal_id, expected),
            other => panic!("unexpected event {other:?}"),
        }
    }
    assert_eq!(dao.ledger.next_proposal_id(), 3);
    assert_eq!(dao.ledger.available_funds(), 70);
}

#[test]
fn test_create_proposal_rejected_for_non_investor() {
    let mut dao = setup();
    dao.contribute(account(1), 100).unwrap();
    dao.assert_rejected(Error::NotInvestor, |d| d.propose(account(2), 50, account(5)));
}

#[test]
fn test_create_proposal_rejected_above_available_funds() {
    let mut dao = setup();
    dao.contribute(account(1), 100).unwrap();
    dao.assert_rejected(Error::AmountTooLarge, |d| {
        d.propose(account(1), 150, account(5))
    });
}

#[test]
fn test_overlapping_proposals_cannot_share_funds() {
    let mut dao = setup();
    dao.contribute(account(1), 100).unwrap();
    dao.propose(account(1), 60, account(5)).unwrap();
    dao.assert_rejected(Error::AmountTooLarge, |d| {
        d.propose(account(1), 60, account(6))
    });
    dao.propose(account(1), 40, account(6)).unwrap();
    assert_eq!(dao.ledger.available_funds(), 0);
}

#[test]
fn test_vote_adds_current_shares() {
    let mut dao = setup();
    dao.contribute(account(1), 100).unwrap();
    dao.propose(account(1), 50, account(5)).unwrap();
    assert!(!dao.ledger.voted(&account(1), 0));

    let receipt = dao.vote(account(1), 0).unwrap();

    assert!(dao.ledger.voted(&account(1), 0));
    assert_eq!(dao.ledger.proposal(0).unwrap().votes, 100);
    assert_eq!(
        receipt.events,
        vec![LedgerEvent::Voted {
            proposal_id: 0,
            voter: account(1),
            weight: 100
        }]
    );
}

#[test]
fn test_vote_rejected_for_non_investor() {
    let mut dao = setup();
    dao.contribute(account(1), 100).unwrap();
    dao.propose(account(1), 50, account(5)).unwrap();
    dao.assert_rejected(Error::NotInvestor, |d| d.vote(account(4), 0));
}

#[test]
fn test_vote_rejected_twice() {
    let mut dao = setup();
    dao.contribute(account(1), 100).unwrap();
    dao.propose(account(1), 50, account(5)).unwrap();
    dao.vote(account(1), 0).unwrap();
    dao.assert_rejected(Error::AlreadyVoted, |d| d.vote(account(1), 0));
    assert_eq!(dao.ledger.proposal(0).unwrap().votes, 100);
}

#[test]
fn test_vote_rejected_at_and_after_end() {
    let mut dao = setup();
    dao.contribute(account(1), 100).unwrap();
    dao.propose(account(1), 50, account(5)).unwrap();
    dao.advance(VOTE_DURATION - 1);
    dao.contribute(account(2), 10).unwrap();
    dao.vote(account(2), 0).unwrap();

    dao.advance(1);
    dao.assert_rejected(Error::VotingClosed, |d| d.vote(account(1), 0));
}

#[test]
fn test_vote_on_unknown_proposal() {
    let mut dao = setup();
    dao.contribute(account(1), 100).unwrap();
    dao.assert_rejected(Error::ProposalNotFound, |d| d.vote(account(1), 7));
}

#[test]
fn test_vote_weight_is_fixed_when_cast() {
    let mut dao = setup();
    dao.contribute(account(1), 100).unwrap();
    dao.contribute(account(2), 100).unwrap();
    dao.propose(account(1), 10, account(5)).unwrap();

    dao.vote(account(1), 0).unwrap();
    // Moving shares after voting neither retracts nor duplicates weight.
    dao.transfer(account(1), account(2), 100).unwrap();
    dao.assert_rejected(Error::NotInvestor, |d| d.vote(account(1), 0));
    dao.vote(account(2), 0).unwrap();

    assert_eq!(dao.ledger.proposal(0).unwrap().votes, 300);
}

#[test]
fn test_execute_proposal() {
    let mut dao = setup();
    dao.contribute(account(1), 100).unwrap();
    dao.propose(account(1), 50, account(5)).unwrap();
    dao.vote(account(1), 0).unwrap();
    assert_eq!(
        dao.ledger.proposal_status(0, dao.now),
        Some(ProposalStatus::Voting)
    );
    dao.advance(VOTE_DURATION + 1);
    assert_eq!(
        dao.ledger.proposal_status(0, dao.now),
        Some(ProposalStatus::Executable)
    );

    let receipt = dao.execute(admin(), 0).unwrap();

    assert!(dao.ledger.proposal(0).unwrap().executed);
    assert_eq!(
        receipt.payouts,
        vec![Payout {
            recipient: account(5),
            amount: 50
        }]
    );
    // Reservation already left available funds at creation.
    assert_eq!(dao.ledger.available_funds(), 50);
    assert_eq!(dao.ledger.reserved_funds(), 0);
    assert_eq!(dao.ledger.held_balance(), 50);
    assert_eq!(
        dao.ledger.proposal_status(0, dao.now),
        Some(ProposalStatus::Executed)
    );
}

#[test]
fn test_execute_allowed_exactly_at_end() {
    let mut dao = setup();
    dao.contribute(account(1), 100).unwrap();
    dao.propose(account(1), 50, account(5)).unwrap();
    dao.vote(account(1), 0).unwrap();
    dao.advance(VOTE_DURATION);
    dao.execute(admin(), 0).unwrap();
}

#[test]
fn test_execute_rejected_for_non_admin() {
    let mut dao = setup();
    dao.contribute(account(1), 100).unwrap();
    dao.propose(account(1), 50, account(5)).unwrap();
    dao.vote(account(1), 0).unwrap();
    dao.advance(VOTE_DURATION + 1);
    dao.assert_rejected(Error::NotAdmin, |d| d.execute(account(5), 0));
}

#[test]
fn test_execute_rejected_before_end() {
    let mut dao = setup();
    dao.contribute(account(1), 100).unwrap();
    dao.propose(account(1), 50, account(5)).unwrap();
    dao.vote(account(1), 0).unwrap();
    dao.assert_rejected(Error::TooEarly, |d| d.execute(admin(), 0));
}

#[test]
fn test_execute_rejected_twice() {
    let mut dao = setup();
    dao.contribute(account(1), 100).unwrap();
    dao.propose(account(1), 50, account(5)).unwrap();
    dao.vote(account(1), 0).unwrap();
    dao.advance(VOTE_DURATION + 1);
    dao.execute(admin(), 0).unwrap();
    dao.assert_rejected(Error::AlreadyExecuted, |d| d.execute(admin(), 0));
}

#[test]
fn test_execute_rejected_below_quorum() {
    let mut dao = setup();
    dao.contribute(account(1), 100).unwrap();
    dao.contribute(account(2), 1000).unwrap();
    dao.propose(account(1), 50, account(5)).unwrap();
    dao.vote(account(1), 0).unwrap();
    dao.advance(VOTE_DURATION + 1);
    assert_eq!(
        dao.ledger.proposal_status(0, dao.now),
        Some(ProposalStatus::Rejected)
    );
    dao.assert_rejected(Error::QuorumNotReached, |d| d.execute(admin(), 0));
    // The reservation is not released by a failed vote.
    assert_eq!(dao.ledger.reserved_funds(), 50);
}

#[test]
fn test_execute_unknown_proposal() {
    let mut dao = setup();
    dao.assert_rejected(Error::ProposalNotFound, |d| d.execute(admin(), 0));
}

#[test]
fn test_quorum_uses_share_supply_at_execution() {
    let mut dao = setup_with_quorum(50);
    dao.contribute(account(1), 100).unwrap();
    dao.contribute(account(2), 100).unwrap();
    dao.propose(account(1), 10, account(5)).unwrap();
    dao.vote(account(1), 0).unwrap();
    dao.advance(VOTE_DURATION);

    // 100 votes meet 50% of 200 shares but not of 300.
    dao.contribute(account(3), 100).unwrap();
    dao.assert_rejected(Error::QuorumNotReached, |d| d.execute(admin(), 0));
    dao.redeem(account(3), 100).unwrap();
    dao.execute(admin(), 0).unwrap();
}
