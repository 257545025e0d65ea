use crate::test_support::{account, admin, setup, setup_with_quorum, VOTE_DURATION};
use crate::{invariants, Context, Error, Ledger, LedgerConfig, Operation};

fn config(quorum_percent: u8) -> LedgerConfig {
    LedgerConfig {
        contribution_duration: 20_000,
        vote_duration: 10,
        quorum_percent,
    }
}

#[test]
fn test_quorum_bounds_at_construction() {
    let ctx = Context::new(admin(), 0);
    assert_eq!(Ledger::new(config(0), &ctx), Err(Error::InvalidQuorum));
    assert_eq!(Ledger::new(config(101), &ctx), Err(Error::InvalidQuorum));
    assert!(Ledger::new(config(1), &ctx).is_ok());
    assert!(Ledger::new(config(100), &ctx).is_ok());
}

#[test]
fn test_construction_sets_fixed_parameters() {
    let ledger = Ledger::new(config(67), &Context::new(admin(), 500)).unwrap();
    assert_eq!(ledger.admin(), admin());
    assert_eq!(ledger.quorum_percent(), 67);
    assert_eq!(ledger.vote_duration(), 10);
    assert_eq!(ledger.contribution_end(), 20_500);
    assert_eq!(ledger.total_shares(), 0);
    assert_eq!(ledger.available_funds(), 0);
    assert_eq!(ledger.next_proposal_id(), 0);
}

#[test]
fn test_contribution_window_overflow_rejected() {
    let ctx = Context::new(admin(), u64::MAX);
    assert_eq!(
        Ledger::new(config(50), &ctx),
        Err(Error::ArithmeticOverflow)
    );
}

#[test]
fn test_contribute_then_redeem_round_trips() {
    let mut dao = setup();
    dao.contribute(account(1), 40).unwrap();
    let (shares, funds) = (dao.ledger.shares(&account(1)), dao.ledger.available_funds());

    dao.contribute(account(1), 75).unwrap();
    dao.redeem(account(1), 75).unwrap();

    assert_eq!(dao.ledger.shares(&account(1)), shares);
    assert_eq!(dao.ledger.available_funds(), funds);
}

#[test]
fn test_quorum_boundary_is_floor_of_product() {
    // 3 shares at 67%: threshold floor(201 / 100) = 2.
    let mut dao = setup_with_quorum(67);
    dao.contribute(account(1), 2).unwrap();
    dao.contribute(account(2), 1).unwrap();
    assert_eq!(dao.ledger.quorum_threshold(), Ok(2));

    dao.propose(account(1), 1, account(5)).unwrap();
    dao.propose(account(1), 1, account(5)).unwrap();
    dao.vote(account(1), 0).unwrap();
    dao.vote(account(2), 1).unwrap();
    dao.advance(VOTE_DURATION);

    dao.execute(admin(), 0).unwrap();
    dao.assert_rejected(Error::QuorumNotReached, |d| d.execute(admin(), 1));
}

#[test]
fn test_scenario_pooled_contributions() {
    let mut dao = setup();
    dao.contribute(account(1), 100).unwrap();
    dao.contribute(account(2), 200).unwrap();
    dao.contribute(account(3), 100).unwrap();
    assert_eq!(dao.ledger.total_shares(), 400);
    assert_eq!(dao.ledger.available_funds(), 400);
}

#[test]
fn test_scenario_partial_redemption() {
    let mut dao = setup();
    dao.contribute(account(1), 100).unwrap();
    dao.redeem(account(1), 50).unwrap();
    assert_eq!(dao.ledger.shares(&account(1)), 50);
    assert!(dao.ledger.is_investor(&account(1)));
    assert_eq!(dao.ledger.available_funds(), 50);
}

#[test]
fn test_scenario_transfer_keeps_supply() {
    let mut dao = setup();
    dao.contribute(account(1), 100).unwrap();
    dao.transfer(account(1), account(2), 50).unwrap();
    assert_eq!(dao.ledger.shares(&account(1)), 50);
    assert_eq!(dao.ledger.shares(&account(2)), 50);
    assert!(dao.ledger.is_investor(&account(1)));
    assert!(dao.ledger.is_investor(&account(2)));
    assert_eq!(dao.ledger.total_shares(), 100);
}

#[test]
fn test_scenario_execute_pays_once() {
    let mut dao = setup();
    dao.contribute(account(1), 100).unwrap();
    dao.propose(account(1), 50, account(5)).unwrap();
    dao.vote(account(1), 0).unwrap();
    dao.advance(VOTE_DURATION + 1);

    let mut paid_to_recipient = 0u128;
    let receipt = dao.execute(admin(), 0).unwrap();
    for payout in receipt.payouts.iter().filter(|p| p.recipient == account(5)) {
        paid_to_recipient += payout.amount;
    }
    assert_eq!(dao.execute(admin(), 0), Err(Error::AlreadyExecuted));
    assert_eq!(paid_to_recipient, 50);
}

#[test]
fn test_apply_replays_journal_deterministically() {
    let journal = vec![
        (Context::new(account(1), 10).with_value(100), Operation::Contribute),
        (Context::new(account(2), 11).with_value(300), Operation::Contribute),
        (
            Context::new(account(2), 12),
            Operation::TransferShare {
                amount: 100,
                to: account(3),
            },
        ),
        (
            Context::new(account(3), 13),
            Operation::CreateProposal {
                name: "grant".into(),
                amount: 120,
                recipient: account(9),
            },
        ),
        (Context::new(account(2), 14), Operation::Vote { proposal_id: 0 }),
        (Context::new(account(3), 15), Operation::Vote { proposal_id: 0 }),
        (Context::new(account(1), 16), Operation::RedeemShare { amount: 30 }),
        (
            Context::new(admin(), 30),
            Operation::ExecuteProposal { proposal_id: 0 },
        ),
        (
            Context::new(admin(), 31),
            Operation::WithdrawFunds {
                amount: 10,
                recipient: admin(),
            },
        ),
    ];

    let run = || {
        let mut ledger = Ledger::new(config(50), &Context::new(admin(), 0)).unwrap();
        let mut paid = 0u128;
        for (ctx, op) in &journal {
            let receipt = ledger.apply(ctx, op).unwrap();
            paid += receipt.payouts.iter().map(|p| p.amount).sum::<u128>();
            invariants::check(&ledger).unwrap();
        }
        (ledger, paid)
    };

    let (first, paid) = run();
    let (second, _) = run();
    assert_eq!(first, second);
    assert_eq!(paid, 30 + 120 + 10);
    assert_eq!(first.total_shares(), 370);
    assert_eq!(first.available_funds(), 400 - 120 - 30 - 10);
    assert_eq!(first.held_balance(), first.available_funds());
    assert_eq!(first.proposal(0).unwrap().votes, 300);
}

#[test]
fn test_operation_json_shape() {
    let op = Operation::CreateProposal {
        name: "DAI".into(),
        amount: 50,
        recipient: account(5),
    };
    let json = serde_json::to_value(&op).unwrap();
    assert_eq!(json["create_proposal"]["amount"], 50);
    let back: Operation = serde_json::from_value(json).unwrap();
    assert_eq!(back, op);

    let contribute: Operation = serde_json::from_str("\"contribute\"").unwrap();
    assert_eq!(contribute, Operation::Contribute);
}

#[test]
fn test_summary_reflects_accessors() {
    let mut dao = setup();
    dao.contribute(account(1), 100).unwrap();
    dao.contribute(account(2), 50).unwrap();
    dao.propose(account(1), 30, account(5)).unwrap();

    let summary = dao.ledger.summary();
    assert_eq!(summary.admin, admin());
    assert_eq!(summary.total_shares, 150);
    assert_eq!(summary.available_funds, 120);
    assert_eq!(summary.reserved_funds, 30);
    assert_eq!(summary.held_balance, 150);
    assert_eq!(summary.next_proposal_id, 1);
    assert_eq!(summary.investor_count, 2);
}
