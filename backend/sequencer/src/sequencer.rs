//! The single writer: one background task owns every ledger mutation.
//!
//! Submissions from any number of API handlers are queued on an `mpsc`
//! channel and applied one at a time, which gives the ledger the single
//! total order it requires. For each submission the task:
//!
//! 1. stamps it with `now = max(wall clock, last applied now)`;
//! 2. applies it to the in-memory [`Ledger`];
//! 3. journals operation, events and payouts in one SQL transaction,
//!    restoring the pre-operation ledger if that write fails;
//! 4. only then hands the payouts to [`Custody`].
//!
//! Once step 3 commits, the submission is reported as applied. A payout
//! that fails to settle stays in the outbox for the next settlement pass.
//!
//! Readers share the ledger behind an `RwLock`. The write lock is held
//! until the journal commit, so readers never see unjournaled state.

use std::sync::Arc;

use chrono::Utc;
use dao_ledger::{invariants, Address, Amount, Context, Ledger, Operation, Receipt, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tokio::sync::{mpsc, oneshot, RwLock};
use tracing::{info, warn};

use crate::config::Config;
use crate::custody::{self, Custody};
use crate::db::{self, Genesis};
use crate::errors::{NodeError, Result};

/// Source of the timestamps stamped onto submissions.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> u64;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        u64::try_from(Utc::now().timestamp()).unwrap_or(0)
    }
}

/// A caller's request. `sender` is trusted verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub sender: Address,
    #[serde(default)]
    pub value: Amount,
    pub operation: Operation,
}

/// A journaled, applied submission.
#[derive(Debug, Clone, Serialize)]
pub struct Committed {
    pub sequence: i64,
    pub timestamp: u64,
    pub receipt: Receipt,
}

struct Command {
    submission: Submission,
    reply: oneshot::Sender<Result<Committed>>,
}

// ─────────────────────────────────────────────────────────
// Bootstrap
// ─────────────────────────────────────────────────────────

/// Rebuild the ledger from the journal, creating genesis on first start.
pub async fn bootstrap(pool: &SqlitePool, config: &Config, clock: &dyn Clock) -> Result<Ledger> {
    let genesis = match db::load_genesis(pool).await? {
        Some(genesis) => {
            if genesis.admin != config.admin || genesis.config != config.ledger {
                warn!("Stored genesis differs from configuration; using stored genesis");
            }
            genesis
        }
        None => {
            let genesis = Genesis {
                admin: config.admin,
                config: config.ledger,
                created_at: config.genesis_timestamp.unwrap_or_else(|| clock.now()),
            };
            // Validate before persisting so a bad quorum never reaches disk.
            Ledger::new(genesis.config, &Context::new(genesis.admin, genesis.created_at))?;
            db::save_genesis(pool, &genesis).await?;
            info!("Created ledger genesis at {}", genesis.created_at);
            genesis
        }
    };

    let mut ledger = Ledger::new(
        genesis.config,
        &Context::new(genesis.admin, genesis.created_at),
    )?;

    let journal = db::load_journal(pool).await?;
    for entry in &journal {
        ledger
            .apply(&entry.context, &entry.operation)
            .map_err(|source| NodeError::Replay {
                sequence: entry.sequence,
                source,
            })?;
    }
    invariants::check(&ledger)?;

    info!(
        "Replayed {} journaled operations; total shares {}, available funds {}",
        journal.len(),
        ledger.total_shares(),
        ledger.available_funds()
    );
    Ok(ledger)
}

// ─────────────────────────────────────────────────────────
// Task
// ─────────────────────────────────────────────────────────

pub struct Sequencer<C> {
    pool: SqlitePool,
    ledger: Arc<RwLock<Ledger>>,
    custody: C,
    clock: Arc<dyn Clock>,
}

/// Cheap, cloneable access to the running sequencer.
#[derive(Clone)]
pub struct SequencerHandle {
    tx: mpsc::Sender<Command>,
    ledger: Arc<RwLock<Ledger>>,
    clock: Arc<dyn Clock>,
}

impl<C: Custody> Sequencer<C> {
    pub fn new(pool: SqlitePool, ledger: Ledger, custody: C, clock: Arc<dyn Clock>) -> Self {
        Self {
            pool,
            ledger: Arc::new(RwLock::new(ledger)),
            custody,
            clock,
        }
    }

    /// Spawn the sequencer as a background [`tokio`] task.
    pub fn spawn(self, queue_depth: usize) -> SequencerHandle {
        let (tx, rx) = mpsc::channel(queue_depth.max(1));
        let handle = SequencerHandle {
            tx,
            ledger: self.ledger.clone(),
            clock: self.clock.clone(),
        };
        tokio::spawn(self.run(rx));
        handle
    }

    async fn run(self, mut rx: mpsc::Receiver<Command>) {
        info!("Sequencer started");
        while let Some(Command { submission, reply }) = rx.recv().await {
            let result = self.process(submission).await;
            // The caller may have gone away; the operation stands regardless.
            let _ = reply.send(result);
        }
        info!("Sequencer stopped");
    }

    async fn process(&self, submission: Submission) -> Result<Committed> {
        let committed = {
            let mut ledger = self.ledger.write().await;
            let ctx = Context {
                sender: submission.sender,
                now: stamp(self.clock.as_ref(), &ledger),
                value: submission.value,
            };

            // Full copy per submission; restored if the journal write fails.
            let before = ledger.clone();
            let receipt = ledger.apply(&ctx, &submission.operation)?;

            match db::append_operation(&self.pool, &ctx, &submission.operation, &receipt).await {
                Ok(sequence) => Committed {
                    sequence,
                    timestamp: ctx.now,
                    receipt,
                },
                Err(e) => {
                    *ledger = before;
                    return Err(e);
                }
            }
        };

        info!(
            sequence = committed.sequence,
            op = submission.operation.name(),
            sender = %submission.sender,
            "operation committed"
        );

        if !committed.receipt.payouts.is_empty() {
            if let Err(e) =
                custody::settle_pending(&self.pool, &self.custody, Some(committed.sequence)).await
            {
                warn!(
                    sequence = committed.sequence,
                    "payouts left in outbox: {e}"
                );
            }
        }
        Ok(committed)
    }
}

/// The timestamp the next operation would be applied at.
fn stamp(clock: &dyn Clock, ledger: &Ledger) -> Timestamp {
    clock.now().max(ledger.clock())
}

impl SequencerHandle {
    /// Queue a submission and wait for it to be applied or rejected.
    pub async fn submit(&self, submission: Submission) -> Result<Committed> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command { submission, reply })
            .await
            .map_err(|_| NodeError::Unavailable)?;
        rx.await.map_err(|_| NodeError::Unavailable)?
    }

    /// Run a read-only query against the current ledger.
    pub async fn read<T>(&self, f: impl FnOnce(&Ledger) -> T) -> T {
        let ledger = self.ledger.read().await;
        f(&ledger)
    }

    /// Like [`read`](Self::read), also passing the time a submission
    /// arriving now would be stamped with.
    pub async fn read_at<T>(&self, f: impl FnOnce(&Ledger, Timestamp) -> T) -> T {
        let ledger = self.ledger.read().await;
        let now = stamp(self.clock.as_ref(), &ledger);
        f(&ledger, now)
    }
}
