//! Value custody: carries out the payouts an applied operation owes.
//!
//! Payouts are only handed to custody after the operation, its events and
//! its outbox rows are committed to the journal. A payout interrupted by a
//! crash is still in the outbox and is settled by [`settle_pending`] on the
//! next start.

use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::db::{self, PendingPayout};
use crate::errors::Result;

pub trait Custody: Send + Sync + 'static {
    /// Move `pending.payout.amount` to `pending.payout.recipient`.
    ///
    /// Must be idempotent per outbox row: a row may be offered again after a
    /// crash between transfer and acknowledgement.
    fn pay(
        &self,
        pending: &PendingPayout,
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// Custody that only acknowledges payouts in the outbox.
///
/// It moves no value. Rows are marked settled as soon as they are offered,
/// so the outbox records what was owed, not what was paid.
pub struct OutboxCustody {
    pool: SqlitePool,
}

impl OutboxCustody {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl Custody for OutboxCustody {
    async fn pay(&self, pending: &PendingPayout) -> Result<()> {
        db::mark_settled(&self.pool, pending.id, chrono::Utc::now().timestamp()).await?;
        info!(
            sequence = pending.sequence,
            recipient = %pending.payout.recipient,
            amount = %pending.payout.amount,
            "payout settled"
        );
        Ok(())
    }
}

/// Settle every outbox row for `sequence`, or every unsettled row when
/// `sequence` is `None`. Returns how many rows were settled.
pub async fn settle_pending<C: Custody>(
    pool: &SqlitePool,
    custody: &C,
    sequence: Option<i64>,
) -> Result<usize> {
    let pending = db::pending_payouts(pool, sequence).await?;
    let mut settled = 0;
    for payout in &pending {
        match custody.pay(payout).await {
            Ok(()) => settled += 1,
            Err(e) => warn!(payout_id = payout.id, "payout not settled: {e}"),
        }
    }
    Ok(settled)
}
