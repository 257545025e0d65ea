//! Database layer: migrations, journal writes and read queries.
//!
//! Amounts are `u128` and are stored as decimal TEXT. Timestamps and
//! proposal ids are stored as INTEGER.

use dao_ledger::{Address, Context, LedgerConfig, Operation, Payout, Receipt};
use serde::Serialize;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use tracing::info;

use crate::errors::{NodeError, Result};

/// Establish a SQLite connection pool and run pending migrations.
pub async fn init_pool(database_url: &str) -> Result<SqlitePool> {
    // Make sure the file is created if it doesn't exist yet.
    let url = if database_url.starts_with("sqlite:") {
        database_url.to_string()
    } else {
        format!("sqlite:{database_url}")
    };
    let url = if url.contains(":memory:") || url.contains("mode=") {
        url
    } else if url.contains('?') {
        format!("{url}&mode=rwc")
    } else {
        format!("{url}?mode=rwc")
    };

    // An in-memory database only exists on the connection that created it.
    let max_connections = if url.contains(":memory:") { 1 } else { 5 };

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect(&url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Database migrations applied successfully");
    Ok(pool)
}

fn to_i64(value: u64, what: &str) -> Result<i64> {
    i64::try_from(value).map_err(|_| NodeError::Corrupt(format!("{what} {value} exceeds i64")))
}

fn to_u64(value: i64, what: &str) -> Result<u64> {
    u64::try_from(value).map_err(|_| NodeError::Corrupt(format!("negative {what} {value}")))
}

// ─────────────────────────────────────────────────────────
// Genesis
// ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, sqlx::FromRow)]
struct GenesisRow {
    admin: String,
    contribution_duration: i64,
    vote_duration: i64,
    quorum_percent: i64,
    created_at: i64,
}

/// Parameters the ledger was created with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Genesis {
    pub admin: Address,
    pub config: LedgerConfig,
    pub created_at: u64,
}

pub async fn load_genesis(pool: &SqlitePool) -> Result<Option<Genesis>> {
    let row: Option<GenesisRow> = sqlx::query_as(
        "SELECT admin, contribution_duration, vote_duration, quorum_percent, created_at
         FROM genesis WHERE id = 1",
    )
    .fetch_optional(pool)
    .await?;

    row.map(|row| -> Result<Genesis> {
        Ok(Genesis {
            admin: row
                .admin
                .parse()
                .map_err(|_| NodeError::Corrupt(format!("genesis admin {}", row.admin)))?,
            config: LedgerConfig {
                contribution_duration: to_u64(row.contribution_duration, "contribution duration")?,
                vote_duration: to_u64(row.vote_duration, "vote duration")?,
                quorum_percent: u8::try_from(row.quorum_percent).map_err(|_| {
                    NodeError::Corrupt(format!("quorum percent {}", row.quorum_percent))
                })?,
            },
            created_at: to_u64(row.created_at, "genesis timestamp")?,
        })
    })
    .transpose()
}

pub async fn save_genesis(pool: &SqlitePool, genesis: &Genesis) -> Result<()> {
    sqlx::query(
        "INSERT INTO genesis
             (id, admin, contribution_duration, vote_duration, quorum_percent, created_at)
         VALUES (1, ?1, ?2, ?3, ?4, ?5)",
    )
    .bind(genesis.admin.to_string())
    .bind(to_i64(genesis.config.contribution_duration, "contribution duration")?)
    .bind(to_i64(genesis.config.vote_duration, "vote duration")?)
    .bind(i64::from(genesis.config.quorum_percent))
    .bind(to_i64(genesis.created_at, "genesis timestamp")?)
    .execute(pool)
    .await?;
    Ok(())
}

// ─────────────────────────────────────────────────────────
// Journal
// ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, sqlx::FromRow)]
struct OperationRow {
    sequence: i64,
    sender: String,
    timestamp: i64,
    value: String,
    payload: String,
}

/// A journaled operation, decoded back into engine types.
#[derive(Debug, Clone)]
pub struct JournalEntry {
    pub sequence: i64,
    pub context: Context,
    pub operation: Operation,
}

/// Persist an applied operation together with its events and payouts in
/// one transaction. Returns the operation's journal sequence number.
pub async fn append_operation(
    pool: &SqlitePool,
    ctx: &Context,
    operation: &Operation,
    receipt: &Receipt,
) -> Result<i64> {
    let timestamp = to_i64(ctx.now, "timestamp")?;
    let payload = serde_json::to_string(operation)?;

    let mut tx = pool.begin().await?;

    let sequence = sqlx::query(
        "INSERT INTO operations (sender, timestamp, value, kind, payload)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )
    .bind(ctx.sender.to_string())
    .bind(timestamp)
    .bind(ctx.value.to_string())
    .bind(operation.name())
    .bind(&payload)
    .execute(&mut *tx)
    .await?
    .last_insert_rowid();

    for event in &receipt.events {
        let proposal_id = event
            .proposal_id()
            .map(|id| to_i64(id, "proposal id"))
            .transpose()?;
        sqlx::query(
            "INSERT INTO events (sequence, topic, proposal_id, actor, amount, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(sequence)
        .bind(event.topic())
        .bind(proposal_id)
        .bind(event.actor().to_string())
        .bind(event.amount().to_string())
        .bind(timestamp)
        .execute(&mut *tx)
        .await?;
    }

    for payout in &receipt.payouts {
        sqlx::query("INSERT INTO payouts (sequence, recipient, amount) VALUES (?1, ?2, ?3)")
            .bind(sequence)
            .bind(payout.recipient.to_string())
            .bind(payout.amount.to_string())
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    Ok(sequence)
}

/// Load the whole journal in apply order.
pub async fn load_journal(pool: &SqlitePool) -> Result<Vec<JournalEntry>> {
    let rows: Vec<OperationRow> = sqlx::query_as(
        "SELECT sequence, sender, timestamp, value, payload
         FROM operations ORDER BY sequence ASC",
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|row| -> Result<JournalEntry> {
            let corrupt = |what: &str| NodeError::Corrupt(format!("operation {}: {what}", row.sequence));
            let sender: Address = row.sender.parse().map_err(|_| corrupt("sender"))?;
            let value: u128 = row.value.parse().map_err(|_| corrupt("value"))?;
            let now = to_u64(row.timestamp, "timestamp")?;
            Ok(JournalEntry {
                sequence: row.sequence,
                context: Context { sender, now, value },
                operation: serde_json::from_str(&row.payload)?,
            })
        })
        .collect()
}

// ─────────────────────────────────────────────────────────
// Payout outbox
// ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, sqlx::FromRow)]
struct PayoutRow {
    id: i64,
    sequence: i64,
    recipient: String,
    amount: String,
}

/// An outbox row still owed to its recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingPayout {
    pub id: i64,
    pub sequence: i64,
    pub payout: Payout,
}

/// Unsettled payouts for one operation, or for all operations.
pub async fn pending_payouts(pool: &SqlitePool, sequence: Option<i64>) -> Result<Vec<PendingPayout>> {
    let rows: Vec<PayoutRow> = sqlx::query_as(
        "SELECT id, sequence, recipient, amount FROM payouts
         WHERE settled_at IS NULL AND (?1 IS NULL OR sequence = ?1)
         ORDER BY id ASC",
    )
    .bind(sequence)
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|row| -> Result<PendingPayout> {
            let corrupt = || NodeError::Corrupt(format!("payout {}", row.id));
            Ok(PendingPayout {
                id: row.id,
                sequence: row.sequence,
                payout: Payout {
                    recipient: row.recipient.parse().map_err(|_| corrupt())?,
                    amount: row.amount.parse().map_err(|_| corrupt())?,
                },
            })
        })
        .collect()
}

pub async fn mark_settled(pool: &SqlitePool, payout_id: i64, settled_at: i64) -> Result<()> {
    sqlx::query("UPDATE payouts SET settled_at = ?1 WHERE id = ?2 AND settled_at IS NULL")
        .bind(settled_at)
        .bind(payout_id)
        .execute(pool)
        .await?;
    Ok(())
}

// ─────────────────────────────────────────────────────────
// Event reads
// ─────────────────────────────────────────────────────────

/// An event row as exposed by the API.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct EventRecord {
    pub id: i64,
    pub sequence: i64,
    pub topic: String,
    pub proposal_id: Option<i64>,
    pub actor: String,
    pub amount: String,
    pub timestamp: i64,
}

/// Fetch all events, in journal order.
pub async fn get_all_events(pool: &SqlitePool) -> Result<Vec<EventRecord>> {
    let rows = sqlx::query_as::<_, EventRecord>(
        r#"
        SELECT id, sequence, topic, proposal_id, actor, amount, timestamp
        FROM   events
        ORDER  BY sequence ASC, id ASC
        "#,
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Fetch all events for a given proposal, in journal order.
pub async fn get_events_for_proposal(pool: &SqlitePool, proposal_id: i64) -> Result<Vec<EventRecord>> {
    let rows = sqlx::query_as::<_, EventRecord>(
        r#"
        SELECT id, sequence, topic, proposal_id, actor, amount, timestamp
        FROM   events
        WHERE  proposal_id = ?1
        ORDER  BY sequence ASC, id ASC
        "#,
    )
    .bind(proposal_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
