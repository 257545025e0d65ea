//! Axum REST API handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use dao_ledger::{Address, Amount, LedgerSummary, Proposal, ProposalId, ProposalStatus, Timestamp};
use serde::Serialize;
use sqlx::SqlitePool;

use crate::db::{self, EventRecord};
use crate::errors::NodeError;
use crate::sequencer::{Committed, SequencerHandle, Submission};

#[derive(Clone)]
pub struct ApiState {
    pub pool: SqlitePool,
    pub sequencer: SequencerHandle,
}

// ─────────────────────────────────────────────────────────
// Response shapes
// ─────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Serialize)]
pub struct LedgerResponse {
    #[serde(flatten)]
    pub summary: LedgerSummary,
    pub clock: Timestamp,
}

#[derive(Serialize)]
pub struct InvestorResponse {
    pub address: Address,
    pub shares: Amount,
    pub is_investor: bool,
}

#[derive(Serialize)]
pub struct ProposalResponse {
    #[serde(flatten)]
    pub proposal: Proposal,
    pub status: ProposalStatus,
}

#[derive(Serialize)]
pub struct ProposalsResponse {
    pub count: usize,
    pub proposals: Vec<ProposalResponse>,
}

#[derive(Serialize)]
pub struct VoteResponse {
    pub proposal_id: ProposalId,
    pub address: Address,
    pub voted: bool,
}

#[derive(Serialize)]
pub struct EventsResponse {
    pub count: usize,
    pub events: Vec<EventRecord>,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<u32>,
}

// ─────────────────────────────────────────────────────────
// Error mapping
// ─────────────────────────────────────────────────────────

/// HTTP status for a ledger rejection.
pub fn status_for(err: &dao_ledger::Error) -> StatusCode {
    use dao_ledger::Error::*;
    match err {
        NotAdmin | NotInvestor => StatusCode::FORBIDDEN,
        ProposalNotFound => StatusCode::NOT_FOUND,
        InvalidAddress | UnexpectedValue | InvalidQuorum => StatusCode::BAD_REQUEST,
        ArithmeticOverflow => StatusCode::UNPROCESSABLE_ENTITY,
        _ => StatusCode::CONFLICT,
    }
}

impl IntoResponse for NodeError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            NodeError::Ledger(e) => (status_for(e), Some(e.code())),
            NodeError::Unavailable => (StatusCode::SERVICE_UNAVAILABLE, None),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, None),
        };
        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
                code,
            }),
        )
            .into_response()
    }
}

fn not_found(what: String) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: what,
            code: None,
        }),
    )
        .into_response()
}

fn parse_address(raw: &str) -> Result<Address, NodeError> {
    raw.parse().map_err(NodeError::Ledger)
}

// ─────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────

/// `GET /health`
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// `GET /ledger`
pub async fn get_ledger(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    Json(
        state
            .sequencer
            .read(|ledger| LedgerResponse {
                summary: ledger.summary(),
                clock: ledger.clock(),
            })
            .await,
    )
}

/// `GET /investors/:address`
pub async fn get_investor(
    State(state): State<Arc<ApiState>>,
    Path(address): Path<String>,
) -> Result<Json<InvestorResponse>, NodeError> {
    let address = parse_address(&address)?;
    let response = state
        .sequencer
        .read(|ledger| InvestorResponse {
            address,
            shares: ledger.shares(&address),
            is_investor: ledger.is_investor(&address),
        })
        .await;
    Ok(Json(response))
}

/// `GET /proposals`
///
/// Statuses are evaluated at the time a submission arriving now would get.
pub async fn get_proposals(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    let proposals = state
        .sequencer
        .read_at(|ledger, now| {
            ledger
                .proposals()
                .iter()
                .filter_map(|p| {
                    ledger
                        .proposal_status(p.id, now)
                        .map(|status| ProposalResponse {
                            proposal: p.clone(),
                            status,
                        })
                })
                .collect::<Vec<_>>()
        })
        .await;
    Json(ProposalsResponse {
        count: proposals.len(),
        proposals,
    })
}

/// `GET /proposals/:id`
pub async fn get_proposal(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<ProposalId>,
) -> Response {
    let found = state
        .sequencer
        .read_at(|ledger, now| {
            let proposal = ledger.proposal(id)?.clone();
            let status = ledger.proposal_status(id, now)?;
            Some(ProposalResponse { proposal, status })
        })
        .await;
    match found {
        Some(proposal) => Json(proposal).into_response(),
        None => not_found(format!("proposal {id} does not exist")),
    }
}

/// `GET /proposals/:id/votes/:address`
pub async fn get_vote(
    State(state): State<Arc<ApiState>>,
    Path((id, address)): Path<(ProposalId, String)>,
) -> Result<Json<VoteResponse>, NodeError> {
    let address = parse_address(&address)?;
    let voted = state
        .sequencer
        .read(|ledger| ledger.voted(&address, id))
        .await;
    Ok(Json(VoteResponse {
        proposal_id: id,
        address,
        voted,
    }))
}

/// `GET /proposals/:id/events`
pub async fn get_proposal_events(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<i64>,
) -> Result<Json<EventsResponse>, NodeError> {
    let events = db::get_events_for_proposal(&state.pool, id).await?;
    Ok(Json(EventsResponse {
        count: events.len(),
        events,
    }))
}

/// `GET /events`
///
/// Returns all journaled events in apply order.
pub async fn get_all_events(
    State(state): State<Arc<ApiState>>,
) -> Result<Json<EventsResponse>, NodeError> {
    let events = db::get_all_events(&state.pool).await?;
    Ok(Json(EventsResponse {
        count: events.len(),
        events,
    }))
}

/// `POST /operations`
///
/// Queues one operation. The response is sent once it has been applied and
/// journaled, or rejected.
pub async fn submit_operation(
    State(state): State<Arc<ApiState>>,
    Json(submission): Json<Submission>,
) -> Result<Json<Committed>, NodeError> {
    let committed = state.sequencer.submit(submission).await?;
    Ok(Json(committed))
}
