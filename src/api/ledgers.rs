use crate::api::params::validate_limit;
use crate::api::AppState;
use crate::error::{GatewayError, Result};
use crate::query::QueryTemplate;
use crate::shape::{shape, LedgerDetail, LedgerSummary, Record};
use crate::snapshot::TableSet;
use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

fn default_limit() -> i64 {
    10
}

#[derive(Debug, Deserialize)]
pub struct LedgersQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub sequence_min: i64,
}

#[derive(Serialize)]
pub struct LedgersResponse {
    pub data: Vec<LedgerSummary>,
    pub count: usize,
    pub execution_time_ms: u64,
}

#[derive(Serialize)]
pub struct LedgerResponse {
    pub data: LedgerDetail,
    pub execution_time_ms: u64,
}

/// Most recent ledgers above `sequence_min` (exclusive), newest first.
/// Ledgers are immutable, so no snapshot is pinned.
pub async fn list_ledgers(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<LedgersQuery>,
) -> Result<impl IntoResponse> {
    let start_time = Instant::now();
    let limit = validate_limit(query.limit)?;

    let dispatcher = state.dispatcher(&headers).await?;
    let outcome = dispatcher
        .run(&recent_ledgers_query(dispatcher.tables(), query.sequence_min, limit), None)
        .await?;
    let data: Vec<LedgerSummary> = shape(&outcome.rows)?;

    debug!("Listed {} ledgers above {}", data.len(), query.sequence_min);

    Ok(Json(LedgersResponse {
        count: data.len(),
        data,
        execution_time_ms: start_time.elapsed().as_millis() as u64,
    }))
}

pub async fn get_ledger(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(sequence): Path<i64>,
) -> Result<impl IntoResponse> {
    let start_time = Instant::now();

    let dispatcher = state.dispatcher(&headers).await?;
    let outcome = dispatcher
        .run(&ledger_detail_query(dispatcher.tables(), sequence), None)
        .await?;

    let data = shape::<LedgerDetail>(&outcome.rows)?
        .into_iter()
        .next()
        .ok_or_else(|| GatewayError::NotFound {
            resource: "Ledger",
            key: sequence.to_string(),
        })?;

    Ok(Json(LedgerResponse {
        data,
        execution_time_ms: start_time.elapsed().as_millis() as u64,
    }))
}

fn recent_ledgers_query(tables: &TableSet, sequence_min: i64, limit: i64) -> QueryTemplate {
    QueryTemplate::new(
        "recent_ledgers",
        format!(
            "SELECT {} FROM {} WHERE sequence > ? ORDER BY sequence DESC LIMIT ?",
            LedgerSummary::COLUMNS.join(", "),
            tables.ledgers.qualified_name()
        ),
        LedgerSummary::COLUMNS,
    )
    .bind_i64(sequence_min)
    .bind_i64(limit)
}

fn ledger_detail_query(tables: &TableSet, sequence: i64) -> QueryTemplate {
    QueryTemplate::new(
        "ledger_detail",
        format!(
            "SELECT {} FROM {} WHERE sequence = ?",
            LedgerDetail::COLUMNS.join(", "),
            tables.ledgers.qualified_name()
        ),
        LedgerDetail::COLUMNS,
    )
    .bind_i64(sequence)
}
