use crate::api::params::{validate_asset_code, validate_issuer, validate_limit};
use crate::api::AppState;
use crate::error::{GatewayError, Result};
use crate::query::QueryTemplate;
use crate::shape::{shape, Amount, HolderRecord, Record};
use crate::snapshot::{EntityKey, LedgerSequence, SnapshotResolver, TableSet};
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
    20
}

#[derive(Debug, Deserialize)]
pub struct HoldersQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub min_balance: f64,
    pub issuer: Option<String>,
}

#[derive(Serialize)]
pub struct HoldersResponse {
    pub asset_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_issuer: Option<String>,
    pub ledger_sequence: Option<LedgerSequence>,
    pub holders: Vec<HolderRecord>,
    pub count: usize,
    pub execution_time_ms: u64,
}

/// Largest holders of an asset in the latest trustline snapshot.
///
/// A lake with no trustline history answers with an empty list rather than
/// 404: the asset is not missing, there is just nothing recorded yet.
pub async fn asset_holders(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(asset_code): Path<String>,
    Query(query): Query<HoldersQuery>,
) -> Result<impl IntoResponse> {
    let start_time = Instant::now();
    validate_asset_code(&asset_code)?;
    let limit = validate_limit(query.limit)?;
    if let Some(issuer) = &query.issuer {
        validate_issuer(issuer)?;
    }
    let min_balance = min_balance_threshold(query.min_balance)?;

    let dispatcher = state.dispatcher(&headers).await?;
    let tables = dispatcher.tables();

    let snapshot = match SnapshotResolver::new(&dispatcher)
        .resolve(&tables.trustlines, EntityKey::Table)
        .await
    {
        Ok(snapshot) => snapshot,
        Err(GatewayError::NotFound { .. }) => {
            debug!("No trustline snapshots recorded; {} has no holders", asset_code);
            return Ok(Json(HoldersResponse {
                asset_code,
                asset_issuer: query.issuer,
                ledger_sequence: None,
                holders: Vec::new(),
                count: 0,
                execution_time_ms: start_time.elapsed().as_millis() as u64,
            }));
        }
        Err(e) => return Err(e),
    };

    let holders: Vec<HolderRecord> = match min_balance {
        Some(min_balance) => {
            let template = holders_query(tables, &asset_code, query.issuer.as_deref(), min_balance, limit);
            let outcome = dispatcher.run(&template, Some(&snapshot)).await?;
            shape(&outcome.rows)?
        }
        None => Vec::new(),
    };

    Ok(Json(HoldersResponse {
        asset_code,
        asset_issuer: query.issuer,
        ledger_sequence: Some(snapshot.ledger_sequence),
        count: holders.len(),
        holders,
        execution_time_ms: start_time.elapsed().as_millis() as u64,
    }))
}

/// Stroop threshold for `min_balance`. `None` means the value is above any
/// balance a trustline can hold, so nothing qualifies.
fn min_balance_threshold(min_balance: f64) -> Result<Option<Amount>> {
    if !min_balance.is_finite() || min_balance < 0.0 {
        return Err(GatewayError::InvalidRequest {
            message: format!("min_balance must be a non-negative number, got {}", min_balance),
        });
    }
    Ok(Amount::from_decimal(min_balance))
}

fn holders_query(
    tables: &TableSet,
    asset_code: &str,
    issuer: Option<&str>,
    min_balance: Amount,
    limit: i64,
) -> QueryTemplate {
    let issuer_filter = if issuer.is_some() { " AND asset_issuer = ?" } else { "" };

    let template = QueryTemplate::new(
        "asset_holders",
        format!(
            "SELECT account_id, asset_code, asset_issuer, CAST(balance AS BIGINT) AS balance, authorized \
             FROM {} \
             WHERE asset_code = ? AND ledger_sequence = ? AND CAST(balance AS BIGINT) > ?{} \
             ORDER BY CAST(balance AS BIGINT) DESC, account_id \
             LIMIT ?",
            tables.trustlines.qualified_name(),
            issuer_filter
        ),
        HolderRecord::COLUMNS,
    )
    .bind_text(asset_code)
    .bind_pinned_sequence()
    .bind_i64(min_balance.stroops());

    match issuer {
        Some(issuer) => template.bind_text(issuer).bind_i64(limit),
        None => template.bind_i64(limit),
    }
}
