use crate::api::params::{validate_account_id, validate_asset_code, validate_issuer};
use crate::api::AppState;
use crate::error::{GatewayError, Result};
use crate::query::QueryTemplate;
use crate::shape::{shape, BalanceRecord, Record};
use crate::snapshot::{EntityKey, LedgerSequence, SnapshotResolver, TableSet};
use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

#[derive(Serialize)]
pub struct BalancesResponse {
    pub account_id: String,
    pub ledger_sequence: LedgerSequence,
    pub balances: Vec<BalanceRecord>,
    pub count: usize,
    pub execution_time_ms: u64,
}

#[derive(Serialize)]
pub struct TrustlineResponse {
    pub account_id: String,
    pub ledger_sequence: LedgerSequence,
    pub balance: BalanceRecord,
    pub execution_time_ms: u64,
}

/// Native balance first, then non-zero trustlines ordered by asset.
///
/// The account's latest native snapshot defines "current" and both queries
/// are pinned to that one sequence, so every row in the answer carries the
/// same `ledger_sequence`.
pub async fn account_balances(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(account_id): Path<String>,
) -> Result<impl IntoResponse> {
    let start_time = Instant::now();
    validate_account_id(&account_id)?;

    let dispatcher = state.dispatcher(&headers).await?;
    let tables = dispatcher.tables();
    let snapshot = SnapshotResolver::new(&dispatcher)
        .resolve(&tables.native_balances, EntityKey::account(account_id.as_str()))
        .await?;

    let native = dispatcher
        .run(&native_balance_query(tables, &account_id), Some(&snapshot))
        .await?;
    let trustlines = dispatcher
        .run(&trustline_balances_query(tables, &account_id), Some(&snapshot))
        .await?;

    let mut balances: Vec<BalanceRecord> = shape(&native.rows)?;
    balances.extend(shape::<BalanceRecord>(&trustlines.rows)?);

    debug!(
        "Account {} has {} balances at ledger {}",
        account_id,
        balances.len(),
        snapshot.ledger_sequence
    );

    Ok(Json(BalancesResponse {
        account_id,
        ledger_sequence: snapshot.ledger_sequence,
        count: balances.len(),
        balances,
        execution_time_ms: start_time.elapsed().as_millis() as u64,
    }))
}

/// A single trustline at its own latest snapshot. Zero balances are
/// returned here; only the account-wide listing omits them.
pub async fn trustline_balance(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((account_id, asset_code, asset_issuer)): Path<(String, String, String)>,
) -> Result<impl IntoResponse> {
    let start_time = Instant::now();
    validate_account_id(&account_id)?;
    validate_asset_code(&asset_code)?;
    validate_issuer(&asset_issuer)?;

    let dispatcher = state.dispatcher(&headers).await?;
    let tables = dispatcher.tables();
    let key = EntityKey::trustline(account_id.as_str(), asset_code.as_str(), asset_issuer.as_str());
    let snapshot = SnapshotResolver::new(&dispatcher)
        .resolve(&tables.trustlines, key.clone())
        .await?;

    let outcome = dispatcher
        .run(
            &trustline_query(tables, &account_id, &asset_code, &asset_issuer),
            Some(&snapshot),
        )
        .await?;

    let balance = shape::<BalanceRecord>(&outcome.rows)?
        .into_iter()
        .next()
        .ok_or_else(|| GatewayError::NotFound {
            resource: key.resource(),
            key: key.to_string(),
        })?;

    Ok(Json(TrustlineResponse {
        account_id,
        ledger_sequence: snapshot.ledger_sequence,
        balance,
        execution_time_ms: start_time.elapsed().as_millis() as u64,
    }))
}

fn native_balance_query(tables: &TableSet, account_id: &str) -> QueryTemplate {
    QueryTemplate::new(
        "native_balance",
        format!(
            "SELECT 'XLM' AS asset_code, 'native' AS asset_issuer, \
             balance, buying_liabilities, selling_liabilities, ledger_sequence \
             FROM {} WHERE account_id = ? AND ledger_sequence = ?",
            tables.native_balances.qualified_name()
        ),
        BalanceRecord::COLUMNS,
    )
    .bind_text(account_id)
    .bind_pinned_sequence()
}

const TRUSTLINE_COLUMNS: &str = "asset_code, asset_issuer, \
     CAST(balance AS BIGINT) AS balance, \
     CAST(buying_liabilities AS BIGINT) AS buying_liabilities, \
     CAST(selling_liabilities AS BIGINT) AS selling_liabilities, \
     ledger_sequence";

fn trustline_balances_query(tables: &TableSet, account_id: &str) -> QueryTemplate {
    QueryTemplate::new(
        "trustline_balances",
        format!(
            "SELECT {} FROM {} \
             WHERE account_id = ? AND ledger_sequence = ? AND CAST(balance AS BIGINT) > 0 \
             ORDER BY asset_code, asset_issuer",
            TRUSTLINE_COLUMNS,
            tables.trustlines.qualified_name()
        ),
        BalanceRecord::COLUMNS,
    )
    .bind_text(account_id)
    .bind_pinned_sequence()
}

fn trustline_query(tables: &TableSet, account_id: &str, asset_code: &str, asset_issuer: &str) -> QueryTemplate {
    QueryTemplate::new(
        "trustline_balance",
        format!(
            "SELECT {} FROM {} \
             WHERE account_id = ? AND asset_code = ? AND asset_issuer = ? AND ledger_sequence = ?",
            TRUSTLINE_COLUMNS,
            tables.trustlines.qualified_name()
        ),
        BalanceRecord::COLUMNS,
    )
    .bind_text(account_id)
    .bind_text(asset_code)
    .bind_text(asset_issuer)
    .bind_pinned_sequence()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixture_tables;

    #[test]
    fn test_balance_queries_are_pinned() {
        let tables = fixture_tables();

        assert!(native_balance_query(&tables, "GALICE").is_pinned());
        assert!(trustline_balances_query(&tables, "GALICE").is_pinned());
        assert!(trustline_query(&tables, "GALICE", "USDC", "GISSUER1").is_pinned());
    }

    #[test]
    fn test_listing_omits_zero_trustlines() {
        let template = trustline_balances_query(&fixture_tables(), "GALICE");
        assert!(template.sql().contains("CAST(balance AS BIGINT) > 0"));
        assert!(template.sql().ends_with("ORDER BY asset_code, asset_issuer"));
    }
}
