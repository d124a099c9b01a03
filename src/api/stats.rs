use crate::api::AppState;
use crate::error::{GatewayError, Result};
use crate::query::QueryTemplate;
use crate::shape::{shape, NetworkStats, Record};
use crate::snapshot::{EntityKey, LedgerSequence, SnapshotResolver, TableSet};
use axum::{extract::State, http::HeaderMap, response::IntoResponse, Json};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

#[derive(Serialize)]
pub struct StatsResponse {
    pub stats: NetworkStats,
    pub ledger_sequence: Option<LedgerSequence>,
    pub window_ledgers: i64,
    pub execution_time_ms: u64,
}

/// Counters over the `window_ledgers` ledgers ending at the latest one.
pub async fn network_stats(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse> {
    let start_time = Instant::now();
    let window = state.config.stats_window_ledgers;

    let dispatcher = state.dispatcher(&headers).await?;
    let tables = dispatcher.tables();

    let (stats, ledger_sequence) = match SnapshotResolver::new(&dispatcher)
        .resolve(&tables.ledgers, EntityKey::Table)
        .await
    {
        Ok(snapshot) => {
            let template = window_query(tables, snapshot.ledger_sequence, window);
            let outcome = dispatcher.run(&template, Some(&snapshot)).await?;
            let stats = shape::<NetworkStats>(&outcome.rows)?
                .into_iter()
                .next()
                .unwrap_or_default();
            (stats, Some(snapshot.ledger_sequence))
        }
        Err(GatewayError::NotFound { .. }) => (NetworkStats::default(), None),
        Err(e) => return Err(e),
    };

    Ok(Json(StatsResponse {
        stats,
        ledger_sequence,
        window_ledgers: window,
        execution_time_ms: start_time.elapsed().as_millis() as u64,
    }))
}

fn window_query(tables: &TableSet, latest: LedgerSequence, window: i64) -> QueryTemplate {
    QueryTemplate::new(
        "network_stats",
        format!(
            "SELECT COUNT(*) AS ledger_count, \
             MIN(sequence) AS first_ledger, \
             MAX(sequence) AS last_ledger, \
             CAST(COALESCE(SUM(transaction_count), 0) AS BIGINT) AS total_transactions, \
             CAST(COALESCE(SUM(successful_tx_count), 0) AS BIGINT) AS successful_transactions, \
             CAST(COALESCE(SUM(failed_tx_count), 0) AS BIGINT) AS failed_transactions, \
             AVG(transaction_count) AS avg_tx_per_ledger \
             FROM {} WHERE sequence > ? AND sequence <= ?",
            tables.ledgers.qualified_name()
        ),
        NetworkStats::COLUMNS,
    )
    .bind_i64(latest.0.saturating_sub(window))
    .bind_pinned_sequence()
}
