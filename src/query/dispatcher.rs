use crate::error::{GatewayError, Result};
use crate::pool::EngineHandle;
use crate::query::QueryTemplate;
use crate::snapshot::{ResolvedSnapshot, TableSet};
use deadpool::managed::PoolError;
use duckdb::types::Value;
use duckdb::{params_from_iter, Connection};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Raw positional rows in query order.
#[derive(Debug)]
pub struct QueryOutcome {
    pub rows: Vec<Vec<Value>>,
}

/// Runs the queries of one request against the engine.
///
/// Every query shares the request deadline: waiting for a pooled
/// connection and executing both count against it, and a query still
/// running at the deadline is interrupted.
pub struct QueryDispatcher {
    handle: EngineHandle,
    deadline: Instant,
    budget: Duration,
}

impl QueryDispatcher {
    pub fn new(handle: EngineHandle, budget: Duration) -> Self {
        Self::with_deadline(handle, Instant::now() + budget, budget)
    }

    /// For a request whose deadline started before the engine was acquired.
    pub fn with_deadline(handle: EngineHandle, deadline: Instant, budget: Duration) -> Self {
        Self {
            handle,
            deadline,
            budget,
        }
    }

    pub fn tables(&self) -> &TableSet {
        self.handle.tables()
    }

    fn remaining(&self) -> Option<Duration> {
        self.deadline
            .checked_duration_since(Instant::now())
            .filter(|left| !left.is_zero())
    }

    fn timeout(&self, label: &str) -> GatewayError {
        GatewayError::QueryTimeout {
            query: label.to_string(),
            timeout_ms: self.budget.as_millis() as u64,
        }
    }

    pub async fn run(
        &self,
        template: &QueryTemplate,
        pinned: Option<&ResolvedSnapshot>,
    ) -> Result<QueryOutcome> {
        let label = template.label();
        let params = template.materialize(pinned.map(|snapshot| snapshot.ledger_sequence))?;
        let started = Instant::now();

        let remaining = self.remaining().ok_or_else(|| self.timeout(label))?;
        let conn = tokio::time::timeout(remaining, self.handle.get())
            .await
            .map_err(|_| self.timeout(label))?
            .map_err(|e| match e {
                PoolError::Backend(err) => err,
                other => GatewayError::EngineBusy {
                    query: label.to_string(),
                    cause: self.handle.redactor().redact(&other.to_string()),
                },
            })?;

        let interrupt = conn.interrupt_handle();
        let sql = template.sql().to_string();
        let width = template.columns().len();
        let task = tokio::task::spawn_blocking(move || execute(&conn, &sql, params, width));

        let remaining = self.remaining().ok_or_else(|| self.timeout(label))?;
        let rows = match tokio::time::timeout(remaining, task).await {
            Ok(joined) => joined?.map_err(|e| GatewayError::QueryFailed {
                query: label.to_string(),
                cause: self.handle.redactor().redact(&e.to_string()),
            })?,
            Err(_) => {
                interrupt.interrupt();
                warn!("Query {} interrupted after {:?}", label, started.elapsed());
                return Err(self.timeout(label));
            }
        };

        let elapsed = started.elapsed();
        debug!(
            "Query {} returned {} rows in {}ms{}",
            label,
            rows.len(),
            elapsed.as_millis(),
            pinned
                .map(|s| format!(" (pinned to ledger {})", s.ledger_sequence))
                .unwrap_or_default()
        );

        Ok(QueryOutcome { rows })
    }
}

fn execute(conn: &Connection, sql: &str, params: Vec<Value>, width: usize) -> duckdb::Result<Vec<Vec<Value>>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(params_from_iter(params))?;

    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        let mut values = Vec::with_capacity(width);
        for idx in 0..width {
            values.push(row.get::<_, Value>(idx)?);
        }
        out.push(values);
    }

    Ok(out)
}
