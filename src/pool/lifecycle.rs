use crate::config::Redactor;
use crate::error::{GatewayError, Result};
use crate::pool::binder::CatalogBinder;
use crate::pool::manager::{EngineHandle, PoolStatus};
use crate::snapshot::TableSet;
use chrono::{DateTime, Utc};
use duckdb::Connection;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Uninitialized,
    Initializing,
    Ready,
    Failed,
}

#[derive(Clone)]
struct Lifecycle {
    state: ConnectionState,
    since: DateTime<Utc>,
    handle: Option<EngineHandle>,
    failure: Option<GatewayError>,
}

impl Lifecycle {
    fn uninitialized() -> Self {
        Self::at(ConnectionState::Uninitialized)
    }

    fn at(state: ConnectionState) -> Self {
        Self {
            state,
            since: Utc::now(),
            handle: None,
            failure: None,
        }
    }

    fn ready(handle: EngineHandle) -> Self {
        Self {
            handle: Some(handle),
            ..Self::at(ConnectionState::Ready)
        }
    }

    fn failed(failure: GatewayError) -> Self {
        Self {
            failure: Some(failure),
            ..Self::at(ConnectionState::Failed)
        }
    }

    fn is_settled(&self) -> bool {
        matches!(self.state, ConnectionState::Ready | ConnectionState::Failed)
    }

    fn outcome(&self) -> Option<Result<EngineHandle>> {
        match (&self.handle, &self.failure) {
            (Some(handle), _) => Some(Ok(handle.clone())),
            (None, Some(failure)) => Some(Err(failure.clone())),
            (None, None) => None,
        }
    }
}

/// Point-in-time view of the lifecycle for health reporting.
#[derive(Debug, Clone, Serialize)]
pub struct HealthSnapshot {
    pub state: ConnectionState,
    pub since: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pool: Option<PoolStatus>,
}

/// Owns the process-wide engine and its state machine:
///
/// ```text
/// Uninitialized --acquire--> Initializing --ok--> Ready
///                                         --err-> Failed
/// ```
///
/// Exactly one `acquire` wins the compare-and-swap out of `Uninitialized`
/// and starts the attach on a detached task; every other caller waits on
/// the watch channel for the outcome. `Ready` and `Failed` are terminal.
pub struct LifecycleManager {
    binder: Arc<dyn CatalogBinder>,
    pool_size: usize,
    lifecycle: Arc<watch::Sender<Lifecycle>>,
}

impl LifecycleManager {
    pub fn new(binder: Arc<dyn CatalogBinder>, pool_size: usize) -> Self {
        let (lifecycle, _) = watch::channel(Lifecycle::uninitialized());
        Self {
            binder,
            pool_size,
            lifecycle: Arc::new(lifecycle),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.lifecycle.borrow().state
    }

    pub fn health(&self) -> HealthSnapshot {
        let lifecycle = self.lifecycle.borrow();
        HealthSnapshot {
            state: lifecycle.state,
            since: lifecycle.since,
            error: lifecycle.failure.as_ref().map(|e| e.to_string()),
            pool: lifecycle.handle.as_ref().map(EngineHandle::status),
        }
    }

    /// Returns the ready engine, initializing it on first use.
    pub async fn acquire(&self) -> Result<EngineHandle> {
        let settled = self.lifecycle.borrow().outcome();
        if let Some(outcome) = settled {
            return outcome;
        }

        let claimed = self.lifecycle.send_if_modified(|lifecycle| {
            if lifecycle.state == ConnectionState::Uninitialized {
                *lifecycle = Lifecycle::at(ConnectionState::Initializing);
                true
            } else {
                false
            }
        });

        if claimed {
            self.spawn_initialization();
        }

        let mut receiver = self.lifecycle.subscribe();
        let settled = receiver
            .wait_for(Lifecycle::is_settled)
            .await
            .map_err(|_| GatewayError::Internal("engine lifecycle channel closed".to_string()))?;

        settled
            .outcome()
            .unwrap_or_else(|| Err(GatewayError::Internal("engine settled without outcome".to_string())))
    }

    fn spawn_initialization(&self) {
        let binder = self.binder.clone();
        let lifecycle = self.lifecycle.clone();
        let pool_size = self.pool_size;

        info!("Initializing DuckLake connection; first attach can take several minutes");

        tokio::spawn(async move {
            let started = Instant::now();
            let result = tokio::task::spawn_blocking(move || open_engine(binder.as_ref(), pool_size))
                .await
                .unwrap_or_else(|e| {
                    Err(GatewayError::Initialization {
                        step: "engine task".to_string(),
                        cause: e.to_string(),
                    })
                });

            match result {
                Ok(handle) => {
                    info!("DuckLake connection ready after {:?}", started.elapsed());
                    lifecycle.send_modify(|state| *state = Lifecycle::ready(handle));
                }
                Err(err) => {
                    error!("DuckLake connection failed after {:?}: {}", started.elapsed(), err);
                    lifecycle.send_modify(|state| *state = Lifecycle::failed(err));
                }
            }
        });
    }
}

fn open_engine(binder: &dyn CatalogBinder, pool_size: usize) -> Result<EngineHandle> {
    let root = binder.bind()?;
    let tables = binder.tables().clone();
    let redactor = binder.redactor();

    let latest = warm_up(&root, &tables, &redactor)?;
    match latest {
        Some(sequence) => info!("Warm-up probe reached ledger {}", sequence),
        None => info!("Warm-up probe succeeded; ledgers table is empty"),
    }

    EngineHandle::new(root, tables, redactor, pool_size)
}

/// Cheap read against the ledgers table to prove the catalog and storage
/// path are reachable.
fn warm_up(conn: &Connection, tables: &TableSet, redactor: &Redactor) -> Result<Option<i64>> {
    let sql = format!(
        "SELECT MAX({}) FROM {}",
        tables.ledgers.sequence_column(),
        tables.ledgers.qualified_name()
    );

    conn.query_row(&sql, [], |row| row.get::<_, Option<i64>>(0))
        .map_err(|e| GatewayError::Initialization {
            step: "warm-up probe".to_string(),
            cause: redactor.redact(&e.to_string()),
        })
}
