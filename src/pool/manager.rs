use crate::config::Redactor;
use crate::error::{GatewayError, Result};
use crate::snapshot::TableSet;
use deadpool::managed::{self, Metrics, Object, Pool, PoolError, RecycleResult};
use duckdb::Connection;
use serde::Serialize;
use std::fmt;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Hands out connections cloned from the attached root connection. Clones
/// share the database instance, so the attached catalog, loaded extensions
/// and storage secret are visible to every one of them.
pub struct EngineManager {
    root: Mutex<Connection>,
}

impl EngineManager {
    fn new(root: Connection) -> Self {
        Self {
            root: Mutex::new(root),
        }
    }
}

impl managed::Manager for EngineManager {
    type Type = Connection;
    type Error = GatewayError;

    async fn create(&self) -> Result<Connection> {
        let root = self
            .root
            .lock()
            .map_err(|_| GatewayError::Internal("engine root connection lock poisoned".to_string()))?;

        let conn = root
            .try_clone()
            .map_err(|e| GatewayError::Internal(format!("Failed to open engine connection: {}", e)))?;

        debug!("Opened pooled engine connection");
        Ok(conn)
    }

    async fn recycle(&self, _conn: &mut Connection, _metrics: &Metrics) -> RecycleResult<GatewayError> {
        Ok(())
    }
}

pub type PooledConnection = Object<EngineManager>;

#[derive(Debug, Clone, Copy, Serialize)]
pub struct PoolStatus {
    pub max_size: usize,
    pub size: usize,
    pub available: usize,
    pub waiting: usize,
}

/// Ready-to-use access to the lake: a bounded connection pool, the naming
/// of the tables behind it and the redactor for engine errors. Cheap to
/// clone.
#[derive(Clone)]
pub struct EngineHandle {
    pool: Pool<EngineManager>,
    tables: Arc<TableSet>,
    redactor: Redactor,
}

impl EngineHandle {
    pub fn new(root: Connection, tables: TableSet, redactor: Redactor, max_size: usize) -> Result<Self> {
        let pool = Pool::builder(EngineManager::new(root))
            .max_size(max_size)
            .build()
            .map_err(|e| GatewayError::Internal(format!("Failed to create engine pool: {}", e)))?;

        Ok(Self {
            pool,
            tables: Arc::new(tables),
            redactor,
        })
    }

    pub fn tables(&self) -> &TableSet {
        &self.tables
    }

    pub fn redactor(&self) -> &Redactor {
        &self.redactor
    }

    pub async fn get(&self) -> std::result::Result<PooledConnection, PoolError<GatewayError>> {
        self.pool.get().await
    }

    pub fn status(&self) -> PoolStatus {
        let status = self.pool.status();
        PoolStatus {
            max_size: status.max_size,
            size: status.size,
            available: status.available,
            waiting: status.waiting,
        }
    }
}

impl fmt::Debug for EngineHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineHandle")
            .field("tables", &self.tables)
            .field("status", &self.status())
            .finish()
    }
}
