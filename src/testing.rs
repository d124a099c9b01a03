//! In-memory lake fixtures shared by unit tests.

use crate::config::Redactor;
use crate::error::{GatewayError, Result};
use crate::pool::{CatalogBinder, EngineHandle, LifecycleManager};
use crate::snapshot::TableSet;
use duckdb::Connection;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Ledgers 949999..=950003; GALICE with native history at 90 and 100 and a
/// trustline appended later at 101; GBOB with liabilities; USDC holders at
/// trustline sequence 130.
const FIXTURE_SQL: &str = "
ATTACH ':memory:' AS catalog;
CREATE SCHEMA catalog.testnet;

CREATE TABLE catalog.testnet.ledgers_row_v2 (
    sequence BIGINT NOT NULL,
    ledger_hash VARCHAR NOT NULL,
    previous_ledger_hash VARCHAR NOT NULL,
    closed_at TIMESTAMP NOT NULL,
    protocol_version INT NOT NULL,
    total_coins BIGINT NOT NULL,
    base_fee INT NOT NULL,
    base_reserve INT NOT NULL,
    successful_tx_count INT NOT NULL,
    failed_tx_count INT NOT NULL,
    transaction_count INT,
    operation_count INT
);
INSERT INTO catalog.testnet.ledgers_row_v2 VALUES
    (949999, 'h949999', 'h949998', TIMESTAMP '2025-01-01 00:00:00', 22, 1000000000000000000, 100, 5000000, 10, 1, 11, 40),
    (950000, 'h950000', 'h949999', TIMESTAMP '2025-01-01 00:00:05', 22, 1000000000000000000, 100, 5000000, 20, 2, 22, 80),
    (950001, 'h950001', 'h950000', TIMESTAMP '2025-01-01 00:00:10', 22, 1000000000000000000, 100, 5000000, 30, 0, 30, 90),
    (950002, 'h950002', 'h950001', TIMESTAMP '2025-01-01 00:00:15', 22, 1000000000000000000, 100, 5000000, 5, 5, 10, 12),
    (950003, 'h950003', 'h950002', TIMESTAMP '2025-01-01 00:00:20', 23, 1000000000000000000, 100, 5000000, 7, 0, 7, NULL);

CREATE TABLE catalog.testnet.native_balances_snapshot_v1 (
    account_id VARCHAR NOT NULL,
    balance BIGINT NOT NULL,
    buying_liabilities BIGINT NOT NULL,
    selling_liabilities BIGINT NOT NULL,
    num_subentries INT NOT NULL,
    last_modified_ledger BIGINT NOT NULL,
    ledger_sequence BIGINT NOT NULL
);
INSERT INTO catalog.testnet.native_balances_snapshot_v1 VALUES
    ('GALICE', 90000000000, 0, 0, 0, 90, 90),
    ('GALICE', 100000000000, 0, 0, 1, 100, 100),
    ('GBOB', 123456789012345, 1000000, 2500000, 3, 120, 120);

CREATE TABLE catalog.testnet.trustlines_snapshot_v1 (
    account_id VARCHAR NOT NULL,
    asset_code VARCHAR NOT NULL,
    asset_issuer VARCHAR NOT NULL,
    asset_type VARCHAR NOT NULL,
    balance VARCHAR NOT NULL,
    trust_limit VARCHAR NOT NULL,
    buying_liabilities VARCHAR NOT NULL,
    selling_liabilities VARCHAR NOT NULL,
    authorized BOOLEAN NOT NULL,
    ledger_sequence BIGINT NOT NULL
);
INSERT INTO catalog.testnet.trustlines_snapshot_v1 VALUES
    ('GALICE', 'USDC', 'GISSUER1', 'credit_alphanum4', '1', '9000000000', '0', '0', true, 90),
    ('GALICE', 'USDC', 'GISSUER1', 'credit_alphanum4', '250000000', '9000000000', '0', '50000000', true, 100),
    ('GALICE', 'EURC', 'GISSUER2', 'credit_alphanum4', '0', '9000000000', '0', '0', true, 100),
    ('GALICE', 'EURC', 'GISSUER2', 'credit_alphanum4', '990000000', '9000000000', '0', '0', true, 101),
    ('GBOB', 'USDC', 'GISSUER1', 'credit_alphanum4', '900000000', '9000000000', '0', '0', true, 130),
    ('GCAROL', 'USDC', 'GISSUER1', 'credit_alphanum4', '50000000', '9000000000', '0', '0', false, 130),
    ('GDAVE', 'USDC', 'GISSUER9', 'credit_alphanum4', '70000000', '9000000000', '0', '0', true, 130),
    ('GERIN', 'USDC', 'GISSUER1', 'credit_alphanum4', '0', '9000000000', '0', '0', true, 130);
";

/// Credential the fixture binder asks to have scrubbed from engine errors.
pub const FIXTURE_SECRET: &str = "fixture-storage-secret";

pub fn fixture_tables() -> TableSet {
    TableSet::new(
        "catalog",
        "testnet",
        "ledgers_row_v2",
        "native_balances_snapshot_v1",
        "trustlines_snapshot_v1",
    )
}

enum Catalog {
    Seeded,
    Unreachable,
}

/// Test binder that counts how often it is asked to bind.
pub struct FixtureBinder {
    catalog: Catalog,
    tables: TableSet,
    delay: Duration,
    binds: AtomicUsize,
}

impl FixtureBinder {
    pub fn seeded() -> Self {
        Self {
            catalog: Catalog::Seeded,
            tables: fixture_tables(),
            delay: Duration::ZERO,
            binds: AtomicUsize::new(0),
        }
    }

    /// Attaches a catalog file that does not exist.
    pub fn unreachable_catalog() -> Self {
        Self {
            catalog: Catalog::Unreachable,
            ..Self::seeded()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn binds(&self) -> usize {
        self.binds.load(Ordering::SeqCst)
    }
}

impl CatalogBinder for FixtureBinder {
    fn bind(&self) -> Result<Connection> {
        self.binds.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }

        let conn = Connection::open_in_memory().map_err(|e| GatewayError::Initialization {
            step: "open engine".to_string(),
            cause: e.to_string(),
        })?;

        let sql = match self.catalog {
            Catalog::Seeded => FIXTURE_SQL,
            Catalog::Unreachable => {
                "ATTACH '/nonexistent/ducklake/metadata.duckdb' AS catalog (READ_ONLY);"
            }
        };

        conn.execute_batch(sql).map_err(|e| GatewayError::Initialization {
            step: "attach catalog".to_string(),
            cause: e.to_string(),
        })?;

        Ok(conn)
    }

    fn tables(&self) -> &TableSet {
        &self.tables
    }

    fn redactor(&self) -> Redactor {
        Redactor::new([FIXTURE_SECRET.to_string()])
    }
}

pub async fn ready_manager() -> Arc<LifecycleManager> {
    ready_manager_with_pool(2).await
}

pub async fn ready_manager_with_pool(pool_size: usize) -> Arc<LifecycleManager> {
    let manager = Arc::new(LifecycleManager::new(Arc::new(FixtureBinder::seeded()), pool_size));
    manager.acquire().await.expect("fixture lake attaches");
    manager
}

pub async fn ready_handle() -> EngineHandle {
    ready_manager().await.acquire().await.expect("fixture lake attaches")
}
