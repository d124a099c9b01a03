//! Snapshot resolution
//!
//! Snapshot tables are append-only: every change to an entity is a new row
//! tagged with the ledger sequence it was observed at. "Current" state is
//! the row at the highest sequence. A request resolves that sequence once,
//! on its primary table, and pins every dependent query to it so the answer
//! never blends two points of the timeline.

mod resolver;
mod tables;

pub use resolver::SnapshotResolver;
pub use tables::{SequencedTable, TableSet};

use serde::Serialize;
use std::fmt;

/// Position on the ledger timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct LedgerSequence(pub i64);

impl fmt::Display for LedgerSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Subject whose latest sequence is being resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityKey {
    Account {
        account_id: String,
    },
    Trustline {
        account_id: String,
        asset_code: String,
        asset_issuer: String,
    },
    /// Whole-table scope, used by aggregate endpoints.
    Table,
}

impl EntityKey {
    pub fn account(account_id: impl Into<String>) -> Self {
        EntityKey::Account {
            account_id: account_id.into(),
        }
    }

    pub fn trustline(
        account_id: impl Into<String>,
        asset_code: impl Into<String>,
        asset_issuer: impl Into<String>,
    ) -> Self {
        EntityKey::Trustline {
            account_id: account_id.into(),
            asset_code: asset_code.into(),
            asset_issuer: asset_issuer.into(),
        }
    }

    pub fn resource(&self) -> &'static str {
        match self {
            EntityKey::Account { .. } => "Account",
            EntityKey::Trustline { .. } => "Trustline",
            EntityKey::Table => "Snapshot",
        }
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKey::Account { account_id } => write!(f, "{}", account_id),
            EntityKey::Trustline {
                account_id,
                asset_code,
                asset_issuer,
            } => write!(f, "{}:{}:{}", account_id, asset_code, asset_issuer),
            EntityKey::Table => write!(f, "latest"),
        }
    }
}

/// Outcome of one resolution step; lives for a single request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSnapshot {
    pub entity_key: EntityKey,
    pub ledger_sequence: LedgerSequence,
}
