//! Caller-facing records and their column contracts.

use crate::error::Result;
use crate::shape::row::{Record, RowView};
use crate::shape::Amount;
use crate::snapshot::LedgerSequence;
use serde::Serialize;

/// Single-value result of a `MAX(sequence)` resolution query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatestSequence {
    pub latest: Option<LedgerSequence>,
}

impl Record for LatestSequence {
    const COLUMNS: &'static [&'static str] = &["latest"];

    fn from_row(row: &RowView<'_>) -> Result<Self> {
        Ok(LatestSequence {
            latest: row.opt_i64("latest")?.map(LedgerSequence),
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LedgerSummary {
    pub sequence: i64,
    pub closed_at: Option<String>,
    pub transaction_count: Option<i64>,
    pub operation_count: Option<i64>,
    pub successful_tx_count: Option<i64>,
    pub failed_tx_count: Option<i64>,
}

impl Record for LedgerSummary {
    const COLUMNS: &'static [&'static str] = &[
        "sequence",
        "closed_at",
        "transaction_count",
        "operation_count",
        "successful_tx_count",
        "failed_tx_count",
    ];

    fn from_row(row: &RowView<'_>) -> Result<Self> {
        Ok(LedgerSummary {
            sequence: row.i64("sequence")?,
            closed_at: row.opt_timestamp("closed_at")?,
            transaction_count: row.opt_i64("transaction_count")?,
            operation_count: row.opt_i64("operation_count")?,
            successful_tx_count: row.opt_i64("successful_tx_count")?,
            failed_tx_count: row.opt_i64("failed_tx_count")?,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LedgerDetail {
    pub sequence: i64,
    pub closed_at: Option<String>,
    pub ledger_hash: String,
    pub previous_ledger_hash: String,
    pub transaction_count: Option<i64>,
    pub operation_count: Option<i64>,
    pub successful_tx_count: Option<i64>,
    pub failed_tx_count: Option<i64>,
    pub protocol_version: Option<i64>,
    pub total_xlm: Amount,
    pub base_fee: Option<i64>,
    pub base_reserve: Option<i64>,
}

impl Record for LedgerDetail {
    const COLUMNS: &'static [&'static str] = &[
        "sequence",
        "closed_at",
        "ledger_hash",
        "previous_ledger_hash",
        "transaction_count",
        "operation_count",
        "successful_tx_count",
        "failed_tx_count",
        "protocol_version",
        "total_coins",
        "base_fee",
        "base_reserve",
    ];

    fn from_row(row: &RowView<'_>) -> Result<Self> {
        Ok(LedgerDetail {
            sequence: row.i64("sequence")?,
            closed_at: row.opt_timestamp("closed_at")?,
            ledger_hash: row.text("ledger_hash")?,
            previous_ledger_hash: row.text("previous_ledger_hash")?,
            transaction_count: row.opt_i64("transaction_count")?,
            operation_count: row.opt_i64("operation_count")?,
            successful_tx_count: row.opt_i64("successful_tx_count")?,
            failed_tx_count: row.opt_i64("failed_tx_count")?,
            protocol_version: row.opt_i64("protocol_version")?,
            total_xlm: row.amount("total_coins")?,
            base_fee: row.opt_i64("base_fee")?,
            base_reserve: row.opt_i64("base_reserve")?,
        })
    }
}

/// One asset balance of an account. Native and trustline queries both
/// select this column list so the two halves of a balance answer share a
/// single shape.
#[derive(Debug, Clone, Serialize)]
pub struct BalanceRecord {
    pub asset_code: String,
    pub asset_issuer: String,
    pub balance: Amount,
    pub buying_liabilities: Amount,
    pub selling_liabilities: Amount,
    pub available: Amount,
    pub ledger_sequence: LedgerSequence,
}

impl Record for BalanceRecord {
    const COLUMNS: &'static [&'static str] = &[
        "asset_code",
        "asset_issuer",
        "balance",
        "buying_liabilities",
        "selling_liabilities",
        "ledger_sequence",
    ];

    fn from_row(row: &RowView<'_>) -> Result<Self> {
        let balance = row.amount("balance")?;
        let buying_liabilities = row.amount("buying_liabilities")?;
        let selling_liabilities = row.amount("selling_liabilities")?;

        Ok(BalanceRecord {
            asset_code: row.text("asset_code")?,
            asset_issuer: row.text("asset_issuer")?,
            balance,
            buying_liabilities,
            selling_liabilities,
            available: Amount::available(balance, buying_liabilities, selling_liabilities),
            ledger_sequence: LedgerSequence(row.i64("ledger_sequence")?),
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HolderRecord {
    pub account_id: String,
    pub asset_code: String,
    pub asset_issuer: String,
    pub balance: Amount,
    pub authorized: bool,
}

impl Record for HolderRecord {
    const COLUMNS: &'static [&'static str] =
        &["account_id", "asset_code", "asset_issuer", "balance", "authorized"];

    fn from_row(row: &RowView<'_>) -> Result<Self> {
        Ok(HolderRecord {
            account_id: row.text("account_id")?,
            asset_code: row.text("asset_code")?,
            asset_issuer: row.text("asset_issuer")?,
            balance: row.amount("balance")?,
            authorized: row.bool("authorized")?,
        })
    }
}

/// Aggregate counters; every field is zero when the window is empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NetworkStats {
    pub ledger_count: i64,
    pub first_ledger: i64,
    pub last_ledger: i64,
    pub total_transactions: i64,
    pub successful_transactions: i64,
    pub failed_transactions: i64,
    pub avg_tx_per_ledger: f64,
}

impl Record for NetworkStats {
    const COLUMNS: &'static [&'static str] = &[
        "ledger_count",
        "first_ledger",
        "last_ledger",
        "total_transactions",
        "successful_transactions",
        "failed_transactions",
        "avg_tx_per_ledger",
    ];

    fn from_row(row: &RowView<'_>) -> Result<Self> {
        Ok(NetworkStats {
            ledger_count: row.opt_i64("ledger_count")?.unwrap_or(0),
            first_ledger: row.opt_i64("first_ledger")?.unwrap_or(0),
            last_ledger: row.opt_i64("last_ledger")?.unwrap_or(0),
            total_transactions: row.opt_i64("total_transactions")?.unwrap_or(0),
            successful_transactions: row.opt_i64("successful_transactions")?.unwrap_or(0),
            failed_transactions: row.opt_i64("failed_transactions")?.unwrap_or(0),
            avg_tx_per_ledger: row.opt_f64("avg_tx_per_ledger")?.unwrap_or(0.0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::shape;
    use duckdb::types::Value;

    #[test]
    fn test_balance_available_is_derived_from_stroops() {
        let rows = vec![vec![
            Value::Text("XLM".to_string()),
            Value::Text("native".to_string()),
            Value::BigInt(123_456_789_012_345),
            Value::BigInt(1_000_000),
            Value::BigInt(2_500_000),
            Value::BigInt(120),
        ]];

        let balances: Vec<BalanceRecord> = shape(&rows).unwrap();
        assert_eq!(balances[0].available.stroops(), 123_456_785_512_345);
        assert_eq!(balances[0].ledger_sequence, LedgerSequence(120));

        let json = serde_json::to_value(&balances[0]).unwrap();
        assert_eq!(json["ledger_sequence"], 120);
        assert_eq!(json["asset_issuer"], "native");
    }

    #[test]
    fn test_empty_stats_are_zero() {
        let rows = vec![vec![
            Value::BigInt(0),
            Value::Null,
            Value::Null,
            Value::BigInt(0),
            Value::BigInt(0),
            Value::BigInt(0),
            Value::Null,
        ]];

        let stats: Vec<NetworkStats> = shape(&rows).unwrap();
        assert_eq!(stats[0], NetworkStats::default());
    }

    #[test]
    fn test_latest_sequence_null_is_none() {
        let latest: Vec<LatestSequence> = shape(&[vec![Value::Null]]).unwrap();
        assert_eq!(latest[0].latest, None);
    }
}
