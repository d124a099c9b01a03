//! Response shaping: positional rows to named, caller-facing records.

mod amount;
mod records;
mod row;

pub use amount::{Amount, STROOPS_PER_UNIT};
pub use records::{
    BalanceRecord, HolderRecord, LatestSequence, LedgerDetail, LedgerSummary, NetworkStats,
};
pub use row::{shape, Record, RowView};
