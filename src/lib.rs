//! DuckLake Gateway
//!
//! Read-only HTTP access to Stellar ledger data stored in a DuckLake
//! catalog. One persistent DuckDB engine is attached per process; balance
//! reads resolve a ledger sequence first and pin every query to it.

pub mod api;
pub mod config;
pub mod error;
pub mod pool;
pub mod query;
pub mod shape;
pub mod snapshot;

#[cfg(test)]
mod testing;
