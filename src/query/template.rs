use crate::error::{GatewayError, Result};
use crate::snapshot::LedgerSequence;
use duckdb::types::Value;

#[derive(Debug, Clone)]
enum Param {
    Bound(Value),
    /// Filled with the request's resolved sequence at run time.
    PinnedSequence,
}

/// SQL text with positional `?` placeholders plus the values that fill them.
///
/// Caller input only ever reaches the engine through `bind_*`; the SQL text
/// itself is assembled from constants and configured table names.
#[derive(Debug, Clone)]
pub struct QueryTemplate {
    label: &'static str,
    sql: String,
    columns: &'static [&'static str],
    params: Vec<Param>,
}

impl QueryTemplate {
    pub fn new(label: &'static str, sql: impl Into<String>, columns: &'static [&'static str]) -> Self {
        Self {
            label,
            sql: sql.into(),
            columns,
            params: Vec::new(),
        }
    }

    pub fn bind_i64(mut self, value: i64) -> Self {
        self.params.push(Param::Bound(Value::BigInt(value)));
        self
    }

    pub fn bind_text(mut self, value: impl Into<String>) -> Self {
        self.params.push(Param::Bound(Value::Text(value.into())));
        self
    }

    pub fn bind_pinned_sequence(mut self) -> Self {
        self.params.push(Param::PinnedSequence);
        self
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn columns(&self) -> &'static [&'static str] {
        self.columns
    }

    pub fn is_pinned(&self) -> bool {
        self.params.iter().any(|p| matches!(p, Param::PinnedSequence))
    }

    /// Produces the final parameter list. A pinned template without a
    /// resolved sequence is rejected rather than run against a default.
    pub(crate) fn materialize(&self, pinned: Option<LedgerSequence>) -> Result<Vec<Value>> {
        let placeholders = self.sql.matches('?').count();
        if placeholders != self.params.len() {
            return Err(GatewayError::Internal(format!(
                "query {} has {} placeholders but {} parameters",
                self.label,
                placeholders,
                self.params.len()
            )));
        }

        self.params
            .iter()
            .map(|param| match param {
                Param::Bound(value) => Ok(value.clone()),
                Param::PinnedSequence => pinned.map(|seq| Value::BigInt(seq.0)).ok_or_else(|| {
                    GatewayError::Internal(format!(
                        "query {} requires a resolved ledger sequence",
                        self.label
                    ))
                }),
            })
            .collect()
    }
}
