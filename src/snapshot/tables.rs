use crate::config::CatalogConfig;

/// A lake table whose rows are keyed by a ledger sequence column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequencedTable {
    qualified_name: String,
    sequence_column: &'static str,
}

impl SequencedTable {
    fn new(catalog: &str, schema: &str, table: &str, sequence_column: &'static str) -> Self {
        Self {
            qualified_name: qualify(catalog, schema, table),
            sequence_column,
        }
    }

    /// Fully qualified, quoted name: `"catalog"."schema"."table"`
    pub fn qualified_name(&self) -> &str {
        &self.qualified_name
    }

    pub fn sequence_column(&self) -> &'static str {
        self.sequence_column
    }
}

/// Naming for every table the gateway reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSet {
    /// One row per closed ledger, keyed by `sequence`.
    pub ledgers: SequencedTable,
    /// Append-only native balance history, keyed by `ledger_sequence`.
    pub native_balances: SequencedTable,
    /// Append-only trustline history, keyed by `ledger_sequence`.
    pub trustlines: SequencedTable,
}

impl TableSet {
    pub fn new(
        catalog: &str,
        schema: &str,
        ledgers: &str,
        native_balances: &str,
        trustlines: &str,
    ) -> Self {
        Self {
            ledgers: SequencedTable::new(catalog, schema, ledgers, "sequence"),
            native_balances: SequencedTable::new(catalog, schema, native_balances, "ledger_sequence"),
            trustlines: SequencedTable::new(catalog, schema, trustlines, "ledger_sequence"),
        }
    }

    pub fn from_catalog(config: &CatalogConfig) -> Self {
        Self::new(
            &config.catalog_alias,
            &config.data_schema,
            &config.ledgers_table,
            &config.native_balances_table,
            &config.trustlines_table,
        )
    }
}

/// Callers pass names already checked by `config::is_valid_identifier`;
/// quoting keeps keywords such as `catalog` usable as aliases.
fn qualify(catalog: &str, schema: &str, table: &str) -> String {
    format!("\"{}\".\"{}\".\"{}\"", catalog, schema, table)
}
