use crate::config::{CatalogConfig, Redactor};
use crate::error::{GatewayError, Result};
use crate::snapshot::TableSet;
use duckdb::Connection;
use tracing::info;

/// Opens the analytical engine and makes the lake catalog reachable.
///
/// `bind` is blocking and may take minutes against a remote catalog; the
/// lifecycle manager calls it at most once per process.
pub trait CatalogBinder: Send + Sync + 'static {
    fn bind(&self) -> Result<Connection>;

    fn tables(&self) -> &TableSet;

    /// Scrubs credentials from engine errors raised after the bind.
    fn redactor(&self) -> Redactor;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindStep {
    pub label: &'static str,
    pub sql: String,
}

/// Binds a DuckLake catalog with S3-compatible storage credentials.
pub struct DuckLakeBinder {
    config: CatalogConfig,
    tables: TableSet,
}

impl DuckLakeBinder {
    pub fn new(config: CatalogConfig) -> Self {
        let tables = TableSet::from_catalog(&config);
        Self { config, tables }
    }

    pub fn steps(&self) -> Vec<BindStep> {
        let config = &self.config;

        vec![
            BindStep {
                label: "install ducklake extension",
                sql: "INSTALL ducklake; LOAD ducklake;".to_string(),
            },
            BindStep {
                label: "install httpfs extension",
                sql: "INSTALL httpfs; LOAD httpfs;".to_string(),
            },
            BindStep {
                label: "register storage secret",
                sql: format!(
                    "CREATE SECRET ducklake_storage (TYPE S3, KEY_ID {}, SECRET {}, REGION {}, ENDPOINT {}, URL_STYLE {})",
                    sql_literal(&config.s3_key_id),
                    sql_literal(&config.s3_secret),
                    sql_literal(&config.s3_region),
                    sql_literal(&config.s3_endpoint),
                    sql_literal(&config.s3_url_style),
                ),
            },
            BindStep {
                label: "attach catalog",
                sql: format!(
                    "ATTACH {} AS \"{}\" (DATA_PATH {}, METADATA_SCHEMA {})",
                    sql_literal(&config.attach_uri()),
                    config.catalog_alias,
                    sql_literal(&config.data_path),
                    sql_literal(&config.metadata_schema),
                ),
            },
        ]
    }
}

impl CatalogBinder for DuckLakeBinder {
    fn bind(&self) -> Result<Connection> {
        let conn = Connection::open_in_memory().map_err(|e| GatewayError::Initialization {
            step: "open engine".to_string(),
            cause: e.to_string(),
        })?;

        for step in self.steps() {
            info!("Catalog binder: {}", step.label);
            conn.execute_batch(&step.sql)
                .map_err(|e| GatewayError::Initialization {
                    step: step.label.to_string(),
                    cause: self.config.redact(&e.to_string()),
                })?;
        }

        info!(
            "Attached DuckLake catalog as '{}' (data path {})",
            self.config.catalog_alias, self.config.data_path
        );

        Ok(conn)
    }

    fn tables(&self) -> &TableSet {
        &self.tables
    }

    fn redactor(&self) -> Redactor {
        self.config.redactor()
    }
}

/// Configuration statements take no bound parameters, so values are quoted
/// as SQL string literals.
fn sql_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binder() -> DuckLakeBinder {
        let config = CatalogConfig::from_lookup(|key| match key {
            "S3_KEY_ID" => Some("key-id".to_string()),
            "S3_SECRET" => Some("se'cret".to_string()),
            "CATALOG_URL" => Some("host=pg dbname=lake".to_string()),
            _ => None,
        })
        .unwrap();
        DuckLakeBinder::new(config)
    }

    #[test]
    fn test_step_order() {
        let labels: Vec<&str> = binder().steps().iter().map(|s| s.label).collect();
        assert_eq!(
            labels,
            vec![
                "install ducklake extension",
                "install httpfs extension",
                "register storage secret",
                "attach catalog",
            ]
        );
    }

    #[test]
    fn test_secret_is_escaped() {
        let steps = binder().steps();
        assert!(steps[2].sql.contains("SECRET 'se''cret'"));
        assert!(steps[2].sql.contains("URL_STYLE 'path'"));
    }

    #[test]
    fn test_attach_statement() {
        let steps = binder().steps();
        assert_eq!(
            steps[3].sql,
            "ATTACH 'ducklake:postgres:host=pg dbname=lake' AS \"catalog\" \
             (DATA_PATH 's3://obsrvr-test-bucket-1/testnet_4/', METADATA_SCHEMA 'testnet')"
        );
    }

    #[test]
    fn test_tables_follow_catalog_alias() {
        assert_eq!(
            binder().tables().trustlines.qualified_name(),
            "\"catalog\".\"testnet\".\"trustlines_snapshot_v1\""
        );
    }

    #[test]
    fn test_sql_literal() {
        assert_eq!(sql_literal("plain"), "'plain'");
        assert_eq!(sql_literal("it's"), "'it''s'");
    }
}
