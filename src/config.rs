use std::env;
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_S3_REGION: &str = "us-west-004";
const DEFAULT_S3_ENDPOINT: &str = "s3.us-west-004.backblazeb2.com";
const DEFAULT_DATA_PATH: &str = "s3://obsrvr-test-bucket-1/testnet_4/";
const DEFAULT_METADATA_SCHEMA: &str = "testnet";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("required setting {0} is missing or empty")]
    Missing(&'static str),

    #[error("invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

/// Server-side settings: listener, timeouts, pool sizing.
#[derive(Debug, Clone)]
pub struct Config {
    pub gateway_host: String,
    pub gateway_port: u16,
    pub log_dir: PathBuf,
    pub query_timeout: Duration,
    pub engine_pool_size: usize,
    pub eager_init: bool,
    pub stats_window_ledgers: i64,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let gateway_host = optional(&lookup, "GATEWAY_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let gateway_port = parsed(&lookup, "GATEWAY_PORT", 8000u16)?;

        let log_dir = optional(&lookup, "LOG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("/var/log/ducklake-gateway"));

        let query_timeout_secs = parsed(&lookup, "QUERY_TIMEOUT_SECS", 30u64)?;
        if query_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "QUERY_TIMEOUT_SECS",
                message: "must be at least 1 second".to_string(),
            });
        }

        let engine_pool_size = parsed(&lookup, "ENGINE_POOL_SIZE", 4usize)?;
        if engine_pool_size == 0 {
            return Err(ConfigError::Invalid {
                key: "ENGINE_POOL_SIZE",
                message: "must be at least 1".to_string(),
            });
        }

        let eager_init = parsed(&lookup, "EAGER_INIT", true)?;

        let stats_window_ledgers = parsed(&lookup, "STATS_WINDOW_LEDGERS", 10_000i64)?;
        if stats_window_ledgers <= 0 {
            return Err(ConfigError::Invalid {
                key: "STATS_WINDOW_LEDGERS",
                message: "must be positive".to_string(),
            });
        }

        Ok(Config {
            gateway_host,
            gateway_port,
            log_dir,
            query_timeout: Duration::from_secs(query_timeout_secs),
            engine_pool_size,
            eager_init,
            stats_window_ledgers,
        })
    }

    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        let addr = format!("{}:{}", self.gateway_host, self.gateway_port);
        addr.parse().map_err(|e| anyhow::anyhow!("Invalid socket address: {}", e))
    }
}

/// Storage credentials and catalog location used by the one-time attach.
#[derive(Clone)]
pub struct CatalogConfig {
    pub s3_key_id: String,
    pub s3_secret: String,
    pub s3_region: String,
    pub s3_endpoint: String,
    pub s3_url_style: String,
    pub catalog_url: String,
    pub catalog_alias: String,
    pub data_path: String,
    pub metadata_schema: String,
    pub data_schema: String,
    pub ledgers_table: String,
    pub native_balances_table: String,
    pub trustlines_table: String,
}

impl CatalogConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let s3_key_id = required(&lookup, "S3_KEY_ID")?;
        let s3_secret = required(&lookup, "S3_SECRET")?;
        let catalog_url = required(&lookup, "CATALOG_URL")?;

        let metadata_schema = optional(&lookup, "METADATA_SCHEMA")
            .unwrap_or_else(|| DEFAULT_METADATA_SCHEMA.to_string());
        let data_schema = optional(&lookup, "DATA_SCHEMA").unwrap_or_else(|| metadata_schema.clone());

        let config = CatalogConfig {
            s3_key_id,
            s3_secret,
            s3_region: optional(&lookup, "S3_REGION").unwrap_or_else(|| DEFAULT_S3_REGION.to_string()),
            s3_endpoint: optional(&lookup, "S3_ENDPOINT")
                .unwrap_or_else(|| DEFAULT_S3_ENDPOINT.to_string()),
            s3_url_style: optional(&lookup, "S3_URL_STYLE").unwrap_or_else(|| "path".to_string()),
            catalog_url,
            catalog_alias: optional(&lookup, "CATALOG_ALIAS").unwrap_or_else(|| "catalog".to_string()),
            data_path: optional(&lookup, "DATA_PATH").unwrap_or_else(|| DEFAULT_DATA_PATH.to_string()),
            metadata_schema,
            data_schema,
            ledgers_table: optional(&lookup, "LEDGERS_TABLE")
                .unwrap_or_else(|| "ledgers_row_v2".to_string()),
            native_balances_table: optional(&lookup, "NATIVE_BALANCES_TABLE")
                .unwrap_or_else(|| "native_balances_snapshot_v1".to_string()),
            trustlines_table: optional(&lookup, "TRUSTLINES_TABLE")
                .unwrap_or_else(|| "trustlines_snapshot_v1".to_string()),
        };

        config.validate_identifiers()?;
        Ok(config)
    }

    /// Catalog, schema and table names are spliced into SQL text, so they are
    /// restricted to plain identifiers.
    fn validate_identifiers(&self) -> Result<(), ConfigError> {
        let identifiers: [(&'static str, &str); 6] = [
            ("CATALOG_ALIAS", &self.catalog_alias),
            ("METADATA_SCHEMA", &self.metadata_schema),
            ("DATA_SCHEMA", &self.data_schema),
            ("LEDGERS_TABLE", &self.ledgers_table),
            ("NATIVE_BALANCES_TABLE", &self.native_balances_table),
            ("TRUSTLINES_TABLE", &self.trustlines_table),
        ];

        for (key, value) in identifiers {
            if !is_valid_identifier(value) {
                return Err(ConfigError::Invalid {
                    key,
                    message: format!("'{}' is not a valid identifier", value),
                });
            }
        }

        Ok(())
    }

    /// Full DuckLake attach URI. Bare connection strings name a PostgreSQL
    /// metadata catalog.
    pub fn attach_uri(&self) -> String {
        if self.catalog_url.starts_with("ducklake:") {
            self.catalog_url.clone()
        } else {
            format!("ducklake:postgres:{}", self.catalog_url)
        }
    }

    /// Replaces every credential-bearing value in `text` with a placeholder.
    pub fn redact(&self, text: &str) -> String {
        self.redactor().redact(text)
    }

    /// Scrubber for engine error text, carried past the attach so query-time
    /// errors are cleaned the same way.
    pub fn redactor(&self) -> Redactor {
        let mut secrets = vec![
            self.s3_secret.clone(),
            self.s3_key_id.clone(),
            self.catalog_url.clone(),
        ];
        secrets.extend(catalog_passwords(&self.catalog_url));
        Redactor::new(secrets)
    }
}

/// Password fragments of a catalog locator: `password=...` conninfo pairs
/// and the `user:password@` part of a URI. Engine errors may echo either on
/// its own.
fn catalog_passwords(catalog_url: &str) -> Vec<String> {
    let mut passwords: Vec<String> = catalog_url
        .split_whitespace()
        .filter_map(|pair| pair.strip_prefix("password="))
        .map(|value| value.trim_matches('\'').to_string())
        .collect();

    if let Some((_, rest)) = catalog_url.split_once("://") {
        if let Some((userinfo, _)) = rest.split_once('@') {
            if let Some((_, password)) = userinfo.split_once(':') {
                passwords.push(password.to_string());
            }
        }
    }

    passwords
}

/// Replaces known secret values in free-form text.
#[derive(Clone, Default)]
pub struct Redactor {
    secrets: Arc<Vec<String>>,
}

impl Redactor {
    pub fn new(secrets: impl IntoIterator<Item = String>) -> Self {
        let mut secrets: Vec<String> = secrets.into_iter().filter(|s| !s.is_empty()).collect();
        // Longest first so a value never leaves a fragment of a longer one.
        secrets.sort_by(|a, b| b.len().cmp(&a.len()));
        secrets.dedup();
        Self {
            secrets: Arc::new(secrets),
        }
    }

    pub fn redact(&self, text: &str) -> String {
        self.secrets
            .iter()
            .fold(text.to_string(), |acc, secret| acc.replace(secret.as_str(), "***"))
    }
}

impl fmt::Debug for Redactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Redactor({} values)", self.secrets.len())
    }
}

impl fmt::Debug for CatalogConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CatalogConfig")
            .field("s3_key_id", &"***")
            .field("s3_secret", &"***")
            .field("s3_region", &self.s3_region)
            .field("s3_endpoint", &self.s3_endpoint)
            .field("catalog_url", &"***")
            .field("catalog_alias", &self.catalog_alias)
            .field("data_path", &self.data_path)
            .field("metadata_schema", &self.metadata_schema)
            .field("data_schema", &self.data_schema)
            .finish()
    }
}

pub fn is_valid_identifier(name: &str) -> bool {
    if name.is_empty() || name.len() > 63 {
        return false;
    }

    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() || c == '_' => {}
        _ => return false,
    }

    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

fn optional<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required<F>(lookup: &F, key: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    optional(lookup, key).ok_or(ConfigError::Missing(key))
}

fn parsed<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: fmt::Display,
{
    match optional(lookup, key) {
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            message: e.to_string(),
        }),
        None => Ok(default),
    }
}
