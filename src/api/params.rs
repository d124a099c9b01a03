use crate::error::{GatewayError, Result};

pub const MAX_PAGE_LIMIT: i64 = 1000;

pub fn validate_limit(limit: i64) -> Result<i64> {
    if (1..=MAX_PAGE_LIMIT).contains(&limit) {
        Ok(limit)
    } else {
        Err(GatewayError::InvalidRequest {
            message: format!("limit must be between 1 and {}", MAX_PAGE_LIMIT),
        })
    }
}

/// Stellar account ids are 56-character strkeys (69 for muxed accounts).
/// Only the character set and length are checked; the value is always bound
/// as a parameter.
pub fn validate_account_id(account_id: &str) -> Result<()> {
    validate_key("account id", account_id, 69)
}

pub fn validate_asset_code(asset_code: &str) -> Result<()> {
    validate_key("asset code", asset_code, 12)
}

pub fn validate_issuer(issuer: &str) -> Result<()> {
    validate_key("asset issuer", issuer, 69)
}

fn validate_key(what: &str, value: &str, max_len: usize) -> Result<()> {
    if value.is_empty() || value.len() > max_len || !value.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(GatewayError::InvalidRequest {
            message: format!("invalid {}: '{}'", what, value),
        });
    }
    Ok(())
}
