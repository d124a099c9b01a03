use crate::error::{GatewayError, Result};
use crate::query::{QueryDispatcher, QueryTemplate};
use crate::shape::{shape, LatestSequence, Record};
use crate::snapshot::{EntityKey, ResolvedSnapshot, SequencedTable};
use tracing::debug;

/// Finds the ledger sequence that defines "current" for one entity.
pub struct SnapshotResolver<'a> {
    dispatcher: &'a QueryDispatcher,
}

impl<'a> SnapshotResolver<'a> {
    pub fn new(dispatcher: &'a QueryDispatcher) -> Self {
        Self { dispatcher }
    }

    /// One `MAX(sequence)` query over `primary`, filtered by `key`.
    ///
    /// No matching rows means the entity has no recorded history and is
    /// reported as `NotFound`; there is no fallback sequence.
    pub async fn resolve(&self, primary: &SequencedTable, key: EntityKey) -> Result<ResolvedSnapshot> {
        let template = resolution_query(primary, &key);
        let outcome = self.dispatcher.run(&template, None).await?;

        let latest = shape::<LatestSequence>(&outcome.rows)?
            .into_iter()
            .next()
            .and_then(|row| row.latest);

        match latest {
            Some(ledger_sequence) => {
                debug!("Resolved {} '{}' to ledger {}", key.resource(), key, ledger_sequence);
                Ok(ResolvedSnapshot {
                    entity_key: key,
                    ledger_sequence,
                })
            }
            None => Err(GatewayError::NotFound {
                resource: key.resource(),
                key: key.to_string(),
            }),
        }
    }
}

fn resolution_query(primary: &SequencedTable, key: &EntityKey) -> QueryTemplate {
    let select = format!(
        "SELECT MAX({}) AS latest FROM {}",
        primary.sequence_column(),
        primary.qualified_name()
    );

    match key {
        EntityKey::Account { account_id } => QueryTemplate::new(
            "resolve_account",
            format!("{} WHERE account_id = ?", select),
            LatestSequence::COLUMNS,
        )
        .bind_text(account_id.as_str()),
        EntityKey::Trustline {
            account_id,
            asset_code,
            asset_issuer,
        } => QueryTemplate::new(
            "resolve_trustline",
            format!(
                "{} WHERE account_id = ? AND asset_code = ? AND asset_issuer = ?",
                select
            ),
            LatestSequence::COLUMNS,
        )
        .bind_text(account_id.as_str())
        .bind_text(asset_code.as_str())
        .bind_text(asset_issuer.as_str()),
        EntityKey::Table => QueryTemplate::new("resolve_table", select, LatestSequence::COLUMNS),
    }
}
