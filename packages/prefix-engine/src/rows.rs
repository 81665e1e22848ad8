//! Rewrites row keys that embed the prefix.
//!
//! Two tables carry prefix-qualified keys: the options table holds a single
//! `{prefix}user_roles` row, and usermeta holds per-user keys such as
//! `{prefix}capabilities`. The first is updated by composed key, the second
//! by scanning every key and filtering on the leading bytes.

use std::sync::Arc;
use tracing::{debug, info};

use crate::error::RowError;
use crate::prefix::{PrefixPair, RunMode};
use crate::report::StepOutcome;
use crate::sql::KeyUpdate;
use crate::traits::BaseStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchPolicy {
    /// Update the one row keyed `old + key_suffix`
    ExactKey { key_suffix: String },
    /// List every key and update those starting with the old prefix
    ScanAndFilter,
}

/// Updater for one prefix-qualified key column
pub struct RowPrefixUpdater {
    store: Arc<dyn BaseStore>,
    table_suffix: String,
    column: String,
    policy: MatchPolicy,
}

impl RowPrefixUpdater {
    pub fn new(
        store: Arc<dyn BaseStore>,
        table_suffix: impl Into<String>,
        column: impl Into<String>,
        policy: MatchPolicy,
    ) -> Self {
        Self {
            store,
            table_suffix: table_suffix.into(),
            column: column.into(),
            policy,
        }
    }

    /// `{prefix}options.option_name = {prefix}user_roles`
    pub fn user_roles(store: Arc<dyn BaseStore>) -> Self {
        Self::new(
            store,
            "options",
            "option_name",
            MatchPolicy::ExactKey {
                key_suffix: "user_roles".to_string(),
            },
        )
    }

    /// Every `{prefix}usermeta.meta_key` starting with the prefix
    pub fn usermeta(store: Arc<dyn BaseStore>) -> Self {
        Self::new(store, "usermeta", "meta_key", MatchPolicy::ScanAndFilter)
    }

    /// Rewrite matching keys in the table named `table_prefix + table_suffix`
    ///
    /// `table_prefix` is whatever prefix the table carries right now: the new
    /// one after an applied rename, the old one in a dry run where nothing was
    /// renamed. Key matching always uses `pair.old()`.
    pub async fn update(
        &self,
        pair: &PrefixPair,
        table_prefix: &str,
        mode: RunMode,
        outcome: &mut StepOutcome,
    ) -> Result<(), RowError> {
        let table = format!("{}{}", table_prefix, self.table_suffix);

        match &self.policy {
            MatchPolicy::ExactKey { key_suffix } => {
                let stmt = KeyUpdate {
                    table,
                    column: self.column.clone(),
                    from: format!("{}{}", pair.old(), key_suffix),
                    to: format!("{}{}", pair.new_prefix(), key_suffix),
                };
                self.apply_one(stmt, mode, outcome).await
            }
            MatchPolicy::ScanAndFilter => {
                let keys = self
                    .store
                    .list_keys(&table, &self.column)
                    .await
                    .map_err(|source| RowError::Scan {
                        table: table.clone(),
                        column: self.column.clone(),
                        source,
                    })?;

                // Duplicate keys are listed once per row, and each update
                // touches a single row, so every copy gets its own update.
                for key in keys {
                    let Some(new_key) = pair.reprefix(&key) else {
                        continue;
                    };

                    let stmt = KeyUpdate {
                        table: table.clone(),
                        column: self.column.clone(),
                        from: key,
                        to: new_key,
                    };
                    self.apply_one(stmt, mode, outcome).await?;
                }

                Ok(())
            }
        }
    }

    async fn apply_one(
        &self,
        stmt: KeyUpdate,
        mode: RunMode,
        outcome: &mut StepOutcome,
    ) -> Result<(), RowError> {
        if mode.is_dry_run() {
            debug!(table = %stmt.table, from = %stmt.from, to = %stmt.to, "Would update key");
            outcome.record_preview(&stmt);
            return Ok(());
        }

        let affected = self
            .store
            .update_key(&stmt)
            .await
            .map_err(|source| RowError::Update {
                table: stmt.table.clone(),
                key: stmt.from.clone(),
                source,
            })?;

        if affected == 0 {
            return Err(RowError::NoEffect {
                table: stmt.table,
                key: stmt.from,
            });
        }

        info!(table = %stmt.table, from = %stmt.from, to = %stmt.to, "Updated key");
        outcome.record_applied(&stmt, affected);
        Ok(())
    }
}
