use std::sync::Arc;
use tracing::{debug, info};

use crate::error::TableError;
use crate::prefix::{PrefixPair, RunMode};
use crate::report::StepOutcome;
use crate::sql::RenameTable;
use crate::traits::BaseStore;

/// Renames every table carrying the old prefix
pub struct TableRenamer {
    store: Arc<dyn BaseStore>,
}

impl TableRenamer {
    pub fn new(store: Arc<dyn BaseStore>) -> Self {
        Self { store }
    }

    /// Tables whose names start with the old prefix, paired with their new names
    ///
    /// An empty result is an error: the running application owns tables
    /// under its own prefix, so finding none means the prefix is wrong.
    pub async fn plan(&self, pair: &PrefixPair) -> Result<Vec<RenameTable>, TableError> {
        let names = self
            .store
            .list_tables(pair.old())
            .await
            .map_err(|source| TableError::Discovery {
                prefix: pair.old().to_string(),
                source,
            })?;

        // Case follows the store's collation; `_` must still match literally.
        let plan: Vec<RenameTable> = names
            .into_iter()
            .filter_map(|from| {
                pair.reprefix_listed(&from)
                    .map(|to| RenameTable { from, to })
            })
            .collect();

        if plan.is_empty() {
            return Err(TableError::NoTables {
                prefix: pair.old().to_string(),
            });
        }

        Ok(plan)
    }

    /// Rename (or preview renaming) every old-prefixed table
    pub async fn rename(
        &self,
        pair: &PrefixPair,
        mode: RunMode,
        outcome: &mut StepOutcome,
    ) -> Result<(), TableError> {
        let plan = self.plan(pair).await?;
        self.execute(plan, mode, outcome).await
    }

    /// Carry out renames produced by [`TableRenamer::plan`]
    ///
    /// In apply mode the first failing rename stops the loop. Tables renamed
    /// before it stay renamed and are recorded in `outcome`. A dry run records
    /// every statement and never stops early.
    pub async fn execute(
        &self,
        plan: Vec<RenameTable>,
        mode: RunMode,
        outcome: &mut StepOutcome,
    ) -> Result<(), TableError> {
        for stmt in plan {
            if mode.is_dry_run() {
                debug!(from = %stmt.from, to = %stmt.to, "Would rename table");
                outcome.record_preview(&stmt);
                continue;
            }

            self.store
                .rename_table(&stmt)
                .await
                .map_err(|source| TableError::Rename {
                    from: stmt.from.clone(),
                    to: stmt.to.clone(),
                    source,
                })?;

            info!(from = %stmt.from, to = %stmt.to, "Renamed table");
            outcome.record_applied(&stmt, 1);
        }

        Ok(())
    }
}
