//! The prefix rename pipeline.
//!
//! Order is fixed: config file, tables, (multisite options), user roles
//! option, usermeta keys. Row updates address tables by their *current*
//! prefix, which is the new one once tables were renamed in this run and the
//! old one in a dry run. The first failing step stops the run; nothing that
//! already happened is undone.

use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config_file::{ConfigFileRewriter, PrefixAssignment};
use crate::error::MigrationError;
use crate::multisite::MultiTenantOptionsUpdater;
use crate::prefix::{PrefixPair, RunMode, Topology};
use crate::report::{MigrationReport, StepKind, StepOutcome, StepStatus};
use crate::rows::RowPrefixUpdater;
use crate::tables::TableRenamer;
use crate::traits::{BaseConfigFiles, BasePrompter, BaseStore};

pub const REMEDIATION_MESSAGE: &str = "The database prefix may now be only partly renamed. \
     Check your site; if it is broken, restore your config file and your database \
     from the backups you made before running this command.";

/// Config file to rewrite, and which assignment in it holds the prefix
#[derive(Debug, Clone)]
pub struct ConfigTarget {
    pub path: PathBuf,
    pub assignment: PrefixAssignment,
}

impl ConfigTarget {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            assignment: PrefixAssignment::default(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub topology: Topology,
    /// `None` skips the config file step
    pub config: Option<ConfigTarget>,
}

pub struct MigrationOrchestrator {
    store: Arc<dyn BaseStore>,
    files: Arc<dyn BaseConfigFiles>,
    prompter: Arc<dyn BasePrompter>,
    options: RunOptions,
}

impl MigrationOrchestrator {
    pub fn new(
        store: Arc<dyn BaseStore>,
        files: Arc<dyn BaseConfigFiles>,
        prompter: Arc<dyn BasePrompter>,
        options: RunOptions,
    ) -> Self {
        Self {
            store,
            files,
            prompter,
            options,
        }
    }

    /// Run the whole pipeline and report what happened
    pub async fn run(&self, old_prefix: &str, new_prefix: &str, mode: RunMode) -> MigrationReport {
        let mut report = MigrationReport::start(old_prefix, new_prefix, mode);

        info!(
            old_prefix = %old_prefix,
            new_prefix = %new_prefix,
            mode = ?mode,
            host = %self.store.host(),
            "Starting prefix rename"
        );

        match self.execute(old_prefix, new_prefix, mode, &mut report).await {
            Ok(()) => {
                info!(steps = report.steps.len(), "Prefix rename finished");
                report.succeed();
            }
            Err(err) => {
                warn!(error = %err, kind = ?err.kind(), "Prefix rename stopped");
                report.fail(&err, REMEDIATION_MESSAGE);
            }
        }

        report
    }

    async fn execute(
        &self,
        old_prefix: &str,
        new_prefix: &str,
        mode: RunMode,
        report: &mut MigrationReport,
    ) -> Result<(), MigrationError> {
        if self.options.topology.is_multi_tenant() {
            return Err(MigrationError::UnsupportedTopology);
        }
        let pair = PrefixPair::new(old_prefix, new_prefix)?;

        // Discovery is read-only; failing here must leave the config file alone.
        let renamer = TableRenamer::new(self.store.clone());
        let plan = match renamer.plan(&pair).await {
            Ok(plan) => plan,
            Err(err) => {
                return record(report, StepOutcome::new(StepKind::RenameTables), Err(err))
            }
        };

        if !mode.is_dry_run() {
            self.confirm(&pair)?;
        }

        self.update_config_file(&pair, mode, report)?;

        let mut outcome = StepOutcome::new(StepKind::RenameTables);
        let result = renamer.execute(plan, mode, &mut outcome).await;
        record(report, outcome, result)?;

        let table_prefix = match mode {
            RunMode::Apply => pair.new_prefix(),
            RunMode::DryRun => pair.old(),
        };

        // Unreachable while multisite is rejected above; kept so the step
        // slots in once per-site updates exist.
        if self.options.topology.is_multi_tenant() {
            self.update_multisite_options(&pair, report).await?;
        }

        let mut outcome = StepOutcome::new(StepKind::UserRolesOption);
        let result = RowPrefixUpdater::user_roles(self.store.clone())
            .update(&pair, table_prefix, mode, &mut outcome)
            .await;
        record(report, outcome, result)?;

        let mut outcome = StepOutcome::new(StepKind::UsermetaKeys);
        let result = RowPrefixUpdater::usermeta(self.store.clone())
            .update(&pair, table_prefix, mode, &mut outcome)
            .await;
        record(report, outcome, result)?;

        Ok(())
    }

    async fn update_multisite_options(
        &self,
        pair: &PrefixPair,
        report: &mut MigrationReport,
    ) -> Result<(), MigrationError> {
        let result = MultiTenantOptionsUpdater::new().update(pair).await;
        record(report, StepOutcome::new(StepKind::MultisiteOptions), result)
    }

    fn confirm(&self, pair: &PrefixPair) -> Result<(), MigrationError> {
        let message = confirmation_message(pair, &self.store.host());

        let accepted = self
            .prompter
            .confirm(&message)
            .map_err(|e| MigrationError::Prompt(e.to_string()))?;

        if accepted {
            Ok(())
        } else {
            Err(MigrationError::UserAborted)
        }
    }

    fn update_config_file(
        &self,
        pair: &PrefixPair,
        mode: RunMode,
        report: &mut MigrationReport,
    ) -> Result<(), MigrationError> {
        let Some(target) = &self.options.config else {
            report.push(StepOutcome::skipped(
                StepKind::ConfigFile,
                "config file update disabled",
            ));
            return Ok(());
        };

        // Dry runs do not preview the config file change.
        if mode.is_dry_run() {
            report.push(StepOutcome::skipped(
                StepKind::ConfigFile,
                "config file is not changed in a dry run",
            ));
            return Ok(());
        }

        let rewriter = ConfigFileRewriter::new(self.files.clone(), target.assignment.clone());
        let mut outcome = StepOutcome::new(StepKind::ConfigFile);
        let result = rewriter.rewrite(&target.path, pair.new_prefix());
        if result.is_ok() {
            outcome.record_applied(
                format!(
                    "{} = '{}' in {}",
                    target.assignment.identifier(),
                    pair.new_prefix(),
                    target.path.display()
                ),
                1,
            );
        }
        record(report, outcome, result)
    }
}

/// Warning shown before anything is changed
pub fn confirmation_message(pair: &PrefixPair, host: &str) -> String {
    format!(
        "Use this at your own risk. If something goes wrong, it could break your site. \
         Before running this, make sure to back up your config file and export your database.\n\n\
         Are you sure you want to rename the database prefix on {} from `{}` to `{}`?",
        host,
        pair.old(),
        pair.new_prefix()
    )
}

/// Push `outcome` with the status `result` implies, passing the error on
fn record<E>(
    report: &mut MigrationReport,
    mut outcome: StepOutcome,
    result: Result<(), E>,
) -> Result<(), MigrationError>
where
    E: Into<MigrationError>,
{
    match result {
        Ok(()) => {
            report.push(outcome);
            Ok(())
        }
        Err(err) => {
            let err = err.into();
            outcome.status = StepStatus::Failed {
                message: err.to_string(),
            };
            report.push(outcome);
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::testing::{MemoryFiles, MemoryStore, ScriptedPrompter};

    #[tokio::test]
    async fn test_multisite_options_step_records_not_implemented() {
        let orchestrator = MigrationOrchestrator::new(
            Arc::new(MemoryStore::wordpress("wp_", &["wp_user_roles"], &[])),
            Arc::new(MemoryFiles::new()),
            Arc::new(ScriptedPrompter::accepting()),
            RunOptions {
                topology: Topology::MultiSite,
                config: None,
            },
        );
        let pair = PrefixPair::new("wp_", "foo_").unwrap();
        let mut report = MigrationReport::start("wp_", "foo_", RunMode::Apply);

        let err = orchestrator
            .update_multisite_options(&pair, &mut report)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::NotImplemented);
        let step = report.step(StepKind::MultisiteOptions).unwrap();
        assert!(step.is_failed());
    }

    #[test]
    fn test_confirmation_message_names_prefixes_and_host() {
        let pair = PrefixPair::new("wp_", "foo_").unwrap();
        let message = confirmation_message(&pair, "db.internal:3306/wordpress");

        assert!(message.contains("db.internal:3306/wordpress"));
        assert!(message.contains("`wp_`"));
        assert!(message.contains("`foo_`"));
    }
}
