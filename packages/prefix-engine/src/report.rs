//! Per-run report: what each step did and how the run ended.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{ErrorKind, MigrationError};
use crate::prefix::RunMode;

/// Pipeline steps, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    ConfigFile,
    RenameTables,
    MultisiteOptions,
    UserRolesOption,
    UsermetaKeys,
}

impl StepKind {
    pub fn label(self) -> &'static str {
        match self {
            StepKind::ConfigFile => "Update config file",
            StepKind::RenameTables => "Rename tables",
            StepKind::MultisiteOptions => "Update multisite options",
            StepKind::UserRolesOption => "Update user roles option",
            StepKind::UsermetaKeys => "Update usermeta keys",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepStatus {
    Completed,
    Skipped { reason: String },
    Failed { message: String },
}

/// Outcome of one step
///
/// `statements` holds the previewed statements in a dry run and the executed
/// ones in apply mode. `affected` counts renamed tables or updated rows and
/// stays at zero in a dry run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepOutcome {
    pub step: StepKind,
    pub statements: Vec<String>,
    pub affected: u64,
    #[serde(flatten)]
    pub status: StepStatus,
}

impl StepOutcome {
    pub fn new(step: StepKind) -> Self {
        Self {
            step,
            statements: Vec::new(),
            affected: 0,
            status: StepStatus::Completed,
        }
    }

    pub fn skipped(step: StepKind, reason: impl Into<String>) -> Self {
        Self {
            status: StepStatus::Skipped {
                reason: reason.into(),
            },
            ..Self::new(step)
        }
    }

    /// Record a statement that a dry run would have executed
    pub fn record_preview(&mut self, statement: impl ToString) {
        self.statements.push(statement.to_string());
    }

    /// Record an executed statement and the number of objects it changed
    pub fn record_applied(&mut self, statement: impl ToString, affected: u64) {
        self.statements.push(statement.to_string());
        self.affected += affected;
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, StepStatus::Failed { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Succeeded,
    Failed,
    Aborted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure {
    pub kind: ErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MigrationReport {
    pub mode: RunMode,
    pub old_prefix: String,
    pub new_prefix: String,
    pub steps: Vec<StepOutcome>,
    pub status: RunStatus,
    pub failure: Option<Failure>,
    pub remediation: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl MigrationReport {
    pub fn start(old_prefix: &str, new_prefix: &str, mode: RunMode) -> Self {
        Self {
            mode,
            old_prefix: old_prefix.to_string(),
            new_prefix: new_prefix.to_string(),
            steps: Vec::new(),
            status: RunStatus::Running,
            failure: None,
            remediation: None,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn push(&mut self, outcome: StepOutcome) {
        self.steps.push(outcome);
    }

    pub fn succeed(&mut self) {
        self.status = RunStatus::Succeeded;
        self.finished_at = Some(Utc::now());
    }

    /// Finalize after `err` stopped the run
    ///
    /// A declined confirmation is an abort and carries no remediation note,
    /// since nothing ran. Every other failure gets the note.
    pub fn fail(&mut self, err: &MigrationError, remediation: &str) {
        let kind = err.kind();
        self.failure = Some(Failure {
            kind,
            message: err.to_string(),
        });

        if kind == ErrorKind::UserAborted {
            self.status = RunStatus::Aborted;
        } else {
            self.status = RunStatus::Failed;
            self.remediation = Some(remediation.to_string());
        }
        self.finished_at = Some(Utc::now());
    }

    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Succeeded
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.failure.as_ref().map(|f| f.kind)
    }

    pub fn step(&self, kind: StepKind) -> Option<&StepOutcome> {
        self.steps.iter().find(|s| s.step == kind)
    }

    /// Every recorded statement, in pipeline order
    pub fn statements(&self) -> Vec<&str> {
        self.steps
            .iter()
            .flat_map(|s| s.statements.iter().map(String::as_str))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_abort_has_no_remediation() {
        let mut report = MigrationReport::start("wp_", "foo_", RunMode::Apply);
        report.fail(&MigrationError::UserAborted, "restore backups");

        assert_eq!(report.status, RunStatus::Aborted);
        assert_eq!(report.error_kind(), Some(ErrorKind::UserAborted));
        assert!(report.remediation.is_none());
        assert!(report.steps.is_empty());
    }

    #[test]
    fn test_failure_carries_remediation() {
        let mut report = MigrationReport::start("wp_", "foo_", RunMode::Apply);
        report.fail(&MigrationError::UnsupportedTopology, "restore backups");

        assert_eq!(report.status, RunStatus::Failed);
        assert_eq!(report.remediation.as_deref(), Some("restore backups"));
        assert!(report.finished_at.is_some());
    }

    #[test]
    fn test_statements_flatten_in_step_order() {
        let mut report = MigrationReport::start("wp_", "foo_", RunMode::DryRun);

        let mut tables = StepOutcome::new(StepKind::RenameTables);
        tables.record_preview("RENAME TABLE `wp_a` TO `foo_a`");
        let mut meta = StepOutcome::new(StepKind::UsermetaKeys);
        meta.record_preview("UPDATE ...");
        report.push(tables);
        report.push(meta);
        report.succeed();

        assert_eq!(
            report.statements(),
            vec!["RENAME TABLE `wp_a` TO `foo_a`", "UPDATE ..."]
        );
        assert!(report.is_success());
    }

    #[test]
    fn test_step_status_serializes_flat() {
        let outcome = StepOutcome::skipped(StepKind::ConfigFile, "dry run");
        let json = serde_json::to_value(&outcome).unwrap();

        assert_eq!(json["step"], "config_file");
        assert_eq!(json["status"], "skipped");
        assert_eq!(json["reason"], "dry run");
    }
}
