//! Terminal output and the interactive confirmation prompt

use console::style;
use dialoguer::{theme::ColorfulTheme, Confirm};
use prefix_engine::{BasePrompter, MigrationReport, RunMode, RunStatus, StepOutcome, StepStatus};
use std::io;

/// Output settings shared by the whole run
pub struct AppContext {
    /// Suppress human output (`--json`)
    pub quiet: bool,
}

impl AppContext {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }

    pub fn print_header(&self, msg: &str) {
        if !self.quiet {
            println!();
            println!("{}", style(msg).bold());
        }
    }

    pub fn print_success(&self, msg: &str) {
        if !self.quiet {
            println!("{}", style(msg).green());
        }
    }

    pub fn print_warning(&self, msg: &str) {
        if !self.quiet {
            println!("{}", style(msg).yellow());
        }
    }

    pub fn print_info(&self, msg: &str) {
        if !self.quiet {
            println!("{}", style(msg).cyan());
        }
    }

    pub fn print_error(&self, msg: &str) {
        if !self.quiet {
            eprintln!("{}", style(msg).red().bold());
        }
    }

    pub fn print_report(&self, report: &MigrationReport) {
        if self.quiet {
            return;
        }

        self.print_header(&report_title(report));

        for outcome in &report.steps {
            self.print_step(report.mode, outcome);
        }
        println!();

        match report.status {
            RunStatus::Succeeded if report.mode.is_dry_run() => {
                self.print_success("Dry run complete. Run again without --dry-run to apply.")
            }
            RunStatus::Succeeded => self.print_success(&format!(
                "Done. Tables and keys now use the `{}` prefix.",
                report.new_prefix
            )),
            RunStatus::Aborted => self.print_warning("Aborted. Nothing was changed."),
            RunStatus::Failed | RunStatus::Running => {
                if let Some(failure) = &report.failure {
                    self.print_error(&format!("Error: {}", failure.message));
                }
                if let Some(remediation) = &report.remediation {
                    self.print_warning(remediation);
                }
            }
        }
    }

    fn print_step(&self, mode: RunMode, outcome: &StepOutcome) {
        let label = outcome.step.label();
        match &outcome.status {
            StepStatus::Completed if mode.is_dry_run() => {
                println!("  {} {}", style("•").cyan(), label)
            }
            StepStatus::Completed => println!(
                "  {} {} ({} changed)",
                style("✓").green(),
                label,
                outcome.affected
            ),
            StepStatus::Skipped { reason } => {
                println!("  {} {} ({})", style("-").dim(), label, reason)
            }
            StepStatus::Failed { message } => {
                println!("  {} {}: {}", style("✗").red(), label, message)
            }
        }

        for statement in &outcome.statements {
            println!("      {}", style(statement).dim());
        }
    }
}

fn report_title(report: &MigrationReport) -> String {
    let (old, new) = (&report.old_prefix, &report.new_prefix);
    match (report.mode, report.status) {
        (RunMode::DryRun, RunStatus::Succeeded) => {
            format!("Dry run: `{}` -> `{}` (nothing was changed)", old, new)
        }
        (RunMode::DryRun, _) => format!("Dry run of `{}` -> `{}` failed", old, new),
        (RunMode::Apply, RunStatus::Succeeded) => format!("Renamed `{}` -> `{}`", old, new),
        (RunMode::Apply, RunStatus::Aborted) => {
            format!("Rename `{}` -> `{}` cancelled", old, new)
        }
        (RunMode::Apply, _) => format!("Rename `{}` -> `{}` failed", old, new),
    }
}

/// Asks on the terminal, or says yes for `--yes`
pub struct DialoguerPrompter {
    assume_yes: bool,
}

impl DialoguerPrompter {
    pub fn new(assume_yes: bool) -> Self {
        Self { assume_yes }
    }
}

impl BasePrompter for DialoguerPrompter {
    fn confirm(&self, message: &str) -> io::Result<bool> {
        if self.assume_yes {
            return Ok(true);
        }

        Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(message)
            .default(false)
            .interact()
            .map_err(io::Error::other)
    }
}
