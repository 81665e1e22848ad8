//! reprefix: rename the database table prefix of a WordPress-style site
//!
//! Exit status is 0 on success, 1 on any failure and 2 when the
//! confirmation prompt was declined.

mod config;
mod context;

use anyhow::{bail, Context, Result};
use clap::Parser;
use prefix_engine::config_file::{PrefixAssignment, DEFAULT_PREFIX_IDENTIFIER};
use prefix_engine::mysql::describe_target;
use prefix_engine::{
    ConfigTarget, LocalFiles, MigrationOrchestrator, MySqlStore, RunMode, RunOptions, RunStatus,
    Topology,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{resolve_old_prefix, Config, SiteConfig, CONFIG_FILE_NAME};
use crate::context::{AppContext, DialoguerPrompter};

#[derive(Parser, Debug)]
#[command(name = "reprefix", version)]
#[command(about = "Rename the database table prefix of a WordPress-style site")]
struct Cli {
    /// New table prefix, e.g. `foo_`
    new_prefix: String,

    /// Current prefix (default: read from the config file)
    #[arg(long, value_name = "PREFIX")]
    old_prefix: Option<String>,

    /// Print the statements that would run without changing anything
    #[arg(long)]
    dry_run: bool,

    /// Leave the config file alone
    #[arg(long)]
    no_config_update: bool,

    /// Path to wp-config.php (default: $REPREFIX_CONFIG_FILE, then search upwards)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// MySQL connection URL (default: $DATABASE_URL)
    #[arg(long, value_name = "URL")]
    database_url: Option<String>,

    /// Config file variable holding the prefix
    #[arg(long, value_name = "NAME", default_value = DEFAULT_PREFIX_IDENTIFIER)]
    prefix_variable: String,

    /// Treat the site as a multisite network
    #[arg(long)]
    multisite: bool,

    /// Answer the confirmation prompt with yes
    #[arg(short, long)]
    yes: bool,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let ctx = AppContext::new(cli.json);
    match run(&cli, &ctx).await {
        Ok(status) => ExitCode::from(exit_code(status)),
        Err(err) => {
            // Errors before the pipeline starts still reach the terminal in --json mode.
            eprintln!("Error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "warn,prefix_engine=debug,reprefix=debug"
    } else {
        "warn,prefix_engine=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run(cli: &Cli, ctx: &AppContext) -> Result<RunStatus> {
    let config = Config::from_env().with_overrides(cli.database_url.clone(), cli.config.clone());
    let assignment = PrefixAssignment::new(&cli.prefix_variable)
        .with_context(|| format!("Invalid --prefix-variable `{}`", cli.prefix_variable))?;

    let cwd = std::env::current_dir().context("Failed to read the working directory")?;
    let site = match config.locate_config_file(&cwd) {
        Some(path) => Some(SiteConfig::inspect(&LocalFiles, &path, &assignment)?),
        None => None,
    };
    if site.is_none() && !cli.no_config_update {
        bail!("No {} found; pass --config or --no-config-update", CONFIG_FILE_NAME);
    }

    let old_prefix = resolve_old_prefix(cli.old_prefix.as_deref(), site.as_ref())?;
    let topology = match &site {
        Some(site) if site.topology.is_multi_tenant() => Topology::MultiSite,
        _ if cli.multisite => Topology::MultiSite,
        _ => Topology::SingleSite,
    };
    tracing::debug!(old_prefix = %old_prefix, topology = ?topology, "Resolved site settings");

    let options = RunOptions {
        topology,
        config: site.filter(|_| !cli.no_config_update).map(|site| ConfigTarget {
            path: site.path,
            assignment,
        }),
    };

    let database_url = config.database_url()?;
    let store = MySqlStore::connect(database_url)
        .await
        .with_context(|| format!("Failed to connect to {}", describe_target(database_url)))?;

    ctx.print_info(&format!("Database: {}", describe_target(database_url)));
    if let Some(target) = &options.config {
        ctx.print_info(&format!("Config file: {}", target.path.display()));
    }

    let orchestrator = MigrationOrchestrator::new(
        Arc::new(store),
        Arc::new(LocalFiles),
        Arc::new(DialoguerPrompter::new(cli.yes)),
        options,
    );
    let report = orchestrator
        .run(&old_prefix, &cli.new_prefix, RunMode::from_dry_run(cli.dry_run))
        .await;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        ctx.print_report(&report);
    }

    Ok(report.status)
}

fn exit_code(status: RunStatus) -> u8 {
    match status {
        RunStatus::Succeeded => 0,
        RunStatus::Aborted => 2,
        RunStatus::Failed | RunStatus::Running => 1,
    }
}
