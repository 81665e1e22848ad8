// Prefix Rename Engine
//
// Moves a database-wide naming prefix (table names plus a handful of
// prefix-qualified row keys) from one value to another, with a dry-run
// preview, a confirmation gate and fail-fast partial-failure reporting.
//
// Collaborators (database, config file, prompter) are injected as traits;
// see traits.rs. The pipeline itself lives in orchestrator.rs.

pub mod config_file;
pub mod error;
pub mod files;
pub mod multisite;
pub mod mysql;
pub mod orchestrator;
pub mod prefix;
pub mod report;
pub mod rows;
pub mod sql;
pub mod tables;
pub mod testing;
pub mod traits;

pub use config_file::ConfigFileRewriter;
pub use error::{
    ConfigError, ErrorKind, MigrationError, MultiTenantError, RowError, StoreError, TableError,
};
pub use files::LocalFiles;
pub use multisite::MultiTenantOptionsUpdater;
pub use mysql::MySqlStore;
pub use orchestrator::{ConfigTarget, MigrationOrchestrator, RunOptions, REMEDIATION_MESSAGE};
pub use prefix::{PrefixPair, RunMode, Topology};
pub use report::{MigrationReport, RunStatus, StepKind, StepOutcome, StepStatus};
pub use rows::{MatchPolicy, RowPrefixUpdater};
pub use sql::{KeyUpdate, RenameTable};
pub use tables::TableRenamer;
pub use traits::{BaseConfigFiles, BasePrompter, BaseStore};
