use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// Failure reported by a store collaborator
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Diagnostic from a store that has no sqlx error to hand back
    #[error("{0}")]
    Rejected(String),
}

/// Configuration file step failures
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not find the `{identifier}` assignment in {path}")]
    NoMatch { path: PathBuf, identifier: String },

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Table discovery and rename failures
#[derive(Error, Debug)]
pub enum TableError {
    #[error("Failed to list tables with prefix `{prefix}`: {source}")]
    Discovery {
        prefix: String,
        #[source]
        source: StoreError,
    },

    #[error("No tables found with prefix `{prefix}`")]
    NoTables { prefix: String },

    #[error("Failed to rename table `{from}` to `{to}`: {source}")]
    Rename {
        from: String,
        to: String,
        #[source]
        source: StoreError,
    },
}

/// Row-level read/write failures
#[derive(Error, Debug)]
pub enum RowError {
    #[error("Failed to list `{column}` from `{table}`: {source}")]
    Scan {
        table: String,
        column: String,
        #[source]
        source: StoreError,
    },

    #[error("Failed to update `{key}` in `{table}`: {source}")]
    Update {
        table: String,
        key: String,
        #[source]
        source: StoreError,
    },

    #[error("Updating `{key}` in `{table}` affected no rows")]
    NoEffect { table: String, key: String },
}

#[derive(Error, Debug)]
pub enum MultiTenantError {
    #[error("Renaming the prefix of a multisite network is not implemented")]
    NotImplemented,
}

/// Every way a run can stop before completing
#[derive(Error, Debug)]
pub enum MigrationError {
    #[error("Invalid prefix `{prefix}`: {reason}")]
    InvalidPrefix { prefix: String, reason: String },

    #[error("Multisite installations are not supported")]
    UnsupportedTopology,

    #[error("Aborted by user")]
    UserAborted,

    #[error("Confirmation prompt failed: {0}")]
    Prompt(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Table(#[from] TableError),

    #[error(transparent)]
    Row(#[from] RowError),

    #[error(transparent)]
    MultiTenant(#[from] MultiTenantError),
}

/// Flat error taxonomy used in reports and assertions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ConfigNoMatch,
    ConfigReadError,
    ConfigWriteError,
    DiscoveryError,
    RenameError,
    RowScanError,
    RowUpdateError,
    NotImplemented,
    UnsupportedTopology,
    InvalidPrefix,
    UserAborted,
    PromptError,
}

impl MigrationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MigrationError::InvalidPrefix { .. } => ErrorKind::InvalidPrefix,
            MigrationError::UnsupportedTopology => ErrorKind::UnsupportedTopology,
            MigrationError::UserAborted => ErrorKind::UserAborted,
            MigrationError::Prompt(_) => ErrorKind::PromptError,
            MigrationError::Config(ConfigError::NoMatch { .. }) => ErrorKind::ConfigNoMatch,
            MigrationError::Config(ConfigError::Read { .. }) => ErrorKind::ConfigReadError,
            MigrationError::Config(ConfigError::Write { .. }) => ErrorKind::ConfigWriteError,
            MigrationError::Table(TableError::Discovery { .. })
            | MigrationError::Table(TableError::NoTables { .. }) => ErrorKind::DiscoveryError,
            MigrationError::Table(TableError::Rename { .. }) => ErrorKind::RenameError,
            MigrationError::Row(RowError::Scan { .. }) => ErrorKind::RowScanError,
            MigrationError::Row(RowError::Update { .. })
            | MigrationError::Row(RowError::NoEffect { .. }) => ErrorKind::RowUpdateError,
            MigrationError::MultiTenant(MultiTenantError::NotImplemented) => {
                ErrorKind::NotImplemented
            }
        }
    }
}
