// Trait definitions for the collaborators the engine drives
//
// These are INFRASTRUCTURE traits only - no pipeline logic.
// The orchestrator receives one of each at construction; nothing is global.
//
// Naming convention: Base* for trait names (e.g., BaseStore, BasePrompter)

use async_trait::async_trait;
use std::io;
use std::path::Path;

use crate::error::StoreError;
use crate::sql::{KeyUpdate, RenameTable};

// =============================================================================
// Store Trait (Infrastructure - the target database)
// =============================================================================

#[async_trait]
pub trait BaseStore: Send + Sync {
    /// Names of every table starting with `prefix`
    async fn list_tables(&self, prefix: &str) -> Result<Vec<String>, StoreError>;

    async fn rename_table(&self, stmt: &RenameTable) -> Result<(), StoreError>;

    /// Apply a single-row key update, returning the number of rows affected
    ///
    /// `Ok(0)` means the statement ran but matched nothing, which is distinct
    /// from an error.
    async fn update_key(&self, stmt: &KeyUpdate) -> Result<u64, StoreError>;

    /// Every value of `column` in `table`, duplicates included
    async fn list_keys(&self, table: &str, column: &str) -> Result<Vec<String>, StoreError>;

    /// Human-readable identifier of the target (host and database)
    fn host(&self) -> String;
}

// =============================================================================
// Config File Trait (Infrastructure - text file access)
// =============================================================================

pub trait BaseConfigFiles: Send + Sync {
    fn read(&self, path: &Path) -> io::Result<String>;

    fn write(&self, path: &Path, content: &str) -> io::Result<()>;
}

// =============================================================================
// Prompter Trait (Infrastructure - operator confirmation)
// =============================================================================

pub trait BasePrompter: Send + Sync {
    /// Show `message` and return whether the operator agreed
    fn confirm(&self, message: &str) -> io::Result<bool>;
}
